#![forbid(unsafe_code)]

//! Deterministic in-memory page for tests and native embedders.
//!
//! [`HeadlessPage`] records every mutation the engine makes so callers can
//! assert on the resulting page state without a browser.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::effect::{Surface, Ticker, TickerHandle};
use crate::host::PageHost;
use crate::notify::{Notification, Notifier};
use crate::redeem::{CookieSource, HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Observable page state, excluding call counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    pub root_classes: BTreeSet<String>,
    pub body_styles: BTreeMap<String, String>,
    pub nodes: BTreeSet<String>,
    pub visible: BTreeMap<String, bool>,
    pub image_srcs: BTreeMap<String, String>,
    pub tickers: BTreeMap<TickerHandle, Ticker>,
}

/// Recording implementation of [`PageHost`].
#[derive(Debug, Clone, Default)]
pub struct HeadlessPage {
    state: PageSnapshot,
    next_ticker: u32,
    style_insertions: usize,
    notifications: Vec<Notification>,
    navigations: Vec<String>,
    reloads: usize,
    clipboard: Vec<String>,
}

impl HeadlessPage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an element (e.g. `#fps-counter`) that effects may target.
    pub fn add_anchor(&mut self, id: impl Into<String>) {
        self.state.nodes.insert(id.into());
    }

    #[must_use]
    pub fn snapshot(&self) -> PageSnapshot {
        self.state.clone()
    }

    #[must_use]
    pub fn has_root_class(&self, class: &str) -> bool {
        self.state.root_classes.contains(class)
    }

    #[must_use]
    pub fn root_classes(&self) -> &BTreeSet<String> {
        &self.state.root_classes
    }

    #[must_use]
    pub fn body_style(&self, property: &str) -> Option<&str> {
        self.state.body_styles.get(property).map(String::as_str)
    }

    #[must_use]
    pub fn is_visible(&self, id: &str) -> Option<bool> {
        self.state.visible.get(id).copied()
    }

    #[must_use]
    pub fn image_src(&self, id: &str) -> Option<&str> {
        self.state.image_srcs.get(id).map(String::as_str)
    }

    /// Kinds of tickers currently running, in start order.
    #[must_use]
    pub fn running_tickers(&self) -> Vec<Ticker> {
        self.state.tickers.values().copied().collect()
    }

    /// Number of style nodes actually created.
    #[must_use]
    pub const fn style_insertions(&self) -> usize {
        self.style_insertions
    }

    #[must_use]
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    #[must_use]
    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    #[must_use]
    pub const fn reloads(&self) -> usize {
        self.reloads
    }

    #[must_use]
    pub fn clipboard(&self) -> &[String] {
        &self.clipboard
    }
}

impl Surface for HeadlessPage {
    fn set_root_class(&mut self, class: &str, present: bool) {
        if present {
            self.state.root_classes.insert(class.to_owned());
        } else {
            self.state.root_classes.remove(class);
        }
    }

    fn set_body_style(&mut self, property: &str, value: Option<&str>) {
        match value {
            Some(v) => {
                self.state.body_styles.insert(property.to_owned(), v.to_owned());
            }
            None => {
                self.state.body_styles.remove(property);
            }
        }
    }

    fn has_node(&self, id: &str) -> bool {
        self.state.nodes.contains(id)
    }

    fn insert_style(&mut self, id: &str, _css: &str) {
        if self.state.nodes.insert(id.to_owned()) {
            self.style_insertions += 1;
        }
    }

    fn remove_node(&mut self, id: &str) {
        self.state.nodes.remove(id);
    }

    fn set_visible(&mut self, id: &str, visible: bool) {
        if self.state.nodes.contains(id) {
            self.state.visible.insert(id.to_owned(), visible);
        }
    }

    fn set_image_src(&mut self, id: &str, src: &str) {
        if self.state.nodes.contains(id) {
            self.state.image_srcs.insert(id.to_owned(), src.to_owned());
        }
    }

    fn start_ticker(&mut self, ticker: Ticker) -> TickerHandle {
        self.next_ticker += 1;
        let handle = TickerHandle(self.next_ticker);
        self.state.tickers.insert(handle, ticker);
        handle
    }

    fn stop_ticker(&mut self, handle: TickerHandle) {
        self.state.tickers.remove(&handle);
    }
}

impl Notifier for HeadlessPage {
    fn notify(&mut self, notification: &Notification) {
        self.notifications.push(notification.clone());
    }
}

impl PageHost for HeadlessPage {
    fn navigate(&mut self, url: &str) {
        self.navigations.push(url.to_owned());
    }

    fn reload(&mut self) {
        self.reloads += 1;
    }

    fn copy_to_clipboard(&mut self, text: &str) {
        self.clipboard.push(text.to_owned());
    }
}

/// Transport that answers from a fixed script and records requests.
///
/// Once the script runs out every request fails with a network error.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: RefCell<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new(replies: Vec<Result<HttpResponse, TransportError>>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }
}

impl HttpTransport for ScriptedTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request);
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("script exhausted".into())))
    }
}

/// Fixed cookie string.
#[derive(Debug, Clone, Default)]
pub struct StaticCookies(String);

impl StaticCookies {
    #[must_use]
    pub fn new(cookies: impl Into<String>) -> Self {
        Self(cookies.into())
    }
}

impl CookieSource for StaticCookies {
    fn cookie_string(&self) -> String {
        self.0.clone()
    }
}
