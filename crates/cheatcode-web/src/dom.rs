#![forbid(unsafe_code)]

//! The live page as an engine host.

use std::collections::HashMap;

use cheatcode_core::effect::{Surface, Ticker, TickerHandle};
use cheatcode_core::{Notification, Notifier, PageHost};
use wasm_bindgen::JsCast as _;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{CustomEvent, CustomEventInit, Document, HtmlElement, Window, console};

use crate::tickers::{self, FrameLoop};

const TOAST_EVENT: &str = "show-toast";

/// DOM-backed [`PageHost`]. Every operation is best effort.
///
/// Toasts are queued rather than dispatched: listeners run synchronously and
/// may call back into the engine, so the caller sends them once the engine
/// borrow is released.
pub(crate) struct DomHost {
    window: Window,
    document: Document,
    next_ticker: u32,
    tickers: HashMap<TickerHandle, Option<FrameLoop>>,
    toasts: Vec<Notification>,
}

impl DomHost {
    pub(crate) fn new(window: Window, document: Document) -> Self {
        Self {
            window,
            document,
            next_ticker: 0,
            tickers: HashMap::new(),
            toasts: Vec::new(),
        }
    }

    /// Drain toasts queued since the last call.
    pub(crate) fn take_toasts(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.toasts)
    }

    fn body(&self) -> Option<HtmlElement> {
        self.document.body()
    }
}

impl Surface for DomHost {
    fn set_root_class(&mut self, class: &str, present: bool) {
        let Some(root) = self.document.document_element() else {
            return;
        };
        let classes = root.class_list();
        let _ = if present {
            classes.add_1(class)
        } else {
            classes.remove_1(class)
        };
    }

    fn set_body_style(&mut self, property: &str, value: Option<&str>) {
        let Some(body) = self.body() else {
            return;
        };
        let style = body.style();
        match value {
            Some(value) => {
                let _ = style.set_property(property, value);
            }
            None => {
                let _ = style.remove_property(property);
            }
        }
    }

    fn has_node(&self, id: &str) -> bool {
        self.document.get_element_by_id(id).is_some()
    }

    fn insert_style(&mut self, id: &str, css: &str) {
        let (Some(head), Ok(style)) = (self.document.head(), self.document.create_element("style"))
        else {
            return;
        };
        style.set_id(id);
        style.set_text_content(Some(css));
        let _ = head.append_child(&style);
    }

    fn remove_node(&mut self, id: &str) {
        if let Some(node) = self.document.get_element_by_id(id) {
            node.remove();
        }
    }

    fn set_visible(&mut self, id: &str, visible: bool) {
        let Some(element) = self
            .document
            .get_element_by_id(id)
            .and_then(|e| e.dyn_into::<HtmlElement>().ok())
        else {
            return;
        };
        let _ = element
            .style()
            .set_property("display", if visible { "block" } else { "none" });
    }

    fn set_image_src(&mut self, id: &str, src: &str) {
        if let Some(element) = self.document.get_element_by_id(id) {
            let _ = element.set_attribute("src", src);
        }
    }

    fn start_ticker(&mut self, ticker: Ticker) -> TickerHandle {
        let handle = TickerHandle(self.next_ticker);
        self.next_ticker = self.next_ticker.wrapping_add(1);
        let running = match ticker {
            Ticker::FpsMeter => Some(tickers::start_fps_meter(&self.window, &self.document)),
            Ticker::RainOverlay => tickers::start_rain(&self.window, &self.document),
        };
        if running.is_none() {
            console::warn_1(&format!("cheatcode: could not start {ticker:?}").into());
        }
        self.tickers.insert(handle, running);
        handle
    }

    fn stop_ticker(&mut self, handle: TickerHandle) {
        if let Some(Some(running)) = self.tickers.remove(&handle) {
            running.stop();
        }
    }
}

impl Notifier for DomHost {
    fn notify(&mut self, notification: &Notification) {
        self.toasts.push(notification.clone());
    }
}

/// Fire one `show-toast` event on `window`.
pub(crate) fn dispatch_toast(window: &Window, notification: &Notification) {
    let detail = js_sys::JSON::parse(&notification.to_detail_json())
        .unwrap_or_else(|_| notification.message.as_str().into());
    let init = CustomEventInit::new();
    init.set_detail(&detail);
    match CustomEvent::new_with_event_init_dict(TOAST_EVENT, &init) {
        Ok(event) => {
            let _ = window.dispatch_event(&event);
        }
        Err(err) => console::warn_1(&err),
    }
}

impl PageHost for DomHost {
    fn navigate(&mut self, url: &str) {
        if let Err(err) = self.window.location().set_href(url) {
            console::warn_1(&err);
        }
    }

    fn reload(&mut self) {
        if let Err(err) = self.window.location().reload() {
            console::warn_1(&err);
        }
    }

    fn copy_to_clipboard(&mut self, text: &str) {
        let promise = self.window.navigator().clipboard().write_text(text);
        spawn_local(async move {
            if let Err(err) = JsFuture::from(promise).await {
                console::warn_1(&err);
            }
        });
    }
}
