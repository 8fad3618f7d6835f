#![forbid(unsafe_code)]

//! Browser-backed storage, cookies, and HTTP.

use cheatcode_core::persistence::{KeyValueStore, StorageError, StorageResult};
use cheatcode_core::redeem::{CookieSource, HttpRequest, HttpResponse, HttpTransport, TransportError};
use wasm_bindgen::JsCast as _;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, Headers, HtmlDocument, Request, RequestCredentials, RequestInit, Response, Storage, Window};

fn describe(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{value:?}"))
}

// ---------------------------------------------------------------------------
// localStorage
// ---------------------------------------------------------------------------

/// `window.localStorage`, or nothing when the browser refuses access.
#[derive(Debug, Clone)]
pub(crate) struct LocalStore {
    storage: Option<Storage>,
}

impl LocalStore {
    pub(crate) fn from_window(window: &Window) -> Self {
        // Private browsing and sandboxed frames throw or return null here.
        Self {
            storage: window.local_storage().ok().flatten(),
        }
    }

    fn storage(&self) -> StorageResult<&Storage> {
        self.storage.as_ref().ok_or(StorageError::Unavailable)
    }
}

fn storage_error(err: JsValue) -> StorageError {
    let name = err
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.name()))
        .unwrap_or_default();
    match name.as_str() {
        "QuotaExceededError" => StorageError::QuotaExceeded,
        "SecurityError" => StorageError::Denied(describe(&err)),
        _ => StorageError::Backend(describe(&err)),
    }
}

impl KeyValueStore for LocalStore {
    fn name(&self) -> &str {
        "localStorage"
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.storage()?.get_item(key).map_err(storage_error)
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.storage()?.set_item(key, value).map_err(storage_error)
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        self.storage()?.remove_item(key).map_err(storage_error)
    }
}

// ---------------------------------------------------------------------------
// Cookies
// ---------------------------------------------------------------------------

/// Reads `document.cookie` on every call.
#[derive(Debug, Clone)]
pub(crate) struct DocumentCookies {
    document: Option<HtmlDocument>,
}

impl DocumentCookies {
    pub(crate) fn new(document: Document) -> Self {
        Self {
            document: document.dyn_into::<HtmlDocument>().ok(),
        }
    }
}

impl CookieSource for DocumentCookies {
    fn cookie_string(&self) -> String {
        self.document
            .as_ref()
            .and_then(|d| d.cookie().ok())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// fetch
// ---------------------------------------------------------------------------

/// Same-origin `fetch` POST.
#[derive(Debug, Clone)]
pub(crate) struct FetchTransport {
    window: Window,
}

impl FetchTransport {
    pub(crate) fn new(window: Window) -> Self {
        Self { window }
    }

    fn build(request: &HttpRequest) -> Result<Request, JsValue> {
        let headers = Headers::new()?;
        for (name, value) in &request.headers {
            headers.set(name, value)?;
        }
        let init = RequestInit::new();
        init.set_method("POST");
        init.set_credentials(RequestCredentials::SameOrigin);
        init.set_headers(&headers);
        if let Some(body) = &request.body {
            init.set_body(&JsValue::from_str(body));
        }
        Request::new_with_str_and_init(&request.url, &init)
    }
}

impl HttpTransport for FetchTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let js_request =
            Self::build(&request).map_err(|e| TransportError::Network(describe(&e)))?;
        let reply = JsFuture::from(self.window.fetch_with_request(&js_request))
            .await
            .map_err(|e| TransportError::Network(describe(&e)))?;
        let response: Response = reply
            .dyn_into()
            .map_err(|e| TransportError::Network(describe(&e)))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|e| TransportError::Body(describe(&e)))?;
        let body = JsFuture::from(text)
            .await
            .map_err(|e| TransportError::Body(describe(&e)))?
            .as_string()
            .unwrap_or_default();
        Ok(HttpResponse { status, body })
    }
}
