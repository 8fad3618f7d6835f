#![forbid(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use cheatcode_core::redeem::RedemptionRequest;
use cheatcode_core::{Engine, RedemptionClient, RedemptionResult};
use wasm_bindgen::JsCast as _;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{KeyboardEvent, Window, console};
use web_time::Instant;

use crate::config_from_options;
use crate::dom::{self, DomHost};
use crate::net::{DocumentCookies, FetchTransport, LocalStore};

type WebEngine = Engine<LocalStore, DomHost>;
type WebClient = RedemptionClient<FetchTransport, DocumentCookies>;

struct Shared {
    window: Window,
    origin: Instant,
    engine: RefCell<WebEngine>,
    client: WebClient,
    /// Armed `setTimeout` handle, if any.
    timer: Cell<Option<i32>>,
    on_timer: Closure<dyn FnMut()>,
    on_keydown: Closure<dyn FnMut(KeyboardEvent)>,
    installed: Cell<bool>,
}

impl Shared {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Page-level handle for the hidden-command engine.
///
/// ```js
/// const cheats = CheatEngineWeb.install({ redirect_delay_ms: 800 });
/// // later
/// cheats.destroy();
/// ```
#[wasm_bindgen]
pub struct CheatEngineWeb {
    shared: Rc<Shared>,
}

#[wasm_bindgen]
impl CheatEngineWeb {
    /// Restore persisted effects and start listening for keystrokes.
    ///
    /// `options` is an optional object of overrides (durations in ms). Throws
    /// if the options are invalid or there is no `window`.
    pub fn install(options: Option<JsValue>) -> Result<CheatEngineWeb, JsValue> {
        let options = match options {
            Some(value) if !value.is_undefined() && !value.is_null() => {
                Some(String::from(js_sys::JSON::stringify(&value)?))
            }
            _ => None,
        };
        let config = config_from_options(options.as_deref())
            .map_err(|err| JsValue::from_str(&err.to_string()))?;

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("window is unavailable"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("document is unavailable"))?;

        let client = RedemptionClient::new(
            FetchTransport::new(window.clone()),
            DocumentCookies::new(document.clone()),
            config.redemption.clone(),
        );
        let engine = Engine::new(
            config,
            LocalStore::from_window(&window),
            DomHost::new(window.clone(), document),
        );

        let shared = Rc::new_cyclic(|weak: &Weak<Shared>| {
            let timer_weak = weak.clone();
            let on_timer = Closure::wrap(Box::new(move || {
                if let Some(shared) = timer_weak.upgrade() {
                    shared.timer.set(None);
                    pump(&shared);
                }
            }) as Box<dyn FnMut()>);

            let key_weak = weak.clone();
            let on_keydown = Closure::wrap(Box::new(move |event: KeyboardEvent| {
                if let Some(shared) = key_weak.upgrade() {
                    on_key(&shared, &event.key());
                }
            }) as Box<dyn FnMut(KeyboardEvent)>);

            Shared {
                window,
                origin: Instant::now(),
                engine: RefCell::new(engine),
                client,
                timer: Cell::new(None),
                on_timer,
                on_keydown,
                installed: Cell::new(false),
            }
        });

        shared.engine.borrow_mut().bootstrap();
        flush_toasts(&shared);
        shared.window.add_event_listener_with_callback(
            "keydown",
            shared.on_keydown.as_ref().unchecked_ref(),
        )?;
        shared.installed.set(true);

        Ok(Self { shared })
    }

    /// Effects currently rendered, by keyword.
    #[wasm_bindgen(js_name = activeEffects)]
    pub fn active_effects(&self) -> Vec<String> {
        self.shared
            .engine
            .borrow()
            .registry()
            .rendered()
            .into_iter()
            .map(|e| e.key().to_owned())
            .collect()
    }

    /// Detach listeners, cancel timers, and undo rendered effects.
    ///
    /// Persisted state is kept, so the next page load restores it.
    pub fn destroy(&mut self) {
        let shared = &self.shared;
        if !shared.installed.replace(false) {
            return;
        }
        let _ = shared.window.remove_event_listener_with_callback(
            "keydown",
            shared.on_keydown.as_ref().unchecked_ref(),
        );
        if let Some(id) = shared.timer.take() {
            shared.window.clear_timeout_with_handle(id);
        }
        shared.engine.borrow_mut().shutdown();
        flush_toasts(shared);
    }
}

fn on_key(shared: &Rc<Shared>, key: &str) {
    if !shared.installed.get() {
        return;
    }
    let now = shared.now();
    shared.engine.borrow_mut().on_key_down(key, now);
    pump(shared);
}

/// Run due work, launch queued redemptions, and re-arm the timer.
fn pump(shared: &Rc<Shared>) {
    if !shared.installed.get() {
        return;
    }
    let requests = {
        let mut engine = shared.engine.borrow_mut();
        engine.tick(shared.now());
        engine.take_redemptions()
    };
    flush_toasts(shared);
    // A toast listener may have called `destroy`.
    if !shared.installed.get() {
        return;
    }
    for request in requests {
        spawn_redemption(Rc::clone(shared), request);
    }
    rearm(shared);
}

fn spawn_redemption(shared: Rc<Shared>, request: RedemptionRequest) {
    spawn_local(async move {
        let result = shared.client.execute(request).await;
        if let RedemptionResult::Verify(Err(err)) | RedemptionResult::LegacyCoupon(Err(err)) =
            &result
        {
            console::warn_1(&format!("cheatcode: redemption failed: {err}").into());
        }
        if !shared.installed.get() {
            return;
        }
        shared
            .engine
            .borrow_mut()
            .apply_redemption(result, shared.now());
        pump(&shared);
    });
}

/// Send queued toasts with no engine borrow held.
fn flush_toasts(shared: &Shared) {
    let toasts = shared.engine.borrow_mut().host_mut().take_toasts();
    for toast in &toasts {
        dom::dispatch_toast(&shared.window, toast);
    }
}

fn rearm(shared: &Shared) {
    if let Some(id) = shared.timer.take() {
        shared.window.clear_timeout_with_handle(id);
    }
    let Some(deadline) = shared.engine.borrow().next_deadline() else {
        return;
    };
    let delay = deadline.saturating_sub(shared.now());
    let delay_ms = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
    match shared
        .window
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            shared.on_timer.as_ref().unchecked_ref(),
            delay_ms,
        ) {
        Ok(id) => shared.timer.set(Some(id)),
        Err(err) => console::warn_1(&err),
    }
}
