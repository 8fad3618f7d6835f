#![forbid(unsafe_code)]

//! `requestAnimationFrame` loops behind the FPS meter and the glyph rain.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::JsCast as _;
use wasm_bindgen::closure::Closure;
use web_sys::{CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, Window};

const FPS_COUNTER_ID: &str = "fps-counter";
const RAIN_GLYPHS: &[char] = &['0', '1', 'ア', 'カ', 'サ', 'タ', 'ナ', 'ハ', 'マ', 'ヤ', 'ラ', 'ワ'];
const RAIN_FONT_PX: f64 = 16.0;

struct LoopState {
    running: Cell<bool>,
    frame: Cell<Option<i32>>,
    callback: RefCell<Option<Closure<dyn FnMut(f64)>>>,
}

/// A running animation loop and the node it owns, if any.
pub(crate) struct FrameLoop {
    window: Window,
    state: Rc<LoopState>,
    node: Option<Element>,
}

impl FrameLoop {
    fn start(window: &Window, node: Option<Element>, mut draw: impl FnMut(f64) + 'static) -> Self {
        let state = Rc::new(LoopState {
            running: Cell::new(true),
            frame: Cell::new(None),
            callback: RefCell::new(None),
        });

        let weak = Rc::downgrade(&state);
        let frame_window = window.clone();
        let callback = Closure::wrap(Box::new(move |timestamp: f64| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            if !state.running.get() {
                return;
            }
            draw(timestamp);
            let next = state
                .callback
                .borrow()
                .as_ref()
                .map(|cb| frame_window.request_animation_frame(cb.as_ref().unchecked_ref()));
            match next {
                Some(Ok(id)) => state.frame.set(Some(id)),
                _ => state.running.set(false),
            }
        }) as Box<dyn FnMut(f64)>);

        match window.request_animation_frame(callback.as_ref().unchecked_ref()) {
            Ok(id) => state.frame.set(Some(id)),
            Err(_) => state.running.set(false),
        }
        state.callback.replace(Some(callback));

        Self {
            window: window.clone(),
            state,
            node,
        }
    }

    /// Stop the loop and remove its node.
    pub(crate) fn stop(self) {
        self.state.running.set(false);
        if let Some(id) = self.state.frame.take() {
            let _ = self.window.cancel_animation_frame(id);
        }
        self.state.callback.take();
        if let Some(node) = self.node {
            node.remove();
        }
    }
}

/// Writes the measured frame rate into `#fps-counter` once per second.
pub(crate) fn start_fps_meter(window: &Window, document: &Document) -> FrameLoop {
    let document = document.clone();
    let mut window_start: Option<f64> = None;
    let mut frames = 0u32;
    FrameLoop::start(window, None, move |now| {
        frames += 1;
        let start = *window_start.get_or_insert(now);
        let elapsed = now - start;
        if elapsed >= 1000.0 {
            let fps = (f64::from(frames) * 1000.0 / elapsed).round();
            if let Some(counter) = document.get_element_by_id(FPS_COUNTER_ID) {
                counter.set_text_content(Some(&format!("FPS: {fps}")));
            }
            frames = 0;
            window_start = Some(now);
        }
    })
}

/// Full-screen falling-glyph canvas behind a click-through overlay.
pub(crate) fn start_rain(window: &Window, document: &Document) -> Option<FrameLoop> {
    let canvas: HtmlCanvasElement = document.create_element("canvas").ok()?.dyn_into().ok()?;
    canvas.set_id("matrix-rain");
    let width = window.inner_width().ok()?.as_f64().unwrap_or(0.0);
    let height = window.inner_height().ok()?.as_f64().unwrap_or(0.0);
    canvas.set_width(width as u32);
    canvas.set_height(height as u32);
    let style = canvas.style();
    for (property, value) in [
        ("position", "fixed"),
        ("top", "0"),
        ("left", "0"),
        ("width", "100%"),
        ("height", "100%"),
        ("pointer-events", "none"),
        ("z-index", "10000"),
        ("opacity", "0.35"),
    ] {
        style.set_property(property, value).ok()?;
    }
    document.body()?.append_child(&canvas).ok()?;

    let ctx: CanvasRenderingContext2d = canvas.get_context("2d").ok()??.dyn_into().ok()?;
    ctx.set_font(&format!("{RAIN_FONT_PX}px monospace"));
    let columns = ((width / RAIN_FONT_PX).ceil() as usize).max(1);
    let mut drops: Vec<f64> = (0..columns)
        .map(|_| (js_sys::Math::random() * height / RAIN_FONT_PX).floor())
        .collect();

    let node: Element = canvas.into();
    Some(FrameLoop::start(window, Some(node), move |_| {
        ctx.set_fill_style_str("rgba(0, 0, 0, 0.05)");
        ctx.fill_rect(0.0, 0.0, width, height);
        ctx.set_fill_style_str("#0f0");
        for (column, drop) in drops.iter_mut().enumerate() {
            let pick = (js_sys::Math::random() * RAIN_GLYPHS.len() as f64) as usize;
            let glyph = RAIN_GLYPHS[pick.min(RAIN_GLYPHS.len() - 1)];
            let x = column as f64 * RAIN_FONT_PX;
            let y = *drop * RAIN_FONT_PX;
            let _ = ctx.fill_text(&glyph.to_string(), x, y);
            if y > height && js_sys::Math::random() > 0.975 {
                *drop = 0.0;
            } else {
                *drop += 1.0;
            }
        }
    }))
}
