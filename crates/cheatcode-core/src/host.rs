#![forbid(unsafe_code)]

//! Host capabilities the engine drives.

use crate::effect::Surface;
use crate::notify::Notifier;

/// Everything the engine needs from the embedding page.
///
/// Navigation and clipboard writes are best effort; none of these calls may
/// fail back into the engine.
pub trait PageHost: Surface + Notifier {
    /// Navigate the browser to `url`.
    fn navigate(&mut self, url: &str);

    /// Reload the current page.
    fn reload(&mut self);

    /// Write `text` to the clipboard.
    fn copy_to_clipboard(&mut self, text: &str);
}
