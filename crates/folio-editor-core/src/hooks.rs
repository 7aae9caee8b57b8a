//! Host callbacks.

use smol_str::SmolStr;

use crate::commands::FormatCommand;
use crate::dom::{Document, NodeId};
use crate::error::MediaError;
use crate::media::{FileRef, ResolvedImage};

/// Raw client events forwarded to [`EditorHooks::on_client_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Focus,
    Blur,
    Input,
    KeyDown(SmolStr),
    Paste,
    Drop,
    MouseDown,
}

/// Callbacks the editor invokes. Every method has a no-op default.
pub trait EditorHooks {
    /// The document changed. Runs after cleanup, so the markup is normalized.
    fn on_change(&mut self) {}

    /// The selection moved or changed extent.
    fn on_selection(&mut self, _has_selection: bool) {}

    fn on_client_event(&mut self, _event: &ClientEvent) {}

    /// Rewrite pasted html before it is filtered and inserted.
    fn paste_hook(&mut self, html: String) -> String {
        html
    }

    /// Called before the editor blurs. Return `false` to stay focused.
    fn blur_hook(&mut self) -> bool {
        true
    }

    /// An async image finished loading. Fires once per insertion.
    fn on_async_image_added(&mut self, _image: &ResolvedImage) {}

    fn on_async_image_failed(&mut self, _error: &MediaError) {}

    fn on_file_added(&mut self, _file: &FileRef) {}

    /// A media holder was created.
    fn on_media_holder(&mut self, _doc: &Document, _holder: NodeId) {}

    /// A mousedown landed on the page; `inside` tells whether it was
    /// within the editor.
    fn document_mousedown_hook(&mut self, _inside: bool) {}

    /// Toolbar state was recomputed.
    fn on_interface_refresh(&mut self, _active: &[FormatCommand]) {}
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl EditorHooks for NoHooks {}
