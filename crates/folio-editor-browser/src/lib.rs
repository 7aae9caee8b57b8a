//! Browser host for folio editors.
//!
//! This crate mirrors a live `contenteditable` element into the core
//! document model and back. It assumes a `wasm32-unknown-unknown` target
//! environment.
//!
//! # Architecture
//!
//! - `cursor`: live `Selection` ↔ model positions
//! - `dom_sync`: live markup → model import, model → live render
//! - `events`: keyboard, clipboard and drop event extraction
//! - `geometry`: selection rectangles for floating controls
//! - `host`: `BrowserEditor`, which wires all of the above to a `RichEditor`
//!
//! # Re-exports
//!
//! This crate re-exports `folio-editor-core` for convenience, so consumers
//! only need to depend on `folio-editor-browser`.

// Re-export core crate
pub use folio_editor_core;
pub use folio_editor_core::*;

pub mod cursor;
pub mod dom_sync;
pub mod events;
pub mod geometry;
pub mod host;

pub use geometry::BrowserGeometry;
pub use host::BrowserEditor;

use std::sync::Once;

static LOGGING: Once = Once::new();

/// Install the panic hook and a console tracing subscriber. Later calls are
/// ignored.
///
/// Logs at DEBUG in debug builds or when `debug` is set, WARN otherwise.
pub fn init_logging(debug: bool) {
    LOGGING.call_once(|| {
        console_error_panic_hook::set_once();

        use tracing::Level;
        use tracing::subscriber::set_global_default;
        use tracing_subscriber::Registry;
        use tracing_subscriber::layer::SubscriberExt;

        let console_level = if debug || cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::WARN
        };

        let wasm_layer = tracing_wasm::WASMLayer::new(
            tracing_wasm::WASMLayerConfigBuilder::new()
                .set_max_level(console_level)
                .build(),
        );

        let _ = set_global_default(Registry::default().with(wasm_layer));
    });
}
