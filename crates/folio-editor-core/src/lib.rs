//! folio-editor-core: block-structured rich text editing without a browser.
//!
//! This crate provides:
//! - `Document` - arena DOM model with html5ever parsing and serialization
//! - `Sanitizer` - whitelist filter driven by `FilterRules`
//! - block normalization (`filter`) and selection persistence (`selection`)
//! - `CommandRouter` over a `FormattingPrimitives` surface
//! - `RichEditor` and `TextEditor`, sharing the `Editor` trait, with undo,
//!   async media tracking and deferred tasks

pub mod commands;
pub mod config;
pub mod dom;
pub mod editor;
pub mod error;
pub mod filter;
pub mod hooks;
pub mod media;
pub mod platform;
pub mod sanitize;
pub mod selection;
pub mod smart_quotes;
pub mod tags;
pub mod timers;
pub mod undo;

pub use commands::{
    BlockKind, CommandOutcome, CommandRouter, EditContext, FormatCommand, FormattingPrimitives,
    InlineMark, LinkEditor, ModelPrimitives,
};
pub use config::{EditorConfig, FormattingControls, LinkConfig, QuoteGlyphs, SmartQuotes};
pub use dom::{Document, DomRange, DomSelection, NodeData, NodeId, Position};
pub use editor::{Editor, EditorState, RichEditor, TextEditor};
pub use error::{EditorError, MediaError};
pub use hooks::{ClientEvent, EditorHooks, NoHooks};
pub use media::{
    Direction, FileRef, ImageDimensions, ImageLoad, ImageSource, MediaTracker, ResolvedImage,
};
pub use platform::{NoGeometry, PlatformError, Rect, SelectionGeometry};
pub use sanitize::{FilterRules, SanitizeConfig, Sanitizer};
pub use selection::SavedSelection;
pub use smol_str::SmolStr;
pub use timers::{TaskKind, Timers};
pub use undo::{UndoHistory, UndoManager, UndoState};
