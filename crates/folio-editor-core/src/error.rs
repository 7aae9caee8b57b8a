//! Error types.

use smol_str::SmolStr;
use thiserror::Error;

/// Construction and configuration failures.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("editor root element is missing or not attached")]
    MissingRoot,

    #[error("invalid value pattern for attribute `{attribute}` on `{element}`")]
    InvalidPattern {
        element: SmolStr,
        attribute: SmolStr,
        #[source]
        source: regex::Error,
    },

    #[error("invalid editor configuration: {0}")]
    InvalidConfig(String),

    #[error("editor has been torn down")]
    TornDown,
}

/// Media insertion failures. These are reported through hooks rather than
/// surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("image insertion needs a source url or a file")]
    NoSource,

    #[error("unsupported file type `{mime}` for {name}")]
    UnsupportedFile { name: SmolStr, mime: SmolStr },

    #[error("no tracked image with key `{0}`")]
    UnknownKey(SmolStr),

    #[error("image failed to load: {0}")]
    LoadFailed(String),

    #[error("editor has been torn down")]
    TornDown,
}
