//! Error types for workspace access.
//!
//! Nothing in the resolver or index propagates these past its own API; they
//! exist so failures can be logged with their cause before being absorbed.

use derive_more::{Display, Error, From};

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

#[derive(Debug, Display, Error, From)]
pub enum WorkspaceError {
    #[display("I/O error: {_0}")]
    Io(std::io::Error),

    #[display("directory walk failed: {_0}")]
    Walk(walkdir::Error),

    #[display("invalid glob pattern: {_0}")]
    Glob(globset::Error),

    #[display("invalid JSON: {_0}")]
    Json(serde_json::Error),

    #[display("not a file URI: {_0}")]
    #[from(skip)]
    InvalidUri(#[error(not(source))] String),
}
