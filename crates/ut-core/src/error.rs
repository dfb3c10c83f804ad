//! Workspace base error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` as one
//! variant where they need configuration failures from here.

use thiserror::Error;

/// The top-level error type for `ut-core`.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),
}

/// Shorthand result type for `ut-core`.
pub type CoreResult<T> = Result<T, CoreError>;
