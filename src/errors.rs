//! Error kinds surfaced synchronously to callers. Attribute
//! length mismatches are deliberately not an error variant here — they are
//! warnings, logged via [`log::warn!`] and handled by clearing the
//! offending stream (see [`crate::attributes`]).

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimplifyError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid option `{property}`: {message}")]
    InvalidOptions {
        property: &'static str,
        message: String,
    },

    #[error("internal invariant violated: {0}")]
    InvalidState(String),
}

pub type Result<T> = std::result::Result<T, SimplifyError>;
