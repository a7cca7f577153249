//! Errors raised while constructing or parsing fundamental types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid proposal hash: {0}")]
    InvalidHash(String),
}
