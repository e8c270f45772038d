//! Error types for Deckgen

use thiserror::Error;

/// Result type alias using Deckgen Error
pub type Result<T> = std::result::Result<T, Error>;

/// Deckgen error types.
///
/// Problems with a deck's content are not errors; they are reported through
/// [`crate::DeckReport::valid`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
