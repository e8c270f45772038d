//! Deckgen Common Library
//!
//! Shared types and utilities for the Deckgen harness: entity references,
//! status reports, the API response envelope, and exported deck inspection.

pub mod deck;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use deck::{DeckExpectations, DeckInspector, DeckReport};
pub use error::{Error, Result};
pub use types::*;

/// Deckgen version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
