//! Error types for E2E testing

use std::time::Duration;

use deckgen_common::EntityRef;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single status fetch that did not produce a usable status.
///
/// Always retryable from the poller's point of view.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("HTTP {code}: {body}")]
    HttpStatus { code: u16, body: String },

    #[error("undecodable response: {0}")]
    Decode(String),

    #[error("request rejected by server: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Terminal, non-successful outcome of a wait call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("{entity} failed: {message}")]
    RemoteFailure { entity: EntityRef, message: String },

    #[error("timed out after {elapsed:?} waiting for {entity} (last status: {})", .last_status.as_deref().unwrap_or("none"))]
    TimedOut {
        entity: EntityRef,
        elapsed: Duration,
        last_status: Option<String>,
    },

    #[error("gave up on {entity} after {attempts} consecutive transport errors: {last_error}")]
    TransportExhausted {
        entity: EntityRef,
        attempts: u32,
        last_error: TransportError,
    },
}

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("API error on {endpoint}: {message}")]
    Api { endpoint: String, message: String },

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error(transparent)]
    Common(#[from] deckgen_common::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
