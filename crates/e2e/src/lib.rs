//! Deckgen E2E Test Framework
//!
//! This crate drives the Deckgen slide generation API through its full
//! lifecycle and observes asynchronous server-side work by polling:
//! - Talks to the REST API with a typed client
//! - Waits for projects and tasks to converge with an adaptive poller
//! - Parses declarative YAML lifecycle scenarios
//! - Inspects the exported deck
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Lifecycle Runner (Rust)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  LifecycleRunner                                            │
//! │    ├── ApiClient (create / generate / export / download)    │
//! │    ├── Poller<ApiClient, Clock>                             │
//! │    │     ├── await_status(entity, target, budget)           │
//! │    │     └── await_task_completion(project, task, budget)   │
//! │    └── DeckInspector::inspect(deck, expectations)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (YAML)                                            │
//! │    ├── name, description, tags                              │
//! │    ├── project { creation_type, idea_prompt }               │
//! │    ├── stages: [outline, descriptions, images, export]      │
//! │    ├── timeouts { status_secs, task_secs }                  │
//! │    └── expect { min_slides, keywords }                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod poller;
pub mod runner;
pub mod scenario;

pub use client::ApiClient;
pub use clock::{Clock, ManualClock, TokioClock};
pub use config::HarnessConfig;
pub use error::{E2eError, E2eResult, PollError, TransportError};
pub use poller::{Cadence, PollOutcome, Poller, StatusFetch, WaitSession};
pub use runner::LifecycleRunner;
pub use scenario::{Scenario, Stage};
