//! Convergence poller
//!
//! Waits for a remote entity (a project or one of its tasks) to reach a
//! target status by polling its status endpoint.
//!
//! ```text
//!            ┌──────────── pending: sleep(interval), grow after grace ─┐
//!            │                                                         │
//!            ▼                                                         │
//!   ──▶  Polling ──fetch──▶ status == FAILED ──────────▶ Failed        │
//!         │   ▲             status == target ──────────▶ Succeeded     │
//!         │   │             other ─────────────────────────────────────┘
//!         │   └─ transport error (< 3 in a row): sleep(2 × interval)
//!         ├──── transport error (3 in a row) ──────────▶ TransportExhausted
//!         └──── budget spent ──────────────────────────▶ TimedOut
//! ```
//!
//! The transitions live in [`WaitSession`], which never touches a timer; the
//! [`Poller`] feeds it observations and performs the sleeps it asks for
//! through an injected [`Clock`].

use std::time::Duration;

use async_trait::async_trait;
use deckgen_common::{EntityRef, StatusReport, STATUS_COMPLETED};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{Clock, TokioClock};
use crate::error::{PollError, TransportError};

/// Consecutive transport errors after which a wait gives up
pub const MAX_CONSECUTIVE_ERRORS: u32 = 3;

/// Source of status observations for remote entities
#[async_trait]
pub trait StatusFetch: Send + Sync {
    async fn fetch_status(&self, entity: &EntityRef) -> Result<StatusReport, TransportError>;
}

/// Polling interval policy.
///
/// The interval stays at `initial` until `grace` has elapsed since the wait
/// began, then grows by `step` after every pending poll, never beyond `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cadence {
    #[serde(with = "millis")]
    pub initial: Duration,
    #[serde(with = "millis")]
    pub grace: Duration,
    #[serde(with = "millis")]
    pub step: Duration,
    #[serde(with = "millis")]
    pub max: Duration,
}

impl Cadence {
    /// Project status waits
    pub const STATUS: Cadence = Cadence {
        initial: Duration::from_secs(2),
        grace: Duration::from_secs(30),
        step: Duration::from_secs(1),
        max: Duration::from_secs(10),
    };

    /// Task completion waits
    pub const TASK: Cadence = Cadence {
        initial: Duration::from_secs(3),
        grace: Duration::from_secs(60),
        step: Duration::from_secs(1),
        max: Duration::from_secs(10),
    };

    /// Interval to use after a pending poll, given total elapsed time
    pub fn next_interval(&self, current: Duration, elapsed: Duration) -> Duration {
        if elapsed > self.grace {
            (current + self.step).min(self.max)
        } else {
            current
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.initial.is_zero() {
            return Err("initial interval must be positive".to_string());
        }
        if self.max < self.initial {
            return Err(format!(
                "max interval {:?} is below initial interval {:?}",
                self.max, self.initial
            ));
        }
        Ok(())
    }
}

impl Default for Cadence {
    fn default() -> Self {
        Self::STATUS
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Result of one status fetch, as seen by the session
#[derive(Debug, Clone)]
pub enum Observation {
    Status(StatusReport),
    TransportError(TransportError),
}

impl From<Result<StatusReport, TransportError>> for Observation {
    fn from(result: Result<StatusReport, TransportError>) -> Self {
        match result {
            Ok(report) => Observation::Status(report),
            Err(e) => Observation::TransportError(e),
        }
    }
}

/// What the driver should do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Still pending: sleep, then report elapsed time via [`WaitSession::after_wait`]
    Wait(Duration),
    /// Transport hiccup: sleep, then poll again with the interval unchanged
    Backoff(Duration),
    Done(PollOutcome),
}

/// Terminal state of a wait call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PollOutcome {
    Reached(StatusReport),
    Failed {
        message: String,
    },
    TimedOut {
        #[serde(with = "millis")]
        elapsed: Duration,
        last_status: Option<String>,
    },
    TransportExhausted {
        attempts: u32,
        last_error: TransportError,
    },
}

impl PollOutcome {
    pub fn is_reached(&self) -> bool {
        matches!(self, PollOutcome::Reached(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            PollOutcome::Reached(_) => "succeeded",
            PollOutcome::Failed { .. } => "failed",
            PollOutcome::TimedOut { .. } => "timed_out",
            PollOutcome::TransportExhausted { .. } => "transport_exhausted",
        }
    }

    /// Convert into a `Result` so callers can use `?`
    pub fn into_result(self, entity: &EntityRef) -> Result<StatusReport, PollError> {
        match self {
            PollOutcome::Reached(report) => Ok(report),
            PollOutcome::Failed { message } => Err(PollError::RemoteFailure {
                entity: entity.clone(),
                message,
            }),
            PollOutcome::TimedOut {
                elapsed,
                last_status,
            } => Err(PollError::TimedOut {
                entity: entity.clone(),
                elapsed,
                last_status,
            }),
            PollOutcome::TransportExhausted {
                attempts,
                last_error,
            } => Err(PollError::TransportExhausted {
                entity: entity.clone(),
                attempts,
                last_error,
            }),
        }
    }
}

/// State of one wait call. Created per call and dropped when it returns.
#[derive(Debug, Clone)]
pub struct WaitSession {
    target: String,
    cadence: Cadence,
    interval: Duration,
    consecutive_errors: u32,
    last_status: Option<String>,
    fetches: u32,
}

impl WaitSession {
    pub fn new(target: impl Into<String>, cadence: Cadence) -> Self {
        Self {
            target: target.into(),
            interval: cadence.initial,
            cadence,
            consecutive_errors: 0,
            last_status: None,
            fetches: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn fetches(&self) -> u32 {
        self.fetches
    }

    pub fn last_status(&self) -> Option<&str> {
        self.last_status.as_deref()
    }

    /// Whether another poll may start at `elapsed`
    pub fn has_budget(elapsed: Duration, budget: Duration) -> bool {
        elapsed < budget
    }

    /// Feed one fetch result and decide the next step.
    ///
    /// A `FAILED` status is checked before the target, so a target of
    /// `FAILED` is reported as a remote failure.
    pub fn observe(&mut self, observation: Observation) -> Step {
        self.fetches += 1;

        match observation {
            Observation::TransportError(e) => {
                self.consecutive_errors += 1;
                if self.consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    return Step::Done(PollOutcome::TransportExhausted {
                        attempts: self.consecutive_errors,
                        last_error: e,
                    });
                }
                Step::Backoff(self.interval * 2)
            }
            Observation::Status(report) => {
                self.consecutive_errors = 0;
                self.last_status = Some(report.status.clone());

                if report.is_failed() {
                    Step::Done(PollOutcome::Failed {
                        message: report.failure_message(),
                    })
                } else if report.status == self.target {
                    Step::Done(PollOutcome::Reached(report))
                } else {
                    Step::Wait(self.interval)
                }
            }
        }
    }

    /// Account for a completed pending sleep
    pub fn after_wait(&mut self, elapsed: Duration) {
        self.interval = self.cadence.next_interval(self.interval, elapsed);
    }

    pub fn timed_out(&self, elapsed: Duration) -> PollOutcome {
        PollOutcome::TimedOut {
            elapsed,
            last_status: self.last_status.clone(),
        }
    }
}

/// Drives wait sessions against a status source
pub struct Poller<F, C = TokioClock> {
    fetcher: F,
    clock: C,
    status_cadence: Cadence,
    task_cadence: Cadence,
}

impl<F: StatusFetch> Poller<F, TokioClock> {
    pub fn new(fetcher: F) -> Self {
        Self::with_clock(fetcher, TokioClock::new())
    }
}

impl<F: StatusFetch, C: Clock> Poller<F, C> {
    pub fn with_clock(fetcher: F, clock: C) -> Self {
        Self {
            fetcher,
            clock,
            status_cadence: Cadence::STATUS,
            task_cadence: Cadence::TASK,
        }
    }

    pub fn with_cadences(mut self, status: Cadence, task: Cadence) -> Self {
        self.status_cadence = status;
        self.task_cadence = task;
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Wait until `entity` reports `target`. `target` must be non-empty.
    pub async fn await_status(
        &self,
        entity: &EntityRef,
        target: &str,
        budget: Duration,
    ) -> PollOutcome {
        debug_assert!(!target.is_empty(), "target status must be non-empty");
        self.converge(entity, target, self.status_cadence, budget).await
    }

    /// Wait until a task reports `COMPLETED`
    pub async fn await_task_completion(
        &self,
        project_id: &str,
        task_id: &str,
        budget: Duration,
    ) -> PollOutcome {
        let entity = EntityRef::task(project_id, task_id);
        self.converge(&entity, STATUS_COMPLETED, self.task_cadence, budget)
            .await
    }

    /// One extra fetch for diagnostics after a timeout. Never fails.
    pub async fn describe_timeout(&self, entity: &EntityRef) -> Option<StatusReport> {
        match self.fetcher.fetch_status(entity).await {
            Ok(report) => {
                warn!(
                    "{} still at status {} after timeout (error: {})",
                    entity,
                    report.status,
                    report.error.as_deref().unwrap_or("none")
                );
                Some(report)
            }
            Err(e) => {
                warn!("Could not fetch final status of {}: {}", entity, e);
                None
            }
        }
    }

    async fn converge(
        &self,
        entity: &EntityRef,
        target: &str,
        cadence: Cadence,
        budget: Duration,
    ) -> PollOutcome {
        let start = self.clock.now();
        let mut session = WaitSession::new(target, cadence);

        debug!("Waiting up to {:?} for {} to reach {}", budget, entity, target);

        loop {
            let elapsed = self.clock.now().saturating_sub(start);
            if !WaitSession::has_budget(elapsed, budget) {
                warn!(
                    "Timed out after {:?} waiting for {} to reach {} ({} polls)",
                    elapsed,
                    entity,
                    target,
                    session.fetches()
                );
                return session.timed_out(elapsed);
            }

            let observation = Observation::from(self.fetcher.fetch_status(entity).await);
            match &observation {
                Observation::Status(report) => {
                    debug!("{} status: {} (elapsed {:?})", entity, report.status, elapsed)
                }
                Observation::TransportError(e) => warn!(
                    "Status fetch for {} failed ({}/{}): {}",
                    entity,
                    session.consecutive_errors() + 1,
                    MAX_CONSECUTIVE_ERRORS,
                    e
                ),
            }

            match session.observe(observation) {
                Step::Done(outcome) => {
                    let elapsed = self.clock.now().saturating_sub(start);
                    match &outcome {
                        PollOutcome::Reached(_) => {
                            info!("{} reached {} after {:?}", entity, target, elapsed)
                        }
                        other => warn!("Wait for {} ended: {} after {:?}", entity, other.label(), elapsed),
                    }
                    return outcome;
                }
                Step::Backoff(delay) => self.clock.sleep(delay).await,
                Step::Wait(delay) => {
                    self.clock.sleep(delay).await;
                    session.after_wait(self.clock.now().saturating_sub(start));
                }
            }
        }
    }
}
