//! Core types for Deckgen

use serde::{Deserialize, Serialize};

/// Status value every observed entity uses to report a terminal failure
pub const STATUS_FAILED: &str = "FAILED";

/// Terminal success status for generation tasks
pub const STATUS_COMPLETED: &str = "COMPLETED";

/// Fallback message when a failed entity does not say why
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Well-known project statuses
pub mod project_status {
    pub const DRAFT: &str = "DRAFT";
    pub const OUTLINE_GENERATED: &str = "OUTLINE_GENERATED";
    pub const DESCRIPTIONS_GENERATED: &str = "DESCRIPTIONS_GENERATED";
    pub const COMPLETED: &str = "COMPLETED";
}

/// Well-known task statuses
pub mod task_status {
    pub const PENDING: &str = "PENDING";
    pub const PROCESSING: &str = "PROCESSING";
    pub const COMPLETED: &str = "COMPLETED";
    pub const FAILED: &str = "FAILED";
}

/// A remote resource whose status is observed, never owned
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityRef {
    Project { project_id: String },
    Task { project_id: String, task_id: String },
}

impl EntityRef {
    pub fn project(project_id: impl Into<String>) -> Self {
        Self::Project {
            project_id: project_id.into(),
        }
    }

    pub fn task(project_id: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self::Task {
            project_id: project_id.into(),
            task_id: task_id.into(),
        }
    }

    pub fn project_id(&self) -> &str {
        match self {
            EntityRef::Project { project_id } | EntityRef::Task { project_id, .. } => project_id,
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityRef::Project { project_id } => write!(f, "project {}", project_id),
            EntityRef::Task {
                project_id,
                task_id,
            } => write!(f, "task {} of project {}", task_id, project_id),
        }
    }
}

/// What a single status fetch observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusReport {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_FAILED.to_string(),
            error: Some(message.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == STATUS_FAILED
    }

    /// Remote-supplied failure reason, or the generic fallback
    pub fn failure_message(&self) -> String {
        self.error
            .clone()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
    }
}

/// The subset of a project or task payload the poller reads.
///
/// Projects and tasks name their error field differently, so both are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusPayload {
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl From<StatusPayload> for StatusReport {
    fn from(payload: StatusPayload) -> Self {
        Self {
            status: payload.status,
            error: payload.error.or(payload.error_message),
        }
    }
}

/// Response envelope used by every API endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            message: None,
        }
    }

    /// Unwrap the payload, or the server's explanation of why there is none
    pub fn into_data(self) -> std::result::Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err("response has no data".to_string()),
            (false, _) => Err(self
                .error
                .or(self.message)
                .unwrap_or_else(|| "request was not successful".to_string())),
        }
    }
}

/// Body of a project creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub creation_type: String,
    pub idea_prompt: String,
}

/// A slide page inside a project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub page_id: Option<String>,
    #[serde(default)]
    pub outline_content: Option<serde_json::Value>,
    #[serde(default)]
    pub description_content: Option<serde_json::Value>,
    #[serde(default)]
    pub generated_image_url: Option<String>,
}

/// A deck project as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,
    pub status: String,
    #[serde(default)]
    pub idea_prompt: Option<String>,
    #[serde(default)]
    pub pages: Vec<Page>,
}

/// An asynchronous generation task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub progress: Option<serde_json::Value>,
}

impl Task {
    pub fn status_report(&self) -> StatusReport {
        StatusReport {
            status: self.status.clone(),
            error: self.error.clone().or_else(|| self.error_message.clone()),
        }
    }
}

/// Returned by endpoints that start background work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskHandle {
    pub task_id: String,
}

/// Returned by the export endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportLink {
    pub download_url: String,
}
