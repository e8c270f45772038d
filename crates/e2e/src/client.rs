//! HTTP client for the deck API

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use deckgen_common::{
    ApiEnvelope, CreateProjectRequest, EntityRef, ExportLink, Project, StatusPayload,
    StatusReport, Task, TaskHandle,
};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult, TransportError};
use crate::poller::StatusFetch;

/// Client for the deck REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> E2eResult<Self> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Resolve a possibly relative download link against the base URL
    pub fn resolve(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else if link.starts_with('/') {
            self.url(link)
        } else {
            format!("{}/{}", self.base_url, link)
        }
    }

    /// Single probe of `/health`
    pub async fn health(&self) -> bool {
        match self.http.get(self.url("/health")).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Wait for the API to respond to health checks
    pub async fn wait_for_healthy(&self, timeout_duration: Duration) -> E2eResult<()> {
        let health_url = self.url("/health");
        let start = Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match self.http.get(&health_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!("API is healthy at {}", self.base_url);
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for API at {}...", self.base_url);
                    }
                    // Connection refused is expected while the server is starting
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(500)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    /// Send a request and unwrap the response envelope.
    ///
    /// Transport-level failures come back as `TransportError`, so the same
    /// path serves the poller (which retries them) and one-shot calls.
    async fn call<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.http.request(method.clone(), self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!("{} {}", method, path);
        let resp = request.send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::HttpStatus {
                code: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        let envelope: ApiEnvelope<T> = resp.json().await?;
        envelope.into_data().map_err(TransportError::Rejected)
    }

    async fn api<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> E2eResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(method.clone(), path, body)
            .await
            .map_err(|e| E2eError::Api {
                endpoint: format!("{} {}", method, path),
                message: e.to_string(),
            })
    }

    pub async fn create_project(&self, request: &CreateProjectRequest) -> E2eResult<Project> {
        let project: Project = self
            .api(Method::POST, "/api/projects", Some(request))
            .await?;
        info!("Created project {}", project.project_id);
        Ok(project)
    }

    pub async fn get_project(&self, project_id: &str) -> E2eResult<Project> {
        self.api::<(), _>(Method::GET, &format!("/api/projects/{}", project_id), None)
            .await
    }

    pub async fn delete_project(&self, project_id: &str) -> E2eResult<()> {
        let path = format!("/api/projects/{}", project_id);
        let resp = self.http.delete(self.url(&path)).send().await?;
        match resp.status() {
            s if s.is_success() || s == StatusCode::NOT_FOUND => {
                info!("Deleted project {}", project_id);
                Ok(())
            }
            s => Err(E2eError::Api {
                endpoint: format!("DELETE {}", path),
                message: format!("HTTP {}", s.as_u16()),
            }),
        }
    }

    /// Start outline generation; the project moves to `OUTLINE_GENERATED` when done
    pub async fn generate_outline(&self, project_id: &str) -> E2eResult<()> {
        let path = format!("/api/projects/{}/generate/outline", project_id);
        let _: serde_json::Value = self.api::<(), _>(Method::POST, &path, None).await?;
        Ok(())
    }

    pub async fn generate_descriptions(&self, project_id: &str) -> E2eResult<TaskHandle> {
        let path = format!("/api/projects/{}/generate/descriptions", project_id);
        self.api::<(), _>(Method::POST, &path, None).await
    }

    pub async fn generate_images(&self, project_id: &str) -> E2eResult<TaskHandle> {
        let path = format!("/api/projects/{}/generate/images", project_id);
        self.api::<(), _>(Method::POST, &path, None).await
    }

    pub async fn get_task(&self, project_id: &str, task_id: &str) -> E2eResult<Task> {
        let path = format!("/api/projects/{}/tasks/{}", project_id, task_id);
        self.api::<(), _>(Method::GET, &path, None).await
    }

    pub async fn export_pptx(&self, project_id: &str) -> E2eResult<ExportLink> {
        let path = format!("/api/projects/{}/export/pptx", project_id);
        self.api::<(), _>(Method::GET, &path, None).await
    }

    /// Download `link` to `dest`, returning the number of bytes written
    pub async fn download(&self, link: &str, dest: &Path) -> E2eResult<u64> {
        let url = self.resolve(link);
        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(E2eError::Api {
                endpoint: format!("GET {}", url),
                message: format!("HTTP {}", resp.status().as_u16()),
            });
        }

        let bytes = resp.bytes().await?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &bytes).await?;

        info!("Downloaded {} bytes to {}", bytes.len(), dest.display());
        Ok(bytes.len() as u64)
    }
}

#[async_trait]
impl StatusFetch for ApiClient {
    async fn fetch_status(&self, entity: &EntityRef) -> Result<StatusReport, TransportError> {
        let path = match entity {
            EntityRef::Project { project_id } => format!("/api/projects/{}", project_id),
            EntityRef::Task {
                project_id,
                task_id,
            } => format!("/api/projects/{}/tasks/{}", project_id, task_id),
        };
        let payload: StatusPayload = self.call::<(), _>(Method::GET, &path, None).await?;
        Ok(payload.into())
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
