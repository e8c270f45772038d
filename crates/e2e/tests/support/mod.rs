//! In-process fake of the deck API for integration tests
//!
//! Projects and tasks advance one step per status read, so tests control
//! convergence by counting polls instead of waiting.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

pub type Shared = Arc<Mutex<FakeApi>>;

#[derive(Debug, Default)]
pub struct FakeProject {
    pub status: String,
    pub outline_requested: bool,
    pub polls: u32,
}

#[derive(Debug)]
pub struct FakeTask {
    pub kind: String,
    pub polls: u32,
}

/// Behaviour knobs and recorded traffic
#[derive(Debug)]
pub struct FakeApi {
    pub projects: HashMap<String, FakeProject>,
    pub tasks: HashMap<String, FakeTask>,
    pub next_id: u32,
    /// Status reads before a project or task converges
    pub polls_until_done: u32,
    /// Tasks of this kind end in FAILED
    pub failing_task: Option<String>,
    /// Next N status reads answer 503
    pub flaky_reads: u32,
    /// Status reads answer 200 with a non-JSON body
    pub garbage_reads: bool,
    pub status_reads: u32,
    pub deleted: Vec<String>,
    pub deck: Vec<u8>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            projects: HashMap::new(),
            tasks: HashMap::new(),
            next_id: 1,
            polls_until_done: 2,
            failing_task: None,
            flaky_reads: 0,
            garbage_reads: false,
            status_reads: 0,
            deleted: Vec::new(),
            deck: build_deck(&["Rust at Scale", "Ownership and Borrowing", "Questions"]),
        }
    }
}

fn ok(data: Value) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": format!("{} not found", what) })),
    )
        .into_response()
}

/// Shared pre-checks for status reads; returns a response to short-circuit
fn status_read_fault(api: &mut FakeApi) -> Option<Response> {
    api.status_reads += 1;
    if api.flaky_reads > 0 {
        api.flaky_reads -= 1;
        return Some((StatusCode::SERVICE_UNAVAILABLE, "upstream busy").into_response());
    }
    if api.garbage_reads {
        return Some((StatusCode::OK, "<html>gateway</html>").into_response());
    }
    None
}

async fn health() -> impl IntoResponse {
    "ok"
}

async fn create_project(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut api = state.lock();
    if body.get("idea_prompt").and_then(Value::as_str).unwrap_or("").is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "idea_prompt is required" })),
        )
            .into_response();
    }

    let id = format!("proj-{}", api.next_id);
    api.next_id += 1;
    api.projects.insert(
        id.clone(),
        FakeProject {
            status: "DRAFT".to_string(),
            ..Default::default()
        },
    );
    ok(json!({ "project_id": id, "status": "DRAFT", "idea_prompt": body["idea_prompt"] }))
}

async fn get_project(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut api = state.lock();
    if let Some(fault) = status_read_fault(&mut api) {
        return fault;
    }

    let until = api.polls_until_done;
    let Some(project) = api.projects.get_mut(&id) else {
        return not_found("project");
    };
    if project.outline_requested && project.status != "OUTLINE_GENERATED" {
        project.polls += 1;
        project.status = if project.polls >= until {
            "OUTLINE_GENERATED".to_string()
        } else {
            "GENERATING_OUTLINE".to_string()
        };
    }
    ok(json!({ "project_id": id, "status": project.status, "pages": [] }))
}

async fn delete_project(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut api = state.lock();
    match api.projects.remove(&id) {
        Some(_) => {
            api.deleted.push(id);
            ok(json!({}))
        }
        None => not_found("project"),
    }
}

async fn generate_outline(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let mut api = state.lock();
    match api.projects.get_mut(&id) {
        Some(project) => {
            project.outline_requested = true;
            ok(json!({ "message": "outline generation started" }))
        }
        None => not_found("project"),
    }
}

fn start_task(state: &Shared, id: &str, kind: &str) -> Response {
    let mut api = state.lock();
    if !api.projects.contains_key(id) {
        return not_found("project");
    }
    let task_id = format!("task-{}", api.next_id);
    api.next_id += 1;
    api.tasks.insert(
        task_id.clone(),
        FakeTask {
            kind: kind.to_string(),
            polls: 0,
        },
    );
    ok(json!({ "task_id": task_id }))
}

async fn generate_descriptions(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    start_task(&state, &id, "descriptions")
}

async fn generate_images(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    start_task(&state, &id, "images")
}

async fn get_task(
    State(state): State<Shared>,
    Path((_project_id, task_id)): Path<(String, String)>,
) -> Response {
    let mut api = state.lock();
    if let Some(fault) = status_read_fault(&mut api) {
        return fault;
    }

    let until = api.polls_until_done;
    let failing = api.failing_task.clone();
    let Some(task) = api.tasks.get_mut(&task_id) else {
        return not_found("task");
    };
    task.polls += 1;

    if task.polls < until {
        return ok(json!({ "task_id": task_id, "status": "PROCESSING", "progress": { "completed": task.polls } }));
    }
    if failing.as_deref() == Some(task.kind.as_str()) {
        return ok(json!({
            "task_id": task_id,
            "status": "FAILED",
            "error_message": format!("{} generation quota exceeded", task.kind)
        }));
    }
    ok(json!({ "task_id": task_id, "status": "COMPLETED" }))
}

async fn export_pptx(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let api = state.lock();
    if !api.projects.contains_key(&id) {
        return not_found("project");
    }
    ok(json!({ "download_url": format!("/files/{}/deck.pptx", id) }))
}

async fn download(State(state): State<Shared>, Path(_id): Path<String>) -> Response {
    let api = state.lock();
    (StatusCode::OK, api.deck.clone()).into_response()
}

pub fn router(state: Shared) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/projects", post(create_project))
        .route("/api/projects/:id", get(get_project).delete(delete_project))
        .route("/api/projects/:id/generate/outline", post(generate_outline))
        .route("/api/projects/:id/generate/descriptions", post(generate_descriptions))
        .route("/api/projects/:id/generate/images", post(generate_images))
        .route("/api/projects/:id/tasks/:task_id", get(get_task))
        .route("/api/projects/:id/export/pptx", get(export_pptx))
        .route("/files/:id/deck.pptx", get(download))
        .with_state(state)
}

/// Serve the fake API on an ephemeral port; returns its base URL
pub async fn spawn(api: FakeApi) -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(api));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

/// Minimal `.pptx` package with one text shape per slide
pub fn build_deck(slides: &[&str]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);

    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(format!("<Types>{}</Types>", " ".repeat(1200)).as_bytes())
        .unwrap();
    zip.start_file("ppt/presentation.xml", options).unwrap();
    zip.write_all(b"<p:presentation/>").unwrap();

    for (i, text) in slides.iter().enumerate() {
        zip.start_file(format!("ppt/slides/slide{}.xml", i + 1), options)
            .unwrap();
        zip.write_all(
            format!(
                "<p:sld><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>",
                text
            )
            .as_bytes(),
        )
        .unwrap();
    }

    zip.finish().unwrap().into_inner()
}
