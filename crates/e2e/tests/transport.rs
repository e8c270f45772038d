//! HTTP status transport tests
//!
//! Runs the API client against the in-process fake API and checks how each
//! kind of response is classified for the poller.

mod support;

use std::time::Duration;

use deckgen_common::{CreateProjectRequest, EntityRef};
use deckgen_e2e::{ApiClient, ManualClock, PollOutcome, Poller, StatusFetch, TransportError};
use support::FakeApi;

fn client(base_url: &str) -> ApiClient {
    ApiClient::new(base_url, Duration::from_secs(5)).unwrap()
}

async fn new_project(client: &ApiClient) -> String {
    client
        .create_project(&CreateProjectRequest {
            creation_type: "idea".to_string(),
            idea_prompt: "Rust for infrastructure teams".to_string(),
        })
        .await
        .unwrap()
        .project_id
}

#[tokio::test]
async fn fetches_project_status() {
    let (base_url, _state) = support::spawn(FakeApi::default()).await;
    let client = client(&base_url);
    let project_id = new_project(&client).await;

    let report = client
        .fetch_status(&EntityRef::project(&project_id))
        .await
        .unwrap();

    assert_eq!(report.status, "DRAFT");
    assert!(report.error.is_none());
}

#[tokio::test]
async fn task_error_message_is_extracted() {
    let (base_url, state) = support::spawn(FakeApi {
        polls_until_done: 1,
        failing_task: Some("images".to_string()),
        ..Default::default()
    })
    .await;
    let client = client(&base_url);
    let project_id = new_project(&client).await;
    let handle = client.generate_images(&project_id).await.unwrap();

    let report = client
        .fetch_status(&EntityRef::task(&project_id, &handle.task_id))
        .await
        .unwrap();

    assert!(report.is_failed());
    assert_eq!(report.failure_message(), "images generation quota exceeded");
    assert_eq!(state.lock().status_reads, 1);
}

#[tokio::test]
async fn http_errors_are_transport_errors() {
    let (base_url, _state) = support::spawn(FakeApi {
        flaky_reads: 1,
        ..Default::default()
    })
    .await;
    let client = client(&base_url);
    let project_id = new_project(&client).await;

    let err = client
        .fetch_status(&EntityRef::project(&project_id))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        TransportError::HttpStatus {
            code: 503,
            body: "upstream busy".to_string()
        }
    );
}

#[tokio::test]
async fn unknown_entity_is_a_transport_error() {
    let (base_url, _state) = support::spawn(FakeApi::default()).await;
    let client = client(&base_url);

    let err = client
        .fetch_status(&EntityRef::project("proj-missing"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::HttpStatus { code: 404, .. }));
}

#[tokio::test]
async fn undecodable_body_is_a_transport_error() {
    let (base_url, state) = support::spawn(FakeApi::default()).await;
    let client = client(&base_url);
    let project_id = new_project(&client).await;
    state.lock().garbage_reads = true;

    let err = client
        .fetch_status(&EntityRef::project(&project_id))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Decode(_)), "got {:?}", err);
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    // Bind then drop to get a port nothing listens on
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = client(&format!("http://127.0.0.1:{}", port));

    let err = client
        .fetch_status(&EntityRef::project("p1"))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Request(_)), "got {:?}", err);
    assert!(!client.health().await);
}

#[tokio::test]
async fn poller_rides_out_transient_http_errors() {
    let (base_url, state) = support::spawn(FakeApi {
        polls_until_done: 1,
        ..Default::default()
    })
    .await;
    let client = client(&base_url);
    let project_id = new_project(&client).await;
    let handle = client.generate_descriptions(&project_id).await.unwrap();
    state.lock().flaky_reads = 2;

    let clock = ManualClock::new();
    let poller = Poller::with_clock(client, clock.clone());
    let outcome = poller
        .await_task_completion(&project_id, &handle.task_id, Duration::from_secs(120))
        .await;

    assert!(outcome.is_reached(), "got {:?}", outcome);
    assert_eq!(state.lock().status_reads, 3);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(6), Duration::from_secs(6)]);
}

#[tokio::test]
async fn poller_gives_up_when_server_keeps_failing() {
    let (base_url, state) = support::spawn(FakeApi::default()).await;
    let client = client(&base_url);
    let project_id = new_project(&client).await;
    state.lock().flaky_reads = 10;

    let poller = Poller::with_clock(client, ManualClock::new());
    let outcome = poller
        .await_status(
            &EntityRef::project(&project_id),
            "OUTLINE_GENERATED",
            Duration::from_secs(300),
        )
        .await;

    match outcome {
        PollOutcome::TransportExhausted { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected transport exhaustion, got {:?}", other),
    }
    assert_eq!(state.lock().status_reads, 3);
}
