//! Tests for the desired-channel sync agent.
//!
//! A small recording server stands in for the control service; a scripted
//! attribute source stands in for the world entity. Passes are driven by
//! calling `tick` directly, so outcomes are independent of wall-clock
//! timing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};

use voicegate::error::AttributeError;
use voicegate::sync::{AgentState, AttributeSource, FileAttributeSource, SyncAgent};

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("recorder lock").clone()
    }
}

async fn record(
    State(rec): State<Recorder>,
    Path((command, id)): Path<(String, String)>,
) -> &'static str {
    rec.calls
        .lock()
        .expect("recorder lock")
        .push(format!("{command} {id}"));
    "OK"
}

async fn start_recorder() -> (SocketAddr, Recorder) {
    let rec = Recorder::default();
    let app = Router::new()
        .route("/secret/{command}/{id}", get(record))
        .with_state(rec.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (addr, rec)
}

#[derive(Default)]
struct TestSource {
    value: Mutex<Option<String>>,
    unreadable: Mutex<bool>,
}

impl TestSource {
    fn set(&self, value: Option<&str>) {
        *self.value.lock().expect("source lock") = value.map(str::to_string);
    }

    fn set_unreadable(&self) {
        *self.unreadable.lock().expect("source lock") = true;
    }
}

#[async_trait::async_trait]
impl AttributeSource for TestSource {
    async fn desired_channel(&self) -> Result<Option<String>, AttributeError> {
        if *self.unreadable.lock().expect("source lock") {
            return Err(AttributeError {
                reason: "entity gone".to_string(),
            });
        }
        Ok(self.value.lock().expect("source lock").clone())
    }
}

fn agent_for(addr: SocketAddr, source: &Arc<TestSource>) -> SyncAgent {
    SyncAgent::new(
        format!("http://{addr}/secret/CREATE_CHANNEL/"),
        format!("http://{addr}/secret/REMOVE_CHANNEL/"),
        Duration::from_millis(10),
        Arc::clone(source) as Arc<dyn AttributeSource>,
    )
}

#[tokio::test]
async fn agent_converges_on_attribute_changes() {
    let (addr, rec) = start_recorder().await;
    let source = Arc::new(TestSource::default());
    let mut agent = agent_for(addr, &source);

    // Attribute unset: passes do nothing.
    agent.tick().await;
    assert_eq!(agent.state(), &AgentState::Idle);
    assert!(rec.calls().is_empty());

    source.set(Some("5"));
    agent.tick().await;
    agent.tick().await; // stable value, no extra traffic
    assert_eq!(rec.calls(), ["CREATE_CHANNEL 5"]);

    source.set(Some("7"));
    agent.tick().await;
    agent.tick().await;
    assert_eq!(
        rec.calls(),
        ["CREATE_CHANNEL 5", "REMOVE_CHANNEL 5", "CREATE_CHANNEL 7"]
    );
    assert_eq!(
        agent.state(),
        &AgentState::Active {
            cleanup_url: format!("http://{addr}/secret/REMOVE_CHANNEL/7"),
        }
    );
}

#[tokio::test]
async fn unreadable_attribute_destroys_and_cleans_up() {
    let (addr, rec) = start_recorder().await;
    let source = Arc::new(TestSource::default());
    let mut agent = agent_for(addr, &source);

    source.set(Some("9"));
    agent.tick().await;
    assert_eq!(rec.calls(), ["CREATE_CHANNEL 9"]);

    source.set_unreadable();
    agent.tick().await;
    assert!(agent.is_destroyed());
    assert_eq!(rec.calls(), ["CREATE_CHANNEL 9", "REMOVE_CHANNEL 9"]);

    // Terminal: further passes are inert.
    agent.tick().await;
    assert_eq!(rec.calls().len(), 2);
}

#[tokio::test]
async fn destroy_removes_the_tracked_channel_once() {
    let (addr, rec) = start_recorder().await;
    let source = Arc::new(TestSource::default());
    let mut agent = agent_for(addr, &source);

    source.set(Some("3"));
    agent.tick().await;

    agent.destroy().await;
    agent.destroy().await;

    assert!(agent.is_destroyed());
    assert_eq!(rec.calls(), ["CREATE_CHANNEL 3", "REMOVE_CHANNEL 3"]);
}

#[tokio::test]
async fn destroy_without_a_tracked_channel_makes_no_calls() {
    let (addr, rec) = start_recorder().await;
    let source = Arc::new(TestSource::default());
    let mut agent = agent_for(addr, &source);

    agent.destroy().await;

    assert!(agent.is_destroyed());
    assert!(rec.calls().is_empty());
}

#[tokio::test]
async fn failed_control_call_leaves_state_for_retry() {
    let source = Arc::new(TestSource::default());
    source.set(Some("5"));
    // Nothing listens here; the create call fails and nothing is tracked.
    let mut agent = SyncAgent::new(
        "http://127.0.0.1:9/secret/CREATE_CHANNEL/",
        "http://127.0.0.1:9/secret/REMOVE_CHANNEL/",
        Duration::from_millis(10),
        Arc::clone(&source) as Arc<dyn AttributeSource>,
    );

    agent.tick().await;
    assert_eq!(agent.state(), &AgentState::Idle);
}

#[tokio::test]
async fn file_source_reports_absence_and_reads_values() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("channel_id");
    let source = FileAttributeSource::new(&path);

    assert_eq!(source.desired_channel().await.expect("read"), None);

    tokio::fs::write(&path, "42\n").await.expect("write");
    assert_eq!(
        source.desired_channel().await.expect("read"),
        Some("42".to_string())
    );

    tokio::fs::write(&path, "").await.expect("write");
    assert_eq!(source.desired_channel().await.expect("read"), None);
}

#[tokio::test]
async fn file_source_errors_when_the_path_is_unreadable() {
    let dir = tempfile::tempdir().expect("tempdir");
    // A directory cannot be read as a value file.
    let source = FileAttributeSource::new(dir.path());
    assert!(source.desired_channel().await.is_err());
}
