//! Control-plane tests against the real axum server with an in-process fake bridge

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use mcpd::bridge::{ProtocolBridge, ToolInfo};
use mcpd::content::{format_result, ToolCallResult};
use mcpd::daemon::{server, ClientError, ConnectionState, DaemonClient, DaemonState};
use mcpd::session::{Session, SessionStatus, StatePaths, Supervisor};

// 1x1 transparent PNG
const PNG_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

struct FakeBridge;

#[async_trait]
impl ProtocolBridge for FakeBridge {
    async fn list_capabilities(&self) -> Result<Vec<ToolInfo>> {
        Ok(vec![
            ToolInfo {
                name: "echo".to_string(),
                description: Some("Echo the message back".to_string()),
                input_schema: Some(json!({
                    "type": "object",
                    "properties": {"message": {"type": "string"}}
                })),
            },
            ToolInfo {
                name: "screenshot".to_string(),
                description: None,
                input_schema: None,
            },
        ])
    }

    async fn invoke(&self, name: &str, arguments: Map<String, Value>) -> Result<Value> {
        match name {
            "echo" => Ok(json!({
                "content": [{"type": "text", "text": arguments.get("message").cloned().unwrap_or(Value::Null)}]
            })),
            "screenshot" => Ok(json!({
                "content": [{"type": "image", "data": PNG_B64, "mimeType": "image/png"}]
            })),
            "fail" => Ok(json!({
                "content": [{"type": "text", "text": "boom"}],
                "isError": true
            })),
            "slow" => {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Ok(json!({"content": [{"type": "text", "text": "done"}]}))
            }
            other => bail!("unknown tool: {}", other),
        }
    }
}

struct TestDaemon {
    port: u16,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestDaemon {
    async fn start(state: DaemonState) -> Self {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            server::serve(listener, state, async move {
                let _ = rx.await;
            })
            .await
            .unwrap();
        });
        Self {
            port,
            shutdown: Some(tx),
        }
    }

    async fn connected() -> Self {
        let bridge: Arc<dyn ProtocolBridge> = Arc::new(FakeBridge);
        Self::start(DaemonState::new(
            "dev",
            ConnectionState::connected("fake"),
            Some(bridge),
        ))
        .await
    }

    fn client(&self) -> DaemonClient {
        DaemonClient::new(self.port)
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

#[tokio::test]
async fn test_status_reports_connection() {
    let daemon = TestDaemon::connected().await;
    let status = daemon.client().status().await.unwrap();
    assert!(status.connected);
    assert_eq!(status.server, "fake");
    assert_eq!(status.session, "dev");
    assert!(status.last_error.is_none());
}

#[tokio::test]
async fn test_tools_lists_capabilities() {
    let daemon = TestDaemon::connected().await;
    let tools = daemon.client().tools().await.unwrap().tools;
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["echo", "screenshot"]);
    assert!(tools[0].input_schema.is_some());
}

#[tokio::test]
async fn test_call_echo() {
    let daemon = TestDaemon::connected().await;
    let mut args = Map::new();
    args.insert("message".to_string(), json!("hello"));

    let raw = daemon.client().call("echo", args).await.unwrap();
    let result: ToolCallResult = serde_json::from_value(raw).unwrap();
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(format_result(&result, dir.path()).unwrap(), "hello");
}

#[tokio::test]
async fn test_call_image_is_materialized() {
    let daemon = TestDaemon::connected().await;
    let raw = daemon.client().call("screenshot", Map::new()).await.unwrap();
    let result: ToolCallResult = serde_json::from_value(raw).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let output = format_result(&result, dir.path()).unwrap();
    assert!(output.contains(".png"));
    assert!(!output.contains(PNG_B64));

    let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(files.len(), 1);
    let bytes = std::fs::read(files[0].as_ref().unwrap().path()).unwrap();
    assert_eq!(&bytes[..4], b"\x89PNG");
}

#[tokio::test]
async fn test_call_error_result_is_passed_through() {
    let daemon = TestDaemon::connected().await;
    let raw = daemon.client().call("fail", Map::new()).await.unwrap();
    assert_eq!(raw["isError"], true);

    let result: ToolCallResult = serde_json::from_value(raw).unwrap();
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(format_result(&result, dir.path()).unwrap(), "Error: boom");
}

#[tokio::test]
async fn test_bridge_failure_is_500() {
    let daemon = TestDaemon::connected().await;
    let err = daemon.client().call("missing", Map::new()).await.unwrap_err();
    match err {
        ClientError::Daemon { status, message } => {
            assert_eq!(status.as_u16(), 500);
            assert!(message.contains("unknown tool: missing"));
        }
        other => panic!("expected daemon error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_not_connected_is_503() {
    let daemon = TestDaemon::start(DaemonState::new(
        "dev",
        ConnectionState::failed("fake", "command not found"),
        None,
    ))
    .await;
    let client = daemon.client();

    let status = client.status().await.unwrap();
    assert!(!status.connected);
    assert_eq!(status.last_error.as_deref(), Some("command not found"));

    let err = client.tools().await.unwrap_err();
    assert!(err.is_unavailable());
    let err = client.call("echo", Map::new()).await.unwrap_err();
    assert!(err.is_unavailable());
    assert!(err.to_string().contains("command not found"));
}

#[tokio::test]
async fn test_status_responsive_during_slow_call() {
    let daemon = TestDaemon::connected().await;
    let client = daemon.client();

    let slow_client = client.clone();
    let slow = tokio::spawn(async move { slow_client.call("slow", Map::new()).await });
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = Instant::now();
    client.status().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));

    let raw = slow.await.unwrap().unwrap();
    assert_eq!(raw["content"][0]["text"], "done");
}

#[cfg(unix)]
#[tokio::test]
async fn test_supervisor_status_running() {
    let daemon = TestDaemon::connected().await;
    let dir = tempfile::tempdir().unwrap();
    let supervisor = Supervisor::new(StatePaths::for_working_dir(dir.path()), 8940);
    supervisor
        .registry()
        .set("dev", Session::new(std::process::id(), daemon.port))
        .unwrap();

    match supervisor.status("dev").await.unwrap() {
        SessionStatus::Running { session, daemon: status } => {
            assert_eq!(session.port, daemon.port);
            assert!(status.connected);
        }
        other => panic!("expected Running, got {:?}", other),
    }
}
