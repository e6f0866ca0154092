//! ReportDeliveryClient 端到端测试 - wiremock 模拟 Mission Control

use agent_timeline_monitor::agent::{AgentState, AgentStatus};
use agent_timeline_monitor::delivery::{DeliveryConfig, ReportDeliveryClient, PROTOCOL_VERSION};
use agent_timeline_monitor::error::{AttemptFailure, DeliveryError};
use agent_timeline_monitor::timeline::{AgentStates, TimelineReport};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn report() -> TimelineReport {
    TimelineReport {
        generated_at: DateTime::parse_from_rfc3339("2025-10-20T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc),
        session_name: "miyabi-refactor".to_string(),
        agent_states: AgentStates::from_agents(vec![AgentStatus {
            agent_id: "codegen".to_string(),
            name: "CodeGenAgent".to_string(),
            emoji: "💻".to_string(),
            state: AgentState::Run,
            last_activity: None,
        }]),
        recent_events: Vec::new(),
        recent_completions: Vec::new(),
        conductor_status: None,
    }
}

fn config(server: &MockServer, retries: u32) -> DeliveryConfig {
    DeliveryConfig {
        base_url: server.uri(),
        token: Some("mc-secret".to_string()),
        retries,
        retry_delay: Duration::from_millis(5),
        backoff_multiplier: 2.0,
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_posts_payload_with_bearer_token() {
    // Given
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/timeline/events"))
        .and(header("authorization", "Bearer mc-secret"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "ok",
            "stored": true,
            "path": "timeline/2025-10-20.jsonl"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let client = ReportDeliveryClient::new(config(&server, 3)).unwrap();

    // When
    let result = client.send_timeline(&report(), true).await.unwrap();

    // Then
    assert_eq!(result.status, "ok");
    assert!(result.stored);

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["session_name"], "miyabi-refactor");
    assert_eq!(body["generated_at"], "2025-10-20T09:30:00.000Z");
    assert_eq!(body["persisted_locally"], true);
    assert_eq!(body["version"], PROTOCOL_VERSION);
    assert_eq!(body["agent_states"]["agents"][0]["state"], "RUN");
}

#[tokio::test]
async fn test_no_authorization_header_without_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/timeline/events"))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"status":"ok","stored":false}"#))
        .mount(&server)
        .await;
    let mut cfg = config(&server, 0);
    cfg.token = None;

    ReportDeliveryClient::new(cfg)
        .unwrap()
        .send_timeline(&report(), false)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_non_json_error_body_after_retries() {
    // Given: 始终返回 HTML 502
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/timeline/events"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<h1>Bad Gateway</h1>"))
        .expect(3)
        .mount(&server)
        .await;
    let client = ReportDeliveryClient::new(config(&server, 2)).unwrap();

    // When
    let err = client.send_timeline(&report(), false).await.unwrap_err();

    // Then: 1 + 2 次重试，错误保留原始文本
    match err {
        DeliveryError::Exhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert_eq!(
                last,
                AttemptFailure::Http {
                    status: 502,
                    body: "<h1>Bad Gateway</h1>".to_string()
                }
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_recovers_after_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/timeline/events"))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({"error": "busy"})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/timeline/events"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"ok","stored":true}"#))
        .expect(1)
        .mount(&server)
        .await;
    let client = ReportDeliveryClient::new(config(&server, 3)).unwrap();

    let result = client.send_timeline(&report(), false).await.unwrap();

    assert!(result.stored);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_unreachable_server_is_network_failure() {
    // 绑定后立即释放，得到一个无人监听的端口
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let uri = format!("http://127.0.0.1:{}", port);
    let client = ReportDeliveryClient::new(DeliveryConfig {
        base_url: uri,
        token: None,
        retries: 1,
        retry_delay: Duration::ZERO,
        backoff_multiplier: 2.0,
        timeout: Duration::from_secs(2),
    })
    .unwrap();

    let err = client.send_timeline(&report(), false).await.unwrap_err();

    assert!(matches!(
        err,
        DeliveryError::Exhausted {
            attempts: 2,
            last: AttemptFailure::Network(_)
        }
    ));
}
