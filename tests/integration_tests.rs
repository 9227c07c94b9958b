//! Integration tests for the LLM gateway and the analysis pipeline.
//! A minimal local HTTP server stands in for the chat-completions endpoint.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Duration;

use invest_advisor::bus::EventBus;
use invest_advisor::config::PipelineConfig;
use invest_advisor::data::store::AnalysisStore;
use invest_advisor::error::{LlmError, PipelineError};
use invest_advisor::events::Event;
use invest_advisor::llm::{LlmClient, LlmQueue};
use invest_advisor::models::{AnalysisRequest, AnalystKind, DecisionSummary, Market};
use invest_advisor::pipeline::AnalysisPipeline;

fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("invest_advisor_it_{}", uuid_like()))
}

// Unique-enough suffix without pulling a dev-dependency in
fn uuid_like() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}_{:?}", nanos, std::thread::current().id())
}

fn completion(content: &str) -> String {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
    .to_string()
}

fn api_error(message: &str) -> String {
    serde_json::json!({"error": {"message": message}}).to_string()
}

/// Serve the canned `(status, body)` responses in order on a fresh local
/// port, one connection per response, counting requests served.
async fn spawn_mock_llm(responses: Vec<(u16, String)>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        for (status, body) in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            read_request(&mut socket).await;

            let reason = match status {
                200 => "OK",
                429 => "Too Many Requests",
                500 => "Internal Server Error",
                503 => "Service Unavailable",
                _ => "Error",
            };
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{}", addr), hits)
}

async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if let Some(header_end) = find_subslice(&buf, b"\r\n\r\n") {
                    let headers = String::from_utf8_lossy(&buf[..header_end]);
                    let content_length = headers
                        .lines()
                        .filter_map(|line| line.split_once(':'))
                        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() - (header_end + 4) >= content_length {
                        break;
                    }
                }
            }
            Err(_) => break,
        }
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn test_client(base_url: &str) -> LlmClient {
    LlmClient::new(
        Some("sk-test".to_string()),
        Some(base_url.to_string()),
        "gpt-4o-mini".to_string(),
    )
    .with_backoff_base(Duration::from_millis(5))
}

fn sample_request() -> AnalysisRequest {
    AnalysisRequest {
        market: Market::Us,
        symbol: "AAPL".to_string(),
        date: "2025-06-01".to_string(),
        depth: 3,
        selected_agents: vec![AnalystKind::Technical, AnalystKind::Fundamental],
    }
}

// ============= Gateway Tests =============

#[tokio::test]
async fn test_gateway_returns_message_content() {
    let (base_url, hits) = spawn_mock_llm(vec![(200, completion("看多，評分：8"))]).await;
    let client = test_client(&base_url);

    let content = client.chat("system", "user").await.unwrap();
    assert_eq!(content, "看多，評分：8");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_gateway_missing_credential_is_configuration_error() {
    let (base_url, hits) = spawn_mock_llm(vec![]).await;
    let client = LlmClient::new(None, Some(base_url), "gpt-4o-mini".to_string());

    let err = client.chat("system", "user").await.unwrap_err();
    assert!(matches!(err, LlmError::Configuration));
    // Fails before any network I/O
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_gateway_rate_limit_exhausts_after_two_retries() {
    let (base_url, hits) = spawn_mock_llm(vec![
        (429, api_error("rate limited")),
        (429, api_error("rate limited")),
        (429, api_error("rate limited")),
    ])
    .await;
    let client = test_client(&base_url);

    let err = client.chat("system", "user").await.unwrap_err();
    assert!(matches!(err, LlmError::RateLimited { attempts: 3 }));
    // 1 initial attempt + exactly 2 retries
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_gateway_rate_limit_then_success() {
    let (base_url, hits) = spawn_mock_llm(vec![
        (429, api_error("rate limited")),
        (200, completion("恢復正常")),
    ])
    .await;
    let client = test_client(&base_url);

    let content = client.chat("system", "user").await.unwrap();
    assert_eq!(content, "恢復正常");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_gateway_backoff_formula() {
    let client = LlmClient::new(Some("sk-test".to_string()), None, "gpt-4o-mini".to_string());

    // 2^attempt * 2000ms: 2s before the first retry, 4s before the second
    assert_eq!(client.backoff_delay(0), Duration::from_millis(2000));
    assert_eq!(client.backoff_delay(1), Duration::from_millis(4000));
}

#[tokio::test]
async fn test_gateway_api_error_fails_immediately() {
    let (base_url, hits) = spawn_mock_llm(vec![(500, api_error("boom"))]).await;
    let client = test_client(&base_url);

    match client.chat("system", "user").await.unwrap_err() {
        LlmError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
    // No retry on non-429 HTTP errors
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_gateway_api_error_without_json_body() {
    let (base_url, _hits) = spawn_mock_llm(vec![(503, "gateway fell over".to_string())]).await;
    let client = test_client(&base_url);

    match client.chat("system", "user").await.unwrap_err() {
        LlmError::Api { status, message } => {
            assert_eq!(status, 503);
            // Falls back to the HTTP status text
            assert_eq!(message, "Service Unavailable");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_gateway_transport_failure_retries_then_fails() {
    // Grab a port, then close the listener so connections are refused
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = test_client(&base_url);
    let err = client.chat("system", "user").await.unwrap_err();
    assert!(matches!(err, LlmError::Transport(_)));
}

// ============= Queue Tests =============

#[tokio::test]
async fn test_queue_preserves_typed_errors() {
    let (base_url, _hits) = spawn_mock_llm(vec![
        (429, api_error("rate limited")),
        (429, api_error("rate limited")),
        (429, api_error("rate limited")),
    ])
    .await;
    let queue = LlmQueue::new(test_client(&base_url), 1, 8);

    let err = queue.chat_normal("system", "user").await.unwrap_err();
    assert!(matches!(err, LlmError::RateLimited { .. }));
}

#[tokio::test]
async fn test_queue_serves_sequentially() {
    let (base_url, hits) = spawn_mock_llm(vec![
        (200, completion("first")),
        (200, completion("second")),
    ])
    .await;
    let queue = LlmQueue::new(test_client(&base_url), 1, 8);

    let first = queue.chat_high("system", "one").await.unwrap();
    let second = queue.chat_normal("system", "two").await.unwrap();
    assert_eq!(first, "first");
    assert_eq!(second, "second");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

// ============= Pipeline Tests =============

fn build_pipeline(
    base_url: &str,
    store: &AnalysisStore,
    bus: &EventBus,
    api_key: Option<&str>,
) -> AnalysisPipeline {
    let client = LlmClient::new(
        api_key.map(|key| key.to_string()),
        Some(base_url.to_string()),
        "gpt-4o-mini".to_string(),
    )
    .with_backoff_base(Duration::from_millis(5));
    let queue = LlmQueue::new(client, 1, 16);
    let config = PipelineConfig {
        inter_call_delay_ms: 0,
    };
    AnalysisPipeline::new(queue, store.clone(), bus.clone(), &config)
}

#[tokio::test]
async fn test_pipeline_end_to_end() {
    let decision_text = format!(
        "最終決策如下：\n{}",
        serde_json::json!({
            "recommendation": "買入",
            "confidence": 85,
            "confidenceChange": 10,
            "riskScore": 45,
            "riskChange": -5,
            "targetPrice": "$230.00",
            "reasoning": "技術與基本面俱佳"
        })
    );
    let (base_url, hits) = spawn_mock_llm(vec![
        (200, completion("技術面強勁。評分：8")),
        (200, completion("基本面穩健，7/10")),
        (200, completion("看多論點")),
        (200, completion("看空論點")),
        (200, completion("風險中等")),
        (200, completion(&decision_text)),
    ])
    .await;

    let store = AnalysisStore::new(temp_dir(), 50);
    let bus = EventBus::new(64);
    let mut rx = bus.subscribe();
    let pipeline = build_pipeline(&base_url, &store, &bus, Some("sk-test"));

    let record = pipeline.run(sample_request()).await.unwrap();

    // Exactly one report per selected agent
    assert_eq!(record.agent_reports.len(), 2);
    assert!(record.agent_reports.contains_key(&AnalystKind::Technical));
    assert!(record.agent_reports.contains_key(&AnalystKind::Fundamental));

    // 2 agents + bull + bear + risk + decision
    assert_eq!(hits.load(Ordering::SeqCst), 6);

    // The documented scoring scenario
    assert_eq!(record.ai_score.technical, 8.0);
    assert_eq!(record.ai_score.fundamental, 7.0);
    assert_eq!(record.ai_score.sentiment, 5.0);
    assert_eq!(record.ai_score.overall, 6.7);

    assert_eq!(record.debate.bull_case, "看多論點");
    assert_eq!(record.debate.bear_case, "看空論點");
    assert_eq!(record.risk, "風險中等");

    let summary = DecisionSummary::parse(&record.decision).expect("decision embeds JSON");
    assert_eq!(summary.recommendation, "買入");

    // Persisted newest-first
    let history = store.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, record.id);

    // Progress checkpoints, in order
    let mut percents = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let Event::Progress(update) = event {
            percents.push(update.percent);
        }
    }
    assert_eq!(percents, vec![10.0, 40.0, 70.0, 75.0, 85.0, 95.0, 100.0]);
}

#[tokio::test]
async fn test_pipeline_degrades_agent_failure_to_placeholder() {
    let (base_url, hits) = spawn_mock_llm(vec![
        (500, api_error("model unavailable")), // technical fails
        (200, completion("基本面穩健，7/10")),
        (200, completion("看多論點")),
        (200, completion("看空論點")),
        (200, completion("風險中等")),
        (200, completion("持有即可")),
    ])
    .await;

    let store = AnalysisStore::new(temp_dir(), 50);
    let bus = EventBus::new(64);
    let pipeline = build_pipeline(&base_url, &store, &bus, Some("sk-test"));

    let record = pipeline.run(sample_request()).await.unwrap();

    assert_eq!(
        record.agent_reports[&AnalystKind::Technical],
        "[技術分析師分析暫時無法完成]"
    );
    // Placeholder text has no extractable score
    assert_eq!(record.ai_score.technical, 5.0);
    assert_eq!(record.ai_score.fundamental, 7.0);
    assert_eq!(record.ai_score.overall, 5.7);

    // Unparseable decision still yields the fallback recommendation
    assert_eq!(record.recommendation(), "持有");

    assert_eq!(hits.load(Ordering::SeqCst), 6);
    assert_eq!(store.history().len(), 1);
}

#[tokio::test]
async fn test_pipeline_validation_rejects_empty_symbol() {
    let store = AnalysisStore::new(temp_dir(), 50);
    let bus = EventBus::new(64);
    let pipeline = build_pipeline("http://127.0.0.1:9", &store, &bus, Some("sk-test"));

    let mut request = sample_request();
    request.symbol = "  ".to_string();

    let err = pipeline.run(request).await.unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));
    assert!(store.history().is_empty());
}

#[tokio::test]
async fn test_pipeline_validation_rejects_empty_agent_set() {
    let store = AnalysisStore::new(temp_dir(), 50);
    let bus = EventBus::new(64);
    let pipeline = build_pipeline("http://127.0.0.1:9", &store, &bus, Some("sk-test"));

    let mut request = sample_request();
    request.selected_agents.clear();

    let err = pipeline.run(request).await.unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));
}

#[tokio::test]
async fn test_pipeline_missing_credential_aborts_before_agents() {
    let (base_url, hits) = spawn_mock_llm(vec![]).await;
    let store = AnalysisStore::new(temp_dir(), 50);
    let bus = EventBus::new(64);
    let pipeline = build_pipeline(&base_url, &store, &bus, None);

    let err = pipeline.run(sample_request()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(store.history().is_empty());
}
