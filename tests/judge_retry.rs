use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use verdict_harness::gateway::AnthropicAdapter;
use verdict_harness::judge::shapes::{BoolVerdict, ClaimList};
use verdict_harness::judge::{Judge, JudgeConfig, JudgeError};

fn judge_body(text: &str) -> serde_json::Value {
    json!({
        "content": [{ "type": "text", "text": text }],
        "usage": { "input_tokens": 5, "output_tokens": 5 }
    })
}

fn judge_for(server: &MockServer) -> Judge {
    let adapter =
        AnthropicAdapter::with_config("sk-test", server.uri(), Duration::from_secs(5)).unwrap();
    Judge::new(Arc::new(adapter), JudgeConfig::default())
}

/// Replays a template sequence, repeating the last one.
struct SequenceResponder {
    calls: Arc<AtomicUsize>,
    templates: Vec<ResponseTemplate>,
}

impl Respond for SequenceResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.templates[n.min(self.templates.len() - 1)].clone()
    }
}

#[tokio::test]
async fn always_invalid_shape_makes_exactly_max_retries_attempts() {
    let server = MockServer::start().await;

    // Valid JSON, but a single claim never satisfies the claim-list
    // validator.
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(judge_body(r#"{"claims": ["one"]}"#)))
        .mount(&server)
        .await;

    let judge = judge_for(&server);
    let err = judge
        .request::<ClaimList, _>("extract claims", "some response", ClaimList::is_valid)
        .await
        .unwrap_err();

    assert!(matches!(err, JudgeError::RetryExhausted { attempts: 5 }));

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 5);
}

#[tokio::test]
async fn transport_and_parse_failures_share_the_retry_budget() {
    let server = MockServer::start().await;

    let templates = vec![
        // Attempt 1: transport-level failure.
        ResponseTemplate::new(500).set_body_json(json!({
            "error": { "type": "internal_error", "message": "boom" }
        })),
        // Attempt 2: reply that is not JSON.
        ResponseTemplate::new(200).set_body_json(judge_body("the claim is true")),
        // Attempt 3: usable reply.
        ResponseTemplate::new(200).set_body_json(judge_body(r#"{"result": true}"#)),
    ];

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(SequenceResponder {
            calls: Arc::new(AtomicUsize::new(0)),
            templates,
        })
        .mount(&server)
        .await;

    let judge = judge_for(&server);
    let verdict: BoolVerdict = judge
        .request("check claim", "Claim: x", BoolVerdict::is_valid)
        .await
        .unwrap();

    assert!(verdict.passed());

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 3);
}

#[tokio::test]
async fn negative_verdict_is_a_valid_outcome_not_a_retry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(judge_body(r#"{"result": false}"#)))
        .mount(&server)
        .await;

    let judge = judge_for(&server);
    let verdict: BoolVerdict = judge
        .request("check claim", "Claim: x", BoolVerdict::is_valid)
        .await
        .unwrap();

    assert!(!verdict.passed());

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
}

#[tokio::test]
async fn newline_wrapped_json_is_accepted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(judge_body("{\n  \"result\": true\n}")),
        )
        .mount(&server)
        .await;

    let judge = judge_for(&server);
    let verdict: BoolVerdict = judge
        .request("check claim", "Claim: x", BoolVerdict::is_valid)
        .await
        .unwrap();

    assert!(verdict.passed());
}

#[tokio::test]
async fn judge_sends_deterministic_single_turn_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(judge_body(r#"{"result": true}"#)))
        .mount(&server)
        .await;

    let judge = judge_for(&server);
    let _: BoolVerdict = judge
        .request("system prompt here", "user content here", BoolVerdict::is_valid)
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = received[0].body_json().unwrap();

    assert_eq!(body["temperature"], json!(0.0));
    assert_eq!(body["system"], json!("system prompt here"));
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    assert_eq!(body["messages"][0]["role"], json!("user"));
    assert_eq!(body["messages"][0]["content"], json!("user content here"));
}
