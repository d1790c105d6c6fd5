use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use georelay::providers::claude::api::MessagesRequest;
use georelay::providers::gemini::api::GenerateContentRequest;
use georelay::{
    ClaudeProvider, Conversation, GeminiProvider, GeneralModelProvider, HttpReply, ImageRef,
    ModelProvider, RelayError, RelayResult, Transport, Turn,
};
use reqwest::header::HeaderMap;

/// Answers each call with the next scripted reply and keeps the bodies it saw.
struct ScriptedTransport {
    replies: Mutex<Vec<Result<HttpReply, RelayError>>>,
    bodies: Mutex<Vec<serde_json::Value>>,
}

impl ScriptedTransport {
    fn new(replies: Vec<Result<HttpReply, RelayError>>) -> Arc<Self> {
        Arc::new(ScriptedTransport {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            bodies: Mutex::new(Vec::new()),
        })
    }

    fn bodies(&self) -> Vec<serde_json::Value> {
        self.bodies.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(
        &self,
        _url: &str,
        _headers: HeaderMap,
        body: &serde_json::Value,
    ) -> Result<HttpReply, RelayError> {
        self.bodies.lock().unwrap().push(body.clone());
        self.replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(RelayError::Transport("no more replies".to_string())))
    }
}

fn gemini(transport: Arc<ScriptedTransport>) -> GeneralModelProvider {
    GeminiProvider::new(transport, "https://gemini.test/v1beta", Some("key".into()), "gemini-test").into()
}

fn claude(transport: Arc<ScriptedTransport>) -> GeneralModelProvider {
    ClaudeProvider::new(transport, "https://claude.test", Some("token".into()), "claude-test").into()
}

fn photo() -> ImageRef {
    ImageRef::new("data:image/jpeg;base64,/9j/4AAQ")
}

#[tokio::test]
async fn test_gemini_follow_up_carries_history() {
    let transport = ScriptedTransport::new(vec![
        Ok(HttpReply::new(200, r#"{"candidates":[{"content":{"parts":[{"text":"Lisbon"}]}}]}"#)),
        Ok(HttpReply::new(200, r#"{"candidates":[{"content":{"parts":[{"text":"Alfama"}]}}]}"#)),
    ]);
    let provider = gemini(transport.clone());

    let first = Conversation::new().with_turn(Turn::user("Where is this?", vec![photo()]));
    let answer = provider.relay(&first).await;
    assert_eq!(answer, RelayResult::ok("Lisbon"));

    let second = first
        .with_turn(answer.into_turn())
        .with_turn(Turn::user("Which neighbourhood?", vec![]));
    assert_eq!(provider.relay(&second).await, RelayResult::ok("Alfama"));
    assert_eq!(first.len(), 1);

    let bodies = transport.bodies();
    let contents = bodies[1]["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[0]["parts"][0]["inlineData"]["mimeType"], "image/jpeg");
    assert_eq!(contents[0]["parts"][1]["text"], "Where is this?");
    assert_eq!(contents[1]["role"], "model");
    assert_eq!(contents[1]["parts"][0]["text"], "Lisbon");
    assert_eq!(contents[2]["role"], "user");
    assert_eq!(contents[2]["parts"][0]["text"], "Which neighbourhood?");
}

#[tokio::test]
async fn test_claude_error_then_retry_by_caller() {
    let transport = ScriptedTransport::new(vec![
        Ok(HttpReply::new(529, r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#)),
        Ok(HttpReply::new(200, r#"{"content":[{"type":"text","text":"Reykjavik"}]}"#)),
    ]);
    let provider = claude(transport.clone());
    let conversation = Conversation::from_turns([Turn::user("Where is this?", vec![photo()])]);

    let failed = provider.relay(&conversation).await;
    assert_eq!(failed, RelayResult::error("Overloaded"));
    assert_eq!(failed.into_turn().text(), Some("Error: Overloaded"));

    assert_eq!(provider.relay(&conversation).await, RelayResult::ok("Reykjavik"));
    assert_eq!(transport.bodies().len(), 2);
}

#[tokio::test]
async fn test_empty_error_body_reports_status() {
    let transport = ScriptedTransport::new(vec![Ok(HttpReply::new(502, ""))]);
    let conversation = Conversation::from_turns([Turn::user("Where?", vec![])]);
    assert_eq!(
        claude(transport).relay(&conversation).await,
        RelayResult::error("Request failed with status 502")
    );
}

#[tokio::test]
async fn test_transport_failure_becomes_error_result() {
    let transport = ScriptedTransport::new(vec![Err(RelayError::Transport("connection refused".into()))]);
    let conversation = Conversation::from_turns([Turn::user("Where?", vec![])]);
    assert_eq!(
        gemini(transport).relay(&conversation).await,
        RelayResult::error("connection refused")
    );
}

#[tokio::test]
async fn test_empty_conversation_makes_no_call() {
    let transport = ScriptedTransport::new(vec![]);
    let result = gemini(transport.clone()).relay(&Conversation::new()).await;
    assert!(result.error_message().is_some());
    assert!(transport.bodies().is_empty());
}

#[test]
fn test_relay_result_wire_shape() {
    assert_eq!(
        serde_json::to_value(RelayResult::ok("Oslo")).unwrap(),
        serde_json::json!({"text": "Oslo"})
    );
    assert_eq!(
        serde_json::to_value(RelayResult::error("boom")).unwrap(),
        serde_json::json!({"error": "boom"})
    );
}

#[test]
fn test_payloads_are_usable_outside_the_crate() {
    let conversation = Conversation::from_turns([
        Turn::user("Where is this?", vec![photo()]),
        Turn::assistant("Portugal"),
        Turn::user("Which city?", vec![]),
    ]);

    let transport = ScriptedTransport::new(vec![]);
    let gemini = GeminiProvider::new(transport.clone(), "https://gemini.test", Some("key".into()), "g");
    let payload: GenerateContentRequest = gemini.translate(&conversation).unwrap();
    let body = serde_json::to_value(&payload).unwrap();
    assert_eq!(body["contents"].as_array().unwrap().len(), 3);

    let claude = ClaudeProvider::new(transport.clone(), "https://claude.test", Some("token".into()), "c");
    let payload: MessagesRequest = claude.translate(&conversation).unwrap();
    let body = serde_json::to_value(&payload).unwrap();
    assert_eq!(body["messages"][1]["role"], "assistant");
    assert!(transport.bodies().is_empty());
}
