//! Client-side chat session over a relay
//!
//! Holds the conversation and not-yet-sent draft images, and admits one
//! submission at a time.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Semaphore;
use tracing::debug;

use crate::error::SessionError;
use crate::providers::GeneralModelProvider;
use crate::{Conversation, DEFAULT_PROMPT, ImageRef, RelayResult, Turn};

pub struct ChatSession {
    provider: Arc<GeneralModelProvider>,
    conversation: Mutex<Conversation>,
    drafts: Mutex<Vec<ImageRef>>,
    in_flight: Semaphore,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ChatSession {
    pub fn new(provider: Arc<GeneralModelProvider>) -> Self {
        ChatSession {
            provider,
            conversation: Mutex::new(Conversation::new()),
            drafts: Mutex::new(Vec::new()),
            in_flight: Semaphore::new(1),
        }
    }

    pub fn provider(&self) -> &GeneralModelProvider {
        &self.provider
    }

    /// Snapshot of the committed turns.
    pub fn conversation(&self) -> Conversation {
        lock(&self.conversation).clone()
    }

    pub fn drafts(&self) -> Vec<ImageRef> {
        lock(&self.drafts).clone()
    }

    pub fn attach_image(&self, image: ImageRef) {
        lock(&self.drafts).push(image);
    }

    pub fn remove_image(&self, index: usize) -> Result<ImageRef, SessionError> {
        let mut drafts = lock(&self.drafts);
        if index >= drafts.len() {
            return Err(SessionError::NoSuchImage(index));
        }
        Ok(drafts.remove(index))
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.available_permits() == 0
    }

    /// Drop all turns and draft images.
    pub fn clear(&self) {
        lock(&self.conversation).clear();
        lock(&self.drafts).clear();
    }

    /// Send `text` plus the draft images as a new user turn and append the
    /// answer, or an `Error: ...` turn, once the relay call resolves.
    pub async fn submit(&self, text: &str) -> Result<RelayResult, SessionError> {
        let _permit = self.in_flight.try_acquire().map_err(|_| SessionError::Busy)?;

        let text = text.trim();
        let images = {
            let mut drafts = lock(&self.drafts);
            if text.is_empty() && drafts.is_empty() {
                return Err(SessionError::NothingToSend);
            }
            std::mem::take(&mut *drafts)
        };
        let text = if text.is_empty() { DEFAULT_PROMPT } else { text };

        let sent = {
            let mut conversation = lock(&self.conversation);
            *conversation = conversation.with_turn(Turn::user(text, images));
            conversation.clone()
        };
        debug!(turns = sent.len(), "Submitting conversation");

        let result = self.provider.relay(&sent).await;
        *lock(&self.conversation) = sent.with_turn(result.clone().into_turn());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{HttpReply, Transport};
    use crate::error::RelayError;
    use crate::providers::GeminiProvider;
    use crate::providers::testing::FakeTransport;
    use crate::Role;
    use async_trait::async_trait;
    use reqwest::header::HeaderMap;
    use tokio::sync::Notify;

    fn session(transport: Arc<dyn Transport>) -> ChatSession {
        let provider = GeminiProvider::new(transport, "https://gemini.test", Some("key".into()), "m");
        ChatSession::new(Arc::new(provider.into()))
    }

    fn answering(text: &str) -> Arc<FakeTransport> {
        Arc::new(FakeTransport::replying(
            200,
            serde_json::json!({"candidates": [{"content": {"parts": [{"text": text}]}}]}),
        ))
    }

    /// Holds every call until released.
    struct GatedTransport {
        gate: Notify,
    }

    #[async_trait]
    impl Transport for GatedTransport {
        async fn post_json(
            &self,
            _url: &str,
            _headers: HeaderMap,
            _body: &serde_json::Value,
        ) -> Result<HttpReply, RelayError> {
            self.gate.notified().await;
            Ok(HttpReply::new(
                200,
                r#"{"candidates":[{"content":{"parts":[{"text":"late"}]}}]}"#,
            ))
        }
    }

    #[tokio::test]
    async fn test_submit_appends_user_and_assistant_turns() {
        let session = session(answering("Quito"));
        session.attach_image(ImageRef::new("data:image/png;base64,AAAA"));

        let result = session.submit("  where?  ").await.unwrap();
        assert_eq!(result, RelayResult::ok("Quito"));

        let conversation = session.conversation();
        let turns: Vec<&Turn> = conversation.iter().collect();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role(), Role::User);
        assert_eq!(turns[0].text(), Some("where?"));
        assert_eq!(turns[0].images().len(), 1);
        assert_eq!(turns[1].role(), Role::Assistant);
        assert_eq!(turns[1].text(), Some("Quito"));
        assert!(session.drafts().is_empty());
    }

    #[tokio::test]
    async fn test_images_only_uses_default_prompt() {
        let session = session(answering("Lima"));
        session.attach_image(ImageRef::new("data:image/png;base64,AAAA"));
        session.submit("").await.unwrap();
        assert_eq!(session.conversation().iter().next().unwrap().text(), Some(DEFAULT_PROMPT));
    }

    #[tokio::test]
    async fn test_nothing_to_send() {
        let transport = answering("unused");
        let session = session(transport.clone());
        assert_eq!(session.submit("   ").await.unwrap_err(), SessionError::NothingToSend);
        assert!(session.conversation().is_empty());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_error_becomes_error_turn() {
        let transport = Arc::new(FakeTransport::replying(
            500,
            serde_json::json!({"error": {"message": "rate limited"}}),
        ));
        let session = session(transport);
        let result = session.submit("hello").await.unwrap();
        assert_eq!(result, RelayResult::error("rate limited"));

        let conversation = session.conversation();
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.last().unwrap().text(), Some("Error: rate limited"));
    }

    #[tokio::test]
    async fn test_history_is_replayed() {
        let transport = answering("ok");
        let session = session(transport.clone());
        session.submit("first").await.unwrap();
        session.submit("second").await.unwrap();

        let (_, _, body) = transport.last_request().unwrap();
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "second");
        assert_eq!(session.conversation().len(), 4);
    }

    #[tokio::test]
    async fn test_remove_draft_image() {
        let session = session(answering("ok"));
        session.attach_image(ImageRef::new("data:image/png;base64,AAAA"));
        session.attach_image(ImageRef::new("data:image/png;base64,BBBB"));

        let removed = session.remove_image(0).unwrap();
        assert_eq!(removed.as_str(), "data:image/png;base64,AAAA");
        assert_eq!(session.drafts().len(), 1);
        assert_eq!(session.remove_image(5).unwrap_err(), SessionError::NoSuchImage(5));
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let session = session(answering("ok"));
        session.submit("hi").await.unwrap();
        session.attach_image(ImageRef::new("data:image/png;base64,AAAA"));
        session.clear();
        assert!(session.conversation().is_empty());
        assert!(session.drafts().is_empty());
    }

    #[tokio::test]
    async fn test_second_submit_while_busy_is_rejected() {
        let transport = Arc::new(GatedTransport { gate: Notify::new() });
        let session = Arc::new(session(transport.clone()));

        let first = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.submit("first").await })
        };
        while !session.is_busy() {
            tokio::task::yield_now().await;
        }

        assert_eq!(session.submit("second").await.unwrap_err(), SessionError::Busy);
        assert_eq!(session.conversation().len(), 1);

        transport.gate.notify_one();
        let result = first.await.unwrap().unwrap();
        assert_eq!(result, RelayResult::ok("late"));
        assert!(!session.is_busy());
        assert_eq!(session.conversation().len(), 2);
    }
}
