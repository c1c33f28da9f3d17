//! Chat thread with the portal assistant.
//!
//! The thread is append-only and lives only as long as its screen; the
//! backend persists the conversation server-side. A turn is appended only
//! when the exchange succeeds, so a failed request leaves the transcript
//! exactly as the user last saw it.

use async_trait::async_trait;

use crate::api::ApiClient;
use crate::auth::AuthSession;
use crate::capture::RecordingSnapshot;
use crate::error::PortalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

/// Backend seam for the chat endpoint.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn ask(&self, session: &AuthSession, question: &str) -> Result<String, PortalError>;
}

#[async_trait]
impl ChatApi for ApiClient {
    async fn ask(&self, session: &AuthSession, question: &str) -> Result<String, PortalError> {
        ApiClient::chat(self, session, question).await
    }
}

#[derive(Debug, Default)]
pub struct ChatThread {
    turns: Vec<ChatTurn>,
}

impl ChatThread {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Send a question and append both turns on success.
    pub async fn ask(
        &mut self,
        backend: &dyn ChatApi,
        session: &AuthSession,
        question: &str,
    ) -> Result<&str, PortalError> {
        let question = question.trim();
        let answer = backend.ask(session, question).await?;
        self.turns.push(ChatTurn {
            role: ChatRole::User,
            text: question.to_string(),
        });
        self.turns.push(ChatTurn {
            role: ChatRole::Assistant,
            text: answer,
        });
        // Both pushes happened, so last() is the assistant turn.
        Ok(&self.turns[self.turns.len() - 1].text)
    }

    /// Voice input: feed a finished recording's transcript through the
    /// same path as a typed question.
    pub async fn ask_from_recording(
        &mut self,
        backend: &dyn ChatApi,
        session: &AuthSession,
        snapshot: &RecordingSnapshot,
    ) -> Result<&str, PortalError> {
        let transcript = snapshot
            .transcript
            .as_deref()
            .ok_or_else(|| PortalError::Capture("no finished recording to send".to_string()))?;
        self.ask(backend, session, transcript).await
    }
}

#[cfg(test)]
mod tests {
    use crate::api::types::Role;
    use crate::capture::Phase;

    use super::*;

    struct StubChat {
        fail: bool,
    }

    #[async_trait]
    impl ChatApi for StubChat {
        async fn ask(
            &self,
            _session: &AuthSession,
            question: &str,
        ) -> Result<String, PortalError> {
            if self.fail {
                return Err(PortalError::Network("connection reset".to_string()));
            }
            Ok(format!("answer to: {}", question))
        }
    }

    fn patient() -> AuthSession {
        AuthSession {
            user_id: "p1".to_string(),
            role: Role::Patient,
        }
    }

    #[tokio::test]
    async fn successful_exchange_appends_both_turns_in_order() {
        let mut thread = ChatThread::new();
        let answer = thread
            .ask(&StubChat { fail: false }, &patient(), " when do I take it? ")
            .await
            .unwrap()
            .to_string();
        assert_eq!(answer, "answer to: when do I take it?");
        assert_eq!(thread.turns().len(), 2);
        assert_eq!(thread.turns()[0].role, ChatRole::User);
        assert_eq!(thread.turns()[0].text, "when do I take it?");
        assert_eq!(thread.turns()[1].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn failed_exchange_leaves_the_thread_untouched() {
        let mut thread = ChatThread::new();
        let err = thread
            .ask(&StubChat { fail: true }, &patient(), "hello?")
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Network(_)));
        assert!(thread.turns().is_empty());
    }

    #[tokio::test]
    async fn voice_question_uses_the_finished_transcript() {
        let mut thread = ChatThread::new();
        let snapshot = RecordingSnapshot {
            phase: Phase::Ready,
            transcript: Some("is this dosage safe?".to_string()),
            media_url: Some("https://x/q.wav".to_string()),
            ..Default::default()
        };
        thread
            .ask_from_recording(&StubChat { fail: false }, &patient(), &snapshot)
            .await
            .unwrap();
        assert_eq!(thread.turns()[0].text, "is this dosage safe?");

        let empty = RecordingSnapshot::default();
        let err = thread
            .ask_from_recording(&StubChat { fail: false }, &patient(), &empty)
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::Capture(_)));
    }
}
