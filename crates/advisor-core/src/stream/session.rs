//! Streaming session state machine
//!
//! Replaces fragile flag-based streaming state with a proper enum state
//! machine: a session is Idle, Streaming, or in exactly one terminal state.
//! Illegal combinations (complete *and* errored) are unrepresentable.

use serde::Serialize;
use uuid::Uuid;

use super::request::GenerationMode;
use super::sentinel::Decoded;

/// Lifecycle state of a streaming session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created but not yet started
    Idle,
    /// Transport open, content accumulating
    Streaming,
    /// `[DONE]` sentinel received
    Complete,
    /// Protocol or transport failure; detail in `error_detail`
    Error,
    /// Cancelled by the caller; not an error
    Cancelled,
}

impl SessionState {
    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Complete | SessionState::Error | SessionState::Cancelled
        )
    }
}

/// One streaming invocation, from start to a terminal state.
///
/// Owned exclusively by the coordinator; observers only ever see
/// [`StreamSnapshot`] copies.
#[derive(Debug)]
pub struct StreamSession {
    id: Uuid,
    mode: GenerationMode,
    state: SessionState,
    content: String,
    error_detail: Option<String>,
}

impl StreamSession {
    /// Create a fresh Idle session for one invocation
    pub fn new(mode: GenerationMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode,
            state: SessionState::Idle,
            content: String::new(),
            error_detail: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> &GenerationMode {
        &self.mode
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Mark the transport as opened. Only valid from Idle.
    pub fn begin_streaming(&mut self) {
        if self.state == SessionState::Idle {
            self.state = SessionState::Streaming;
        }
    }

    /// Apply one decoded fragment. Fragments arriving after a terminal
    /// state are discarded silently - the transport tears the connection
    /// down on termination, but an in-flight fragment can still race in.
    pub fn apply(&mut self, decoded: Decoded) {
        if self.state != SessionState::Streaming {
            if !matches!(decoded, Decoded::Ignore) {
                tracing::debug!(
                    session_id = %self.id,
                    state = ?self.state,
                    "discarding late fragment"
                );
            }
            return;
        }
        match decoded {
            Decoded::Content(text) => self.content.push_str(&text),
            Decoded::Done => self.state = SessionState::Complete,
            Decoded::ErrorSignal(message) => {
                self.error_detail = Some(message);
                self.state = SessionState::Error;
            }
            Decoded::Ignore => {}
        }
    }

    /// Record a transport-level failure. No-op once terminal, so a late
    /// connection teardown cannot overwrite a sentinel-derived outcome.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.state.is_terminal() {
            return;
        }
        self.error_detail = Some(message.into());
        self.state = SessionState::Error;
    }

    /// Cancel the session. Idempotent; a no-op once terminal. Accumulated
    /// content is preserved.
    pub fn cancel(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.state = SessionState::Cancelled;
    }

    /// Read-only copy of the observable session state
    pub fn snapshot(&self) -> StreamSnapshot {
        StreamSnapshot {
            session_id: self.id,
            state: self.state.clone(),
            content: self.content.clone(),
            error_detail: self.error_detail.clone(),
        }
    }
}

/// Read-only view delivered to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamSnapshot {
    pub session_id: Uuid,
    pub state: SessionState,
    pub content: String,
    pub error_detail: Option<String>,
}

impl StreamSnapshot {
    /// Placeholder snapshot before any invocation
    pub fn idle() -> Self {
        Self {
            session_id: Uuid::nil(),
            state: SessionState::Idle,
            content: String::new(),
            error_detail: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::sentinel::decode_fragment;

    fn reply_session() -> StreamSession {
        let mut session = StreamSession::new(GenerationMode::Reply {
            session_id: Uuid::new_v4(),
            content: "hi".to_string(),
        });
        session.begin_streaming();
        session
    }

    #[test]
    fn test_content_accumulates_in_order() {
        let mut session = reply_session();
        for fragment in ["Hello", " world", "[DONE]"] {
            session.apply(decode_fragment(fragment));
        }
        let snap = session.snapshot();
        assert_eq!(snap.content, "Hello world");
        assert_eq!(snap.state, SessionState::Complete);
        assert_eq!(snap.error_detail, None);
    }

    #[test]
    fn test_error_sentinel_freezes_content() {
        let mut session = reply_session();
        session.apply(decode_fragment("Partial"));
        session.apply(decode_fragment("[ERROR] model overloaded"));
        session.apply(decode_fragment("late"));
        let snap = session.snapshot();
        assert_eq!(snap.content, "Partial");
        assert_eq!(snap.state, SessionState::Error);
        assert_eq!(snap.error_detail.as_deref(), Some("model overloaded"));
    }

    #[test]
    fn test_fragments_after_done_are_discarded() {
        let mut session = reply_session();
        session.apply(decode_fragment("done"));
        session.apply(decode_fragment("[DONE]"));
        session.apply(decode_fragment(" more"));
        assert_eq!(session.snapshot().content, "done");
        assert_eq!(*session.state(), SessionState::Complete);
    }

    #[test]
    fn test_heartbeats_change_nothing() {
        let mut session = reply_session();
        session.apply(decode_fragment("a"));
        session.apply(decode_fragment(""));
        session.apply(decode_fragment("  "));
        let snap = session.snapshot();
        assert_eq!(snap.content, "a");
        assert_eq!(snap.state, SessionState::Streaming);
    }

    #[test]
    fn test_cancel_is_idempotent_and_preserves_content() {
        let mut session = reply_session();
        session.apply(decode_fragment("kept"));
        session.cancel();
        session.cancel();
        let snap = session.snapshot();
        assert_eq!(snap.state, SessionState::Cancelled);
        assert_eq!(snap.content, "kept");
        assert_eq!(snap.error_detail, None);
    }

    #[test]
    fn test_cancel_after_terminal_is_noop() {
        let mut session = reply_session();
        session.apply(decode_fragment("[DONE]"));
        session.cancel();
        assert_eq!(*session.state(), SessionState::Complete);
    }

    #[test]
    fn test_transport_failure_cannot_overwrite_terminal() {
        let mut session = reply_session();
        session.apply(decode_fragment("[DONE]"));
        session.fail("stream connection error");
        let snap = session.snapshot();
        assert_eq!(snap.state, SessionState::Complete);
        assert_eq!(snap.error_detail, None);
    }

    #[test]
    fn test_transport_failure_keeps_partial_content() {
        let mut session = reply_session();
        session.apply(decode_fragment("half"));
        session.fail("stream connection error");
        let snap = session.snapshot();
        assert_eq!(snap.state, SessionState::Error);
        assert_eq!(snap.content, "half");
        assert_eq!(snap.error_detail.as_deref(), Some("stream connection error"));
    }

    #[test]
    fn test_fresh_sessions_get_distinct_ids() {
        let a = reply_session();
        let b = reply_session();
        assert_ne!(a.id(), b.id());
    }
}
