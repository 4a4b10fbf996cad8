//! Request shapes for the two generation modes
//!
//! Reply and recommendation streams share the sentinel protocol, state
//! machine, and cancellation behavior; they differ only in endpoint and
//! payload. Keeping the difference in one request-builder enum means the two
//! paths cannot drift apart in protocol handling.

use reqwest::Method;
use serde_json::{json, Value};
use uuid::Uuid;

/// Which kind of generation to stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationMode {
    /// Chat reply to a user-authored message within a conversation session
    Reply { session_id: Uuid, content: String },
    /// Initial recommendation for a conversation session; no payload
    Recommendation { session_id: Uuid },
}

impl GenerationMode {
    /// Short label for logging
    pub fn label(&self) -> &'static str {
        match self {
            GenerationMode::Reply { .. } => "reply",
            GenerationMode::Recommendation { .. } => "recommendation",
        }
    }

    /// Build the HTTP request shape for this mode
    pub fn build_request(&self, base_url: &str, bearer_token: &str) -> StreamRequest {
        let base = base_url.trim_end_matches('/');
        match self {
            GenerationMode::Reply {
                session_id,
                content,
            } => StreamRequest {
                method: Method::POST,
                url: format!("{base}/api/conversations/sessions/{session_id}/stream"),
                bearer_token: bearer_token.to_string(),
                body: Some(json!({ "content": content })),
            },
            GenerationMode::Recommendation { session_id } => StreamRequest {
                method: Method::POST,
                url: format!("{base}/api/conversations/sessions/{session_id}/recommend/stream"),
                bearer_token: bearer_token.to_string(),
                body: None,
            },
        }
    }
}

/// Fully-built request handed to the transport adapter
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub method: Method,
    pub url: String,
    pub bearer_token: String,
    /// JSON body; present for reply mode only
    pub body: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_request_shape() {
        let sid = Uuid::new_v4();
        let mode = GenerationMode::Reply {
            session_id: sid,
            content: "How do I improve my essay?".to_string(),
        };
        let req = mode.build_request("http://localhost:8000/", "tok");
        assert_eq!(req.method, Method::POST);
        assert_eq!(
            req.url,
            format!("http://localhost:8000/api/conversations/sessions/{sid}/stream")
        );
        assert_eq!(
            req.body,
            Some(json!({ "content": "How do I improve my essay?" }))
        );
    }

    #[test]
    fn test_recommendation_request_has_no_body() {
        let sid = Uuid::new_v4();
        let mode = GenerationMode::Recommendation { session_id: sid };
        let req = mode.build_request("http://localhost:8000", "tok");
        assert_eq!(
            req.url,
            format!("http://localhost:8000/api/conversations/sessions/{sid}/recommend/stream")
        );
        assert_eq!(req.body, None);
        assert_eq!(req.bearer_token, "tok");
    }
}
