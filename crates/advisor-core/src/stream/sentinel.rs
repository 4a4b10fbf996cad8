//! In-band sentinel protocol for streamed generations
//!
//! The backend multiplexes control signals onto the same SSE data channel as
//! content: `[DONE]` terminates a successful stream, `[ERROR] <message>`
//! terminates a failed one, and empty payloads are keepalive heartbeats.
//! Everything else is content.

/// Classification of one raw fragment from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Ordinary content to append to the accumulated response
    Content(String),
    /// Completion sentinel - the stream ended successfully
    Done,
    /// Error sentinel with the server-provided message
    ErrorSignal(String),
    /// Heartbeat or empty payload, no state change
    Ignore,
}

/// Completion sentinel, exact match required
pub const DONE_SENTINEL: &str = "[DONE]";

/// Error sentinel prefix; the remainder of the fragment is the message
pub const ERROR_PREFIX: &str = "[ERROR]";

/// Classify a single fragment.
///
/// Note: genuine content that happens to start with the literal `[ERROR]`
/// is indistinguishable from an error signal. The wire format offers no
/// framing to tell them apart, so the prefix match is deliberate.
pub fn decode_fragment(fragment: &str) -> Decoded {
    if fragment.trim().is_empty() {
        return Decoded::Ignore;
    }
    if fragment == DONE_SENTINEL {
        return Decoded::Done;
    }
    if let Some(rest) = fragment.strip_prefix(ERROR_PREFIX) {
        return Decoded::ErrorSignal(rest.trim().to_string());
    }
    Decoded::Content(fragment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_passthrough() {
        assert_eq!(
            decode_fragment("Hello world"),
            Decoded::Content("Hello world".to_string())
        );
    }

    #[test]
    fn test_done_exact_match() {
        assert_eq!(decode_fragment("[DONE]"), Decoded::Done);
        // Not exact -> content
        assert_eq!(
            decode_fragment("[DONE] extra"),
            Decoded::Content("[DONE] extra".to_string())
        );
    }

    #[test]
    fn test_error_prefix_trims_message() {
        assert_eq!(
            decode_fragment("[ERROR] model overloaded"),
            Decoded::ErrorSignal("model overloaded".to_string())
        );
        assert_eq!(
            decode_fragment("[ERROR]   spaced out  "),
            Decoded::ErrorSignal("spaced out".to_string())
        );
    }

    #[test]
    fn test_error_with_empty_message() {
        assert_eq!(
            decode_fragment("[ERROR]"),
            Decoded::ErrorSignal(String::new())
        );
    }

    #[test]
    fn test_heartbeats_ignored() {
        assert_eq!(decode_fragment(""), Decoded::Ignore);
        assert_eq!(decode_fragment("   "), Decoded::Ignore);
        assert_eq!(decode_fragment("\t\n"), Decoded::Ignore);
    }

    #[test]
    fn test_error_prefix_ambiguity_is_preserved() {
        // Content starting with the literal prefix is classified as an
        // error signal. Known protocol limitation, not a decoder bug.
        assert_eq!(
            decode_fragment("[ERROR] handling is explained below"),
            Decoded::ErrorSignal("handling is explained below".to_string())
        );
    }
}
