//! Streaming response coordination
//!
//! Consumes the backend's incrementally-delivered SSE generations (chat
//! replies and recommendations) and turns the raw byte stream into session
//! state with explicit lifecycle, cancellation, and error semantics.

pub mod coordinator;
pub mod request;
pub mod sentinel;
pub mod session;
pub mod transport;

pub use coordinator::SessionCoordinator;
pub use request::{GenerationMode, StreamRequest};
pub use sentinel::{decode_fragment, Decoded};
pub use session::{SessionState, StreamSession, StreamSnapshot};
pub use transport::{HttpTransport, StreamTransport, TransportEvent};
