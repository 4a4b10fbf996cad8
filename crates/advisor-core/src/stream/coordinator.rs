//! Session coordinator
//!
//! Orchestrates the transport adapter, sentinel decoder, and session state
//! machine for one streaming invocation at a time. Observers subscribe to a
//! watch channel of read-only snapshots; cancellation flows the other way,
//! from the caller down to the transport connection.
//!
//! At most one session is live per coordinator. Starting a new generation
//! while one is streaming cancels the old session first, so interleaved
//! content from two in-flight streams can never be attributed to the same
//! observer state. Each invocation gets a fresh cancellation token and a new
//! epoch; a stale driver or a stale cancel can never touch a newer session.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::request::GenerationMode;
use super::sentinel::decode_fragment;
use super::session::{StreamSession, StreamSnapshot};
use super::transport::{StreamTransport, TransportEvent, CONNECTION_ERROR};
use crate::auth::TokenProvider;
use crate::error::StreamError;

const AUTH_REQUIRED_DETAIL: &str = "authentication required: no token available";

struct Inner {
    session: Option<StreamSession>,
    cancel: CancellationToken,
    /// Bumped on every `start`; drivers from older invocations compare
    /// against it and bail out instead of mutating a newer session.
    epoch: u64,
}

/// Façade over transport, decoder, and state machine for the two
/// generation modes.
pub struct SessionCoordinator {
    transport: Arc<dyn StreamTransport>,
    tokens: Arc<dyn TokenProvider>,
    base_url: String,
    inner: Arc<Mutex<Inner>>,
    updates: watch::Sender<StreamSnapshot>,
}

impl SessionCoordinator {
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn StreamTransport>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        let (updates, _) = watch::channel(StreamSnapshot::idle());
        Self {
            transport,
            tokens,
            base_url: base_url.into(),
            inner: Arc::new(Mutex::new(Inner {
                session: None,
                cancel: CancellationToken::new(),
                epoch: 0,
            })),
            updates,
        }
    }

    /// Observe `{content, state, error_detail}` updates as the session
    /// progresses.
    pub fn subscribe(&self) -> watch::Receiver<StreamSnapshot> {
        self.updates.subscribe()
    }

    /// Current read-only view of the session
    pub fn snapshot(&self) -> StreamSnapshot {
        self.updates.borrow().clone()
    }

    /// Start streaming a generation. Cancels any session still streaming,
    /// then runs the auth check before any transport connection is opened.
    /// Returns the fresh session id; progress is delivered to subscribers.
    pub async fn start(&self, mode: GenerationMode) -> Result<Uuid, StreamError> {
        // Cancel the prior session and install a fresh one atomically.
        let (session_id, cancel, epoch) = {
            let inner = &mut *self.inner.lock();
            let prior_live = inner
                .session
                .as_ref()
                .is_some_and(|s| !s.state().is_terminal());
            if prior_live {
                inner.cancel.cancel();
                if let Some(prior) = inner.session.as_mut() {
                    info!(session_id = %prior.id(), "cancelling prior session for re-invocation");
                    prior.cancel();
                }
                self.publish(inner);
            }
            let session = StreamSession::new(mode.clone());
            let session_id = session.id();
            inner.session = Some(session);
            inner.cancel = CancellationToken::new();
            inner.epoch += 1;
            self.publish(inner);
            (session_id, inner.cancel.clone(), inner.epoch)
        };

        info!(%session_id, mode = mode.label(), "starting generation");

        // Auth check precedes any transport attempt.
        let token = match self.tokens.bearer_token().await {
            Some(token) => token,
            None => {
                warn!(%session_id, "no bearer token available");
                self.with_current(epoch, |session| session.fail(AUTH_REQUIRED_DETAIL));
                return Err(StreamError::AuthRequired);
            }
        };

        let request = mode.build_request(&self.base_url, &token);
        self.with_current(epoch, |session| session.begin_streaming());

        let rx = match self.transport.open(request, cancel.clone()).await {
            Ok(rx) => rx,
            Err(e) => {
                self.with_current(epoch, |session| session.fail(CONNECTION_ERROR));
                return Err(e);
            }
        };

        let inner = Arc::clone(&self.inner);
        let updates = self.updates.clone();
        tokio::spawn(drive_session(inner, updates, rx, cancel, epoch));

        Ok(session_id)
    }

    /// Cancel the in-flight session, if any. Idempotent and safe to call
    /// from any state; a no-op once the session is terminal.
    pub fn cancel(&self) {
        let inner = &mut *self.inner.lock();
        inner.cancel.cancel();
        if let Some(session) = inner.session.as_mut() {
            if !session.state().is_terminal() {
                info!(session_id = %session.id(), "cancellation requested");
                session.cancel();
                self.publish(inner);
            }
        }
    }

    /// Mutate the current session only if `epoch` is still live, then
    /// publish the updated snapshot.
    fn with_current(&self, epoch: u64, f: impl FnOnce(&mut StreamSession)) {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            return;
        }
        if let Some(session) = inner.session.as_mut() {
            f(session);
        }
        self.publish(&inner);
    }

    fn publish(&self, inner: &Inner) {
        if let Some(session) = inner.session.as_ref() {
            self.updates.send_replace(session.snapshot());
        }
    }
}

/// Pump transport events into the state machine until a terminal state.
///
/// Events are processed strictly in arrival order. Fragments that race in
/// after the session went terminal are dropped by the state machine; events
/// belonging to a superseded epoch are dropped here.
async fn drive_session(
    inner: Arc<Mutex<Inner>>,
    updates: watch::Sender<StreamSnapshot>,
    mut rx: tokio::sync::mpsc::UnboundedReceiver<TransportEvent>,
    cancel: CancellationToken,
    epoch: u64,
) {
    loop {
        let event = match rx.recv().await {
            Some(event) => event,
            // Sender dropped without a terminal event: treat as failure.
            None => TransportEvent::Failed(CONNECTION_ERROR.to_string()),
        };
        let finished = {
            let mut guard = inner.lock();
            if guard.epoch != epoch {
                debug!("dropping event from superseded session");
                return;
            }
            let Some(session) = guard.session.as_mut() else {
                return;
            };
            match &event {
                TransportEvent::Fragment(raw) => session.apply(decode_fragment(raw)),
                // EOF is only legitimate after a sentinel already ended the
                // session; fail() is a no-op in that case.
                TransportEvent::Closed => session.fail(CONNECTION_ERROR),
                TransportEvent::Failed(message) => session.fail(message.clone()),
                TransportEvent::Aborted => session.cancel(),
            }
            let finished = session.state().is_terminal();
            updates.send_replace(session.snapshot());
            finished
        };
        if finished {
            // Tear the connection down once a sentinel ends the session.
            cancel.cancel();
            return;
        }
        if matches!(
            event,
            TransportEvent::Closed | TransportEvent::Failed(_) | TransportEvent::Aborted
        ) {
            return;
        }
    }
}
