use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::constants::{CLEAR_FAILED_PREFIX, EMPTY_REPLY_MESSAGE};
use crate::session::{ChatSession, ChatSnapshot, MessageRole, SessionId};
use crate::transport::ChatTransport;

/// One-shot UI side effects the presentation adapter should perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelEffect {
    ScrollToBottom,
    FocusInput,
}

/// State shared with background work. Background tasks only hold a `Weak`
/// to it, so results that land after the controller is gone are dropped.
struct Shared {
    session: Mutex<ChatSession>,
    state_tx: watch::Sender<ChatSnapshot>,
    /// Set once the effect stream is taken; effects before that are dropped
    effects_tx: Mutex<Option<mpsc::UnboundedSender<PanelEffect>>>,
}

impl Shared {
    /// Mutate the session and publish the new snapshot if anything changed.
    /// The lock is never held across an await.
    fn update<R>(&self, f: impl FnOnce(&mut ChatSession) -> R) -> R {
        let mut session = self.session.lock();
        let out = f(&mut session);
        let next = session.snapshot();
        drop(session);

        self.state_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        out
    }

    fn emit(&self, effect: PanelEffect) {
        if let Some(tx) = self.effects_tx.lock().as_ref() {
            // Receiver dropped is fine
            let _ = tx.send(effect);
        }
    }
}

/// Clears `busy` if a dispatched send is dropped before it resolves
struct SendGuard {
    shared: Weak<Shared>,
    armed: bool,
}

impl SendGuard {
    fn new(shared: Weak<Shared>) -> Self {
        Self {
            shared,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for SendGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            warn!("chat request abandoned before it resolved");
            shared.update(ChatSession::abandon_send);
        }
    }
}

/// Owns one chat session and sequences every user action against the
/// analysis service: at most one send in flight, user message always
/// before its reply, every failure turned into an assistant message.
pub struct ChatSessionController {
    shared: Arc<Shared>,
    transport: Arc<dyn ChatTransport>,
    session_id: SessionId,
}

impl ChatSessionController {
    /// Create a controller with a freshly generated session id
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self::with_session_id(transport, SessionId::generate())
    }

    /// Create a controller bound to an existing session id
    pub fn with_session_id(transport: Arc<dyn ChatTransport>, session_id: SessionId) -> Self {
        let session = ChatSession::new(session_id.clone());
        let (state_tx, _) = watch::channel(session.snapshot());

        info!(session_id = %session_id, "chat session created");

        Self {
            shared: Arc::new(Shared {
                session: Mutex::new(session),
                state_tx,
                effects_tx: Mutex::new(None),
            }),
            transport,
            session_id,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Current state
    pub fn snapshot(&self) -> ChatSnapshot {
        self.shared.session.lock().snapshot()
    }

    /// Receive a new snapshot after every transition
    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.shared.state_tx.subscribe()
    }

    /// Take the effect stream. Only the first caller gets it, and only
    /// effects emitted after that are delivered.
    pub fn take_effects(&self) -> Option<mpsc::UnboundedReceiver<PanelEffect>> {
        let mut slot = self.shared.effects_tx.lock();
        if slot.is_some() {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *slot = Some(tx);
        Some(rx)
    }

    /// Replace the input buffer
    pub fn set_input(&self, text: impl Into<String>) {
        let text = text.into();
        self.shared.update(|s| s.set_input(text));
    }

    /// Show the panel. The first open of a session also starts a background
    /// context fetch, whose handle is returned.
    pub fn open(&self) -> Option<JoinHandle<()>> {
        let runtime = Handle::try_current().ok();

        let (opened, fetch) = self.shared.update(|s| {
            let opened = s.open();
            let fetch = opened && runtime.is_some() && s.claim_context_fetch();
            (opened, fetch)
        });

        if !opened {
            return None;
        }

        self.shared.emit(PanelEffect::ScrollToBottom);
        self.shared.emit(PanelEffect::FocusInput);

        let runtime = runtime.filter(|_| fetch)?;
        debug!(session_id = %self.session_id, "loading session context");
        Some(runtime.spawn(load_context(
            Arc::downgrade(&self.shared),
            Arc::clone(&self.transport),
            self.session_id.clone(),
        )))
    }

    /// Hide the panel. An in-flight send keeps going.
    pub fn close(&self) {
        self.shared.update(ChatSession::close);
    }

    /// Send a message and wait for the exchange to resolve.
    /// Returns false when the send was rejected (blank text, busy, or closed).
    pub async fn send_message(&self, raw: &str) -> bool {
        let Some(text) = self.begin_send(raw) else {
            return false;
        };
        dispatch_send(
            Arc::downgrade(&self.shared),
            Arc::clone(&self.transport),
            self.session_id.clone(),
            text,
        )
        .await;
        true
    }

    /// Like `send_message`, but the round trip runs as a background task.
    /// The user message is appended before this returns.
    pub fn spawn_send(&self, raw: &str) -> Option<JoinHandle<()>> {
        let runtime = Handle::try_current().ok()?;
        let text = self.begin_send(raw)?;
        Some(runtime.spawn(dispatch_send(
            Arc::downgrade(&self.shared),
            Arc::clone(&self.transport),
            self.session_id.clone(),
            text,
        )))
    }

    /// Send whatever is in the input buffer
    pub async fn submit(&self) -> bool {
        let input = self.shared.session.lock().input().to_string();
        self.send_message(&input).await
    }

    /// Reset the conversation on the server, then locally. A failed clear
    /// keeps the visible history and appends an explanation instead.
    /// Rejected while a send is in flight. Returns whether the conversation
    /// was cleared.
    pub async fn clear_chat(&self) -> bool {
        if self.shared.session.lock().is_busy() {
            debug!(session_id = %self.session_id, "clear rejected while busy");
            return false;
        }

        match self.transport.clear_history(&self.session_id).await {
            Ok(()) => {
                self.shared.update(ChatSession::reset);
                info!(session_id = %self.session_id, "conversation cleared");
                self.shared.emit(PanelEffect::ScrollToBottom);
                true
            }
            Err(err) => {
                warn!(session_id = %self.session_id, kind = err.kind(), error = %err, "clear failed");
                let text = format!("{} {}", CLEAR_FAILED_PREFIX, err.user_message());
                self.shared.update(|s| {
                    s.push(MessageRole::Assistant, text);
                });
                self.shared.emit(PanelEffect::ScrollToBottom);
                false
            }
        }
    }

    /// Check-and-set under one lock: the single-flight guarantee
    fn begin_send(&self, raw: &str) -> Option<String> {
        match self.shared.update(|s| s.begin_send(raw)) {
            Ok(text) => {
                self.shared.emit(PanelEffect::ScrollToBottom);
                Some(text)
            }
            Err(reason) => {
                debug!(?reason, "send rejected");
                None
            }
        }
    }
}

async fn dispatch_send(
    shared: Weak<Shared>,
    transport: Arc<dyn ChatTransport>,
    session_id: SessionId,
    text: String,
) {
    let mut guard = SendGuard::new(shared.clone());
    let started = Instant::now();
    let result = transport.send_chat_message(&text, &session_id).await;
    guard.disarm();

    let Some(shared) = shared.upgrade() else {
        debug!(session_id = %session_id, "session gone; dropping chat reply");
        return;
    };

    let reply = match result {
        Ok(reply) => {
            info!(
                session_id = %session_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "chat reply received"
            );
            reply
                .text()
                .map(str::to_string)
                .unwrap_or_else(|| EMPTY_REPLY_MESSAGE.to_string())
        }
        Err(err) => {
            warn!(session_id = %session_id, kind = err.kind(), error = %err, "chat request failed");
            err.user_message()
        }
    };

    shared.update(|s| s.finish_send(reply));
    shared.emit(PanelEffect::ScrollToBottom);
}

async fn load_context(shared: Weak<Shared>, transport: Arc<dyn ChatTransport>, session_id: SessionId) {
    let result = transport.fetch_context(&session_id).await;

    let Some(shared) = shared.upgrade() else {
        debug!(session_id = %session_id, "session gone; dropping context");
        return;
    };

    match result {
        Ok(context) => {
            let tables = context.available_tables.len();
            if shared.update(|s| s.apply_context(&context.available_tables)) {
                shared.emit(PanelEffect::ScrollToBottom);
            }
            info!(session_id = %session_id, tables, "session context loaded");
        }
        // Best effort: never shown to the user
        Err(err) => warn!(session_id = %session_id, kind = err.kind(), error = %err, "context unavailable"),
    }
}
