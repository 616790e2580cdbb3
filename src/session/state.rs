use serde::Serialize;

use super::identity::SessionId;
use super::message::{Message, MessageRole};
use crate::constants::{
    CONTEXT_SUMMARY_MAX_TABLES, FIRST_MESSAGE_ID, GREETING_MESSAGE, NEXT_MESSAGE_ID_AFTER_SEED,
};

/// Visible state of the chat panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PanelState {
    Closed,
    OpenIdle,
    OpenBusy,
}

/// Why a send was not dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejection {
    Empty,
    Busy,
    Closed,
}

/// Read-only view of the session, emitted after every transition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatSnapshot {
    pub session_id: SessionId,
    pub messages: Vec<Message>,
    pub busy: bool,
    pub context_loaded: bool,
    pub panel: PanelState,
    pub input: String,
    /// Bumped by every successful clear; message ids restart with it
    pub generation: u64,
}

/// Conversation state owned by the controller
#[derive(Debug)]
pub struct ChatSession {
    session_id: SessionId,
    messages: Vec<Message>,
    next_id: u64,
    busy: bool,
    context_loaded: bool,
    context_requested: bool,
    visible: bool,
    input: String,
    generation: u64,
}

impl ChatSession {
    /// New session seeded with the greeting
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            messages: vec![greeting()],
            next_id: NEXT_MESSAGE_ID_AFTER_SEED,
            busy: false,
            context_loaded: false,
            context_requested: false,
            visible: false,
            input: String::new(),
            generation: 0,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn panel_state(&self) -> PanelState {
        match (self.visible, self.busy) {
            (false, _) => PanelState::Closed,
            (true, false) => PanelState::OpenIdle,
            (true, true) => PanelState::OpenBusy,
        }
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            session_id: self.session_id.clone(),
            messages: self.messages.clone(),
            busy: self.busy,
            context_loaded: self.context_loaded,
            panel: self.panel_state(),
            input: self.input.clone(),
            generation: self.generation,
        }
    }

    /// Append a message with the next id
    pub fn push(&mut self, role: MessageRole, text: impl Into<String>) -> &Message {
        let message = Message::new(self.next_id, role, text);
        self.next_id += 1;
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// Mark the panel visible. Returns true on the closed -> open transition.
    pub fn open(&mut self) -> bool {
        let opened = !self.visible;
        self.visible = true;
        opened
    }

    pub fn close(&mut self) {
        self.visible = false;
    }

    /// Claim the one context fetch this session is allowed.
    pub fn claim_context_fetch(&mut self) -> bool {
        if self.context_requested || self.context_loaded {
            return false;
        }
        self.context_requested = true;
        true
    }

    /// Record a successful context fetch. Appends the summary only when the
    /// log still holds nothing but the greeting. Returns whether it appended.
    pub fn apply_context(&mut self, tables: &[String]) -> bool {
        self.context_loaded = true;
        if tables.is_empty() || self.messages.len() != 1 {
            return false;
        }
        self.push(MessageRole::Assistant, context_summary(tables));
        true
    }

    /// Validate and start a send: appends the user message, clears the input
    /// and raises `busy`. Returns the trimmed text to dispatch.
    pub fn begin_send(&mut self, raw: &str) -> Result<String, SendRejection> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(SendRejection::Empty);
        }
        if self.busy {
            return Err(SendRejection::Busy);
        }
        if !self.visible {
            return Err(SendRejection::Closed);
        }

        let text = text.to_string();
        self.push(MessageRole::User, text.clone());
        self.input.clear();
        self.busy = true;
        Ok(text)
    }

    /// Resolve the outstanding send with the assistant's text
    pub fn finish_send(&mut self, assistant_text: impl Into<String>) {
        self.push(MessageRole::Assistant, assistant_text);
        self.busy = false;
    }

    /// Drop the busy flag of a send that never resolved (future dropped or panicked)
    pub fn abandon_send(&mut self) {
        self.busy = false;
    }

    /// Replace the log with a fresh greeting after a server-side clear
    pub fn reset(&mut self) {
        self.messages = vec![greeting()];
        self.next_id = NEXT_MESSAGE_ID_AFTER_SEED;
        self.context_loaded = false;
        self.context_requested = false;
        self.generation += 1;
    }
}

fn greeting() -> Message {
    Message::new(FIRST_MESSAGE_ID, MessageRole::Assistant, GREETING_MESSAGE)
}

/// Assistant text describing the data available for this session
pub fn context_summary(tables: &[String]) -> String {
    let shown: Vec<&str> = tables
        .iter()
        .take(CONTEXT_SUMMARY_MAX_TABLES)
        .map(String::as_str)
        .collect();
    let more = tables.len().saturating_sub(shown.len());

    let noun = if tables.len() == 1 { "table" } else { "tables" };
    let mut summary = format!(
        "I have access to your flight data: {} {} available ({}",
        tables.len(),
        noun,
        shown.join(", ")
    );
    if more > 0 {
        summary.push_str(&format!(", and {} more", more));
    }
    summary.push_str("). What would you like to know?");
    summary
}
