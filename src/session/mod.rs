/// Session management module - Gateway

mod identity;
mod message;
mod state;

pub use identity::SessionId;
pub use message::{Message, MessageRole};
pub use state::{context_summary, ChatSession, ChatSnapshot, PanelState, SendRejection};
