use async_trait::async_trait;

use super::types::{ChatReply, ContextInfo};
use crate::session::SessionId;
use crate::utils::TransportError;

/// The three remote operations the chat controller depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Ask the analysis service a question on behalf of a session
    async fn send_chat_message(
        &self,
        text: &str,
        session_id: &SessionId,
    ) -> Result<ChatReply, TransportError>;

    /// Drop the server-side conversation kept for a session
    async fn clear_history(&self, session_id: &SessionId) -> Result<(), TransportError>;

    /// Describe the data the service holds for a session
    async fn fetch_context(&self, session_id: &SessionId) -> Result<ContextInfo, TransportError>;
}
