use anyhow::Result;
use serde::Serialize;
use std::time::Instant;

use crate::{
    chat::ChatSessionController,
    cli::OutputFormat,
    session::{MessageRole, SessionId},
};

/// Result of a one-shot question
#[derive(Debug, Serialize)]
pub struct AskResult {
    /// Session the question was asked in
    pub session_id: SessionId,
    /// The question as sent
    pub prompt: String,
    /// Assistant reply, or the explanation of why there is none
    pub response: String,
    /// Whether the service answered the context request
    pub context_loaded: bool,
    /// Round trip time in milliseconds
    pub duration_ms: u128,
}

/// Open the panel, wait for its context, ask one question
pub async fn ask(controller: &ChatSessionController, prompt: &str) -> Result<AskResult> {
    let started = Instant::now();

    // Settle the context fetch first so its summary cannot race the question
    if let Some(fetch) = controller.open() {
        let _ = fetch.await;
    }

    if !controller.send_message(prompt).await {
        anyhow::bail!("Nothing to ask: the prompt is empty");
    }

    let snapshot = controller.snapshot();
    let response = snapshot
        .messages
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::Assistant)
        .map(|m| m.text.clone())
        .unwrap_or_default();

    Ok(AskResult {
        session_id: snapshot.session_id,
        prompt: prompt.trim().to_string(),
        response,
        context_loaded: snapshot.context_loaded,
        duration_ms: started.elapsed().as_millis(),
    })
}

/// Render an ask result in the requested format
pub fn format_result(result: &AskResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => result.response.clone(),
        OutputFormat::Json => serde_json::to_string_pretty(result)
            .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ChatReply, ContextInfo, MockChatTransport};
    use crate::utils::TransportError;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_ask_returns_reply() {
        let mut mock = MockChatTransport::new();
        mock.expect_fetch_context().times(1).returning(|_| {
            Ok(ContextInfo {
                available_tables: vec!["GPS".to_string()],
            })
        });
        mock.expect_send_chat_message().times(1).returning(|_, _| {
            Ok(ChatReply {
                response: Some("Max altitude was 120 m.".to_string()),
            })
        });
        let controller = ChatSessionController::new(Arc::new(mock));

        let result = ask(&controller, " max altitude? ").await.unwrap();
        assert_eq!(result.prompt, "max altitude?");
        assert_eq!(result.response, "Max altitude was 120 m.");
        assert!(result.context_loaded);

        // Summary landed before the question
        let messages = controller.snapshot().messages;
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2].text, "max altitude?");
    }

    #[tokio::test]
    async fn test_ask_failure_is_explained() {
        let mut mock = MockChatTransport::new();
        mock.expect_fetch_context()
            .returning(|_| Err(TransportError::NoResponse));
        mock.expect_send_chat_message()
            .returning(|_, _| Err(TransportError::NoResponse));
        let controller = ChatSessionController::new(Arc::new(mock));

        let result = ask(&controller, "anything?").await.unwrap();
        assert_eq!(result.response, TransportError::NoResponse.user_message());
    }

    #[tokio::test]
    async fn test_ask_blank_prompt_fails() {
        let mut mock = MockChatTransport::new();
        mock.expect_fetch_context()
            .returning(|_| Ok(ContextInfo::default()));
        mock.expect_send_chat_message().never();
        let controller = ChatSessionController::new(Arc::new(mock));

        assert!(ask(&controller, "   ").await.is_err());
    }

    #[test]
    fn test_json_format() {
        let result = AskResult {
            session_id: SessionId::from("session_j".to_string()),
            prompt: "q".to_string(),
            response: "a".to_string(),
            context_loaded: false,
            duration_ms: 5,
        };
        let json: serde_json::Value =
            serde_json::from_str(&format_result(&result, OutputFormat::Json)).unwrap();
        assert_eq!(json["session_id"], "session_j");
        assert_eq!(json["response"], "a");
        assert_eq!(format_result(&result, OutputFormat::Text), "a");
    }
}
