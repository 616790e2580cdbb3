use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use std::time::Duration;
use tracing::{debug, warn};

use super::traits::ChatTransport;
use super::types::{
    parse_chat_reply, parse_clear, parse_context, parse_health, parse_session_summary,
    parse_table_rows, parse_tables, parse_upload, ChatReply, ChatRequest, ContextInfo,
    MessageList, ParsedDataRequest, SessionSummary, TableRows, UploadReceipt,
};
use crate::app::{Config, TimeoutConfig};
use crate::constants::{
    CHAT_PATH, CLEAR_PATH, CONTEXT_PATH, HEALTH_TIMEOUT_MS, PARSED_DATA_PATH, TABLES_PATH,
    TABLE_PATH,
};
use crate::session::SessionId;
use crate::utils::TransportError;

/// JSON-over-HTTP client for the flight log analysis service
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeouts: TimeoutConfig,
}

impl HttpTransport {
    /// Create a transport for the given base endpoint
    pub fn new(base_url: &str, timeouts: TimeoutConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(timeouts.connect())
            .build()
            .map_err(|e| TransportError::RequestError {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeouts,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        Self::new(&config.base_url, config.timeouts.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `path` plus one percent-encoded trailing segment
    fn segment_url(&self, path: &str, segment: &str) -> Result<Url, TransportError> {
        let invalid = |detail: String| TransportError::RequestError {
            message: format!("invalid URL for {}: {}", path, detail),
        };
        let mut url = Url::parse(&self.url(path)).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("base URL cannot have a path".to_string()))?
            .push(segment);
        Ok(url)
    }

    /// Send a request and hand back status and body text
    async fn execute(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<(u16, String), TransportError> {
        let response = request.timeout(timeout).send().await.map_err(|e| {
            let err = TransportError::from(e);
            warn!(operation, kind = err.kind(), base_url = %self.base_url, "request failed");
            err
        })?;

        let status = response.status().as_u16();
        // Losing the body mid-read counts as no response
        let body = response.text().await.map_err(TransportError::from)?;
        debug!(operation, status, bytes = body.len(), "response received");
        Ok((status, body))
    }

    /// Check the service root answers; returns its banner message
    pub async fn health(&self) -> Result<String, TransportError> {
        let request = self.client.get(self.url("/"));
        let (status, body) = self
            .execute("health", request, Duration::from_millis(HEALTH_TIMEOUT_MS))
            .await?;
        parse_health(status, &body)
    }

    /// List every table the service database holds
    pub async fn list_tables(&self) -> Result<Vec<String>, TransportError> {
        let request = self.client.get(self.url(TABLES_PATH));
        let (status, body) = self
            .execute("list_tables", request, self.timeouts.context())
            .await?;
        parse_tables(status, &body)
    }

    /// Summary of the parsed data uploaded under a session
    pub async fn session_summary(
        &self,
        session_id: &SessionId,
    ) -> Result<SessionSummary, TransportError> {
        let url = self.segment_url(PARSED_DATA_PATH, session_id.as_str())?;
        let request = self.client.get(url);
        let (status, body) = self
            .execute("session_summary", request, self.timeouts.context())
            .await?;
        parse_session_summary(status, &body)
    }

    /// Up to `limit` rows from one table
    pub async fn table_rows(&self, table: &str, limit: usize) -> Result<TableRows, TransportError> {
        let url = self.segment_url(TABLE_PATH, table)?;
        let request = self.client.get(url).query(&[("limit", limit)]);
        let (status, body) = self
            .execute("table_rows", request, self.timeouts.context())
            .await?;
        parse_table_rows(status, &body, table)
    }

    /// Push one message type of parsed flight-log data for a session
    pub async fn upload_parsed_data(
        &self,
        session_id: &SessionId,
        message_type: &str,
        message_list: &MessageList,
    ) -> Result<UploadReceipt, TransportError> {
        let payload = ParsedDataRequest {
            session_id: session_id.as_str(),
            message_type,
            message_list,
        };
        let request = self.client.post(self.url(PARSED_DATA_PATH)).json(&payload);
        let (status, body) = self
            .execute("upload_parsed_data", request, self.timeouts.send())
            .await?;
        parse_upload(status, &body)
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send_chat_message(
        &self,
        text: &str,
        session_id: &SessionId,
    ) -> Result<ChatReply, TransportError> {
        let payload = ChatRequest {
            message: text,
            session_id: session_id.as_str(),
        };
        let request = self.client.post(self.url(CHAT_PATH)).json(&payload);
        let (status, body) = self
            .execute("send_chat_message", request, self.timeouts.send())
            .await?;
        parse_chat_reply(status, &body)
    }

    async fn clear_history(&self, session_id: &SessionId) -> Result<(), TransportError> {
        let request = self
            .client
            .post(self.url(CLEAR_PATH))
            .query(&[("session_id", session_id.as_str())]);
        let (status, body) = self
            .execute("clear_history", request, self.timeouts.clear())
            .await?;
        parse_clear(status, &body)
    }

    async fn fetch_context(&self, session_id: &SessionId) -> Result<ContextInfo, TransportError> {
        let request = self
            .client
            .get(self.url(CONTEXT_PATH))
            .query(&[("session_id", session_id.as_str())]);
        let (status, body) = self
            .execute("fetch_context", request, self.timeouts.context())
            .await?;
        parse_context(status, &body)
    }
}
