use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::utils::TransportError;

const SUCCESS_STATUS: &str = "success";
const MAX_DETAIL_LEN: usize = 300;

/// Assistant reply to a chat message
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatReply {
    /// Response text; absent or empty when the service had nothing to say
    pub response: Option<String>,
}

impl ChatReply {
    pub fn text(&self) -> Option<&str> {
        self.response
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Server-side data available to a session
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ContextInfo {
    pub available_tables: Vec<String>,
}

impl ContextInfo {
    pub fn is_empty(&self) -> bool {
        self.available_tables.is_empty()
    }
}

/// Receipt for a parsed-data upload
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UploadReceipt {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub table_name: Option<String>,
}

/// One message type worth of parsed log data: field -> (row index -> value)
pub type MessageList = BTreeMap<String, BTreeMap<String, Value>>;

/// What the service holds in memory for one session's uploads
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct SessionSummary {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub message_types: Vec<String>,
    /// Only message types stored as row lists are counted
    #[serde(default)]
    pub message_counts: BTreeMap<String, u64>,
}

/// First rows of one stored table
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TableRows {
    pub table: String,
    pub rows: Vec<serde_json::Map<String, Value>>,
}

// Request bodies

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub message: &'a str,
    pub session_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ParsedDataRequest<'a> {
    pub session_id: &'a str,
    pub message_type: &'a str,
    pub message_list: &'a MessageList,
}

// Response bodies

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseBody {
    status: String,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContextResponseBody {
    status: String,
    #[serde(default)]
    context: Option<ContextBody>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ContextBody {
    #[serde(default)]
    available_tables: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TablesResponseBody {
    status: String,
    #[serde(default)]
    tables: Vec<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryResponseBody {
    status: String,
    #[serde(default)]
    summary: Option<SessionSummary>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableResponseBody {
    status: String,
    #[serde(default)]
    table: Option<String>,
    #[serde(default)]
    data: Vec<serde_json::Map<String, Value>>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    message: String,
}

/// Map a non-2xx status to `ServerError`, pulling detail from the body
pub(crate) fn check_status(status: u16, body: &str) -> Result<(), TransportError> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    Err(TransportError::ServerError {
        status_code: status,
        detail: error_detail(body),
    })
}

/// FastAPI puts errors under `detail`; the service's own handlers use `message`
fn error_detail(body: &str) -> Option<String> {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for key in ["detail", "message", "error"] {
            match json.get(key) {
                Some(Value::String(s)) => return Some(s.clone()),
                Some(Value::Null) | None => {}
                Some(other) => return Some(other.to_string()),
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(MAX_DETAIL_LEN).collect())
    }
}

fn decode<T: for<'de> Deserialize<'de>>(status: u16, body: &str) -> Result<T, TransportError> {
    serde_json::from_str(body).map_err(|e| TransportError::ServerError {
        status_code: status,
        detail: Some(format!("malformed response body: {}", e)),
    })
}

fn payload_failure(status: u16, reported: &str, message: Option<String>) -> TransportError {
    TransportError::ServerError {
        status_code: status,
        detail: Some(message.unwrap_or_else(|| format!("service reported status '{}'", reported))),
    }
}

pub(crate) fn parse_chat_reply(status: u16, body: &str) -> Result<ChatReply, TransportError> {
    check_status(status, body)?;
    let parsed: ChatResponseBody = decode(status, body)?;
    if parsed.status != SUCCESS_STATUS {
        return Err(payload_failure(status, &parsed.status, parsed.message));
    }
    Ok(ChatReply {
        response: parsed.response,
    })
}

pub(crate) fn parse_context(status: u16, body: &str) -> Result<ContextInfo, TransportError> {
    check_status(status, body)?;
    let parsed: ContextResponseBody = decode(status, body)?;
    if parsed.status != SUCCESS_STATUS {
        return Err(payload_failure(status, &parsed.status, parsed.message));
    }

    let available_tables = parsed
        .context
        .unwrap_or_default()
        .available_tables
        .into_iter()
        .map(|table| match table {
            Value::String(name) => name,
            Value::Object(ref obj) => obj
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| table.to_string()),
            other => other.to_string(),
        })
        .collect();

    Ok(ContextInfo { available_tables })
}

/// Clear accepts any 2xx, but a JSON body that explicitly reports failure still fails
pub(crate) fn parse_clear(status: u16, body: &str) -> Result<(), TransportError> {
    check_status(status, body)?;
    if let Ok(envelope) = serde_json::from_str::<StatusEnvelope>(body) {
        if let Some(reported) = envelope.status {
            if reported == "error" {
                return Err(payload_failure(status, &reported, envelope.message));
            }
        }
    }
    Ok(())
}

pub(crate) fn parse_tables(status: u16, body: &str) -> Result<Vec<String>, TransportError> {
    check_status(status, body)?;
    let parsed: TablesResponseBody = decode(status, body)?;
    if parsed.status != SUCCESS_STATUS {
        return Err(payload_failure(status, &parsed.status, parsed.message));
    }
    Ok(parsed.tables)
}

pub(crate) fn parse_upload(status: u16, body: &str) -> Result<UploadReceipt, TransportError> {
    check_status(status, body)?;
    let receipt: UploadReceipt = decode(status, body)?;
    if receipt.status != SUCCESS_STATUS {
        return Err(payload_failure(status, &receipt.status, receipt.message));
    }
    Ok(receipt)
}

pub(crate) fn parse_session_summary(
    status: u16,
    body: &str,
) -> Result<SessionSummary, TransportError> {
    check_status(status, body)?;
    let parsed: SummaryResponseBody = decode(status, body)?;
    if parsed.status != SUCCESS_STATUS {
        return Err(payload_failure(status, &parsed.status, parsed.message));
    }
    Ok(parsed.summary.unwrap_or_default())
}

/// `requested` names the table when the body leaves it out
pub(crate) fn parse_table_rows(
    status: u16,
    body: &str,
    requested: &str,
) -> Result<TableRows, TransportError> {
    check_status(status, body)?;
    let parsed: TableResponseBody = decode(status, body)?;
    if parsed.status != SUCCESS_STATUS {
        return Err(payload_failure(status, &parsed.status, parsed.message));
    }
    Ok(TableRows {
        table: parsed.table.unwrap_or_else(|| requested.to_string()),
        rows: parsed.data,
    })
}

pub(crate) fn parse_health(status: u16, body: &str) -> Result<String, TransportError> {
    check_status(status, body)?;
    let parsed: HealthBody = decode(status, body)?;
    Ok(parsed.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_chat_success() {
        let body = json!({ "status": "success", "response": "Altitude rose steadily." }).to_string();
        let reply = parse_chat_reply(200, &body).unwrap();
        assert_eq!(reply.text(), Some("Altitude rose steadily."));
    }

    #[test]
    fn test_chat_blank_response_has_no_text() {
        let body = json!({ "status": "success", "response": "   " }).to_string();
        assert_eq!(parse_chat_reply(200, &body).unwrap().text(), None);

        let body = json!({ "status": "success" }).to_string();
        assert_eq!(parse_chat_reply(200, &body).unwrap().text(), None);
    }

    #[test]
    fn test_chat_error_status_on_http_200() {
        let body = json!({ "status": "error", "message": "no data for session" }).to_string();
        let err = parse_chat_reply(200, &body).unwrap_err();
        assert_eq!(
            err,
            TransportError::ServerError {
                status_code: 200,
                detail: Some("no data for session".to_string()),
            }
        );
    }

    #[test]
    fn test_http_error_uses_fastapi_detail() {
        let body = json!({ "detail": "Internal Server Error" }).to_string();
        let err = parse_chat_reply(500, &body).unwrap_err();
        assert_eq!(
            err,
            TransportError::ServerError {
                status_code: 500,
                detail: Some("Internal Server Error".to_string()),
            }
        );
    }

    #[test]
    fn test_http_error_plain_text_and_empty_body() {
        match parse_chat_reply(502, "Bad Gateway").unwrap_err() {
            TransportError::ServerError { status_code, detail } => {
                assert_eq!(status_code, 502);
                assert_eq!(detail.as_deref(), Some("Bad Gateway"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(matches!(
            parse_chat_reply(404, ""),
            Err(TransportError::ServerError { status_code: 404, detail: None })
        ));
    }

    #[test]
    fn test_malformed_body_is_server_error() {
        assert!(matches!(
            parse_chat_reply(200, "<html>"),
            Err(TransportError::ServerError { status_code: 200, .. })
        ));
    }

    #[test]
    fn test_context_tables() {
        let body = json!({
            "status": "success",
            "context": { "available_tables": ["GPS", "ATT", { "name": "BAT", "rows": 10 }] }
        })
        .to_string();
        let info = parse_context(200, &body).unwrap();
        assert_eq!(info.available_tables, vec!["GPS", "ATT", "BAT"]);
    }

    #[test]
    fn test_context_missing_tables_is_empty() {
        let body = json!({ "status": "success", "context": {} }).to_string();
        assert!(parse_context(200, &body).unwrap().is_empty());

        let body = json!({ "status": "success" }).to_string();
        assert!(parse_context(200, &body).unwrap().is_empty());
    }

    #[test]
    fn test_clear_accepts_any_2xx() {
        assert!(parse_clear(204, "").is_ok());
        assert!(parse_clear(200, "{\"status\":\"success\"}").is_ok());
        assert!(parse_clear(200, "cleared").is_ok());
        assert!(parse_clear(200, "{\"status\":\"error\",\"message\":\"locked\"}").is_err());
        assert!(parse_clear(500, "").is_err());
    }

    #[test]
    fn test_upload_receipt() {
        let body = json!({
            "status": "success",
            "message": "Data received and stored",
            "session_id": "session_abc",
            "table_name": "GPS"
        })
        .to_string();
        let receipt = parse_upload(200, &body).unwrap();
        assert_eq!(receipt.table_name.as_deref(), Some("GPS"));

        let body = json!({ "status": "error", "message": "Failed to process data" }).to_string();
        assert!(parse_upload(200, &body).is_err());
    }

    #[test]
    fn test_tables_and_health() {
        let body = json!({ "status": "success", "tables": ["GPS", "IMU"] }).to_string();
        assert_eq!(parse_tables(200, &body).unwrap(), vec!["GPS", "IMU"]);

        let body = json!({ "message": "UAV Logger Chatbot API is running" }).to_string();
        assert_eq!(parse_health(200, &body).unwrap(), "UAV Logger Chatbot API is running");
    }

    #[test]
    fn test_session_summary() {
        let body = json!({
            "status": "success",
            "summary": {
                "session_id": "session_abc",
                "message_types": ["GPS", "ATT"],
                "message_counts": { "GPS": 120 }
            }
        })
        .to_string();
        let summary = parse_session_summary(200, &body).unwrap();
        assert_eq!(summary.message_types, vec!["GPS", "ATT"]);
        assert_eq!(summary.message_counts.get("GPS"), Some(&120));

        // The service answers 200 for unknown sessions
        let body = json!({ "status": "error", "message": "No data found for session session_x" })
            .to_string();
        assert_eq!(
            parse_session_summary(200, &body).unwrap_err(),
            TransportError::ServerError {
                status_code: 200,
                detail: Some("No data found for session session_x".to_string()),
            }
        );
    }

    #[test]
    fn test_table_rows() {
        let body = json!({
            "status": "success",
            "table": "GPS",
            "data": [{ "Alt": 10.5, "Lat": 47.1 }, { "Alt": 11.0, "Lat": 47.2 }],
            "count": 2
        })
        .to_string();
        let rows = parse_table_rows(200, &body, "GPS").unwrap();
        assert_eq!(rows.table, "GPS");
        assert_eq!(rows.rows.len(), 2);
        assert_eq!(rows.rows[1]["Alt"], json!(11.0));

        let body = json!({ "status": "success", "data": [] }).to_string();
        assert_eq!(parse_table_rows(200, &body, "BAT").unwrap().table, "BAT");

        let body = json!({ "status": "error", "message": "no such table: NOPE" }).to_string();
        assert!(parse_table_rows(200, &body, "NOPE").is_err());
    }

    #[test]
    fn test_parsed_data_request_shape() {
        let mut list = MessageList::new();
        list.insert(
            "Alt".to_string(),
            [("0".to_string(), json!(12.5))].into_iter().collect(),
        );
        let request = ParsedDataRequest {
            session_id: "session_x",
            message_type: "GPS",
            message_list: &list,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["sessionId"], "session_x");
        assert_eq!(value["messageType"], "GPS");
        assert_eq!(value["messageList"]["Alt"]["0"], 12.5);
    }
}
