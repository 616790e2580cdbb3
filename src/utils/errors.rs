use thiserror::Error;

use crate::constants::{NO_RESPONSE_MESSAGE, SERVICE_UNAVAILABLE_MESSAGE};

/// Failure kinds raised by the chat transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established
    #[error("Analysis service unavailable")]
    ServiceUnavailable,

    /// Remote answered with an error status, or an explicit failure in its payload
    #[error("Server error ({status_code}){}", detail_suffix(.detail))]
    ServerError {
        status_code: u16,
        detail: Option<String>,
    },

    /// Request went out but nothing came back (timeout, dropped connection)
    #[error("No response from analysis service")]
    NoResponse,

    /// The request could not be built or sent
    #[error("Request error: {message}")]
    RequestError { message: String },
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) if !d.is_empty() => format!(": {}", d),
        _ => String::new(),
    }
}

impl TransportError {
    /// Conversational explanation shown to the user in place of a reply
    pub fn user_message(&self) -> String {
        match self {
            Self::ServiceUnavailable => SERVICE_UNAVAILABLE_MESSAGE.to_string(),
            Self::ServerError { status_code, detail } => match detail {
                Some(d) if !d.is_empty() => format!(
                    "The analysis service returned an error (status {}): {}",
                    status_code, d
                ),
                _ => format!(
                    "The analysis service returned an error (status {}).",
                    status_code
                ),
            },
            Self::NoResponse => NO_RESPONSE_MESSAGE.to_string(),
            Self::RequestError { message } => {
                format!("Your request couldn't be sent: {}", message)
            }
        }
    }

    /// Short tag used in structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ServiceUnavailable => "service_unavailable",
            Self::ServerError { .. } => "server_error",
            Self::NoResponse => "no_response",
            Self::RequestError { .. } => "request_error",
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        // Timeouts first: a connect timeout is also reported as a connect error
        if err.is_timeout() {
            Self::NoResponse
        } else if err.is_connect() {
            Self::ServiceUnavailable
        } else if err.is_builder() {
            Self::RequestError {
                message: err.to_string(),
            }
        } else if err.is_decode() {
            Self::ServerError {
                status_code: err.status().map(|s| s.as_u16()).unwrap_or(200),
                detail: Some("malformed response body".to_string()),
            }
        } else if let Some(status) = err.status() {
            Self::ServerError {
                status_code: status.as_u16(),
                detail: None,
            }
        } else {
            Self::NoResponse
        }
    }
}

/// Top-level error type for flightchat
#[derive(Error, Debug)]
pub enum FlightChatError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid upload payload: {0}")]
    InvalidPayload(String),
}
