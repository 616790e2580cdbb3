/// Constants module to avoid magic numbers in the codebase

// Network Configuration
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const CHAT_PATH: &str = "/api/chat";
pub const CLEAR_PATH: &str = "/api/chat/clear";
pub const CONTEXT_PATH: &str = "/api/chat/context";
pub const TABLES_PATH: &str = "/api/tables";
pub const PARSED_DATA_PATH: &str = "/api/parsed-data";
pub const TABLE_PATH: &str = "/api/table";

// Timeouts
pub const SEND_TIMEOUT_SECS: u64 = 90; // analysis requests can run long
pub const CLEAR_TIMEOUT_SECS: u64 = 15;
pub const CONTEXT_TIMEOUT_SECS: u64 = 15;
pub const CONNECT_TIMEOUT_SECS: u64 = 10;
pub const HEALTH_TIMEOUT_MS: u64 = 2000;

// Session
pub const SESSION_ID_PREFIX: &str = "session_";
pub const SESSION_ID_RANDOM_LEN: usize = 9;
pub const FIRST_MESSAGE_ID: u64 = 1;
pub const NEXT_MESSAGE_ID_AFTER_SEED: u64 = 2;

// Context summary
pub const CONTEXT_SUMMARY_MAX_TABLES: usize = 10;

// Table preview
pub const TABLE_PREVIEW_LIMIT: usize = 20;

// Assistant texts
pub const GREETING_MESSAGE: &str = "Hi! I'm your flight log assistant. \
    Ask me anything about the flight data you've uploaded: altitude, battery, GPS, flight modes, or anomalies.";
pub const EMPTY_REPLY_MESSAGE: &str =
    "Sorry, I couldn't come up with a response to that. Please try rephrasing your question.";
pub const SERVICE_UNAVAILABLE_MESSAGE: &str =
    "I can't reach the analysis service. Please verify that the backend server is running and try again.";
pub const NO_RESPONSE_MESSAGE: &str =
    "The analysis service didn't respond. Please check your network connection and try again.";
pub const CLEAR_FAILED_PREFIX: &str = "I couldn't clear the conversation, so your history is unchanged.";
