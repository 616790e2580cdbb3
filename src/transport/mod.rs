// Gateway module for transport - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod http;
mod traits;
mod types;

// Public re-exports - the ONLY way to access transport functionality
pub use http::HttpTransport;
pub use traits::ChatTransport;
#[cfg(test)]
pub use traits::MockChatTransport;
pub use types::{ChatReply, ContextInfo, MessageList, SessionSummary, TableRows, UploadReceipt};
