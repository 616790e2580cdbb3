pub mod app;
pub mod chat;
pub mod cli;
pub mod constants;
pub mod runtime;
pub mod session;
pub mod transport;
pub mod utils;

pub use app::{load_config, Config};
pub use chat::{ChatSessionController, PanelEffect};
pub use session::{ChatSnapshot, Message, MessageRole, PanelState, SessionId};
pub use transport::{ChatTransport, HttpTransport};
pub use utils::{FlightChatError, TransportError};
