/// Runtime orchestration - Gateway
mod interactive;
mod non_interactive;
mod orchestrator;

pub use interactive::{run_interactive, Intent, Renderer};
pub use non_interactive::{ask, format_result, AskResult};
pub use orchestrator::Orchestrator;
