/// Chat session controller - Gateway

mod controller;

pub use controller::{ChatSessionController, PanelEffect};
