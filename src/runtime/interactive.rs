use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::{wrappers::LinesStream, StreamExt};

use crate::{
    app::UIConfig,
    chat::{ChatSessionController, PanelEffect},
    session::{ChatSnapshot, Message, MessageRole, PanelState},
};

const HELP: &str = "Commands: /open  /close (same as Esc)  /clear  /help  /quit";

/// A line typed by the user, mapped to a controller intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Open,
    Close,
    Clear,
    Help,
    Quit,
    Send(String),
    Unknown(String),
}

impl Intent {
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        // A bare escape character closes the panel, like the Esc key
        if trimmed == "\u{1b}" {
            return Some(Self::Close);
        }
        let Some(command) = trimmed.strip_prefix('/') else {
            return Some(Self::Send(line.to_string()));
        };
        Some(match command.to_lowercase().as_str() {
            "open" => Self::Open,
            "close" | "esc" => Self::Close,
            "clear" => Self::Clear,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            _ => Self::Unknown(trimmed.to_string()),
        })
    }
}

/// Turns snapshots into terminal lines, printing only what changed
#[derive(Debug)]
pub struct Renderer {
    show_timestamps: bool,
    printed: usize,
    generation: Option<u64>,
    busy: bool,
    panel: PanelState,
}

impl Renderer {
    pub fn new(ui: &UIConfig) -> Self {
        Self {
            show_timestamps: ui.show_timestamps,
            printed: 0,
            generation: None,
            busy: false,
            panel: PanelState::Closed,
        }
    }

    pub fn render(&mut self, snapshot: &ChatSnapshot) -> Vec<String> {
        let mut lines = Vec::new();

        if snapshot.panel != self.panel {
            match snapshot.panel {
                PanelState::Closed => lines.push("(chat closed, /open to reopen)".dimmed().to_string()),
                _ if self.panel == PanelState::Closed => {
                    lines.push("(chat open)".dimmed().to_string())
                }
                _ => {}
            }
        }

        // Ids restart after a clear, so only the generation tells a reset log apart
        if self.generation.is_some_and(|g| g != snapshot.generation) {
            lines.push("── conversation cleared ──".dimmed().to_string());
            self.printed = 0;
        }
        self.generation = Some(snapshot.generation);

        for message in snapshot.messages.iter().skip(self.printed) {
            lines.push(self.format_message(message));
        }
        self.printed = self.printed.max(snapshot.messages.len());

        if snapshot.busy && !self.busy {
            lines.push("assistant is typing…".italic().dimmed().to_string());
        }

        self.busy = snapshot.busy;
        self.panel = snapshot.panel;
        lines
    }

    fn format_message(&self, message: &Message) -> String {
        let label = match message.role {
            MessageRole::User => "[You]".cyan().bold(),
            MessageRole::Assistant => "[Assistant]".green().bold(),
        };
        if self.show_timestamps {
            format!(
                "{} {} {}",
                message.created_at.format("%H:%M:%S").to_string().dimmed(),
                label,
                message.text
            )
        } else {
            format!("{} {}", label, message.text)
        }
    }
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

fn print_prompt() {
    print!("{} ", ">".bold());
    let _ = std::io::stdout().flush();
}

/// Line-based presentation adapter: stdin lines become intents, snapshots
/// and effects become terminal output.
pub async fn run_interactive(controller: Arc<ChatSessionController>, ui: &UIConfig) -> Result<()> {
    if !ui.color {
        colored::control::set_override(false);
    }

    let mut renderer = Renderer::new(ui);
    let mut snapshots = controller.subscribe();
    let mut effects = controller.take_effects();
    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());

    println!("flightchat {} · session {}", env!("CARGO_PKG_VERSION"), controller.session_id());
    println!("{}", HELP.dimmed());

    // The context fetch runs in the background; its summary arrives as a snapshot
    let _ = controller.open();
    print_lines(&renderer.render(&snapshots.borrow_and_update()));

    loop {
        tokio::select! {
            line = lines.next() => {
                let Some(line) = line else { break };
                let line = line?;
                match Intent::parse(&line) {
                    None => print_prompt(),
                    Some(Intent::Quit) => break,
                    Some(Intent::Open) => { let _ = controller.open(); }
                    Some(Intent::Close) => controller.close(),
                    Some(Intent::Clear) => {
                        if controller.snapshot().busy {
                            println!("{}", "Still waiting for the previous answer…".yellow());
                        } else {
                            controller.clear_chat().await;
                        }
                    }
                    Some(Intent::Help) => println!("{}", HELP.dimmed()),
                    Some(Intent::Unknown(cmd)) => println!("Unknown command {} · {}", cmd.yellow(), HELP.dimmed()),
                    Some(Intent::Send(text)) => {
                        controller.set_input(text);
                        let snapshot = controller.snapshot();
                        if controller.spawn_send(&snapshot.input).is_none() {
                            match snapshot.panel {
                                PanelState::Closed => println!("{}", "Chat is closed. Type /open first.".yellow()),
                                PanelState::OpenBusy => println!("{}", "Still waiting for the previous answer…".yellow()),
                                PanelState::OpenIdle => {}
                            }
                        }
                    }
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                print_lines(&renderer.render(&snapshot));
            }
            Some(effect) = async {
                match effects.as_mut() {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            } => {
                // Scrolling is implicit on a terminal; focus means "ready for input"
                if effect == PanelEffect::FocusInput {
                    print_prompt();
                }
            }
        }
    }

    controller.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ChatSession, SessionId};
    use pretty_assertions::assert_eq;

    fn plain_renderer() -> Renderer {
        colored::control::set_override(false);
        Renderer::new(&UIConfig {
            color: false,
            show_timestamps: false,
        })
    }

    #[test]
    fn test_intent_parsing() {
        assert_eq!(Intent::parse("   "), None);
        assert_eq!(Intent::parse("/quit"), Some(Intent::Quit));
        assert_eq!(Intent::parse("/CLOSE"), Some(Intent::Close));
        assert_eq!(Intent::parse("\u{1b}"), Some(Intent::Close));
        assert_eq!(Intent::parse("/clear"), Some(Intent::Clear));
        assert_eq!(
            Intent::parse("max altitude?"),
            Some(Intent::Send("max altitude?".to_string()))
        );
        assert_eq!(
            Intent::parse("/fly"),
            Some(Intent::Unknown("/fly".to_string()))
        );
    }

    #[test]
    fn test_renderer_prints_only_new_messages() {
        let mut renderer = plain_renderer();
        let mut session = ChatSession::new(SessionId::from("session_r".to_string()));
        session.open();

        let first = renderer.render(&session.snapshot());
        assert_eq!(first.len(), 2); // "(chat open)" + greeting
        assert!(first[1].starts_with("[Assistant] "));

        session.begin_send("hdop?").unwrap();
        let lines = renderer.render(&session.snapshot());
        assert_eq!(lines, vec!["[You] hdop?".to_string(), "assistant is typing…".to_string()]);

        session.finish_send("HDOP stayed below 1.2.");
        let lines = renderer.render(&session.snapshot());
        assert_eq!(lines, vec!["[Assistant] HDOP stayed below 1.2.".to_string()]);

        assert!(renderer.render(&session.snapshot()).is_empty());
    }

    #[test]
    fn test_renderer_notices_reset() {
        let mut renderer = plain_renderer();
        let mut session = ChatSession::new(SessionId::from("session_r".to_string()));
        session.open();
        session.begin_send("one").unwrap();
        session.finish_send("two");
        renderer.render(&session.snapshot());

        session.reset();
        let lines = renderer.render(&session.snapshot());
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("conversation cleared"));
        assert!(lines[1].starts_with("[Assistant] "));
    }

    #[test]
    fn test_renderer_reset_followed_by_send() {
        let mut renderer = plain_renderer();
        let mut session = ChatSession::new(SessionId::from("session_r".to_string()));
        session.open();
        session.apply_context(&["GPS".to_string()]);
        renderer.render(&session.snapshot());

        // Same length and ids as before the clear
        session.reset();
        session.begin_send("after clear").unwrap();
        let lines = renderer.render(&session.snapshot());

        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("conversation cleared"));
        assert!(lines[1].starts_with("[Assistant] Hi!"));
        assert_eq!(lines[2], "[You] after clear");
        assert_eq!(lines[3], "assistant is typing…");
    }

    #[test]
    fn test_renderer_close_notice() {
        let mut renderer = plain_renderer();
        let mut session = ChatSession::new(SessionId::from("session_r".to_string()));
        session.open();
        renderer.render(&session.snapshot());

        session.close();
        let lines = renderer.render(&session.snapshot());
        assert_eq!(lines, vec!["(chat closed, /open to reopen)".to_string()]);
    }
}
