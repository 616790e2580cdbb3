use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    app::{load_config, load_config_file, Config},
    chat::ChatSessionController,
    cli::{handle_command, Cli, Commands},
    session::SessionId,
    transport::HttpTransport,
};

use super::{interactive::run_interactive, non_interactive};

/// Main runtime orchestrator
pub struct Orchestrator {
    cli: Cli,
    config: Config,
}

impl Orchestrator {
    /// Create a new orchestrator from CLI args
    pub fn new(cli: Cli) -> Result<Self> {
        let config = if let Some(config_path) = &cli.config {
            load_config_file(config_path)?
        } else {
            match load_config() {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!("Failed to load config: {:#}. Using defaults.", e);
                    Config::default()
                }
            }
        };

        Ok(Self::with_config(cli, config))
    }

    /// Build from an already loaded config; `--base-url` still wins
    pub fn with_config(cli: Cli, mut config: Config) -> Self {
        if let Some(base_url) = &cli.base_url {
            config.base_url = base_url.clone();
        }
        Self { cli, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn session_id(&self) -> SessionId {
        match &self.cli.session_id {
            Some(id) => SessionId::from(id.clone()),
            None => SessionId::generate(),
        }
    }

    /// Run the orchestrator
    pub async fn run(self) -> Result<()> {
        let transport = HttpTransport::from_config(&self.config)
            .context("Failed to set up the HTTP client")?;
        let session_id = self.session_id();
        info!(base_url = %self.config.base_url, session_id = %session_id, "starting");

        if let Some(command) = &self.cli.command {
            if handle_command(command, &transport, &session_id).await? {
                return Ok(());
            }
        }

        let controller = ChatSessionController::with_session_id(Arc::new(transport), session_id);

        match &self.cli.command {
            Some(Commands::Ask {
                prompt,
                output_format,
            }) => {
                let result = non_interactive::ask(&controller, prompt).await?;
                println!("{}", non_interactive::format_result(&result, *output_format));
                Ok(())
            }
            _ => run_interactive(Arc::new(controller), &self.config.ui).await,
        }
    }
}
