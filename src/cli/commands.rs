use anyhow::{Context as _, Result};
use colored::Colorize;
use std::path::Path;

use crate::{
    app::init_config,
    session::SessionId,
    transport::{ChatTransport, HttpTransport, MessageList, SessionSummary, TableRows},
    utils::FlightChatError,
};

use super::Commands;

/// Handle the one-shot subcommands. Returns false for commands that need
/// a chat session (`chat`, `ask`), which the orchestrator runs itself.
pub async fn handle_command(
    command: &Commands,
    transport: &HttpTransport,
    session_id: &SessionId,
) -> Result<bool> {
    match command {
        Commands::Init => {
            let path = init_config()?;
            println!("Configuration file: {}", path.display());
            Ok(true)
        }
        Commands::Version => {
            show_version();
            Ok(true)
        }
        Commands::Status => {
            show_status(transport).await;
            Ok(true)
        }
        Commands::Context => {
            show_context(transport, session_id).await?;
            Ok(true)
        }
        Commands::Clear => {
            transport
                .clear_history(session_id)
                .await
                .map_err(FlightChatError::from)?;
            println!("Cleared conversation for {}", session_id.to_string().cyan());
            Ok(true)
        }
        Commands::Data => {
            let summary = transport
                .session_summary(session_id)
                .await
                .map_err(FlightChatError::from)?;
            for line in summary_lines(&summary) {
                println!("{}", line);
            }
            Ok(true)
        }
        Commands::Table { name, limit } => {
            let rows = transport
                .table_rows(name, *limit)
                .await
                .map_err(FlightChatError::from)?;
            for line in table_lines(&rows) {
                println!("{}", line);
            }
            Ok(true)
        }
        Commands::Upload { file, message_type } => {
            upload_file(transport, session_id, file, message_type).await?;
            Ok(true)
        }
        Commands::Chat | Commands::Ask { .. } => Ok(false),
    }
}

/// Show version information
pub fn show_version() {
    println!("flightchat v{}", env!("CARGO_PKG_VERSION"));
    println!("   Ask questions about your uploaded flight-log data");
}

/// Report whether the service answers and what it holds
async fn show_status(transport: &HttpTransport) {
    println!("Analysis service: {}", transport.base_url());

    match transport.health().await {
        Ok(banner) => println!("  {} {}", "✓".green(), banner),
        Err(e) => {
            println!("  {} {}", "✗".red(), e.user_message());
            return;
        }
    }

    match transport.list_tables().await {
        Ok(tables) if tables.is_empty() => println!("  No flight data uploaded yet"),
        Ok(tables) => println!("  {} table(s): {}", tables.len(), tables.join(", ")),
        Err(e) => println!("  {} could not list tables: {}", "!".yellow(), e),
    }
}

async fn show_context(transport: &HttpTransport, session_id: &SessionId) -> Result<()> {
    let context = transport
        .fetch_context(session_id)
        .await
        .map_err(FlightChatError::from)?;

    if context.is_empty() {
        println!("No data available for session {}", session_id);
    } else {
        println!("Session {}:", session_id.to_string().cyan());
        for table in &context.available_tables {
            println!("  • {}", table);
        }
    }
    Ok(())
}

fn summary_lines(summary: &SessionSummary) -> Vec<String> {
    if summary.message_types.is_empty() {
        return vec![format!("No parsed data stored for session {}", summary.session_id)];
    }

    let mut lines = vec![format!("Session {}:", summary.session_id.cyan())];
    for message_type in &summary.message_types {
        match summary.message_counts.get(message_type) {
            Some(count) => lines.push(format!("  • {} ({} rows)", message_type, count)),
            None => lines.push(format!("  • {}", message_type)),
        }
    }
    lines
}

/// One compact JSON object per row
fn table_lines(rows: &TableRows) -> Vec<String> {
    let mut lines = vec![format!("{} ({} rows)", rows.table.green(), rows.rows.len())];
    lines.extend(
        rows.rows
            .iter()
            .map(|row| format!("  {}", serde_json::Value::Object(row.clone()))),
    );
    lines
}

/// Read a message list from a JSON file
pub fn read_message_list(path: &Path) -> Result<MessageList> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let list: MessageList = serde_json::from_str(&raw).map_err(|e| {
        FlightChatError::InvalidPayload(format!(
            "{}: expected {{ field: {{ index: value }} }} ({})",
            path.display(),
            e
        ))
    })?;
    if list.is_empty() {
        return Err(FlightChatError::InvalidPayload(format!("{} has no fields", path.display())).into());
    }
    Ok(list)
}

async fn upload_file(
    transport: &HttpTransport,
    session_id: &SessionId,
    file: &Path,
    message_type: &str,
) -> Result<()> {
    let list = read_message_list(file)?;
    let receipt = transport
        .upload_parsed_data(session_id, message_type, &list)
        .await
        .map_err(FlightChatError::from)?;

    println!(
        "Uploaded {} ({} fields) into table {}",
        message_type.green(),
        list.len(),
        receipt.table_name.as_deref().unwrap_or(message_type)
    );
    println!("Session: {}", session_id.to_string().cyan());
    println!("   Reuse it with: flightchat --session-id {} chat", session_id);
    Ok(())
}
