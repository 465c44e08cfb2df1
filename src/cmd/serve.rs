//! HTTP server and schema commands: `taskboard serve`, `taskboard init`.

use anyhow::Result;
use console::style;

use taskboard::board::server::{open_database, start_server};
use taskboard::config::TaskboardToml;

pub async fn cmd_serve(config: &TaskboardToml) -> Result<()> {
    let warnings = config.validate();
    for warning in &warnings {
        tracing::warn!(%warning, "configuration warning");
    }

    start_server(config.server_config()).await
}

pub fn cmd_init(config: &TaskboardToml) -> Result<()> {
    let server = config.server_config();
    open_database(&server)?;
    println!(
        "{} Database initialized at {}",
        style("✓").green(),
        style(server.db_path.display()).cyan()
    );
    Ok(())
}
