//! Demo data command: `taskboard seed`.

use anyhow::{Context, Result};
use console::style;

use taskboard::board::seed::seed_demo_board;
use taskboard::board::server::open_database;
use taskboard::config::TaskboardToml;

pub fn cmd_seed(config: &TaskboardToml) -> Result<()> {
    let server = config.server_config();
    let db = open_database(&server)?;
    let board = seed_demo_board(&db).context("Failed to seed demo board")?;

    println!(
        "{} Seeded board \"{}\" ({}) with {} tasks",
        style("✓").green(),
        style(&board.board.title).bold(),
        board.board.id,
        board.count.tasks
    );
    for column in &board.columns {
        let count = board
            .tasks
            .iter()
            .filter(|t| t.task.column_id == column.id)
            .count();
        println!("  {:<6} {}", column.title, style(count).dim());
    }
    Ok(())
}
