//! Demo data: a "Platform Launch" board with a handful of tasks.

use super::db::BoardDb;
use super::models::{BoardAggregate, NewBoard, NewTask, Priority};
use crate::errors::{BoardError, Result};

pub const DEMO_BOARD_TITLE: &str = "Platform Launch";

/// `(title, column, priority, description)` for each demo task.
const DEMO_TASKS: [(&str, &str, Priority, &str); 5] = [
    (
        "Build UI for onboarding flow",
        "TODO",
        Priority::High,
        "Create user-friendly onboarding screens with proper validation",
    ),
    (
        "Build UI for search",
        "TODO",
        Priority::Medium,
        "Implement search functionality with filters",
    ),
    (
        "Build settings UI",
        "TODO",
        Priority::Low,
        "Create comprehensive settings panel",
    ),
    (
        "QA and test all major user journeys",
        "TODO",
        Priority::High,
        "Comprehensive testing of all user flows",
    ),
    (
        "Design settings and search pages",
        "DOING",
        Priority::Medium,
        "Complete UI/UX design for settings and search",
    ),
];

/// Create the demo board and its tasks. Returns the refreshed aggregate.
pub fn seed_demo_board(db: &BoardDb) -> Result<BoardAggregate> {
    let board = db.create_board(&NewBoard {
        title: DEMO_BOARD_TITLE.to_string(),
        description: Some("Launch preparation for our new platform".to_string()),
        color: "#8B5CF6".to_string(),
    })?;

    for (title, column, priority, description) in DEMO_TASKS {
        let column_id = board
            .column_titled(column)
            .map(|c| c.id.clone())
            .ok_or_else(|| BoardError::ColumnNotFound {
                id: column.to_string(),
            })?;
        db.create_task(&NewTask {
            board_id: board.board.id.clone(),
            column_id,
            title: title.to_string(),
            description: Some(description.to_string()),
            priority,
            due_date: None,
        })?;
    }

    let seeded = db
        .get_board(&board.board.id)?
        .ok_or_else(|| BoardError::BoardNotFound {
            id: board.board.id.clone(),
        })?;
    tracing::info!(board_id = %seeded.board.id, tasks = seeded.count.tasks, "seeded demo board");
    Ok(seeded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_creates_platform_launch_board() {
        let db = BoardDb::new_in_memory().unwrap();
        let board = seed_demo_board(&db).unwrap();

        assert_eq!(board.board.title, DEMO_BOARD_TITLE);
        assert_eq!(board.board.color, "#8B5CF6");
        assert_eq!(board.columns.len(), 3);
        assert_eq!(board.count.tasks, 5);

        let in_doing: Vec<&str> = board
            .tasks
            .iter()
            .filter(|t| t.column.title == "DOING")
            .map(|t| t.task.title.as_str())
            .collect();
        assert_eq!(in_doing, vec!["Design settings and search pages"]);

        let high = board
            .tasks
            .iter()
            .filter(|t| t.task.priority == Priority::High)
            .count();
        assert_eq!(high, 2);
    }

    #[test]
    fn test_seed_twice_creates_two_boards() {
        let db = BoardDb::new_in_memory().unwrap();
        seed_demo_board(&db).unwrap();
        seed_demo_board(&db).unwrap();
        assert_eq!(db.list_boards().unwrap().len(), 2);
    }
}
