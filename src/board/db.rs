use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use super::models::*;
use crate::errors::{BoardError, Result};

/// Async-safe handle to the board database.
///
/// Wraps `BoardDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O never
/// ties up async worker threads. The mutex serializes every store operation.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<BoardDb>>,
}

impl DbHandle {
    pub fn new(db: BoardDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&BoardDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|_| BoardError::LockPoisoned)?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }

    /// Acquire the database mutex synchronously. Only for startup code and
    /// tests; never call this from a request handler.
    pub fn lock_sync(&self) -> Result<std::sync::MutexGuard<'_, BoardDb>> {
        self.inner.lock().map_err(|_| BoardError::LockPoisoned)
    }
}

pub struct BoardDb {
    conn: Connection,
}

impl BoardDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database at {}", path.display()))?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations()?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS boards (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT,
                    color TEXT NOT NULL DEFAULT '#3B82F6',
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS columns (
                    id TEXT PRIMARY KEY,
                    board_id TEXT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
                    title TEXT NOT NULL,
                    color TEXT NOT NULL DEFAULT '#6B7280',
                    sort_order INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS tasks (
                    id TEXT PRIMARY KEY,
                    board_id TEXT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
                    column_id TEXT NOT NULL REFERENCES columns(id) ON DELETE CASCADE,
                    title TEXT NOT NULL,
                    description TEXT,
                    priority TEXT NOT NULL DEFAULT 'MEDIUM',
                    due_date TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_columns_board ON columns(board_id, sort_order);
                CREATE INDEX IF NOT EXISTS idx_tasks_board ON tasks(board_id, created_at);
                CREATE INDEX IF NOT EXISTS idx_tasks_column ON tasks(column_id);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Boards ────────────────────────────────────────────────────────

    /// Insert a board and its seed columns in one transaction.
    pub fn create_board(&self, new: &NewBoard) -> Result<BoardAggregate> {
        let id = Uuid::new_v4().to_string();
        let created_at = format_timestamp(&Utc::now());

        // Safety: DbHandle's Mutex already guarantees single-threaded access.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        tx.execute(
            "INSERT INTO boards (id, title, description, color, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, new.title, new.description, new.color, created_at],
        )
        .context("Failed to insert board")?;
        for (index, (title, color)) in SEED_COLUMNS.iter().enumerate() {
            tx.execute(
                "INSERT INTO columns (id, board_id, title, color, sort_order) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![Uuid::new_v4().to_string(), id, title, color, index as i64 + 1],
            )
            .context("Failed to insert seed column")?;
        }
        tx.commit().context("Failed to commit board creation")?;

        tracing::info!(board_id = %id, title = %new.title, "created board with seed columns");
        Ok(self.get_board(&id)?.context("Board not found after insert")?)
    }

    /// All boards as aggregates, newest first.
    pub fn list_boards(&self) -> Result<Vec<BoardAggregate>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, title, description, color, created_at
                 FROM boards ORDER BY created_at DESC, rowid DESC",
            )
            .context("Failed to prepare list_boards")?;
        let rows = stmt
            .query_map([], board_row)
            .context("Failed to query boards")?;
        let mut boards = Vec::new();
        for row in rows {
            let board = row.context("Failed to read board row")?.into_board()?;
            boards.push(self.assemble(board)?);
        }
        Ok(boards)
    }

    /// The board with its columns and tasks, or `None` if no such board.
    pub fn get_board(&self, id: &str) -> Result<Option<BoardAggregate>> {
        match self.get_board_record(id)? {
            Some(board) => Ok(Some(self.assemble(board)?)),
            None => Ok(None),
        }
    }

    fn get_board_record(&self, id: &str) -> Result<Option<Board>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, title, description, color, created_at FROM boards WHERE id = ?1",
                params![id],
                board_row,
            )
            .optional()
            .context("Failed to query board")?;
        match row {
            Some(r) => Ok(Some(r.into_board()?)),
            None => Ok(None),
        }
    }

    fn assemble(&self, board: Board) -> Result<BoardAggregate> {
        let columns = self
            .list_columns(&board.id)?
            .into_iter()
            .map(|c| c.column)
            .collect();
        let tasks = self.tasks_for_board(&board.id)?;
        let count = TaskCount {
            tasks: tasks.len() as i64,
        };
        Ok(BoardAggregate {
            board,
            columns,
            tasks,
            count,
        })
    }

    /// Overwrite a board's fields. Returns `None` if the board does not exist.
    pub fn update_board(&self, id: &str, update: &BoardUpdate) -> Result<Option<BoardAggregate>> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        let changed = tx
            .execute(
                "UPDATE boards SET title = ?1 WHERE id = ?2",
                params![update.title, id],
            )
            .context("Failed to update board title")?;
        if changed == 0 {
            return Ok(None);
        }
        if let Some(description) = &update.description {
            tx.execute(
                "UPDATE boards SET description = ?1 WHERE id = ?2",
                params![description, id],
            )
            .context("Failed to update board description")?;
        }
        if let Some(color) = &update.color {
            tx.execute(
                "UPDATE boards SET color = ?1 WHERE id = ?2",
                params![color, id],
            )
            .context("Failed to update board color")?;
        }

        tx.commit().context("Failed to commit board update")?;
        tracing::info!(board_id = %id, "updated board");
        self.get_board(id)
    }

    /// Delete a board; its columns and tasks go with it.
    pub fn delete_board(&self, id: &str) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM boards WHERE id = ?1", params![id])
            .context("Failed to delete board")?;
        if count > 0 {
            tracing::info!(board_id = %id, "deleted board");
        }
        Ok(count > 0)
    }

    // ── Columns ───────────────────────────────────────────────────────

    pub fn list_columns(&self, board_id: &str) -> Result<Vec<ColumnWithCount>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT c.id, c.board_id, c.title, c.color, c.sort_order,
                        (SELECT COUNT(*) FROM tasks t WHERE t.column_id = c.id)
                 FROM columns c WHERE c.board_id = ?1
                 ORDER BY c.sort_order ASC, c.rowid ASC",
            )
            .context("Failed to prepare list_columns")?;
        let rows = stmt
            .query_map(params![board_id], column_with_count_row)
            .context("Failed to query columns")?;
        let mut columns = Vec::new();
        for row in rows {
            columns.push(row.context("Failed to read column row")?);
        }
        Ok(columns)
    }

    pub fn get_column(&self, id: &str) -> Result<Option<ColumnWithCount>> {
        let column = self
            .conn
            .query_row(
                "SELECT c.id, c.board_id, c.title, c.color, c.sort_order,
                        (SELECT COUNT(*) FROM tasks t WHERE t.column_id = c.id)
                 FROM columns c WHERE c.id = ?1",
                params![id],
                column_with_count_row,
            )
            .optional()
            .context("Failed to query column")?;
        Ok(column)
    }

    /// Append a column to a board. Its order is the board's current maximum
    /// plus one (1 for an empty board), read and written in one transaction.
    pub fn create_column(&self, new: &NewColumn) -> Result<ColumnWithCount> {
        let id = Uuid::new_v4().to_string();

        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        if !board_exists(&tx, &new.board_id)? {
            return Err(BoardError::BoardNotFound {
                id: new.board_id.clone(),
            });
        }
        let max_order: i64 = tx
            .query_row(
                "SELECT COALESCE(MAX(sort_order), 0) FROM columns WHERE board_id = ?1",
                params![new.board_id],
                |row| row.get(0),
            )
            .context("Failed to read column order")?;
        let order = max_order
            .checked_add(1)
            .ok_or_else(|| BoardError::validation(COLUMN_ORDER_RANGE_MSG))?;
        tx.execute(
            "INSERT INTO columns (id, board_id, title, color, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, new.board_id, new.title, new.color, order],
        )
        .context("Failed to insert column")?;
        tx.commit().context("Failed to commit column creation")?;

        let column = self
            .get_column(&id)?
            .context("Column not found after insert")?;
        tracing::info!(
            column_id = %id,
            board_id = %new.board_id,
            order = column.column.order,
            "appended column"
        );
        Ok(column)
    }

    /// Apply a partial update. Returns `None` if the column does not exist.
    pub fn update_column(&self, id: &str, update: &ColumnUpdate) -> Result<Option<ColumnWithCount>> {
        if let Some(order) = update.order {
            check_order(order)?;
        }
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        let exists: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM columns WHERE id = ?1)",
                params![id],
                |row| row.get(0),
            )
            .context("Failed to check column existence")?;
        if !exists {
            return Ok(None);
        }

        if let Some(title) = &update.title {
            tx.execute(
                "UPDATE columns SET title = ?1 WHERE id = ?2",
                params![title, id],
            )
            .context("Failed to update column title")?;
        }
        if let Some(color) = &update.color {
            tx.execute(
                "UPDATE columns SET color = ?1 WHERE id = ?2",
                params![color, id],
            )
            .context("Failed to update column color")?;
        }
        if let Some(order) = update.order {
            tx.execute(
                "UPDATE columns SET sort_order = ?1 WHERE id = ?2",
                params![order, id],
            )
            .context("Failed to update column order")?;
        }

        tx.commit().context("Failed to commit column update")?;
        self.get_column(id)
    }

    /// Delete a column and every task in it.
    pub fn delete_column(&self, id: &str) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM columns WHERE id = ?1", params![id])
            .context("Failed to delete column")?;
        if count > 0 {
            tracing::info!(column_id = %id, "deleted column");
        }
        Ok(count > 0)
    }

    // ── Tasks ─────────────────────────────────────────────────────────

    /// Insert a task after checking that the board exists and that the
    /// column belongs to it.
    pub fn create_task(&self, new: &NewTask) -> Result<TaskDetail> {
        let id = Uuid::new_v4().to_string();
        let created_at = format_timestamp(&Utc::now());

        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        if !board_exists(&tx, &new.board_id)? {
            return Err(BoardError::BoardNotFound {
                id: new.board_id.clone(),
            });
        }
        if !column_in_board(&tx, &new.column_id, &new.board_id)? {
            return Err(BoardError::ColumnNotFound {
                id: new.column_id.clone(),
            });
        }
        tx.execute(
            "INSERT INTO tasks (id, board_id, column_id, title, description, priority, due_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                new.board_id,
                new.column_id,
                new.title,
                new.description,
                new.priority.as_str(),
                new.due_date.as_ref().map(format_date),
                created_at
            ],
        )
        .context("Failed to insert task")?;
        tx.commit().context("Failed to commit task creation")?;

        tracing::info!(task_id = %id, board_id = %new.board_id, column_id = %new.column_id, "created task");
        Ok(self.get_task(&id)?.context("Task not found after insert")?)
    }

    pub fn get_task(&self, id: &str) -> Result<Option<TaskDetail>> {
        let row = self
            .conn
            .query_row(
                &format!("{} WHERE t.id = ?1", TASK_SELECT),
                params![id],
                task_row,
            )
            .optional()
            .context("Failed to query task")?;
        match row {
            Some(r) => Ok(Some(r.into_detail()?)),
            None => Ok(None),
        }
    }

    /// Tasks of a board, newest first.
    fn tasks_for_board(&self, board_id: &str) -> Result<Vec<TaskDetail>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "{} WHERE t.board_id = ?1 ORDER BY t.created_at DESC, t.rowid DESC",
                TASK_SELECT
            ))
            .context("Failed to prepare tasks_for_board")?;
        let rows = stmt
            .query_map(params![board_id], task_row)
            .context("Failed to query tasks")?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row.context("Failed to read task row")?.into_detail()?);
        }
        Ok(tasks)
    }

    /// Apply a partial update. Returns `None` if the task does not exist.
    /// A new column must belong to the task's board.
    pub fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<Option<TaskDetail>> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        let board_id: Option<String> = tx
            .query_row(
                "SELECT board_id FROM tasks WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to look up task")?;
        let Some(board_id) = board_id else {
            return Ok(None);
        };

        if let Some(column_id) = &update.column_id {
            if !column_in_board(&tx, column_id, &board_id)? {
                return Err(BoardError::ColumnNotFound {
                    id: column_id.clone(),
                });
            }
            tx.execute(
                "UPDATE tasks SET column_id = ?1 WHERE id = ?2",
                params![column_id, id],
            )
            .context("Failed to update task column")?;
        }
        if let Some(title) = &update.title {
            tx.execute(
                "UPDATE tasks SET title = ?1 WHERE id = ?2",
                params![title, id],
            )
            .context("Failed to update task title")?;
        }
        if let Some(description) = &update.description {
            tx.execute(
                "UPDATE tasks SET description = ?1 WHERE id = ?2",
                params![description, id],
            )
            .context("Failed to update task description")?;
        }
        if let Some(priority) = update.priority {
            tx.execute(
                "UPDATE tasks SET priority = ?1 WHERE id = ?2",
                params![priority.as_str(), id],
            )
            .context("Failed to update task priority")?;
        }
        if let Some(due_date) = &update.due_date {
            tx.execute(
                "UPDATE tasks SET due_date = ?1 WHERE id = ?2",
                params![due_date.as_ref().map(format_date), id],
            )
            .context("Failed to update task due date")?;
        }

        tx.commit().context("Failed to commit task update")?;
        tracing::info!(task_id = %id, "updated task");
        self.get_task(id)
    }

    pub fn delete_task(&self, id: &str) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])
            .context("Failed to delete task")?;
        if count > 0 {
            tracing::info!(task_id = %id, "deleted task");
        }
        Ok(count > 0)
    }
}

// ── Query helpers ─────────────────────────────────────────────────────

const TASK_SELECT: &str = "SELECT t.id, t.board_id, t.column_id, t.title, t.description, t.priority, t.due_date, t.created_at,
        c.id, c.board_id, c.title, c.color, c.sort_order
 FROM tasks t JOIN columns c ON c.id = t.column_id";

fn board_exists(conn: &Connection, board_id: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM boards WHERE id = ?1)",
            params![board_id],
            |row| row.get(0),
        )
        .context("Failed to check board existence")?;
    Ok(exists)
}

fn column_in_board(conn: &Connection, column_id: &str, board_id: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM columns WHERE id = ?1 AND board_id = ?2)",
            params![column_id, board_id],
            |row| row.get(0),
        )
        .context("Failed to check column membership")?;
    Ok(exists)
}

fn board_row(row: &rusqlite::Row) -> rusqlite::Result<BoardRow> {
    Ok(BoardRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        color: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn column_with_count_row(row: &rusqlite::Row) -> rusqlite::Result<ColumnWithCount> {
    Ok(ColumnWithCount {
        column: Column {
            id: row.get(0)?,
            board_id: row.get(1)?,
            title: row.get(2)?,
            color: row.get(3)?,
            order: row.get(4)?,
        },
        count: TaskCount { tasks: row.get(5)? },
    })
}

fn task_row(row: &rusqlite::Row) -> rusqlite::Result<TaskRow> {
    Ok(TaskRow {
        id: row.get(0)?,
        board_id: row.get(1)?,
        column_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        priority: row.get(5)?,
        due_date: row.get(6)?,
        created_at: row.get(7)?,
        column: Column {
            id: row.get(8)?,
            board_id: row.get(9)?,
            title: row.get(10)?,
            color: row.get(11)?,
            order: row.get(12)?,
        },
    })
}

/// Intermediate row struct for boards.
struct BoardRow {
    id: String,
    title: String,
    description: Option<String>,
    color: String,
    created_at: String,
}

impl BoardRow {
    fn into_board(self) -> anyhow::Result<Board> {
        let created_at =
            parse_timestamp(&self.created_at).context("Failed to parse board created_at")?;
        Ok(Board {
            id: self.id,
            title: self.title,
            description: self.description,
            color: self.color,
            created_at,
        })
    }
}

/// Intermediate row struct for a task joined with its column.
struct TaskRow {
    id: String,
    board_id: String,
    column_id: String,
    title: String,
    description: Option<String>,
    priority: String,
    due_date: Option<String>,
    created_at: String,
    column: Column,
}

impl TaskRow {
    fn into_detail(self) -> anyhow::Result<TaskDetail> {
        let priority = Priority::from_str(&self.priority)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse task priority")?;
        let due_date = self
            .due_date
            .as_deref()
            .map(parse_date)
            .transpose()
            .context("Failed to parse task due_date")?;
        let created_at =
            parse_timestamp(&self.created_at).context("Failed to parse task created_at")?;

        Ok(TaskDetail {
            task: Task {
                id: self.id,
                board_id: self.board_id,
                column_id: self.column_id,
                title: self.title,
                description: self.description,
                priority,
                due_date,
                created_at,
            },
            column: self.column,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
