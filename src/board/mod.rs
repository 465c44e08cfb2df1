//! Task board back-end: boards, ordered columns and tasks over a JSON API.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, ServerConfig)          │
//! │          │ <─────── │    └─ api.rs  (route handlers, ApiError)         │
//! └──────────┘   JSON   │         │                                        │
//!                       │         │ DbHandle::call(closure)                │
//!                       │         v                                        │
//!                       │  db.rs  (BoardDb on tokio's blocking pool)       │
//!                       │         │                                        │
//!                       │         v                                        │
//!                       │  SQLite  boards ─< columns ─< tasks              │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module   | Responsibility                                               |
//! |----------|--------------------------------------------------------------|
//! | `models` | Records, view types (`BoardAggregate`), input validation     |
//! | `seed`   | Demo "Platform Launch" board used by `taskboard seed`        |
//!
//! ## Invariants kept by `db`
//!
//! - Every new board gets TODO, DOING and DONE columns (orders 1, 2, 3) in
//!   the same transaction as the board row.
//! - A new column's order is the board's maximum plus one, read and written
//!   in one transaction. No stored order is `i64::MAX`.
//! - A task's column always belongs to the task's board.
//! - Deleting a board removes its columns and tasks; deleting a column
//!   removes its tasks.

pub mod api;
pub mod db;
pub mod models;
pub mod seed;
pub mod server;
