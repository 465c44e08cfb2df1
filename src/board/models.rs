use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{BoardError, Result};

pub const DEFAULT_BOARD_COLOR: &str = "#3B82F6";
pub const DEFAULT_COLUMN_COLOR: &str = "#6B7280";

/// Columns every new board starts with: `(title, color)` in display order.
pub const SEED_COLUMNS: [(&str, &str); 3] = [
    ("TODO", "#06B6D4"),
    ("DOING", "#8B5CF6"),
    ("DONE", "#10B981"),
];

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(?:[0-9A-Fa-f]{3}|[0-9A-Fa-f]{6}|[0-9A-Fa-f]{8})$").unwrap());

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "URGENT" => Ok(Self::Urgent),
            _ => Err(format!(
                "Invalid priority: {}. Valid values: LOW, MEDIUM, HIGH, URGENT",
                s
            )),
        }
    }
}

// ── Records ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub board_id: String,
    pub title: String,
    pub color: String,
    pub order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub board_id: String,
    pub column_id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

// API view types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskCount {
    pub tasks: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnWithCount {
    #[serde(flatten)]
    pub column: Column,
    #[serde(rename = "_count")]
    pub count: TaskCount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub column: Column,
}

/// A board together with its columns (ascending `order`) and tasks
/// (newest first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardAggregate {
    #[serde(flatten)]
    pub board: Board,
    pub columns: Vec<Column>,
    pub tasks: Vec<TaskDetail>,
    #[serde(rename = "_count")]
    pub count: TaskCount,
}

impl BoardAggregate {
    pub fn column_titled(&self, title: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.title == title)
    }
}

// ── Validated inputs ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct NewBoard {
    pub title: String,
    pub description: Option<String>,
    pub color: String,
}

/// Replacement values for a board. `None` leaves the stored value as is;
/// `description: Some(None)` clears it.
#[derive(Debug, Clone)]
pub struct BoardUpdate {
    pub title: String,
    pub description: Option<Option<String>>,
    pub color: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewColumn {
    pub board_id: String,
    pub title: String,
    pub color: String,
}

#[derive(Debug, Clone, Default)]
pub struct ColumnUpdate {
    pub title: Option<String>,
    pub color: Option<String>,
    pub order: Option<i64>,
}

impl ColumnUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.color.is_none() && self.order.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub board_id: String,
    pub column_id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub column_id: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
}

// ── Validation and defaults ───────────────────────────────────────────

/// Trim a required title, rejecting absent or blank values with `msg`.
pub fn require_title(title: Option<&str>, msg: &str) -> Result<String> {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => Ok(t.to_string()),
        _ => Err(BoardError::validation(msg)),
    }
}

/// Resolve an optional color: absent or blank falls back to `default`,
/// anything else must be a hex color.
pub fn color_or_default(color: Option<&str>, default: &str) -> Result<String> {
    match color.map(str::trim) {
        None | Some("") => Ok(default.to_string()),
        Some(c) => check_color(c),
    }
}

pub fn check_color(color: &str) -> Result<String> {
    let color = color.trim();
    if HEX_COLOR.is_match(color) {
        Ok(color.to_string())
    } else {
        Err(BoardError::validation(format!(
            "Invalid color '{}': expected a hex value like #3B82F6",
            color
        )))
    }
}

pub const COLUMN_ORDER_RANGE_MSG: &str = "Column order is out of range";

/// Reject an order that would leave no room to append after it.
pub fn check_order(order: i64) -> Result<i64> {
    if order == i64::MAX {
        Err(BoardError::validation(COLUMN_ORDER_RANGE_MSG))
    } else {
        Ok(order)
    }
}

/// Parse an optional priority; absent or blank means the default.
pub fn priority_or_default(priority: Option<&str>) -> Result<Priority> {
    match priority.map(str::trim) {
        None | Some("") => Ok(Priority::default()),
        Some(p) => Priority::from_str(p).map_err(BoardError::Validation),
    }
}

/// Parse a due date from `YYYY-MM-DD` or an RFC 3339 timestamp.
/// Anything else yields `None`.
pub fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

// ── Storage encodings ─────────────────────────────────────────────────

/// Fixed-width RFC 3339 so that string order matches time order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date(raw: &str) -> anyhow::Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(raw, "%Y-%m-%d")?)
}

/// Distinguishes an absent JSON field (`None`) from an explicit `null`
/// (`Some(None)`). Use with `#[serde(default, deserialize_with = ...)]`.
pub fn nullable<'de, D, T>(de: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_round_trips_through_str() {
        for p in [Priority::Low, Priority::Medium, Priority::High, Priority::Urgent] {
            assert_eq!(Priority::from_str(p.as_str()), Ok(p));
        }
        assert_eq!(Priority::from_str("urgent"), Ok(Priority::Urgent));
        assert!(Priority::from_str("critical").is_err());
    }

    #[test]
    fn test_priority_defaults_to_medium() {
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!(priority_or_default(None).unwrap(), Priority::Medium);
        assert_eq!(priority_or_default(Some("")).unwrap(), Priority::Medium);
        assert_eq!(priority_or_default(Some("HIGH")).unwrap(), Priority::High);
        assert!(matches!(
            priority_or_default(Some("soon")),
            Err(BoardError::Validation(_))
        ));
    }

    #[test]
    fn test_priority_serializes_uppercase() {
        let json = serde_json::to_string(&Priority::Urgent).unwrap();
        assert_eq!(json, "\"URGENT\"");
    }

    #[test]
    fn test_check_order_leaves_room_to_append() {
        assert_eq!(check_order(0).unwrap(), 0);
        assert_eq!(check_order(i64::MAX - 1).unwrap(), i64::MAX - 1);
        assert_eq!(check_order(i64::MIN).unwrap(), i64::MIN);
        match check_order(i64::MAX) {
            Err(BoardError::Validation(msg)) => assert_eq!(msg, COLUMN_ORDER_RANGE_MSG),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_require_title_trims_and_rejects_blank() {
        assert_eq!(require_title(Some("  Sprint 1 "), "x").unwrap(), "Sprint 1");
        for bad in [None, Some(""), Some("   ")] {
            match require_title(bad, "Title is required") {
                Err(BoardError::Validation(msg)) => assert_eq!(msg, "Title is required"),
                other => panic!("expected validation error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_color_defaults_and_validation() {
        assert_eq!(color_or_default(None, DEFAULT_BOARD_COLOR).unwrap(), "#3B82F6");
        assert_eq!(color_or_default(Some(""), DEFAULT_COLUMN_COLOR).unwrap(), "#6B7280");
        assert_eq!(color_or_default(Some("#abc"), DEFAULT_BOARD_COLOR).unwrap(), "#abc");
        assert_eq!(check_color("#10B981").unwrap(), "#10B981");
        assert!(check_color("blue").is_err());
        assert!(check_color("#12345").is_err());
    }

    #[test]
    fn test_parse_due_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_due_date("2024-03-15"), Some(expected));
        assert_eq!(parse_due_date("2024-03-15T10:30:00Z"), Some(expected));
        assert_eq!(parse_due_date("2024-03-15T23:30:00-02:00"), NaiveDate::from_ymd_opt(2024, 3, 16));
        assert_eq!(parse_due_date(""), None);
        assert_eq!(parse_due_date("next tuesday"), None);
        assert_eq!(parse_due_date("2024-13-40"), None);
    }

    #[test]
    fn test_timestamp_encoding_is_fixed_width_and_ordered() {
        let earlier = parse_timestamp("2024-01-01T00:00:00Z").unwrap();
        let later = earlier + chrono::Duration::microseconds(1500);
        let a = format_timestamp(&earlier);
        let b = format_timestamp(&later);
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(parse_timestamp(&b).unwrap(), later);
    }

    #[test]
    fn test_aggregate_serializes_prisma_style_shape() {
        let created_at = parse_timestamp("2024-01-01T00:00:00Z").unwrap();
        let column = Column {
            id: "c1".into(),
            board_id: "b1".into(),
            title: "TODO".into(),
            color: "#06B6D4".into(),
            order: 1,
        };
        let aggregate = BoardAggregate {
            board: Board {
                id: "b1".into(),
                title: "Sprint 1".into(),
                description: None,
                color: DEFAULT_BOARD_COLOR.into(),
                created_at,
            },
            columns: vec![column.clone()],
            tasks: vec![TaskDetail {
                task: Task {
                    id: "t1".into(),
                    board_id: "b1".into(),
                    column_id: "c1".into(),
                    title: "Fix bug".into(),
                    description: None,
                    priority: Priority::Medium,
                    due_date: None,
                    created_at,
                },
                column,
            }],
            count: TaskCount { tasks: 1 },
        };

        let json = serde_json::to_value(&aggregate).unwrap();
        assert_eq!(json["title"], "Sprint 1");
        assert_eq!(json["createdAt"], "2024-01-01T00:00:00Z");
        assert_eq!(json["columns"][0]["boardId"], "b1");
        assert_eq!(json["tasks"][0]["columnId"], "c1");
        assert_eq!(json["tasks"][0]["dueDate"], serde_json::Value::Null);
        assert_eq!(json["tasks"][0]["column"]["title"], "TODO");
        assert_eq!(json["_count"]["tasks"], 1);
    }

    #[test]
    fn test_nullable_distinguishes_absent_from_null() {
        #[derive(Deserialize)]
        struct Patch {
            #[serde(default, deserialize_with = "nullable")]
            description: Option<Option<String>>,
        }

        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.description, None);
        let null: Patch = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(null.description, Some(None));
        let set: Patch = serde_json::from_str(r#"{"description": "x"}"#).unwrap();
        assert_eq!(set.description, Some(Some("x".to_string())));
    }
}
