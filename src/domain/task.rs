//! Task domain types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum accepted title length.
pub const MIN_TITLE_LEN: usize = 3;

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err(format!("Unknown task status: {}", s)),
        }
    }
}

/// Priority of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskPriority::Low => write!(f, "low"),
            TaskPriority::Medium => write!(f, "medium"),
            TaskPriority::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            _ => Err(format!("Unknown task priority: {}", s)),
        }
    }
}

/// A task owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier.
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new task for a user.
    pub fn new(
        user_id: Uuid,
        title: String,
        description: Option<String>,
        status: TaskStatus,
        priority: TaskPriority,
        due_date: Option<NaiveDate>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            description,
            status,
            priority,
            due_date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Field by which a task listing can be ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    CreatedAt,
    DueDate,
    Priority,
}

/// Ordering of a task listing, parsed from the `ordering` query
/// parameter (`created_at`, `-due_date`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOrdering {
    pub field: OrderField,
    pub descending: bool,
}

impl Default for TaskOrdering {
    /// Newest first.
    fn default() -> Self {
        Self {
            field: OrderField::CreatedAt,
            descending: true,
        }
    }
}

impl std::str::FromStr for TaskOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let field = match name {
            "created_at" => OrderField::CreatedAt,
            "due_date" => OrderField::DueDate,
            "priority" => OrderField::Priority,
            _ => return Err(format!("Unknown ordering field: {}", name)),
        };

        Ok(Self { field, descending })
    }
}

/// Validate a task title.
pub fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().chars().count() < MIN_TITLE_LEN {
        return Err(format!(
            "Title must be at least {} characters long",
            MIN_TITLE_LEN
        ));
    }
    Ok(())
}

/// Validate that a due date is not before `today`.
pub fn validate_due_date(due_date: NaiveDate, today: NaiveDate) -> Result<(), String> {
    if due_date < today {
        return Err("Due date cannot be in the past".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
        ] {
            assert_eq!(status.to_string().parse::<TaskStatus>().unwrap(), status);
        }
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_priority_roundtrip() {
        for priority in [TaskPriority::Low, TaskPriority::Medium, TaskPriority::High] {
            assert_eq!(
                priority.to_string().parse::<TaskPriority>().unwrap(),
                priority
            );
        }
        assert!("urgent".parse::<TaskPriority>().is_err());
    }

    #[test]
    fn test_new_task_defaults() {
        let task = Task::new(
            Uuid::new_v4(),
            "Write report".to_string(),
            None,
            TaskStatus::default(),
            TaskPriority::default(),
            None,
        );
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn test_title_validation() {
        assert!(validate_title("abc").is_ok());
        assert!(validate_title("ab").is_err());
        // Surrounding whitespace doesn't count toward the minimum.
        assert!(validate_title("  a  ").is_err());
    }

    #[test]
    fn test_due_date_validation() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        assert!(validate_due_date(today, today).is_ok());
        assert!(validate_due_date(today.succ_opt().unwrap(), today).is_ok());
        assert!(validate_due_date(today.pred_opt().unwrap(), today).is_err());
    }

    #[test]
    fn test_ordering_parse() {
        let ordering: TaskOrdering = "-due_date".parse().unwrap();
        assert_eq!(ordering.field, OrderField::DueDate);
        assert!(ordering.descending);

        let ordering: TaskOrdering = "priority".parse().unwrap();
        assert_eq!(ordering.field, OrderField::Priority);
        assert!(!ordering.descending);

        assert!("title".parse::<TaskOrdering>().is_err());
    }

    #[test]
    fn test_ordering_default_is_newest_first() {
        let ordering = TaskOrdering::default();
        assert_eq!(ordering.field, OrderField::CreatedAt);
        assert!(ordering.descending);
    }
}
