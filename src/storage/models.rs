//! Database row types returned by SQLx queries.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{Task, User};
use crate::error::ApiError;

/// Database row for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            name: row.name,
            is_active: row.is_active,
            is_staff: row.is_staff,
            password_hash: row.password_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Database row for the tasks table.
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = ApiError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            status: row.status.parse().map_err(ApiError::Internal)?,
            priority: row.priority.parse().map_err(ApiError::Internal)?,
            due_date: row.due_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TaskPriority, TaskStatus};

    fn sample_row() -> TaskRow {
        let now = Utc::now();
        TaskRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Water the plants".to_string(),
            description: None,
            status: "in_progress".to_string(),
            priority: "high".to_string(),
            due_date: NaiveDate::from_ymd_opt(2026, 12, 31),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_task_row_conversion() {
        let task: Task = sample_row().try_into().unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.priority, TaskPriority::High);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2026, 12, 31));
    }

    #[test]
    fn test_task_row_with_unknown_status_fails() {
        let mut row = sample_row();
        row.status = "archived".to_string();
        assert!(Task::try_from(row).is_err());
    }
}
