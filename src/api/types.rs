//! API request and response types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Task, TaskPriority, TaskStatus, User};

// ==================== Users ====================

/// Request to register a new user.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// A user as returned to API clients.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Request to update the authenticated user.
#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

// ==================== Authentication ====================

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response: a token pair plus the authenticated user.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserResponse,
    /// Access-token lifetime in seconds.
    pub expires_in: i64,
}

/// Request to exchange a refresh token for a new access token.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Response carrying a fresh access token.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: String,
    pub expires_in: i64,
}

/// Request to revoke a refresh token.
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh: String,
}

/// Generic message response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ==================== Tasks ====================

/// Request to create a task.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// Request to update a task; absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// Query parameters for listing tasks.
#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Substring match over title and description.
    #[serde(default)]
    pub search: Option<String>,
    /// Ordering field, optionally prefixed with `-` for descending.
    #[serde(default)]
    pub ordering: Option<String>,
    /// Maximum number of results.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Offset for pagination.
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

/// Response for listing tasks.
#[derive(Debug, Serialize)]
pub struct ListTasksResponse {
    pub tasks: Vec<Task>,
    /// Total match count (for pagination).
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

// ==================== Health ====================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let query: ListTasksQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.limit, 20);
        assert_eq!(query.offset, 0);
        assert!(query.status.is_none());
        assert!(query.ordering.is_none());
    }

    #[test]
    fn test_list_query_parses_enums_and_dates() {
        let query: ListTasksQuery = serde_json::from_str(
            r#"{"status":"in_progress","priority":"high","due_date":"2026-12-31","ordering":"-due_date"}"#,
        )
        .unwrap();
        assert_eq!(query.status, Some(TaskStatus::InProgress));
        assert_eq!(query.priority, Some(TaskPriority::High));
        assert_eq!(query.due_date, NaiveDate::from_ymd_opt(2026, 12, 31));
        assert_eq!(query.ordering.as_deref(), Some("-due_date"));
    }

    #[test]
    fn test_update_request_fields_default_to_absent() {
        let request: UpdateTaskRequest = serde_json::from_str(r#"{"title":"New"}"#).unwrap();
        assert_eq!(request.title.as_deref(), Some("New"));
        assert!(request.status.is_none());
        assert!(request.due_date.is_none());
    }
}
