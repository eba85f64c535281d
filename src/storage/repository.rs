//! Repository layer for database operations.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::domain::{OrderField, Task, TaskOrdering, TaskPriority, TaskStatus, User};
use crate::error::{ApiError, ApiResult};
use crate::storage::models::{TaskRow, UserRow};

/// Connection options for the configured database.
pub fn connect_options(db: &DatabaseConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&db.host)
        .port(db.port)
        .database(&db.name)
        .username(&db.user)
        .password(&db.password)
}

/// Open the connection pool.
pub async fn create_pool(db: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(db.max_connections)
        .connect_with(connect_options(db))
        .await
}

/// Apply pending schema migrations.
///
/// Migrations are embedded into the binary at compile time; both
/// deployment paths run this before the server starts listening.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Filters for listing a user's tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<NaiveDate>,
    /// Substring match over title and description.
    pub search: Option<String>,
}

/// Fields of a task an update may touch.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<NaiveDate>,
}

/// Repository for all taskhub database operations.
#[derive(Clone)]
pub struct TaskhubRepository {
    pool: PgPool,
}

impl TaskhubRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ==================== Users ====================

    /// Insert a new user. A duplicate email is a conflict.
    pub async fn create_user(&self, user: &User) -> ApiResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash, is_active, is_staff, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(Self::map_unique_email)?;

        Ok(())
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: Uuid) -> ApiResult<User> {
        let row: UserRow = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))?;

        Ok(row.into())
    }

    /// Get a user by email.
    pub async fn get_user_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Update a user's profile fields.
    pub async fn update_user(
        &self,
        id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> ApiResult<User> {
        // Surface a clean 404 before touching anything.
        self.get_user(id).await?;

        let updated_at = Utc::now();

        if let Some(name) = name {
            sqlx::query("UPDATE users SET name = $1, updated_at = $2 WHERE id = $3")
                .bind(name)
                .bind(updated_at)
                .bind(id)
                .execute(&self.pool)
                .await?;
        }

        if let Some(email) = email {
            sqlx::query("UPDATE users SET email = $1, updated_at = $2 WHERE id = $3")
                .bind(email)
                .bind(updated_at)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(Self::map_unique_email)?;
        }

        if let Some(hash) = password_hash {
            sqlx::query("UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3")
                .bind(hash)
                .bind(updated_at)
                .bind(id)
                .execute(&self.pool)
                .await?;
        }

        self.get_user(id).await
    }

    fn map_unique_email(e: sqlx::Error) -> ApiError {
        if let sqlx::Error::Database(ref db) = e {
            if db.code().as_deref() == Some("23505") {
                return ApiError::Conflict("A user with this email already exists".to_string());
            }
        }
        ApiError::Database(e)
    }

    // ==================== Tasks ====================

    /// Insert a new task.
    pub async fn create_task(&self, task: &Task) -> ApiResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, user_id, title, description, status, priority, due_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(task.id)
        .bind(task.user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.to_string())
        .bind(task.priority.to_string())
        .bind(task.due_date)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a task scoped to its owner.
    ///
    /// A task owned by another user is indistinguishable from a missing
    /// one.
    pub async fn get_task(&self, id: Uuid, user_id: Uuid) -> ApiResult<Task> {
        let row: TaskRow = sqlx::query_as("SELECT * FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Task {} not found", id)))?;

        row.try_into()
    }

    /// List a user's tasks with filtering, ordering and pagination.
    ///
    /// Returns the page of tasks plus the total match count.
    pub async fn list_tasks(
        &self,
        user_id: Uuid,
        filter: &TaskFilter,
        ordering: &TaskOrdering,
        limit: i64,
        offset: i64,
    ) -> ApiResult<(Vec<Task>, i64)> {
        let mut conditions = vec!["user_id = $1".to_string()];
        let mut next_param = 2;

        if filter.status.is_some() {
            conditions.push(format!("status = ${}", next_param));
            next_param += 1;
        }
        if filter.priority.is_some() {
            conditions.push(format!("priority = ${}", next_param));
            next_param += 1;
        }
        if filter.due_date.is_some() {
            conditions.push(format!("due_date = ${}", next_param));
            next_param += 1;
        }
        if filter.search.is_some() {
            conditions.push(format!(
                "(title ILIKE ${p} OR description ILIKE ${p})",
                p = next_param
            ));
            next_param += 1;
        }

        let where_clause = conditions.join(" AND ");

        let query = format!(
            "SELECT * FROM tasks WHERE {} ORDER BY {} LIMIT ${} OFFSET ${}",
            where_clause,
            order_sql(ordering),
            next_param,
            next_param + 1
        );
        let count_query = format!("SELECT COUNT(*) FROM tasks WHERE {}", where_clause);

        let mut query_builder = sqlx::query_as::<_, TaskRow>(&query);
        let mut count_builder = sqlx::query_as::<_, (i64,)>(&count_query);

        query_builder = query_builder.bind(user_id);
        count_builder = count_builder.bind(user_id);

        if let Some(status) = filter.status {
            query_builder = query_builder.bind(status.to_string());
            count_builder = count_builder.bind(status.to_string());
        }
        if let Some(priority) = filter.priority {
            query_builder = query_builder.bind(priority.to_string());
            count_builder = count_builder.bind(priority.to_string());
        }
        if let Some(due_date) = filter.due_date {
            query_builder = query_builder.bind(due_date);
            count_builder = count_builder.bind(due_date);
        }
        if let Some(ref search) = filter.search {
            let pattern = format!("%{}%", search);
            query_builder = query_builder.bind(pattern.clone());
            count_builder = count_builder.bind(pattern);
        }

        query_builder = query_builder.bind(limit).bind(offset);

        let rows = query_builder.fetch_all(&self.pool).await?;
        let (total,) = count_builder.fetch_one(&self.pool).await?;

        let tasks = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<ApiResult<Vec<_>>>()?;

        Ok((tasks, total))
    }

    /// Update a task's fields, scoped to its owner.
    pub async fn update_task(
        &self,
        id: Uuid,
        user_id: Uuid,
        changes: &TaskChanges,
    ) -> ApiResult<Task> {
        // Surface a clean 404 before touching anything.
        self.get_task(id, user_id).await?;

        let updated_at = Utc::now();

        if let Some(ref title) = changes.title {
            sqlx::query(
                "UPDATE tasks SET title = $1, updated_at = $2 WHERE id = $3 AND user_id = $4",
            )
            .bind(title)
            .bind(updated_at)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        }

        if let Some(ref description) = changes.description {
            sqlx::query(
                "UPDATE tasks SET description = $1, updated_at = $2 WHERE id = $3 AND user_id = $4",
            )
            .bind(description)
            .bind(updated_at)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        }

        if let Some(status) = changes.status {
            sqlx::query(
                "UPDATE tasks SET status = $1, updated_at = $2 WHERE id = $3 AND user_id = $4",
            )
            .bind(status.to_string())
            .bind(updated_at)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        }

        if let Some(priority) = changes.priority {
            sqlx::query(
                "UPDATE tasks SET priority = $1, updated_at = $2 WHERE id = $3 AND user_id = $4",
            )
            .bind(priority.to_string())
            .bind(updated_at)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        }

        if let Some(due_date) = changes.due_date {
            sqlx::query(
                "UPDATE tasks SET due_date = $1, updated_at = $2 WHERE id = $3 AND user_id = $4",
            )
            .bind(due_date)
            .bind(updated_at)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        }

        self.get_task(id, user_id).await
    }

    /// Delete a task, scoped to its owner.
    pub async fn delete_task(&self, id: Uuid, user_id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(format!("Task {} not found", id)));
        }

        Ok(())
    }

    // ==================== Revoked tokens ====================

    /// Record a refresh-token digest as revoked until the token's own
    /// expiry.
    pub async fn revoke_token(
        &self,
        digest: &str,
        expires_at: DateTime<Utc>,
    ) -> ApiResult<()> {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (token_hash, expires_at, revoked_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (token_hash) DO NOTHING
            "#,
        )
        .bind(digest)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Whether a refresh-token digest has been revoked.
    pub async fn is_token_revoked(&self, digest: &str) -> ApiResult<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT token_hash FROM revoked_tokens WHERE token_hash = $1")
                .bind(digest)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.is_some())
    }

    /// Drop revocation records for tokens that have expired on their own.
    pub async fn purge_expired_tokens(&self) -> ApiResult<u64> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

fn order_sql(ordering: &TaskOrdering) -> String {
    let column = match ordering.field {
        OrderField::CreatedAt => "created_at",
        OrderField::DueDate => "due_date",
        OrderField::Priority => "priority",
    };
    let direction = if ordering.descending { "DESC" } else { "ASC" };

    // Secondary key keeps pagination stable across equal values.
    format!("{} {}, id ASC", column, direction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_sql_default() {
        assert_eq!(order_sql(&TaskOrdering::default()), "created_at DESC, id ASC");
    }

    #[test]
    fn test_order_sql_ascending_field() {
        let ordering: TaskOrdering = "due_date".parse().unwrap();
        assert_eq!(order_sql(&ordering), "due_date ASC, id ASC");
    }
}
