//! HTTP request handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::api::types::*;
use crate::auth::{hash_password, token_digest, verify_password, Claims, TokenKind};
use crate::domain::{
    self, normalize_email, Task, TaskOrdering, User,
};
use crate::error::{ApiError, ApiResult};
use crate::storage::{TaskChanges, TaskFilter};
use crate::AppState;

// ==================== User Endpoints ====================

/// Register a new user.
///
/// POST /api/v1/user/create
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let email = normalize_email(request.email.trim());

    domain::validate_name(&request.name).map_err(ApiError::Validation)?;
    domain::validate_email(&email).map_err(ApiError::Validation)?;
    domain::validate_password(&request.password).map_err(ApiError::Validation)?;
    if request.password != request.confirm_password {
        return Err(ApiError::Validation("Passwords do not match".to_string()));
    }

    let password_hash = hash_password(&request.password)?;
    let user = User::new(email, request.name.trim().to_string(), password_hash);

    state.repository.create_user(&user).await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// Login with email and password to obtain a token pair.
///
/// POST /api/v1/user/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let email = normalize_email(request.email.trim());

    let user = state
        .repository
        .get_user_by_email(&email)
        .await?
        .ok_or_else(|| {
            tracing::warn!(email = %email, "Failed login attempt");
            ApiError::Unauthorized("Invalid credentials".to_string())
        })?;

    if !verify_password(&request.password, &user.password_hash)? {
        tracing::warn!(user_id = %user.id, "Failed login attempt");
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    if !user.is_active {
        return Err(ApiError::Unauthorized(
            "User account is disabled".to_string(),
        ));
    }

    let access = state.jwt_manager.issue_access_token(user.id, &user.email)?;
    let refresh = state.jwt_manager.issue_refresh_token(user.id, &user.email)?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        access,
        refresh,
        user: UserResponse::from(&user),
        expires_in: state.jwt_manager.access_token_seconds(),
    }))
}

/// Exchange a valid, non-revoked refresh token for a new access token.
///
/// POST /api/v1/user/token/refresh
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = state
        .jwt_manager
        .validate(&request.refresh, TokenKind::Refresh)?;

    let digest = token_digest(&request.refresh);
    if state.repository.is_token_revoked(&digest).await? {
        return Err(ApiError::Unauthorized(
            "Token has been revoked".to_string(),
        ));
    }

    // The account may have been deactivated since the token was issued.
    let user_id = claims.user_id()?;
    let user = state
        .repository
        .get_user(user_id)
        .await
        .map_err(|_| ApiError::Unauthorized("Invalid credentials".to_string()))?;
    if !user.is_active {
        return Err(ApiError::Unauthorized(
            "User account is disabled".to_string(),
        ));
    }

    let access = state.jwt_manager.issue_access_token(user.id, &user.email)?;

    Ok(Json(RefreshResponse {
        access,
        expires_in: state.jwt_manager.access_token_seconds(),
    }))
}

/// Logout by revoking a refresh token.
///
/// POST /api/v1/user/logout
pub async fn logout(
    State(state): State<AppState>,
    Json(request): Json<LogoutRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let claims = state
        .jwt_manager
        .validate(&request.refresh, TokenKind::Refresh)
        .map_err(|_| ApiError::BadRequest("Invalid refresh token".to_string()))?;

    let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
        .ok_or_else(|| ApiError::Internal("Token expiry out of range".to_string()))?;

    let digest = token_digest(&request.refresh);
    state.repository.revoke_token(&digest, expires_at).await?;

    // Housekeeping: revocation records for long-dead tokens.
    let purged = state.repository.purge_expired_tokens().await?;
    if purged > 0 {
        tracing::debug!(purged, "Purged expired token revocations");
    }

    tracing::info!(user_id = %claims.sub, "User logged out");

    Ok(Json(MessageResponse {
        message: "Logout successful".to_string(),
    }))
}

/// Get the authenticated user.
///
/// GET /api/v1/user/me
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<UserResponse>> {
    let user = state.repository.get_user(claims.user_id()?).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// Update the authenticated user.
///
/// PATCH /api/v1/user/me
pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<UpdateMeRequest>,
) -> ApiResult<Json<UserResponse>> {
    let email = request.email.as_deref().map(|e| normalize_email(e.trim()));

    if let Some(ref name) = request.name {
        domain::validate_name(name).map_err(ApiError::Validation)?;
    }
    if let Some(ref email) = email {
        domain::validate_email(email).map_err(ApiError::Validation)?;
    }

    let password_hash = match request.password {
        Some(ref password) => {
            domain::validate_password(password).map_err(ApiError::Validation)?;
            if request.confirm_password.as_deref() != Some(password.as_str()) {
                return Err(ApiError::Validation("Passwords do not match".to_string()));
            }
            Some(hash_password(password)?)
        }
        None => None,
    };

    let user = state
        .repository
        .update_user(
            claims.user_id()?,
            request.name.as_deref().map(str::trim),
            email.as_deref(),
            password_hash.as_deref(),
        )
        .await?;

    tracing::info!(user_id = %user.id, "User profile updated");

    Ok(Json(UserResponse::from(&user)))
}

// ==================== Task Endpoints ====================

/// Create a task for the authenticated user.
///
/// POST /api/v1/tasks
pub async fn create_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    domain::validate_title(&request.title).map_err(ApiError::Validation)?;
    if let Some(due_date) = request.due_date {
        domain::validate_due_date(due_date, Utc::now().date_naive())
            .map_err(ApiError::Validation)?;
    }

    let task = Task::new(
        claims.user_id()?,
        request.title.trim().to_string(),
        request.description,
        request.status.unwrap_or_default(),
        request.priority.unwrap_or_default(),
        request.due_date,
    );

    state.repository.create_task(&task).await?;

    tracing::info!(task_id = %task.id, user_id = %task.user_id, "Task created");

    Ok((StatusCode::CREATED, Json(task)))
}

/// List the authenticated user's tasks with filtering and pagination.
///
/// GET /api/v1/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<ListTasksResponse>> {
    let ordering = query
        .ordering
        .as_deref()
        .map(str::parse::<TaskOrdering>)
        .transpose()
        .map_err(ApiError::Validation)?
        .unwrap_or_default();

    let filter = TaskFilter {
        status: query.status,
        priority: query.priority,
        due_date: query.due_date,
        search: query.search,
    };

    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);

    let (tasks, total) = state
        .repository
        .list_tasks(claims.user_id()?, &filter, &ordering, limit, offset)
        .await?;

    Ok(Json(ListTasksResponse {
        tasks,
        total,
        limit,
        offset,
    }))
}

/// Get one of the authenticated user's tasks.
///
/// GET /api/v1/tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = state.repository.get_task(id, claims.user_id()?).await?;
    Ok(Json(task))
}

/// Update one of the authenticated user's tasks.
///
/// PUT/PATCH /api/v1/tasks/{id}
pub async fn update_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    if let Some(ref title) = request.title {
        domain::validate_title(title).map_err(ApiError::Validation)?;
    }
    if let Some(due_date) = request.due_date {
        domain::validate_due_date(due_date, Utc::now().date_naive())
            .map_err(ApiError::Validation)?;
    }

    let changes = TaskChanges {
        title: request.title.map(|t| t.trim().to_string()),
        description: request.description,
        status: request.status,
        priority: request.priority,
        due_date: request.due_date,
    };

    let task = state
        .repository
        .update_task(id, claims.user_id()?, &changes)
        .await?;

    tracing::info!(task_id = %task.id, user_id = %task.user_id, "Task updated");

    Ok(Json(task))
}

/// Delete one of the authenticated user's tasks.
///
/// DELETE /api/v1/tasks/{id}
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.repository.delete_task(id, claims.user_id()?).await?;

    tracing::info!(task_id = %id, "Task deleted");

    Ok(StatusCode::NO_CONTENT)
}

// ==================== Health ====================

/// Health check endpoint.
///
/// GET /api/v1/health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_status = match sqlx::query("SELECT 1")
        .fetch_one(state.repository.pool())
        .await
    {
        Ok(_) => "connected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status,
        timestamp: Utc::now().to_rfc3339(),
    })
}
