use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::AppState;
use crate::db::models::TaskStatus;
use crate::db::queries;
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::services::assignment::AssignRequest;

/// `POST /api/tasks/assign` (vendor/admin).
pub async fn assign(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<AssignRequest>,
) -> Result<impl IntoResponse, AppError> {
    let task = state.engine.assign(user.user_id, payload).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Task assigned",
        "data": task,
    })))
}

/// Tasks belonging to the calling courier.
pub async fn my_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let tasks = queries::list_tasks_for_courier(&state.db, user.user_id).await?;
    Ok(Json(json!({ "success": true, "data": tasks })))
}

pub async fn all_tasks(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let tasks = queries::list_all_tasks(&state.db).await?;
    Ok(Json(json!({ "success": true, "data": tasks })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

/// `PATCH /api/tasks/update/:task_id`.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status = payload
        .status
        .ok_or_else(|| AppError::Validation("Invalid status".to_string()))?;

    let task = state.engine.update_status(task_id, &status).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Task updated",
        "data": task,
    })))
}

/// `PATCH /api/tasks/mark-delivered/:task_id`. Shorthand for the Delivered
/// transition, validated like any other.
pub async fn mark_delivered(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let task = state
        .engine
        .update_status(task_id, TaskStatus::Delivered.as_str())
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Marked as delivered",
        "data": task,
    })))
}

/// `DELETE /api/tasks/:task_id` (vendor/admin unassignment, any state).
pub async fn unassign(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.engine.unassign(task_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Task unassigned/deleted",
    })))
}

/// Vendor's orders enriched with each order's delivery status.
pub async fn vendor_orders(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let transactions = queries::list_vendor_orders_with_delivery(&state.db, user.user_id).await?;
    Ok(Json(json!({ "success": true, "transactions": transactions })))
}
