use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::AppState;
use crate::db::models::Notification;
use crate::db::queries;
use crate::error::AppError;
use crate::middleware::AuthUser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub receiver_id: Option<Uuid>,
    pub sender_name: Option<String>,
    pub message: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateNotificationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(receiver_id), Some(sender_name), Some(message)) =
        (payload.receiver_id, payload.sender_name, payload.message)
    else {
        return Err(AppError::Validation("Missing required fields".to_string()));
    };

    let notification = Notification {
        id: Uuid::new_v4(),
        sender_id: user.user_id,
        receiver_id,
        sender_name,
        message,
        read: false,
        created_at: Utc::now(),
    };

    let created = queries::insert_notification(&state.db, &notification).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": created })),
    ))
}

pub async fn my_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let notifications = queries::list_notifications_for(&state.db, user.user_id).await?;
    Ok(Json(json!({ "success": true, "data": notifications })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let updated = queries::mark_notification_read(&state.db, id, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;
    Ok(Json(json!({ "success": true, "data": updated })))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let updated = queries::mark_all_notifications_read(&state.db, user.user_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "All notifications marked as read",
        "updated": updated,
    })))
}
