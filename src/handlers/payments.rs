use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::AppState;
use crate::db::queries;
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::services::ledger::PayRequest;

/// `POST /api/payment/pay`. Answers 200 when the gateway accepted the
/// charge and 400 when it reported failure; either way the attempt has been
/// recorded. Duplicate invoices surface as 409 with the original record.
pub async fn pay(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<PayRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.ledger.process_payment(user.user_id, payload).await?;

    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };

    Ok((
        status,
        Json(json!({
            "success": outcome.success,
            "message": outcome.message,
            "data": outcome.payment,
        })),
    ))
}

/// Caller's successful payments, newest first (vendor dashboard).
pub async fn vendor_payments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let transactions = queries::list_vendor_successful_payments(&state.db, user.user_id).await?;
    Ok(Json(json!({ "success": true, "transactions": transactions })))
}

pub async fn payment_history(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let transactions = queries::list_all_payments(&state.db).await?;
    Ok(Json(json!({ "success": true, "transactions": transactions })))
}

pub async fn admin_payments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    user.require_admin()?;
    let transactions = queries::list_all_payments(&state.db).await?;
    Ok(Json(json!({ "success": true, "transactions": transactions })))
}
