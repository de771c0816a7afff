use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::models::{AssignedTask, STATUS_FAILED, TaskStatus};
use crate::db::queries::{
    self, TASKS_ACTIVE_COURIER_KEY, TASKS_ACTIVE_ORDER_KEY, is_unique_violation,
};
use crate::error::AppError;
use crate::services::notify::TaskNotifier;

pub const CODE_HAS_ACTIVE_TASKS: &str = "HAS_ACTIVE_TASKS";
pub const CODE_DUPLICATE_ORDER: &str = "DUPLICATE_ORDER";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub delivery_person_id: Option<Uuid>,
    pub order: Option<OrderDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub order_id: Option<Uuid>,
    pub product: Option<String>,
    pub customer: Option<String>,
    pub address: Option<String>,
}

struct ValidatedAssign {
    delivery_person_id: Uuid,
    order_id: Uuid,
    product: String,
    customer: Option<String>,
    address: String,
}

fn validate(req: &AssignRequest) -> Result<ValidatedAssign, AppError> {
    let missing = || AppError::Validation("Missing required data".to_string());

    let delivery_person_id = req.delivery_person_id.ok_or_else(missing)?;
    let order = req.order.as_ref().ok_or_else(missing)?;
    let order_id = order.order_id.ok_or_else(missing)?;
    let product = order.product.as_deref().filter(|p| !p.is_empty()).ok_or_else(missing)?;
    let address = order.address.as_deref().filter(|a| !a.is_empty()).ok_or_else(missing)?;

    Ok(ValidatedAssign {
        delivery_person_id,
        order_id,
        product: product.to_string(),
        customer: order.customer.clone(),
        address: address.to_string(),
    })
}

/// Assigns orders to couriers and drives tasks through their lifecycle.
///
/// Two invariants hold at all times: a courier has at most one task in
/// {Pending, Accepted}, and an order has at most one active assignment.
/// Both are checked up front for friendly errors and enforced by partial
/// unique indexes for correctness under concurrency.
#[derive(Clone)]
pub struct AssignmentEngine {
    pool: PgPool,
    notifier: Arc<dyn TaskNotifier>,
}

impl AssignmentEngine {
    pub fn new(pool: PgPool, notifier: Arc<dyn TaskNotifier>) -> Self {
        Self { pool, notifier }
    }

    pub async fn assign(
        &self,
        vendor_id: Uuid,
        req: AssignRequest,
    ) -> Result<AssignedTask, AppError> {
        let validated = validate(&req)?;

        if queries::courier_has_active_task(&self.pool, validated.delivery_person_id).await? {
            return Err(has_active_tasks());
        }

        if let Some(existing) =
            queries::find_active_task_for_order(&self.pool, validated.order_id).await?
        {
            return Err(duplicate_order(Some(&existing)));
        }

        // The customer is whoever paid for the order. Client-supplied
        // customer ids are never trusted.
        let payment = queries::get_payment(&self.pool, validated.order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Customer for this order not found".to_string()))?;

        if payment.status == STATUS_FAILED {
            return Err(AppError::Validation(
                "Order payment was not successful".to_string(),
            ));
        }

        let task = AssignedTask {
            id: Uuid::new_v4(),
            delivery_person_id: validated.delivery_person_id,
            vendor_id,
            order_id: validated.order_id,
            customer_id: Some(payment.user_id),
            product: validated.product,
            customer: validated.customer,
            address: validated.address,
            status: TaskStatus::Pending.as_str().to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let task = match queries::insert_task(&self.pool, &task).await {
            Ok(inserted) => inserted,
            Err(err) if is_unique_violation(&err, TASKS_ACTIVE_COURIER_KEY) => {
                return Err(has_active_tasks());
            }
            Err(err) if is_unique_violation(&err, TASKS_ACTIVE_ORDER_KEY) => {
                return Err(duplicate_order(None));
            }
            Err(err) => return Err(err.into()),
        };

        // Fire and forget: the assignment stands whether or not the courier
        // could be notified.
        let notifier = Arc::clone(&self.notifier);
        let notify_task = task.clone();
        tokio::spawn(async move {
            if let Err(err) = notifier.task_assigned(&notify_task).await {
                tracing::warn!(task_id = %notify_task.id, error = %err, "courier notification failed");
            }
        });

        Ok(task)
    }

    /// Applies a courier-triggered status change, enforcing the transition
    /// table: Pending -> Accepted | Rejected, Accepted -> Delivered.
    pub async fn update_status(
        &self,
        task_id: Uuid,
        new_status: &str,
    ) -> Result<AssignedTask, AppError> {
        let next = TaskStatus::parse(new_status)
            .ok_or_else(|| AppError::Validation("Invalid status".to_string()))?;

        let task = queries::get_task(&self.pool, task_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;

        let current = task
            .status()
            .ok_or_else(|| AppError::Internal(format!("task {} has corrupt status", task.id)))?;

        if !current.can_transition_to(next) {
            return Err(AppError::conflict(format!(
                "Cannot move task from {} to {}",
                current.as_str(),
                next.as_str()
            )));
        }

        queries::update_task_status(&self.pool, task_id, next.as_str())
            .await?
            .ok_or_else(|| AppError::NotFound("Task not found".to_string()))
    }

    /// Vendor/admin unassignment. Allowed from any state.
    pub async fn unassign(&self, task_id: Uuid) -> Result<(), AppError> {
        if queries::delete_task(&self.pool, task_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("Task not found".to_string()))
        }
    }
}

fn has_active_tasks() -> AppError {
    AppError::Conflict {
        message: "This delivery person already has an active task".to_string(),
        code: Some(CODE_HAS_ACTIVE_TASKS),
        data: None,
    }
}

fn duplicate_order(existing: Option<&AssignedTask>) -> AppError {
    AppError::Conflict {
        message: "This order is already assigned to a delivery person".to_string(),
        code: Some(CODE_DUPLICATE_ORDER),
        data: existing.and_then(|t| serde_json::to_value(t).ok()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: serde_json::Value) -> AssignRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_validate_accepts_complete_request() {
        let req = request(json!({
            "deliveryPersonId": Uuid::new_v4(),
            "order": {
                "orderId": Uuid::new_v4(),
                "product": "Rice 25kg",
                "customer": "Asha",
                "address": "KM4, Mogadishu",
            },
        }));
        let validated = validate(&req).unwrap();
        assert_eq!(validated.product, "Rice 25kg");
        assert_eq!(validated.address, "KM4, Mogadishu");
    }

    #[test]
    fn test_validate_rejects_missing_courier() {
        let req = request(json!({
            "order": {
                "orderId": Uuid::new_v4(),
                "product": "Rice",
                "address": "KM4",
            },
        }));
        assert!(matches!(validate(&req), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_missing_order_fields() {
        for order in [
            json!({"product": "Rice", "address": "KM4"}),
            json!({"orderId": Uuid::new_v4(), "address": "KM4"}),
            json!({"orderId": Uuid::new_v4(), "product": "Rice"}),
            json!({"orderId": Uuid::new_v4(), "product": "", "address": "KM4"}),
        ] {
            let req = request(json!({
                "deliveryPersonId": Uuid::new_v4(),
                "order": order,
            }));
            assert!(matches!(validate(&req), Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn test_validate_allows_absent_customer_label() {
        let req = request(json!({
            "deliveryPersonId": Uuid::new_v4(),
            "order": {
                "orderId": Uuid::new_v4(),
                "product": "Rice",
                "address": "KM4",
            },
        }));
        let validated = validate(&req).unwrap();
        assert!(validated.customer.is_none());
    }

    #[test]
    fn test_conflict_codes() {
        assert!(matches!(
            has_active_tasks(),
            AppError::Conflict { code: Some(CODE_HAS_ACTIVE_TASKS), .. }
        ));
        assert!(matches!(
            duplicate_order(None),
            AppError::Conflict { code: Some(CODE_DUPLICATE_ORDER), .. }
        ));
    }
}
