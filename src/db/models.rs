use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::BigDecimal;
use uuid::Uuid;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_FAILED: &str = "failed";

/// One payment attempt. Status is fixed at creation time from the gateway
/// outcome and never edited afterwards.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vendor_id: Option<Uuid>,
    pub account_no: String,
    pub amount: BigDecimal,
    pub invoice_id: String,
    pub reference_id: String,
    pub description: Option<String>,
    pub product_id: Option<Uuid>,
    pub product_title: Option<String>,
    pub product_image: Option<String>,
    pub product_price: Option<BigDecimal>,
    pub user_location: Option<String>,
    pub status: String,
    /// Raw gateway response, stored verbatim for audit.
    pub gateway_response: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Delivery-task lifecycle. `Pending` and `Accepted` are the active states;
/// `Rejected` and `Delivered` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Accepted,
    Rejected,
    Delivered,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Accepted => "Accepted",
            TaskStatus::Rejected => "Rejected",
            TaskStatus::Delivered => "Delivered",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(TaskStatus::Pending),
            "Accepted" => Some(TaskStatus::Accepted),
            "Rejected" => Some(TaskStatus::Rejected),
            "Delivered" => Some(TaskStatus::Delivered),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Accepted)
    }

    /// Allowed edges: Pending -> Accepted | Rejected, Accepted -> Delivered.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Accepted)
                | (TaskStatus::Pending, TaskStatus::Rejected)
                | (TaskStatus::Accepted, TaskStatus::Delivered)
        )
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedTask {
    pub id: Uuid,
    pub delivery_person_id: Uuid,
    pub vendor_id: Uuid,
    /// References the payment that paid for the order.
    pub order_id: Uuid,
    /// Resolved server-side from the order's payer, never from client input.
    pub customer_id: Option<Uuid>,
    pub product: String,
    pub customer: Option<String>,
    pub address: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AssignedTask {
    pub fn status(&self) -> Option<TaskStatus> {
        TaskStatus::parse(&self.status)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub sender_name: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// A vendor's payment joined with the latest delivery-task status for the
/// order (`Pending` when no task has been assigned yet).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vendor_id: Option<Uuid>,
    pub amount: BigDecimal,
    pub invoice_id: String,
    pub product_title: Option<String>,
    pub product_image: Option<String>,
    pub product_price: Option<BigDecimal>,
    pub user_location: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub delivery_status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in ["Pending", "Accepted", "Rejected", "Delivered"] {
            assert_eq!(TaskStatus::parse(s).unwrap().as_str(), s);
        }
        assert!(TaskStatus::parse("Shipped").is_none());
        assert!(TaskStatus::parse("pending").is_none());
    }

    #[test]
    fn test_active_states() {
        assert!(TaskStatus::Pending.is_active());
        assert!(TaskStatus::Accepted.is_active());
        assert!(!TaskStatus::Rejected.is_active());
        assert!(!TaskStatus::Delivered.is_active());
    }

    #[test]
    fn test_allowed_transitions() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Accepted));
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Rejected));
        assert!(TaskStatus::Accepted.can_transition_to(TaskStatus::Delivered));
    }

    #[test]
    fn test_illegal_transitions() {
        // No skipping straight to Delivered.
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Delivered));
        // Terminal states have no outgoing edges.
        assert!(!TaskStatus::Delivered.can_transition_to(TaskStatus::Accepted));
        assert!(!TaskStatus::Rejected.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::Rejected.can_transition_to(TaskStatus::Accepted));
        // No self-loops.
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Pending));
    }
}
