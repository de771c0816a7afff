use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{AssignedTask, Notification};
use crate::db::queries;

/// Best-effort side channel for telling a courier about a new assignment.
/// Failure to notify never fails the assignment itself.
#[async_trait]
pub trait TaskNotifier: Send + Sync {
    async fn task_assigned(&self, task: &AssignedTask) -> anyhow::Result<()>;
}

/// Persists an in-app notification row the courier picks up when polling.
pub struct DbNotifier {
    pool: PgPool,
}

impl DbNotifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskNotifier for DbNotifier {
    async fn task_assigned(&self, task: &AssignedTask) -> anyhow::Result<()> {
        let notification = Notification {
            id: Uuid::new_v4(),
            sender_id: task.vendor_id,
            receiver_id: task.delivery_person_id,
            sender_name: "Dispatch".to_string(),
            message: format!("New delivery assigned: {} to {}", task.product, task.address),
            read: false,
            created_at: Utc::now(),
        };
        queries::insert_notification(&self.pool, &notification).await?;
        Ok(())
    }
}

/// Drops notifications on the floor. Used by tests and tooling.
pub struct NoopNotifier;

#[async_trait]
impl TaskNotifier for NoopNotifier {
    async fn task_assigned(&self, _task: &AssignedTask) -> anyhow::Result<()> {
        Ok(())
    }
}
