use sqlx::{PgPool, Result};
use uuid::Uuid;

use crate::db::models::{AssignedTask, Notification, Payment, VendorOrder};

/// Constraint backing the one-payment-per-(payer, invoice) invariant.
pub const PAYMENTS_USER_INVOICE_KEY: &str = "payments_user_invoice_key";
/// Constraint backing at-most-one-active-task-per-courier.
pub const TASKS_ACTIVE_COURIER_KEY: &str = "assigned_tasks_active_courier_key";
/// Constraint backing at-most-one-active-assignment-per-order.
pub const TASKS_ACTIVE_ORDER_KEY: &str = "assigned_tasks_active_order_key";

/// True when `err` is a unique violation on the named constraint. The
/// application-level checks give better error messages, but these indexes
/// are the authoritative enforcement under concurrent requests.
pub fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.constraint() == Some(constraint))
}

// --- Payment queries ---

pub async fn insert_payment(pool: &PgPool, payment: &Payment) -> Result<Payment> {
    sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments (
            id, user_id, vendor_id, account_no, amount, invoice_id, reference_id,
            description, product_id, product_title, product_image, product_price,
            user_location, status, gateway_response, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        RETURNING *
        "#,
    )
    .bind(payment.id)
    .bind(payment.user_id)
    .bind(payment.vendor_id)
    .bind(&payment.account_no)
    .bind(&payment.amount)
    .bind(&payment.invoice_id)
    .bind(&payment.reference_id)
    .bind(&payment.description)
    .bind(payment.product_id)
    .bind(&payment.product_title)
    .bind(&payment.product_image)
    .bind(&payment.product_price)
    .bind(&payment.user_location)
    .bind(&payment.status)
    .bind(&payment.gateway_response)
    .bind(payment.created_at)
    .fetch_one(pool)
    .await
}

pub async fn find_payment_by_user_invoice(
    pool: &PgPool,
    user_id: Uuid,
    invoice_id: &str,
) -> Result<Option<Payment>> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE user_id = $1 AND invoice_id = $2")
        .bind(user_id)
        .bind(invoice_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_payment(pool: &PgPool, id: Uuid) -> Result<Option<Payment>> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_vendor_successful_payments(pool: &PgPool, vendor_id: Uuid) -> Result<Vec<Payment>> {
    sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments WHERE vendor_id = $1 AND status = 'success' ORDER BY created_at DESC",
    )
    .bind(vendor_id)
    .fetch_all(pool)
    .await
}

pub async fn list_all_payments(pool: &PgPool) -> Result<Vec<Payment>> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

/// Vendor's payments joined with the most recent task per order. Orders whose
/// latest assignment was rejected are filtered out; unassigned orders report
/// a `Pending` delivery status.
pub async fn list_vendor_orders_with_delivery(
    pool: &PgPool,
    vendor_id: Uuid,
) -> Result<Vec<VendorOrder>> {
    sqlx::query_as::<_, VendorOrder>(
        r#"
        SELECT p.id, p.user_id, p.vendor_id, p.amount, p.invoice_id,
               p.product_title, p.product_image, p.product_price, p.user_location,
               p.status, p.created_at,
               COALESCE(t.status, 'Pending') AS delivery_status
        FROM payments p
        LEFT JOIN LATERAL (
            SELECT status FROM assigned_tasks
            WHERE order_id = p.id
            ORDER BY created_at DESC
            LIMIT 1
        ) t ON TRUE
        WHERE p.vendor_id = $1
          AND COALESCE(t.status, 'Pending') <> 'Rejected'
        ORDER BY p.created_at DESC
        "#,
    )
    .bind(vendor_id)
    .fetch_all(pool)
    .await
}

// --- Assigned-task queries ---

pub async fn insert_task(pool: &PgPool, task: &AssignedTask) -> Result<AssignedTask> {
    sqlx::query_as::<_, AssignedTask>(
        r#"
        INSERT INTO assigned_tasks (
            id, delivery_person_id, vendor_id, order_id, customer_id,
            product, customer, address, status, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(task.id)
    .bind(task.delivery_person_id)
    .bind(task.vendor_id)
    .bind(task.order_id)
    .bind(task.customer_id)
    .bind(&task.product)
    .bind(&task.customer)
    .bind(&task.address)
    .bind(&task.status)
    .bind(task.created_at)
    .bind(task.updated_at)
    .fetch_one(pool)
    .await
}

pub async fn courier_has_active_task(pool: &PgPool, delivery_person_id: Uuid) -> Result<bool> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM assigned_tasks WHERE delivery_person_id = $1 AND status IN ('Pending', 'Accepted') LIMIT 1",
    )
    .bind(delivery_person_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

pub async fn find_active_task_for_order(pool: &PgPool, order_id: Uuid) -> Result<Option<AssignedTask>> {
    sqlx::query_as::<_, AssignedTask>(
        "SELECT * FROM assigned_tasks WHERE order_id = $1 AND status IN ('Pending', 'Accepted') LIMIT 1",
    )
    .bind(order_id)
    .fetch_optional(pool)
    .await
}

pub async fn get_task(pool: &PgPool, id: Uuid) -> Result<Option<AssignedTask>> {
    sqlx::query_as::<_, AssignedTask>("SELECT * FROM assigned_tasks WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_tasks_for_courier(pool: &PgPool, delivery_person_id: Uuid) -> Result<Vec<AssignedTask>> {
    sqlx::query_as::<_, AssignedTask>(
        "SELECT * FROM assigned_tasks WHERE delivery_person_id = $1 ORDER BY created_at DESC",
    )
    .bind(delivery_person_id)
    .fetch_all(pool)
    .await
}

pub async fn list_all_tasks(pool: &PgPool) -> Result<Vec<AssignedTask>> {
    sqlx::query_as::<_, AssignedTask>("SELECT * FROM assigned_tasks ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

pub async fn update_task_status(pool: &PgPool, id: Uuid, status: &str) -> Result<Option<AssignedTask>> {
    sqlx::query_as::<_, AssignedTask>(
        "UPDATE assigned_tasks SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status)
    .fetch_optional(pool)
    .await
}

pub async fn delete_task(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM assigned_tasks WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// --- Notification queries ---

pub async fn insert_notification(pool: &PgPool, notification: &Notification) -> Result<Notification> {
    sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (id, sender_id, receiver_id, sender_name, message, read, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(notification.id)
    .bind(notification.sender_id)
    .bind(notification.receiver_id)
    .bind(&notification.sender_name)
    .bind(&notification.message)
    .bind(notification.read)
    .bind(notification.created_at)
    .fetch_one(pool)
    .await
}

pub async fn list_notifications_for(pool: &PgPool, receiver_id: Uuid) -> Result<Vec<Notification>> {
    sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE receiver_id = $1 ORDER BY created_at DESC",
    )
    .bind(receiver_id)
    .fetch_all(pool)
    .await
}

pub async fn mark_notification_read(
    pool: &PgPool,
    id: Uuid,
    receiver_id: Uuid,
) -> Result<Option<Notification>> {
    sqlx::query_as::<_, Notification>(
        "UPDATE notifications SET read = TRUE WHERE id = $1 AND receiver_id = $2 RETURNING *",
    )
    .bind(id)
    .bind(receiver_id)
    .fetch_optional(pool)
    .await
}

pub async fn mark_all_notifications_read(pool: &PgPool, receiver_id: Uuid) -> Result<u64> {
    let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE receiver_id = $1 AND read = FALSE")
        .bind(receiver_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
