use bigdecimal::FromPrimitive;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::types::BigDecimal;
use std::time::Duration;
use uuid::Uuid;

use crate::config::Config;
use crate::db::models::{Payment, STATUS_FAILED, STATUS_SUCCESS};
use crate::db::queries::{self, PAYMENTS_USER_INVOICE_KEY, is_unique_violation};
use crate::error::AppError;
use crate::gateway::{WaafiClient, is_success, reference_id, with_retry};

/// Amounts arrive from mobile clients as either a JSON number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

impl AmountInput {
    fn to_decimal(&self) -> Option<BigDecimal> {
        match self {
            AmountInput::Number(n) => BigDecimal::from_f64(*n),
            AmountInput::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayRequest {
    pub account_no: Option<String>,
    pub amount: Option<AmountInput>,
    pub invoice_id: Option<String>,
    pub description: Option<String>,
    pub product_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub product_title: Option<String>,
    pub product_image: Option<String>,
    pub product_price: Option<AmountInput>,
    pub user_location: Option<String>,
}

#[derive(Debug)]
struct ValidatedPay {
    account_no: String,
    amount: BigDecimal,
    invoice_id: String,
    description: String,
}

fn validate(req: &PayRequest) -> Result<ValidatedPay, AppError> {
    let (Some(account_no), Some(amount), Some(invoice_id), Some(description)) = (
        req.account_no.as_deref(),
        req.amount.as_ref(),
        req.invoice_id.as_deref(),
        req.description.as_deref(),
    ) else {
        return Err(AppError::Validation("Missing required fields".to_string()));
    };

    let amount = amount
        .to_decimal()
        .filter(|a| *a > BigDecimal::from(0))
        .ok_or_else(|| AppError::Validation("Amount must be greater than 0".to_string()))?;

    Ok(ValidatedPay {
        account_no: account_no.to_string(),
        amount: amount.with_scale(2),
        invoice_id: invoice_id.to_string(),
        description: description.to_string(),
    })
}

pub struct PaymentOutcome {
    pub success: bool,
    pub message: String,
    pub payment: Payment,
}

/// Owns the record of payment attempts. One successful record per
/// (payer, invoice) pair; the raw gateway response is kept for audit.
#[derive(Clone)]
pub struct PaymentLedger {
    pool: PgPool,
    gateway: WaafiClient,
    max_attempts: u32,
    retry_base: Duration,
}

impl PaymentLedger {
    pub fn new(pool: PgPool, gateway: WaafiClient, config: &Config) -> Self {
        Self {
            pool,
            gateway,
            max_attempts: config.gateway_max_attempts,
            retry_base: Duration::from_millis(config.gateway_retry_base_ms),
        }
    }

    /// Validates, short-circuits duplicates, charges through the gateway and
    /// persists exactly one record for the attempt.
    ///
    /// The duplicate guard runs before any gateway call so a client retry of
    /// an already-charged invoice can never double-charge. Retry exhaustion
    /// is recorded as a failed payment, not surfaced as a server error.
    pub async fn process_payment(
        &self,
        payer: Uuid,
        req: PayRequest,
    ) -> Result<PaymentOutcome, AppError> {
        let validated = validate(&req)?;

        if let Some(existing) =
            queries::find_payment_by_user_invoice(&self.pool, payer, &validated.invoice_id).await?
        {
            return Err(duplicate_invoice(&existing));
        }

        let gateway_result = with_retry(
            || {
                self.gateway.submit(
                    &validated.account_no,
                    &validated.amount,
                    &validated.invoice_id,
                    &validated.description,
                )
            },
            self.max_attempts,
            self.retry_base,
        )
        .await;

        let (success, message, raw) = match gateway_result {
            Ok(raw) => {
                let success = is_success(&raw);
                let message = if success {
                    "Payment successful".to_string()
                } else {
                    failure_message(&raw)
                };
                (success, message, raw)
            }
            Err(err) => {
                tracing::error!(
                    invoice_id = %validated.invoice_id,
                    error = %err,
                    "gateway call failed after retries"
                );
                (false, "Payment failed".to_string(), gateway_error_audit(&err))
            }
        };

        let payment = Payment {
            id: Uuid::new_v4(),
            user_id: payer,
            vendor_id: req.vendor_id,
            account_no: validated.account_no,
            amount: validated.amount,
            invoice_id: validated.invoice_id,
            reference_id: reference_id(&raw),
            description: Some(validated.description),
            product_id: req.product_id,
            product_title: req.product_title,
            product_image: req.product_image,
            product_price: req.product_price.as_ref().and_then(AmountInput::to_decimal),
            user_location: req.user_location,
            status: if success { STATUS_SUCCESS } else { STATUS_FAILED }.to_string(),
            gateway_response: Some(raw),
            created_at: Utc::now(),
        };

        let payment = match queries::insert_payment(&self.pool, &payment).await {
            Ok(inserted) => inserted,
            // A concurrent request for the same invoice won the insert race;
            // the unique index is the authoritative guard.
            Err(err) if is_unique_violation(&err, PAYMENTS_USER_INVOICE_KEY) => {
                let existing = queries::find_payment_by_user_invoice(
                    &self.pool,
                    payer,
                    &payment.invoice_id,
                )
                .await?
                .ok_or_else(|| AppError::Internal("payment vanished after conflict".to_string()))?;
                return Err(duplicate_invoice(&existing));
            }
            Err(err) => return Err(err.into()),
        };

        Ok(PaymentOutcome {
            success,
            message,
            payment,
        })
    }
}

fn duplicate_invoice(existing: &Payment) -> AppError {
    AppError::Conflict {
        message: "Duplicate invoice payment already exists".to_string(),
        code: None,
        data: serde_json::to_value(existing).ok(),
    }
}

fn failure_message(raw: &Value) -> String {
    raw.get("responseMsg")
        .or_else(|| raw.get("responseMessage"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| "Payment failed".to_string())
}

/// Audit stand-in when the gateway never produced a response body.
fn gateway_error_audit(err: &crate::gateway::GatewayError) -> Value {
    match err {
        crate::gateway::GatewayError::Status { status, body } => {
            let body = serde_json::from_str(body).unwrap_or_else(|_| json!(body));
            json!({ "error": "gateway_rejected", "httpStatus": status, "body": body })
        }
        crate::gateway::GatewayError::Http(e) => {
            json!({ "error": "gateway_unreachable", "detail": e.to_string() })
        }
    }
}
