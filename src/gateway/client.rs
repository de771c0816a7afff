use bigdecimal::ToPrimitive;
use chrono::Utc;
use reqwest::Client;
use serde_json::{Value, json};
use sqlx::types::BigDecimal;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Gateway returned status {status}: {body}")]
    Status { status: u16, body: String },
}

impl GatewayError {
    /// 4xx means the payload itself was rejected; retrying wastes the
    /// attempt budget and risks a double charge. Everything else (timeout,
    /// connect error, 5xx) is worth another attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GatewayError::Status { status, .. } if (400..500).contains(status))
    }
}

/// HTTP client for the WaafiPay purchase API.
#[derive(Clone)]
pub struct WaafiClient {
    client: Client,
    base_url: String,
    merchant_uid: String,
    api_user_id: String,
    api_key: String,
}

impl WaafiClient {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.gateway_timeout_secs))
            .build()
            .unwrap_or_default();

        WaafiClient {
            client,
            base_url: config.gateway_url.clone(),
            merchant_uid: config.merchant_uid.clone(),
            api_user_id: config.api_user_id.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Sends one purchase request and returns the raw response body. Non-2xx
    /// responses and transport errors propagate unchanged so the retry
    /// policy can classify them.
    pub async fn submit(
        &self,
        account_no: &str,
        amount: &BigDecimal,
        invoice_id: &str,
        description: &str,
    ) -> Result<Value, GatewayError> {
        let payload = self.build_payload(account_no, amount, invoice_id, description);
        tracing::info!(
            invoice_id = %invoice_id,
            payload = %redact_credentials(&payload),
            "sending payment request"
        );

        let response = self.client.post(&self.base_url).json(&payload).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::warn!(invoice_id = %invoice_id, status = %status, "gateway rejected request");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        tracing::info!(invoice_id = %invoice_id, response = %body, "gateway response received");
        Ok(body)
    }

    fn build_payload(
        &self,
        account_no: &str,
        amount: &BigDecimal,
        invoice_id: &str,
        description: &str,
    ) -> Value {
        let now = Utc::now();
        let amount = amount.with_scale(2).to_f64().unwrap_or_default();

        json!({
            "schemaVersion": "1.0",
            "requestId": now.timestamp_millis().to_string(),
            "timestamp": now.to_rfc3339(),
            "channelName": "WEB",
            "serviceName": "API_PURCHASE",
            "serviceParams": {
                "merchantUid": self.merchant_uid,
                "apiUserId": self.api_user_id,
                "apiKey": self.api_key,
                "paymentMethod": "MWALLET_ACCOUNT",
                "payerInfo": {
                    "accountNo": format_account(account_no),
                },
                "transactionInfo": {
                    "referenceId": format!("ref-{}", now.timestamp_millis()),
                    "invoiceId": invoice_id,
                    "amount": amount,
                    "currency": "USD",
                    "description": description,
                },
            },
        })
    }
}

/// Canonical international form: strip leading zeros and prefix the Somali
/// country code when missing.
pub fn format_account(phone: &str) -> String {
    if phone.starts_with("252") {
        phone.to_string()
    } else {
        format!("252{}", phone.trim_start_matches('0'))
    }
}

/// The gateway signals success inconsistently across response shapes; any
/// one of four independent fields counts. Compared case-insensitively after
/// coercion to string.
pub fn is_success(raw: &Value) -> bool {
    let response_code = coerce(raw.get("responseCode"));
    let status_code = coerce(raw.get("statusCode"));
    let tx_status = coerce(raw.get("transactionInfo").and_then(|t| t.get("status")));
    let response_msg = coerce(raw.get("responseMsg").or_else(|| raw.get("responseMessage")));

    response_code == "0"
        || status_code == "2001"
        || tx_status == "SUCCESS"
        || response_msg == "RCS_SUCCESS"
}

/// Gateway-assigned reference id, or a locally generated fallback when the
/// gateway omits one.
pub fn reference_id(raw: &Value) -> String {
    raw.get("transactionInfo")
        .and_then(|t| t.get("referenceId"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("ref-{}", Utc::now().timestamp_millis()))
}

fn coerce(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_uppercase(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Audit logging must never leak merchant credentials.
fn redact_credentials(payload: &Value) -> Value {
    let mut redacted = payload.clone();
    if let Some(params) = redacted.get_mut("serviceParams") {
        params["apiKey"] = json!("[REDACTED]");
    }
    redacted
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn test_config() -> Config {
        Config {
            server_port: 3000,
            database_url: "postgres://localhost/test".to_string(),
            jwt_secret: "secret".to_string(),
            gateway_url: "https://api.waafipay.example/asm".to_string(),
            merchant_uid: "M0910291".to_string(),
            api_user_id: "1000297".to_string(),
            api_key: "API-TOP-SECRET".to_string(),
            gateway_timeout_secs: 60,
            gateway_max_attempts: 3,
            gateway_retry_base_ms: 1000,
        }
    }

    #[test]
    fn test_format_account_prefixes_country_code() {
        assert_eq!(format_account("615123456"), "252615123456");
    }

    #[test]
    fn test_format_account_strips_leading_zeros() {
        assert_eq!(format_account("0615123456"), "252615123456");
        assert_eq!(format_account("00615123456"), "252615123456");
    }

    #[test]
    fn test_format_account_keeps_existing_prefix() {
        assert_eq!(format_account("252615123456"), "252615123456");
    }

    #[test]
    fn test_is_success_response_code() {
        assert!(is_success(&json!({"responseCode": "0"})));
        assert!(is_success(&json!({"responseCode": 0})));
    }

    #[test]
    fn test_is_success_status_code() {
        assert!(is_success(&json!({"statusCode": "2001"})));
        assert!(is_success(&json!({"statusCode": 2001})));
    }

    #[test]
    fn test_is_success_transaction_status() {
        assert!(is_success(&json!({"transactionInfo": {"status": "SUCCESS"}})));
        assert!(is_success(&json!({"transactionInfo": {"status": "success"}})));
    }

    #[test]
    fn test_is_success_response_msg() {
        assert!(is_success(&json!({"responseMsg": "RCS_SUCCESS"})));
        assert!(is_success(&json!({"responseMessage": "rcs_success"})));
    }

    #[test]
    fn test_is_success_requires_at_least_one_signal() {
        assert!(!is_success(&json!({})));
        assert!(!is_success(&json!({
            "responseCode": "5310",
            "statusCode": "400",
            "transactionInfo": {"status": "FAILED"},
            "responseMsg": "RCS_USER_REJECTED",
        })));
    }

    #[test]
    fn test_reference_id_from_gateway() {
        let raw = json!({"transactionInfo": {"referenceId": "WP-12345"}});
        assert_eq!(reference_id(&raw), "WP-12345");
    }

    #[test]
    fn test_reference_id_fallback() {
        assert!(reference_id(&json!({})).starts_with("ref-"));
    }

    #[test]
    fn test_terminal_classification() {
        let client_error = GatewayError::Status {
            status: 400,
            body: "bad payload".to_string(),
        };
        assert!(client_error.is_terminal());

        let server_error = GatewayError::Status {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert!(!server_error.is_terminal());
    }

    #[test]
    fn test_payload_shape() {
        let client = WaafiClient::new(&test_config());
        let amount = BigDecimal::from_str("12.5").unwrap();
        let payload = client.build_payload("0615123456", &amount, "INV-1", "lunch order");

        assert_eq!(payload["schemaVersion"], json!("1.0"));
        assert_eq!(payload["serviceName"], json!("API_PURCHASE"));
        let params = &payload["serviceParams"];
        assert_eq!(params["paymentMethod"], json!("MWALLET_ACCOUNT"));
        assert_eq!(params["payerInfo"]["accountNo"], json!("252615123456"));
        assert_eq!(params["transactionInfo"]["invoiceId"], json!("INV-1"));
        assert_eq!(params["transactionInfo"]["amount"], json!(12.5));
        assert_eq!(params["transactionInfo"]["currency"], json!("USD"));
    }

    #[test]
    fn test_redaction_hides_api_key() {
        let client = WaafiClient::new(&test_config());
        let amount = BigDecimal::from(5);
        let payload = client.build_payload("615", &amount, "INV-2", "d");

        let redacted = redact_credentials(&payload);
        assert_eq!(redacted["serviceParams"]["apiKey"], json!("[REDACTED]"));
        // The original payload still carries the real key for transmission.
        assert_eq!(payload["serviceParams"]["apiKey"], json!("API-TOP-SECRET"));
    }
}
