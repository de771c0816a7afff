use std::future::Future;
use std::time::Duration;

use crate::gateway::client::GatewayError;

/// Runs `op` up to `max_attempts` times with exponential backoff, doubling
/// the delay after each failed attempt. Terminal failures (4xx) are never
/// retried; the last error is returned once the budget is exhausted.
///
/// A bounded loop with an explicit attempt counter, so a pathological
/// configuration cannot grow the stack.
pub async fn with_retry<T, F, Fut>(
    mut op: F,
    max_attempts: u32,
    base_delay: Duration,
) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut delay = base_delay;
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_terminal() || attempt >= max_attempts => return Err(err),
            Err(err) => {
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "gateway call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn server_error() -> GatewayError {
        GatewayError::Status {
            status: 500,
            body: "internal".to_string(),
        }
    }

    fn client_error() -> GatewayError {
        GatewayError::Status {
            status: 400,
            body: "invalid payload".to_string(),
        }
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let calls = Cell::new(0u32);
        let result = with_retry(
            || {
                calls.set(calls.get() + 1);
                async { Ok::<_, GatewayError>(42) }
            },
            3,
            Duration::from_millis(10),
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_failures_then_success() {
        let calls = Cell::new(0u32);
        let start = tokio::time::Instant::now();

        let result = with_retry(
            || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(server_error())
                    } else {
                        Ok("paid")
                    }
                }
            },
            3,
            Duration::from_millis(10),
        )
        .await;

        assert_eq!(result.unwrap(), "paid");
        assert_eq!(calls.get(), 3);
        // Backoff doubles: 10ms after the first failure, 20ms after the second.
        assert_eq!(start.elapsed(), Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let calls = Cell::new(0u32);
        let result = with_retry(
            || {
                calls.set(calls.get() + 1);
                async { Err::<(), _>(client_error()) }
            },
            3,
            Duration::from_millis(10),
        )
        .await;

        assert!(matches!(
            result,
            Err(GatewayError::Status { status: 400, .. })
        ));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let calls = Cell::new(0u32);
        let result = with_retry(
            || {
                calls.set(calls.get() + 1);
                async { Err::<(), _>(server_error()) }
            },
            3,
            Duration::from_millis(10),
        )
        .await;

        assert!(matches!(
            result,
            Err(GatewayError::Status { status: 500, .. })
        ));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = Cell::new(0u32);
        let _ = with_retry(
            || {
                calls.set(calls.get() + 1);
                async { Err::<(), _>(client_error()) }
            },
            0,
            Duration::from_millis(10),
        )
        .await;

        assert_eq!(calls.get(), 1);
    }
}
