//! Bounded gateway calls.

use std::future::Future;
use std::time::Duration;

use crate::domain::subscription::GatewayError;

/// Default bound on a single gateway call.
pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs a gateway call, turning an overrun into `GatewayError::Timeout`.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout {
            after_secs: limit.as_secs(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fast_call_passes_through() {
        let result = bounded(Duration::from_secs(1), async { Ok::<_, GatewayError>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn slow_call_times_out() {
        let result = bounded(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, GatewayError>(7)
        })
        .await;
        assert!(matches!(result, Err(GatewayError::Timeout { .. })));
    }
}
