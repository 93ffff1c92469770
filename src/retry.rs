use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode, header::RETRY_AFTER};
use tracing::warn;

use crate::error::AppError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// When false, only failures where the server certainly did nothing
    /// (429, connect errors) are retried.
    pub idempotent: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            idempotent: true,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn non_idempotent(self) -> Self {
        Self {
            idempotent: false,
            ..self
        }
    }

    fn retries_status(&self, status: StatusCode) -> bool {
        if self.idempotent {
            is_retryable_status(status)
        } else {
            status == StatusCode::TOO_MANY_REQUESTS
        }
    }

    fn retries_error(&self, err: &reqwest::Error) -> bool {
        if self.idempotent {
            err.is_timeout() || err.is_connect()
        } else {
            err.is_connect()
        }
    }

    /// `Retry-After` wins when present; otherwise exponential from `base_delay`.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let delay = retry_after.unwrap_or_else(|| {
            self.base_delay
                .checked_mul(2u32.saturating_pow(attempt))
                .unwrap_or(self.max_delay)
        });
        delay.min(self.max_delay)
    }
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Sends the request built by `build`, retrying transient failures, and
/// turns any final non-success status into an [`AppError`].
pub async fn send_with_retry<F>(
    service: &'static str,
    policy: &RetryPolicy,
    build: F,
) -> Result<Response, AppError>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0u32;

    loop {
        match build().send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                let status = response.status();
                if policy.retries_status(status) && attempt < policy.max_retries {
                    let delay = policy.delay_for(attempt, retry_after(&response));
                    attempt += 1;
                    warn!(
                        attempt,
                        "{} returned {}, retrying in {}ms",
                        service,
                        status,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(error_for_status(service, status, response, attempt + 1).await);
            }
            Err(err) => {
                if policy.retries_error(&err) && attempt < policy.max_retries {
                    let delay = policy.delay_for(attempt, None);
                    attempt += 1;
                    warn!(
                        attempt,
                        "{} request failed, retrying in {}ms: {}",
                        service,
                        delay.as_millis(),
                        err
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(AppError::Http(err));
            }
        }
    }
}

async fn error_for_status(
    service: &'static str,
    status: StatusCode,
    response: Response,
    attempts: u32,
) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Auth { service, status },
        StatusCode::TOO_MANY_REQUESTS => AppError::RateLimited { service, attempts },
        _ => {
            let body = response.text().await.unwrap_or_default();
            AppError::Api {
                service,
                status,
                body,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0, None), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1, None), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3, None), Duration::from_millis(4000));
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(20, None), Duration::from_secs(30));
        assert_eq!(
            policy.delay_for(0, Some(Duration::from_secs(120))),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn retry_after_overrides_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for(2, Some(Duration::from_secs(1))),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn non_idempotent_requests_only_retry_rate_limits() {
        let policy = RetryPolicy::default().non_idempotent();
        assert!(policy.retries_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!policy.retries_status(StatusCode::BAD_GATEWAY));
        assert!(RetryPolicy::default().retries_status(StatusCode::BAD_GATEWAY));
    }

    #[test]
    fn only_transient_statuses_are_retried() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
    }
}
