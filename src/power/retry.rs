//! Bounded retry with exponential backoff for blocking HTTP calls.
//!
//! Retried:
//! - Timeouts and connection errors
//! - 408, 429 and 5xx responses
//!
//! Everything else (other 4xx, body errors) is returned on the first attempt.

use log::{debug, info, warn};
use reqwest::blocking::Response;
use reqwest::StatusCode;
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::new(0, 0, 0)
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let delay_ms = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as u64))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    NoRetry,
}

pub fn is_retryable_error(error: &reqwest::Error) -> RetryDecision {
    if error.is_timeout() || error.is_connect() {
        return RetryDecision::Retry;
    }
    match error.status() {
        Some(status) => is_retryable_status(status),
        None => RetryDecision::NoRetry,
    }
}

pub fn is_retryable_status(status: StatusCode) -> RetryDecision {
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        RetryDecision::Retry
    } else {
        RetryDecision::NoRetry
    }
}

/// Runs `operation` until it yields a non-retryable outcome or the retry budget is spent.
///
/// The last outcome is returned as-is, so a response with a retryable status can still come
/// back once retries are exhausted; callers check the status themselves.
pub fn send_with_retry<F>(policy: &RetryPolicy, operation: F) -> Result<Response, reqwest::Error>
where
    F: Fn() -> Result<Response, reqwest::Error>,
{
    let mut attempt = 0;
    loop {
        let outcome = operation();
        let decision = match &outcome {
            Ok(response) => is_retryable_status(response.status()),
            Err(e) => is_retryable_error(e),
        };

        if decision == RetryDecision::NoRetry || attempt >= policy.max_retries {
            if attempt > 0 && outcome.is_ok() {
                info!("Request finished after {} retries", attempt);
            }
            return outcome;
        }

        match &outcome {
            Ok(response) => warn!(
                "Request returned retryable status {}, attempt {} of {}",
                response.status(),
                attempt + 1,
                policy.max_retries + 1
            ),
            Err(e) => warn!(
                "Retryable error on attempt {} of {}: {}",
                attempt + 1,
                policy.max_retries + 1,
                e
            ),
        }
        let delay = policy.delay_for_attempt(attempt);
        debug!("Waiting {:?} before retrying", delay);
        std::thread::sleep(delay);
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::blocking::Client;
    use std::cell::Cell;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_delay, Duration::from_millis(1_000));
        assert_eq!(policy.max_delay, Duration::from_millis(10_000));
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::new(5, 100, 1_000);
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_millis(1_000));
    }

    #[test]
    fn test_retryable_status_codes() {
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::GATEWAY_TIMEOUT,
            StatusCode::REQUEST_TIMEOUT,
        ] {
            assert_eq!(is_retryable_status(status), RetryDecision::Retry, "{status}");
        }
        for status in [
            StatusCode::OK,
            StatusCode::BAD_REQUEST,
            StatusCode::NOT_FOUND,
            StatusCode::UNPROCESSABLE_ENTITY,
        ] {
            assert_eq!(is_retryable_status(status), RetryDecision::NoRetry, "{status}");
        }
    }

    /// Serves one canned response per connection, in order, then stops listening.
    fn serve(statuses: Vec<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        std::thread::spawn(move || {
            for status in statuses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut buf = [0u8; 4096];
                let mut request = Vec::new();
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut buf).unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                let response =
                    format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
                stream.write_all(response.as_bytes()).unwrap();
            }
        });
        url
    }

    #[test]
    fn test_connection_errors_use_the_whole_budget() {
        let client = Client::new();
        let attempts = Cell::new(0);
        let outcome = send_with_retry(&RetryPolicy::new(2, 1, 5), || {
            attempts.set(attempts.get() + 1);
            client.get("http://127.0.0.1:9/").send()
        });
        assert!(outcome.is_err());
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_non_retryable_error_is_returned_at_once() {
        let client = Client::new();
        let attempts = Cell::new(0);
        let outcome = send_with_retry(&RetryPolicy::new(2, 1, 5), || {
            attempts.set(attempts.get() + 1);
            client.get("not a url").send()
        });
        assert!(outcome.is_err());
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_retryable_status_is_retried_until_success() {
        let url = serve(vec!["503 Service Unavailable", "200 OK"]);
        let client = Client::new();
        let attempts = Cell::new(0);
        let response = send_with_retry(&RetryPolicy::new(3, 1, 5), || {
            attempts.set(attempts.get() + 1);
            client.get(&url).send()
        })
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(attempts.get(), 2);
    }

    #[test]
    fn test_exhausted_retryable_status_is_returned_as_is() {
        let url = serve(vec!["503 Service Unavailable", "503 Service Unavailable"]);
        let client = Client::new();
        let attempts = Cell::new(0);
        let response = send_with_retry(&RetryPolicy::new(1, 1, 5), || {
            attempts.set(attempts.get() + 1);
            client.get(&url).send()
        })
        .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(attempts.get(), 2);
    }
}
