use rand::Rng;
use reqwest::StatusCode;
use std::time::Duration;

/// Fixed delay schedule for retrying flaky HTTP calls. The first entry is
/// usually zero (attempt immediately).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
    max_jitter: Duration,
}

impl RetryPolicy {
    pub fn from_secs(delays: &[u64]) -> Self {
        RetryPolicy {
            delays: delays.iter().map(|&s| Duration::from_secs(s)).collect(),
            max_jitter: Duration::from_millis(500),
        }
    }

    /// Schedule without sleeps, for tests.
    #[cfg(test)]
    pub fn immediate(attempts: usize) -> Self {
        RetryPolicy {
            delays: vec![Duration::ZERO; attempts],
            max_jitter: Duration::ZERO,
        }
    }

    pub fn attempts(&self) -> usize {
        self.delays.len()
    }

    /// Sleep before attempt `n` (0-based). Non-zero delays get random jitter.
    pub async fn wait(&self, attempt: usize) {
        let Some(&base) = self.delays.get(attempt) else {
            return;
        };
        if base.is_zero() {
            return;
        }
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms > 0 {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        } else {
            Duration::ZERO
        };
        tokio::time::sleep(base + jitter).await;
    }
}

/// Rate limits and server errors are worth another attempt.
pub fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Keep log lines and error messages bounded.
pub fn truncate_body(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}
