//! Bounded-retry exchange client
//!
//! Wraps an `HttpTransport` with an iterative retry loop (exponential backoff
//! + jitter). Exhausted retries are a soft failure: `fetch` answers `Ok(None)`
//! and the caller treats it as "no data this cycle".

use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::transport::{HttpResponse, HttpTransport};
use crate::error::FetchError;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY_MS: u64 = 250;
const DEFAULT_MAX_DELAY_MS: u64 = 5_000;
const DEFAULT_JITTER_RATIO: f64 = 0.20;

/// How an exchange's own error payload (rate limit, bad parameter) is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionPolicy {
    /// Abort surveillance and request a process shutdown
    Fatal,
    /// Retry with backoff like a transient failure
    Backoff,
}

impl Default for RejectionPolicy {
    fn default() -> Self {
        RejectionPolicy::Fatal
    }
}

/// Retry bound and delay schedule
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            jitter_ratio: DEFAULT_JITTER_RATIO,
        }
    }
}

impl RetryPolicy {
    /// Re-attempt immediately, without any delay between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter_ratio: 0.0,
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }

        let exponent = attempt.saturating_sub(1).min(16);
        let base = self
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);

        let jitter = if self.jitter_ratio > 0.0 {
            rand::thread_rng().gen_range(-self.jitter_ratio..=self.jitter_ratio)
        } else {
            0.0
        };

        base.mul_f64((1.0 + jitter).max(0.0)).min(self.max_delay)
    }
}

/// Outcome of classifying one HTTP answer
#[derive(Debug)]
enum Attempt {
    Data(Value),
    Transient(String),
    Malformed(String),
    Rejected { code: i64, message: String },
}

/// Exchange REST client with bounded retries
pub struct ExchangeClient {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
    on_rejection: RejectionPolicy,
}

impl ExchangeClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        policy: RetryPolicy,
        on_rejection: RejectionPolicy,
    ) -> Self {
        Self {
            transport,
            policy,
            on_rejection,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url` and parse the JSON body.
    ///
    /// Returns `Ok(None)` when every attempt failed or the body was unusable.
    /// Only an upstream rejection under `RejectionPolicy::Fatal` is an error.
    pub async fn fetch(&self, url: &str) -> Result<Option<Value>, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.transport.get(url).await {
                Ok(response) => match classify(response) {
                    Attempt::Data(value) => return Ok(Some(value)),
                    Attempt::Malformed(reason) => {
                        warn!(url = %url, reason = %reason, "Malformed exchange response, skipping");
                        return Ok(None);
                    }
                    Attempt::Transient(reason) => {
                        warn!(url = %url, attempt, reason = %reason, "Transient exchange failure");
                    }
                    Attempt::Rejected { code, message } => match self.on_rejection {
                        RejectionPolicy::Fatal => {
                            error!(url = %url, code, msg = %message, "Exchange rejected request");
                            return Err(FetchError::UpstreamRejection {
                                url: url.to_string(),
                                code,
                                message,
                            });
                        }
                        RejectionPolicy::Backoff => {
                            warn!(
                                url = %url,
                                attempt,
                                code,
                                msg = %message,
                                "Exchange rejected request, backing off"
                            );
                        }
                    },
                },
                Err(e) => {
                    warn!(url = %url, attempt, error = %e, "Transient exchange failure");
                }
            }

            if attempt < max_attempts {
                let delay = self.policy.delay_after(attempt);
                if !delay.is_zero() {
                    debug!(url = %url, delay_ms = delay.as_millis() as u64, "Retrying after backoff");
                    tokio::time::sleep(delay).await;
                }
            }
        }

        warn!(url = %url, attempts = max_attempts, "Failed to GET data, giving up for this cycle");
        Ok(None)
    }
}

fn classify(response: HttpResponse) -> Attempt {
    let HttpResponse { status, body } = response;

    let value: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) if status >= 500 => return Attempt::Transient(format!("HTTP {}: {}", status, e)),
        Err(_) if status == 418 || status == 429 => {
            return Attempt::Rejected {
                code: status as i64,
                message: format!("HTTP {}", status),
            }
        }
        Err(e) => return Attempt::Malformed(format!("HTTP {}: {}", status, e)),
    };

    if let Some((code, message)) = detect_rejection(&value) {
        return Attempt::Rejected { code, message };
    }

    match status {
        200..=299 => Attempt::Data(value),
        418 | 429 => Attempt::Rejected {
            code: status as i64,
            message: format!("HTTP {}", status),
        },
        500..=599 => Attempt::Transient(format!("HTTP {}", status)),
        _ => Attempt::Malformed(format!("HTTP {}", status)),
    }
}

/// Detect an exchange error payload.
///
/// Binance answers `{"code": -1121, "msg": "Invalid symbol."}`, Bybit answers
/// `{"retCode": 10006, "retMsg": "Too many visits!"}` (retCode 0 is success).
pub fn detect_rejection(value: &Value) -> Option<(i64, String)> {
    let object = value.as_object()?;

    if let (Some(code), Some(msg)) = (
        object.get("code").and_then(Value::as_i64),
        object.get("msg").and_then(Value::as_str),
    ) {
        return Some((code, msg.to_string()));
    }

    match object.get("retCode").and_then(Value::as_i64) {
        Some(0) | None => None,
        Some(code) => {
            let msg = object
                .get("retMsg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Some((code, msg))
        }
    }
}
