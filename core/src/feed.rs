//! External assessment feed: fetch, retry, and availability status.
//!
//! RULE: This is the only module in the crate that performs network I/O.
//! Pipeline stages receive an already-fetched `AssessmentFeed` and never
//! fetch anything themselves.
//!
//! Retry policy:
//!   - Up to `max_attempts` attempts, delay doubling from `base_delay`
//!     and capped at `max_delay`.
//!   - HTTP 400 and 404 are permanent: no retry.
//!   - 429, 5xx, timeouts and transport errors are transient.
//!   - Exhausted retries produce `FeedStatus::Unavailable`, never an error.

use crate::{
    config::FeedConfig,
    error::{EngineError, EngineResult},
    model::AssessmentRecord,
    types::StateCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FeedStatus {
    Live,
    Cached { fetched_at: DateTime<Utc> },
    Unavailable { reason: String, attempts: u32 },
}

impl FeedStatus {
    pub fn is_available(&self) -> bool {
        !matches!(self, FeedStatus::Unavailable { .. })
    }
}

/// One state's assessment feed as handed to the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentFeed {
    pub state: StateCode,
    pub status: FeedStatus,
    #[serde(default)]
    pub records: Vec<AssessmentRecord>,
}

impl AssessmentFeed {
    pub fn live(state: &str, records: Vec<AssessmentRecord>) -> Self {
        Self {
            state: state.to_string(),
            status: FeedStatus::Live,
            records,
        }
    }

    pub fn unavailable(state: &str, reason: &str, attempts: u32) -> Self {
        Self {
            state: state.to_string(),
            status: FeedStatus::Unavailable {
                reason: reason.to_string(),
                attempts,
            },
            records: Vec::new(),
        }
    }
}

/// Accepts either a bare array of records or `{ "records": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeedPayload {
    Bare(Vec<AssessmentRecord>),
    Wrapped { records: Vec<AssessmentRecord> },
}

impl FeedPayload {
    fn into_records(self) -> Vec<AssessmentRecord> {
        match self {
            FeedPayload::Bare(r) | FeedPayload::Wrapped { records: r } => r,
        }
    }
}

pub fn parse_feed_json(body: &str) -> EngineResult<Vec<AssessmentRecord>> {
    let payload: FeedPayload = serde_json::from_str(body)?;
    Ok(payload.into_records())
}

// ── Retry ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial one).
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &FeedConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        std::cmp::min(self.base_delay.saturating_mul(factor), self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FeedConfig::default())
    }
}

/// Errors worth another attempt.
pub fn is_transient(e: &EngineError) -> bool {
    match e {
        EngineError::FeedStatus { status } => *status == 429 || *status >= 500,
        EngineError::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
        _ => false,
    }
}

pub enum RetryOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    Exhausted { last_error: String, attempts: u32 },
}

/// Run `op` until it succeeds, hits a permanent error, or runs out of attempts.
pub fn with_retry<T, F>(policy: &RetryPolicy, label: &str, mut op: F) -> RetryOutcome<T>
where
    F: FnMut() -> EngineResult<T>,
{
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => {
                return RetryOutcome::Succeeded {
                    value,
                    attempts: attempt,
                }
            }
            Err(e) if is_transient(&e) && attempt < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                log::warn!(
                    "{label}: transient failure (attempt {attempt}/{}), retrying in {delay:?}: {e}",
                    policy.max_attempts
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => {
                log::warn!("{label}: giving up after {attempt} attempt(s): {e}");
                return RetryOutcome::Exhausted {
                    last_error: e.to_string(),
                    attempts: attempt,
                };
            }
        }
    }
}

// ── HTTP client ────────────────────────────────────────────────────

pub struct AssessmentFeedClient {
    http: reqwest::blocking::Client,
    url: String,
    policy: RetryPolicy,
}

impl AssessmentFeedClient {
    pub fn new(url: &str, config: &FeedConfig) -> EngineResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("watershed-core/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            url: url.to_string(),
            policy: RetryPolicy::from_config(config),
        })
    }

    fn fetch_once(&self, state: &str) -> EngineResult<Vec<AssessmentRecord>> {
        let sep = if self.url.contains('?') { '&' } else { '?' };
        let url = format!("{}{sep}state={}", self.url, state.trim());
        let resp = self.http.get(&url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(EngineError::FeedStatus {
                status: status.as_u16(),
            });
        }
        let body = resp.text()?;
        parse_feed_json(&body)
    }

    /// Fetch one state's feed. Never fails: exhaustion yields an
    /// `Unavailable` feed with no records.
    pub fn fetch(&self, state: &str) -> AssessmentFeed {
        let label = format!("feed[{state}]");
        match with_retry(&self.policy, &label, || self.fetch_once(state)) {
            RetryOutcome::Succeeded { value, attempts } => {
                log::info!("{label}: {} records in {attempts} attempt(s)", value.len());
                AssessmentFeed::live(state, value)
            }
            RetryOutcome::Exhausted {
                last_error,
                attempts,
            } => AssessmentFeed::unavailable(state, &last_error, attempts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(1_500),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(1_000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(1_500));
        assert_eq!(policy.delay_after(10), Duration::from_millis(1_500));
    }

    #[test]
    fn transient_failures_are_retried_until_success() {
        let calls = Cell::new(0);
        let outcome = with_retry(&instant_policy(3), "test", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(EngineError::FeedStatus { status: 503 })
            } else {
                Ok(calls.get())
            }
        });
        match outcome {
            RetryOutcome::Succeeded { value, attempts } => {
                assert_eq!(value, 3);
                assert_eq!(attempts, 3);
            }
            RetryOutcome::Exhausted { .. } => panic!("expected success on third attempt"),
        }
    }

    #[test]
    fn permanent_failure_is_not_retried() {
        let calls = Cell::new(0);
        let outcome: RetryOutcome<()> = with_retry(&instant_policy(3), "test", || {
            calls.set(calls.get() + 1);
            Err(EngineError::FeedStatus { status: 404 })
        });
        assert_eq!(calls.get(), 1);
        assert!(matches!(outcome, RetryOutcome::Exhausted { attempts: 1, .. }));
    }

    #[test]
    fn exhaustion_reports_attempt_count() {
        let outcome: RetryOutcome<()> = with_retry(&instant_policy(3), "test", || {
            Err(EngineError::FeedStatus { status: 500 })
        });
        match outcome {
            RetryOutcome::Exhausted { attempts, last_error } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("500"));
            }
            RetryOutcome::Succeeded { .. } => panic!("expected exhaustion"),
        }
    }

    #[test]
    fn both_payload_shapes_parse() {
        let bare = r#"[{"name":"Back River","category_code":"5","causes":["Nitrogen"]}]"#;
        let wrapped = r#"{"records":[{"name":"Back River","category":"4a"}]}"#;
        assert_eq!(parse_feed_json(bare).unwrap().len(), 1);
        let records = parse_feed_json(wrapped).unwrap();
        assert_eq!(records[0].category_code, "4a");
        assert!(records[0].causes.is_empty());
    }
}
