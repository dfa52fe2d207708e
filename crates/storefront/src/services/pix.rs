//! PIX payment provider client.
//!
//! The provider exposes two GET endpoints under the configured base URL:
//!
//! - `gerartrex.php?amount=59.80` creates a charge and answers
//!   `{"idTransaction": ..., "qrcode": "000201..."}`
//! - `verificartrex.php?id=<idTransaction>` answers `{"status": "..."}`
//!
//! Charge generation is retried with exponential backoff; verification is
//! not, since every caller polls again later anyway.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use pixstore_core::{PixStatus, format_amount, round_money};

use crate::config::PixConfig;

/// Errors talking to the PIX provider.
#[derive(Debug, Error)]
pub enum PixError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status.
    #[error("provider returned HTTP {0}")]
    Status(u16),

    /// Provider answered 2xx without the fields we need.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// Endpoint URL could not be built.
    #[error("invalid provider URL: {0}")]
    Url(#[from] url::ParseError),
}

/// A generated PIX charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PixCharge {
    pub transaction_id: String,
    /// PIX copy-and-paste payload, also rendered as the QR code.
    pub qrcode: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(rename = "idTransaction")]
    id_transaction: Option<serde_json::Value>,
    qrcode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: Option<String>,
}

/// Client for the PIX provider.
#[derive(Clone)]
pub struct PixClient {
    inner: Arc<PixClientInner>,
}

struct PixClientInner {
    client: reqwest::Client,
    base_url: Url,
    client_id: SecretString,
    generate_attempts: u32,
    retry_base_delay: Duration,
}

impl PixClient {
    /// Create a new PIX client.
    ///
    /// # Errors
    ///
    /// Returns `PixError::Http` if the HTTP client cannot be built.
    pub fn new(config: &PixConfig) -> Result<Self, PixError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(PixClientInner {
                client,
                base_url: config.api_base_url.clone(),
                client_id: config.client_id.clone(),
                generate_attempts: config.generate_attempts.max(1),
                retry_base_delay: config.retry_base_delay,
            }),
        })
    }

    /// Generate a charge for `amount`, retrying transient failures.
    ///
    /// The amount is rounded to centavos before submission.
    ///
    /// # Errors
    ///
    /// Returns the last error once every attempt has failed.
    #[instrument(skip(self), fields(amount = %amount))]
    pub async fn generate(&self, amount: Decimal) -> Result<PixCharge, PixError> {
        let amount = round_money(amount);
        retry_with_backoff(
            self.inner.generate_attempts,
            self.inner.retry_base_delay,
            "pix charge generation",
            || self.generate_once(amount),
        )
        .await
    }

    async fn generate_once(&self, amount: Decimal) -> Result<PixCharge, PixError> {
        let mut url = self.inner.base_url.join("gerartrex.php")?;
        url.query_pairs_mut()
            .append_pair("amount", &format_amount(amount))
            .append_pair("client_id", self.inner.client_id.expose_secret());

        let response = self.inner.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PixError::Status(status.as_u16()));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| PixError::InvalidResponse(e.to_string()))?;

        let transaction_id = match body.id_transaction {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => return Err(PixError::InvalidResponse("missing idTransaction".to_string())),
        };
        let qrcode = body
            .qrcode
            .filter(|q| !q.is_empty())
            .ok_or_else(|| PixError::InvalidResponse("missing qrcode".to_string()))?;

        Ok(PixCharge {
            transaction_id,
            qrcode,
            amount,
        })
    }

    /// Ask the provider for the status of a charge.
    ///
    /// # Errors
    ///
    /// Returns `PixError` if the provider cannot be reached or answers with
    /// a non-success status.
    #[instrument(skip(self), fields(amount = %amount))]
    pub async fn verify(&self, transaction_id: &str, amount: Decimal) -> Result<PixStatus, PixError> {
        let mut url = self.inner.base_url.join("verificartrex.php")?;
        url.query_pairs_mut()
            .append_pair("id", transaction_id)
            .append_pair("amount", &format_amount(amount))
            .append_pair("client_id", self.inner.client_id.expose_secret());

        let response = self.inner.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PixError::Status(status.as_u16()));
        }

        // Unparsable bodies count as still pending, like unknown statuses.
        let body: Option<VerifyResponse> = response.json().await.ok();
        let upstream = body.and_then(|b| b.status);
        let mapped = upstream
            .as_deref()
            .map_or(PixStatus::Pending, map_upstream_status);

        tracing::debug!(upstream = ?upstream, status = ?mapped, "pix charge verified");
        Ok(mapped)
    }
}

/// Map a provider status string to our [`PixStatus`].
#[must_use]
pub fn map_upstream_status(raw: &str) -> PixStatus {
    let raw = raw.trim();
    if ["PAID_OUT", "COMPLETED"].iter().any(|s| raw.eq_ignore_ascii_case(s)) {
        PixStatus::Completed
    } else if ["EXPIRED", "FAILED", "CANCELLED"]
        .iter()
        .any(|s| raw.eq_ignore_ascii_case(s))
    {
        PixStatus::Failed
    } else if raw.eq_ignore_ascii_case("RETIDO") {
        PixStatus::Retido
    } else {
        // WAITING_FOR_APPROVAL, PENDING and anything new
        PixStatus::Pending
    }
}

/// Run `op` up to `attempts` times, sleeping `base_delay × 2^n` after the
/// n-th failure.
///
/// # Errors
///
/// Returns the error of the final attempt.
pub async fn retry_with_backoff<T, E, F, Fut>(
    attempts: u32,
    base_delay: Duration,
    what: &str,
    mut op: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 < attempts => {
                let delay = base_delay.saturating_mul(2u32.saturating_pow(attempt));
                tracing::warn!(
                    error = %e,
                    attempt = attempt + 1,
                    attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "{what} failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::warn!(error = %e, attempts, "{what} failed, giving up");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn test_map_upstream_status() {
        assert_eq!(map_upstream_status("PAID_OUT"), PixStatus::Completed);
        assert_eq!(map_upstream_status("COMPLETED"), PixStatus::Completed);
        assert_eq!(map_upstream_status("WAITING_FOR_APPROVAL"), PixStatus::Pending);
        assert_eq!(map_upstream_status("PENDING"), PixStatus::Pending);
        assert_eq!(map_upstream_status("expired"), PixStatus::Failed);
        assert_eq!(map_upstream_status("failed"), PixStatus::Failed);
        assert_eq!(map_upstream_status("CANCELLED"), PixStatus::Failed);
        assert_eq!(map_upstream_status("RETIDO"), PixStatus::Retido);
        assert_eq!(map_upstream_status("SOMETHING_NEW"), PixStatus::Pending);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<u32, String> =
            retry_with_backoff(5, Duration::from_millis(1), "test op", move || async move {
                let calls = counter;
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 { Err(format!("fail {n}")) } else { Ok(n) }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), String> =
            retry_with_backoff(3, Duration::from_millis(1), "test op", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("nope".to_string())
            })
            .await;

        assert_eq!(result.unwrap_err(), "nope");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let _: Result<(), &str> = retry_with_backoff(0, Duration::ZERO, "test op", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("nope")
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
