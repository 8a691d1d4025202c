//! Callback delivery.
//!
//! The platform contract is one POST to the caller-supplied callback URL,
//! best-effort: no retry, and a failure must never reach the pipeline that
//! already finished answering.

use crate::payload::SkillResponse;
use std::time::Duration;

/// Sends final skill responses to callback URLs.
pub struct CallbackSender {
    client: reqwest::Client,
    timeout: Duration,
}

impl CallbackSender {
    /// Create a sender with the default 10-second delivery timeout.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            timeout: Duration::from_secs(10),
        }
    }

    /// Set the delivery timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// POST the payload to the callback URL.
    ///
    /// Every failure mode (timeout, connection error, non-success status)
    /// is logged and swallowed here.
    pub async fn deliver(&self, callback_url: &str, payload: &SkillResponse) {
        let result = self
            .client
            .post(callback_url)
            .json(payload)
            .timeout(self.timeout)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::info!(status = %response.status(), "Callback delivered");
            }
            Ok(response) => {
                tracing::error!(
                    status = %response.status(),
                    callback_url = %callback_url,
                    "Callback rejected by receiver"
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    callback_url = %callback_url,
                    "Callback delivery failed"
                );
            }
        }
    }
}

impl Default for CallbackSender {
    fn default() -> Self {
        Self::new()
    }
}
