//! HTTP dispatch with bounded retries.
//!
//! The dispatcher owns a pooled `ureq::Agent`, the resolved endpoint and the
//! pre-built `Authorization` header. It holds no mutable state, so one
//! instance serves concurrent deliveries from any number of threads.

use std::{sync::Arc, thread};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use log::{debug, warn};
use ureq::{Agent, AgentBuilder};

use crate::error::{AttemptError, DeliveryError};
use crate::handlers::HandlerBuildError;

use super::backoff::{BackoffPolicy, BackoffState};
use super::config::{API_USER, MailgunConfig, RetryMode};
use super::message::OutboundMessage;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Classification of HTTP response for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 2xx responses - request succeeded.
    Success,
    /// 5xx or 429 - worth another attempt.
    Retryable,
    /// Anything else - the provider will keep refusing this request.
    Permanent,
}

/// Classifies an HTTP status code for retry logic.
pub(crate) fn classify_status(status: u16) -> ResponseClass {
    match status {
        200..=299 => ResponseClass::Success,
        429 => ResponseClass::Retryable,
        500..=599 => ResponseClass::Retryable,
        _ => ResponseClass::Permanent,
    }
}

impl RetryMode {
    fn should_retry(self, err: &AttemptError) -> bool {
        match (self, err) {
            (RetryMode::AllFailures, _) => true,
            (RetryMode::TransientOnly, AttemptError::Transport(_)) => true,
            (RetryMode::TransientOnly, AttemptError::ProviderRejection { status, .. }) => {
                classify_status(*status) == ResponseClass::Retryable
            }
        }
    }
}

/// Base64-encoded `api:<key>` Basic credentials.
fn basic_authorization(api_key: &str) -> String {
    let credentials = format!("{API_USER}:{api_key}");
    format!("Basic {}", BASE64_STANDARD.encode(credentials.as_bytes()))
}

pub struct HttpDispatcher {
    agent: Agent,
    endpoint: String,
    authorization: String,
    max_retries: u32,
    retry_mode: RetryMode,
    backoff: Option<BackoffPolicy>,
}

impl HttpDispatcher {
    /// Build the agent and request constants from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerBuildError::Tls`] if the platform TLS connector
    /// cannot be initialised.
    pub fn new(config: &MailgunConfig) -> Result<Self, HandlerBuildError> {
        let connector = native_tls::TlsConnector::new()?;
        let agent = AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .timeout(config.request_timeout)
            .tls_connector(Arc::new(connector))
            .build();
        Ok(Self {
            agent,
            endpoint: config.endpoint(),
            authorization: basic_authorization(config.credentials.api_key()),
            max_retries: config.max_retries,
            retry_mode: config.retry_mode,
            backoff: config.backoff.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Upper bound on HTTP calls per delivery.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Send `message`, retrying failed attempts up to the configured bound.
    ///
    /// Returns the number of attempts made on success.
    ///
    /// # Errors
    ///
    /// * [`DeliveryError::ExhaustedRetries`] - every attempt failed.
    /// * [`DeliveryError::Rejected`] - the retry mode declined to retry a
    ///   provider rejection.
    pub fn dispatch(&self, message: &OutboundMessage) -> Result<u32, DeliveryError> {
        let payload = message.to_form();
        let max_attempts = self.max_attempts();
        let mut backoff = self.backoff.clone().map(BackoffState::new);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match self.execute(&payload) {
                Ok(()) => {
                    debug!("Mailgun accepted message on attempt {attempt}/{max_attempts}");
                    return Ok(attempt);
                }
                Err(err) => err,
            };
            warn!("Mailgun delivery attempt {attempt}/{max_attempts} failed: {err}");
            if !self.retry_mode.should_retry(&err) {
                return Err(DeliveryError::Rejected {
                    attempts: attempt,
                    source: err,
                });
            }
            if attempt >= max_attempts {
                return Err(DeliveryError::ExhaustedRetries {
                    attempts: attempt,
                    last: err,
                });
            }
            if let Some(state) = backoff.as_mut() {
                thread::sleep(state.next_sleep());
            }
        }
    }

    fn execute(&self, payload: &str) -> Result<(), AttemptError> {
        let result = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &self.authorization)
            .set("Content-Type", FORM_CONTENT_TYPE)
            .send_string(payload);
        match result {
            Ok(response) => {
                let status = response.status();
                if classify_status(status) == ResponseClass::Success {
                    Ok(())
                } else {
                    Err(rejection(status, response))
                }
            }
            Err(ureq::Error::Status(status, response)) => Err(rejection(status, response)),
            Err(ureq::Error::Transport(transport)) => {
                Err(AttemptError::Transport(transport.to_string()))
            }
        }
    }
}

fn rejection(status: u16, response: ureq::Response) -> AttemptError {
    let body = response.into_string().unwrap_or_default();
    AttemptError::rejection(status, &body)
}

impl std::fmt::Debug for HttpDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDispatcher")
            .field("endpoint", &self.endpoint)
            .field("max_retries", &self.max_retries)
            .field("retry_mode", &self.retry_mode)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(200, ResponseClass::Success)]
    #[case(202, ResponseClass::Success)]
    #[case(400, ResponseClass::Permanent)]
    #[case(401, ResponseClass::Permanent)]
    #[case(404, ResponseClass::Permanent)]
    #[case(429, ResponseClass::Retryable)]
    #[case(500, ResponseClass::Retryable)]
    #[case(503, ResponseClass::Retryable)]
    #[case(302, ResponseClass::Permanent)]
    fn status_classification(#[case] status: u16, #[case] expected: ResponseClass) {
        assert_eq!(classify_status(status), expected);
    }

    #[rstest]
    fn basic_authorization_uses_api_user() {
        // "api:key-123"
        assert_eq!(basic_authorization("key-123"), "Basic YXBpOmtleS0xMjM=");
    }

    #[rstest]
    #[case(RetryMode::AllFailures, AttemptError::rejection(401, ""), true)]
    #[case(RetryMode::AllFailures, AttemptError::Transport("reset".into()), true)]
    #[case(RetryMode::TransientOnly, AttemptError::rejection(401, ""), false)]
    #[case(RetryMode::TransientOnly, AttemptError::rejection(400, ""), false)]
    #[case(RetryMode::TransientOnly, AttemptError::rejection(429, ""), true)]
    #[case(RetryMode::TransientOnly, AttemptError::rejection(502, ""), true)]
    #[case(RetryMode::TransientOnly, AttemptError::Transport("timed out".into()), true)]
    fn retry_mode_decisions(
        #[case] mode: RetryMode,
        #[case] err: AttemptError,
        #[case] expected: bool,
    ) {
        assert_eq!(mode.should_retry(&err), expected);
    }
}
