//! Configuration consumed by [`MailgunHandler`](super::MailgunHandler).
//!
//! `MailgunHandlerBuilder` validates user input and produces these values;
//! nothing here changes after the handler is constructed.

use std::fmt;
use std::time::Duration;

use super::backoff::BackoffPolicy;
use super::message::{MessageTemplate, RecipientSet};
use super::url_encoding::encode_path_segment;

/// Provider base URL used unless a handler overrides it.
pub const DEFAULT_BASE_URL: &str = "https://api.mailgun.net";
/// Additional attempts after the first before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 2;
/// Default timeout for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default overall timeout for one request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Basic-auth user name the provider expects.
pub const API_USER: &str = "api";

/// API key and sending domain.
///
/// `Debug` never prints the key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    domain: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            domain: domain.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("domain", &self.domain)
            .finish()
    }
}

/// Which failed attempts are retried.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RetryMode {
    /// Retry transport errors and every non-2xx status.
    #[default]
    AllFailures,
    /// Retry transport errors, 429 and 5xx; any other status ends delivery.
    TransientOnly,
}

impl std::str::FromStr for RetryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "all_failures" => Ok(Self::AllFailures),
            "transient" | "transient_only" => Ok(Self::TransientOnly),
            other => Err(format!("unknown retry mode '{other}'")),
        }
    }
}

/// Everything needed to construct a [`MailgunHandler`](super::MailgunHandler).
#[derive(Clone, Debug)]
pub struct MailgunConfig {
    pub credentials: Credentials,
    /// Provider base URL, without the `/v3` suffix.
    pub base_url: String,
    pub template: MessageTemplate,
    /// Attempts after the first; `0` disables retrying.
    pub max_retries: u32,
    pub retry_mode: RetryMode,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Delay policy between attempts; `None` retries immediately.
    pub backoff: Option<BackoffPolicy>,
}

impl MailgunConfig {
    /// Config with default transport settings for the given message fields.
    pub fn new(
        credentials: Credentials,
        sender: impl Into<String>,
        recipients: RecipientSet,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            base_url: DEFAULT_BASE_URL.to_owned(),
            template: MessageTemplate::new(sender, recipients, subject),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_mode: RetryMode::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            backoff: None,
        }
    }

    /// `{base_url}/v3/{domain}/messages`, with the domain encoded as a single
    /// path segment.
    pub fn endpoint(&self) -> String {
        messages_endpoint(&self.base_url, self.credentials.domain())
    }
}

pub(crate) fn messages_endpoint(base_url: &str, domain: &str) -> String {
    format!(
        "{}/v3/{}/messages",
        base_url.trim_end_matches('/'),
        encode_path_segment(domain)
    )
}
