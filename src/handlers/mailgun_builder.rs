//! Builder for [`MailHandler`](crate::MailHandler)s backed by
//! [`MailgunHandler`](crate::mailgun::MailgunHandler).
//!
//! Required fields are only checked for presence: address syntax and subject
//! length are left for the provider to judge.

use std::time::Duration;

use crate::formatter::FormatterKind;
use crate::level::Level;
use crate::mail_handler::MailHandler;
use crate::mailgun::{
    BackoffPolicy, Credentials, MailgunConfig, MailgunHandler, RecipientSet, RetryMode,
    split_address_list,
};

use super::{HandlerBuildError, HandlerBuilderTrait};

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(HandlerBuildError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

/// Backoff timings supplied in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BackoffOverrides {
    pub base_ms: Option<u64>,
    pub cap_ms: Option<u64>,
}

impl BackoffOverrides {
    fn is_set(&self) -> bool {
        self.base_ms.is_some() || self.cap_ms.is_some()
    }

    fn resolve(&self) -> Result<Option<BackoffPolicy>, HandlerBuildError> {
        if !self.is_set() {
            return Ok(None);
        }
        if let Some(ms) = self.base_ms {
            ensure_positive!(ms, "backoff_base_ms")?;
        }
        if let Some(ms) = self.cap_ms {
            ensure_positive!(ms, "backoff_cap_ms")?;
        }
        let defaults = BackoffPolicy::default();
        let base = self.base_ms.map_or(defaults.base, Duration::from_millis);
        let cap = self.cap_ms.map_or(defaults.cap.max(base), Duration::from_millis);
        if cap < base {
            return Err(HandlerBuildError::InvalidConfig(
                "backoff_cap_ms must not be smaller than backoff_base_ms".into(),
            ));
        }
        Ok(Some(BackoffPolicy { base, cap }))
    }
}

/// Builder for Mailgun-backed mail handlers.
#[derive(Clone, Default)]
pub struct MailgunHandlerBuilder {
    api_key: Option<String>,
    domain: Option<String>,
    from: Option<String>,
    to: Vec<String>,
    subject: Option<String>,
    level: Option<Level>,
    bubble: Option<bool>,
    base_url: Option<String>,
    max_retries: Option<u32>,
    retry_mode: RetryMode,
    connect_timeout_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    backoff: BackoffOverrides,
    formatter: FormatterKind,
}

impl MailgunHandlerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Mailgun API key (required).
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the sending domain (required).
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the sender address (required).
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Append one recipient address. The value is kept whole, so quoted
    /// display names may contain commas.
    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to.push(to.into());
        self
    }

    /// Append every address in a comma-separated list, splitting outside
    /// quoted display names.
    pub fn with_to_list(mut self, list: &str) -> Self {
        self.to.extend(split_address_list(list));
        self
    }

    /// Replace the recipient list.
    pub fn with_recipients<I, S>(mut self, recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.to = recipients.into_iter().map(Into::into).collect();
        self
    }

    /// Set the subject line (required).
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Minimum level that triggers a mail. Defaults to `ERROR`.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Whether handled records keep propagating. Defaults to `true`.
    pub fn with_bubble(mut self, bubble: bool) -> Self {
        self.bubble = Some(bubble);
        self
    }

    /// Override the provider base URL, e.g. for the EU region.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    option_setter!(
        #[doc = "Set how many times a failed attempt is retried."]
        with_max_retries,
        max_retries,
        u32
    );
    option_setter!(
        #[doc = "Set the connect timeout in milliseconds."]
        with_connect_timeout_ms,
        connect_timeout_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the per-request timeout in milliseconds."]
        with_request_timeout_ms,
        request_timeout_ms,
        u64
    );

    pub fn with_retry_mode(mut self, mode: RetryMode) -> Self {
        self.retry_mode = mode;
        self
    }

    /// Enable jittered exponential backoff between retries.
    pub fn with_backoff(mut self, overrides: BackoffOverrides) -> Self {
        self.backoff = overrides;
        self
    }

    pub fn with_formatter(mut self, formatter: FormatterKind) -> Self {
        self.formatter = formatter;
        self
    }

    fn require<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, HandlerBuildError> {
        match value.as_deref() {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(HandlerBuildError::InvalidConfig(format!(
                "Mailgun handler requires `{field}`"
            ))),
        }
    }

    fn validate_base_url(&self) -> Result<(), HandlerBuildError> {
        match &self.base_url {
            Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                Err(HandlerBuildError::InvalidConfig(format!(
                    "base_url must be an http(s) URL, got '{url}'"
                )))
            }
            _ => Ok(()),
        }
    }

    fn validate_timeouts(&self) -> Result<(), HandlerBuildError> {
        if let Some(timeout) = self.connect_timeout_ms {
            ensure_positive!(timeout, "connect_timeout_ms")?;
        }
        if let Some(timeout) = self.request_timeout_ms {
            ensure_positive!(timeout, "request_timeout_ms")?;
        }
        Ok(())
    }

    /// Validate the builder and produce the transport configuration.
    pub fn build_config(&self) -> Result<MailgunConfig, HandlerBuildError> {
        let api_key = Self::require(&self.api_key, "api_key")?;
        let domain = Self::require(&self.domain, "domain")?;
        let from = Self::require(&self.from, "from")?;
        let subject = Self::require(&self.subject, "subject")?;
        let recipients = RecipientSet::new(&self.to)
            .map_err(|err| HandlerBuildError::InvalidConfig(err.to_string()))?;
        self.validate_base_url()?;
        self.validate_timeouts()?;

        let mut config = MailgunConfig::new(
            Credentials::new(api_key, domain),
            from,
            recipients,
            subject,
        );
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(ms) = self.connect_timeout_ms {
            config.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.request_timeout_ms {
            config.request_timeout = Duration::from_millis(ms);
        }
        config.retry_mode = self.retry_mode;
        config.backoff = self.backoff.resolve()?;
        Ok(config)
    }

    /// Build only the Mailgun transport, without level or formatting.
    pub fn build_delivery(&self) -> Result<MailgunHandler, HandlerBuildError> {
        MailgunHandler::with_config(self.build_config()?)
    }
}

impl HandlerBuilderTrait for MailgunHandlerBuilder {
    type Handler = MailHandler<MailgunHandler>;

    fn build_inner(&self) -> Result<Self::Handler, HandlerBuildError> {
        let delivery = self.build_delivery()?;
        Ok(MailHandler::new(delivery)
            .with_level(self.level.unwrap_or_default())
            .with_bubble(self.bubble.unwrap_or(true))
            .with_formatter(self.formatter.build()))
    }
}

impl std::fmt::Debug for MailgunHandlerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailgunHandlerBuilder")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("domain", &self.domain)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("subject", &self.subject)
            .field("level", &self.level)
            .field("bubble", &self.bubble)
            .field("base_url", &self.base_url)
            .field("max_retries", &self.max_retries)
            .field("retry_mode", &self.retry_mode)
            .field("formatter", &self.formatter)
            .finish_non_exhaustive()
    }
}
