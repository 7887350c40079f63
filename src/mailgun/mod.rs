//! Mailgun transport for rendered log batches.
//!
//! Data flows through three stages on the caller's thread:
//!
//! 1. [`classify_content`] decides whether the body is HTML or plain text.
//! 2. [`MessageTemplate::build`] assembles an [`OutboundMessage`] from the
//!    handler's fixed sender, recipients and subject.
//! 3. [`HttpDispatcher`] posts the form-encoded message to
//!    `{base}/v3/{domain}/messages` with HTTP Basic auth (`api:<key>`).
//!
//! # Retry Semantics
//!
//! A failed attempt is retried up to `max_retries` more times (two by
//! default, so three attempts in total). Attempts are immediate unless a
//! [`BackoffPolicy`] is configured.
//!
//! - **2xx**: Success.
//! - **Network errors**: Retried.
//! - **Other statuses**: Retried under [`RetryMode::AllFailures`] (default).
//!   Under [`RetryMode::TransientOnly`] only 429 and 5xx are retried and
//!   anything else ends the delivery immediately.

mod backoff;
mod config;
mod content;
mod dispatcher;
mod handler;
mod message;
mod url_encoding;


pub use backoff::{BackoffPolicy, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_CAP};
pub use config::{
    API_USER, Credentials, DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_RETRIES,
    DEFAULT_REQUEST_TIMEOUT, MailgunConfig, RetryMode,
};
pub use content::{BodyKind, classify_content};
pub use dispatcher::{HttpDispatcher, ResponseClass};
pub use handler::MailgunHandler;
pub use message::{
    MessageBody, MessageTemplate, NoRecipients, OutboundMessage, RecipientSet, build_message,
    split_address_list,
};
