//! Mail delivery for log records through the Mailgun HTTP API.
//!
//! The crate is layered:
//!
//! - [`mailgun`] holds the transport core. [`MailgunHandler`] turns rendered
//!   content into one message and posts it with bounded retries.
//! - [`MailHandler`] is the logging-side collaborator. It filters records by
//!   level, renders them with a [`Formatter`] and hands the result to any
//!   [`MailDelivery`].
//! - [`MailgunHandlerBuilder`] and [`file_config`] assemble both from code or
//!   INI files.
//! - With the `log-compat` feature, [`log_compat::install`] routes the `log`
//!   facade into a handler.

pub mod error;
pub mod file_config;
pub mod formatter;
pub mod handler;
pub mod handlers;
pub mod level;
#[cfg(feature = "log-compat")]
pub mod log_compat;
pub mod log_record;
pub mod mail_handler;
pub mod mailgun;
pub mod rate_limited_warner;

pub use error::{AttemptError, DeliveryError};
pub use formatter::{
    DefaultFormatter, Formatter, FormatterKind, HtmlFormatter, JsonFormatter, SharedFormatter,
};
pub use handler::{HandlerError, MailDelivery, Propagation};
pub use handlers::{HandlerBuildError, HandlerBuilderTrait, MailgunHandlerBuilder};
pub use level::{Level, ParseLevelError};
#[cfg(feature = "log-compat")]
pub use log_compat::MailLogAdapter;
pub use log_record::{LogRecord, RecordMetadata};
pub use mail_handler::MailHandler;
pub use mailgun::{
    BodyKind, Credentials, MailgunConfig, MailgunHandler, OutboundMessage, RecipientSet,
    RetryMode, classify_content,
};
pub use rate_limited_warner::RateLimitedWarner;
