//! Seams between the surrounding logging pipeline and the mail transport.

use std::sync::Arc;

use thiserror::Error;

use crate::error::DeliveryError;
use crate::log_record::LogRecord;

/// Capability to deliver one rendered batch as a single message.
///
/// Implementations are shared across logging threads, so `deliver` takes
/// `&self` and must not rely on mutable state.
pub trait MailDelivery: Send + Sync {
    /// Deliver `content` as one message.
    ///
    /// `records` are the entries `content` was rendered from. They are passed
    /// along for implementations that want them; the Mailgun transport only
    /// reports how many there were.
    fn deliver(&self, content: &str, records: &[LogRecord]) -> Result<(), DeliveryError>;
}

impl<T: MailDelivery + ?Sized> MailDelivery for Arc<T> {
    fn deliver(&self, content: &str, records: &[LogRecord]) -> Result<(), DeliveryError> {
        (**self).deliver(content, records)
    }
}

impl<T: MailDelivery + ?Sized> MailDelivery for Box<T> {
    fn deliver(&self, content: &str, records: &[LogRecord]) -> Result<(), DeliveryError> {
        (**self).deliver(content, records)
    }
}

/// Whether the surrounding pipeline should keep passing a record along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Propagation {
    /// Offer the record to the next handler.
    Continue,
    /// The record was handled here and must not bubble further.
    Stop,
}

/// Errors returned by [`MailHandler`](crate::MailHandler).
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The transport gave up on the message.
    #[error("mail delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}
