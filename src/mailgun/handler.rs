//! Public delivery type exported by the crate.

use log::debug;

use crate::error::DeliveryError;
use crate::handler::MailDelivery;
use crate::handlers::HandlerBuildError;
use crate::log_record::LogRecord;

use super::config::MailgunConfig;
use super::dispatcher::HttpDispatcher;
use super::message::{MessageTemplate, OutboundMessage};

/// Delivers rendered log batches through the Mailgun messages API.
///
/// Each `deliver` call classifies the content, builds one message from the
/// configured sender, recipients and subject, and posts it with bounded
/// retries. The handler is immutable after construction and safe to share
/// across threads.
#[derive(Debug)]
pub struct MailgunHandler {
    template: MessageTemplate,
    dispatcher: HttpDispatcher,
}

impl MailgunHandler {
    /// Construct the handler from a configuration object.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerBuildError::Tls`] if the HTTP client cannot be set up.
    pub fn with_config(config: MailgunConfig) -> Result<Self, HandlerBuildError> {
        let dispatcher = HttpDispatcher::new(&config)?;
        Ok(Self {
            template: config.template,
            dispatcher,
        })
    }

    pub fn template(&self) -> &MessageTemplate {
        &self.template
    }

    pub fn endpoint(&self) -> &str {
        self.dispatcher.endpoint()
    }

    /// Build the message `deliver` would send for `content`.
    pub fn message_for(&self, content: &str) -> OutboundMessage {
        self.template.build(content)
    }

    /// Deliver `content` as one message.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] once the retry policy gives up.
    pub fn deliver(&self, content: &str, records: &[LogRecord]) -> Result<(), DeliveryError> {
        let message = self.message_for(content);
        debug!(
            "MailgunHandler delivering {} record(s) as {} to {} recipient(s)",
            records.len(),
            message.body().kind().field_name(),
            self.template.recipients().len()
        );
        self.dispatcher.dispatch(&message).map(|_| ())
    }
}

impl MailDelivery for MailgunHandler {
    fn deliver(&self, content: &str, records: &[LogRecord]) -> Result<(), DeliveryError> {
        MailgunHandler::deliver(self, content, records)
    }
}
