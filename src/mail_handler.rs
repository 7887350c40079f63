//! Handler turning log records into mail deliveries.
//!
//! [`MailHandler`] is the piece a logging pipeline talks to. It owns the
//! severity threshold, the bubble flag and the formatter, and hands the
//! rendered body to an injected [`MailDelivery`]. When a batch is complete is
//! the caller's decision: each `handle` call sends one message for one record
//! and each `handle_batch` call sends one message for the whole batch.

use log::debug;

use crate::formatter::{HtmlFormatter, SharedFormatter};
use crate::handler::{HandlerError, MailDelivery, Propagation};
use crate::level::Level;
use crate::log_record::LogRecord;

pub struct MailHandler<D> {
    delivery: D,
    level: Level,
    bubble: bool,
    formatter: SharedFormatter,
}

impl<D: MailDelivery> MailHandler<D> {
    /// Wrap `delivery` with the default threshold (`ERROR`), bubbling enabled,
    /// and the HTML formatter.
    pub fn new(delivery: D) -> Self {
        Self {
            delivery,
            level: Level::default(),
            bubble: true,
            formatter: SharedFormatter::new(HtmlFormatter),
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_bubble(mut self, bubble: bool) -> Self {
        self.bubble = bubble;
        self
    }

    pub fn with_formatter(mut self, formatter: SharedFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn bubble(&self) -> bool {
        self.bubble
    }

    pub fn delivery(&self) -> &D {
        &self.delivery
    }

    /// Whether records at `level` reach this handler.
    pub fn is_handling(&self, level: Level) -> bool {
        level >= self.level
    }

    /// Deliver a single record as its own message.
    ///
    /// Records below the threshold are ignored and always propagate.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Delivery`] when the transport gives up.
    pub fn handle(&self, record: LogRecord) -> Result<Propagation, HandlerError> {
        if !self.is_handling(record.level()) {
            return Ok(Propagation::Continue);
        }
        let content = self.formatter.format(&record);
        self.delivery.deliver(&content, std::slice::from_ref(&record))?;
        Ok(self.propagation())
    }

    /// Deliver every record at or above the threshold as one message.
    ///
    /// Returns `Ok(false)` without contacting the transport when nothing in
    /// the batch passes the threshold.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Delivery`] when the transport gives up.
    pub fn handle_batch(&self, records: Vec<LogRecord>) -> Result<bool, HandlerError> {
        let accepted: Vec<LogRecord> = records
            .into_iter()
            .filter(|record| self.is_handling(record.level()))
            .collect();
        if accepted.is_empty() {
            debug!("MailHandler: batch had no records at or above {}", self.level);
            return Ok(false);
        }
        let content = self.formatter.format_batch(&accepted);
        self.delivery.deliver(&content, &accepted)?;
        Ok(true)
    }

    fn propagation(&self) -> Propagation {
        if self.bubble {
            Propagation::Continue
        } else {
            Propagation::Stop
        }
    }
}

impl<D> std::fmt::Debug for MailHandler<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailHandler")
            .field("level", &self.level)
            .field("bubble", &self.bubble)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rstest::{fixture, rstest};

    use super::*;
    use crate::error::{AttemptError, DeliveryError};
    use crate::formatter::DefaultFormatter;

    #[derive(Default)]
    struct RecordingDelivery {
        sent: Mutex<Vec<(String, usize)>>,
        fail: bool,
    }

    impl MailDelivery for RecordingDelivery {
        fn deliver(&self, content: &str, records: &[LogRecord]) -> Result<(), DeliveryError> {
            self.sent
                .lock()
                .expect("sent mutex poisoned")
                .push((content.to_owned(), records.len()));
            if self.fail {
                return Err(DeliveryError::ExhaustedRetries {
                    attempts: 3,
                    last: AttemptError::Transport("unreachable".into()),
                });
            }
            Ok(())
        }
    }

    impl RecordingDelivery {
        fn sent(&self) -> Vec<(String, usize)> {
            self.sent.lock().expect("sent mutex poisoned").clone()
        }
    }

    #[fixture]
    fn handler() -> MailHandler<RecordingDelivery> {
        MailHandler::new(RecordingDelivery::default())
            .with_formatter(SharedFormatter::new(DefaultFormatter))
    }

    #[rstest]
    fn ignores_records_below_threshold(handler: MailHandler<RecordingDelivery>) {
        let outcome = handler
            .handle(LogRecord::new("app", Level::Warn, "minor"))
            .expect("handle");
        assert_eq!(outcome, Propagation::Continue);
        assert!(handler.delivery().sent().is_empty());
    }

    #[rstest]
    fn delivers_records_at_threshold(handler: MailHandler<RecordingDelivery>) {
        let outcome = handler
            .handle(LogRecord::new("app", Level::Error, "broken"))
            .expect("handle");
        assert_eq!(outcome, Propagation::Continue);
        assert_eq!(
            handler.delivery().sent(),
            vec![("app [ERROR] broken".to_owned(), 1)]
        );
    }

    #[rstest]
    fn stops_propagation_without_bubble(handler: MailHandler<RecordingDelivery>) {
        let handler = handler.with_bubble(false);
        let outcome = handler
            .handle(LogRecord::new("app", Level::Critical, "down"))
            .expect("handle");
        assert_eq!(outcome, Propagation::Stop);
    }

    #[rstest]
    fn batch_filters_and_sends_one_message(handler: MailHandler<RecordingDelivery>) {
        let delivered = handler
            .handle_batch(vec![
                LogRecord::new("app", Level::Info, "noise"),
                LogRecord::new("app", Level::Error, "first"),
                LogRecord::new("app", Level::Critical, "second"),
            ])
            .expect("batch");
        assert!(delivered);
        assert_eq!(
            handler.delivery().sent(),
            vec![("app [ERROR] first\napp [CRITICAL] second\n".to_owned(), 2)]
        );
    }

    #[rstest]
    fn fully_filtered_batch_sends_nothing(handler: MailHandler<RecordingDelivery>) {
        let delivered = handler
            .handle_batch(vec![LogRecord::new("app", Level::Debug, "noise")])
            .expect("batch");
        assert!(!delivered);
        assert!(handler.delivery().sent().is_empty());
    }

    #[rstest]
    fn surfaces_delivery_failures() {
        let handler = MailHandler::new(RecordingDelivery {
            fail: true,
            ..RecordingDelivery::default()
        })
        .with_level(Level::Info);
        let err = handler
            .handle(LogRecord::new("app", Level::Info, "lost"))
            .expect_err("delivery fails");
        let HandlerError::Delivery(inner) = err;
        assert_eq!(inner.attempts(), 3);
    }
}
