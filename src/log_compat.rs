//! Compatibility bridge for the Rust `log` crate.
//!
//! [`MailLogAdapter`] implements `log::Log` on top of a [`MailHandler`], so
//! `log::error!` calls anywhere in an application end up in a mail. Records
//! emitted by this crate and its HTTP stack are never forwarded, otherwise a
//! failed delivery would log a warning that triggers another delivery.

use std::collections::BTreeMap;

use log::kv::{self, Key, Value, VisitSource};
use log::{LevelFilter, Metadata, Record, SetLoggerError};

use crate::handler::MailDelivery;
use crate::level::Level;
use crate::log_record::{LogRecord, RecordMetadata};
use crate::mail_handler::MailHandler;
use crate::rate_limited_warner::RateLimitedWarner;

/// Targets whose records are dropped before reaching the handler.
const IGNORED_TARGETS: &[&str] = &[env!("CARGO_CRATE_NAME"), "ureq", "native_tls"];

fn is_ignored_target(target: &str) -> bool {
    IGNORED_TARGETS.iter().any(|ignored| {
        target
            .strip_prefix(ignored)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    })
}

/// Most verbose `log` level a handler at `level` still accepts.
pub fn level_filter(level: Level) -> LevelFilter {
    match level {
        Level::Trace => LevelFilter::Trace,
        Level::Debug => LevelFilter::Debug,
        Level::Info => LevelFilter::Info,
        Level::Warn => LevelFilter::Warn,
        Level::Error | Level::Critical => LevelFilter::Error,
    }
}

#[derive(Default)]
struct KeyValueCollector(BTreeMap<String, String>);

impl<'kvs> VisitSource<'kvs> for KeyValueCollector {
    fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>) -> Result<(), kv::Error> {
        self.0.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn convert_record(record: &Record<'_>) -> LogRecord {
    let mut collector = KeyValueCollector::default();
    // A failing source only loses the remaining pairs.
    let _ = record.key_values().visit(&mut collector);
    let metadata = RecordMetadata {
        module_path: record.module_path().unwrap_or_default().to_owned(),
        filename: record.file().unwrap_or_default().to_owned(),
        line_number: record.line().unwrap_or(0),
        key_values: collector.0,
        ..Default::default()
    };
    LogRecord::with_metadata(
        record.target(),
        Level::from(record.level()),
        &record.args().to_string(),
        metadata,
    )
}

/// Adapter implementing the Rust `log::Log` trait.
///
/// Delivery happens synchronously on the logging thread. Failures cannot be
/// reported through `log` without recursing, so they are counted and written
/// to stderr at most once per warning interval.
pub struct MailLogAdapter<D: MailDelivery> {
    handler: MailHandler<D>,
    warner: RateLimitedWarner,
}

impl<D: MailDelivery> MailLogAdapter<D> {
    pub fn new(handler: MailHandler<D>) -> Self {
        Self::with_warner(handler, RateLimitedWarner::default())
    }

    pub fn with_warner(handler: MailHandler<D>, warner: RateLimitedWarner) -> Self {
        Self { handler, warner }
    }

    pub fn handler(&self) -> &MailHandler<D> {
        &self.handler
    }

    /// Deliveries that failed since the last report.
    pub fn pending_failures(&self) -> u64 {
        self.warner.pending()
    }

    fn report(count: u64) {
        eprintln!(
            "{}: {count} log record(s) could not be delivered by mail",
            env!("CARGO_CRATE_NAME")
        );
    }
}

impl<D: MailDelivery> log::Log for MailLogAdapter<D> {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        !is_ignored_target(metadata.target())
            && self.handler.is_handling(Level::from(metadata.level()))
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Err(err) = self.handler.handle(convert_record(record)) {
            self.warner.record_failure();
            self.warner.warn_if_due(|count| {
                Self::report(count);
                eprintln!("  last error: {err}");
            });
        }
    }

    fn flush(&self) {
        self.warner.flush(Self::report);
    }
}

/// Install `handler` as the global `log` logger.
///
/// The global max level is lowered to what the handler accepts so filtered
/// records are rejected by the `log` macros before formatting.
///
/// # Errors
///
/// Returns [`SetLoggerError`] when another global logger is already set.
pub fn install<D>(handler: MailHandler<D>) -> Result<(), SetLoggerError>
where
    D: MailDelivery + 'static,
{
    let filter = level_filter(handler.level());
    log::set_boxed_logger(Box::new(MailLogAdapter::new(handler)))?;
    log::set_max_level(filter);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AttemptError, DeliveryError};
    use log::Log;
    use rstest::rstest;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture {
        records: Mutex<Vec<LogRecord>>,
        fail: bool,
    }

    impl MailDelivery for Capture {
        fn deliver(&self, _content: &str, records: &[LogRecord]) -> Result<(), DeliveryError> {
            self.records
                .lock()
                .expect("capture lock")
                .extend_from_slice(records);
            if self.fail {
                return Err(DeliveryError::ExhaustedRetries {
                    attempts: 3,
                    last: AttemptError::Transport("refused".into()),
                });
            }
            Ok(())
        }
    }

    fn adapter(fail: bool) -> MailLogAdapter<Capture> {
        MailLogAdapter::new(MailHandler::new(Capture {
            fail,
            ..Default::default()
        }))
    }

    fn captured(adapter: &MailLogAdapter<Capture>) -> Vec<LogRecord> {
        adapter
            .handler()
            .delivery()
            .records
            .lock()
            .expect("capture lock")
            .clone()
    }

    #[rstest]
    #[case("femtologging_mailgun", true)]
    #[case("femtologging_mailgun::mailgun::dispatcher", true)]
    #[case("ureq::unit", true)]
    #[case("ureqx", false)]
    #[case("my_app::db", false)]
    fn recognises_ignored_targets(#[case] target: &str, #[case] ignored: bool) {
        assert_eq!(is_ignored_target(target), ignored);
    }

    #[rstest]
    fn forwards_errors_with_metadata() {
        let adapter = adapter(false);
        let kvs: &[(&str, &str)] = &[("request_id", "42")];
        adapter.log(
            &Record::builder()
                .level(log::Level::Error)
                .target("my_app::db")
                .module_path(Some("my_app::db"))
                .file(Some("src/db.rs"))
                .line(Some(7))
                .key_values(&kvs)
                .args(format_args!("connection lost"))
                .build(),
        );

        let records = captured(&adapter);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.logger(), "my_app::db");
        assert_eq!(record.level(), Level::Error);
        assert_eq!(record.message(), "connection lost");
        assert_eq!(record.metadata().filename, "src/db.rs");
        assert_eq!(record.metadata().line_number, 7);
        assert_eq!(
            record.metadata().key_values.get("request_id").map(String::as_str),
            Some("42")
        );
    }

    #[rstest]
    #[case(log::Level::Warn, "my_app")]
    #[case(log::Level::Error, "femtologging_mailgun::mailgun")]
    fn drops_filtered_records(#[case] level: log::Level, #[case] target: &str) {
        let adapter = adapter(false);
        adapter.log(
            &Record::builder()
                .level(level)
                .target(target)
                .args(format_args!("ignored"))
                .build(),
        );
        assert!(captured(&adapter).is_empty());
    }

    #[rstest]
    fn counts_failures_until_flushed() {
        let adapter = MailLogAdapter::with_warner(
            MailHandler::new(Capture {
                fail: true,
                ..Default::default()
            }),
            RateLimitedWarner::new(std::time::Duration::from_secs(3600)),
        );
        for _ in 0..2 {
            adapter.log(
                &Record::builder()
                    .level(log::Level::Error)
                    .target("my_app")
                    .args(format_args!("boom"))
                    .build(),
            );
        }
        assert_eq!(adapter.pending_failures(), 1);

        adapter.flush();
        assert_eq!(adapter.pending_failures(), 0);
    }

    #[rstest]
    #[case(Level::Critical, LevelFilter::Error)]
    #[case(Level::Warn, LevelFilter::Warn)]
    fn maps_threshold_to_level_filter(#[case] level: Level, #[case] expected: LevelFilter) {
        assert_eq!(level_filter(level), expected);
    }
}
