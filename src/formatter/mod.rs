//! Formatters rendering log records into mail bodies.
//!
//! Provides the core [`Formatter`] trait, the shared trait-object wrapper used
//! by [`MailHandler`](crate::MailHandler), and three implementations:
//! [`DefaultFormatter`] (plain lines), [`HtmlFormatter`] (a complete HTML
//! document that the Mailgun core sends as `html`), and [`JsonFormatter`]
//! (one JSON object per line).

use std::{fmt, sync::Arc};

use crate::log_record::LogRecord;

mod html;
mod json;

pub use html::HtmlFormatter;
pub use json::JsonFormatter;

/// Trait for formatting log records into strings.
///
/// Implementors must be thread-safe (`Send + Sync`) so a formatter can be
/// shared by every thread logging through the same handler.
pub trait Formatter: Send + Sync {
    /// Format a single log record.
    fn format(&self, record: &LogRecord) -> String;

    /// Format a batch of records into one body.
    ///
    /// The default renders each record and terminates every entry with a
    /// newline.
    fn format_batch(&self, records: &[LogRecord]) -> String {
        let mut output = String::new();
        for record in records {
            output.push_str(&self.format(record));
            output.push('\n');
        }
        output
    }
}

/// Shared formatter trait object used by handlers.
#[derive(Clone)]
pub struct SharedFormatter {
    inner: Arc<dyn Formatter>,
}

impl SharedFormatter {
    /// Create a shared formatter from an owned formatter implementation.
    pub fn new<F>(formatter: F) -> Self
    where
        F: Formatter + 'static,
    {
        Self {
            inner: Arc::new(formatter),
        }
    }

    pub fn format(&self, record: &LogRecord) -> String {
        self.inner.format(record)
    }

    pub fn format_batch(&self, records: &[LogRecord]) -> String {
        self.inner.format_batch(records)
    }
}

impl fmt::Debug for SharedFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedFormatter(<dyn Formatter>)")
    }
}

/// Formatter selection used by the builder and INI configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatterKind {
    #[default]
    Html,
    Line,
    Json,
}

impl FormatterKind {
    /// Instantiate the formatter this kind names.
    pub fn build(self) -> SharedFormatter {
        match self {
            FormatterKind::Html => SharedFormatter::new(HtmlFormatter),
            FormatterKind::Line => SharedFormatter::new(DefaultFormatter),
            FormatterKind::Json => SharedFormatter::new(JsonFormatter),
        }
    }
}

impl std::str::FromStr for FormatterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "line" | "text" => Ok(Self::Line),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown formatter '{other}'")),
        }
    }
}

/// Plain text `logger [LEVEL] message` lines.
#[derive(Copy, Clone, Debug)]
pub struct DefaultFormatter;

impl Formatter for DefaultFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let mut output = format!(
            "{} [{}] {}",
            record.logger(),
            record.level(),
            record.message()
        );
        for (key, value) in &record.metadata().key_values {
            output.push_str(&format!(" {key}={value}"));
        }
        output
    }
}
