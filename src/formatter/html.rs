//! HTML formatter producing a complete document per mail body.
//!
//! Each record renders as a heading coloured by severity followed by a table of
//! its fields. Output is always wrapped in `<!DOCTYPE html>` so the Mailgun
//! core sends it as the `html` part.

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};

use super::Formatter;
use crate::level::Level;
use crate::log_record::LogRecord;

#[derive(Copy, Clone, Debug, Default)]
pub struct HtmlFormatter;

fn level_colour(level: Level) -> &'static str {
    match level {
        Level::Trace => "#cccccc",
        Level::Debug => "#aaaaaa",
        Level::Info => "#468847",
        Level::Warn => "#c09853",
        Level::Error => "#f0ad4e",
        Level::Critical => "#b94a48",
    }
}

/// Escape the five characters with meaning in HTML text and attributes.
pub(crate) fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn table_row(out: &mut String, label: &str, value: &str) {
    let _ = write!(
        out,
        "<tr><th style=\"text-align:left;vertical-align:top;padding-right:1em\">{}</th>\
         <td><pre>{}</pre></td></tr>",
        escape_html(label),
        escape_html(value)
    );
}

fn render_fragment(out: &mut String, record: &LogRecord) {
    let metadata = record.metadata();
    let timestamp = DateTime::<Utc>::from(metadata.timestamp)
        .to_rfc3339_opts(SecondsFormat::Millis, true);

    let _ = write!(
        out,
        "<h1 style=\"background:{};color:#ffffff;padding:5px\">{}</h1><table cellspacing=\"1\" width=\"100%\">",
        level_colour(record.level()),
        record.level()
    );
    table_row(out, "Message", record.message());
    table_row(out, "Time", &timestamp);
    table_row(out, "Logger", record.logger());
    if !metadata.module_path.is_empty() {
        table_row(out, "Module", &metadata.module_path);
    }
    if !metadata.filename.is_empty() {
        table_row(
            out,
            "Location",
            &format!("{}:{}", metadata.filename, metadata.line_number),
        );
    }
    if let Some(thread) = metadata.thread_name.as_deref() {
        table_row(out, "Thread", thread);
    }
    for (key, value) in &metadata.key_values {
        table_row(out, key, value);
    }
    out.push_str("</table>");
}

fn wrap_document(body: &str) -> String {
    format!("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"></head><body>{body}</body></html>\n")
}

impl Formatter for HtmlFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let mut body = String::new();
        render_fragment(&mut body, record);
        wrap_document(&body)
    }

    fn format_batch(&self, records: &[LogRecord]) -> String {
        let mut body = String::new();
        for record in records {
            render_fragment(&mut body, record);
        }
        wrap_document(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailgun::{BodyKind, classify_content};

    #[test]
    fn escapes_markup_in_messages() {
        let record = LogRecord::new("web", Level::Error, "<script>alert('x')</script>");
        let output = HtmlFormatter.format(&record);
        assert!(output.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
        assert!(!output.contains("<script>"));
    }

    #[test]
    fn single_and_batch_output_classify_as_html() {
        let records = vec![
            LogRecord::new("a", Level::Error, "one"),
            LogRecord::new("b", Level::Critical, "two"),
        ];
        assert_eq!(classify_content(&HtmlFormatter.format(&records[0])), BodyKind::Html);
        let batch = HtmlFormatter.format_batch(&records);
        assert_eq!(classify_content(&batch), BodyKind::Html);
        assert_eq!(batch.matches("<h1").count(), 2);
        assert_eq!(batch.matches("<html>").count(), 1);
    }

    #[test]
    fn heading_colour_follows_level() {
        let record = LogRecord::new("a", Level::Critical, "down");
        assert!(HtmlFormatter.format(&record).contains("#b94a48"));
    }
}
