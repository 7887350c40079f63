//! JSON formatter emitting one object per record.

use std::collections::BTreeMap;
use std::thread::ThreadId;

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use super::Formatter;
use crate::log_record::LogRecord;

#[derive(Copy, Clone, Debug, Default)]
pub struct JsonFormatter;

/// Borrowing view of a record so serialization does not clone strings.
struct JsonRecord<'a> {
    name: &'a str,
    levelname: &'static str,
    msg: &'a str,
    created: f64,
    filename: &'a str,
    lineno: u32,
    module: &'a str,
    thread_id: ThreadId,
    thread_name: Option<&'a str>,
    key_values: &'a BTreeMap<String, String>,
}

impl<'a> From<&'a LogRecord> for JsonRecord<'a> {
    fn from(record: &'a LogRecord) -> Self {
        let metadata = record.metadata();
        let created = metadata
            .timestamp
            .duration_since(std::time::UNIX_EPOCH)
            .map(|dur| dur.as_secs_f64())
            .unwrap_or_default();
        Self {
            name: record.logger(),
            levelname: record.level().as_str(),
            msg: record.message(),
            created,
            filename: &metadata.filename,
            lineno: metadata.line_number,
            module: &metadata.module_path,
            thread_id: metadata.thread_id,
            thread_name: metadata.thread_name.as_deref(),
            key_values: &metadata.key_values,
        }
    }
}

impl Serialize for JsonRecord<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = 8 + usize::from(self.thread_name.is_some()) + self.key_values.len();
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("name", self.name)?;
        map.serialize_entry("levelname", self.levelname)?;
        map.serialize_entry("msg", self.msg)?;
        map.serialize_entry("created", &self.created)?;
        map.serialize_entry("filename", self.filename)?;
        map.serialize_entry("lineno", &self.lineno)?;
        map.serialize_entry("module", self.module)?;
        map.serialize_entry("thread", &format_args!("{:?}", self.thread_id))?;
        if let Some(name) = self.thread_name {
            map.serialize_entry("threadName", name)?;
        }
        for (k, v) in self.key_values {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, record: &LogRecord) -> String {
        // Serializing strings and numbers into a map cannot fail; fall back to
        // the display form rather than dropping the record if it ever does.
        serde_json::to_string(&JsonRecord::from(record)).unwrap_or_else(|err| {
            log::warn!("JsonFormatter serialization error: {err}");
            record.to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::log_record::RecordMetadata;
    use rstest::{fixture, rstest};

    #[fixture]
    fn record() -> LogRecord {
        let mut metadata = RecordMetadata {
            module_path: "billing::invoice".into(),
            filename: "invoice.rs".into(),
            line_number: 42,
            ..RecordMetadata::default()
        };
        metadata.key_values.insert("invoice".into(), "INV-7".into());
        LogRecord::with_metadata("billing", Level::Error, "charge failed", metadata)
    }

    #[rstest]
    fn contains_expected_fields(record: LogRecord) {
        let parsed: serde_json::Value =
            serde_json::from_str(&JsonFormatter.format(&record)).expect("parse");
        assert_eq!(parsed["name"], "billing");
        assert_eq!(parsed["levelname"], "ERROR");
        assert_eq!(parsed["msg"], "charge failed");
        assert_eq!(parsed["lineno"], 42);
        assert_eq!(parsed["module"], "billing::invoice");
        assert_eq!(parsed["invoice"], "INV-7");
    }

    #[rstest]
    fn batch_emits_one_object_per_line(record: LogRecord) {
        let output = JsonFormatter.format_batch(&[record.clone(), record]);
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            serde_json::from_str::<serde_json::Value>(line).expect("each line is JSON");
        }
    }
}
