//! One JSON object per line, with the `time` key the retention pass reads back.

use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

#[derive(Debug, Clone)]
pub struct JsonRecordFormat {
    pid: u32,
}

impl Default for JsonRecordFormat {
    fn default() -> Self {
        Self {
            pid: std::process::id(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for JsonRecordFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'writer> FormatFields<'writer> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();

        let mut visitor = JsonFieldVisitor::default();
        event.record(&mut visitor);
        let mut record = visitor.fields;

        if let Some(message) = record.remove("message") {
            record.insert("msg".to_string(), message);
        }
        if let Some(scope) = ctx.event_scope() {
            let spans: Vec<Value> = scope
                .from_root()
                .map(|span| Value::String(span.name().to_string()))
                .collect();
            record.insert("spans".to_string(), Value::Array(spans));
        }

        record.insert("level".to_string(), Value::from(level_name(meta.level())));
        record.insert(
            "time".to_string(),
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        record.insert("pid".to_string(), Value::from(self.pid));
        record.insert("target".to_string(), Value::from(meta.target()));

        let line = serde_json::to_string(&Value::Object(record)).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}

pub fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

#[derive(Default)]
struct JsonFieldVisitor {
    fields: Map<String, Value>,
}

impl JsonFieldVisitor {
    fn put(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for JsonFieldVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, Value::from(format!("{value:?}")));
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing::{info, info_span, warn};
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;
    use crate::retention::record_timestamp_ms;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture_lines(f: impl FnOnce()) -> Vec<Value> {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .event_format(JsonRecordFormat::default())
            .with_writer(capture.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = capture.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn writes_one_json_object_per_line() {
        let lines = capture_lines(|| {
            info!(tool = "search", elapsed_ms = 12u64, "tool call finished");
            warn!("second");
        });
        assert_eq!(lines.len(), 2);
        let first = &lines[0];
        assert_eq!(first["level"], "info");
        assert_eq!(first["msg"], "tool call finished");
        assert_eq!(first["tool"], "search");
        assert_eq!(first["elapsed_ms"], 12);
        assert_eq!(first["pid"], std::process::id());
        assert_eq!(lines[1]["level"], "warn");
    }

    #[test]
    fn time_field_round_trips_through_retention() {
        let lines = capture_lines(|| info!("stamped"));
        let time = lines[0]["time"].as_str().unwrap().to_string();
        assert!(time.ends_with('Z'));
        let line = serde_json::to_string(&lines[0]).unwrap();
        assert!(record_timestamp_ms(&line).is_some());
    }

    #[test]
    fn fixed_keys_win_over_event_fields() {
        let lines = capture_lines(|| info!(time = "forged", pid = 0u32, "collide"));
        assert_ne!(lines[0]["time"], "forged");
        assert_eq!(lines[0]["pid"], std::process::id());
    }

    #[test]
    fn span_names_are_recorded() {
        let lines = capture_lines(|| {
            let span = info_span!("tools_call");
            let _enter = span.enter();
            info!("inside");
        });
        assert_eq!(lines[0]["spans"], serde_json::json!(["tools_call"]));
    }
}
