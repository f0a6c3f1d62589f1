//! Tracing layer that copies events into the [`LogBuffer`].

use super::log_buffer::{LogBuffer, LogEntry, LogLevel};
use super::MESSAGES_TARGET;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// A tracing layer that captures log events into a LogBuffer.
pub struct LogBufferLayer {
    buffer: Arc<LogBuffer>,
    min_level: LogLevel,
}

impl LogBufferLayer {
    /// Capture events at `Warn` and above into `buffer`.
    pub fn new(buffer: Arc<LogBuffer>) -> Self {
        Self {
            buffer,
            min_level: LogLevel::Warn,
        }
    }

    /// Capture events at or above `level` instead.
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }
}

impl<S> Layer<S> for LogBufferLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let target = event.metadata().target();
        // Controller messages are written to the buffer directly.
        if target == MESSAGES_TARGET {
            return;
        }

        let level = match *event.metadata().level() {
            Level::TRACE => LogLevel::Trace,
            Level::DEBUG => LogLevel::Debug,
            Level::INFO => LogLevel::Info,
            Level::WARN => LogLevel::Warn,
            Level::ERROR => LogLevel::Error,
        };
        if !level.matches_filter(self.min_level) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let message = visitor.message.unwrap_or_default();

        if visitor.fields.is_empty() {
            self.buffer.log(level, target, &message);
        } else {
            let fields = serde_json::to_value(&visitor.fields).unwrap_or_default();
            self.buffer
                .push(LogEntry::with_fields(level, target, &message, fields));
        }
    }
}

/// Visitor to extract message and fields from a tracing event.
#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
    fields: BTreeMap<String, String>,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let value_str = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(value_str);
        } else {
            self.fields.insert(field.name().to_string(), value_str);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields
                .insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::log_buffer::LogBufferConfig;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_layer_captures_events_at_min_level() {
        let buffer = LogBuffer::with_config_shared(LogBufferConfig {
            max_entries: 100,
            min_level: LogLevel::Trace,
        });
        let layer = LogBufferLayer::new(buffer.clone()).with_min_level(LogLevel::Info);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("Too quiet");
            tracing::info!("Test message");
            tracing::warn!(table = "sales", "Warning with fields");
        });

        let entries = buffer.get_entries(None, 100, None);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, LogLevel::Info);
        assert!(entries[0].message.contains("Test message"));
        assert_eq!(entries[1].level, LogLevel::Warn);
        assert_eq!(
            entries[1].fields,
            Some(serde_json::json!({"table": "sales"}))
        );
    }

    #[test]
    fn test_layer_skips_messages_target() {
        let buffer = LogBuffer::new_shared();
        let subscriber =
            tracing_subscriber::registry().with(LogBufferLayer::new(buffer.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(target: MESSAGES_TARGET, "Already recorded");
        });

        assert!(buffer.is_empty());
    }
}
