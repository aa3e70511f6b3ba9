//! Console `tracing` layer for the `connections` binary.
//!
//! Formats each event as `HH:MM:SS LEVEL message {field=value, ...}` and
//! writes it to stderr, keeping stdout free for puzzle progress and the
//! final result.

use std::io::Write;

use chrono::Local;
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::Layer;
use tracing_subscriber::registry::LookupSpan;

/// A [`tracing_subscriber::Layer`] that prints events at or above a
/// minimum level to stderr.
pub struct ConsoleLayer {
    min_level: Level,
}

impl ConsoleLayer {
    pub fn new(min_level: Level) -> Self {
        Self { min_level }
    }

    /// `DEBUG` when verbose, `INFO` otherwise.
    pub fn for_verbosity(verbose: bool) -> Self {
        Self::new(if verbose { Level::DEBUG } else { Level::INFO })
    }

    fn enabled_for(&self, level: &Level) -> bool {
        // `Level` orders TRACE as the greatest.
        *level <= self.min_level
    }
}

impl<S: Subscriber + for<'a> LookupSpan<'a>> Layer<S> for ConsoleLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let level = event.metadata().level();
        if !self.enabled_for(level) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let line = format_line(&Local::now().format("%H:%M:%S").to_string(), level, visitor);
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{line}");
    }
}

fn format_line(time: &str, level: &Level, visitor: MessageVisitor) -> String {
    let mut message = visitor.message;
    if !visitor.fields.is_empty() {
        let extras: Vec<String> = visitor
            .fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        if message.is_empty() {
            message = extras.join(" ");
        } else {
            message = format!("{message} {{{}}}", extras.join(", "));
        }
    }
    let level = level.to_string();
    format!("{time} {level:>5} {message}")
}

/// Extracts the message and extra fields from a tracing event.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields
                .push((field.name().to_string(), format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields
                .push((field.name().to_string(), value.to_string()));
        }
    }
}
