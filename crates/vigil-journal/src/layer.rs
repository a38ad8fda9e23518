//! Tracing layer that forwards log events into a [`Journal`].
//!
//! Components log through `tracing` as usual; installing [`JournalLayer`]
//! next to the console formatter makes every event durable without the
//! emitting code knowing about files.

use std::fmt::Write as _;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::journal::Journal;

/// Events from this crate are never forwarded, so the writer cannot feed
/// its own queue.
const SELF_TARGET: &str = "vigil_journal";

/// A tracing layer that renders events as single lines and submits them to
/// a [`Journal`].
///
/// Line shape: `LEVEL target: message key=value ...`.
pub struct JournalLayer {
    journal: Journal,
}

impl JournalLayer {
    pub fn new(journal: Journal) -> Self {
        Self { journal }
    }
}

/// Collects the message and the remaining fields of an event.
#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }
}

impl<S> Layer<S> for JournalLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with(SELF_TARGET) {
            return;
        }

        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        let line = format!(
            "{} {}: {}{}",
            metadata.level(),
            metadata.target(),
            visitor.message,
            visitor.fields
        );
        // A closed journal or gate is not the caller's problem.
        let _ = self.journal.submit(&line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JournalConfig;
    use std::fs;
    use tracing_subscriber::prelude::*;

    #[tokio::test]
    async fn forwards_events_with_fields() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::start(JournalConfig {
            poll_interval_ms: 5,
            ..JournalConfig::in_dir(dir.path())
        })
        .unwrap();

        let subscriber = tracing_subscriber::registry().with(JournalLayer::new(journal.clone()));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "vigil_alarms::coordinator", alarm = "door", id = 7, "alarm thrown");
            tracing::warn!(target: "vigil_journal::journal", "not forwarded");
        });

        journal.drain().await.unwrap();
        journal.shutdown().await;

        let content = fs::read_to_string(dir.path().join("journal.log")).unwrap();
        assert!(content.contains("] - INFO vigil_alarms::coordinator: alarm thrown alarm=door id=7"));
        assert!(!content.contains("not forwarded"));
    }
}
