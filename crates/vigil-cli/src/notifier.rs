//! A [`Notifier`] that records each delivery as a journal line.

use tracing::debug;
use vigil_alarms::Notifier;
use vigil_journal::{Journal, Submission};

/// Delivers alarm notifications by writing them to the journal.
///
/// Delivery is confirmed only when the line was queued. A closed journal
/// gate therefore refuses notifications, and the coordinator leaves the
/// alarm untouched.
#[derive(Clone, Debug)]
pub struct JournalNotifier {
    journal: Journal,
}

impl JournalNotifier {
    pub fn new(journal: Journal) -> Self {
        Self { journal }
    }
}

impl Notifier for JournalNotifier {
    fn deliver(&self, recipient: &str, topic: &str, code: i32, payload: i32) -> bool {
        let line = format!("notify recipient={recipient} topic={topic} code={code} payload={payload}");
        match self.journal.submit(&line) {
            Ok(Submission::Queued) => true,
            Ok(Submission::Suppressed) => {
                debug!(recipient, topic, "journal gate closed, notification refused");
                false
            }
            Err(_) => false,
        }
    }
}
