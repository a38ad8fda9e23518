//! Coordinator configuration.

use serde::{Deserialize, Serialize};

/// Where transition notifications are addressed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Recipient passed to [`Notifier::deliver`](crate::Notifier::deliver).
    pub recipient: String,
    /// Topic passed to [`Notifier::deliver`](crate::Notifier::deliver).
    pub topic: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            recipient: "monitor".into(),
            topic: "alarm.state".into(),
        }
    }
}
