//! Redelivery policy
//!
//! Decides what happens when the watcher reports a file that was already
//! broadcast under the current root.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How already-sent files are treated when they change again
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RedeliveryPolicy {
    /// A path is broadcast at most once per root; later edits are not pushed
    #[default]
    OncePerPath,
    /// A path is broadcast again when its modification time moves forward
    NewerModification,
}

/// Outcome for a single watcher event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Never sent under this root
    Fresh,
    /// Already sent and must not be pushed again
    Skip,
    /// Already sent but changed since; push to every session again
    Redeliver,
}

impl RedeliveryPolicy {
    /// Whether the current modification time is needed to decide
    pub fn needs_stat(&self) -> bool {
        matches!(self, RedeliveryPolicy::NewerModification)
    }

    pub fn admit(
        &self,
        previously_sent: Option<DateTime<Utc>>,
        current: Option<DateTime<Utc>>,
    ) -> Admission {
        let Some(sent) = previously_sent else {
            return Admission::Fresh;
        };
        match self {
            RedeliveryPolicy::OncePerPath => Admission::Skip,
            RedeliveryPolicy::NewerModification => match current {
                Some(now) if now > sent => Admission::Redeliver,
                _ => Admission::Skip,
            },
        }
    }
}

impl fmt::Display for RedeliveryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedeliveryPolicy::OncePerPath => write!(f, "once-per-path"),
            RedeliveryPolicy::NewerModification => write!(f, "newer-modification"),
        }
    }
}

impl FromStr for RedeliveryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "once-per-path" | "once" => Ok(RedeliveryPolicy::OncePerPath),
            "newer-modification" | "newer" => Ok(RedeliveryPolicy::NewerModification),
            other => Err(format!(
                "Unknown redelivery policy '{}'. Valid: once-per-path, newer-modification",
                other
            )),
        }
    }
}
