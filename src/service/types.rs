use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a service vertex.
///
/// Every graph is built with an explicit initial status; it changes only as
/// visits report their outcome.
///
/// ```text
/// Stopped ──► Starting ──► Started ──► Stopping ──► Stopped
///                             │  ▲
///                             ▼  │
///                  Restarting / Upgrading
///
/// Stopped ──► Removed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Service is not running
    Stopped,
    /// Service is in the process of starting
    Starting,
    /// Service is up
    Started,
    /// Service is in the process of stopping
    Stopping,
    /// Service resources have been removed
    Removed,
    /// Service is being recreated with a new definition
    Upgrading,
    /// Service is being restarted in place
    Restarting,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Stopped => write!(f, "stopped"),
            Status::Starting => write!(f, "starting"),
            Status::Started => write!(f, "started"),
            Status::Stopping => write!(f, "stopping"),
            Status::Removed => write!(f, "removed"),
            Status::Upgrading => write!(f, "upgrading"),
            Status::Restarting => write!(f, "restarting"),
        }
    }
}
