use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Read-only view of the coordinator's state.
///
/// Published through a `watch` channel every time the scheduler queue or the
/// interaction surface changes one of these fields.
#[derive(Debug, Clone, Default)]
pub struct UpdateStatus {
    pub active: bool,
    /// A load has been requested and its completion has not been processed.
    pub is_updating: bool,
    /// One more load is owed once the current one completes.
    pub is_waiting_next_update: bool,
    /// Outcome of the most recent load; `Some` means it failed.
    pub last_error: Option<Arc<anyhow::Error>>,
    pub last_activation: Option<DateTime<Utc>>,
    pub last_data_update: Option<DateTime<Utc>>,
    pub last_interface_update: Option<DateTime<Utc>>,
}

impl UpdateStatus {
    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }
}

/// Why a scheduling check was requested. Carried for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    Activation,
    Timer,
    ConnectivityRestored,
    ForegroundResumed,
    Manual,
    PendingRetry,
}

impl fmt::Display for WakeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WakeReason::Activation => "activation",
            WakeReason::Timer => "timer",
            WakeReason::ConnectivityRestored => "connectivity",
            WakeReason::ForegroundResumed => "foreground",
            WakeReason::Manual => "manual",
            WakeReason::PendingRetry => "pending-retry",
        };
        f.write_str(name)
    }
}
