//! Periodic refresh coordinator.
//!
//! An [`UpdateCoordinator`] decides on a fixed cadence whether application
//! data is stale enough to reload and whether a view is stale enough to
//! refresh. It keeps at most one load in flight and coalesces any staleness
//! detected during that load into a single follow-up load.

pub mod config;
pub mod coordinator;
pub mod interval;

pub use config::{ConfigError, UpdateConfig, WaitingStrategy};
pub use coordinator::{
    CoordinatorBuilder, CoordinatorError, LoadCompletion, UpdateCoordinator, UpdateDelegate,
    UpdateHandle, UpdateStatus, WakeNotifier, WakeReason,
};
