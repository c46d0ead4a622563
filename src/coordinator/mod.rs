//! The coordinator: lifecycle, scheduler queue, and delegate bridge.
//!
//! Two tasks do the work. The scheduler queue owns the interval baselines and
//! the in-flight flags and makes every scheduling decision in order. The
//! interaction surface owns the delegate and runs every callback. The queue
//! waits for the surface whenever it asks for a load or a refresh, so no two
//! decisions can both see an idle coordinator and both start a load.

mod delegate;
mod queue;
mod status;
mod surface;
mod triggers;


pub use delegate::{LoadCompletion, UpdateDelegate};
pub use status::{UpdateStatus, WakeReason};
pub use triggers::WakeNotifier;

use crate::config::{ConfigError, UpdateConfig};
use chrono::Utc;
use queue::{QueueCommand, SchedulerQueue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use surface::{InteractionSurface, SurfaceCommand};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedSender, WeakUnboundedSender};
use tokio::sync::watch;
use triggers::ActiveTriggers;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("update coordinator must be created inside a Tokio runtime")]
    NoRuntime,
}

/// Non-owning handle to a coordinator.
///
/// Handed to delegate callbacks. Every method is a no-op once the
/// coordinator has been dropped.
#[derive(Debug, Clone)]
pub struct UpdateHandle {
    pub(crate) queue: WeakUnboundedSender<QueueCommand>,
    pub(crate) surface: WeakUnboundedSender<SurfaceCommand>,
    status: watch::Receiver<UpdateStatus>,
}

impl UpdateHandle {
    pub fn status(&self) -> UpdateStatus {
        self.status.borrow().clone()
    }

    pub fn force_update(&self) {
        if let Some(queue) = self.queue.upgrade() {
            let _ = queue.send(QueueCommand::ForceUpdate);
        }
    }

    pub fn check_update(&self) {
        if let Some(queue) = self.queue.upgrade() {
            let _ = queue.send(QueueCommand::Check {
                reason: WakeReason::Manual,
                forced: false,
            });
        }
    }

    pub fn check_update_with_error(&self) {
        if let Some(surface) = self.surface.upgrade() {
            let _ = surface.send(SurfaceCommand::CheckWithError {
                reason: WakeReason::Manual,
            });
        }
    }
}

pub struct CoordinatorBuilder {
    config: UpdateConfig,
    connectivity: WakeNotifier,
    foreground: WakeNotifier,
}

impl CoordinatorBuilder {
    /// Source of "connectivity restored" wake-ups.
    pub fn connectivity(mut self, notifier: WakeNotifier) -> Self {
        self.connectivity = notifier;
        self
    }

    /// Source of "application returned to foreground" wake-ups.
    pub fn foreground(mut self, notifier: WakeNotifier) -> Self {
        self.foreground = notifier;
        self
    }

    pub fn build(
        self,
        delegate: impl UpdateDelegate,
    ) -> Result<UpdateCoordinator, CoordinatorError> {
        self.config.validate()?;
        let runtime = Handle::try_current().map_err(|_| CoordinatorError::NoRuntime)?;

        let (config_tx, config_rx) = watch::channel(self.config);
        let (status_tx, status_rx) = watch::channel(UpdateStatus::default());
        let status_tx = Arc::new(status_tx);
        let active = Arc::new(AtomicBool::new(false));

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (surface_tx, surface_rx) = mpsc::unbounded_channel();

        let handle = UpdateHandle {
            queue: queue_tx.downgrade(),
            surface: surface_tx.downgrade(),
            status: status_rx,
        };

        let scheduler = SchedulerQueue::new(
            config_rx,
            Arc::clone(&active),
            surface_tx.downgrade(),
            Arc::clone(&status_tx),
        );
        let surface = InteractionSurface::new(
            Box::new(delegate),
            handle.clone(),
            Arc::clone(&active),
            Arc::clone(&status_tx),
        );
        runtime.spawn(scheduler.run(queue_rx));
        runtime.spawn(surface.run(surface_rx));

        Ok(UpdateCoordinator {
            runtime,
            config: config_tx,
            status: status_tx,
            active,
            queue: queue_tx,
            surface: surface_tx,
            handle,
            connectivity: self.connectivity,
            foreground: self.foreground,
            triggers: None,
            first_activation_done: false,
        })
    }
}

/// Decides when to reload data and when to refresh the view.
///
/// Starts inactive. While active, a timer, a connectivity notifier and a
/// foreground notifier wake the coordinator up; each wake-up may start a
/// load or an interface refresh through the [`UpdateDelegate`]. Dropping the
/// coordinator deactivates it and stops its tasks.
pub struct UpdateCoordinator {
    runtime: Handle,
    config: watch::Sender<UpdateConfig>,
    status: Arc<watch::Sender<UpdateStatus>>,
    active: Arc<AtomicBool>,
    queue: UnboundedSender<QueueCommand>,
    surface: UnboundedSender<SurfaceCommand>,
    handle: UpdateHandle,
    connectivity: WakeNotifier,
    foreground: WakeNotifier,
    triggers: Option<ActiveTriggers>,
    first_activation_done: bool,
}

impl UpdateCoordinator {
    /// Creates a coordinator with private notifiers. Must be called inside a
    /// Tokio runtime.
    pub fn new(
        config: UpdateConfig,
        delegate: impl UpdateDelegate,
    ) -> Result<Self, CoordinatorError> {
        Self::builder(config).build(delegate)
    }

    pub fn builder(config: UpdateConfig) -> CoordinatorBuilder {
        CoordinatorBuilder {
            config,
            connectivity: WakeNotifier::new(),
            foreground: WakeNotifier::new(),
        }
    }

    /// Starts the timer, attaches both notifiers and schedules a check.
    ///
    /// The first activation runs a plain check, which always loads because
    /// the data baseline starts in the distant past. Later activations force
    /// a reload if the last load failed.
    pub fn activate(&mut self) {
        if self.triggers.is_some() {
            return;
        }

        // `active` and `last_activation` are written here rather than on the
        // interaction surface so `status()` reflects the call on return.
        self.active.store(true, Ordering::SeqCst);
        let now = Utc::now();
        self.status.send_modify(|status| {
            status.active = true;
            status.last_activation = Some(now);
        });

        self.triggers = Some(ActiveTriggers::attach(
            &self.runtime,
            self.surface.downgrade(),
            self.config.subscribe(),
            &self.connectivity,
            &self.foreground,
        ));

        if self.first_activation_done {
            tracing::info!("Coordinator reactivated");
            let _ = self.surface.send(SurfaceCommand::CheckWithError {
                reason: WakeReason::Activation,
            });
        } else {
            self.first_activation_done = true;
            tracing::info!("Coordinator activated");
            let _ = self.queue.send(QueueCommand::Check {
                reason: WakeReason::Activation,
                forced: false,
            });
        }
    }

    /// Stops the timer and detaches both notifiers. Idempotent.
    ///
    /// A load already in flight is not cancelled; its completion is still
    /// processed, but no new load starts until the next activation.
    pub fn deactivate(&mut self) {
        let Some(triggers) = self.triggers.take() else {
            return;
        };

        self.active.store(false, Ordering::SeqCst);
        drop(triggers);
        self.status.send_modify(|status| status.active = false);
        tracing::info!("Coordinator deactivated");
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Reloads now regardless of the data interval. Works while inactive.
    /// While a load is in flight this only marks a follow-up load as owed.
    pub fn force_update(&self) {
        let _ = self.queue.send(QueueCommand::ForceUpdate);
    }

    /// Runs one scheduling check if active.
    pub fn check_update(&self) {
        self.handle.check_update();
    }

    /// Like [`check_update`](Self::check_update), but forces a reload if the
    /// last load failed.
    pub fn check_update_with_error(&self) {
        self.handle.check_update_with_error();
    }

    pub fn config(&self) -> UpdateConfig {
        self.config.borrow().clone()
    }

    /// Replaces the configuration. Takes effect at the next scheduling
    /// decision; a new poll interval re-arms the running timer.
    pub fn set_config(&self, config: UpdateConfig) -> Result<(), ConfigError> {
        config.validate()?;
        tracing::debug!(?config, "Configuration updated");
        self.config.send_replace(config);
        Ok(())
    }

    pub fn status(&self) -> UpdateStatus {
        self.status.borrow().clone()
    }

    /// Receiver notified whenever the status changes.
    pub fn subscribe(&self) -> watch::Receiver<UpdateStatus> {
        self.status.subscribe()
    }

    pub fn handle(&self) -> UpdateHandle {
        self.handle.clone()
    }
}

impl Drop for UpdateCoordinator {
    fn drop(&mut self) {
        self.deactivate();
    }
}
