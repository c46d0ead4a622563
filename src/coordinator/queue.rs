use super::status::{UpdateStatus, WakeReason};
use super::surface::SurfaceCommand;
use crate::config::{UpdateConfig, WaitingStrategy};
use crate::interval::Baseline;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, WeakUnboundedSender};
use tokio::sync::{oneshot, watch};
use tokio::time::Instant;

#[derive(Debug)]
pub(crate) enum QueueCommand {
    /// Wake-up from a trigger or the owner. Dropped while inactive.
    Check { reason: WakeReason, forced: bool },
    /// Out-of-band update requested by the owner. Runs even while inactive.
    ForceUpdate,
    /// The surface has finished processing a load completion.
    LoadFinished,
}

/// Scheduling state owned exclusively by the queue task.
#[derive(Debug, Default)]
pub(crate) struct ScheduleState {
    pub is_updating: bool,
    pub is_waiting_next_update: bool,
    pub data_baseline: Baseline,
    pub interface_baseline: Baseline,
}

/// Outcome of one `evaluate` pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Load,
    Coalesced,
    RefreshInterface,
    Idle,
}

pub(crate) struct SchedulerQueue {
    state: ScheduleState,
    config: watch::Receiver<UpdateConfig>,
    active: Arc<AtomicBool>,
    surface: WeakUnboundedSender<SurfaceCommand>,
    status: Arc<watch::Sender<UpdateStatus>>,
}

impl SchedulerQueue {
    pub fn new(
        config: watch::Receiver<UpdateConfig>,
        active: Arc<AtomicBool>,
        surface: WeakUnboundedSender<SurfaceCommand>,
        status: Arc<watch::Sender<UpdateStatus>>,
    ) -> Self {
        Self {
            state: ScheduleState::default(),
            config,
            active,
            surface,
            status,
        }
    }

    pub async fn run(mut self, mut rx: UnboundedReceiver<QueueCommand>) {
        while let Some(cmd) = rx.recv().await {
            self.handle(cmd).await;
        }
        tracing::debug!("Scheduler queue stopped");
    }

    async fn handle(&mut self, cmd: QueueCommand) {
        match cmd {
            QueueCommand::Check { reason, forced } => {
                if !self.active.load(Ordering::SeqCst) {
                    tracing::debug!(%reason, "Wake-up dropped: coordinator inactive");
                    return;
                }
                // The load in flight is already the retry. Forcing again would
                // owe a follow-up load as soon as it finishes.
                let forced = forced && !self.state.is_updating;
                if forced {
                    self.invalidate_data();
                }
                let decision = self.evaluate().await;
                tracing::debug!(%reason, forced, ?decision, "Scheduling check");
            }
            QueueCommand::ForceUpdate => {
                self.invalidate_data();
                let decision = self.evaluate().await;
                tracing::debug!(?decision, "Forced update");
            }
            QueueCommand::LoadFinished => self.finish_load().await,
        }
    }

    fn config(&self) -> UpdateConfig {
        self.config.borrow().clone()
    }

    fn invalidate_data(&mut self) {
        let interval = self.config.borrow().data_interval;
        self.state.data_baseline.invalidate(interval, Instant::now());
    }

    /// The scheduling decision. Runs to completion before the next command,
    /// including the delegate call it dispatches.
    pub(crate) async fn evaluate(&mut self) -> Decision {
        let config = self.config();
        let now = Instant::now();

        let decision = if self
            .state
            .data_baseline
            .has_elapsed(config.data_interval, now)
        {
            self.state.data_baseline.reset(now);
            if self.state.is_updating {
                self.state.is_waiting_next_update = true;
                self.publish();
                Decision::Coalesced
            } else {
                self.state.is_waiting_next_update = false;
                self.state.is_updating = true;
                self.publish();
                tracing::info!("Data interval elapsed, requesting load");
                self.dispatch(|ack| SurfaceCommand::RequestLoad { ack }).await;
                Decision::Load
            }
        } else if self
            .state
            .interface_baseline
            .has_elapsed(config.interface_interval, now)
        {
            self.state.interface_baseline.reset(now);
            self.dispatch(|ack| SurfaceCommand::RefreshInterface { ack })
                .await;
            Decision::RefreshInterface
        } else {
            Decision::Idle
        };

        if self.state.is_updating && config.waiting_strategy == WaitingStrategy::FromStopLoading {
            self.state.data_baseline.reset(Instant::now());
        }

        decision
    }

    async fn finish_load(&mut self) {
        let config = self.config();
        let now = Instant::now();

        self.state.interface_baseline.reset(now);
        if config.waiting_strategy == WaitingStrategy::FromStopLoading {
            self.state.data_baseline.reset(now);
        }
        self.state.is_updating = false;
        let owed = std::mem::take(&mut self.state.is_waiting_next_update);
        self.publish();

        if !owed {
            return;
        }

        self.state.data_baseline.invalidate(config.data_interval, now);
        if self.active.load(Ordering::SeqCst) {
            tracing::info!(reason = %WakeReason::PendingRetry, "Starting owed follow-up load");
            self.evaluate().await;
        } else {
            tracing::debug!("Follow-up load deferred until next activation");
        }
    }

    /// Hands a command to the interaction surface and waits until it has run.
    async fn dispatch(&self, make: impl FnOnce(oneshot::Sender<()>) -> SurfaceCommand) {
        let Some(surface) = self.surface.upgrade() else {
            tracing::debug!("Interaction surface gone, skipping delegate call");
            return;
        };
        let (ack_tx, ack_rx) = oneshot::channel();
        if surface.send(make(ack_tx)).is_err() {
            tracing::debug!("Interaction surface closed, skipping delegate call");
            return;
        }
        drop(surface);
        let _ = ack_rx.await;
    }

    fn publish(&self) {
        let is_updating = self.state.is_updating;
        let is_waiting_next_update = self.state.is_waiting_next_update;
        self.status.send_if_modified(|status| {
            let changed = status.is_updating != is_updating
                || status.is_waiting_next_update != is_waiting_next_update;
            status.is_updating = is_updating;
            status.is_waiting_next_update = is_waiting_next_update;
            changed
        });
    }
}
