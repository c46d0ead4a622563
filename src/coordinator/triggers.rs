use super::status::WakeReason;
use super::surface::SurfaceCommand;
use crate::config::UpdateConfig;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

const NOTIFIER_CAPACITY: usize = 16;

/// Payload-less event source an application posts to, such as "network is
/// reachable again" or "app returned to the foreground".
///
/// Clones share the same channel. Posting with no observers is a no-op.
#[derive(Debug, Clone)]
pub struct WakeNotifier {
    tx: broadcast::Sender<()>,
}

impl WakeNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFIER_CAPACITY);
        Self { tx }
    }

    pub fn notify(&self) {
        let _ = self.tx.send(());
    }

    /// Number of coordinators currently attached to this notifier.
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }
}

impl Default for WakeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// An attached trigger source. Dropping it detaches the source.
#[derive(Debug)]
pub(crate) struct Subscription {
    name: &'static str,
    task: JoinHandle<()>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
        tracing::debug!(source = self.name, "Trigger source detached");
    }
}

/// The three trigger sources wired while the coordinator is active.
#[derive(Debug)]
pub(crate) struct ActiveTriggers {
    _timer: Subscription,
    _connectivity: Subscription,
    _foreground: Subscription,
}

impl ActiveTriggers {
    pub fn attach(
        runtime: &Handle,
        surface: WeakUnboundedSender<SurfaceCommand>,
        config: watch::Receiver<UpdateConfig>,
        connectivity: &WakeNotifier,
        foreground: &WakeNotifier,
    ) -> Self {
        let timer = Subscription {
            name: "timer",
            task: runtime.spawn(run_timer(surface.clone(), config)),
        };
        let connectivity = Subscription {
            name: "connectivity",
            task: runtime.spawn(forward_notifications(
                connectivity.subscribe(),
                surface.clone(),
                WakeReason::ConnectivityRestored,
            )),
        };
        let foreground = Subscription {
            name: "foreground",
            task: runtime.spawn(forward_notifications(
                foreground.subscribe(),
                surface,
                WakeReason::ForegroundResumed,
            )),
        };
        tracing::debug!("Trigger sources attached");

        Self {
            _timer: timer,
            _connectivity: connectivity,
            _foreground: foreground,
        }
    }
}

/// Returns false once the coordinator is gone.
fn wake(surface: &WeakUnboundedSender<SurfaceCommand>, reason: WakeReason) -> bool {
    surface
        .upgrade()
        .is_some_and(|tx| tx.send(SurfaceCommand::CheckWithError { reason }).is_ok())
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn run_timer(
    surface: WeakUnboundedSender<SurfaceCommand>,
    mut config: watch::Receiver<UpdateConfig>,
) {
    let mut period = config.borrow_and_update().poll_interval;
    let mut interval = ticker(period);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if !wake(&surface, WakeReason::Timer) {
                    break;
                }
            }
            changed = config.changed() => {
                if changed.is_err() {
                    break;
                }
                let poll_interval = config.borrow_and_update().poll_interval;
                if poll_interval != period {
                    tracing::debug!(
                        from_ms = period.as_millis() as u64,
                        to_ms = poll_interval.as_millis() as u64,
                        "Poll interval changed, re-arming timer"
                    );
                    period = poll_interval;
                    interval = ticker(period);
                }
            }
        }
    }
}

async fn forward_notifications(
    mut rx: broadcast::Receiver<()>,
    surface: WeakUnboundedSender<SurfaceCommand>,
    reason: WakeReason,
) {
    loop {
        match rx.recv().await {
            Ok(()) | Err(RecvError::Lagged(_)) => {
                if !wake(&surface, reason) {
                    break;
                }
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_without_observers_is_noop() {
        let notifier = WakeNotifier::new();
        assert_eq!(notifier.observer_count(), 0);
        notifier.notify();
    }

    #[test]
    fn test_clones_share_observers() {
        let notifier = WakeNotifier::new();
        let clone = notifier.clone();
        let _rx = notifier.subscribe();
        assert_eq!(clone.observer_count(), 1);
    }
}
