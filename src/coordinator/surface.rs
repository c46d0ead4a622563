use super::delegate::{LoadCompletion, UpdateDelegate};
use super::queue::QueueCommand;
use super::status::{UpdateStatus, WakeReason};
use super::UpdateHandle;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, WeakUnboundedSender};
use tokio::sync::{oneshot, watch};

pub(crate) enum SurfaceCommand {
    RequestLoad { ack: oneshot::Sender<()> },
    RefreshInterface { ack: oneshot::Sender<()> },
    LoadCompleted { result: anyhow::Result<()> },
    /// Forces a reload if the last load failed, otherwise a plain check.
    CheckWithError { reason: WakeReason },
}

impl std::fmt::Debug for SurfaceCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceCommand::RequestLoad { .. } => f.write_str("RequestLoad"),
            SurfaceCommand::RefreshInterface { .. } => f.write_str("RefreshInterface"),
            SurfaceCommand::LoadCompleted { result } => f
                .debug_struct("LoadCompleted")
                .field("ok", &result.is_ok())
                .finish(),
            SurfaceCommand::CheckWithError { reason } => f
                .debug_struct("CheckWithError")
                .field("reason", reason)
                .finish(),
        }
    }
}

/// The interaction surface: the single context on which delegate callbacks
/// run and the externally observable fields are written.
pub(crate) struct InteractionSurface {
    delegate: Box<dyn UpdateDelegate>,
    handle: UpdateHandle,
    queue: WeakUnboundedSender<QueueCommand>,
    own: WeakUnboundedSender<SurfaceCommand>,
    active: Arc<AtomicBool>,
    status: Arc<watch::Sender<UpdateStatus>>,
}

impl InteractionSurface {
    pub fn new(
        delegate: Box<dyn UpdateDelegate>,
        handle: UpdateHandle,
        active: Arc<AtomicBool>,
        status: Arc<watch::Sender<UpdateStatus>>,
    ) -> Self {
        Self {
            delegate,
            queue: handle.queue.clone(),
            own: handle.surface.clone(),
            handle,
            active,
            status,
        }
    }

    pub async fn run(mut self, mut rx: UnboundedReceiver<SurfaceCommand>) {
        while let Some(cmd) = rx.recv().await {
            self.handle(cmd);
        }
        tracing::debug!("Interaction surface stopped");
    }

    fn handle(&mut self, cmd: SurfaceCommand) {
        match cmd {
            SurfaceCommand::RequestLoad { ack } => {
                let completion = LoadCompletion::new(self.own.clone());
                self.delegate.request_load(&self.handle, completion);
                let _ = ack.send(());
            }
            SurfaceCommand::RefreshInterface { ack } => {
                self.refresh_interface();
                let _ = ack.send(());
            }
            SurfaceCommand::LoadCompleted { result } => self.load_completed(result),
            SurfaceCommand::CheckWithError { reason } => self.check_with_error(reason),
        }
    }

    fn load_completed(&mut self, result: anyhow::Result<()>) {
        let error = result.err().map(Arc::new);
        match &error {
            Some(e) => tracing::warn!(error = %e, "Load failed"),
            None => tracing::info!("Load completed"),
        }

        let now = Utc::now();
        self.status.send_modify(|status| {
            status.last_error = error;
            status.last_data_update = Some(now);
        });

        self.delegate.data_updated(&self.handle);
        self.refresh_interface();

        self.send_to_queue(QueueCommand::LoadFinished);
    }

    fn check_with_error(&mut self, reason: WakeReason) {
        if !self.active.load(Ordering::SeqCst) {
            tracing::debug!(%reason, "Wake-up dropped: coordinator inactive");
            return;
        }
        let forced = self.status.borrow().last_error.is_some();
        if forced {
            tracing::info!(%reason, "Previous load failed, requesting forced check");
        }
        self.send_to_queue(QueueCommand::Check { reason, forced });
    }

    fn refresh_interface(&mut self) {
        self.delegate.refresh_interface(&self.handle);
        let now = Utc::now();
        self.status
            .send_modify(|status| status.last_interface_update = Some(now));
    }

    fn send_to_queue(&self, cmd: QueueCommand) {
        match self.queue.upgrade() {
            Some(queue) => {
                let _ = queue.send(cmd);
            }
            None => tracing::debug!(?cmd, "Scheduler queue gone, dropping command"),
        }
    }
}
