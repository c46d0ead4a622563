use super::surface::SurfaceCommand;
use super::UpdateHandle;
use tokio::sync::mpsc::WeakUnboundedSender;

/// Consumer of the coordinator's decisions.
///
/// Every method runs on the coordinator's interaction-surface task, one call
/// at a time. Implementations must not block for long: the scheduler queue
/// waits for `request_load` and `refresh_interface` to return.
pub trait UpdateDelegate: Send + 'static {
    /// Start loading data.
    ///
    /// `completion` must be finished exactly once, either before returning or
    /// later from any task. Until it is, every further data check only marks
    /// a follow-up load as owed.
    fn request_load(&mut self, handle: &UpdateHandle, completion: LoadCompletion);

    /// The view should be redrawn. Also called after every completed load.
    fn refresh_interface(&mut self, handle: &UpdateHandle);

    /// A load has completed, successfully or not. Check
    /// `handle.status().last_error` for the outcome.
    fn data_updated(&mut self, handle: &UpdateHandle);
}

/// Completion token for one load request.
///
/// Consumed by [`LoadCompletion::stop_loading`], so a load can only be
/// reported once.
#[derive(Debug)]
#[must_use = "a load request must be completed with `stop_loading`"]
pub struct LoadCompletion {
    surface: Option<WeakUnboundedSender<SurfaceCommand>>,
}

impl LoadCompletion {
    pub(crate) fn new(surface: WeakUnboundedSender<SurfaceCommand>) -> Self {
        Self {
            surface: Some(surface),
        }
    }

    /// Reports the outcome of the load. `Err` is stored as the coordinator's
    /// last error and makes the next wake-up force a reload.
    pub fn stop_loading(mut self, result: anyhow::Result<()>) {
        let Some(surface) = self.surface.take() else {
            return;
        };
        match surface.upgrade() {
            Some(tx) => {
                if tx.send(SurfaceCommand::LoadCompleted { result }).is_err() {
                    tracing::debug!("Coordinator stopped before load completion arrived");
                }
            }
            None => tracing::debug!("Coordinator dropped before load completion arrived"),
        }
    }
}

impl Drop for LoadCompletion {
    fn drop(&mut self) {
        if self.surface.is_some() {
            tracing::warn!(
                "Load completion dropped without stop_loading; no further loads will start"
            );
        }
    }
}
