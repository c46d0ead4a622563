use super::view::ViewCommand;
use crate::sources::DataSource;
use crate::store::DataStore;
use std::sync::Arc;
use tokio::sync::mpsc;
use update_coordinator::{LoadCompletion, UpdateDelegate, UpdateHandle};

/// Bridges coordinator decisions to the configured data source and the
/// terminal view.
pub struct SourceDelegate {
    source: Arc<dyn DataSource>,
    store: DataStore,
    view_tx: mpsc::UnboundedSender<ViewCommand>,
}

impl SourceDelegate {
    pub fn new(
        source: Arc<dyn DataSource>,
        store: DataStore,
        view_tx: mpsc::UnboundedSender<ViewCommand>,
    ) -> Self {
        Self {
            source,
            store,
            view_tx,
        }
    }
}

impl UpdateDelegate for SourceDelegate {
    fn request_load(&mut self, _handle: &UpdateHandle, completion: LoadCompletion) {
        let source = Arc::clone(&self.source);
        let store = self.store.clone();

        tokio::spawn(async move {
            match source.load().await {
                Ok(data) => {
                    tracing::debug!(
                        source = %data.source,
                        bytes = data.bytes,
                        duration_ms = data.duration_ms,
                        "Source loaded"
                    );
                    store.update_snapshot(data).await;
                    completion.stop_loading(Ok(()));
                }
                Err(e) => {
                    store.set_error(format!("{e:#}")).await;
                    completion.stop_loading(Err(e));
                }
            }
        });
    }

    fn refresh_interface(&mut self, handle: &UpdateHandle) {
        let _ = self.view_tx.send(ViewCommand::Render {
            status: Box::new(handle.status()),
        });
    }

    fn data_updated(&mut self, handle: &UpdateHandle) {
        let _ = self.view_tx.send(ViewCommand::DataUpdated {
            failed: handle.status().has_error(),
        });
    }
}
