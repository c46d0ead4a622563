use crate::settings::Settings;
use anyhow::{Context, Result};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

const DEBOUNCE: Duration = Duration::from_millis(200);

/// Reloads the settings file when it changes on disk and broadcasts every
/// version that parses and validates.
pub struct SettingsWatcher {
    _watcher: RecommendedWatcher,
    tx: broadcast::Sender<Settings>,
}

impl SettingsWatcher {
    pub fn start(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .context("Config path has no parent directory")?;
        let file_name = path
            .file_name()
            .map(|f| f.to_os_string())
            .context("Config path has no file name")?;

        let (notify_tx, mut notify_rx) = mpsc::unbounded_channel::<()>();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                let Ok(event) = res else {
                    return;
                };
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    return;
                }
                if event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == Some(file_name.as_os_str()))
                {
                    let _ = notify_tx.send(());
                }
            },
            Config::default(),
        )?;

        if parent.exists() {
            watcher
                .watch(&parent, RecursiveMode::NonRecursive)
                .with_context(|| format!("Failed to watch directory: {}", parent.display()))?;
            tracing::info!(?parent, "Watching config directory");
        } else {
            tracing::warn!(?parent, "Config directory does not exist, skipping watch");
        }

        let (tx, _) = broadcast::channel(4);
        let reload_tx = tx.clone();
        tokio::spawn(async move {
            while notify_rx.recv().await.is_some() {
                tokio::time::sleep(DEBOUNCE).await;
                while notify_rx.try_recv().is_ok() {}

                match Settings::load(&path) {
                    Ok(settings) => {
                        tracing::info!(?path, "Config file changed on disk");
                        let _ = reload_tx.send(settings);
                    }
                    Err(e) => {
                        tracing::warn!(error = %format!("{e:#}"), "Ignoring invalid config change");
                    }
                }
            }
        });

        Ok(Self {
            _watcher: watcher,
            tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Settings> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reload_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[schedule]\ndata_interval_secs = 60\n").unwrap();

        let watcher = SettingsWatcher::start(path.clone()).unwrap();
        let mut rx = watcher.subscribe();

        std::fs::write(&path, "[schedule]\ndata_interval_secs = 15\n").unwrap();

        let settings = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no reload within timeout")
            .unwrap();
        assert!((settings.schedule.data_interval_secs - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_path_without_file_name() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _guard = runtime.enter();
        assert!(SettingsWatcher::start(PathBuf::from("/")).is_err());
    }
}
