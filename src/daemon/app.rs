use super::delegate::SourceDelegate;
use super::view::{run_view_loop, ViewCommand};
use crate::settings::Settings;
use crate::sources::build_source;
use crate::store::DataStore;
use crate::watcher::SettingsWatcher;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{broadcast, mpsc};
use update_coordinator::{UpdateCoordinator, WakeNotifier};

pub async fn run(config_path: PathBuf, settings: Settings) -> Result<()> {
    tracing::info!(path = ?config_path, "Starting update-coordinator daemon");

    let source = build_source(&settings.source)?;
    let store = DataStore::new();
    let (view_tx, view_rx) = mpsc::unbounded_channel::<ViewCommand>();

    let connectivity = WakeNotifier::new();
    let foreground = WakeNotifier::new();

    let delegate = SourceDelegate::new(source, store.clone(), view_tx.clone());
    let mut coordinator = UpdateCoordinator::builder(settings.update_config()?)
        .connectivity(connectivity.clone())
        .foreground(foreground.clone())
        .build(delegate)
        .context("Failed to start update coordinator")?;

    let view = tokio::spawn(run_view_loop(view_rx, store, settings.output.clone()));

    let watcher = match SettingsWatcher::start(config_path.clone()) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "Config hot reload disabled");
            None
        }
    };
    let mut settings_rx = watcher.as_ref().map(SettingsWatcher::subscribe);
    let mut current = settings;

    let mut sigusr1 = signal(SignalKind::user_defined1()).context("Failed to install SIGUSR1")?;
    let mut sigusr2 = signal(SignalKind::user_defined2()).context("Failed to install SIGUSR2")?;
    let mut sighup = signal(SignalKind::hangup()).context("Failed to install SIGHUP")?;
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM")?;

    coordinator.activate();

    loop {
        tokio::select! {
            _ = sigusr1.recv() => {
                tracing::info!("SIGUSR1: foreground resumed");
                foreground.notify();
            }
            _ = sigusr2.recv() => {
                tracing::info!("SIGUSR2: connectivity restored");
                connectivity.notify();
            }
            _ = sighup.recv() => {
                tracing::info!("SIGHUP: forcing update");
                coordinator.force_update();
            }
            _ = sigterm.recv() => {
                tracing::info!("SIGTERM received, shutting down");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
            Some(new_settings) = next_settings(&mut settings_rx) => {
                apply_settings(&coordinator, &view_tx, &current, &new_settings);
                current = new_settings;
            }
        }
    }

    coordinator.deactivate();
    drop(coordinator);
    drop(view_tx);
    view.abort();
    Ok(())
}

async fn next_settings(rx: &mut Option<broadcast::Receiver<Settings>>) -> Option<Settings> {
    let Some(receiver) = rx.as_mut() else {
        return std::future::pending().await;
    };

    loop {
        match receiver.recv().await {
            Ok(settings) => return Some(settings),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Skipped stale config reloads");
            }
            Err(broadcast::error::RecvError::Closed) => {
                *rx = None;
                return std::future::pending().await;
            }
        }
    }
}

fn apply_settings(
    coordinator: &UpdateCoordinator,
    view_tx: &mpsc::UnboundedSender<ViewCommand>,
    current: &Settings,
    new_settings: &Settings,
) {
    if new_settings.schedule != current.schedule {
        match new_settings.update_config() {
            Ok(config) => match coordinator.set_config(config) {
                Ok(()) => tracing::info!(schedule = ?new_settings.schedule, "Schedule updated"),
                Err(e) => tracing::warn!(error = %e, "Rejected schedule change"),
            },
            Err(e) => tracing::warn!(error = %format!("{e:#}"), "Rejected schedule change"),
        }
    }

    if new_settings.output != current.output {
        let _ = view_tx.send(ViewCommand::ApplyOutput(new_settings.output.clone()));
    }

    if new_settings.source != current.source {
        tracing::warn!("Source settings changed; restart the daemon to apply them");
    }
}
