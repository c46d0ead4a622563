mod command;
mod http;

use crate::settings::{SourceKind, SourceSettings};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use update_coordinator::config::interval_from_secs;

pub use command::CommandSource;
pub use http::HttpSource;

/// Result of one successful load.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedData {
    pub source: String,
    pub body: String,
    pub bytes: usize,
    pub duration_ms: u64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub fetched_at: DateTime<Utc>,
}

impl LoadedData {
    pub fn new(source: String, body: String, elapsed: Duration) -> Self {
        Self {
            source,
            bytes: body.len(),
            body,
            duration_ms: elapsed.as_millis() as u64,
            fetched_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait DataSource: Send + Sync {
    /// Human-readable description, e.g. the command line or URL.
    fn describe(&self) -> String;
    async fn load(&self) -> Result<LoadedData>;
}

pub fn build_source(settings: &SourceSettings) -> Result<Arc<dyn DataSource>> {
    let timeout = interval_from_secs("source.timeout_secs", settings.timeout_secs)?;

    let source: Arc<dyn DataSource> = match settings.kind {
        SourceKind::Command => {
            let (program, args) = settings
                .command
                .split_first()
                .context("source.command is empty")?;
            Arc::new(CommandSource::new(program.clone(), args.to_vec(), timeout))
        }
        SourceKind::Http => {
            let url = settings
                .url
                .clone()
                .context("source.url is required for http sources")?;
            Arc::new(HttpSource::new(url, timeout)?)
        }
    };

    tracing::debug!(source = %source.describe(), "Data source configured");
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_command_source() {
        let settings = SourceSettings {
            command: vec!["echo".to_string(), "hello".to_string()],
            ..SourceSettings::default()
        };
        let source = build_source(&settings).unwrap();
        assert_eq!(source.describe(), "echo hello");
    }

    #[test]
    fn test_build_http_source_requires_url() {
        let settings = SourceSettings {
            kind: SourceKind::Http,
            ..SourceSettings::default()
        };
        assert!(build_source(&settings).is_err());
    }

    #[test]
    fn test_loaded_data_counts_bytes() {
        let data = LoadedData::new(
            "echo".to_string(),
            "héllo".to_string(),
            Duration::from_millis(12),
        );
        assert_eq!(data.bytes, 6);
        assert_eq!(data.duration_ms, 12);
    }
}
