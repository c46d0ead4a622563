use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use update_coordinator::config::{interval_from_secs, DEFAULT_DATA_INTERVAL};
use update_coordinator::config::{DEFAULT_INTERFACE_INTERVAL, DEFAULT_POLL_INTERVAL};
use update_coordinator::{UpdateConfig, WaitingStrategy};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub schedule: ScheduleSettings,
    pub source: SourceSettings,
    pub output: OutputSettings,
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    pub data_interval_secs: f64,
    pub interface_interval_secs: f64,
    pub poll_interval_secs: f64,
    pub waiting_strategy: WaitingStrategy,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            data_interval_secs: DEFAULT_DATA_INTERVAL.as_secs_f64(),
            interface_interval_secs: DEFAULT_INTERFACE_INTERVAL.as_secs_f64(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs_f64(),
            waiting_strategy: WaitingStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Command,
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub kind: SourceKind,
    pub command: Vec<String>,
    pub url: Option<String>,
    pub timeout_secs: f64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            kind: SourceKind::Command,
            command: vec!["date".to_string()],
            url: None,
            timeout_secs: 30.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub json: bool,
    pub print_body: bool,
}

/// Where the effective settings came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    File,
    Defaults,
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("update-coordinator").join("config.toml"))
    }

    /// Resolves an explicit path or falls back to the default location.
    pub fn resolve_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path),
            None => Self::config_path().context("Could not determine config directory"),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_origin(path).map(|(settings, _)| settings)
    }

    /// Like [`load`](Self::load), but also reports whether the file existed.
    /// Does not log, so it can run before the subscriber is installed.
    pub fn load_with_origin(path: &Path) -> Result<(Self, ConfigOrigin)> {
        if !path.exists() {
            return Ok((Self::default(), ConfigOrigin::Defaults));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        settings
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok((settings, ConfigOrigin::File))
    }

    pub fn validate(&self) -> Result<()> {
        self.update_config()?;

        match self.source.kind {
            SourceKind::Command if self.source.command.is_empty() => {
                anyhow::bail!("source.command must name a program when source.kind = \"command\"");
            }
            SourceKind::Http if self.source.url.is_none() => {
                anyhow::bail!("source.url is required when source.kind = \"http\"");
            }
            _ => {}
        }

        interval_from_secs("source.timeout_secs", self.source.timeout_secs)?;
        Ok(())
    }

    pub fn update_config(&self) -> Result<UpdateConfig> {
        let schedule = &self.schedule;
        let config = UpdateConfig::new(
            interval_from_secs("schedule.data_interval_secs", schedule.data_interval_secs)?,
            interval_from_secs(
                "schedule.interface_interval_secs",
                schedule.interface_interval_secs,
            )?,
            interval_from_secs("schedule.poll_interval_secs", schedule.poll_interval_secs)?,
            schedule.waiting_strategy,
        )?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(!settings.debug);
        assert_eq!(settings.source.kind, SourceKind::Command);
        assert_eq!(settings.source.command, vec!["date".to_string()]);
        assert!(!settings.output.json);
        assert!(settings.validate().is_ok());

        let config = settings.update_config().unwrap();
        assert_eq!(config, UpdateConfig::default());
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::default();
        settings.schedule.poll_interval_secs = 0.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.schedule.data_interval_secs = -3.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.source.kind = SourceKind::Http;
        assert!(settings.validate().is_err());
        settings.source.url = Some("https://example.com/feed.json".to_string());
        assert!(settings.validate().is_ok());

        let mut settings = Settings::default();
        settings.source.command.clear();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            debug = true

            [schedule]
            data_interval_secs = 30
            interface_interval_secs = 2.5
            poll_interval_secs = 1
            waiting_strategy = "from_start_loading"

            [source]
            kind = "http"
            url = "https://example.com/status"
            timeout_secs = 10

            [output]
            json = true
        "#;

        let settings: Settings = toml::from_str(toml).unwrap();
        assert!(settings.debug);
        assert_eq!(settings.source.kind, SourceKind::Http);
        assert!(settings.output.json);
        assert!(!settings.output.print_body);

        let config = settings.update_config().unwrap();
        assert_eq!(config.data_interval, Duration::from_secs(30));
        assert_eq!(config.interface_interval, Duration::from_millis(2_500));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.waiting_strategy, WaitingStrategy::FromStartLoading);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, origin) =
            Settings::load_with_origin(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(origin, ConfigOrigin::Defaults);
    }

    #[test]
    fn test_load_reports_file_origin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "debug = true\n").unwrap();

        let (settings, origin) = Settings::load_with_origin(&path).unwrap();
        assert!(settings.debug);
        assert_eq!(origin, ConfigOrigin::File);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[schedule]\npoll_interval_secs = 0\n").unwrap();

        let err = Settings::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("poll_interval_secs"));
    }
}
