use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DATA_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_INTERFACE_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How the data-interval clock behaves while a load is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitingStrategy {
    /// The clock keeps running from the moment a load starts.
    FromStartLoading,
    /// The clock is held at "now" until the load ends.
    #[default]
    FromStopLoading,
}

impl WaitingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitingStrategy::FromStartLoading => "from_start_loading",
            WaitingStrategy::FromStopLoading => "from_stop_loading",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    NonPositiveInterval { name: &'static str },
    #[error("{name} is not a valid number of seconds: {value}")]
    InvalidSeconds { name: &'static str, value: f64 },
}

/// Scheduling parameters read by every decision the coordinator makes.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateConfig {
    /// Minimum time between successive loads.
    pub data_interval: Duration,
    /// Minimum time between interface refreshes absent a data update.
    pub interface_interval: Duration,
    /// Cadence of the driving timer.
    pub poll_interval: Duration,
    pub waiting_strategy: WaitingStrategy,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            data_interval: DEFAULT_DATA_INTERVAL,
            interface_interval: DEFAULT_INTERFACE_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            waiting_strategy: WaitingStrategy::default(),
        }
    }
}

impl UpdateConfig {
    pub fn new(
        data_interval: Duration,
        interface_interval: Duration,
        poll_interval: Duration,
        waiting_strategy: WaitingStrategy,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            data_interval,
            interface_interval,
            poll_interval,
            waiting_strategy,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, interval) in [
            ("data_interval", self.data_interval),
            ("interface_interval", self.interface_interval),
            ("poll_interval", self.poll_interval),
        ] {
            if interval.is_zero() {
                return Err(ConfigError::NonPositiveInterval { name });
            }
        }
        Ok(())
    }
}

/// Converts a seconds value from a config file into a positive duration.
pub fn interval_from_secs(name: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    let interval = Duration::try_from_secs_f64(secs)
        .map_err(|_| ConfigError::InvalidSeconds { name, value: secs })?;
    if interval.is_zero() {
        return Err(ConfigError::NonPositiveInterval { name });
    }
    Ok(interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UpdateConfig::default();
        assert_eq!(config.data_interval, Duration::from_secs(60));
        assert_eq!(config.interface_interval, Duration::from_secs(10));
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.waiting_strategy, WaitingStrategy::FromStopLoading);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = UpdateConfig::new(
            Duration::from_secs(5),
            Duration::ZERO,
            Duration::from_secs(1),
            WaitingStrategy::FromStartLoading,
        )
        .unwrap_err();

        assert_eq!(
            err,
            ConfigError::NonPositiveInterval {
                name: "interface_interval"
            }
        );
    }

    #[test]
    fn test_interval_from_secs() {
        assert_eq!(
            interval_from_secs("poll_interval", 2.5).unwrap(),
            Duration::from_millis(2_500)
        );
        assert!(matches!(
            interval_from_secs("poll_interval", 0.0),
            Err(ConfigError::NonPositiveInterval { .. })
        ));
        assert!(matches!(
            interval_from_secs("poll_interval", -1.0),
            Err(ConfigError::InvalidSeconds { .. })
        ));
        assert!(matches!(
            interval_from_secs("poll_interval", f64::NAN),
            Err(ConfigError::InvalidSeconds { .. })
        ));
    }

    #[test]
    fn test_strategy_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            strategy: WaitingStrategy,
        }

        let parsed: Wrapper = toml::from_str(r#"strategy = "from_start_loading""#).unwrap();
        assert_eq!(parsed.strategy, WaitingStrategy::FromStartLoading);
        assert_eq!(WaitingStrategy::FromStopLoading.as_str(), "from_stop_loading");
    }
}
