use super::{DataSource, LoadedData};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Loads data from the standard output of a program.
pub struct CommandSource {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSource {
    pub fn new(program: String, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program,
            args,
            timeout,
        }
    }
}

#[async_trait]
impl DataSource for CommandSource {
    fn describe(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn load(&self) -> Result<LoadedData> {
        let started = Instant::now();
        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .args(&self.args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .with_context(|| format!("`{}` timed out after {:?}", self.describe(), self.timeout))?
        .with_context(|| format!("Failed to run `{}`", self.describe()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "`{}` exited with {}: {}",
                self.describe(),
                output.status,
                stderr.trim()
            );
        }

        let body = String::from_utf8_lossy(&output.stdout).into_owned();
        Ok(LoadedData::new(self.describe(), body, started.elapsed()))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn source(program: &str, args: &[&str]) -> CommandSource {
        CommandSource::new(
            program.to_string(),
            args.iter().map(|a| a.to_string()).collect(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        let data = source("sh", &["-c", "printf 'ok'"]).load().await.unwrap();
        assert_eq!(data.body, "ok");
        assert_eq!(data.bytes, 2);
        assert_eq!(data.source, "sh -c printf 'ok'");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_error() {
        let err = source("sh", &["-c", "echo broken >&2; exit 3"])
            .load()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[tokio::test]
    async fn test_missing_program_is_error() {
        let result = source("definitely-not-a-real-program-xyz", &[]).load().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_timeout() {
        let slow = CommandSource::new(
            "sleep".to_string(),
            vec!["5".to_string()],
            Duration::from_millis(50),
        );
        let err = slow.load().await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
