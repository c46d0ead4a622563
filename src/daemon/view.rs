use crate::settings::OutputSettings;
use crate::store::{DataStore, StoreSummary};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use update_coordinator::UpdateStatus;

#[derive(Debug)]
pub enum ViewCommand {
    Render { status: Box<UpdateStatus> },
    DataUpdated { failed: bool },
    ApplyOutput(OutputSettings),
}

#[derive(Serialize)]
struct StatusLine<'a> {
    source: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    age_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    is_updating: bool,
    loads: u64,
    consecutive_failures: u32,
    #[serde(with = "chrono::serde::ts_seconds")]
    rendered_at: DateTime<Utc>,
}

pub async fn run_view_loop(
    mut view_rx: mpsc::UnboundedReceiver<ViewCommand>,
    store: DataStore,
    mut output: OutputSettings,
) {
    while let Some(cmd) = view_rx.recv().await {
        match cmd {
            ViewCommand::Render { status } => {
                let summary = store.summary().await;
                let now = Utc::now();
                if output.json {
                    let line = status_line(&summary, &status, now);
                    match serde_json::to_string(&line) {
                        Ok(json) => println!("{json}"),
                        Err(e) => tracing::warn!(error = %e, "Failed to serialize status line"),
                    }
                } else {
                    println!("{}", format_status_text(&summary, &status, now));
                }
            }
            ViewCommand::DataUpdated { failed } => {
                if failed || !output.print_body {
                    continue;
                }
                if let Some(snapshot) = store.summary().await.snapshot {
                    print!("{}", snapshot.body);
                    if !snapshot.body.ends_with('\n') {
                        println!();
                    }
                }
            }
            ViewCommand::ApplyOutput(settings) => {
                tracing::debug!(?settings, "Applying output settings");
                output = settings;
            }
        }
    }
}

fn status_line<'a>(
    summary: &'a StoreSummary,
    status: &UpdateStatus,
    now: DateTime<Utc>,
) -> StatusLine<'a> {
    StatusLine {
        source: summary.snapshot.as_ref().map(|s| s.source.as_str()),
        age_secs: summary
            .last_fetch
            .map(|at| now.signed_duration_since(at).num_seconds().max(0)),
        bytes: summary.snapshot.as_ref().map(|s| s.bytes),
        error: summary.error.as_deref(),
        is_updating: status.is_updating,
        loads: summary.loads,
        consecutive_failures: summary.consecutive_failures,
        rendered_at: now,
    }
}

fn format_status_text(summary: &StoreSummary, status: &UpdateStatus, now: DateTime<Utc>) -> String {
    let mut parts = vec![format!("[{}]", now.format("%H:%M:%S"))];

    match (&summary.snapshot, summary.last_fetch) {
        (Some(snapshot), Some(fetched_at)) => {
            parts.push(format!("updated {}", format_age(fetched_at, now)));
            parts.push(format_bytes(snapshot.bytes));
        }
        _ => parts.push("no data yet".to_string()),
    }

    if let Some(error) = &summary.error {
        parts.push(format!(
            "last load failed ({}x): {}",
            summary.consecutive_failures, error
        ));
    }

    if status.is_updating {
        parts.push("loading…".to_string());
    }

    parts.join(" · ")
}

fn format_age(since: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(since);

    if duration.num_seconds() <= 0 {
        return "just now".to_string();
    }

    let total_seconds = duration.num_seconds();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {:02}m ago", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {:02}s ago", minutes, seconds)
    } else {
        format!("{}s ago", seconds)
    }
}

fn format_bytes(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::LoadedData;
    use chrono::Duration;

    fn summary_with(body: &str, fetched_at: DateTime<Utc>) -> StoreSummary {
        let mut snapshot = LoadedData::new(
            "echo".to_string(),
            body.to_string(),
            std::time::Duration::from_millis(3),
        );
        snapshot.fetched_at = fetched_at;
        StoreSummary {
            snapshot: Some(snapshot),
            error: None,
            last_fetch: Some(fetched_at),
            loads: 1,
            consecutive_failures: 0,
        }
    }

    #[test]
    fn test_format_age() {
        let now = Utc::now();
        assert_eq!(format_age(now, now), "just now");
        assert_eq!(format_age(now + Duration::seconds(5), now), "just now");
        assert_eq!(format_age(now - Duration::seconds(12), now), "12s ago");
        assert_eq!(format_age(now - Duration::seconds(184), now), "3m 04s ago");
        assert_eq!(format_age(now - Duration::minutes(125), now), "2h 05m ago");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn test_status_text_without_data() {
        let summary = StoreSummary {
            snapshot: None,
            error: Some("connection refused".to_string()),
            last_fetch: None,
            loads: 2,
            consecutive_failures: 2,
        };
        let status = UpdateStatus {
            is_updating: true,
            ..UpdateStatus::default()
        };

        let text = format_status_text(&summary, &status, Utc::now());
        assert!(text.contains("no data yet"));
        assert!(text.contains("last load failed (2x): connection refused"));
        assert!(text.ends_with("loading…"));
    }

    #[test]
    fn test_status_line_json() {
        let now = Utc::now();
        let summary = summary_with("hello", now - Duration::seconds(30));
        let line = status_line(&summary, &UpdateStatus::default(), now);

        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["source"], "echo");
        assert_eq!(json["age_secs"], 30);
        assert_eq!(json["bytes"], 5);
        assert_eq!(json["is_updating"], false);
        assert!(json.get("error").is_none());
    }
}
