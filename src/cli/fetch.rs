use crate::settings::Settings;
use crate::sources::{build_source, LoadedData};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize)]
struct FetchOutput {
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<LoadedData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    fetched_at: DateTime<Utc>,
}

/// Runs one load through the configured source.
pub async fn run(settings: &Settings, json: bool) -> Result<()> {
    let source = build_source(&settings.source)?;
    let result = source.load().await;

    if json {
        let (data, error) = match result {
            Ok(data) => (Some(data), None),
            Err(e) => (None, Some(format!("{e:#}"))),
        };
        let output = FetchOutput {
            source: source.describe(),
            data,
            error,
            fetched_at: Utc::now(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let data = result?;
    print!("{}", data.body);
    if !data.body.ends_with('\n') {
        println!();
    }
    eprintln!(
        "{}: {} bytes in {} ms",
        data.source, data.bytes, data.duration_ms
    );
    Ok(())
}
