//! HTTP client for the two timetable endpoints.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::ApiConfig;

/// Filename the fetched batch is stored under, matching the service's own
/// store.
const STORE_FILE: &str = "timetable.json";

/// Fetch the current entry batch from the read endpoint and write it to
/// `output_dir`. Returns the number of entries and the written path.
pub async fn fetch_entries(config: &ApiConfig, output_dir: &Path) -> Result<(usize, PathBuf)> {
    let url = config.entries_url();
    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("Failed to reach {}", url))?;

    if !response.status().is_success() {
        bail!("Read endpoint returned {}", response.status());
    }

    let body = response.text().await.context("Failed to read response body")?;

    // Validate before writing so a bad response never clobbers a good file
    let value: serde_json::Value =
        serde_json::from_str(&body).context("Response is not valid JSON")?;
    let count = value
        .as_array()
        .map(|a| a.len())
        .context("Response is not a JSON array of entries")?;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let path = output_dir.join(STORE_FILE);
    fs::write(&path, body).with_context(|| format!("Failed to write {}", path.display()))?;

    info!(count, path = %path.display(), "Fetched timetable");
    Ok((count, path))
}

/// Upload a workbook file to the upload endpoint.
///
/// A rejected upload (non-success status) is an error; the service keeps
/// its previous timetable and the user decides whether to retry.
pub async fn upload_workbook(config: &ApiConfig, file: &Path) -> Result<()> {
    let bytes =
        fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("tkb.xlsx")
        .to_string();

    let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
    let form = reqwest::multipart::Form::new().part("file", part);

    let url = config.upload_url();
    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .multipart(form)
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", url))?;

    if !response.status().is_success() {
        bail!("Upload endpoint returned {}", response.status());
    }

    info!(file = %file.display(), "Workbook uploaded");
    Ok(())
}
