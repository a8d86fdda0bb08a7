use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::model::NavigationCategory;

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn sha256_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write json file: {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("failed to finalize json file: {}", path.display()))?;

    Ok(())
}

/// Loads the canonical dataset. An empty file counts as an empty dataset;
/// anything else that fails to parse is an error, never a silent reset.
pub fn load_dataset(path: &Path) -> Result<Vec<NavigationCategory>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset: {}", path.display()))?;

    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse dataset: {}", path.display()))
}

/// All-or-nothing dataset write: serialize fully, write a sibling temp
/// file, rename over the target. A crash mid-run leaves the previously
/// persisted dataset untouched.
pub fn write_dataset_atomic(path: &Path, dataset: &[NavigationCategory]) -> Result<()> {
    let yaml = serde_yaml::to_string(dataset)
        .with_context(|| format!("failed to serialize dataset: {}", path.display()))?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_directory(parent)?;
    }

    let tmp = tmp_sibling(path);
    fs::write(&tmp, yaml.as_bytes())
        .with_context(|| format!("failed to write temp dataset: {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace dataset: {}", path.display()))?;

    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("dataset");
    let mut tmp = path.to_path_buf();
    tmp.set_file_name(format!("{name}.tmp"));
    tmp
}
