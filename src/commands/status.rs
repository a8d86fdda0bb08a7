use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::RunStatus;
use crate::model::ImportRunManifest;
use crate::util::load_dataset;

pub fn run(args: StatusArgs) -> Result<RunStatus> {
    info!(data = %args.data.display(), "status requested");

    if args.data.exists() {
        let dataset = load_dataset(&args.data)?;
        let subcategories: usize = dataset
            .iter()
            .map(|category| category.subcategories.len())
            .sum();
        let links: usize = dataset
            .iter()
            .map(|category| {
                category.links.len()
                    + category
                        .subcategories
                        .iter()
                        .map(|sub| sub.links.len())
                        .sum::<usize>()
            })
            .sum();

        info!(
            categories = dataset.len(),
            subcategories,
            links,
            "canonical dataset"
        );
    } else {
        warn!(path = %args.data.display(), "canonical dataset missing");
    }

    let manifest_dir = args
        .data
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .join("manifests");

    match latest_manifest_path(&manifest_dir)? {
        Some(path) => {
            let raw = fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let manifest: ImportRunManifest = serde_json::from_slice(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?;

            info!(
                run_id = %manifest.run_id,
                status = %manifest.status,
                started_at = %manifest.started_at,
                decoded = manifest.counts.entries_decoded,
                added = manifest.counts.links_added,
                replaced = manifest.counts.links_replaced,
                warnings = manifest.counts.warning_count,
                "latest import run"
            );
        }
        None => warn!(path = %manifest_dir.display(), "no import-run manifest found"),
    }

    Ok(RunStatus::Clean)
}

/// Run ids embed a compact UTC timestamp, so the lexically greatest
/// manifest filename is the most recent run.
fn latest_manifest_path(manifest_dir: &Path) -> Result<Option<PathBuf>> {
    if !manifest_dir.exists() {
        return Ok(None);
    }

    let mut latest: Option<PathBuf> = None;
    let entries = fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to list {}", manifest_dir.display()))?;

    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to list {}", manifest_dir.display()))?
            .path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !name.starts_with("import_run_") || !name.ends_with(".json") {
            continue;
        }
        if latest.as_ref().is_none_or(|current| &path > current) {
            latest = Some(path);
        }
    }

    Ok(latest)
}
