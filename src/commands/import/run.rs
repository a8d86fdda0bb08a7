use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::info;

use crate::cli::ImportArgs;
use crate::commands::RunStatus;
use crate::model::{
    ImportCounts, ImportInputReport, ImportRunManifest, NavigationCategory, RunWarning,
};
use crate::util::{
    load_dataset, now_utc_string, utc_compact_string, write_dataset_atomic, write_json_pretty,
};

use super::RunContext;
use super::dedup::{self, AnnotatedEntry};
use super::mapper;
use super::netscape::NetscapeParser;
use super::normalize::normalize;
use super::readers::{self, InputRead};
use super::writer;

pub fn run(args: ImportArgs) -> Result<RunStatus> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("import-{}", utc_compact_string(started_ts));
    let output_path = args.output.clone().unwrap_or_else(|| args.data.clone());
    let mut ctx = RunContext::new();

    info!(
        run_id = %run_id,
        data = %args.data.display(),
        output = %output_path.display(),
        inputs = args.inputs.len(),
        "starting import"
    );

    let mut dataset: Vec<NavigationCategory> = if args.data.exists() {
        load_dataset(&args.data)?
    } else {
        info!(path = %args.data.display(), "canonical dataset missing, starting empty");
        Vec::new()
    };

    // Read phase: one independent pass per input file, in argument order.
    let parser = NetscapeParser::new().context("failed to build netscape parser")?;
    let mut inputs: Vec<InputRead> = Vec::new();
    for path in &args.inputs {
        match readers::read_input(&parser, path, args.format, &mut ctx) {
            Ok(read) => {
                info!(
                    file = %read.path.display(),
                    format = read.format.as_str(),
                    entries = read.entries.len(),
                    "decoded input"
                );
                inputs.push(read);
            }
            Err(err) => {
                ctx.record(RunWarning::InputFailed {
                    file: path.display().to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }

    if inputs.is_empty() {
        bail!("no usable input files: all {} inputs failed", args.inputs.len());
    }

    // Annotate phase. Dataset seeds come first: they are untimed, so any
    // timestamped import entry, and any later untimed re-import, wins the
    // tie-break while the writer still keeps the stored position.
    let mut annotated: Vec<AnnotatedEntry> = Vec::new();
    let dataset_seed_count = seed_from_dataset(&dataset, &mut annotated);

    for input in &inputs {
        let file = input.path.display().to_string();
        for raw in &input.entries {
            let key = match normalize(&raw.url) {
                Ok(key) => key,
                Err(err) => {
                    ctx.record(RunWarning::InvalidUrl {
                        file: file.clone(),
                        url: raw.url.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };
            annotated.push(AnnotatedEntry {
                key,
                category: mapper::map(&raw.folder_path, &args.default_taxonomy),
                title: raw.title.clone(),
                url: raw.url.trim().to_string(),
                description: raw.description.clone(),
                logo: None,
                qrcode: None,
                added_at: raw.added_at,
                from_dataset: false,
            });
        }
    }

    let entries_decoded: usize = inputs.iter().map(|input| input.entries.len()).sum();
    let merged = dedup::merge(annotated, &mut ctx);
    let dedup_group_count = merged.len();
    let writer_counts = writer::integrate(&mut dataset, merged, &mut ctx);

    if args.dry_run {
        info!("dry run, skipping dataset write");
    } else {
        write_dataset_atomic(&output_path, &dataset)?;
        info!(path = %output_path.display(), "canonical dataset written");
    }

    let manifest_path = args.report_path.clone().unwrap_or_else(|| {
        let file_name = format!("import_run_{}.json", utc_compact_string(started_ts));
        default_manifest_path(&output_path, &file_name)
    });

    let input_reports: Vec<ImportInputReport> = inputs
        .iter()
        .map(|input| {
            let file = input.path.display().to_string();
            ImportInputReport {
                entries_skipped: count_skipped_for(&ctx, &file),
                path: file,
                sha256: input.sha256.clone(),
                format: input.format,
                entries_decoded: input.entries.len(),
            }
        })
        .collect();

    let counts = ImportCounts {
        input_file_count: args.inputs.len(),
        failed_input_count: args.inputs.len() - inputs.len(),
        entries_decoded,
        entries_skipped: count_warnings(&ctx, |w| matches!(w, RunWarning::SkippedEntry { .. })),
        invalid_url_count: count_warnings(&ctx, |w| matches!(w, RunWarning::InvalidUrl { .. })),
        dataset_seed_count,
        dedup_group_count,
        links_added: writer_counts.links_added,
        links_replaced: writer_counts.links_replaced,
        links_moved: writer_counts.links_moved,
        category_conflict_count: count_warnings(&ctx, |w| {
            matches!(w, RunWarning::CategoryConflict { .. })
        }),
        warning_count: ctx.warnings().len(),
    };

    info!(
        decoded = counts.entries_decoded,
        groups = counts.dedup_group_count,
        added = counts.links_added,
        replaced = counts.links_replaced,
        moved = counts.links_moved,
        warnings = counts.warning_count,
        "import complete"
    );

    let clean = ctx.is_clean();
    let manifest = ImportRunManifest {
        manifest_version: 1,
        run_id,
        status: if clean {
            "completed".to_string()
        } else {
            "completed-with-warnings".to_string()
        },
        started_at,
        updated_at: now_utc_string(),
        dry_run: args.dry_run,
        data_path: args.data.display().to_string(),
        output_path: output_path.display().to_string(),
        default_taxonomy: args.default_taxonomy.clone(),
        inputs: input_reports,
        counts,
        warnings: ctx.into_warnings(),
    };
    write_json_pretty(&manifest_path, &manifest)?;

    Ok(if clean {
        RunStatus::Clean
    } else {
        RunStatus::Warnings
    })
}

pub fn default_manifest_path(output_path: &std::path::Path, file_name: &str) -> PathBuf {
    let parent = output_path.parent().filter(|p| !p.as_os_str().is_empty());
    match parent {
        Some(parent) => parent.join("manifests").join(file_name),
        None => PathBuf::from("manifests").join(file_name),
    }
}

/// Lifts the existing dataset's links into annotated entries so imports
/// dedup against prior state, not just within themselves.
fn seed_from_dataset(dataset: &[NavigationCategory], out: &mut Vec<AnnotatedEntry>) -> usize {
    let mut count = 0;

    let mut push = |link: &crate::model::NavigationLink, taxonomy: &str, term: Option<&str>| {
        // A stored URL that does not normalize is simply not seeded; the
        // validate command reports those.
        let Ok(key) = normalize(&link.url) else {
            return;
        };
        out.push(AnnotatedEntry {
            key,
            category: mapper::CategoryPath {
                taxonomy: taxonomy.to_string(),
                term: term.map(str::to_string),
            },
            title: link.title.clone(),
            url: link.url.clone(),
            description: link.description.clone(),
            logo: link.logo.clone(),
            qrcode: link.qrcode.clone(),
            added_at: None,
            from_dataset: true,
        });
        count += 1;
    };

    for category in dataset {
        for link in &category.links {
            push(link, &category.taxonomy, None);
        }
        for subcategory in &category.subcategories {
            for link in &subcategory.links {
                push(link, &category.taxonomy, Some(&subcategory.term));
            }
        }
    }

    count
}

fn count_warnings(ctx: &RunContext, predicate: impl Fn(&RunWarning) -> bool) -> usize {
    ctx.warnings().iter().filter(|w| predicate(w)).count()
}

fn count_skipped_for(ctx: &RunContext, file: &str) -> usize {
    ctx.warnings()
        .iter()
        .filter(|warning| matches!(warning, RunWarning::SkippedEntry { file: f, .. } if f == file))
        .count()
}
