use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Export dialect a raw entry was decoded from. Chrome and Firefox both
/// write the NETSCAPE-Bookmark-file-1 dialect; the bytes do not say which
/// browser produced them, so no finer provenance is claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    NetscapeHtml,
    SafariPlist,
}

impl SourceFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NetscapeHtml => "netscape-html",
            Self::SafariPlist => "safari-plist",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bookmark as decoded from a source file, before normalization.
/// Immutable once produced by a reader.
#[derive(Debug, Clone)]
pub struct RawBookmarkEntry {
    pub title: String,
    /// URL exactly as present in the source, unvalidated.
    pub url: String,
    /// Folder names root to leaf; empty means top level.
    pub folder_path: Vec<String>,
    pub added_at: Option<DateTime<Utc>>,
    /// Netscape exports may carry a `<DD>` description line per anchor.
    pub description: Option<String>,
    pub source_format: SourceFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NavigationLink {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qrcode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NavigationSubcategory {
    pub term: String,
    #[serde(default)]
    pub links: Vec<NavigationLink>,
}

/// One top-level category of the canonical dataset. Either `links` (flat
/// category) or `subcategories` (two-level category) is semantically
/// active; the inactive one stays empty and is not serialized. The
/// on-disk field name for subcategories is `list`, which is the contract
/// the site generator consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NavigationCategory {
    pub taxonomy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<NavigationLink>,
    #[serde(default, rename = "list", skip_serializing_if = "Vec::is_empty")]
    pub subcategories: Vec<NavigationSubcategory>,
}

/// Soft problem recorded during an import run. Collected in the run
/// context, reported in the run manifest, never dropped silently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    InputFailed {
        file: String,
        reason: String,
    },
    SkippedEntry {
        file: String,
        line: Option<usize>,
        folder_path: Vec<String>,
        reason: String,
    },
    InvalidUrl {
        file: String,
        url: String,
        reason: String,
    },
    CategoryConflict {
        url: String,
        kept: String,
        discarded: String,
    },
    ShapeMismatch {
        taxonomy: String,
        url: String,
        reason: String,
    },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputFailed { file, reason } => write!(f, "{file}: {reason}"),
            Self::SkippedEntry {
                file,
                line,
                folder_path,
                reason,
            } => {
                let folder = folder_path.join("/");
                match line {
                    Some(line) => {
                        write!(f, "{file}:{line}: skipped entry under /{folder}: {reason}")
                    }
                    None => write!(f, "{file}: skipped entry under /{folder}: {reason}"),
                }
            }
            Self::InvalidUrl { file, url, reason } => {
                write!(f, "{file}: invalid URL {url:?}: {reason}")
            }
            Self::CategoryConflict {
                url,
                kept,
                discarded,
            } => {
                write!(
                    f,
                    "category conflict for {url}: kept {kept}, discarded {discarded}"
                )
            }
            Self::ShapeMismatch {
                taxonomy,
                url,
                reason,
            } => write!(f, "category {taxonomy:?}: {reason} ({url})"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportInputReport {
    pub path: String,
    pub sha256: String,
    pub format: SourceFormat,
    pub entries_decoded: usize,
    pub entries_skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ImportCounts {
    pub input_file_count: usize,
    pub failed_input_count: usize,
    pub entries_decoded: usize,
    pub entries_skipped: usize,
    pub invalid_url_count: usize,
    pub dataset_seed_count: usize,
    pub dedup_group_count: usize,
    pub links_added: usize,
    pub links_replaced: usize,
    pub links_moved: usize,
    pub category_conflict_count: usize,
    pub warning_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub dry_run: bool,
    pub data_path: String,
    pub output_path: String,
    pub default_taxonomy: String,
    pub inputs: Vec<ImportInputReport>,
    pub counts: ImportCounts,
    pub warnings: Vec<RunWarning>,
}
