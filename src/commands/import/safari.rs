use std::io::Cursor;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use plist::{Dictionary, Value};

use crate::model::{RawBookmarkEntry, RunWarning, SourceFormat};

use super::RunContext;
use super::readers::FatalInputError;

/// Reads a Safari bookmark property list, binary or XML. The tree is a
/// nest of `Children` arrays: `WebBookmarkTypeList` dicts are folders,
/// `WebBookmarkTypeLeaf` dicts are bookmarks. Synthetic root folder names
/// (`BookmarksBar`, `BookmarksMenu`) are kept verbatim.
pub fn parse(
    bytes: &[u8],
    path: &Path,
    ctx: &mut RunContext,
) -> Result<Vec<RawBookmarkEntry>, FatalInputError> {
    let root = Value::from_reader(Cursor::new(bytes)).map_err(|err| FatalInputError::Corrupt {
        path: path.to_path_buf(),
        format: SourceFormat::SafariPlist,
        reason: err.to_string(),
    })?;

    let root_dict = root.as_dictionary().ok_or_else(|| FatalInputError::Corrupt {
        path: path.to_path_buf(),
        format: SourceFormat::SafariPlist,
        reason: "top-level value is not a dictionary".to_string(),
    })?;

    let file = path.display().to_string();
    let mut entries = Vec::new();
    let mut folder_path = Vec::new();
    walk_list(root_dict, &mut folder_path, &mut entries, &file, ctx);
    Ok(entries)
}

fn walk_list(
    dict: &Dictionary,
    folder_path: &mut Vec<String>,
    entries: &mut Vec<RawBookmarkEntry>,
    file: &str,
    ctx: &mut RunContext,
) {
    let Some(children) = dict.get("Children").and_then(Value::as_array) else {
        return;
    };

    for child in children {
        let Some(child) = child.as_dictionary() else {
            continue;
        };

        match child.get("WebBookmarkType").and_then(Value::as_string) {
            Some("WebBookmarkTypeList") => {
                folder_path.push(string_field(child, "Title").unwrap_or_default());
                walk_list(child, folder_path, entries, file, ctx);
                folder_path.pop();
            }
            Some("WebBookmarkTypeLeaf") => {
                let url = string_field(child, "URLString")
                    .filter(|value| !value.trim().is_empty());
                let Some(url) = url else {
                    ctx.record(RunWarning::SkippedEntry {
                        file: file.to_string(),
                        line: None,
                        folder_path: folder_path.clone(),
                        reason: "bookmark leaf without URLString".to_string(),
                    });
                    continue;
                };

                let title = child
                    .get("URIDictionary")
                    .and_then(Value::as_dictionary)
                    .and_then(|uri| string_field(uri, "title"))
                    .unwrap_or_default();

                let added_at = child
                    .get("DateAdded")
                    .and_then(Value::as_date)
                    .map(|date| DateTime::<Utc>::from(SystemTime::from(date)));

                entries.push(RawBookmarkEntry {
                    title,
                    url,
                    folder_path: folder_path.clone(),
                    added_at,
                    description: None,
                    source_format: SourceFormat::SafariPlist,
                });
            }
            // Proxies (History and friends) carry no bookmarks.
            _ => {}
        }
    }
}

fn string_field(dict: &Dictionary, key: &str) -> Option<String> {
    dict.get(key).and_then(Value::as_string).map(str::to_string)
}
