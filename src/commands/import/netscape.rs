use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;

use crate::model::{RawBookmarkEntry, RunWarning, SourceFormat};

use super::RunContext;

/// Chrome exports occasionally carry WebKit timestamps (microseconds
/// since 1601) in ADD_DATE instead of epoch seconds; anything above this
/// bound cannot be a plausible epoch-seconds value.
const WEBKIT_THRESHOLD: i64 = 20_000_000_000;
const WEBKIT_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

pub const PLACEHOLDER_TITLE: &str = "(untitled)";

/// Single-pass reader for the NETSCAPE-Bookmark-file-1 dialect shared by
/// Chrome and Firefox exports. Folder nesting is reconstructed from the
/// `<DT><H3>` / `<DL>` / `</DL>` structure; unbalanced markup degrades
/// gracefully instead of failing the file.
pub struct NetscapeParser {
    folder_re: Regex,
    anchor_re: Regex,
    href_re: Regex,
    add_date_re: Regex,
    dd_re: Regex,
}

impl NetscapeParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            folder_re: Regex::new(r"(?i)<dt[^>]*>\s*<h3[^>]*>(?P<name>.*?)</h3>")
                .context("folder pattern")?,
            anchor_re: Regex::new(r"(?i)<dt[^>]*>\s*<a(?P<attrs>[^>]*)>(?P<title>.*?)</a>")
                .context("anchor pattern")?,
            href_re: Regex::new(r#"(?i)\bhref\s*=\s*"(?P<value>[^"]*)""#)
                .context("href pattern")?,
            add_date_re: Regex::new(r#"(?i)\badd_date\s*=\s*"(?P<value>[^"]*)""#)
                .context("add_date pattern")?,
            dd_re: Regex::new(r"(?i)^<dd>\s*(?P<text>.*)$").context("dd pattern")?,
        })
    }

    pub fn parse(&self, text: &str, path: &Path, ctx: &mut RunContext) -> Vec<RawBookmarkEntry> {
        let file = path.display().to_string();
        let mut entries: Vec<RawBookmarkEntry> = Vec::new();
        // The root <DL> and any folder whose <H3> was missing push None so
        // they never contribute a folder-path segment.
        let mut stack: Vec<Option<String>> = Vec::new();
        let mut pending_folder: Option<String> = None;
        let mut last_anchor: Option<usize> = None;

        for (index, raw_line) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            let lower = line.to_ascii_lowercase();
            if lower.starts_with("</dl") {
                stack.pop();
                pending_folder = None;
                last_anchor = None;
                continue;
            }
            if lower.starts_with("<dl") {
                stack.push(pending_folder.take());
                last_anchor = None;
                continue;
            }

            if let Some(caps) = self.folder_re.captures(line) {
                pending_folder = Some(clean_text(&caps["name"]));
                last_anchor = None;
                continue;
            }

            if let Some(caps) = self.anchor_re.captures(line) {
                let attrs = &caps["attrs"];
                let folder_path = current_path(&stack);

                let href = self
                    .href_re
                    .captures(attrs)
                    .map(|attr| clean_text(&attr["value"]))
                    .filter(|value| !value.is_empty());
                let Some(url) = href else {
                    ctx.record(RunWarning::SkippedEntry {
                        file: file.clone(),
                        line: Some(line_number),
                        folder_path,
                        reason: "anchor without HREF".to_string(),
                    });
                    continue;
                };

                let added_at = match self.add_date_re.captures(attrs) {
                    None => None,
                    Some(attr) => {
                        let raw = &attr["value"];
                        match parse_add_date(raw) {
                            Some(ts) => Some(ts),
                            None => {
                                // Malformed entry, same treatment as a
                                // missing HREF.
                                ctx.record(RunWarning::SkippedEntry {
                                    file: file.clone(),
                                    line: Some(line_number),
                                    folder_path,
                                    reason: format!("unparsable ADD_DATE {raw:?}"),
                                });
                                continue;
                            }
                        }
                    }
                };

                entries.push(RawBookmarkEntry {
                    title: clean_title(&caps["title"]),
                    url,
                    folder_path,
                    added_at,
                    description: None,
                    source_format: SourceFormat::NetscapeHtml,
                });
                last_anchor = Some(entries.len() - 1);
                continue;
            }

            if let Some(caps) = self.dd_re.captures(line) {
                // <DD> attaches to the immediately preceding anchor; a
                // folder-level <DD> has no anchor to attach to.
                if let Some(index) = last_anchor.take() {
                    let description = clean_text(&caps["text"]);
                    if !description.is_empty() {
                        entries[index].description = Some(description);
                    }
                }
            }
        }

        entries
    }
}

fn current_path(stack: &[Option<String>]) -> Vec<String> {
    stack.iter().flatten().cloned().collect()
}

fn parse_add_date(raw: &str) -> Option<DateTime<Utc>> {
    let value: i64 = raw.trim().parse().ok()?;
    let secs = if value > WEBKIT_THRESHOLD {
        value / 1_000_000 - WEBKIT_EPOCH_OFFSET_SECS
    } else {
        value
    };
    DateTime::from_timestamp(secs, 0)
}

fn clean_text(raw: &str) -> String {
    html_escape::decode_html_entities(raw).trim().to_string()
}

/// A title that survived decoding as nothing but replacement characters
/// gets a placeholder instead of garbage; a genuinely empty title stays
/// empty.
fn clean_title(raw: &str) -> String {
    let title = clean_text(raw);
    if !title.is_empty()
        && title
            .chars()
            .all(|c| c == char::REPLACEMENT_CHARACTER || c.is_whitespace())
    {
        return PLACEHOLDER_TITLE.to_string();
    }
    title
}
