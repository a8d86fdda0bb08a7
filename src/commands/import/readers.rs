use std::fs;
use std::path::{Path, PathBuf};

use chardetng::EncodingDetector;
use thiserror::Error;
use tracing::debug;

use crate::cli::FormatArg;
use crate::model::{RawBookmarkEntry, SourceFormat};
use crate::util::sha256_bytes;

use super::RunContext;
use super::netscape::NetscapeParser;
use super::safari;

/// Structural failure that aborts one input file's contribution. The run
/// itself only fails when no input contributed anything.
#[derive(Debug, Error)]
pub enum FatalInputError {
    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: unrecognized bookmark export format")]
    UnrecognizedFormat { path: PathBuf },
    #[error("{path}: corrupt {format} container: {reason}")]
    Corrupt {
        path: PathBuf,
        format: SourceFormat,
        reason: String,
    },
}

/// One decoded input file, entries in source order.
pub struct InputRead {
    pub path: PathBuf,
    pub sha256: String,
    pub format: SourceFormat,
    pub entries: Vec<RawBookmarkEntry>,
}

pub fn read_input(
    parser: &NetscapeParser,
    path: &Path,
    format: FormatArg,
    ctx: &mut RunContext,
) -> Result<InputRead, FatalInputError> {
    let bytes = fs::read(path).map_err(|source| FatalInputError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let format = match format {
        FormatArg::Auto => {
            detect_format(&bytes).ok_or_else(|| FatalInputError::UnrecognizedFormat {
                path: path.to_path_buf(),
            })?
        }
        FormatArg::Netscape => SourceFormat::NetscapeHtml,
        FormatArg::SafariPlist => SourceFormat::SafariPlist,
    };

    let entries = match format {
        SourceFormat::NetscapeHtml => {
            let (text, fallback_encoding) = decode_text(&bytes);
            if let Some(encoding) = fallback_encoding {
                debug!(
                    file = %path.display(),
                    encoding,
                    "input is not UTF-8, used fallback decode"
                );
            }
            parser.parse(&text, path, ctx)
        }
        SourceFormat::SafariPlist => safari::parse(&bytes, path, ctx)?,
    };

    Ok(InputRead {
        path: path.to_path_buf(),
        sha256: sha256_bytes(&bytes),
        format,
        entries,
    })
}

/// Picks the reader from the leading bytes. The Netscape doctype check
/// runs first because both dialects may open with `<!DOCTYPE`.
pub fn detect_format(bytes: &[u8]) -> Option<SourceFormat> {
    if bytes.starts_with(b"bplist00") {
        return Some(SourceFormat::SafariPlist);
    }

    let window = &bytes[..bytes.len().min(1024)];
    let head = String::from_utf8_lossy(window).to_ascii_uppercase();

    if head.contains("NETSCAPE-BOOKMARK-FILE") {
        return Some(SourceFormat::NetscapeHtml);
    }
    if head.contains("<PLIST") || head.trim_start().starts_with("<?XML") {
        return Some(SourceFormat::SafariPlist);
    }
    if head.contains("<DL") || head.contains("<DT") {
        return Some(SourceFormat::NetscapeHtml);
    }

    None
}

/// UTF-8 with a best-effort fallback for older exports. Returns the
/// fallback encoding name when one was used.
pub fn decode_text(bytes: &[u8]) -> (String, Option<&'static str>) {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return (text.to_string(), None);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (text, _, _) = encoding.decode(bytes);
    (text.into_owned(), Some(encoding.name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_netscape_by_doctype_and_markup() {
        let doctype = b"<!DOCTYPE NETSCAPE-Bookmark-file-1>\n<DL><p>\n";
        assert_eq!(detect_format(doctype), Some(SourceFormat::NetscapeHtml));

        let bare = b"<dl><p>\n<dt><a href=\"https://example.com\">x</a>\n";
        assert_eq!(detect_format(bare), Some(SourceFormat::NetscapeHtml));
    }

    #[test]
    fn detects_plist_variants() {
        assert_eq!(
            detect_format(b"bplist00\x00\x00"),
            Some(SourceFormat::SafariPlist)
        );
        assert_eq!(
            detect_format(b"<?xml version=\"1.0\"?>\n<plist version=\"1.0\">"),
            Some(SourceFormat::SafariPlist)
        );
    }

    #[test]
    fn unknown_bytes_are_not_guessed() {
        assert_eq!(detect_format(b"{\"not\": \"bookmarks\"}"), None);
    }

    #[test]
    fn non_utf8_bytes_fall_back_to_detected_encoding() {
        // windows-1252 text, enough of it for the detector to settle.
        let bytes = b"Caf\xe9 pr\xe8s de la gare, ouvert l'\xe9t\xe9 et l'automne, cr\xeapes et th\xe9";
        let (text, fallback) = decode_text(bytes);
        assert!(fallback.is_some());
        assert!(text.contains("Café près de la gare"));
    }

    #[test]
    fn utf8_input_decodes_without_fallback() {
        let (text, fallback) = decode_text("Café".as_bytes());
        assert!(fallback.is_none());
        assert_eq!(text, "Café");
    }
}
