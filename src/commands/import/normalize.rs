use thiserror::Error;
use url::Url;

/// Canonical form of a URL used only for equality grouping during dedup;
/// never displayed or persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error)]
pub enum InvalidUrl {
    /// Scheme-less input is rejected, never defaulted to http: guessing a
    /// scheme risks merging unrelated resources.
    #[error("missing scheme")]
    MissingScheme,
    #[error("missing host")]
    MissingHost,
    #[error("unparsable: {0}")]
    Parse(#[from] url::ParseError),
}

/// Pure normalization: trim, lowercase scheme and host, strip default
/// ports, drop the fragment, key a bare `/` path as no path. Path and
/// query case survive, and the query keeps its byte order — parameter
/// order differences are treated as different resources.
pub fn normalize(raw: &str) -> Result<NormalizedKey, InvalidUrl> {
    let mut parsed = match Url::parse(raw.trim()) {
        Ok(parsed) => parsed,
        Err(url::ParseError::RelativeUrlWithoutBase) => return Err(InvalidUrl::MissingScheme),
        Err(err) => return Err(InvalidUrl::Parse(err)),
    };

    if !parsed.has_host() {
        return Err(InvalidUrl::MissingHost);
    }

    parsed.set_fragment(None);

    // The parser already lowercased scheme and host and dropped default
    // ports; only the bare-slash rule is applied by hand.
    let mut key = format!(
        "{}://{}",
        parsed.scheme(),
        parsed.host_str().unwrap_or_default()
    );
    if let Some(port) = parsed.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }
    if parsed.path() != "/" {
        key.push_str(parsed.path());
    }
    if let Some(query) = parsed.query() {
        key.push('?');
        key.push_str(query);
    }

    Ok(NormalizedKey(key))
}
