/// Target position in the two-level navigation hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPath {
    pub taxonomy: String,
    pub term: Option<String>,
}

impl CategoryPath {
    pub fn describe(&self) -> String {
        match &self.term {
            Some(term) => format!("{} / {}", self.taxonomy, term),
            None => self.taxonomy.clone(),
        }
    }
}

/// Maps a root-to-leaf folder path onto taxonomy/term. First segment is
/// the taxonomy, second the term; deeper segments are folded into the
/// term since the canonical model has only two levels. Pure — the
/// deduplicator relies on the same path always mapping the same way.
pub fn map(folder_path: &[String], default_taxonomy: &str) -> CategoryPath {
    let segments: Vec<&str> = folder_path
        .iter()
        .map(|segment| segment.trim())
        .filter(|segment| !segment.is_empty())
        .collect();

    match segments.split_first() {
        None => CategoryPath {
            taxonomy: default_taxonomy.to_string(),
            term: None,
        },
        Some((taxonomy, rest)) => CategoryPath {
            taxonomy: (*taxonomy).to_string(),
            term: if rest.is_empty() {
                None
            } else {
                Some(rest.join(" / "))
            },
        },
    }
}
