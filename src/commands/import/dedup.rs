use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::{DateTime, Utc};

use crate::model::{NavigationLink, RunWarning};

use super::RunContext;
use super::mapper::CategoryPath;
use super::normalize::NormalizedKey;

/// One entry after normalization and category mapping, ready to group.
/// Seeds lifted from the existing dataset carry `from_dataset` so that
/// all-seed groups (links untouched by the import) pass through the run
/// without being rewritten.
#[derive(Debug, Clone)]
pub struct AnnotatedEntry {
    pub key: NormalizedKey,
    pub category: CategoryPath,
    pub title: String,
    /// Original display form; the key is never shown.
    pub url: String,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub qrcode: Option<String>,
    pub added_at: Option<DateTime<Utc>>,
    pub from_dataset: bool,
}

#[derive(Debug, Clone)]
pub struct MergedLink {
    pub key: NormalizedKey,
    pub category: CategoryPath,
    pub link: NavigationLink,
}

/// Groups entries by normalized key and applies the merge policy. Group
/// order is first-seen input order, so identical input order reproduces
/// identical output.
pub fn merge(entries: Vec<AnnotatedEntry>, ctx: &mut RunContext) -> Vec<MergedLink> {
    let mut order: Vec<NormalizedKey> = Vec::new();
    let mut groups: HashMap<NormalizedKey, Vec<AnnotatedEntry>> = HashMap::new();

    for entry in entries {
        match groups.entry(entry.key.clone()) {
            Entry::Occupied(mut slot) => slot.get_mut().push(entry),
            Entry::Vacant(slot) => {
                order.push(entry.key.clone());
                slot.insert(vec![entry]);
            }
        }
    }

    let mut merged = Vec::new();
    for key in order {
        let Some(group) = groups.remove(&key) else {
            continue;
        };
        // A group the import never touched stays where it is.
        if group.iter().all(|entry| entry.from_dataset) {
            continue;
        }
        merged.push(merge_group(key, &group, ctx));
    }

    merged
}

fn merge_group(key: NormalizedKey, group: &[AnnotatedEntry], ctx: &mut RunContext) -> MergedLink {
    let primary = primary_index(group);
    let winner = &group[primary];

    // The winner's description first; losers append what the winner does
    // not already have, exact duplicates dropped.
    let mut parts: Vec<String> = Vec::new();
    if let Some(description) = nonempty(winner.description.as_deref()) {
        parts.push(description.to_string());
    }
    for (index, entry) in group.iter().enumerate() {
        if index == primary {
            continue;
        }
        if let Some(description) = nonempty(entry.description.as_deref())
            && !parts.iter().any(|existing| existing == description)
        {
            parts.push(description.to_string());
        }
    }
    let description = if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    };

    let mut reported: Vec<&CategoryPath> = Vec::new();
    for (index, entry) in group.iter().enumerate() {
        if index == primary || entry.category == winner.category {
            continue;
        }
        if reported.contains(&&entry.category) {
            continue;
        }
        reported.push(&entry.category);
        ctx.record(RunWarning::CategoryConflict {
            url: winner.url.clone(),
            kept: winner.category.describe(),
            discarded: entry.category.describe(),
        });
    }

    let title = if winner.title.trim().is_empty() {
        group
            .iter()
            .map(|entry| entry.title.trim())
            .find(|title| !title.is_empty())
            .unwrap_or_default()
            .to_string()
    } else {
        winner.title.clone()
    };

    let logo = winner
        .logo
        .clone()
        .or_else(|| group.iter().find_map(|entry| entry.logo.clone()));
    let qrcode = winner
        .qrcode
        .clone()
        .or_else(|| group.iter().find_map(|entry| entry.qrcode.clone()));

    MergedLink {
        key,
        category: winner.category.clone(),
        link: NavigationLink {
            title,
            logo,
            url: winner.url.clone(),
            description,
            qrcode,
        },
    }
}

/// Recency tie-break: latest added_at wins; untimed entries count as
/// older than any timestamped entry; among untimed (and on equal
/// timestamps) the one encountered last in input order wins. Input order
/// is stable file-then-entry order, so the result is deterministic.
fn primary_index(group: &[AnnotatedEntry]) -> usize {
    let mut best = 0;
    for index in 1..group.len() {
        let wins = match (group[index].added_at, group[best].added_at) {
            (Some(candidate), Some(current)) => candidate >= current,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => true,
        };
        if wins {
            best = index;
        }
    }
    best
}

fn nonempty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|trimmed| !trimmed.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::import::normalize::normalize;

    fn entry(
        url: &str,
        added_at: Option<i64>,
        taxonomy: &str,
        term: Option<&str>,
    ) -> AnnotatedEntry {
        AnnotatedEntry {
            key: normalize(url).expect("valid url"),
            category: CategoryPath {
                taxonomy: taxonomy.to_string(),
                term: term.map(str::to_string),
            },
            title: format!("title for {url}"),
            url: url.trim().to_string(),
            description: None,
            logo: None,
            qrcode: None,
            added_at: added_at.and_then(|secs| DateTime::from_timestamp(secs, 0)),
            from_dataset: false,
        }
    }

    #[test]
    fn later_timestamp_wins_and_its_original_url_form_is_kept() {
        let mut ctx = RunContext::new();
        let older = entry("https://Example.com/", Some(1_704_067_200), "Tools", Some("Dev"));
        let newer = entry("https://example.com", Some(1_717_200_000), "Tools", Some("Dev"));

        let merged = merge(vec![older, newer], &mut ctx);
        assert!(ctx.is_clean());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].link.url, "https://example.com");
        assert_eq!(merged[0].category.taxonomy, "Tools");
        assert_eq!(merged[0].category.term.as_deref(), Some("Dev"));
    }

    #[test]
    fn untimed_entries_lose_to_timestamped_and_last_untimed_wins() {
        let mut ctx = RunContext::new();
        let timed = entry("https://example.com/a", Some(100), "Tools", None);
        let untimed = entry("https://example.com/A2", None, "Tools", None);

        let mut first = untimed.clone();
        first.key = timed.key.clone();
        first.title = "untimed".to_string();
        let merged = merge(vec![first, timed.clone()], &mut ctx);
        assert_eq!(merged[0].link.title, timed.title);

        let mut a = entry("https://example.com/b", None, "Tools", None);
        a.title = "first".to_string();
        let mut b = a.clone();
        b.title = "second".to_string();
        let merged = merge(vec![a, b], &mut ctx);
        assert_eq!(merged[0].link.title, "second");
    }

    #[test]
    fn descriptions_merge_without_losing_winner_information() {
        let mut ctx = RunContext::new();
        let mut loser = entry("https://example.com", Some(100), "Tools", None);
        loser.description = Some("from the loser".to_string());
        let mut other_loser = loser.clone();
        other_loser.description = Some("kept by winner".to_string());
        let mut winner = entry("https://example.com", Some(200), "Tools", None);
        winner.description = Some("kept by winner".to_string());

        let merged = merge(vec![loser, other_loser, winner], &mut ctx);
        let description = merged[0].link.description.clone().expect("description");
        assert!(description.starts_with("kept by winner"));
        assert!(description.contains("from the loser"));
        assert_eq!(description.matches("kept by winner").count(), 1);
    }

    #[test]
    fn category_conflict_keeps_primary_mapping_and_warns() {
        let mut ctx = RunContext::new();
        let loser = entry("https://example.com", Some(100), "Reading", Some("Later"));
        let winner = entry("https://example.com", Some(200), "Tools", Some("Dev"));

        let merged = merge(vec![loser, winner], &mut ctx);
        assert_eq!(merged[0].category.taxonomy, "Tools");
        assert_eq!(ctx.warnings().len(), 1);
        let rendered = ctx.warnings()[0].to_string();
        assert!(rendered.contains("Tools / Dev"));
        assert!(rendered.contains("Reading / Later"));
    }

    #[test]
    fn all_seed_groups_are_dropped_and_seed_metadata_survives_merges() {
        let mut ctx = RunContext::new();
        let mut seed = entry("https://example.com", None, "Tools", None);
        seed.from_dataset = true;
        seed.logo = Some("example.webp".to_string());

        let untouched = merge(vec![seed.clone()], &mut ctx);
        assert!(untouched.is_empty());

        let import = entry("https://example.com", Some(100), "Tools", None);
        let merged = merge(vec![seed, import], &mut ctx);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].link.logo.as_deref(), Some("example.webp"));
    }

    #[test]
    fn group_order_follows_first_appearance() {
        let mut ctx = RunContext::new();
        let merged = merge(
            vec![
                entry("https://b.example.com", None, "Tools", None),
                entry("https://a.example.com", None, "Tools", None),
                entry("https://b.example.com", Some(5), "Tools", None),
            ],
            &mut ctx,
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].link.url, "https://b.example.com");
        assert_eq!(merged[1].link.url, "https://a.example.com");
    }
}
