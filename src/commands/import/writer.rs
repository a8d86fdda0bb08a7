use std::collections::HashMap;

use crate::model::{NavigationCategory, NavigationLink, NavigationSubcategory, RunWarning};

use super::RunContext;
use super::dedup::MergedLink;
use super::mapper::CategoryPath;
use super::normalize::{NormalizedKey, normalize};

/// Term used when a link without a subcategory lands in a category that
/// is already subdivided.
const FALLBACK_TERM: &str = "General";

#[derive(Debug, Clone, Copy, Default)]
pub struct WriterCounts {
    pub links_added: usize,
    pub links_replaced: usize,
    pub links_moved: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Location {
    category: usize,
    subcategory: Option<usize>,
    link: usize,
}

/// Integrates merged links into the dataset: find-or-create the taxonomy
/// and term bucket, then upsert by normalized key. An existing link is
/// replaced in place, keeping its position; a link whose resolved
/// category differs from where its key currently lives moves there (the
/// category-conflict warning already flagged the merge); a new link is
/// appended. Categories and links no merged link touches are left as
/// loaded.
pub fn integrate(
    dataset: &mut Vec<NavigationCategory>,
    merged: Vec<MergedLink>,
    ctx: &mut RunContext,
) -> WriterCounts {
    let mut counts = WriterCounts::default();
    let mut locations = index_links(dataset);

    for item in merged {
        let target = find_or_create_bucket(dataset, &item.category, &item.link.url, ctx);

        match locations.get(&item.key).copied() {
            Some(existing) if (existing.category, existing.subcategory) == target => {
                bucket_mut(dataset, target.0, target.1)[existing.link] = item.link;
                counts.links_replaced += 1;
            }
            Some(existing) => {
                bucket_mut(dataset, existing.category, existing.subcategory).remove(existing.link);
                for other in locations.values_mut() {
                    if other.category == existing.category
                        && other.subcategory == existing.subcategory
                        && other.link > existing.link
                    {
                        other.link -= 1;
                    }
                }

                let bucket = bucket_mut(dataset, target.0, target.1);
                bucket.push(item.link);
                locations.insert(
                    item.key,
                    Location {
                        category: target.0,
                        subcategory: target.1,
                        link: bucket.len() - 1,
                    },
                );
                counts.links_moved += 1;
            }
            None => {
                let bucket = bucket_mut(dataset, target.0, target.1);
                bucket.push(item.link);
                locations.insert(
                    item.key,
                    Location {
                        category: target.0,
                        subcategory: target.1,
                        link: bucket.len() - 1,
                    },
                );
                counts.links_added += 1;
            }
        }
    }

    counts
}

/// Maps each existing link's normalized key to its position. Links whose
/// stored URL does not normalize are simply not reachable for upsert;
/// `validate` reports those. A duplicated key keeps its first position.
fn index_links(dataset: &[NavigationCategory]) -> HashMap<NormalizedKey, Location> {
    let mut locations = HashMap::new();

    for (category_index, category) in dataset.iter().enumerate() {
        for (link_index, link) in category.links.iter().enumerate() {
            if let Ok(key) = normalize(&link.url) {
                locations.entry(key).or_insert(Location {
                    category: category_index,
                    subcategory: None,
                    link: link_index,
                });
            }
        }
        for (sub_index, subcategory) in category.subcategories.iter().enumerate() {
            for (link_index, link) in subcategory.links.iter().enumerate() {
                if let Ok(key) = normalize(&link.url) {
                    locations.entry(key).or_insert(Location {
                        category: category_index,
                        subcategory: Some(sub_index),
                        link: link_index,
                    });
                }
            }
        }
    }

    locations
}

fn find_or_create_bucket(
    dataset: &mut Vec<NavigationCategory>,
    path: &CategoryPath,
    url: &str,
    ctx: &mut RunContext,
) -> (usize, Option<usize>) {
    let category_index = match dataset
        .iter()
        .position(|category| category.taxonomy == path.taxonomy)
    {
        Some(index) => index,
        None => {
            dataset.push(NavigationCategory {
                taxonomy: path.taxonomy.clone(),
                ..Default::default()
            });
            dataset.len() - 1
        }
    };

    let category = &mut dataset[category_index];
    match &path.term {
        Some(term) => {
            if category.subcategories.is_empty() && !category.links.is_empty() {
                // Flat category: creating a subcategory would leave both
                // shapes active, so the term is dropped instead.
                ctx.record(RunWarning::ShapeMismatch {
                    taxonomy: path.taxonomy.clone(),
                    url: url.to_string(),
                    reason: format!("category is flat, subcategory {term:?} ignored"),
                });
                (category_index, None)
            } else {
                (
                    category_index,
                    Some(find_or_create_term(category, term)),
                )
            }
        }
        None => {
            if category.links.is_empty() && !category.subcategories.is_empty() {
                ctx.record(RunWarning::ShapeMismatch {
                    taxonomy: path.taxonomy.clone(),
                    url: url.to_string(),
                    reason: format!(
                        "category is subdivided, link routed to term {FALLBACK_TERM:?}"
                    ),
                });
                (
                    category_index,
                    Some(find_or_create_term(category, FALLBACK_TERM)),
                )
            } else {
                (category_index, None)
            }
        }
    }
}

fn find_or_create_term(category: &mut NavigationCategory, term: &str) -> usize {
    match category
        .subcategories
        .iter()
        .position(|subcategory| subcategory.term == term)
    {
        Some(index) => index,
        None => {
            category.subcategories.push(NavigationSubcategory {
                term: term.to_string(),
                links: Vec::new(),
            });
            category.subcategories.len() - 1
        }
    }
}

fn bucket_mut(
    dataset: &mut [NavigationCategory],
    category: usize,
    subcategory: Option<usize>,
) -> &mut Vec<NavigationLink> {
    match subcategory {
        Some(index) => &mut dataset[category].subcategories[index].links,
        None => &mut dataset[category].links,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(title: &str, url: &str) -> NavigationLink {
        NavigationLink {
            title: title.to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    fn merged(url: &str, title: &str, taxonomy: &str, term: Option<&str>) -> MergedLink {
        MergedLink {
            key: normalize(url).expect("valid url"),
            category: CategoryPath {
                taxonomy: taxonomy.to_string(),
                term: term.map(str::to_string),
            },
            link: link(title, url),
        }
    }

    fn flat_category(taxonomy: &str, links: Vec<NavigationLink>) -> NavigationCategory {
        NavigationCategory {
            taxonomy: taxonomy.to_string(),
            links,
            ..Default::default()
        }
    }

    #[test]
    fn appends_new_links_and_creates_missing_buckets() {
        let mut dataset = Vec::new();
        let mut ctx = RunContext::new();

        let counts = integrate(
            &mut dataset,
            vec![merged("https://example.com", "Example", "Tools", Some("Dev"))],
            &mut ctx,
        );

        assert_eq!(counts.links_added, 1);
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset[0].taxonomy, "Tools");
        assert_eq!(dataset[0].subcategories[0].term, "Dev");
        assert_eq!(dataset[0].subcategories[0].links[0].title, "Example");
    }

    #[test]
    fn replaces_in_place_preserving_position_and_metadata_unrelated_links() {
        let mut dataset = vec![flat_category(
            "Tools",
            vec![
                link("First", "https://first.example.com"),
                link("Old title", "https://example.com/"),
                link("Third", "https://third.example.com"),
            ],
        )];
        let mut ctx = RunContext::new();

        // Same key, different display form.
        let counts = integrate(
            &mut dataset,
            vec![merged("https://example.com", "New title", "Tools", None)],
            &mut ctx,
        );

        assert_eq!(counts.links_replaced, 1);
        assert_eq!(counts.links_added, 0);
        assert_eq!(dataset[0].links.len(), 3);
        assert_eq!(dataset[0].links[1].title, "New title");
        assert_eq!(dataset[0].links[0].title, "First");
        assert_eq!(dataset[0].links[2].title, "Third");
    }

    #[test]
    fn moves_a_link_whose_resolved_category_changed() {
        let mut dataset = vec![flat_category(
            "Old",
            vec![
                link("Moved", "https://example.com"),
                link("Stays", "https://stays.example.com"),
            ],
        )];
        let mut ctx = RunContext::new();

        let counts = integrate(
            &mut dataset,
            vec![
                merged("https://example.com", "Moved", "New", None),
                merged("https://stays.example.com", "Stays updated", "Old", None),
            ],
            &mut ctx,
        );

        assert_eq!(counts.links_moved, 1);
        assert_eq!(counts.links_replaced, 1);
        assert_eq!(dataset[0].links.len(), 1);
        assert_eq!(dataset[0].links[0].title, "Stays updated");
        assert_eq!(dataset[1].taxonomy, "New");
        assert_eq!(dataset[1].links[0].title, "Moved");
    }

    #[test]
    fn untouched_categories_are_left_as_loaded() {
        let untouched = NavigationCategory {
            taxonomy: "Untouched".to_string(),
            icon: Some("far fa-star".to_string()),
            subcategories: vec![NavigationSubcategory {
                term: "Keep".to_string(),
                links: vec![link("Kept", "https://kept.example.com")],
            }],
            ..Default::default()
        };
        let mut dataset = vec![untouched.clone()];
        let mut ctx = RunContext::new();

        integrate(
            &mut dataset,
            vec![merged("https://example.com", "New", "Tools", None)],
            &mut ctx,
        );

        assert_eq!(dataset[0], untouched);
    }

    #[test]
    fn shape_mismatches_route_into_the_active_shape_with_a_warning() {
        let mut dataset = vec![
            flat_category("Flat", vec![link("Existing", "https://flat.example.com")]),
            NavigationCategory {
                taxonomy: "Nested".to_string(),
                subcategories: vec![NavigationSubcategory {
                    term: "Dev".to_string(),
                    links: vec![link("Existing", "https://nested.example.com")],
                }],
                ..Default::default()
            },
        ];
        let mut ctx = RunContext::new();

        integrate(
            &mut dataset,
            vec![
                merged("https://a.example.com", "A", "Flat", Some("Ignored")),
                merged("https://b.example.com", "B", "Nested", None),
            ],
            &mut ctx,
        );

        assert_eq!(ctx.warnings().len(), 2);
        assert!(dataset[0].subcategories.is_empty());
        assert_eq!(dataset[0].links.len(), 2);
        assert_eq!(dataset[1].subcategories[1].term, FALLBACK_TERM);
        assert_eq!(dataset[1].subcategories[1].links[0].title, "B");
    }
}
