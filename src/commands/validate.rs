use std::collections::HashSet;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::ValidateArgs;
use crate::commands::RunStatus;
use crate::commands::import::normalize::normalize;
use crate::model::NavigationCategory;
use crate::util::load_dataset;

/// Checks the canonical dataset invariants the import engine relies on:
/// unique taxonomy names, unique terms per category, one active shape per
/// category, and links whose URLs pass the same lenient parse the
/// normalizer applies.
pub fn run(args: ValidateArgs) -> Result<RunStatus> {
    let dataset = load_dataset(&args.data)?;
    let violations = check_dataset(&dataset);

    for violation in &violations {
        warn!("{violation}");
    }

    info!(
        path = %args.data.display(),
        categories = dataset.len(),
        violations = violations.len(),
        "validation finished"
    );

    Ok(if violations.is_empty() {
        RunStatus::Clean
    } else {
        RunStatus::Warnings
    })
}

fn check_dataset(dataset: &[NavigationCategory]) -> Vec<String> {
    let mut violations = Vec::new();
    let mut taxonomies = HashSet::new();

    for category in dataset {
        let taxonomy = &category.taxonomy;

        if taxonomy.trim().is_empty() {
            violations.push("category with empty taxonomy name".to_string());
        }
        if !taxonomies.insert(taxonomy.clone()) {
            violations.push(format!("duplicate taxonomy {taxonomy:?}"));
        }
        if !category.links.is_empty() && !category.subcategories.is_empty() {
            violations.push(format!(
                "category {taxonomy:?} has both flat links and subcategories"
            ));
        }

        let mut terms = HashSet::new();
        for subcategory in &category.subcategories {
            if !terms.insert(subcategory.term.clone()) {
                violations.push(format!(
                    "duplicate term {:?} in category {taxonomy:?}",
                    subcategory.term
                ));
            }
        }

        let buckets = std::iter::once((None, &category.links)).chain(
            category
                .subcategories
                .iter()
                .map(|sub| (Some(sub.term.as_str()), &sub.links)),
        );
        for (term, links) in buckets {
            for link in links {
                if let Err(err) = normalize(&link.url) {
                    let place = match term {
                        Some(term) => format!("{taxonomy} / {term}"),
                        None => taxonomy.clone(),
                    };
                    violations.push(format!(
                        "link {:?} under {place}: URL {:?} is invalid: {err}",
                        link.title, link.url
                    ));
                }
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NavigationLink, NavigationSubcategory};

    fn category(taxonomy: &str) -> NavigationCategory {
        NavigationCategory {
            taxonomy: taxonomy.to_string(),
            links: vec![NavigationLink {
                title: "ok".to_string(),
                url: "https://example.com/".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn a_well_formed_dataset_passes() {
        let dataset = vec![category("Tools"), category("Reading")];
        assert!(check_dataset(&dataset).is_empty());
    }

    #[test]
    fn duplicate_taxonomies_and_terms_are_reported() {
        let mut nested = NavigationCategory {
            taxonomy: "Nested".to_string(),
            ..Default::default()
        };
        nested.subcategories = vec![
            NavigationSubcategory {
                term: "Dev".to_string(),
                links: Vec::new(),
            },
            NavigationSubcategory {
                term: "Dev".to_string(),
                links: Vec::new(),
            },
        ];
        let dataset = vec![category("Tools"), category("Tools"), nested];

        let violations = check_dataset(&dataset);
        assert_eq!(violations.len(), 2);
        assert!(violations[0].contains("duplicate taxonomy"));
        assert!(violations[1].contains("duplicate term"));
    }

    #[test]
    fn invalid_urls_and_double_shapes_are_reported() {
        let mut broken = category("Broken");
        broken.links[0].url = "host/path".to_string();
        broken.subcategories = vec![NavigationSubcategory {
            term: "Dev".to_string(),
            links: Vec::new(),
        }];

        let violations = check_dataset(&[broken]);
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().any(|v| v.contains("both flat links")));
        assert!(violations.iter().any(|v| v.contains("is invalid")));
    }
}
