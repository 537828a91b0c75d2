//! Builds the taxonomy index: for every configured taxonomy, the published
//! items grouped by term.

use crate::content::{chronological, ContentItem};
use std::collections::BTreeMap;
use tracing::warn;

/// Whether draft items take part in derived views.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Drafts {
    Exclude,
    Include,
}

impl Drafts {
    pub fn admits(self, item: &ContentItem) -> bool {
        self == Drafts::Include || !item.is_draft()
    }
}

/// One value of a taxonomy (e.g. the `rust` tag) and the items carrying it.
#[derive(Debug)]
pub struct Term<'a> {
    /// The display name: the first spelling seen, most recent item first.
    pub name: String,

    /// The URL-safe key. Spellings that slugify alike are one term, so `Rust`
    /// and `rust` group together.
    pub slug: String,

    /// Most recent first, ties broken by path.
    pub items: Vec<&'a ContentItem>,
}

/// A named classification scheme and its terms, keyed by slug.
#[derive(Debug)]
pub struct Taxonomy<'a> {
    pub singular: String,
    pub plural: String,
    pub terms: BTreeMap<String, Term<'a>>,
}

/// Taxonomies keyed by plural name (`tags`, `categories`).
pub type TaxonomyIndex<'a> = BTreeMap<String, Taxonomy<'a>>;

/// Groups `items` under every taxonomy in `taxonomies` (singular → plural).
/// Items without terms for a taxonomy simply don't appear in it.
pub fn build<'a>(
    items: &'a [ContentItem],
    taxonomies: &BTreeMap<String, String>,
    drafts: Drafts,
) -> TaxonomyIndex<'a> {
    let mut sorted: Vec<&ContentItem> = items.iter().filter(|i| drafts.admits(i)).collect();
    sorted.sort_by(|a, b| chronological(a, b));

    taxonomies
        .iter()
        .map(|(singular, plural)| {
            let taxonomy = Taxonomy {
                singular: singular.clone(),
                plural: plural.clone(),
                terms: group(&sorted, plural),
            };
            (plural.clone(), taxonomy)
        })
        .collect()
}

// `items` must already be in chronological order; grouping preserves it.
fn group<'a>(items: &[&'a ContentItem], plural: &str) -> BTreeMap<String, Term<'a>> {
    let mut terms: BTreeMap<String, Term<'a>> = BTreeMap::new();
    for &item in items {
        for name in item.terms(plural) {
            let slug = slug::slugify(name);
            if slug.is_empty() {
                warn!("`{}` has an unusable {} entry `{}`", item.path, plural, name);
                continue;
            }
            let term = terms.entry(slug.clone()).or_insert_with(|| Term {
                name: name.to_owned(),
                slug,
                items: Vec::new(),
            });
            // an item listing `Rust` and `rust` belongs to the term once
            if !term.items.iter().any(|i| std::ptr::eq(*i, item)) {
                term.items.push(item);
            }
        }
    }
    terms
}
