//! Assembles the derived views the render pipeline consumes: the main
//! chronological listing, the static pages, and the taxonomy index.

use crate::config::SiteConfig;
use crate::content::{chronological, ContentItem};
use crate::taxonomy::{self, Drafts, TaxonomyIndex};
use tracing::warn;

/// Everything a [`crate::render::Render`] implementation needs to produce the
/// site. Drafts are already filtered out unless the configuration asks for
/// them.
pub struct Site<'a> {
    pub config: &'a SiteConfig,

    /// Published items of the main sections, most recent first.
    pub listing: Vec<&'a ContentItem>,

    /// Every other published item (About, Contact, ...), in path order.
    pub pages: Vec<&'a ContentItem>,

    pub taxonomies: TaxonomyIndex<'a>,

    /// How many drafts were left out.
    pub drafts_skipped: usize,
}

impl<'a> Site<'a> {
    pub fn new(config: &'a SiteConfig, items: &'a [ContentItem]) -> Site<'a> {
        let drafts = match config.build_drafts {
            true => Drafts::Include,
            false => Drafts::Exclude,
        };

        let (mut listing, mut pages): (Vec<&ContentItem>, Vec<&ContentItem>) = items
            .iter()
            .filter(|i| drafts.admits(i))
            .partition(|i| config.main_sections.contains(&i.section));
        listing.sort_by(|a, b| chronological(a, b));
        pages.sort_by(|a, b| a.path.cmp(&b.path));

        let site = Site {
            config,
            drafts_skipped: items.iter().filter(|i| !drafts.admits(i)).count(),
            taxonomies: taxonomy::build(items, &config.taxonomies, drafts),
            listing,
            pages,
        };
        if site.listing.is_empty() {
            let sections = site.unlisted_sections();
            if !sections.is_empty() {
                warn!(
                    "the home listing is empty: main sections are {:?}, content lives in {:?}",
                    config.main_sections, sections
                );
            }
        }
        site
    }

    /// Sections with published items that stay out of the home listing.
    /// Top-level pages have no section and aren't counted.
    pub fn unlisted_sections(&self) -> Vec<&'a str> {
        let mut sections: Vec<&str> = self
            .pages
            .iter()
            .map(|&i| i.section.as_str())
            .filter(|s| !s.is_empty())
            .collect();
        sections.dedup();
        sections
    }

    /// Every published item, listing first.
    pub fn items(&self) -> impl Iterator<Item = &'a ContentItem> + '_ {
        self.listing.iter().chain(self.pages.iter()).copied()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::content::test::item;
    use std::path::Path;

    const CONFIG: &str = "baseURL = \"https://example.org/\"\ntitle = \"t\"\ntheme = \"plain\"\n";

    fn items() -> Vec<ContentItem> {
        vec![
            item("about.md", "title: About\ndate: 2020-01-01"),
            item("post/a.md", "title: A\ndate: 2021-01-01\ntags: [rust]"),
            item("post/b.md", "title: B\ndate: 2021-03-01\ndraft: true\ntags: [rust]"),
            item("post/c.md", "title: C\ndate: 2021-02-01"),
            item("contact.md", "title: Contact\ndate: 2020-01-01\ndraft: true"),
        ]
    }

    fn paths(items: &[&ContentItem]) -> Vec<String> {
        items.iter().map(|i| i.path.clone()).collect()
    }

    #[test]
    fn test_production_site() {
        let config = SiteConfig::from_str(CONFIG, Path::new(".")).unwrap();
        let items = items();
        let site = Site::new(&config, &items);

        assert_eq!(paths(&site.listing), vec!["post/c", "post/a"]);
        assert_eq!(paths(&site.pages), vec!["about"]);
        assert_eq!(site.drafts_skipped, 2);
        assert!(site.unlisted_sections().is_empty());
        assert_eq!(site.items().count(), 3);
        assert!(site.items().all(|i| !i.is_draft()));
        assert_eq!(site.taxonomies["tags"].terms["rust"].items.len(), 1);
    }

    #[test]
    fn test_draft_preview() {
        let config = SiteConfig::from_str(CONFIG, Path::new("."))
            .unwrap()
            .with_build_drafts(true);
        let items = items();
        let site = Site::new(&config, &items);

        assert_eq!(paths(&site.listing), vec!["post/b", "post/c", "post/a"]);
        assert_eq!(paths(&site.pages), vec!["about", "contact"]);
        assert_eq!(site.drafts_skipped, 0);
    }

    #[test]
    fn test_unlisted_sections() {
        let config = SiteConfig::from_str(CONFIG, Path::new(".")).unwrap();
        let items = vec![
            item("about.md", "title: About\ndate: 2020-01-01"),
            item("posts/a.md", "title: A\ndate: 2021-01-01"),
            item("posts/b.md", "title: B\ndate: 2021-02-01"),
            item("notes/c.md", "title: C\ndate: 2021-03-01"),
        ];
        let site = Site::new(&config, &items);

        assert!(site.listing.is_empty());
        assert_eq!(site.unlisted_sections(), vec!["notes", "posts"]);
    }
}
