//! The render pipeline: turns a [`Site`] into output files.
//!
//! [`Render`] is the contract toward whatever templating engine produces the
//! HTML; [`GtmplRenderer`] implements it with the layouts of a [`Theme`].
//! Rendering happens entirely in memory so that a failing template leaves the
//! previous output untouched.
//!
//! Output layout, relative to the publish directory:
//!
//! * `index.html`, `page/{n}/index.html` for the home listing
//! * `{item path}/index.html` for each item
//! * `{plural}/index.html` for each taxonomy's terms overview
//! * `{plural}/{slug}/index.html`, `{plural}/{slug}/page/{n}/index.html` for
//!   each term

use crate::content::ContentItem;
use crate::paginate::{paginate, pager_path, Pager};
use crate::site::Site;
use crate::theme::Theme;
use crate::value;
use gtmpl::{Context, Template};
use gtmpl_value::Value;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

const INDEX_FILE: &str = "index.html";

/// A file to be written below the publish directory.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputFile {
    /// Relative to the publish directory.
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

/// Produces the output files of a site.
pub trait Render {
    fn render(&self, site: &Site) -> Result<Vec<OutputFile>>;
}

/// Renders a site with the layouts of a [`Theme`].
pub struct GtmplRenderer<'t> {
    theme: &'t Theme,
}

impl<'t> GtmplRenderer<'t> {
    pub fn new(theme: &'t Theme) -> GtmplRenderer<'t> {
        GtmplRenderer { theme }
    }

    fn list_pages(
        &self,
        site: &Site,
        base: &str,
        title: &str,
        term: Option<Value>,
        items: &[&ContentItem],
        out: &mut Vec<OutputFile>,
    ) -> Result<()> {
        for pager in paginate(items, site.config.paginate) {
            let dir = pager_path(base, pager.number);
            let data = value::object(vec![
                ("site", value::site(site.config)),
                ("title", value::string(title)),
                ("term", term.clone().unwrap_or(Value::Nil)),
                (
                    "items",
                    Value::Array(
                        pager
                            .items
                            .iter()
                            .map(|i| value::summary(i, site.config))
                            .collect(),
                    ),
                ),
                ("pager", pager_value(site, base, &pager)),
            ]);
            out.push(self.execute(&self.theme.list, &dir, data)?);
        }
        Ok(())
    }

    fn single_pages(&self, site: &Site, out: &mut Vec<OutputFile>) -> Result<()> {
        let listing = &site.listing;
        for (i, item) in listing.iter().enumerate() {
            // the listing is most recent first; `prev` is the older neighbor
            let newer = i.checked_sub(1).map(|j| listing[j]);
            let older = listing.get(i + 1).copied();
            out.push(self.single_page(site, item, older, newer)?);
        }
        for item in &site.pages {
            out.push(self.single_page(site, item, None, None)?);
        }
        Ok(())
    }

    fn single_page(
        &self,
        site: &Site,
        item: &ContentItem,
        prev: Option<&ContentItem>,
        next: Option<&ContentItem>,
    ) -> Result<OutputFile> {
        let neighbor = |other: Option<&ContentItem>| {
            value::optional(other, |o| value::summary(o, site.config))
        };
        let data = value::object(vec![
            ("site", value::site(site.config)),
            ("title", value::string(item.title())),
            ("item", value::item(item, site.config)),
            ("prev", neighbor(prev)),
            ("next", neighbor(next)),
        ]);
        self.execute(&self.theme.single, &value::item_path(item), data)
    }

    fn taxonomy_pages(&self, site: &Site, out: &mut Vec<OutputFile>) -> Result<()> {
        for (plural, taxonomy) in &site.taxonomies {
            if let Some(terms) = &self.theme.terms {
                let data = value::object(vec![
                    ("site", value::site(site.config)),
                    ("title", value::string(plural.as_str())),
                    ("taxonomy", value::string(plural.as_str())),
                    (
                        "terms",
                        Value::Array(
                            taxonomy
                                .terms
                                .values()
                                .map(|t| value::term(t, plural, site.config))
                                .collect(),
                        ),
                    ),
                ]);
                out.push(self.execute(terms, &format!("{}/", plural), data)?);
            }

            for term in taxonomy.terms.values() {
                let base = format!("{}/{}/", plural, term.slug);
                let term_value = value::term(term, plural, site.config);
                self.list_pages(site, &base, &term.name, Some(term_value), &term.items, out)?;
            }
        }
        Ok(())
    }

    fn execute(&self, template: &Template, dir: &str, data: Value) -> Result<OutputFile> {
        let path = PathBuf::from(dir).join(INDEX_FILE);
        let context = Context::from(data).map_err(|e| Error::Template {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let html = template.render(&context).map_err(|e| Error::Template {
            path: path.clone(),
            message: e.to_string(),
        })?;
        debug!("rendered `{}`", path.display());
        Ok(OutputFile {
            path,
            contents: html.into_bytes(),
        })
    }
}

impl Render for GtmplRenderer<'_> {
    fn render(&self, site: &Site) -> Result<Vec<OutputFile>> {
        let mut out = Vec::new();
        self.list_pages(site, "", &site.config.title, None, &site.listing, &mut out)?;
        self.single_pages(site, &mut out)?;
        self.taxonomy_pages(site, &mut out)?;
        Ok(out)
    }
}

fn pager_value<T>(site: &Site, base: &str, pager: &Pager<T>) -> Value {
    let url = |n: usize| value::string(site.config.permalink(&pager_path(base, n)));
    value::object(vec![
        ("number", value::number(pager.number)),
        ("total", value::number(pager.total)),
        ("prev", value::optional(pager.prev(), url)),
        ("next", value::optional(pager.next(), url)),
    ])
}

/// Represents the result of a rendering operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error rendering a page.
#[derive(Debug, Error)]
pub enum Error {
    /// A template failed to execute.
    #[error("rendering `{}`: {message}", path.display())]
    Template { path: PathBuf, message: String },
}
