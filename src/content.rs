//! Defines the [`ContentItem`] type and the [`Loader`] that discovers and
//! parses content items from the content directory.

use crate::frontmatter::{self, Date, FrontMatter};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

const MARKDOWN_EXTENSION: &str = "md";
const BUNDLE_INDEX: &str = "index";
const FOLD_MARKERS: &[&str] = &["<!--more-->", "<!-- more -->"];

/// A post or a static page: typed front-matter plus a raw Markdown body.
#[derive(Clone, Debug, PartialEq)]
pub struct ContentItem {
    /// The public, slugified identifier of the item, e.g. `post/my-title`.
    /// Unique across the content store.
    pub path: String,

    /// The source file, relative to the content directory.
    pub source: PathBuf,

    /// The first segment of `path` for items in a subdirectory (`post`), or
    /// the empty string for root-level pages (`about`).
    pub section: String,

    pub front_matter: FrontMatter,

    pub body: String,
}

impl ContentItem {
    /// Parses a content item from the text of its file. `source` is the path
    /// of the file relative to the content directory and determines the
    /// item's `path`.
    pub fn parse(source: &Path, input: &str) -> Result<ContentItem> {
        let (format, meta, body) = frontmatter::split(input).map_err(|e| parse_error(source, e))?;
        let front_matter = FrontMatter::parse(format, meta).map_err(|e| parse_error(source, e))?;
        let path = item_path(source, front_matter.slug.as_deref())
            .ok_or_else(|| Error::InvalidFileName(source.to_owned()))?;
        let section = match path.find('/') {
            Some(i) => path[..i].to_owned(),
            None => String::new(),
        };

        Ok(ContentItem {
            path,
            source: source.to_owned(),
            section,
            front_matter,
            body: body.to_owned(),
        })
    }

    pub fn title(&self) -> &str {
        &self.front_matter.title
    }

    pub fn date(&self) -> &Date {
        &self.front_matter.date
    }

    pub fn is_draft(&self) -> bool {
        self.front_matter.draft
    }

    /// Returns the Markdown above the fold marker (`<!--more-->`) and whether
    /// the body was folded at all. Unfolded items summarize as their whole
    /// body.
    pub fn summary(&self) -> (&str, bool) {
        FOLD_MARKERS
            .iter()
            .filter_map(|marker| self.body.find(marker))
            .min()
            .map(|i| (&self.body[..i], true))
            .unwrap_or((self.body.as_str(), false))
    }

    /// Returns the raw terms this item declares for a taxonomy, looked up by
    /// the taxonomy's plural key. `tags` reads the typed field; any other key
    /// reads the pass-through metadata, accepting a string or a list of
    /// strings.
    pub fn terms(&self, plural: &str) -> Vec<&str> {
        if plural == "tags" {
            return self.front_matter.tags.iter().map(String::as_str).collect();
        }
        match self.front_matter.extra.get(plural) {
            Some(serde_yaml::Value::String(s)) => vec![s.as_str()],
            Some(serde_yaml::Value::Sequence(values)) => {
                values.iter().filter_map(|v| v.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Orders items most recent first, breaking ties by path so output is
/// deterministic.
pub fn chronological(a: &ContentItem, b: &ContentItem) -> Ordering {
    b.date()
        .cmp(a.date())
        .then_with(|| a.path.cmp(&b.path))
}

/// Derives an item's public path from its source path: the extension is
/// dropped, a bundle's `index.md` collapses into its directory, and every
/// segment is slugified. `slug` replaces the last segment.
pub fn item_path(source: &Path, slug: Option<&str>) -> Option<String> {
    let mut segments = Vec::new();
    for component in source.with_extension("").components() {
        match component {
            Component::Normal(s) => segments.push(slug::slugify(s.to_str()?)),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if segments.len() > 1 && segments.last().map(String::as_str) == Some(BUNDLE_INDEX) {
        segments.pop();
    }
    if let Some(slug) = slug {
        segments.pop();
        segments.push(slug::slugify(slug));
    }
    if segments.is_empty() || segments.iter().any(String::is_empty) {
        return None;
    }
    Some(segments.join("/"))
}

fn parse_error(source: &Path, err: frontmatter::Error) -> Error {
    Error::ContentParse {
        file: source.to_owned(),
        source: err,
    }
}

/// Discovers content files below a content directory and parses them into
/// [`ContentItem`]s.
pub struct Loader<'a> {
    content_directory: &'a Path,
}

impl<'a> Loader<'a> {
    pub fn new(content_directory: &'a Path) -> Loader<'a> {
        Loader { content_directory }
    }

    /// Walks the content directory for Markdown files (extension `.md`) and
    /// parses each one. Items come back in discovery order, which is sorted
    /// by file name at every level. A missing content directory is an empty
    /// store.
    pub fn load(&self) -> Result<Vec<ContentItem>> {
        if !self.content_directory.exists() {
            warn!(
                "content directory `{}` does not exist",
                self.content_directory.display()
            );
            return Ok(Vec::new());
        }

        let mut items = Vec::new();
        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        let walker = WalkDir::new(self.content_directory)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()));
        for result in walker {
            let entry = result?;
            let is_markdown = entry.path().extension().and_then(|e| e.to_str())
                == Some(MARKDOWN_EXTENSION);
            if !entry.file_type().is_file() || !is_markdown {
                continue;
            }

            // walkdir only yields paths below its root
            let relative = entry
                .path()
                .strip_prefix(self.content_directory)
                .map_err(|_| Error::InvalidFileName(entry.path().to_owned()))?;
            let item = self.load_file(entry.path(), relative)?;
            debug!("loaded `{}` from `{}`", item.path, relative.display());

            if let Some(first) = seen.insert(item.path.clone(), item.source.clone()) {
                return Err(Error::DuplicatePath {
                    path: item.path,
                    first,
                    second: item.source,
                });
            }
            items.push(item);
        }
        Ok(items)
    }

    fn load_file(&self, full_path: &Path, relative: &Path) -> Result<ContentItem> {
        let contents = fs::read_to_string(full_path).map_err(|e| Error::Read {
            file: relative.to_owned(),
            source: e,
        })?;
        ContentItem::parse(relative, &contents)
    }
}

/// Represents the result of a content-loading operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading content items.
#[derive(Debug, Error)]
pub enum Error {
    /// The file's front-matter block is missing or malformed.
    #[error("parsing content file `{}`", file.display())]
    ContentParse {
        file: PathBuf,
        #[source]
        source: frontmatter::Error,
    },

    /// Two content files resolve to the same public path.
    #[error(
        "duplicate content path `{path}`: `{}` and `{}`",
        first.display(),
        second.display()
    )]
    DuplicatePath {
        path: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// The file name can't be turned into a public path (not UTF-8, or
    /// nothing left after slugifying).
    #[error("invalid content file name `{}`", .0.display())]
    InvalidFileName(PathBuf),

    #[error("reading content file `{}`", file.display())]
    Read {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Builds an item from a path and a few front-matter lines.
    pub(crate) fn item(source: &str, front_matter: &str) -> ContentItem {
        let input = format!("---\n{}\n---\nBody of {}.\n", front_matter, source);
        ContentItem::parse(Path::new(source), &input).unwrap()
    }

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_item_path() {
        let path = |s: &str, slug: Option<&str>| item_path(Path::new(s), slug);
        assert_eq!(path("about.md", None).as_deref(), Some("about"));
        assert_eq!(path("post/My Title.md", None).as_deref(), Some("post/my-title"));
        assert_eq!(path("post/bundle/index.md", None).as_deref(), Some("post/bundle"));
        assert_eq!(path("index.md", None).as_deref(), Some("index"));
        assert_eq!(path("post/draft-3.md", Some("Final Cut")).as_deref(), Some("post/final-cut"));
        assert_eq!(path("../escape.md", None), None);
        assert_eq!(path("post/!!!.md", None), None);
    }

    #[test]
    fn test_parse_item() {
        let it = item("post/hello.md", "title: Hello\ndate: 2021-04-16\ntags: [Rust]");
        assert_eq!(it.path, "post/hello");
        assert_eq!(it.section, "post");
        assert_eq!(it.title(), "Hello");
        assert_eq!(it.body, "Body of post/hello.md.\n");
        assert!(!it.is_draft());

        let page = item("about.md", "title: About\ndate: 2021-01-01");
        assert_eq!(page.section, "");
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = ContentItem::parse(Path::new("post/bad.md"), "no front matter").unwrap_err();
        match err {
            Error::ContentParse { file, .. } => assert_eq!(file, PathBuf::from("post/bad.md")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_summary() {
        let mut it = item("post/a.md", "title: A\ndate: 2021-01-01");
        it.body = "Intro.\n<!--more-->\nRest.".to_owned();
        assert_eq!(it.summary(), ("Intro.\n", true));
        it.body = "All of it.".to_owned();
        assert_eq!(it.summary(), ("All of it.", false));
    }

    #[test]
    fn test_terms() {
        let it = item(
            "post/a.md",
            "title: A\ndate: 2021-01-01\ntags: [x, y]\ncategories: [notes]\nseries: intro",
        );
        assert_eq!(it.terms("tags"), vec!["x", "y"]);
        assert_eq!(it.terms("categories"), vec!["notes"]);
        assert_eq!(it.terms("series"), vec!["intro"]);
        assert!(it.terms("authors").is_empty());
    }

    #[test]
    fn test_chronological_tie_break() {
        let a = item("post/a.md", "title: A\ndate: 2021-01-01");
        let b = item("post/b.md", "title: B\ndate: 2021-01-01");
        let c = item("post/c.md", "title: C\ndate: 2021-02-01");
        let mut items = vec![&b, &a, &c];
        items.sort_by(|x, y| chronological(x, y));
        let paths: Vec<&str> = items.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["post/c", "post/a", "post/b"]);
    }

    #[test]
    fn test_load() -> Result<()> {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "about.md", "---\ntitle: About\ndate: 2021-01-01\n---\nHi");
        write(dir.path(), "post/one.md", "+++\ntitle = \"One\"\ndate = 2021-02-01\n+++\n1");
        write(dir.path(), "post/two/index.md", "---\ntitle: Two\ndate: 2021-03-01\n---\n2");
        write(dir.path(), "post/two/cover.png", "not markdown");

        let items = Loader::new(dir.path()).load()?;
        let paths: Vec<&str> = items.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["about", "post/one", "post/two"]);
        Ok(())
    }

    #[test]
    fn test_load_missing_directory() -> Result<()> {
        let dir = TempDir::new().unwrap();
        assert!(Loader::new(&dir.path().join("content")).load()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_load_duplicate_path() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "post/Hello World.md", "---\ntitle: A\ndate: 2021-01-01\n---\n");
        write(dir.path(), "post/hello-world.md", "---\ntitle: B\ndate: 2021-01-02\n---\n");

        match Loader::new(dir.path()).load() {
            Err(Error::DuplicatePath { path, first, second }) => {
                assert_eq!(path, "post/hello-world");
                assert_eq!(first, PathBuf::from("post/Hello World.md"));
                assert_eq!(second, PathBuf::from("post/hello-world.md"));
            }
            other => panic!("expected a duplicate path error, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_load_malformed() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "post/bad.md", "---\ntitle: [unclosed\n---\n");
        assert!(matches!(
            Loader::new(dir.path()).load(),
            Err(Error::ContentParse { .. })
        ));
    }
}
