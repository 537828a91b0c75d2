//! Loads the site configuration (`config.toml`) into an immutable
//! [`SiteConfig`]. The file is read once, validated eagerly, and the result is
//! passed by reference to every later stage.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Names the configuration file may have, in lookup order.
pub const CONFIG_FILE_NAMES: &[&str] = &["config.toml", "hugo.toml"];

const DEFAULT_PAGINATE: i64 = 10;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Project {
    #[serde(rename = "baseURL", alias = "baseurl", alias = "baseUrl")]
    base_url: Option<String>,
    title: Option<String>,
    theme: Option<String>,
    paginate: Option<i64>,
    language_code: Option<String>,

    #[serde(default)]
    menu: Menus,

    taxonomies: Option<BTreeMap<String, String>>,
    main_sections: Option<Vec<String>>,

    #[serde(default)]
    params: toml::Table,

    content_dir: Option<PathBuf>,
    publish_dir: Option<PathBuf>,
    themes_dir: Option<PathBuf>,
    archetype_dir: Option<PathBuf>,

    #[serde(default)]
    build_drafts: bool,
}

#[derive(Default, Deserialize)]
struct Menus {
    #[serde(default)]
    main: Vec<RawMenuEntry>,
}

#[derive(Deserialize)]
struct RawMenuEntry {
    identifier: Option<String>,
    name: Option<String>,
    url: Option<String>,
    #[serde(default)]
    weight: i64,
}

/// An entry of the site's main menu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuEntry {
    pub identifier: String,
    pub name: String,
    pub url: String,
    pub weight: i64,
}

/// The validated, immutable site configuration.
#[derive(Clone, Debug)]
pub struct SiteConfig {
    /// Absolute base URL, always ending in `/`.
    pub base_url: Url,
    pub title: String,

    /// Name of the theme directory under `themes_directory`.
    pub theme: String,

    /// Items per listing page; always greater than zero.
    pub paginate: usize,

    pub language_code: Option<String>,

    /// Sorted by ascending weight, ties broken by identifier.
    pub menu: Vec<MenuEntry>,

    /// Singular name → plural key, e.g. `tag` → `tags`.
    pub taxonomies: BTreeMap<String, String>,

    /// Sections whose items make up the home listing.
    pub main_sections: Vec<String>,

    /// Free-form theme parameters, handed to templates untouched.
    pub params: toml::Table,

    /// The directory holding the configuration file.
    pub root_directory: PathBuf,
    pub content_directory: PathBuf,
    pub publish_directory: PathBuf,
    pub themes_directory: PathBuf,
    pub archetype_directory: PathBuf,

    pub build_drafts: bool,
}

impl SiteConfig {
    /// Finds the configuration file in `dir` or its nearest ancestor and loads
    /// it.
    pub fn from_directory(dir: &Path) -> Result<SiteConfig> {
        for ancestor in dir.ancestors() {
            for name in CONFIG_FILE_NAMES {
                let path = ancestor.join(name);
                if path.is_file() {
                    return SiteConfig::from_project_file(&path);
                }
            }
        }
        Err(Error::NotFound(dir.to_owned()))
    }

    /// Loads a configuration file. Relative directories in it resolve against
    /// the file's parent directory.
    pub fn from_project_file(path: &Path) -> Result<SiteConfig> {
        debug!("loading configuration from `{}`", path.display());
        let text = fs::read_to_string(path).map_err(|e| Error::Read {
            path: path.to_owned(),
            source: e,
        })?;
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        SiteConfig::from_str(&text, root).map_err(|e| match e {
            Error::Toml { source, .. } => Error::Toml {
                path: path.to_owned(),
                source,
            },
            other => other,
        })
    }

    /// Parses and validates configuration text. `root` is the project
    /// directory that relative paths resolve against.
    pub fn from_str(text: &str, root: &Path) -> Result<SiteConfig> {
        let project: Project = toml::from_str(text).map_err(|e| Error::Toml {
            path: PathBuf::new(),
            source: e,
        })?;
        project.validate(root)
    }

    /// Overrides `build_drafts`, e.g. from a command-line flag.
    pub fn with_build_drafts(mut self, build_drafts: bool) -> SiteConfig {
        self.build_drafts = self.build_drafts || build_drafts;
        self
    }

    /// Overrides the output directory.
    pub fn with_publish_directory(mut self, dir: PathBuf) -> SiteConfig {
        self.publish_directory = dir;
        self
    }

    /// Returns the absolute URL for a path relative to the site root.
    pub fn permalink(&self, relative: &str) -> String {
        match self.base_url.join(relative) {
            Ok(url) => url.into(),
            Err(_) => format!("{}{}", self.base_url, relative),
        }
    }

    pub fn theme_directory(&self) -> PathBuf {
        self.themes_directory.join(&self.theme)
    }
}

impl Project {
    fn validate(self, root: &Path) -> Result<SiteConfig> {
        let base_url = required("baseURL", self.base_url)?;
        let mut base_url = Url::parse(&base_url).map_err(|e| Error::Invalid {
            field: "baseURL",
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Invalid {
                field: "baseURL",
                reason: format!("`{}` cannot be used as a base URL", base_url),
            });
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let paginate = self.paginate.unwrap_or(DEFAULT_PAGINATE);
        if paginate <= 0 {
            return Err(Error::Invalid {
                field: "paginate",
                reason: format!("must be greater than zero, got {}", paginate),
            });
        }

        let mut menu = self
            .menu
            .main
            .into_iter()
            .map(RawMenuEntry::validate)
            .collect::<Result<Vec<MenuEntry>>>()?;
        menu.sort_by(|a, b| {
            a.weight
                .cmp(&b.weight)
                .then_with(|| a.identifier.cmp(&b.identifier))
        });

        let taxonomies = self.taxonomies.unwrap_or_else(default_taxonomies);
        for (singular, plural) in &taxonomies {
            if plural.is_empty() || slug::slugify(plural) != *plural {
                return Err(Error::Invalid {
                    field: "taxonomies",
                    reason: format!("`{} = {:?}` must map to a URL-safe plural", singular, plural),
                });
            }
        }

        let main_sections = match self.main_sections {
            Some(sections) => sections,
            None => params_main_sections(&self.params).unwrap_or_else(|| vec!["post".to_owned()]),
        };

        let dir = |configured: Option<PathBuf>, default: &str| {
            root.join(configured.unwrap_or_else(|| PathBuf::from(default)))
        };

        Ok(SiteConfig {
            base_url,
            title: required("title", self.title)?,
            theme: required("theme", self.theme)?,
            paginate: paginate as usize,
            language_code: self.language_code,
            menu,
            taxonomies,
            main_sections,
            params: self.params,
            root_directory: root.to_owned(),
            content_directory: dir(self.content_dir, "content"),
            publish_directory: dir(self.publish_dir, "public"),
            themes_directory: dir(self.themes_dir, "themes"),
            archetype_directory: dir(self.archetype_dir, "archetypes"),
            build_drafts: self.build_drafts,
        })
    }
}

impl RawMenuEntry {
    fn validate(self) -> Result<MenuEntry> {
        let name = required("menu.main.name", self.name)?;
        Ok(MenuEntry {
            identifier: self.identifier.unwrap_or_else(|| name.clone()),
            url: required("menu.main.url", self.url)?,
            name,
            weight: self.weight,
        })
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Missing(field)),
    }
}

fn default_taxonomies() -> BTreeMap<String, String> {
    let mut m = BTreeMap::new();
    m.insert("tag".to_owned(), "tags".to_owned());
    m.insert("category".to_owned(), "categories".to_owned());
    m
}

// Themes commonly read `params.mainSections`; honor it as a fallback.
fn params_main_sections(params: &toml::Table) -> Option<Vec<String>> {
    params.get("mainSections")?.as_array().map(|values| {
        values
            .iter()
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect()
    })
}

/// Represents the result of a configuration operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a missing or invalid configuration.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not find `config.toml` in `{}` or any parent directory", .0.display())]
    NotFound(PathBuf),

    #[error("reading configuration file `{}`", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing configuration file `{}`", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("missing required configuration field `{0}`")]
    Missing(&'static str),

    #[error("invalid configuration field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
baseURL = "https://example.org"
title = "Notes"
theme = "plain"
"#;

    #[test]
    fn test_defaults() -> Result<()> {
        let config = SiteConfig::from_str(MINIMAL, Path::new("/site"))?;
        assert_eq!(config.base_url.as_str(), "https://example.org/");
        assert_eq!(config.paginate, 10);
        assert_eq!(config.taxonomies["tag"], "tags");
        assert_eq!(config.taxonomies["category"], "categories");
        assert_eq!(config.main_sections, vec!["post".to_owned()]);
        assert_eq!(config.content_directory, PathBuf::from("/site/content"));
        assert_eq!(config.publish_directory, PathBuf::from("/site/public"));
        assert_eq!(config.theme_directory(), PathBuf::from("/site/themes/plain"));
        assert!(config.menu.is_empty());
        assert!(!config.build_drafts);
        Ok(())
    }

    #[test]
    fn test_full() -> Result<()> {
        let text = r#"
baseURL = "https://example.org/blog"
title = "Notes"
theme = "plain"
paginate = 5
languageCode = "en-us"
publishDir = "dist"

[taxonomies]
tag = "tags"
series = "series"

[params]
mainSections = ["posts"]
subtitle = "things I learned"

[[menu.main]]
identifier = "contact"
name = "Contact"
url = "/contact/"
weight = 30

[[menu.main]]
name = "About"
url = "/about/"
weight = 10

[[menu.main]]
identifier = "archive"
name = "Archive"
url = "/post/"
weight = 10
"#;
        let config = SiteConfig::from_str(text, Path::new("/site"))?;
        assert_eq!(config.base_url.as_str(), "https://example.org/blog/");
        assert_eq!(config.permalink("post/a/"), "https://example.org/blog/post/a/");
        assert_eq!(config.paginate, 5);
        assert_eq!(config.language_code.as_deref(), Some("en-us"));
        assert_eq!(config.publish_directory, PathBuf::from("/site/dist"));
        assert_eq!(config.taxonomies.len(), 2);
        assert_eq!(config.main_sections, vec!["posts".to_owned()]);

        let order: Vec<&str> = config.menu.iter().map(|m| m.identifier.as_str()).collect();
        assert_eq!(order, vec!["About", "archive", "contact"]);
        Ok(())
    }

    #[test]
    fn test_missing_fields() {
        let err = SiteConfig::from_str("title = \"x\"\ntheme = \"t\"", Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Missing("baseURL")));

        let err = SiteConfig::from_str("baseURL = \"https://a.b/\"\ntheme = \"t\"", Path::new("."))
            .unwrap_err();
        assert!(matches!(err, Error::Missing("title")));

        let text = format!("{}\n[[menu.main]]\nname = \"About\"\n", MINIMAL);
        let err = SiteConfig::from_str(&text, Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Missing("menu.main.url")));
    }

    #[test]
    fn test_invalid_fields() {
        let text = format!("{}paginate = 0\n", MINIMAL);
        let err = SiteConfig::from_str(&text, Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Invalid { field: "paginate", .. }));

        let text = "baseURL = \"not a url\"\ntitle = \"x\"\ntheme = \"t\"";
        let err = SiteConfig::from_str(text, Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Invalid { field: "baseURL", .. }));

        let err = SiteConfig::from_str("title = [", Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Toml { .. }));
    }

    #[test]
    fn test_from_directory_searches_ancestors() -> Result<()> {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.toml"), MINIMAL).unwrap();
        let nested = dir.path().join("content").join("post");
        fs::create_dir_all(&nested).unwrap();

        let config = SiteConfig::from_directory(&nested)?;
        assert_eq!(config.root_directory, dir.path());
        assert_eq!(config.content_directory, dir.path().join("content"));
        Ok(())
    }

    #[test]
    fn test_overrides() -> Result<()> {
        let config = SiteConfig::from_str(MINIMAL, Path::new("/site"))?
            .with_build_drafts(true)
            .with_publish_directory(PathBuf::from("/tmp/out"));
        assert!(config.build_drafts);
        assert_eq!(config.publish_directory, PathBuf::from("/tmp/out"));
        Ok(())
    }
}
