//! Locates the configured theme and loads its layouts and static assets.
//!
//! A theme is a directory under the themes directory:
//!
//! ```text
//! themes/{name}/
//!     layouts/base.html     optional, prepended to every layout
//!     layouts/list.html     home listing and taxonomy term pages
//!     layouts/single.html   one content item
//!     layouts/terms.html    optional, the overview of a taxonomy's terms
//!     static/               copied verbatim into the output
//!     archetypes/           optional fallbacks for `new`
//! ```

use crate::config::SiteConfig;
use crate::render::OutputFile;
use gtmpl::Template;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

const LAYOUTS: &str = "layouts";
const STATIC: &str = "static";
const BASE_LAYOUT: &str = "base.html";

/// The templates of a loaded theme.
pub struct Theme {
    pub name: String,
    pub directory: PathBuf,
    pub list: Template,
    pub single: Template,
    pub terms: Option<Template>,
}

impl Theme {
    /// Loads the theme named by the configuration. Fails with
    /// [`Error::ThemeMissing`] when its directory doesn't exist.
    pub fn load(config: &SiteConfig) -> Result<Theme> {
        let directory = locate(config)?;
        let layouts = directory.join(LAYOUTS);
        let base = layouts.join(BASE_LAYOUT);
        let with_base = |name: &str| -> Vec<PathBuf> {
            match base.is_file() {
                true => vec![base.clone(), layouts.join(name)],
                false => vec![layouts.join(name)],
            }
        };

        let terms_layout = layouts.join("terms.html");
        let terms = match terms_layout.is_file() {
            true => Some(parse_template(with_base("terms.html").iter())?),
            false => None,
        };

        debug!("loaded theme `{}` from `{}`", config.theme, directory.display());
        Ok(Theme {
            name: config.theme.clone(),
            list: parse_template(with_base("list.html").iter())?,
            single: parse_template(with_base("single.html").iter())?,
            terms,
            directory,
        })
    }

    /// Collects the static assets of the theme and of the site, as output
    /// files. A site asset replaces a theme asset with the same path.
    pub fn static_files(&self, config: &SiteConfig) -> Result<Vec<OutputFile>> {
        let mut files = BTreeMap::new();
        for dir in &[self.directory.join(STATIC), config.root_directory.join(STATIC)] {
            collect_static(dir, &mut files)?;
        }
        Ok(files
            .into_iter()
            .map(|(path, contents)| OutputFile { path, contents })
            .collect())
    }
}

/// Returns the theme's directory, or [`Error::ThemeMissing`].
pub fn locate(config: &SiteConfig) -> Result<PathBuf> {
    let directory = config.theme_directory();
    match directory.is_dir() {
        true => Ok(directory),
        false => Err(Error::ThemeMissing {
            name: config.theme.clone(),
            directory,
        }),
    }
}

fn collect_static(dir: &Path, files: &mut BTreeMap<PathBuf, Vec<u8>>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for result in WalkDir::new(dir) {
        let entry = result?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = match entry.path().strip_prefix(dir) {
            Ok(relative) => relative.to_owned(),
            Err(_) => continue,
        };
        let contents = fs::read(entry.path()).map_err(|e| Error::Io {
            path: entry.path().to_owned(),
            err: e,
        })?;
        files.insert(relative, contents);
    }
    Ok(())
}

// Loads the template files, joins them with newlines, and parses the result
// into a single template.
fn parse_template<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<Template> {
    let mut contents = String::new();
    for template_file in template_files {
        let template_file = template_file.as_ref();
        let text = fs::read_to_string(template_file).map_err(|e| Error::Io {
            path: template_file.to_owned(),
            err: e,
        })?;
        if !contents.is_empty() {
            contents.push('\n');
        }
        contents.push_str(&text);
    }

    let mut template = Template::default();
    template
        .parse(contents.as_str())
        .map_err(|e| Error::ParseTemplate(e.to_string()))?;
    Ok(template)
}

/// Represents the result of a theme operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading a theme.
#[derive(Debug, Error)]
pub enum Error {
    /// The configured theme has no directory under the themes directory.
    #[error("theme `{name}` not found at `{}`", directory.display())]
    ThemeMissing { name: String, directory: PathBuf },

    /// Returned for I/O problems while reading layouts or static files.
    #[error("reading theme file `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned for errors parsing layout files.
    #[error("parsing theme layout: {0}")]
    ParseTemplate(String),

    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use tempfile::TempDir;

    /// Writes a minimal theme named `plain` below `root/themes`.
    pub(crate) fn write_theme(root: &Path) {
        let layouts = root.join("themes/plain/layouts");
        fs::create_dir_all(&layouts).unwrap();
        fs::write(
            layouts.join("list.html"),
            "{{ .title }}|{{ range .items }}[{{ .title }}]{{ end }}|{{ .pager.number }}/{{ .pager.total }}",
        )
        .unwrap();
        fs::write(
            layouts.join("single.html"),
            "<h1>{{ .item.title }}</h1>{{ .item.content }}",
        )
        .unwrap();
        fs::write(
            layouts.join("terms.html"),
            "{{ range .terms }}{{ .name }}={{ .count }};{{ end }}",
        )
        .unwrap();
        let css = root.join("themes/plain/static/css");
        fs::create_dir_all(&css).unwrap();
        fs::write(css.join("main.css"), "body {}").unwrap();
    }

    pub(crate) fn config(root: &Path) -> SiteConfig {
        let text = "baseURL = \"https://example.org/\"\ntitle = \"Notes\"\ntheme = \"plain\"\npaginate = 2\n";
        SiteConfig::from_str(text, root).unwrap()
    }

    #[test]
    fn test_missing_theme() {
        let dir = TempDir::new().unwrap();
        match Theme::load(&config(dir.path())) {
            Err(Error::ThemeMissing { name, .. }) => assert_eq!(name, "plain"),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("loaded a theme that doesn't exist"),
        }
    }

    #[test]
    fn test_load_and_static_files() -> Result<()> {
        let dir = TempDir::new().unwrap();
        write_theme(dir.path());
        fs::create_dir_all(dir.path().join("static/css")).unwrap();
        fs::write(dir.path().join("static/css/main.css"), "site").unwrap();
        fs::write(dir.path().join("static/favicon.ico"), "icon").unwrap();

        let config = config(dir.path());
        let theme = Theme::load(&config)?;
        assert_eq!(theme.name, "plain");
        assert!(theme.terms.is_some());

        let files = theme.static_files(&config)?;
        let paths: Vec<&Path> = files.iter().map(|f| f.path.as_path()).collect();
        assert_eq!(paths, vec![Path::new("css/main.css"), Path::new("favicon.ico")]);
        assert_eq!(files[0].contents, b"site".to_vec());
        Ok(())
    }

    #[test]
    fn test_missing_layout() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("themes/plain/layouts")).unwrap();
        assert!(matches!(
            Theme::load(&config(dir.path())),
            Err(Error::Io { .. })
        ));
    }
}
