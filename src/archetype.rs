//! Scaffolds new content files from archetypes.
//!
//! An archetype is a template for a new content file, looked up by the
//! section of the new file: `archetypes/{section}.md`, then
//! `archetypes/default.md`, first in the site and then in its theme. When none
//! exists, a draft holding only the title and date is written. Archetypes see
//! `.Title` (derived from the file name), `.Date` (now, RFC 3339), and `.Name`
//! (the file stem).

use crate::config::SiteConfig;
use crate::frontmatter::{self, Date, FrontMatter};
use crate::value;
use chrono::Local;
use gtmpl::{Context, Template};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Creates a content file at `relative` (below the content directory) from
/// the best matching archetype and returns its full path. A missing `.md`
/// extension is added. Existing files are never overwritten.
pub fn new_content(config: &SiteConfig, relative: &Path) -> Result<PathBuf> {
    let relative = normalize(relative)?;
    let target = config.content_directory.join(&relative);
    if target.exists() {
        return Err(Error::ContentExists(target));
    }

    let name = relative
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::InvalidPath(relative.clone()))?
        .to_owned();
    let section = match relative.components().count() {
        1 => None,
        _ => relative
            .components()
            .next()
            .and_then(|c| c.as_os_str().to_str())
            .map(str::to_owned),
    };

    let now = Local::now();
    let now = now.with_timezone(now.offset());
    let contents = match find_archetype(config, section.as_deref()) {
        Some(path) => {
            debug!("using archetype `{}`", path.display());
            let source = fs::read_to_string(&path).map_err(|e| Error::Io { path, err: e })?;
            scaffold(&source, &name, &now.to_rfc3339())?
        }
        None => draft(&name, Date::from(now))?,
    };

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::Io {
            path: parent.to_owned(),
            err: e,
        })?;
    }
    fs::write(&target, contents).map_err(|e| Error::Io {
        path: target.clone(),
        err: e,
    })?;
    info!("created `{}`", target.display());
    Ok(target)
}

/// Executes an archetype template for a file named `name`.
pub fn scaffold(archetype: &str, name: &str, date: &str) -> Result<String> {
    let data = value::object(vec![
        ("Title", value::string(title_from_name(name))),
        ("Date", value::string(date)),
        ("Name", value::string(name)),
    ]);
    let mut template = Template::default();
    template
        .parse(archetype)
        .map_err(|e| Error::Template(e.to_string()))?;
    let context = Context::from(data).map_err(|e| Error::Template(e.to_string()))?;
    template
        .render(&context)
        .map_err(|e| Error::Template(e.to_string()))
}

// Titles may contain quotes, so the skeleton goes through the serializer.
fn draft(name: &str, date: Date) -> Result<String> {
    let front_matter = FrontMatter {
        title: title_from_name(name),
        author: None,
        date,
        description: None,
        tags: Vec::new(),
        draft: true,
        slug: None,
        extra: Default::default(),
    };
    Ok(front_matter.to_yaml()?)
}

/// Turns a file stem into a title: `my-first-post` → `My First Post`.
pub fn title_from_name(name: &str) -> String {
    name.split(|c| c == '-' || c == '_' || c == ' ')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn normalize(relative: &Path) -> Result<PathBuf> {
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || relative.file_stem().is_none() {
        return Err(Error::InvalidPath(relative.to_owned()));
    }
    match relative.extension() {
        Some(_) => Ok(relative.to_owned()),
        None => Ok(relative.with_extension("md")),
    }
}

fn find_archetype(config: &SiteConfig, section: Option<&str>) -> Option<PathBuf> {
    let mut names = Vec::new();
    if let Some(section) = section {
        names.push(format!("{}.md", section));
    }
    names.push("default.md".to_owned());

    let dirs = [
        config.archetype_directory.clone(),
        config.theme_directory().join("archetypes"),
    ];
    dirs.iter()
        .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

/// Represents the result of scaffolding content.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error scaffolding content.
#[derive(Debug, Error)]
pub enum Error {
    #[error("`{}` already exists", .0.display())]
    ContentExists(PathBuf),

    /// The path leaves the content directory or has no file name.
    #[error("invalid content path `{}`", .0.display())]
    InvalidPath(PathBuf),

    #[error("executing archetype: {0}")]
    Template(String),

    #[error("writing the default front-matter")]
    FrontMatter(#[from] frontmatter::Error),

    #[error("writing `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
}
