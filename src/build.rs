//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: loading the theme, loading the
//! content ([`crate::content`]), assembling the listing and taxonomy views
//! ([`crate::site`]), rendering every page in memory ([`crate::render`]), and
//! finally replacing the publish directory with the result.

use crate::config::SiteConfig;
use crate::content::{Error as ContentError, Loader};
use crate::render::{Error as RenderError, GtmplRenderer, OutputFile, Render};
use crate::site::Site;
use crate::theme::{Error as ThemeError, Theme};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Written into the publish directory so later builds know they may clean it.
pub const MARKER_FILE: &str = ".quire";

/// What a successful build produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    /// Items that made it into the output.
    pub items: usize,
    pub drafts_skipped: usize,
    /// Files written, static assets included.
    pub files: usize,
}

/// Builds the site described by `config` with its configured theme.
pub fn build_site(config: &SiteConfig) -> Result<Report> {
    let theme = Theme::load(config)?;
    build_site_with(config, &GtmplRenderer::new(&theme), Some(&theme))
}

/// Builds the site with any [`Render`] implementation. `theme`, when given,
/// contributes its static assets. Nothing is written until every page has
/// rendered, so a failed build leaves the previous output in place.
pub fn build_site_with(
    config: &SiteConfig,
    renderer: &dyn Render,
    theme: Option<&Theme>,
) -> Result<Report> {
    info!("loading content from `{}`", config.content_directory.display());
    let items = Loader::new(&config.content_directory).load()?;
    let site = Site::new(config, &items);
    info!(
        "{} items published, {} drafts skipped",
        site.items().count(),
        site.drafts_skipped
    );

    let mut files = renderer.render(&site)?;
    if let Some(theme) = theme {
        debug!("collecting static files of theme `{}`", theme.name);
        files.extend(theme.static_files(config)?);
    }
    check_collisions(&files)?;

    clean(&config.publish_directory)?;
    write_files(&config.publish_directory, &files)?;
    info!(
        "wrote {} files to `{}`",
        files.len(),
        config.publish_directory.display()
    );

    Ok(Report {
        items: site.items().count(),
        drafts_skipped: site.drafts_skipped,
        files: files.len(),
    })
}

fn check_collisions(files: &[OutputFile]) -> Result<()> {
    let mut seen = HashSet::new();
    for file in files {
        if !seen.insert(&file.path) {
            return Err(Error::OutputCollision(file.path.clone()));
        }
    }
    Ok(())
}

// Only directories created by a previous build are removed. Anything else that
// is non-empty is refused, in case the wrong directory was passed.
fn clean(dir: &Path) -> Result<()> {
    let io = |err| Error::Io {
        path: dir.to_owned(),
        err,
    };
    if !dir.exists() {
        return Ok(());
    }
    let empty = fs::read_dir(dir).map_err(io)?.next().is_none();
    if !empty && !dir.join(MARKER_FILE).is_file() {
        return Err(Error::UnmanagedOutput(dir.to_owned()));
    }
    debug!("cleaning `{}`", dir.display());
    fs::remove_dir_all(dir).map_err(io)
}

fn write_files(dir: &Path, files: &[OutputFile]) -> Result<()> {
    let write = |path: &Path, contents: &[u8]| -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| Error::Io {
                path: parent.to_owned(),
                err,
            })?;
        }
        fs::write(path, contents).map_err(|err| Error::Io {
            path: path.to_owned(),
            err,
        })
    };

    write(&dir.join(MARKER_FILE), b"")?;
    for file in files {
        write(&dir.join(&file.path), &file.contents)?;
    }
    Ok(())
}

/// Represents the result of a build.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Every variant is fatal and is returned
/// before the publish directory is touched, except [`Error::Io`] while
/// writing.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when loading content fails: malformed front-matter or
    /// duplicate paths.
    #[error(transparent)]
    Content(#[from] ContentError),

    /// Returned when the theme is missing or its layouts are broken.
    #[error(transparent)]
    Theme(#[from] ThemeError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// Two output files resolve to the same path, e.g. a page at `tags/rust`
    /// and the `rust` tag's listing.
    #[error("more than one output file at `{}`", .0.display())]
    OutputCollision(PathBuf),

    /// The publish directory holds files this tool didn't write.
    #[error(
        "refusing to clean `{}`: it is not empty and was not created by a previous build",
        .0.display()
    )]
    UnmanagedOutput(PathBuf),

    /// Returned for I/O problems while cleaning or writing the publish
    /// directory.
    #[error("writing `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
}
