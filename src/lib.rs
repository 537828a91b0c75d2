//! The library code for the `quire` static blog generator. A build is a single
//! linear pass:
//!
//! 1. Loading the site configuration ([`crate::config`])
//! 2. Parsing content items from the content directory ([`crate::content`],
//!    [`crate::frontmatter`])
//! 3. Assembling the derived views: the chronological listing and the
//!    taxonomy index ([`crate::site`], [`crate::taxonomy`])
//! 4. Rendering every page in memory ([`crate::render`], [`crate::theme`],
//!    [`crate::paginate`])
//! 5. Replacing the publish directory with the result ([`crate::build`])
//!
//! The render step sits behind the [`render::Render`] trait. The bundled
//! implementation executes Go-style templates from the configured theme.
//!
//! Separately, [`crate::archetype`] scaffolds new content files.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod archetype;
pub mod build;
pub mod config;
pub mod content;
pub mod frontmatter;
pub mod markdown;
pub mod paginate;
pub mod render;
pub mod site;
pub mod taxonomy;
pub mod theme;
pub mod value;
