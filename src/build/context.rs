//! Build context shared by the index and post builders.

use std::path::{Path, PathBuf};

use crate::config::SiteConfig;

use super::render::Renderer;
use super::source::{POSTS_DIR, PostDir, SourceLayout};

/// Everything a build step needs besides the metadata cache.
pub struct BuildContext<'a> {
    pub layout: &'a SourceLayout,
    /// Directory where output files are written
    pub output_dir: &'a Path,
    pub config: &'a SiteConfig,
    /// Templates, compiled once per build
    pub renderer: &'a Renderer,
}

impl BuildContext<'_> {
    pub fn base_url(&self) -> &str {
        &self.config.url
    }

    pub fn date_format(&self) -> &str {
        &self.config.date_format
    }

    /// Output directory of a post.
    pub fn post_output_dir(&self, post: &PostDir) -> PathBuf {
        self.output_dir.join(POSTS_DIR).join(&post.id)
    }

    /// Absolute URL of a post.
    pub fn post_url(&self, post: &PostDir) -> String {
        format!("{}/{}", self.base_url(), post.relative_url())
    }
}
