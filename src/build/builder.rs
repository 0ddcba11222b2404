use std::path::{Path, PathBuf};

use crate::config::{ConfigError, SiteConfig};

use super::cache::MetadataCache;
use super::context::BuildContext;
use super::convert::{ConversionError, Converter, PandocConverter};
use super::index::build_index;
use super::posts::build_posts;
use super::render::{RenderError, Renderer};
use super::source::{SourceError, SourceLayout};

/// Errors that abort a whole build.
///
/// Problems with a single post are not errors at this level; they are logged
/// and counted in [`BuildReport::failed`].
#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("converter error: {0}")]
    Converter(#[from] ConversionError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Summary of one build.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub output_dir: PathBuf,
    /// Posts listed on the home page
    pub listed: usize,
    pub written: usize,
    pub skipped: usize,
    /// Post identifiers that failed, in the order they were processed
    pub failed: Vec<String>,
    pub assets_copied: usize,
}

/// Builds a blog from a source directory into an output directory.
pub struct Builder<C> {
    layout: SourceLayout,
    config: SiteConfig,
    output_dir: PathBuf,
    converter: C,
}

impl Builder<PandocConverter> {
    /// Verify the source layout, load its config and make sure pandoc is
    /// installed, before anything is written.
    pub fn setup(source: &Path, output_dir: PathBuf) -> Result<Self, BuildError> {
        let layout = SourceLayout::verify(source)?;
        let config = SiteConfig::load(&layout.root)?;

        let converter = PandocConverter::new(&config.pandoc.program, config.pandoc.timeout());
        let program = converter.preflight()?;
        tracing::debug!("using {}", program.display());

        Ok(Self::new(layout, config, output_dir, converter))
    }
}

impl<C: Converter> Builder<C> {
    pub fn new(
        layout: SourceLayout,
        config: SiteConfig,
        output_dir: PathBuf,
        converter: C,
    ) -> Self {
        Self {
            layout,
            config,
            output_dir,
            converter,
        }
    }

    /// Run an incremental build: the home page, then every post.
    pub async fn build(&self, cache: &mut MetadataCache) -> Result<BuildReport, BuildError> {
        cache.start_build();
        std::fs::create_dir_all(&self.output_dir).map_err(|source| BuildError::Io {
            path: self.output_dir.clone(),
            source,
        })?;

        let renderer = Renderer::load(&self.layout.root)?;
        let posts = self.layout.discover_posts()?;
        tracing::info!(
            "found {} post(s) in {}",
            posts.len(),
            self.layout.posts_dir().display()
        );

        let ctx = BuildContext {
            layout: &self.layout,
            output_dir: &self.output_dir,
            config: &self.config,
            renderer: &renderer,
        };

        let index = build_index(&ctx, &posts, cache)?;
        let post_report = build_posts(&ctx, &posts, &self.converter, cache).await?;

        let mut failed = post_report.failed;
        for id in index.failed {
            if !failed.contains(&id) {
                failed.push(id);
            }
        }

        tracing::debug!(
            cached = cache.len(),
            extractions = cache.extractions(),
            warnings = cache.warnings(),
            "metadata cache"
        );

        Ok(BuildReport {
            output_dir: self.output_dir.clone(),
            listed: index.listed,
            written: post_report.written,
            skipped: post_report.skipped,
            failed,
            assets_copied: index.assets_copied + post_report.assets_copied,
        })
    }
}

/// Write a generated file.
pub fn write_output(path: &Path, contents: &str) -> Result<(), BuildError> {
    std::fs::write(path, contents).map_err(|source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    })
}
