//! Post page generation.
//!
//! Each post moves through these steps:
//!
//! 1. Its static files are copied next to the output page.
//! 2. If `index.html` is newer than both `post.md` and `post.template`, the
//!    post is skipped.
//! 3. `post.md` is converted to HTML. A failed conversion marks the post as
//!    failed and leaves any previous output untouched.
//! 4. The frontmatter is read (or taken from the cache), the post template is
//!    rendered and `index.html` is written. A render or write error marks the
//!    post as failed.
//!
//! A failing post never stops the others.

use std::collections::BTreeSet;

use super::assets::copy_files;
use super::builder::{BuildError, write_output};
use super::cache::MetadataCache;
use super::context::BuildContext;
use super::convert::{ConversionError, Converter};
use super::render::PostPage;
use super::source::{POST_SOURCE, PostDir};
use super::staleness::is_stale;

/// Name of a post's page inside its output directory.
pub const POST_PAGE: &str = "index.html";

const PANDOC_EXIT_CODES: &str = "https://pandoc.org/MANUAL.html#exit-codes";

/// How a single post ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    /// Converted, rendered and written
    Written,
    /// Output already up to date
    Skipped,
    /// Conversion or frontmatter failed; previous output kept
    Failed,
}

/// What the post step did.
#[derive(Debug, Default)]
pub struct PostsReport {
    pub written: usize,
    pub skipped: usize,
    pub failed: Vec<String>,
    /// Post static files copied
    pub assets_copied: usize,
}

impl PostsReport {
    fn record(&mut self, post: &PostDir, outcome: PostOutcome) {
        match outcome {
            PostOutcome::Written => self.written += 1,
            PostOutcome::Skipped => self.skipped += 1,
            PostOutcome::Failed => self.failed.push(post.id.clone()),
        }
    }
}

/// Build every post, one after the other.
pub async fn build_posts<C: Converter>(
    ctx: &BuildContext<'_>,
    posts: &[PostDir],
    converter: &C,
    cache: &mut MetadataCache,
) -> Result<PostsReport, BuildError> {
    let mut report = PostsReport::default();
    let extra_keys = extra_keys(ctx, posts, cache);

    for post in posts {
        let outcome = build_post(ctx, post, converter, cache, &extra_keys, &mut report).await?;
        report.record(post, outcome);
    }

    Ok(report)
}

/// Every `extra` key used by any post, so templates can reference a key that
/// only some posts set.
fn extra_keys(
    ctx: &BuildContext<'_>,
    posts: &[PostDir],
    cache: &mut MetadataCache,
) -> BTreeSet<String> {
    posts
        .iter()
        // Posts with broken frontmatter are reported when they are built
        .filter_map(|post| cache.metadata(&ctx.layout.root, &post.id, ctx.base_url()).ok())
        .flat_map(|metadata| metadata.extra.into_keys())
        .collect()
}

async fn build_post<C: Converter>(
    ctx: &BuildContext<'_>,
    post: &PostDir,
    converter: &C,
    cache: &mut MetadataCache,
    extra_keys: &BTreeSet<String>,
    report: &mut PostsReport,
) -> Result<PostOutcome, BuildError> {
    let output_dir = ctx.post_output_dir(post);
    std::fs::create_dir_all(&output_dir).map_err(|source| BuildError::Io {
        path: output_dir.clone(),
        source,
    })?;

    report.assets_copied +=
        copy_files(&post.dir, &output_dir, &[POST_SOURCE]).map_err(|source| BuildError::Io {
            path: post.dir.clone(),
            source,
        })?;

    let source = post.source();
    let page_path = output_dir.join(POST_PAGE);
    if !is_stale(&page_path, [&source, &ctx.layout.post_template()]) {
        tracing::debug!(post = %post.id, "up to date");
        return Ok(PostOutcome::Skipped);
    }

    let content = match converter.convert(&source).await {
        Ok(content) => content,
        Err(e) => {
            report_conversion_error(post, &e);
            return Ok(PostOutcome::Failed);
        }
    };

    let metadata = match cache.metadata(&ctx.layout.root, &post.id, ctx.base_url()) {
        Ok(metadata) => metadata,
        Err(e) => {
            tracing::error!(post = %post.id, "{e}");
            return Ok(PostOutcome::Failed);
        }
    };

    let written = PostPage::new(content, &metadata, &ctx.post_url(post), ctx.date_format())
        .and_then(|page| ctx.renderer.render_post(&page.with_extra_keys(extra_keys)))
        .map_err(BuildError::from)
        .and_then(|html| write_output(&page_path, &html));

    if let Err(e) = written {
        tracing::error!(post = %post.id, "{e}");
        return Ok(PostOutcome::Failed);
    }

    tracing::info!(post = %post.id, "built {}", page_path.display());
    Ok(PostOutcome::Written)
}

fn report_conversion_error(post: &PostDir, error: &ConversionError) {
    match error {
        ConversionError::Failed { .. } => tracing::error!(
            post = %post.id,
            "{error}\nsee {PANDOC_EXIT_CODES} for what the exit code means"
        ),
        _ => tracing::error!(post = %post.id, "{error}"),
    }
}
