//! Home page generation.
//!
//! The home page lists every post, so it is regenerated on every build
//! regardless of timestamps.

use chrono::NaiveDateTime;

use crate::config::CONFIG_FILE;

use super::assets::copy_files;
use super::builder::{BuildError, write_output};
use super::cache::MetadataCache;
use super::context::BuildContext;
use super::render::{HOME_TEMPLATE, HomePage, POST_TEMPLATE, format_date};
use super::source::PostDir;

/// Name of the home page in the output root.
pub const INDEX_FILE: &str = "index.html";

/// A post as listed on the home page.
#[derive(Debug, Clone, PartialEq)]
pub struct PostPreview {
    pub title: String,
    pub formatted_date: String,
    pub relative_url: String,
    /// Sort key; the formatted date is for display only.
    pub date: NaiveDateTime,
}

/// What the index step did.
#[derive(Debug, Default)]
pub struct IndexReport {
    /// Posts listed on the home page
    pub listed: usize,
    /// Posts left out because their frontmatter couldn't be read
    pub failed: Vec<String>,
    /// Top-level static files copied
    pub assets_copied: usize,
}

/// Render `index.html` from all posts and copy the top-level static files.
pub fn build_index(
    ctx: &BuildContext<'_>,
    posts: &[PostDir],
    cache: &mut MetadataCache,
) -> Result<IndexReport, BuildError> {
    let mut report = IndexReport::default();

    let mut previews = Vec::with_capacity(posts.len());
    for post in posts {
        let metadata = match cache.metadata(&ctx.layout.root, &post.id, ctx.base_url()) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::error!(post = %post.id, "left out of the home page: {e}");
                report.failed.push(post.id.clone());
                continue;
            }
        };

        previews.push(PostPreview {
            formatted_date: format_date(&metadata.date, ctx.date_format())?,
            title: metadata.title,
            relative_url: post.relative_url(),
            date: metadata.date,
        });
    }

    sort_previews(&mut previews);
    report.listed = previews.len();

    let html = ctx
        .renderer
        .render_home(&HomePage::new(&previews, ctx.base_url()))?;
    write_output(&ctx.output_dir.join(INDEX_FILE), &html)?;

    report.assets_copied = copy_files(
        &ctx.layout.root,
        ctx.output_dir,
        &[HOME_TEMPLATE, POST_TEMPLATE, CONFIG_FILE],
    )
    .map_err(|source| BuildError::Io {
        path: ctx.layout.root.clone(),
        source,
    })?;

    Ok(report)
}

/// Oldest first. Posts with equal dates keep their discovery order.
fn sort_previews(previews: &mut [PostPreview]) {
    previews.sort_by_key(|preview| preview.date);
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;

    use tempfile::TempDir;

    use crate::build::cache::post_source;
    use crate::build::render::Renderer;
    use crate::build::source::SourceLayout;
    use crate::build::staleness::tests::{at, write_with_mtime};
    use crate::config::SiteConfig;

    const HOME: &str = "{% for post in previews %}{{ post.date }} {{ post.title }} {{ post.url }}\n{% endfor %}";

    fn site(root: &Path, posts: &[(&str, &str)]) -> SourceLayout {
        std::fs::write(root.join(HOME_TEMPLATE), HOME).unwrap();
        std::fs::write(root.join(POST_TEMPLATE), "{{ content | safe }}").unwrap();
        std::fs::create_dir_all(root.join("posts")).unwrap();
        for (id, source) in posts {
            write_with_mtime(&post_source(root, id), source, at(0));
        }
        SourceLayout::verify(root).unwrap()
    }

    fn config() -> SiteConfig {
        SiteConfig {
            url: "https://blog.example".to_string(),
            date_format: "%Y-%m-%d".to_string(),
            pandoc: Default::default(),
        }
    }

    #[test]
    fn test_previews_sorted_by_date() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let layout = site(
            src.path(),
            &[
                ("march", "---\ntitle: March\ndate: 2024-03-01\n---\n"),
                ("january", "---\ntitle: January\ndate: 2024-01-15\n---\n"),
                ("february", "---\ntitle: February\ndate: 2024-02-20\n---\n"),
            ],
        );
        let config = config();
        let renderer = Renderer::load(&layout.root).unwrap();
        let ctx = BuildContext {
            layout: &layout,
            output_dir: out.path(),
            config: &config,
            renderer: &renderer,
        };
        let posts = layout.discover_posts().unwrap();
        let mut cache = MetadataCache::new();

        let report = build_index(&ctx, &posts, &mut cache).unwrap();
        assert_eq!(report.listed, 3);

        let html = std::fs::read_to_string(out.path().join(INDEX_FILE)).unwrap();
        let titles: Vec<&str> = html
            .lines()
            .map(|line| line.split(' ').nth(1).unwrap())
            .collect();
        assert_eq!(titles, vec!["January", "February", "March"]);
        assert!(html.starts_with("2024-01-15 January posts&#x2F;january&#x2F;"));
    }

    #[test]
    fn test_broken_frontmatter_is_left_out() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let layout = site(
            src.path(),
            &[
                ("good", "---\ntitle: Good\ndate: 2024-01-01\n---\n"),
                ("bad", "---\nthis is not a pair\n---\n"),
            ],
        );
        let config = config();
        let renderer = Renderer::load(&layout.root).unwrap();
        let ctx = BuildContext {
            layout: &layout,
            output_dir: out.path(),
            config: &config,
            renderer: &renderer,
        };
        let posts = layout.discover_posts().unwrap();

        let report = build_index(&ctx, &posts, &mut MetadataCache::new()).unwrap();

        assert_eq!(report.listed, 1);
        assert_eq!(report.failed, vec!["bad".to_string()]);
    }

    #[test]
    fn test_copies_top_level_assets_except_templates_and_config() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let layout = site(src.path(), &[]);
        std::fs::write(src.path().join("style.css"), "body {}").unwrap();
        std::fs::write(src.path().join(CONFIG_FILE), "url = \"\"").unwrap();
        let config = config();
        let renderer = Renderer::load(&layout.root).unwrap();
        let ctx = BuildContext {
            layout: &layout,
            output_dir: out.path(),
            config: &config,
            renderer: &renderer,
        };

        let report = build_index(&ctx, &[], &mut MetadataCache::new()).unwrap();

        assert_eq!(report.assets_copied, 1);
        assert!(out.path().join("style.css").exists());
        assert!(!out.path().join(HOME_TEMPLATE).exists());
        assert!(!out.path().join(POST_TEMPLATE).exists());
        assert!(!out.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_equal_dates_keep_discovery_order() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut previews: Vec<PostPreview> = ["b", "a", "c"]
            .iter()
            .map(|title| PostPreview {
                title: title.to_string(),
                formatted_date: String::new(),
                relative_url: String::new(),
                date,
            })
            .collect();

        sort_previews(&mut previews);

        let titles: Vec<&str> = previews.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a", "c"]);
    }
}
