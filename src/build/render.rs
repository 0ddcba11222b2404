use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;
use tera::{Context, Tera};

use super::frontmatter::PostMetadata;
use super::index::PostPreview;

/// Template for the home page, at the source root.
pub const HOME_TEMPLATE: &str = "home.template";
/// Template wrapped around every post, at the source root.
pub const POST_TEMPLATE: &str = "post.template";

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("failed to read template {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid date format `{0}`")]
    DateFormat(String),
}

/// Suffix shared by both template names, so Tera autoescapes them.
const TEMPLATE_SUFFIX: &str = ".template";

/// The template renderer, wrapping Tera.
///
/// Both templates are compiled once and reused for every page. Output is
/// HTML-escaped by Tera, so metadata is bound as is and filters see the
/// original text. The converted post body is trusted markup and is written
/// `{{ content | safe }}` in `post.template`.
///
/// Every fixed variable is always bound, empty when absent. Other names
/// need a default, e.g. `{{ extra.author | default(value="") }}`.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// Load `home.template` and `post.template` from the source root.
    pub fn load(source_root: &Path) -> Result<Self, RenderError> {
        let home = read_template(&source_root.join(HOME_TEMPLATE))?;
        let post = read_template(&source_root.join(POST_TEMPLATE))?;
        Self::from_sources(&home, &post)
    }

    /// Compile the two templates from their source text.
    pub fn from_sources(home: &str, post: &str) -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![TEMPLATE_SUFFIX]);
        tera.add_raw_templates(vec![(HOME_TEMPLATE, home), (POST_TEMPLATE, post)])?;
        Ok(Self { tera })
    }

    /// Render a post page.
    pub fn render_post(&self, page: &PostPage) -> Result<String, RenderError> {
        self.render(POST_TEMPLATE, &Context::from_serialize(page)?)
    }

    /// Render the home page.
    pub fn render_home(&self, page: &HomePage) -> Result<String, RenderError> {
        self.render(HOME_TEMPLATE, &Context::from_serialize(page)?)
    }

    fn render(&self, template: &str, context: &Context) -> Result<String, RenderError> {
        Ok(self.tera.render(template, context)?)
    }
}

fn read_template(path: &Path) -> Result<String, RenderError> {
    std::fs::read_to_string(path).map_err(|source| RenderError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Format a date for display, failing on an invalid strftime string.
pub fn format_date(date: &NaiveDateTime, format: &str) -> Result<String, RenderError> {
    let mut formatted = String::new();
    write!(formatted, "{}", date.format(format))
        .map_err(|_| RenderError::DateFormat(format.to_string()))?;
    Ok(formatted)
}

/// Variables bound into `post.template`.
///
/// Absent optional values are bound as empty strings so templates can always
/// reference them.
#[derive(Debug, Serialize)]
pub struct PostPage {
    /// The converted post body, trusted markup.
    pub content: String,
    pub title: String,
    pub date: String,
    pub description: String,
    pub image: String,
    /// Absolute URL of the post.
    pub url: String,
    /// Unrecognized frontmatter keys, available as `extra.<key>`. Keys used
    /// by other posts are bound too, empty.
    pub extra: BTreeMap<String, String>,
}

impl PostPage {
    pub fn new(
        content: String,
        metadata: &PostMetadata,
        url: &str,
        date_format: &str,
    ) -> Result<Self, RenderError> {
        Ok(Self {
            content,
            title: metadata.title.clone(),
            date: format_date(&metadata.date, date_format)?,
            description: metadata.description.clone().unwrap_or_default(),
            image: metadata.image.clone().unwrap_or_default(),
            url: url.to_string(),
            extra: metadata.extra.clone(),
        })
    }

    /// Bind `keys` in `extra` as empty strings where this post lacks them.
    pub fn with_extra_keys(mut self, keys: &BTreeSet<String>) -> Self {
        for key in keys {
            self.extra.entry(key.clone()).or_default();
        }
        self
    }
}

/// Variables bound into `home.template`.
#[derive(Debug, Serialize)]
pub struct HomePage {
    pub previews: Vec<PreviewLink>,
    /// The site's base URL.
    pub url: String,
}

/// One entry of the home page's post list.
#[derive(Debug, Serialize)]
pub struct PreviewLink {
    pub title: String,
    pub date: String,
    pub url: String,
}

impl HomePage {
    pub fn new(previews: &[PostPreview], base_url: &str) -> Self {
        Self {
            previews: previews
                .iter()
                .map(|preview| PreviewLink {
                    title: preview.title.clone(),
                    date: preview.formatted_date.clone(),
                    url: preview.relative_url.clone(),
                })
                .collect(),
            url: base_url.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;

    fn metadata(title: &str) -> PostMetadata {
        PostMetadata {
            title: title.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            description: None,
            image: None,
            extra: BTreeMap::new(),
        }
    }

    fn post_renderer(post: &str) -> Renderer {
        Renderer::from_sources("", post).unwrap()
    }

    #[test]
    fn test_content_is_not_escaped() {
        let renderer = post_renderer("<main>{{ content | safe }}</main>");
        let page = PostPage::new(
            "<p>Hello <em>world</em></p>".to_string(),
            &metadata("T"),
            "",
            "%Y-%m-%d",
        )
        .unwrap();

        assert_eq!(
            renderer.render_post(&page).unwrap(),
            "<main><p>Hello <em>world</em></p></main>"
        );
    }

    #[test]
    fn test_metadata_is_escaped() {
        let renderer = post_renderer("<h1>{{ title }}</h1>");
        let page = PostPage::new(String::new(), &metadata("Tom & <Jerry>"), "", "%Y-%m-%d")
            .unwrap();

        assert_eq!(
            renderer.render_post(&page).unwrap(),
            "<h1>Tom &amp; &lt;Jerry&gt;</h1>"
        );
    }

    #[test]
    fn test_absent_values_render_empty() {
        let renderer = post_renderer("[{{ description }}][{{ image }}]");
        let page = PostPage::new(String::new(), &metadata("T"), "", "%Y-%m-%d").unwrap();

        assert_eq!(renderer.render_post(&page).unwrap(), "[][]");
    }

    #[test]
    fn test_filters_see_unescaped_metadata() {
        let renderer = post_renderer("{{ title | truncate(length=7) }}|{{ title | length }}");
        let page = PostPage::new(String::new(), &metadata("Tom & Jerry"), "", "%Y-%m-%d").unwrap();

        assert_eq!(renderer.render_post(&page).unwrap(), "Tom &amp; J…|11");
    }

    #[test]
    fn test_content_without_safe_is_escaped() {
        let renderer = post_renderer("{{ content }}");
        let page = PostPage::new("<p>x</p>".to_string(), &metadata("T"), "", "%Y-%m-%d").unwrap();

        assert_eq!(renderer.render_post(&page).unwrap(), "&lt;p&gt;x&lt;&#x2F;p&gt;");
    }

    #[test]
    fn test_extra_keys_of_other_posts_render_empty() {
        let renderer = post_renderer("[{{ extra.author }}]");
        let keys = BTreeSet::from(["author".to_string()]);
        let page = PostPage::new(String::new(), &metadata("T"), "", "%Y-%m-%d")
            .unwrap()
            .with_extra_keys(&keys);

        assert_eq!(renderer.render_post(&page).unwrap(), "[]");
    }

    #[test]
    fn test_undefined_name_with_default_renders_empty() {
        let renderer = post_renderer("[{{ extra.mood | default(value=\"\") }}]");
        let page = PostPage::new(String::new(), &metadata("T"), "", "%Y-%m-%d").unwrap();

        assert_eq!(renderer.render_post(&page).unwrap(), "[]");
    }

    #[test]
    fn test_date_uses_format() {
        let renderer = post_renderer("{{ date }}");
        let page = PostPage::new(String::new(), &metadata("T"), "", "%d.%m.%Y").unwrap();

        assert_eq!(renderer.render_post(&page).unwrap(), "02.01.2024");
    }

    #[test]
    fn test_extra_keys_are_available() {
        let renderer = post_renderer("{{ extra.author }}");
        let mut meta = metadata("T");
        meta.extra.insert("author".to_string(), "Jane".to_string());
        let page = PostPage::new(String::new(), &meta, "", "%Y-%m-%d").unwrap();

        assert_eq!(renderer.render_post(&page).unwrap(), "Jane");
    }

    #[test]
    fn test_home_lists_previews() {
        let renderer = Renderer::from_sources(
            "{% for post in previews %}<a href=\"{{ post.url }}\">{{ post.title }}</a>{% endfor %}",
            "",
        )
        .unwrap();
        let previews = vec![PostPreview {
            title: "A < B".to_string(),
            formatted_date: "2024-01-02".to_string(),
            relative_url: "posts/a/".to_string(),
            date: metadata("T").date,
        }];

        assert_eq!(
            renderer.render_home(&HomePage::new(&previews, "")).unwrap(),
            "<a href=\"posts&#x2F;a&#x2F;\">A &lt; B</a>"
        );
    }

    #[test]
    fn test_syntax_error_is_reported() {
        assert!(matches!(
            Renderer::from_sources("{% for %}", ""),
            Err(RenderError::Template(_))
        ));
    }

    #[test]
    fn test_invalid_date_format() {
        let date = metadata("T").date;
        assert!(matches!(
            format_date(&date, "%Q"),
            Err(RenderError::DateFormat(_))
        ));
    }
}
