//! Frontmatter extraction for post sources.
//!
//! Frontmatter is a block of `key: value` lines delimited by `---` at the very
//! top of `post.md`:
//!
//! ```markdown
//! ---
//! title: My Post
//! date: 2024-01-02
//! description: A short summary
//! image: cover.png
//! ---
//!
//! # Content starts here
//! ```
//!
//! Only flat string values are supported. Unknown keys are kept in
//! [`PostMetadata::extra`].

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

/// Title used when a post doesn't declare one.
pub const TITLE_PLACEHOLDER: &str = "Untitled";

const DELIMITER: &str = "---";
const DATE_FORMAT: &str = "%Y-%m-%d";
const URL_SCHEMES: [&str; 2] = ["http://", "https://"];

#[derive(thiserror::Error, Debug)]
pub enum FrontmatterError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}:{line}: expected `key: value`, found `{content}`", path.display())]
    MalformedLine {
        path: PathBuf,
        line: usize,
        content: String,
    },

    #[error("{}: invalid date `{value}`, expected YYYY-MM-DD", path.display())]
    InvalidDate { path: PathBuf, value: String },
}

/// Metadata of a single post, with fallbacks already applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PostMetadata {
    pub title: String,
    pub date: NaiveDateTime,
    pub description: Option<String>,
    /// Absolute image URL (relative values are resolved against the post).
    pub image: Option<String>,
    /// Frontmatter keys that aren't recognized, verbatim.
    pub extra: BTreeMap<String, String>,
}

/// A recognized frontmatter field that was absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Title,
    Date,
    Description,
    Image,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissingField::Title => "title",
            MissingField::Date => "date",
            MissingField::Description => "description",
            MissingField::Image => "image",
        };
        f.write_str(name)
    }
}

/// The outcome of reading a post's frontmatter.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub metadata: PostMetadata,
    /// One entry per recognized field that had to be defaulted.
    pub missing: Vec<MissingField>,
}

/// Fields as they appear in the source, before defaults.
#[derive(Debug, Default)]
struct RawFrontmatter {
    title: Option<String>,
    date: Option<String>,
    description: Option<String>,
    image: Option<String>,
    extra: BTreeMap<String, String>,
}

/// Read the frontmatter of `source` and apply fallbacks.
///
/// The post identifier is the name of the directory containing `source`;
/// it is used to resolve relative `image` values against `base_url`.
/// Defaulted fields are listed in [`Extraction::missing`]; see
/// [`warn_missing`] for reporting them.
pub fn extract(source: &Path, base_url: &str) -> Result<Extraction, FrontmatterError> {
    let file = File::open(source).map_err(|e| read_error(source, e))?;
    let raw = parse(source, BufReader::new(file))?;
    let post_id = post_id(source);

    let mut missing = Vec::new();

    let title = match raw.title {
        Some(title) => title,
        None => {
            missing.push(MissingField::Title);
            TITLE_PLACEHOLDER.to_string()
        }
    };

    let date = match raw.date {
        Some(value) => NaiveDate::parse_from_str(&value, DATE_FORMAT)
            .map(|d| d.and_time(chrono::NaiveTime::MIN))
            .map_err(|_| FrontmatterError::InvalidDate {
                path: source.to_path_buf(),
                value,
            })?,
        None => {
            missing.push(MissingField::Date);
            modified_local(source)?
        }
    };

    if raw.description.is_none() {
        missing.push(MissingField::Description);
    }

    let image = match raw.image {
        Some(value) => Some(resolve_image(&value, base_url, &post_id)),
        None => {
            missing.push(MissingField::Image);
            None
        }
    };

    Ok(Extraction {
        metadata: PostMetadata {
            title,
            date,
            description: raw.description,
            image,
            extra: raw.extra,
        },
        missing,
    })
}

/// Log one warning per defaulted field of `source`.
pub fn warn_missing(source: &Path, missing: &[MissingField]) {
    for field in missing {
        tracing::warn!(
            path = %source.display(),
            "post has no `{field}` in its frontmatter{}",
            fallback_note(*field)
        );
    }
}

/// Scan the frontmatter block line by line.
///
/// Stops at the first line if it isn't the opening delimiter, and at the
/// closing delimiter otherwise. The body is never read.
fn parse(path: &Path, reader: impl BufRead) -> Result<RawFrontmatter, FrontmatterError> {
    let mut raw = RawFrontmatter::default();
    let mut in_block = false;

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| read_error(path, e))?;
        let line = line.trim();

        if line == DELIMITER {
            if in_block {
                break;
            }
            in_block = true;
            continue;
        }

        if !in_block {
            break;
        }

        let Some((key, value)) = line.split_once(':') else {
            return Err(FrontmatterError::MalformedLine {
                path: path.to_path_buf(),
                line: index + 1,
                content: line.to_string(),
            });
        };

        let key = key.trim();
        let value = value.trim().to_string();
        match key {
            "title" => raw.title = Some(value),
            "date" => raw.date = Some(value),
            "description" => raw.description = Some(value),
            "image" => raw.image = Some(value),
            _ => {
                raw.extra.insert(key.to_string(), value);
            }
        }
    }

    Ok(raw)
}

/// Resolve an image reference against the post's deployed location.
fn resolve_image(value: &str, base_url: &str, post_id: &str) -> String {
    if URL_SCHEMES.iter().any(|scheme| value.starts_with(scheme)) {
        value.to_string()
    } else {
        format!("{base_url}/posts/{post_id}/{value}")
    }
}

/// The post identifier: name of the directory holding the source file.
fn post_id(source: &Path) -> String {
    source
        .parent()
        .and_then(|p| p.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn modified_local(path: &Path) -> Result<NaiveDateTime, FrontmatterError> {
    let mtime = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| read_error(path, e))?;
    Ok(DateTime::<Local>::from(mtime).naive_local())
}

fn fallback_note(field: MissingField) -> &'static str {
    match field {
        MissingField::Title => ", using \"Untitled\"",
        MissingField::Date => ", using the file's modification time",
        MissingField::Description | MissingField::Image => "",
    }
}

fn read_error(path: &Path, source: std::io::Error) -> FrontmatterError {
    FrontmatterError::Read {
        path: path.to_path_buf(),
        source,
    }
}
