use std::path::{Path, PathBuf};

use super::render::{HOME_TEMPLATE, POST_TEMPLATE};

/// Directory holding one subdirectory per post.
pub const POSTS_DIR: &str = "posts";
/// Name of the Markdown source inside a post directory.
pub const POST_SOURCE: &str = "post.md";

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("source path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("source path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("missing {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to read directory {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read directory entry in {}: {source}", path.display())]
    ReadEntry {
        path: PathBuf,
        source: std::io::Error,
    },
}

// =============================================================================
// Source layout
// =============================================================================

/// A blog source directory:
///
/// ```text
/// source/
///   home.template
///   post.template
///   config.toml        (optional)
///   posts/
///     <post-id>/
///       post.md
///       <assets>
/// ```
#[derive(Debug, Clone)]
pub struct SourceLayout {
    pub root: PathBuf,
}

impl SourceLayout {
    /// Check that the source root has the expected layout.
    pub fn verify(root: &Path) -> Result<Self, SourceError> {
        if !root.exists() {
            return Err(SourceError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(SourceError::NotADirectory(root.to_path_buf()));
        }

        for required in [HOME_TEMPLATE, POST_TEMPLATE] {
            let path = root.join(required);
            if !path.is_file() {
                return Err(SourceError::Missing(path));
            }
        }

        let posts = root.join(POSTS_DIR);
        if !posts.is_dir() {
            return Err(SourceError::Missing(posts));
        }

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.root.join(POSTS_DIR)
    }

    pub fn post_template(&self) -> PathBuf {
        self.root.join(POST_TEMPLATE)
    }

    /// All post directories, in directory listing order.
    pub fn discover_posts(&self) -> Result<Vec<PostDir>, SourceError> {
        let posts_dir = self.posts_dir();
        let entries = std::fs::read_dir(&posts_dir).map_err(|source| SourceError::ReadDir {
            path: posts_dir.clone(),
            source,
        })?;

        let mut posts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| SourceError::ReadEntry {
                path: posts_dir.clone(),
                source,
            })?;
            let dir = entry.path();
            if !dir.is_dir() || !dir.join(POST_SOURCE).is_file() {
                continue;
            }

            let Some(id) = entry.file_name().to_str().map(str::to_string) else {
                tracing::warn!(path = %dir.display(), "skipping post with a non UTF-8 name");
                continue;
            };
            posts.push(PostDir { id, dir });
        }

        Ok(posts)
    }
}

/// A discovered post: a directory under `posts/` containing `post.md`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDir {
    /// Directory name, also the post's URL segment.
    pub id: String,
    pub dir: PathBuf,
}

impl PostDir {
    pub fn source(&self) -> PathBuf {
        self.dir.join(POST_SOURCE)
    }

    /// URL of the post relative to the site root.
    pub fn relative_url(&self) -> String {
        format!("{POSTS_DIR}/{}/", self.id)
    }
}
