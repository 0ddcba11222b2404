use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail};

use crate::{
    NewArgs,
    build::{POST_SOURCE, POSTS_DIR},
};

pub fn run(args: &NewArgs) -> Result<(), anyhow::Error> {
    let today = chrono::Local::now().date_naive();
    let path = create_post(&args.source, &args.title, today)?;

    tracing::info!("created {}", path.display());
    Ok(())
}

/// Create `posts/<slug>/post.md` with a frontmatter block for `title`.
fn create_post(
    source: &Path,
    title: &str,
    date: chrono::NaiveDate,
) -> Result<PathBuf, anyhow::Error> {
    if !source.is_dir() {
        return Err(anyhow!(
            "Directory does not exist: {path}",
            path = source.display()
        ));
    }

    let title = title.trim();
    if title.contains(['\n', '\r']) {
        bail!("post title must fit on one line");
    }

    let slug = slug::slugify(title);
    if slug.is_empty() {
        bail!("can't derive a directory name from title `{title}`");
    }

    let dir = source.join(POSTS_DIR).join(&slug);
    let path = dir.join(POST_SOURCE);
    if path.exists() {
        bail!("{} already exists", path.display());
    }

    std::fs::create_dir_all(&dir)?;
    std::fs::write(
        &path,
        format!(
            "---\ntitle: {title}\ndate: {date}\n---\n\n",
            date = date.format("%Y-%m-%d")
        ),
    )?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    #[test]
    fn test_creates_post_with_frontmatter() {
        let dir = TempDir::new().unwrap();

        let path = create_post(dir.path(), "Hello, World!", date()).unwrap();

        assert_eq!(path, dir.path().join("posts/hello-world/post.md"));
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "---\ntitle: Hello, World!\ndate: 2024-05-17\n---\n\n"
        );
    }

    #[test]
    fn test_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = create_post(dir.path(), "Twice", date()).unwrap();
        std::fs::write(&path, "edited").unwrap();

        assert!(create_post(dir.path(), "Twice", date()).is_err());
        assert_eq!(std::fs::read_to_string(path).unwrap(), "edited");
    }

    #[test]
    fn test_rejects_title_without_slug() {
        let dir = TempDir::new().unwrap();
        assert!(create_post(dir.path(), "!!!", date()).is_err());
    }

    #[test]
    fn test_rejects_missing_source() {
        let dir = TempDir::new().unwrap();
        assert!(create_post(&dir.path().join("missing"), "Title", date()).is_err());
    }
}
