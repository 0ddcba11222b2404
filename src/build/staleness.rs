//! Timestamp-based staleness checks.
//!
//! An output is up to date when it exists and none of its sources has a
//! modification time strictly later than its own. Equal timestamps count as
//! up to date.

use std::path::Path;
use std::time::SystemTime;

/// Returns true if `destination` must be regenerated from `sources`.
///
/// A missing destination is always stale. Any source whose modification time
/// cannot be read also makes the destination stale, so an unreadable input
/// never causes a build to be silently skipped.
pub fn is_stale<I, P>(destination: &Path, sources: I) -> bool
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let Some(destination_mtime) = modified(destination) else {
        return true;
    };

    sources.into_iter().any(|source| match modified(source.as_ref()) {
        Some(source_mtime) => source_mtime > destination_mtime,
        None => true,
    })
}

/// Last modification time of a file, or `None` if it doesn't exist.
pub fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::fs::File;
    use std::time::Duration;

    use tempfile::TempDir;

    /// Write `contents` to `path` and pin its modification time.
    pub(crate) fn write_with_mtime(path: &Path, contents: &str, mtime: SystemTime) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
        set_mtime(path, mtime);
    }

    pub(crate) fn set_mtime(path: &Path, mtime: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
    }

    pub(crate) fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
    }

    #[test]
    fn test_missing_destination_is_stale() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("post.md");
        write_with_mtime(&source, "x", at(0));

        assert!(is_stale(&dir.path().join("index.html"), [&source]));
        assert!(is_stale(&dir.path().join("index.html"), Vec::<&Path>::new()));
    }

    #[test]
    fn test_newer_source_is_stale() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("post.md");
        let destination = dir.path().join("index.html");
        write_with_mtime(&destination, "x", at(10));
        write_with_mtime(&source, "x", at(20));

        assert!(is_stale(&destination, [&source]));
    }

    #[test]
    fn test_older_source_is_up_to_date() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("post.md");
        let destination = dir.path().join("index.html");
        write_with_mtime(&source, "x", at(10));
        write_with_mtime(&destination, "x", at(20));

        assert!(!is_stale(&destination, [&source]));
    }

    #[test]
    fn test_equal_timestamps_are_up_to_date() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("post.md");
        let destination = dir.path().join("index.html");
        write_with_mtime(&source, "x", at(10));
        write_with_mtime(&destination, "x", at(10));

        assert!(!is_stale(&destination, [&source]));
    }

    #[test]
    fn test_any_newer_source_is_stale() {
        let dir = TempDir::new().unwrap();
        let post = dir.path().join("post.md");
        let template = dir.path().join("post.template");
        let destination = dir.path().join("index.html");
        write_with_mtime(&post, "x", at(5));
        write_with_mtime(&destination, "x", at(10));
        write_with_mtime(&template, "x", at(15));

        assert!(is_stale(&destination, [&post, &template]));
    }
}
