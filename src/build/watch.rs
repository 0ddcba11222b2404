//! File watching for automatic rebuilds.
//!
//! Uses `notify-debouncer-full` to watch the source directory. Events are
//! forwarded over a tokio channel so the rebuild loop can await them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Config as NotifyConfig, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{
    DebounceEventResult, Debouncer, RecommendedCache, new_debouncer, new_debouncer_opt,
};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

const DEBOUNCE: Duration = Duration::from_millis(300);
const POLL_INTERVAL: Duration = Duration::from_millis(1000);

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),
}

// =============================================================================
// Watch events
// =============================================================================

/// Events sent from the file watcher.
#[derive(Debug)]
pub enum WatchEvent {
    /// Files that affect the build changed.
    FilesChanged(Vec<PathBuf>),
    /// Watcher error occurred.
    Error(String),
}

// =============================================================================
// Path filtering
// =============================================================================

/// Decides which changed paths should trigger a rebuild.
#[derive(Debug, Clone)]
pub struct PathFilter {
    source_root: PathBuf,
    output_dir: PathBuf,
}

impl PathFilter {
    pub fn new(source_root: &Path, output_dir: &Path) -> Self {
        Self {
            source_root: absolute(source_root),
            output_dir: absolute(output_dir),
        }
    }

    /// Returns true if a change to `path` needs a rebuild.
    pub fn is_relevant(&self, path: &Path) -> bool {
        // The output may live inside the source; writing it must not loop
        if path.starts_with(&self.output_dir) {
            return false;
        }

        let Ok(relative) = path.strip_prefix(&self.source_root) else {
            return false;
        };

        // Skip hidden files and directories (editor swap files, .git, ...)
        !relative
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

// =============================================================================
// File watcher
// =============================================================================

/// The debouncer backing a [`FileWatcher`], kept alive for its lifetime.
enum Backend {
    Native(#[allow(dead_code)] Debouncer<RecommendedWatcher, RecommendedCache>),
    Polling(#[allow(dead_code)] Debouncer<PollWatcher, RecommendedCache>),
}

/// Watches a blog source recursively.
pub struct FileWatcher {
    _backend: Backend,
    rx: UnboundedReceiver<WatchEvent>,
}

impl FileWatcher {
    /// Start watching `source_root`. With `poll`, files are polled instead of
    /// relying on native notifications (network filesystems, containers).
    pub fn new(source_root: &Path, filter: PathFilter, poll: bool) -> Result<Self, WatchError> {
        let (tx, rx) = unbounded_channel();

        let callback = move |result: DebounceEventResult| match result {
            Ok(events) => {
                let mut changed: Vec<PathBuf> = events
                    .iter()
                    .filter(|event| is_relevant_event(&event.kind))
                    .flat_map(|event| event.paths.iter())
                    .filter(|path| filter.is_relevant(path))
                    .cloned()
                    .collect();
                changed.sort();
                changed.dedup();

                if !changed.is_empty() {
                    let _ = tx.send(WatchEvent::FilesChanged(changed));
                }
            }
            Err(errors) => {
                for e in errors {
                    let _ = tx.send(WatchEvent::Error(e.to_string()));
                }
            }
        };

        let backend = if poll {
            let notify_config = NotifyConfig::default().with_poll_interval(POLL_INTERVAL);
            let mut debouncer = new_debouncer_opt::<_, PollWatcher, RecommendedCache>(
                DEBOUNCE,
                None,
                callback,
                RecommendedCache::default(),
                notify_config,
            )?;
            debouncer.watch(source_root, RecursiveMode::Recursive)?;
            Backend::Polling(debouncer)
        } else {
            let mut debouncer = new_debouncer(DEBOUNCE, None, callback)?;
            debouncer.watch(source_root, RecursiveMode::Recursive)?;
            Backend::Native(debouncer)
        };

        Ok(Self {
            _backend: backend,
            rx,
        })
    }

    /// Wait for the next batch of changes.
    pub async fn recv(&mut self) -> Option<WatchEvent> {
        self.rx.recv().await
    }
}

/// Check if an event kind is relevant for rebuilds.
fn is_relevant_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_ignores_output_inside_source() {
        let filter = PathFilter::new(Path::new("/blog"), Path::new("/blog/dist"));

        assert!(!filter.is_relevant(Path::new("/blog/dist/index.html")));
        assert!(filter.is_relevant(Path::new("/blog/posts/a/post.md")));
        assert!(filter.is_relevant(Path::new("/blog/post.template")));
    }

    #[test]
    fn test_filter_ignores_hidden_paths() {
        let filter = PathFilter::new(Path::new("/blog"), Path::new("/out"));

        assert!(!filter.is_relevant(Path::new("/blog/.git/HEAD")));
        assert!(!filter.is_relevant(Path::new("/blog/posts/a/.post.md.swp")));
    }

    #[test]
    fn test_filter_ignores_paths_outside_source() {
        let filter = PathFilter::new(Path::new("/blog"), Path::new("/out"));

        assert!(!filter.is_relevant(Path::new("/elsewhere/post.md")));
    }

    #[test]
    fn test_relevant_event_kinds() {
        use notify::event::{AccessKind, CreateKind, DataChange};

        assert!(is_relevant_event(&EventKind::Create(CreateKind::File)));
        assert!(is_relevant_event(&EventKind::Modify(ModifyKind::Data(
            DataChange::Content
        ))));
        assert!(!is_relevant_event(&EventKind::Access(AccessKind::Any)));
    }
}
