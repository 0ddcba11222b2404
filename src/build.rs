mod assets;
mod builder;
mod cache;
mod context;
mod convert;
mod frontmatter;
mod index;
mod posts;
mod render;
mod source;
mod staleness;
mod watch;

pub use builder::{BuildReport, Builder};
pub use cache::MetadataCache;
pub use source::{POST_SOURCE, POSTS_DIR};
pub use watch::{FileWatcher, PathFilter, WatchEvent};
