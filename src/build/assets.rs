//! Flat static file copying.
//!
//! Only regular files directly inside a directory are copied; subdirectories
//! are not descended into. Files deleted from the source stay in the output
//! until a clean build.

use std::path::Path;

use super::staleness::is_stale;

/// Copy every file in `src` to `dst` except the names in `exceptions`.
///
/// Files whose copy is already up to date are left alone. Returns the number
/// of files copied.
pub fn copy_files(src: &Path, dst: &Path, exceptions: &[&str]) -> std::io::Result<usize> {
    let mut copied = 0;

    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        if !src_path.is_file() {
            continue;
        }

        let name = entry.file_name();
        if exceptions.iter().any(|exception| name == *exception) {
            continue;
        }

        let dst_path = dst.join(&name);
        if !is_stale(&dst_path, [&src_path]) {
            continue;
        }

        std::fs::copy(&src_path, &dst_path)?;
        tracing::debug!(from = %src_path.display(), to = %dst_path.display(), "copied");
        copied += 1;
    }

    Ok(copied)
}
