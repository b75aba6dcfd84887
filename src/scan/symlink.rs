//! Symlink chain resolution.

use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};

/// Upper bound on links followed for a single path (matches Linux `MAXSYMLINKS`).
const MAX_HOPS: usize = 40;

/// Follows the symlink chain starting at `path` until a non-link is reached.
///
/// `metadata` must be the `lstat` result for `path`. Relative link targets are
/// resolved against the directory of the link that holds them. Returns the first
/// non-link path together with its metadata.
///
/// Fails when a link cannot be read, a target cannot be stat'ed (dangling link), or
/// the chain is longer than the kernel would follow.
pub fn resolve(path: &Path, metadata: Metadata) -> io::Result<(PathBuf, Metadata)> {
    let mut path = path.to_path_buf();
    let mut metadata = metadata;
    let mut hops = 0;

    while metadata.file_type().is_symlink() {
        if hops == MAX_HOPS {
            return Err(io::Error::other(format!(
                "too many levels of symbolic links: {}",
                path.display()
            )));
        }
        hops += 1;

        let target = fs::read_link(&path)?;
        path = if target.is_absolute() {
            target
        } else {
            match path.parent() {
                Some(dir) => dir.join(target),
                None => target,
            }
        };
        metadata = fs::symlink_metadata(&path)?;
    }
    Ok((path, metadata))
}
