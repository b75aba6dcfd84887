//! # Directory walk producing fragment discoveries.
//!
//! ```text
//! visit(dir)
//!   ├─ canonical(dir) already visited?  → stop (symlink cycle)
//!   └─ for entry in walkdir(dir, no follow):
//!        ├─ error                    → warn, continue
//!        ├─ directory                → walked by walkdir itself
//!        ├─ name == kafkafeeder.yaml → resolve links → Discovery
//!        └─ other link to directory  → visit(resolved)
//! ```
//!
//! ## Rules
//! - one redirection per entry: a link is resolved to its final target, and only
//!   the target is walked; links found inside it are again single entries;
//! - the walk never fails as a whole, it returns whatever it could read;
//! - blocking; callers on the async runtime go through `spawn_blocking`.

use std::collections::HashSet;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::symlink;
use crate::fragments::FRAGMENT_FILE_NAME;

/// A fragment file found by the walk.
#[derive(Debug)]
pub struct Discovery {
    /// Path the walk reached the file through (may be a link).
    pub observed: PathBuf,
    /// Link-resolved path of the file.
    pub canonical: PathBuf,
    /// Metadata of `canonical`.
    pub metadata: Metadata,
}

/// Walks `root` recursively and returns every fragment file found.
pub fn walk(root: &Path) -> Vec<Discovery> {
    let mut visited = HashSet::new();
    let mut found = Vec::new();
    visit(root, &mut visited, &mut found);
    found
}

fn visit(dir: &Path, visited: &mut HashSet<PathBuf>, found: &mut Vec<Discovery>) {
    match fs::canonicalize(dir) {
        Ok(real) => {
            if !visited.insert(real) {
                debug!(dir = %dir.display(), "directory already walked, skipping");
                return;
            }
        }
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "cannot walk directory");
            return;
        }
    }

    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }

        let lstat = match entry.metadata() {
            Ok(meta) => meta,
            Err(err) => {
                warn!(path = %entry.path().display(), error = %err, "cannot stat entry");
                continue;
            }
        };
        let is_fragment = entry.file_name() == FRAGMENT_FILE_NAME;
        if !is_fragment && !lstat.file_type().is_symlink() {
            continue;
        }

        let (canonical, metadata) = match symlink::resolve(entry.path(), lstat) {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(path = %entry.path().display(), error = %err, "cannot resolve link");
                continue;
            }
        };

        if metadata.is_dir() {
            visit(&canonical, visited, found);
        } else if is_fragment {
            found.push(Discovery {
                observed: entry.path().to_path_buf(),
                canonical,
                metadata,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;

    fn fragment(dir: &Path) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let path = dir.join(FRAGMENT_FILE_NAME);
        fs::write(&path, "topics: {}\n").unwrap();
        path
    }

    fn observed(found: &[Discovery]) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = found.iter().map(|d| d.observed.clone()).collect();
        paths.sort();
        paths
    }

    #[test]
    fn test_finds_fragments_at_any_depth_and_ignores_other_files() {
        let root = tempfile::tempdir().unwrap();
        let a = fragment(root.path());
        let b = fragment(&root.path().join("x/y/z"));
        fs::write(root.path().join("x/other.yaml"), "topics: {}\n").unwrap();

        let found = walk(root.path());
        assert_eq!(observed(&found), vec![a, b]);
        assert!(found.iter().all(|d| d.observed == d.canonical));
    }

    #[test]
    fn test_symlinked_fragment_keeps_observed_path() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let target = fragment(outside.path());
        let app = root.path().join("app");
        fs::create_dir(&app).unwrap();
        let link = app.join(FRAGMENT_FILE_NAME);
        symlink(&target, &link).unwrap();

        let found = walk(root.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].observed, link);
        assert_eq!(found[0].canonical, target);
        assert!(found[0].metadata.is_file());
    }

    #[test]
    fn test_symlinked_directory_is_walked() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let target = fragment(&outside.path().join("service"));
        symlink(outside.path().join("service"), root.path().join("service")).unwrap();

        let found = walk(root.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].canonical, target);
    }

    #[test]
    fn test_nested_links_are_one_redirection_each() {
        // root/first -> A, A/second -> B, B holds the fragment.
        let root = tempfile::tempdir().unwrap();
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let target = fragment(b.path());
        symlink(a.path(), root.path().join("first")).unwrap();
        symlink(b.path(), a.path().join("second")).unwrap();

        let found = walk(root.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].canonical, target);
    }

    #[test]
    fn test_symlink_cycle_terminates() {
        let root = tempfile::tempdir().unwrap();
        let inner = root.path().join("inner");
        let target = fragment(&inner);
        symlink(root.path(), inner.join("up")).unwrap();
        symlink(&inner, inner.join("self")).unwrap();

        let found = walk(root.path());
        assert!(found.iter().all(|d| d.canonical == target));
        assert!(!found.is_empty());
    }

    #[test]
    fn test_dangling_entries_are_skipped() {
        let root = tempfile::tempdir().unwrap();
        let kept = fragment(&root.path().join("ok"));
        let broken = root.path().join("broken");
        fs::create_dir(&broken).unwrap();
        symlink(root.path().join("nowhere"), broken.join(FRAGMENT_FILE_NAME)).unwrap();

        let found = walk(root.path());
        assert_eq!(observed(&found), vec![kept]);
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let root = tempfile::tempdir().unwrap();
        assert!(walk(&root.path().join("absent")).is_empty());
    }
}
