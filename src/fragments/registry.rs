//! # Fragment registry: change detection by modification time.
//!
//! Keeps every fragment the scanner has seen, keyed by its canonical path.
//!
//! ## Rules
//! - a path is tracked at most once;
//! - an observation with an equal or older modification time is ignored;
//! - a file that fails to parse is still tracked (no topics) so an unchanged broken
//!   file is not re-parsed on every tick;
//! - entries whose file disappeared are dropped by [`FragmentRegistry::keep_valid`].
//!
//! The registry has no internal locking; it is owned by the
//! [`Reconciler`](crate::Reconciler), which serializes every access.

use std::collections::BTreeMap;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};

use super::model::Fragment;
use super::parse::parse_file;
use crate::error::FragmentError;

/// Path → fragment map with modification-time change detection.
#[derive(Debug, Default)]
pub struct FragmentRegistry {
    fragments: BTreeMap<PathBuf, Fragment>,
}

impl FragmentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an observation of a fragment file.
    ///
    /// - `observed`: path the walk found (may be a link); its directory becomes the
    ///   fragment's owning directory.
    /// - `canonical`: symlink-resolved path; the registry key and the file parsed.
    /// - `metadata`: metadata of `canonical`.
    ///
    /// Returns `Ok(true)` if a new or newer fragment was parsed, `Ok(false)` if the
    /// observation was not newer than the tracked one. A parse failure is returned as
    /// `Err` after the path has been recorded with no topics.
    pub fn add(
        &mut self,
        observed: &Path,
        canonical: &Path,
        metadata: &Metadata,
    ) -> Result<bool, FragmentError> {
        let modified = metadata.modified()?;
        if let Some(existing) = self.fragments.get(canonical) {
            if modified <= existing.modified {
                return Ok(false);
            }
        }

        let (topics, outcome) = match parse_file(canonical) {
            Ok(topics) => (topics, Ok(true)),
            Err(err) => (BTreeMap::new(), Err(err)),
        };
        self.fragments.insert(
            canonical.to_path_buf(),
            Fragment {
                path: canonical.to_path_buf(),
                modified,
                directory: owning_directory(observed),
                topics,
            },
        );
        outcome
    }

    /// Drops every fragment whose file no longer exists.
    ///
    /// Returns true if anything was dropped.
    pub fn keep_valid(&mut self) -> bool {
        !self.evict_missing().is_empty()
    }

    /// Drops every fragment whose file no longer exists and returns their paths.
    ///
    /// Only `NotFound` evicts; other stat errors (permissions, I/O) keep the entry.
    pub fn evict_missing(&mut self) -> Vec<PathBuf> {
        let missing: Vec<PathBuf> = self
            .fragments
            .keys()
            .filter(|path| {
                matches!(std::fs::metadata(path), Err(e) if e.kind() == io::ErrorKind::NotFound)
            })
            .cloned()
            .collect();
        for path in &missing {
            self.fragments.remove(path);
        }
        missing
    }

    /// Returns the fragment tracked under `canonical`.
    pub fn get(&self, canonical: &Path) -> Option<&Fragment> {
        self.fragments.get(canonical)
    }

    /// Iterates fragments in path order.
    pub fn iter(&self) -> impl Iterator<Item = &Fragment> {
        self.fragments.values()
    }

    /// Number of tracked fragments (including invalid ones).
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Returns true if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

fn owning_directory(observed: &Path) -> PathBuf {
    let parent = match observed.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::path::absolute(parent).unwrap_or_else(|_| parent.to_path_buf())
}
