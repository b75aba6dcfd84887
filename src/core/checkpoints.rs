//! Startup restore of worker checkpoints into the journal directory.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info};

/// Copies every regular file directly inside `checkpoint_dir` into `journal_dir`,
/// overwriting files of the same name. Subdirectories are left alone, and a missing
/// `checkpoint_dir` means there is nothing to restore.
///
/// Returns the number of files copied.
pub fn restore(checkpoint_dir: &Path, journal_dir: &Path) -> io::Result<usize> {
    info!(from = %checkpoint_dir.display(), to = %journal_dir.display(), "restoring checkpoints");
    let entries = match fs::read_dir(checkpoint_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!(dir = %checkpoint_dir.display(), "no checkpoint dir, nothing to restore");
            return Ok(0);
        }
        Err(err) => return Err(err),
    };
    let mut copied = 0;
    for entry in entries {
        let entry = entry?;
        if !fs::metadata(entry.path())?.is_file() {
            continue;
        }
        let target = journal_dir.join(entry.file_name());
        fs::copy(entry.path(), &target)?;
        debug!(file = %target.display(), "checkpoint restored");
        copied += 1;
    }
    Ok(copied)
}
