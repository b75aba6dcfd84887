//! Identifier derivation for generated config blocks and files.

use std::path::Path;

/// Character substituted for everything outside `[A-Za-z0-9_-]`.
pub const PLACEHOLDER: char = '#';

/// Replaces every character outside `[A-Za-z0-9_-]` with [`PLACEHOLDER`].
///
/// # Example
/// ```
/// use feedvisor::compiler::ident;
///
/// assert_eq!(ident("/tmpname"), "#tmpname");
/// assert_eq!(ident("/var/log/app-1"), "#var#log#app-1");
/// ```
pub fn ident(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                PLACEHOLDER
            }
        })
        .collect()
}

/// Identifier of a topic: owning directory immediately followed by the topic name.
pub fn topic_ident(directory: &Path, name: &str) -> String {
    ident(&format!("{}{name}", directory.to_string_lossy()))
}

/// Name of the compiled file for the fragment stored at `path`.
pub fn file_name(path: &Path) -> String {
    format!("{}.toml", ident(&path.to_string_lossy()))
}
