//! DirectoryEntry - one immediate child of the source directory

use std::ffi::{OsStr, OsString};
use std::fs::Metadata;

/// Name prefix that marks a hidden file.
pub const HIDDEN_MARKER: u8 = b'.';

/// Check whether a file name carries the hidden-file marker
pub fn is_hidden(name: &OsStr) -> bool {
    name.as_encoded_bytes().first() == Some(&HIDDEN_MARKER)
}

/// Metadata for one source item, captured once at dispatch time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// File name relative to the source directory
    pub name: OsString,

    /// Whether the entry (after following symlinks) is a directory
    pub is_dir: bool,

    /// Whether the name carries the hidden marker
    pub is_hidden: bool,

    /// Unix permission bits (mode & 0o7777)
    pub mode: u32,

    /// Size in bytes at listing time
    pub size: u64,
}

impl DirectoryEntry {
    /// Create a regular-file entry
    pub fn new(name: impl Into<OsString>, mode: u32, size: u64) -> Self {
        let name = name.into();
        Self {
            is_hidden: is_hidden(&name),
            name,
            is_dir: false,
            mode: mode & 0o7777,
            size,
        }
    }

    /// Build an entry from a name and the metadata it resolves to
    pub fn from_metadata(name: OsString, metadata: &Metadata) -> Self {
        Self {
            is_hidden: is_hidden(&name),
            name,
            is_dir: metadata.is_dir(),
            mode: mode_bits(metadata),
            size: metadata.len(),
        }
    }

    /// Lossy UTF-8 rendering of the name for logs
    pub fn display_name(&self) -> String {
        self.name.to_string_lossy().into_owned()
    }
}

#[cfg(unix)]
fn mode_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_bits(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}
