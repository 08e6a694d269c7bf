//! Single-level source listing
//!
//! Reads the immediate children of the source directory exactly once and
//! classifies each as eligible or skipped. Nothing below the top level is
//! visited.

use crate::types::{is_hidden, ArchiveError, DirectoryEntry};
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Why a source child is not archived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Name starts with the hidden marker
    Hidden,
    /// Directory, or a symlink resolving to one
    Directory,
    /// FIFO, socket, device node
    Special,
    /// Symlink whose target cannot be resolved
    DanglingSymlink,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Hidden => "hidden",
            SkipReason::Directory => "directory",
            SkipReason::Special => "special file",
            SkipReason::DanglingSymlink => "dangling symlink",
        }
    }
}

/// A skipped child and the reason it was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub name: OsString,
    pub reason: SkipReason,
}

/// Classified contents of the source directory, in name order
#[derive(Debug, Default, Clone)]
pub struct SourceListing {
    /// Regular, non-hidden files to archive
    pub eligible: Vec<DirectoryEntry>,

    /// Everything else
    pub skipped: Vec<SkippedEntry>,
}

impl SourceListing {
    /// Total number of children seen
    pub fn total(&self) -> usize {
        self.eligible.len() + self.skipped.len()
    }
}

/// List and classify the immediate children of `dir`.
///
/// Any failure to open the directory or to read one of its entries is an
/// enumeration error; the listing is all-or-nothing.
pub fn list_source(dir: &Path) -> Result<SourceListing, ArchiveError> {
    let enumeration = |source| ArchiveError::Enumeration {
        path: dir.to_path_buf(),
        source,
    };

    let mut children = Vec::new();
    for entry in fs::read_dir(dir).map_err(enumeration)? {
        children.push(entry.map_err(enumeration)?);
    }
    children.sort_by_key(|entry| entry.file_name());

    let mut listing = SourceListing::default();
    for child in children {
        let name = child.file_name();
        if is_hidden(&name) {
            listing.skipped.push(SkippedEntry {
                name,
                reason: SkipReason::Hidden,
            });
            continue;
        }

        let file_type = child.file_type().map_err(enumeration)?;
        let metadata = if file_type.is_symlink() {
            match fs::metadata(child.path()) {
                Ok(metadata) => metadata,
                Err(e) if matches!(e.kind(), ErrorKind::NotFound) || is_loop(&e) => {
                    listing.skipped.push(SkippedEntry {
                        name,
                        reason: SkipReason::DanglingSymlink,
                    });
                    continue;
                }
                Err(e) => return Err(enumeration(e)),
            }
        } else {
            child.metadata().map_err(enumeration)?
        };

        if metadata.is_dir() {
            listing.skipped.push(SkippedEntry {
                name,
                reason: SkipReason::Directory,
            });
        } else if metadata.is_file() {
            listing
                .eligible
                .push(DirectoryEntry::from_metadata(name, &metadata));
        } else {
            listing.skipped.push(SkippedEntry {
                name,
                reason: SkipReason::Special,
            });
        }
    }

    Ok(listing)
}

// A symlink cycle is as unresolvable as a missing target.
#[cfg(unix)]
fn is_loop(error: &std::io::Error) -> bool {
    error.raw_os_error() == Some(libc::ELOOP)
}

#[cfg(not(unix))]
fn is_loop(_error: &std::io::Error) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(entries: &[DirectoryEntry]) -> Vec<String> {
        entries.iter().map(DirectoryEntry::display_name).collect()
    }

    #[test]
    fn test_lists_files_in_name_order() {
        let src = TempDir::new().expect("create tempdir");
        fs::write(src.path().join("c.txt"), b"c").expect("write c");
        fs::write(src.path().join("a.txt"), b"a").expect("write a");
        fs::write(src.path().join("b.txt"), b"bb").expect("write b");

        let listing = list_source(src.path()).expect("list source");

        assert_eq!(names(&listing.eligible), vec!["a.txt", "b.txt", "c.txt"]);
        assert_eq!(listing.eligible[1].size, 2);
        assert!(listing.skipped.is_empty());
    }

    #[test]
    fn test_skips_hidden_and_directories() {
        let src = TempDir::new().expect("create tempdir");
        fs::write(src.path().join("a.txt"), b"a").expect("write a");
        fs::write(src.path().join(".hidden"), b"h").expect("write hidden");
        fs::create_dir(src.path().join("sub")).expect("create sub");
        fs::write(src.path().join("sub/inner.txt"), b"i").expect("write inner");

        let listing = list_source(src.path()).expect("list source");

        assert_eq!(names(&listing.eligible), vec!["a.txt"]);
        assert_eq!(listing.total(), 3);
        assert!(listing.skipped.contains(&SkippedEntry {
            name: OsString::from(".hidden"),
            reason: SkipReason::Hidden,
        }));
        assert!(listing.skipped.contains(&SkippedEntry {
            name: OsString::from("sub"),
            reason: SkipReason::Directory,
        }));
    }

    #[test]
    fn test_hidden_directory_is_reported_as_hidden() {
        let src = TempDir::new().expect("create tempdir");
        fs::create_dir(src.path().join(".git")).expect("create .git");

        let listing = list_source(src.path()).expect("list source");
        assert_eq!(listing.skipped[0].reason, SkipReason::Hidden);
    }

    #[test]
    fn test_missing_directory_is_enumeration_error() {
        let src = TempDir::new().expect("create tempdir");
        let err = list_source(&src.path().join("gone")).expect_err("must fail");
        assert!(matches!(err, ArchiveError::Enumeration { .. }));
    }

    #[test]
    fn test_empty_directory() {
        let src = TempDir::new().expect("create tempdir");
        let listing = list_source(src.path()).expect("list source");
        assert_eq!(listing.total(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_followed() {
        use std::os::unix::fs::symlink;

        let src = TempDir::new().expect("create tempdir");
        let outside = TempDir::new().expect("create outside tempdir");
        fs::write(outside.path().join("target.txt"), b"target").expect("write target");
        fs::create_dir(outside.path().join("dir")).expect("create dir");

        symlink(outside.path().join("target.txt"), src.path().join("file-link"))
            .expect("link file");
        symlink(outside.path().join("dir"), src.path().join("dir-link")).expect("link dir");
        symlink(outside.path().join("missing"), src.path().join("dangling"))
            .expect("link dangling");

        let listing = list_source(src.path()).expect("list source");

        assert_eq!(names(&listing.eligible), vec!["file-link"]);
        assert_eq!(listing.eligible[0].size, 6);
        assert!(listing.skipped.contains(&SkippedEntry {
            name: OsString::from("dir-link"),
            reason: SkipReason::Directory,
        }));
        assert!(listing.skipped.contains(&SkippedEntry {
            name: OsString::from("dangling"),
            reason: SkipReason::DanglingSymlink,
        }));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_is_skipped_not_fatal() {
        use std::os::unix::fs::symlink;

        let src = TempDir::new().expect("create tempdir");
        fs::write(src.path().join("plain.txt"), b"p").expect("write file");
        symlink(src.path().join("ping"), src.path().join("pong")).expect("link pong");
        symlink(src.path().join("pong"), src.path().join("ping")).expect("link ping");

        let listing = list_source(src.path()).expect("cycle must not abort the listing");

        assert_eq!(names(&listing.eligible), vec!["plain.txt"]);
        for name in ["ping", "pong"] {
            assert!(listing.skipped.contains(&SkippedEntry {
                name: OsString::from(name),
                reason: SkipReason::DanglingSymlink,
            }));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_loop_errno_is_recognized() {
        let error = std::io::Error::from_raw_os_error(libc::ELOOP);
        assert!(is_loop(&error));
        let other = std::io::Error::from_raw_os_error(libc::ENOENT);
        assert!(!is_loop(&other));
    }
}
