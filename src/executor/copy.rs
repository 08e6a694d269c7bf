//! Atomic file copy implementation

use crate::types::{CopyError, DirectoryEntry};
use crate::Config;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Read, Write};
use std::path::Path;

/// Bytes moved per read call
pub const COPY_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Suffix of the staging file written next to the final name
pub const PART_SUFFIX: &str = ".part";

/// Fixed-capacity scratch buffer, owned by one Worker and reused across files
#[derive(Debug)]
pub struct CopyBuffer {
    data: Box<[u8]>,
}

impl CopyBuffer {
    pub fn new() -> Self {
        Self::with_capacity(COPY_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity.max(1)].into_boxed_slice(),
        }
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Filesystem calls made against the staging and final files.
pub(crate) trait CopyIo {
    fn write_chunk(&self, file: &mut File, chunk: &[u8]) -> io::Result<()> {
        file.write_all(chunk)
    }

    fn sync(&self, file: &File) -> io::Result<()> {
        file.sync_all()
    }

    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        apply_mode(path, mode)
    }
}

pub(crate) struct SystemIo;

impl CopyIo for SystemIo {}

/// Copy one source entry into the destination using the write-then-rename strategy
///
/// 1. Open `<source>/<name>`
/// 2. Stream into a hidden staging file `.XXXXXX.part` in the destination
///    and sync it to disk
/// 3. Rename the staging file onto `<destination>/<name>`
/// 4. Apply the entry's permission bits to the final file
///
/// The staging name has a fixed short length, so any name the destination
/// filesystem accepts can be staged. Every failure removes what this call
/// created, so `<destination>/<name>` is either untouched or a complete copy
/// with the right mode.
///
/// # Returns
/// * `Ok(u64)` - Number of bytes copied
/// * `Err(CopyError)` - The stage that failed
///
/// # Example
/// ```no_run
/// use archiver::executor::{copy_entry, CopyBuffer};
/// use archiver::{Config, DirectoryEntry};
///
/// let config = Config::new("/data/in", "/data/out", 1);
/// let mut buffer = CopyBuffer::new();
/// let entry = DirectoryEntry::new("report.csv", 0o644, 0);
/// let bytes = copy_entry(&config, &entry, &mut buffer)?;
/// # Ok::<(), archiver::CopyError>(())
/// ```
pub fn copy_entry(
    config: &Config,
    entry: &DirectoryEntry,
    buffer: &mut CopyBuffer,
) -> Result<u64, CopyError> {
    let src_path = config.source_path(&entry.name);
    let reader = File::open(&src_path).map_err(|source| CopyError::Open {
        path: src_path.clone(),
        source,
    })?;

    copy_from_reader(reader, &src_path, config, entry, buffer, &SystemIo)
}

/// Same protocol as [`copy_entry`], reading from an already-open stream.
pub(crate) fn copy_from_reader<R: Read, I: CopyIo>(
    mut reader: R,
    src_path: &Path,
    config: &Config,
    entry: &DirectoryEntry,
    buffer: &mut CopyBuffer,
    io: &I,
) -> Result<u64, CopyError> {
    let final_path = config.destination_path(&entry.name);

    // Dropping the staging handle on any early return deletes the file
    let mut part_file = tempfile::Builder::new()
        .prefix(".")
        .suffix(PART_SUFFIX)
        .tempfile_in(&config.destination)
        .map_err(|source| CopyError::Create {
            path: config.destination.clone(),
            source,
        })?;
    let part_path = part_file.path().to_path_buf();

    let total_bytes = stream(
        &mut reader,
        part_file.as_file_mut(),
        buffer,
        src_path,
        &part_path,
        io,
    )?;

    // Atomic on POSIX when both names share a directory
    part_file
        .persist(&final_path)
        .map_err(|err| CopyError::Rename {
            path: final_path.clone(),
            source: err.error,
        })?;

    if let Err(source) = io.set_mode(&final_path, entry.mode) {
        discard(&final_path);
        return Err(CopyError::Chmod {
            path: final_path,
            source,
        });
    }

    Ok(total_bytes)
}

fn stream<R: Read, I: CopyIo>(
    reader: &mut R,
    part_file: &mut File,
    buffer: &mut CopyBuffer,
    src_path: &Path,
    part_path: &Path,
    io: &I,
) -> Result<u64, CopyError> {
    let write_error = |source| CopyError::Write {
        path: part_path.to_path_buf(),
        source,
    };

    let mut total_bytes = 0u64;
    loop {
        let bytes_read = match reader.read(&mut buffer.data) {
            Ok(0) => break, // EOF
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(CopyError::Read {
                    path: src_path.to_path_buf(),
                    source,
                })
            }
        };

        io.write_chunk(part_file, &buffer.data[..bytes_read])
            .map_err(write_error)?;
        total_bytes += bytes_read as u64;
    }

    io.sync(part_file).map_err(write_error)?;
    Ok(total_bytes)
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to clean up");
        }
    }
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_mode(path: &Path, mode: u32) -> io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(mode & 0o222 == 0);
    fs::set_permissions(path, permissions)
}
