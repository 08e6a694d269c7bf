//! Configuration management

use crate::types::ArchiveError;
use clap::Parser;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

/// Long flags that also accept the single-dash spelling (`-src`).
const LONG_FLAGS: &[&str] = &[
    "src",
    "dest",
    "concurrency",
    "queue-depth",
    "strict",
    "verbose",
    "quiet",
    "help",
    "version",
];

/// Command line arguments
#[derive(Debug, Clone, Parser)]
#[command(
    name = "archiver",
    version,
    about = "Copy every regular, non-hidden file of a directory into another, atomically"
)]
pub struct Cli {
    /// source directory
    #[arg(long = "src", value_name = "PATH")]
    pub src: Option<PathBuf>,

    /// destination directory
    #[arg(long = "dest", value_name = "PATH")]
    pub dest: Option<PathBuf>,

    /// number of parallel workers
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub concurrency: usize,

    /// capacity of the work queue (defaults to the worker count)
    #[arg(long = "queue-depth", value_name = "N")]
    pub queue_depth: Option<usize>,

    /// exit with a failure code when any file could not be copied
    #[arg(long)]
    pub strict: bool,

    /// log skipped entries and other debug detail
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Parse arguments after rewriting `-flag` spellings to `--flag`.
    pub fn try_parse_normalized<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }
}

/// Rewrite single-dash long flags (`-src x`, `-src=x`) into clap's `--src` form.
///
/// The program name and everything after a bare `--` are passed through.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut out = Vec::new();
    let mut passthrough = false;

    for (idx, arg) in args.into_iter().enumerate() {
        let arg: OsString = arg.into();
        if idx == 0 || passthrough {
            out.push(arg);
            continue;
        }
        if arg == "--" {
            passthrough = true;
            out.push(arg);
            continue;
        }
        out.push(rewrite_single_dash(&arg).unwrap_or(arg));
    }

    out
}

fn rewrite_single_dash(arg: &OsStr) -> Option<OsString> {
    let text = arg.to_str()?;
    let body = text.strip_prefix('-')?;
    if body.starts_with('-') {
        return None;
    }
    let flag = body.split_once('=').map_or(body, |(flag, _)| flag);
    if LONG_FLAGS.contains(&flag) {
        Some(OsString::from(format!("-{}", text)))
    } else {
        None
    }
}

/// Immutable configuration for one archive run
#[derive(Debug, Clone)]
pub struct Config {
    /// Source directory
    pub source: PathBuf,

    /// Destination directory
    pub destination: PathBuf,

    /// Number of worker tasks
    pub concurrency: usize,

    /// Bounded queue capacity between dispatcher and workers
    pub queue_capacity: usize,

    /// Treat per-file failures as a failed run
    pub strict: bool,
}

impl Config {
    /// Build a configuration with the queue sized to the worker count
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>, concurrency: usize) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            concurrency,
            queue_capacity: concurrency.max(1),
            strict: false,
        }
    }

    /// Validate configuration
    ///
    /// Source and destination are compared before any filesystem access, then
    /// each is stat'ed, then their canonical forms are compared again.
    pub fn validate(&self) -> Result<(), ArchiveError> {
        if self.source == self.destination {
            return Err(ArchiveError::SameDirectory);
        }

        if self.concurrency == 0 {
            return Err(ArchiveError::InvalidConcurrency(self.concurrency));
        }

        check_directory("Source", &self.source)?;
        check_directory("Destination", &self.destination)?;

        let source = canonical("Source", &self.source)?;
        let destination = canonical("Destination", &self.destination)?;
        if source == destination {
            return Err(ArchiveError::SameDirectory);
        }

        Ok(())
    }

    /// Full path of a source entry
    pub fn source_path(&self, name: &OsStr) -> PathBuf {
        self.source.join(name)
    }

    /// Final destination path of an entry
    pub fn destination_path(&self, name: &OsStr) -> PathBuf {
        self.destination.join(name)
    }
}

impl TryFrom<Cli> for Config {
    type Error = ArchiveError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let source = required(cli.src, "src", "source directory")?;
        let destination = required(cli.dest, "dest", "destination directory")?;

        let mut config = Config::new(source, destination, cli.concurrency);
        if let Some(depth) = cli.queue_depth {
            config.queue_capacity = depth.max(1);
        }
        config.strict = cli.strict;
        config.validate()?;
        Ok(config)
    }
}

fn required(
    value: Option<PathBuf>,
    flag: &'static str,
    help: &'static str,
) -> Result<PathBuf, ArchiveError> {
    match value {
        Some(path) if !path.as_os_str().is_empty() => Ok(path),
        _ => Err(ArchiveError::MissingArgument { flag, help }),
    }
}

fn check_directory(role: &'static str, path: &Path) -> Result<(), ArchiveError> {
    let metadata = fs::metadata(path).map_err(|source| ArchiveError::Unreadable {
        role,
        path: path.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(ArchiveError::NotADirectory {
            role,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn canonical(role: &'static str, path: &Path) -> Result<PathBuf, ArchiveError> {
    fs::canonicalize(path).map_err(|source| ArchiveError::Unreadable {
        role,
        path: path.to_path_buf(),
        source,
    })
}
