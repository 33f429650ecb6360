//! Structured errors at the construction/configuration boundary. Steady-state
//! device operation never returns `Result` (see SPEC_FULL.md §7) — these
//! types only surface from machine setup, image loading, and config parsing.

use std::path::PathBuf;

/// Failures while parsing CLI arguments, INI files, or switch overrides.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown command-line flag: {0}")]
    UnknownFlag(String),

    #[error("flag {flag} expects a value")]
    MissingValue { flag: String },

    #[error("invalid numeric value {value:?} for {flag}")]
    InvalidNumber { flag: String, value: String },

    #[error("conventional RAM size {0} KiB is not a valid step")]
    InvalidRamSize(u32),

    #[error("unknown video adapter {0:?}")]
    UnknownVideoAdapter(String),

    #[error("unknown machine model {0:?}")]
    UnknownModel(String),

    #[error("floppy drive count {0} is out of range (0..=4)")]
    InvalidDiskCount(u32),

    #[error("invalid drive letter {0:?}")]
    InvalidDriveLetter(String),

    #[error("could not read ROM file {path:?}: {source}")]
    RomRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not read config file {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed INI syntax at line {line}: {message}")]
    IniSyntax { line: usize, message: String },
}

/// Failures while loading or validating a disk image (floppy or hard disk).
#[derive(Debug, thiserror::Error)]
pub enum DiskError {
    #[error("could not read disk image {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image size {size} bytes does not match any known floppy geometry")]
    UnknownFloppyGeometry { size: u64 },

    #[error("hard disk geometry is ambiguous for size {size} bytes; specify a type explicitly")]
    AmbiguousHddGeometry { size: u64 },

    #[error("no hard disk geometry matches size {size} bytes")]
    UnknownHddGeometry { size: u64 },

    #[error(transparent)]
    Vhd(#[from] crate::util::vhd::VhdError),
}
