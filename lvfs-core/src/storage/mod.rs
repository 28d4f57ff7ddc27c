//! Native storage contract consumed by the port.
//!
//! This is the POSIX-like surface the flash filesystem exposes once it is
//! mounted: stream files, single-pass directory cursors, and a one-shot
//! mount call that may format the partition. The port never interprets
//! native handles; it only moves them around.
//!
//! - `MemoryStorage`: RAM-backed volume with a fixed capacity
//! - `HostStorage`: volume rooted at a host directory

mod host;
mod memory;

use std::io::{self, Read, Seek, Write};

use crate::error::{FsError, FsResult};

pub use host::{HostDir, HostStorage};
pub use memory::{MemoryFile, MemoryStorage};

/// Label of the default data partition.
pub const DEFAULT_PARTITION: &str = "littlefs";

/// Native open mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read-only binary stream (`"rb"`)
    Read,
    /// Write-only binary stream, created or truncated (`"wb"`)
    WriteTruncate,
}

impl OpenMode {
    /// stdio mode string, for logging.
    pub fn as_str(self) -> &'static str {
        match self {
            OpenMode::Read => "rb",
            OpenMode::WriteTruncate => "wb",
        }
    }
}

/// Arguments of the one-shot mount call.
#[derive(Debug, Clone, Copy)]
pub struct MountRequest<'a> {
    pub mount_point: &'a str,
    /// `None` selects the default partition
    pub partition_label: Option<&'a str>,
    pub format_if_mount_failed: bool,
}

/// Capacity report of a mounted volume, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeInfo {
    pub total: u64,
    pub used: u64,
}

/// An open native file stream.
pub trait NativeFile: Read + Write + Seek + Send {
    /// Current position as a signed offset, like `ftell`.
    fn tell(&mut self) -> FsResult<i64> {
        let pos = self.stream_position()?;
        i64::try_from(pos).map_err(|_| {
            FsError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                "stream position out of range",
            ))
        })
    }
}

impl NativeFile for std::fs::File {}

/// An open native directory cursor yielding entry names.
///
/// Forward-only and single-pass; `.` and `..` are never yielded.
pub trait NativeDir: Iterator<Item = String> + Send {}

impl<T: Iterator<Item = String> + Send> NativeDir for T {}

/// POSIX-like storage API of a flash filesystem.
pub trait Storage: Send {
    type File: NativeFile + 'static;
    type Dir: NativeDir + 'static;

    /// Mount the partition, formatting it first if allowed and needed.
    fn mount(&mut self, request: &MountRequest<'_>) -> FsResult<()>;

    /// Whether a mount call has succeeded.
    fn is_mounted(&self) -> bool;

    /// Total and used bytes of the given partition.
    fn info(&self, partition_label: Option<&str>) -> FsResult<VolumeInfo>;

    /// Open a file by native path.
    fn open_file(&mut self, path: &str, mode: OpenMode) -> FsResult<Self::File>;

    /// Open a directory cursor by native path.
    fn open_dir(&mut self, path: &str) -> FsResult<Self::Dir>;

    /// Create a single directory; its parent must exist.
    fn create_dir(&mut self, path: &str) -> FsResult<()>;
}

/// Check a mount request's partition selector against a backend's label.
pub(crate) fn check_partition(label: &str, requested: Option<&str>) -> FsResult<()> {
    match requested {
        Some(name) if name != label => {
            Err(FsError::MountFailed(format!("partition {name:?} not found")))
        }
        _ => Ok(()),
    }
}

/// Split a native path into components below the mount point.
///
/// `.` is dropped and `..` pops a component (never above the volume root).
pub(crate) fn relative_components<'a>(mount_point: &str, path: &'a str) -> FsResult<Vec<&'a str>> {
    let rest = path
        .strip_prefix(mount_point.trim_end_matches('/'))
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        .ok_or_else(|| FsError::NotFound(path.to_string()))?;

    let mut parts = Vec::new();
    for part in rest.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name => parts.push(name),
        }
    }
    Ok(parts)
}
