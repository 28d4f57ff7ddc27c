//! Host-directory volume, used by the simulator and integration tests.

use std::fs::{self, File, ReadDir};
use std::io;
use std::path::{Path, PathBuf};

use log::warn;

use super::{
    check_partition, relative_components, MountRequest, OpenMode, Storage, VolumeInfo,
    DEFAULT_PARTITION,
};
use crate::error::{FsError, FsResult};
use crate::port::TAG;

/// Volume whose contents live in a host directory.
///
/// A missing root directory plays the role of an unformatted partition.
/// The capacity is reported by `info` but not enforced.
pub struct HostStorage {
    root: PathBuf,
    label: String,
    capacity: u64,
    mount_point: Option<String>,
}

impl HostStorage {
    pub fn new(root: impl Into<PathBuf>, capacity: u64) -> Self {
        Self {
            root: root.into(),
            label: DEFAULT_PARTITION.to_string(),
            capacity,
            mount_point: None,
        }
    }

    /// Host directory backing the volume.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Translate a native path into a host path under the root.
    fn host_path(&self, path: &str) -> FsResult<PathBuf> {
        let mount_point = self.mount_point.as_deref().ok_or(FsError::NotMounted)?;
        let mut host = self.root.clone();
        host.extend(relative_components(mount_point, path)?);
        Ok(host)
    }
}

impl Storage for HostStorage {
    type File = File;
    type Dir = HostDir;

    fn mount(&mut self, request: &MountRequest<'_>) -> FsResult<()> {
        check_partition(&self.label, request.partition_label)?;

        if !self.root.is_dir() {
            if !request.format_if_mount_failed {
                return Err(FsError::MountFailed(format!(
                    "{} is not a volume",
                    self.root.display()
                )));
            }
            warn!(target: TAG, "no volume at {}, formatting", self.root.display());
            fs::create_dir_all(&self.root)?;
        }

        self.mount_point = Some(request.mount_point.to_string());
        Ok(())
    }

    fn is_mounted(&self) -> bool {
        self.mount_point.is_some()
    }

    fn info(&self, partition_label: Option<&str>) -> FsResult<VolumeInfo> {
        check_partition(&self.label, partition_label)?;
        if self.mount_point.is_none() {
            return Err(FsError::NotMounted);
        }
        Ok(VolumeInfo {
            total: self.capacity,
            used: tree_size(&self.root)?,
        })
    }

    fn open_file(&mut self, path: &str, mode: OpenMode) -> FsResult<File> {
        let host = self.host_path(path)?;
        if host.is_dir() {
            return Err(FsError::IsADirectory(path.to_string()));
        }
        let file = match mode {
            OpenMode::Read => File::open(&host),
            OpenMode::WriteTruncate => File::create(&host),
        };
        file.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => FsError::NotFound(path.to_string()),
            _ => FsError::Io(e),
        })
    }

    fn open_dir(&mut self, path: &str) -> FsResult<HostDir> {
        let host = self.host_path(path)?;
        if host.is_file() {
            return Err(FsError::NotADirectory(path.to_string()));
        }
        match fs::read_dir(&host) {
            Ok(inner) => Ok(HostDir { inner }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(FsError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn create_dir(&mut self, path: &str) -> FsResult<()> {
        let host = self.host_path(path)?;
        fs::create_dir(&host).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists(path.to_string()),
            io::ErrorKind::NotFound => FsError::NotFound(path.to_string()),
            _ => FsError::Io(e),
        })
    }
}

/// Directory cursor over a host directory.
///
/// Entries that fail to read are skipped, the way `readdir` ends early.
pub struct HostDir {
    inner: ReadDir,
}

impl Iterator for HostDir {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.inner
            .by_ref()
            .flatten()
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .next()
    }
}

/// Summed size of all regular files below `dir`.
fn tree_size(dir: &Path) -> io::Result<u64> {
    let mut total = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        total += if meta.is_dir() {
            tree_size(&entry.path())?
        } else {
            meta.len()
        };
    }
    Ok(total)
}
