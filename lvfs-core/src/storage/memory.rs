//! In-memory flash volume.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use log::warn;

use super::{
    check_partition, relative_components, MountRequest, NativeFile, OpenMode, Storage, VolumeInfo,
    DEFAULT_PARTITION,
};
use crate::error::{FsError, FsResult};
use crate::port::TAG;

/// Volume state shared by the storage and its open files.
#[derive(Default)]
struct Volume {
    label: String,
    capacity: u64,
    formatted: bool,
    mount_point: Option<String>,
    /// Keyed by path relative to the volume root ("img/logo.bin")
    files: BTreeMap<String, Vec<u8>>,
    /// Relative directory paths; the root ("") is implicit
    dirs: BTreeSet<String>,
}

impl Volume {
    fn used(&self) -> u64 {
        self.files.values().map(|data| data.len() as u64).sum()
    }

    fn is_dir(&self, key: &str) -> bool {
        key.is_empty() || self.dirs.contains(key)
    }

    fn parent_exists(&self, key: &str) -> bool {
        match key.rfind('/') {
            Some(pos) => self.is_dir(&key[..pos]),
            None => true,
        }
    }

    fn format(&mut self) {
        self.files.clear();
        self.dirs.clear();
        self.formatted = true;
    }

    /// Resolve a native path to a volume key; the volume must be mounted.
    fn key(&self, path: &str) -> FsResult<String> {
        let mount_point = self.mount_point.as_deref().ok_or(FsError::NotMounted)?;
        Ok(relative_components(mount_point, path)?.join("/"))
    }
}

/// RAM-backed flash volume with a fixed capacity.
///
/// Clone is cheap and every clone sees the same volume, so tests can keep
/// a clone to inspect what went through the port.
#[derive(Clone)]
pub struct MemoryStorage {
    volume: Arc<Mutex<Volume>>,
}

impl MemoryStorage {
    /// Blank (never formatted) partition; mounting it requires formatting.
    pub fn new(capacity: u64) -> Self {
        Self::with_label(DEFAULT_PARTITION, capacity)
    }

    /// Blank partition with a custom label.
    pub fn with_label(label: &str, capacity: u64) -> Self {
        Self {
            volume: Arc::new(Mutex::new(Volume {
                label: label.to_string(),
                capacity,
                ..Volume::default()
            })),
        }
    }

    /// Formatted, empty partition.
    pub fn formatted(capacity: u64) -> Self {
        let storage = Self::new(capacity);
        if let Ok(mut volume) = storage.lock() {
            volume.format();
        }
        storage
    }

    /// Formatted partition pre-populated with files (relative paths).
    ///
    /// Parent directories are created as needed.
    pub fn with_files<I, S>(capacity: u64, files: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: AsRef<str>,
    {
        let storage = Self::formatted(capacity);
        for (name, data) in files {
            storage.add_file(name.as_ref(), data);
        }
        storage
    }

    /// Insert a file by path relative to the volume root.
    pub fn add_file(&self, name: &str, data: impl Into<Vec<u8>>) {
        let Ok(mut volume) = self.lock() else { return };
        let key = name.trim_matches('/').to_string();
        for (pos, _) in key.match_indices('/') {
            volume.dirs.insert(key[..pos].to_string());
        }
        volume.files.insert(key, data.into());
    }

    /// Read a file by path relative to the volume root.
    pub fn read_file(&self, name: &str) -> Option<Vec<u8>> {
        let volume = self.lock().ok()?;
        volume.files.get(name.trim_matches('/')).cloned()
    }

    /// Check whether a file or directory exists (relative path).
    pub fn exists(&self, name: &str) -> bool {
        let key = name.trim_matches('/');
        self.lock()
            .map(|volume| volume.files.contains_key(key) || volume.dirs.contains(key))
            .unwrap_or(false)
    }

    /// Bytes currently stored.
    pub fn used(&self) -> u64 {
        self.lock().map(|volume| volume.used()).unwrap_or(0)
    }

    /// Wipe the on-flash format, as if the partition got corrupted.
    pub fn corrupt(&self) {
        if let Ok(mut volume) = self.lock() {
            volume.formatted = false;
            volume.mount_point = None;
            volume.files.clear();
            volume.dirs.clear();
        }
    }

    fn lock(&self) -> FsResult<MutexGuard<'_, Volume>> {
        self.volume.lock().map_err(|_| FsError::LockPoisoned)
    }
}

impl Storage for MemoryStorage {
    type File = MemoryFile;
    type Dir = std::vec::IntoIter<String>;

    fn mount(&mut self, request: &MountRequest<'_>) -> FsResult<()> {
        let mut volume = self.lock()?;
        check_partition(&volume.label, request.partition_label)?;

        if !volume.formatted {
            if !request.format_if_mount_failed {
                return Err(FsError::MountFailed(format!(
                    "partition {:?} is not formatted",
                    volume.label
                )));
            }
            warn!(target: TAG, "mount of partition {:?} failed, formatting", volume.label);
            volume.format();
        }

        volume.mount_point = Some(request.mount_point.to_string());
        Ok(())
    }

    fn is_mounted(&self) -> bool {
        self.lock()
            .map(|volume| volume.mount_point.is_some())
            .unwrap_or(false)
    }

    fn info(&self, partition_label: Option<&str>) -> FsResult<VolumeInfo> {
        let volume = self.lock()?;
        check_partition(&volume.label, partition_label)?;
        if volume.mount_point.is_none() {
            return Err(FsError::NotMounted);
        }
        Ok(VolumeInfo {
            total: volume.capacity,
            used: volume.used(),
        })
    }

    fn open_file(&mut self, path: &str, mode: OpenMode) -> FsResult<MemoryFile> {
        let mut volume = self.lock()?;
        let key = volume.key(path)?;

        if volume.is_dir(&key) {
            return Err(FsError::IsADirectory(path.to_string()));
        }
        match mode {
            OpenMode::Read => {
                if !volume.files.contains_key(&key) {
                    return Err(FsError::NotFound(path.to_string()));
                }
            }
            OpenMode::WriteTruncate => {
                if !volume.parent_exists(&key) {
                    return Err(FsError::NotFound(path.to_string()));
                }
                volume.files.insert(key.clone(), Vec::new());
            }
        }

        Ok(MemoryFile {
            volume: Arc::clone(&self.volume),
            key,
            mode,
            pos: 0,
        })
    }

    fn open_dir(&mut self, path: &str) -> FsResult<Self::Dir> {
        let volume = self.lock()?;
        let key = volume.key(path)?;

        if !volume.is_dir(&key) {
            return Err(if volume.files.contains_key(&key) {
                FsError::NotADirectory(path.to_string())
            } else {
                FsError::NotFound(path.to_string())
            });
        }

        let prefix = if key.is_empty() {
            String::new()
        } else {
            format!("{key}/")
        };
        let child = |entry: &String| -> Option<String> {
            let name = entry.strip_prefix(&prefix)?;
            (!name.is_empty() && !name.contains('/')).then(|| name.to_string())
        };

        let mut names: Vec<String> = volume.dirs.iter().filter_map(child).collect();
        names.extend(volume.files.keys().filter_map(child));
        names.sort();
        Ok(names.into_iter())
    }

    fn create_dir(&mut self, path: &str) -> FsResult<()> {
        let mut volume = self.lock()?;
        let key = volume.key(path)?;

        if volume.is_dir(&key) || volume.files.contains_key(&key) {
            return Err(FsError::AlreadyExists(path.to_string()));
        }
        if !volume.parent_exists(&key) {
            return Err(FsError::NotFound(path.to_string()));
        }
        volume.dirs.insert(key);
        Ok(())
    }
}

/// Open file on a [`MemoryStorage`] volume.
pub struct MemoryFile {
    volume: Arc<Mutex<Volume>>,
    key: String,
    mode: OpenMode,
    pos: u64,
}

impl MemoryFile {
    fn lock(&self) -> io::Result<MutexGuard<'_, Volume>> {
        self.volume
            .lock()
            .map_err(|_| FsError::LockPoisoned.into())
    }
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.mode != OpenMode::Read {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "file not opened for reading",
            ));
        }
        let n = {
            let volume = self.lock()?;
            let data = volume
                .files
                .get(&self.key)
                .ok_or_else(|| FsError::NotFound(self.key.clone()))?;

            let start = usize::try_from(self.pos).unwrap_or(usize::MAX).min(data.len());
            let n = buf.len().min(data.len() - start);
            buf[..n].copy_from_slice(&data[start..start + n]);
            n
        };
        self.pos += n as u64;
        Ok(n)
    }
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.mode != OpenMode::WriteTruncate {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "file not opened for writing",
            ));
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let n = {
            let mut volume = self.lock()?;
            let free = volume.capacity.saturating_sub(volume.used());
            let data = volume
                .files
                .get_mut(&self.key)
                .ok_or_else(|| FsError::NotFound(self.key.clone()))?;

            // Bytes may land anywhere below the current end plus free space.
            let limit = data.len() as u64 + free;
            if self.pos >= limit {
                return Err(FsError::NoSpace.into());
            }
            let n = (buf.len() as u64).min(limit - self.pos) as usize;
            let start = self.pos as usize;
            if data.len() < start + n {
                data.resize(start + n, 0);
            }
            data[start..start + n].copy_from_slice(&buf[..n]);
            n
        };
        self.pos += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let len = {
            let volume = self.lock()?;
            volume.files.get(&self.key).map_or(0, |data| data.len() as u64)
        };
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
            SeekFrom::End(delta) => len.checked_add_signed(delta),
        };
        match target {
            Some(target) => {
                self.pos = target;
                Ok(target)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative position",
            )),
        }
    }
}

impl NativeFile for MemoryFile {}
