//! Filesystem port: the toolkit driver implemented over native storage.
//!
//! [`init`] mounts the flash volume and registers the driver record;
//! [`PortFs`] answers the nine driver callbacks by resolving toolkit paths
//! below the mount point and forwarding to the [`Storage`] backend. Native
//! failures stop here and come back to the toolkit as [`FsRes::Unknown`].

use std::io::{self, Read, Seek, SeekFrom, Write};

use log::{debug, error, info, warn};

use crate::config::VolumeConfig;
use crate::driver::{DirHandle, FileHandle, FsDriver, FsDriverOps, FsMode, FsRes, Whence};
use crate::error::{FsError, FsResult};
use crate::path::resolve_path;
use crate::registry::DriverRegistry;
use crate::storage::{MountRequest, NativeFile, OpenMode, Storage};

/// Log target of the port.
pub const TAG: &str = "lv_fs";

/// Mount the volume, build the driver record and register it.
///
/// A mount failure is logged and otherwise ignored: the driver is still
/// registered and its operations fail one by one. Only a rejected
/// registration is returned.
pub fn init<S, R>(mut storage: S, config: &VolumeConfig, registry: &mut R) -> FsResult<()>
where
    S: Storage + 'static,
    R: DriverRegistry + ?Sized,
{
    if let Err(e) = mount_volume(&mut storage, config) {
        error!(target: TAG, "failed to mount {} ({})", config.native_mount_point(), e);
    }

    let driver = FsDriver::new(config.letter, PortFs::new(storage, config));
    registry.register(driver)?;
    info!(target: TAG, "driver registered as {}:", config.letter);
    Ok(())
}

/// Mount the configured partition and log its capacity.
pub fn mount_volume<S: Storage>(storage: &mut S, config: &VolumeConfig) -> FsResult<()> {
    let request = MountRequest {
        mount_point: config.native_mount_point(),
        partition_label: config.partition_label.as_deref(),
        format_if_mount_failed: config.format_if_mount_failed,
    };
    storage.mount(&request)?;

    if let Ok(usage) = storage.info(request.partition_label) {
        info!(
            target: TAG,
            "partition size: total: {}, used: {}", usage.total, usage.used
        );
    }
    Ok(())
}

/// Driver callbacks over a mounted [`Storage`].
pub struct PortFs<S: Storage> {
    storage: S,
    mount_point: String,
    max_path: usize,
}

impl<S: Storage> PortFs<S> {
    pub fn new(storage: S, config: &VolumeConfig) -> Self {
        Self {
            storage,
            mount_point: config.native_mount_point().to_string(),
            max_path: config.max_path,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Native path of a toolkit path.
    pub fn resolve(&self, path: &str) -> FsResult<String> {
        resolve_path(&self.mount_point, path, self.max_path)
    }

    /// Create every missing directory along a toolkit directory path.
    pub fn make_dirs(&mut self, path: &str) -> FsResult<()> {
        let native = self.resolve(path)?;
        let mut current = self.mount_point.clone();
        for part in native[self.mount_point.len()..].split('/').filter(|p| !p.is_empty()) {
            current.push('/');
            current.push_str(part);
            match self.storage.create_dir(&current) {
                Ok(()) | Err(FsError::AlreadyExists(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn resolve_logged(&self, path: &str) -> Option<String> {
        match self.resolve(path) {
            Ok(native) => Some(native),
            Err(e) => {
                warn!(target: TAG, "rejected {:?}: {}", path, e);
                None
            }
        }
    }
}

impl<S: Storage> FsDriverOps for PortFs<S> {
    fn open(&mut self, path: &str, mode: FsMode) -> Option<FileHandle> {
        let native = self.resolve_logged(path)?;
        let mode = if mode.contains(FsMode::WRITE) {
            OpenMode::WriteTruncate
        } else {
            OpenMode::Read
        };
        info!(target: TAG, "open {} ({})", native, mode.as_str());

        match self.storage.open_file(&native, mode) {
            Ok(file) => Some(FileHandle::new(file)),
            Err(e) => {
                error!(target: TAG, "failed to open {} ({})", native, e);
                None
            }
        }
    }

    fn close(&mut self, file: Option<FileHandle>) -> FsRes {
        let Some(mut file) = file else {
            return FsRes::Unknown;
        };
        if let Err(e) = file.native().flush() {
            warn!(target: TAG, "flush on close failed ({})", e);
        }
        FsRes::Ok
    }

    fn read(&mut self, file: Option<&mut FileHandle>, buf: &mut [u8], br: &mut u32) -> FsRes {
        let Some(file) = file else {
            return FsRes::Unknown;
        };
        let len = buf.len().min(u32::MAX as usize);
        let (n, err) = read_full(file.native(), &mut buf[..len]);
        *br = n as u32;

        // End of stream is a plain short read; an error only counts when
        // nothing came through.
        match err {
            Some(e) if n == 0 => {
                debug!(target: TAG, "read failed ({})", e);
                FsRes::Unknown
            }
            _ => FsRes::Ok,
        }
    }

    fn write(&mut self, file: Option<&mut FileHandle>, buf: &[u8], bw: &mut u32) -> FsRes {
        let Some(file) = file else {
            return FsRes::Unknown;
        };
        let len = buf.len().min(u32::MAX as usize);
        let (n, err) = write_full(file.native(), &buf[..len]);
        *bw = n as u32;

        match err {
            Some(e) if n < len => {
                debug!(target: TAG, "write stopped at {} of {} bytes ({})", n, len, e);
                FsRes::Unknown
            }
            _ => FsRes::Ok,
        }
    }

    fn seek(&mut self, file: Option<&mut FileHandle>, pos: u32, whence: Whence) -> FsRes {
        let Some(file) = file else {
            return FsRes::Unknown;
        };
        // Offsets reach the native call as the target's 32-bit signed `long`.
        let offset = i64::from(pos as i32);
        let target = match whence {
            Whence::Set => match u64::try_from(offset) {
                Ok(start) => SeekFrom::Start(start),
                Err(_) => return FsRes::Unknown,
            },
            Whence::Cur => SeekFrom::Current(offset),
            Whence::End => SeekFrom::End(offset),
        };

        match file.native().seek(target) {
            Ok(_) => FsRes::Ok,
            Err(e) => {
                debug!(target: TAG, "seek to {:?} failed ({})", target, e);
                FsRes::Unknown
            }
        }
    }

    fn tell(&mut self, file: Option<&mut FileHandle>, pos: Option<&mut u32>) -> FsRes {
        let (Some(file), Some(pos)) = (file, pos) else {
            return FsRes::Unknown;
        };
        // try_from rejects negative positions as well as ones past u32.
        match file.native().tell().map(u32::try_from) {
            Ok(Ok(current)) => {
                *pos = current;
                FsRes::Ok
            }
            _ => FsRes::Unknown,
        }
    }

    fn dir_open(&mut self, path: &str) -> Option<DirHandle> {
        let native = self.resolve_logged(path)?;
        match self.storage.open_dir(&native) {
            Ok(dir) => Some(DirHandle::new(dir)),
            Err(e) => {
                error!(target: TAG, "failed to open dir {} ({})", native, e);
                None
            }
        }
    }

    fn dir_read(&mut self, dir: Option<&mut DirHandle>, name: &mut [u8]) -> FsRes {
        let Some(dir) = dir else {
            return FsRes::Unknown;
        };
        // No room for even the terminator.
        if name.is_empty() {
            return FsRes::Unknown;
        }

        match dir.next_name() {
            Some(entry) => {
                let n = entry.len().min(name.len() - 1);
                name[..n].copy_from_slice(&entry.as_bytes()[..n]);
                name[n] = 0;
            }
            None => name[0] = 0,
        }
        FsRes::Ok
    }

    fn dir_close(&mut self, dir: Option<DirHandle>) -> FsRes {
        match dir {
            Some(_) => FsRes::Ok,
            None => FsRes::Unknown,
        }
    }
}

/// Read like `fread`: until `buf` is full, the stream ends, or an error.
fn read_full(file: &mut dyn NativeFile, buf: &mut [u8]) -> (usize, Option<io::Error>) {
    let mut done = 0;
    while done < buf.len() {
        match file.read(&mut buf[done..]) {
            Ok(0) => break,
            Ok(n) => done += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return (done, Some(e)),
        }
    }
    (done, None)
}

/// Write like `fwrite`: until `buf` is drained or an error.
///
/// A writer that accepts nothing is full; that counts as an error.
fn write_full(file: &mut dyn NativeFile, buf: &[u8]) -> (usize, Option<io::Error>) {
    let mut done = 0;
    while done < buf.len() {
        match file.write(&buf[done..]) {
            Ok(0) => return (done, Some(io::ErrorKind::WriteZero.into())),
            Ok(n) => done += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return (done, Some(e)),
        }
    }
    (done, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DriverTable;
    use crate::storage::MemoryStorage;

    fn port(mut storage: MemoryStorage) -> PortFs<MemoryStorage> {
        let config = VolumeConfig::default();
        mount_volume(&mut storage, &config).unwrap();
        PortFs::new(storage, &config)
    }

    fn name_of(buf: &[u8]) -> &str {
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        std::str::from_utf8(&buf[..end]).unwrap()
    }

    /// Native file whose every call fails.
    struct BrokenFile {
        position: i64,
    }

    impl Read for BrokenFile {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("flash read error"))
        }
    }

    impl Write for BrokenFile {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("flash write error"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Seek for BrokenFile {
        fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
            Err(io::Error::other("flash seek error"))
        }
    }

    impl NativeFile for BrokenFile {
        fn tell(&mut self) -> FsResult<i64> {
            Ok(self.position)
        }
    }

    /// Native file that yields one chunk, then fails.
    struct FlakyFile {
        served: bool,
    }

    impl Read for FlakyFile {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::other("flash read error"));
            }
            self.served = true;
            buf[..3].copy_from_slice(b"abc");
            Ok(3)
        }
    }

    impl Write for FlakyFile {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Seek for FlakyFile {
        fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
            Ok(0)
        }
    }

    impl NativeFile for FlakyFile {}

    /// Fixed-size medium: writes stop short once the array is full.
    impl NativeFile for io::Cursor<[u8; 4]> {}

    #[test]
    fn test_write_then_read_roundtrip() {
        let storage = MemoryStorage::formatted(4096);
        let mut fs = port(storage.clone());

        let mut file = fs.open("S:/hello.txt", FsMode::WRITE).unwrap();
        let mut bw = 0;
        assert_eq!(fs.write(Some(&mut file), b"Hello, flash", &mut bw), FsRes::Ok);
        assert_eq!(bw, 12);
        assert_eq!(fs.close(Some(file)), FsRes::Ok);
        assert_eq!(storage.read_file("hello.txt"), Some(b"Hello, flash".to_vec()));

        let mut file = fs.open("S:/hello.txt", FsMode::READ).unwrap();
        let mut buf = [0u8; 32];
        let mut br = 0;
        assert_eq!(fs.read(Some(&mut file), &mut buf, &mut br), FsRes::Ok);
        assert_eq!(&buf[..br as usize], b"Hello, flash");
        assert_eq!(fs.close(Some(file)), FsRes::Ok);
    }

    #[test]
    fn test_open_missing_file_fails() {
        let mut fs = port(MemoryStorage::formatted(4096));
        assert!(fs.open("S:/missing.bin", FsMode::READ).is_none());
    }

    #[test]
    fn test_open_relative_and_bare_paths() {
        let storage = MemoryStorage::with_files(4096, [("img/a.bin", b"A".to_vec())]);
        let mut fs = port(storage);
        assert!(fs.open("S:img/a.bin", FsMode::READ).is_some());
        assert!(fs.open("/img/a.bin", FsMode::READ).is_some());
        assert!(fs.open("img/a.bin", FsMode::READ).is_some());
    }

    #[test]
    fn test_open_path_too_long() {
        let mut fs = port(MemoryStorage::formatted(4096));
        let path = format!("S:/{}", "n".repeat(300));
        assert!(fs.open(&path, FsMode::WRITE).is_none());
        assert!(fs.dir_open(&path).is_none());
    }

    #[test]
    fn test_read_past_end_is_ok() {
        let mut fs = port(MemoryStorage::with_files(4096, [("a.txt", b"abc".to_vec())]));
        let mut file = fs.open("S:/a.txt", FsMode::READ).unwrap();

        let mut buf = [0u8; 8];
        let mut br = 0;
        assert_eq!(fs.read(Some(&mut file), &mut buf, &mut br), FsRes::Ok);
        assert_eq!(br, 3);
        assert_eq!(fs.read(Some(&mut file), &mut buf, &mut br), FsRes::Ok);
        assert_eq!(br, 0);
    }

    #[test]
    fn test_read_error() {
        let mut fs = port(MemoryStorage::formatted(4096));
        let mut file = FileHandle::new(BrokenFile { position: 0 });
        let mut buf = [0u8; 8];
        let mut br = 7;
        assert_eq!(fs.read(Some(&mut file), &mut buf, &mut br), FsRes::Unknown);
        assert_eq!(br, 0);
    }

    #[test]
    fn test_partial_read_then_error_is_ok() {
        let mut fs = port(MemoryStorage::formatted(4096));
        let mut file = FileHandle::new(FlakyFile { served: false });
        let mut buf = [0u8; 8];
        let mut br = 0;
        assert_eq!(fs.read(Some(&mut file), &mut buf, &mut br), FsRes::Ok);
        assert_eq!(br, 3);
        assert_eq!(fs.read(Some(&mut file), &mut buf, &mut br), FsRes::Unknown);
    }

    #[test]
    fn test_read_on_write_only_file_fails() {
        let mut fs = port(MemoryStorage::formatted(4096));
        let mut file = fs.open("S:/w.bin", FsMode::WRITE).unwrap();
        let mut buf = [0u8; 4];
        let mut br = 0;
        assert_eq!(fs.read(Some(&mut file), &mut buf, &mut br), FsRes::Unknown);
    }

    #[test]
    fn test_write_medium_full() {
        let mut fs = port(MemoryStorage::formatted(10));
        let mut file = fs.open("S:/big.bin", FsMode::WRITE).unwrap();

        let mut bw = 0;
        assert_eq!(fs.write(Some(&mut file), &[0xAA; 16], &mut bw), FsRes::Unknown);
        assert_eq!(bw, 10);
    }

    #[test]
    fn test_write_zero_progress_is_error() {
        let mut fs = port(MemoryStorage::new(4096));
        let mut file = FileHandle::new(io::Cursor::new([0u8; 4]));

        let mut bw = 0;
        assert_eq!(fs.write(Some(&mut file), b"0123456789", &mut bw), FsRes::Unknown);
        assert_eq!(bw, 4);

        // Nothing fits at all.
        assert_eq!(fs.write(Some(&mut file), b"x", &mut bw), FsRes::Unknown);
        assert_eq!(bw, 0);
    }

    #[test]
    fn test_write_on_read_only_file_fails() {
        let mut fs = port(MemoryStorage::with_files(4096, [("a.txt", b"abc".to_vec())]));
        let mut file = fs.open("S:/a.txt", FsMode::READ).unwrap();
        let mut bw = 9;
        assert_eq!(fs.write(Some(&mut file), b"x", &mut bw), FsRes::Unknown);
        assert_eq!(bw, 0);
    }

    #[test]
    fn test_write_empty_buffer_is_ok() {
        let mut fs = port(MemoryStorage::formatted(4096));
        let mut file = fs.open("S:/e.bin", FsMode::WRITE).unwrap();
        let mut bw = 5;
        assert_eq!(fs.write(Some(&mut file), &[], &mut bw), FsRes::Ok);
        assert_eq!(bw, 0);
    }

    #[test]
    fn test_seek_and_tell() {
        let mut fs = port(MemoryStorage::with_files(4096, [("a.txt", b"0123456789".to_vec())]));
        let mut file = fs.open("S:/a.txt", FsMode::READ).unwrap();
        let mut pos = 0;

        assert_eq!(fs.seek(Some(&mut file), 4, Whence::Set), FsRes::Ok);
        assert_eq!(fs.tell(Some(&mut file), Some(&mut pos)), FsRes::Ok);
        assert_eq!(pos, 4);

        assert_eq!(fs.seek(Some(&mut file), 2, Whence::Cur), FsRes::Ok);
        assert_eq!(fs.tell(Some(&mut file), Some(&mut pos)), FsRes::Ok);
        assert_eq!(pos, 6);

        assert_eq!(fs.seek(Some(&mut file), 0, Whence::End), FsRes::Ok);
        assert_eq!(fs.tell(Some(&mut file), Some(&mut pos)), FsRes::Ok);
        assert_eq!(pos, 10);

        // A 32-bit -2 relative to the end.
        assert_eq!(fs.seek(Some(&mut file), (-2i32) as u32, Whence::End), FsRes::Ok);
        let mut buf = [0u8; 4];
        let mut br = 0;
        assert_eq!(fs.read(Some(&mut file), &mut buf, &mut br), FsRes::Ok);
        assert_eq!(&buf[..br as usize], b"89");
    }

    #[test]
    fn test_seek_negative_absolute_fails() {
        let mut fs = port(MemoryStorage::with_files(4096, [("a.txt", b"abc".to_vec())]));
        let mut file = fs.open("S:/a.txt", FsMode::READ).unwrap();
        assert_eq!(fs.seek(Some(&mut file), u32::MAX, Whence::Set), FsRes::Unknown);
        assert_eq!(fs.seek(Some(&mut file), (-8i32) as u32, Whence::End), FsRes::Unknown);
        assert_eq!(fs.seek(Some(&mut file), (-1i32) as u32, Whence::Cur), FsRes::Unknown);
    }

    #[test]
    fn test_native_seek_failure() {
        let mut fs = port(MemoryStorage::formatted(4096));
        let mut file = FileHandle::new(BrokenFile { position: 0 });
        assert_eq!(fs.seek(Some(&mut file), 1, Whence::Set), FsRes::Unknown);
    }

    #[test]
    fn test_tell_rejects_bad_positions() {
        let mut fs = port(MemoryStorage::formatted(4096));
        let mut pos = 0;

        let mut file = FileHandle::new(BrokenFile { position: -1 });
        assert_eq!(fs.tell(Some(&mut file), Some(&mut pos)), FsRes::Unknown);

        let mut file = FileHandle::new(BrokenFile {
            position: i64::from(u32::MAX) + 1,
        });
        assert_eq!(fs.tell(Some(&mut file), Some(&mut pos)), FsRes::Unknown);

        let mut file = FileHandle::new(BrokenFile { position: 42 });
        assert_eq!(fs.tell(Some(&mut file), None), FsRes::Unknown);
        assert_eq!(fs.tell(Some(&mut file), Some(&mut pos)), FsRes::Ok);
        assert_eq!(pos, 42);
    }

    #[test]
    fn test_null_handles() {
        let mut fs = port(MemoryStorage::formatted(4096));
        let mut buf = [0u8; 4];
        let mut count = 0;
        let mut pos = 0;

        assert_eq!(fs.close(None), FsRes::Unknown);
        assert_eq!(fs.read(None, &mut buf, &mut count), FsRes::Unknown);
        assert_eq!(fs.write(None, b"x", &mut count), FsRes::Unknown);
        assert_eq!(fs.seek(None, 0, Whence::Set), FsRes::Unknown);
        assert_eq!(fs.tell(None, Some(&mut pos)), FsRes::Unknown);
        assert_eq!(fs.dir_read(None, &mut buf), FsRes::Unknown);
        assert_eq!(fs.dir_close(None), FsRes::Unknown);
    }

    #[test]
    fn test_dir_iteration() {
        let storage = MemoryStorage::with_files(
            4096,
            [("img/a.bin", vec![1]), ("img/b.bin", vec![2]), ("font.bin", vec![3])],
        );
        let mut fs = port(storage);
        let mut dir = fs.dir_open("S:/img").unwrap();
        let mut buf = [0xFFu8; 16];

        let mut names = Vec::new();
        loop {
            assert_eq!(fs.dir_read(Some(&mut dir), &mut buf), FsRes::Ok);
            let name = name_of(&buf);
            if name.is_empty() {
                break;
            }
            names.push(name.to_string());
        }
        assert_eq!(names, vec!["a.bin", "b.bin"]);

        // Exhausted cursors keep answering with the empty name.
        assert_eq!(fs.dir_read(Some(&mut dir), &mut buf), FsRes::Ok);
        assert_eq!(name_of(&buf), "");
        assert_eq!(fs.dir_close(Some(dir)), FsRes::Ok);
    }

    #[test]
    fn test_dir_open_without_prefix_and_root() {
        let mut fs = port(MemoryStorage::with_files(4096, [("img/a.bin", vec![1])]));
        assert!(fs.dir_open("img").is_some());
        assert!(fs.dir_open("/img").is_some());
        assert!(fs.dir_open("S:/").is_some());
        assert!(fs.dir_open("S:").is_some());
        assert!(fs.dir_open("S:/nope").is_none());
    }

    #[test]
    fn test_empty_dir() {
        let mut fs = port(MemoryStorage::formatted(4096));
        fs.make_dirs("S:/empty").unwrap();
        let mut dir = fs.dir_open("S:/empty").unwrap();
        let mut buf = [0xFFu8; 8];
        assert_eq!(fs.dir_read(Some(&mut dir), &mut buf), FsRes::Ok);
        assert_eq!(buf[0], 0);
    }

    #[test]
    fn test_dir_read_truncates_long_names() {
        let mut fs = port(MemoryStorage::with_files(
            4096,
            [("a_really_long_file_name.bin", vec![1])],
        ));
        let mut dir = fs.dir_open("S:/").unwrap();

        let mut buf = [0xFFu8; 8];
        assert_eq!(fs.dir_read(Some(&mut dir), &mut buf[..5]), FsRes::Ok);
        assert_eq!(&buf[..5], b"a_re\0");
        // Bytes past the caller's slice are untouched.
        assert_eq!(&buf[5..], &[0xFF; 3]);
    }

    #[test]
    fn test_dir_read_zero_length_buffer() {
        let mut fs = port(MemoryStorage::with_files(4096, [("a.bin", vec![1])]));
        let mut dir = fs.dir_open("S:/").unwrap();
        assert_eq!(fs.dir_read(Some(&mut dir), &mut []), FsRes::Unknown);

        // The entry was not consumed.
        let mut buf = [0u8; 8];
        assert_eq!(fs.dir_read(Some(&mut dir), &mut buf), FsRes::Ok);
        assert_eq!(name_of(&buf), "a.bin");
    }

    #[test]
    fn test_make_dirs() {
        let storage = MemoryStorage::formatted(4096);
        let mut fs = port(storage.clone());
        fs.make_dirs("S:/ui/img/icons").unwrap();
        fs.make_dirs("S:/ui/img").unwrap();
        assert!(storage.exists("ui/img/icons"));
        assert!(fs.open("S:/ui/img/icons/home.bin", FsMode::WRITE).is_some());
    }

    #[test]
    fn test_init_formats_blank_volume() {
        let storage = MemoryStorage::new(4096);
        let mut table = DriverTable::new();
        init(storage.clone(), &VolumeConfig::default(), &mut table).unwrap();

        assert!(storage.is_mounted());
        assert!(table.is_registered('S'));
    }

    #[test]
    fn test_init_mount_failure_still_registers() {
        let storage = MemoryStorage::new(4096);
        let config = VolumeConfig {
            format_if_mount_failed: false,
            ..VolumeConfig::default()
        };
        let mut table = DriverTable::new();
        init(storage.clone(), &config, &mut table).unwrap();

        assert!(!storage.is_mounted());
        let driver = table.driver_mut('S').unwrap();
        assert!(driver.ops.open("S:/a.txt", FsMode::WRITE).is_none());
        assert!(driver.ops.dir_open("S:/").is_none());
    }

    #[test]
    fn test_init_mount_point_with_trailing_separator() {
        for mount_point in ["/littlefs/", "/"] {
            let storage = MemoryStorage::new(4096);
            let config = VolumeConfig {
                mount_point: mount_point.to_string(),
                ..VolumeConfig::default()
            };
            let mut table = DriverTable::new();
            init(storage.clone(), &config, &mut table).unwrap();

            table.write_all("S:/a.txt", b"hi").unwrap();
            assert_eq!(table.read_to_end("S:/a.txt").unwrap(), b"hi");
            assert_eq!(storage.read_file("a.txt"), Some(b"hi".to_vec()));
            assert_eq!(table.list_dir("S:/").unwrap(), vec!["a.txt"]);
        }
    }

    /// Records `(target, message)` of every log call in this test binary.
    struct CaptureLogger(std::sync::Mutex<Vec<(String, String)>>);

    impl log::Log for CaptureLogger {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            if let Ok(mut records) = self.0.lock() {
                records.push((record.target().to_string(), record.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE: CaptureLogger = CaptureLogger(std::sync::Mutex::new(Vec::new()));

    #[test]
    fn test_all_logging_uses_port_target() {
        log::set_logger(&CAPTURE).unwrap();
        log::set_max_level(log::LevelFilter::Trace);

        let mut table = DriverTable::new();
        init(MemoryStorage::new(4096), &VolumeConfig::default(), &mut table).unwrap();

        let records = CAPTURE.0.lock().unwrap();
        assert!(records.iter().any(|(_, msg)| msg.contains("formatting")));
        assert!(records.iter().any(|(_, msg)| msg.starts_with("registering driver")));
        for (target, msg) in records.iter() {
            assert_eq!(target, TAG, "{msg}");
        }
    }

    #[test]
    fn test_init_twice_rejected() {
        let mut table = DriverTable::new();
        let config = VolumeConfig::default();
        init(MemoryStorage::new(4096), &config, &mut table).unwrap();
        assert!(matches!(
            init(MemoryStorage::new(4096), &config, &mut table),
            Err(FsError::AlreadyRegistered('S'))
        ));
    }
}
