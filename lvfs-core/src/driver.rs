//! Toolkit-side driver contract.
//!
//! The UI toolkit reaches a volume through a driver record: a volume letter
//! and nine callbacks. Every callback reports a two-valued [`FsRes`];
//! richer errors never cross this boundary.

use std::fmt;

use crate::storage::{NativeDir, NativeFile};

/// Result code of a driver callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsRes {
    Ok,
    Unknown,
}

impl FsRes {
    pub fn is_ok(self) -> bool {
        self == FsRes::Ok
    }
}

/// Toolkit open mode (bit set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsMode(u8);

impl FsMode {
    pub const READ: FsMode = FsMode(0x01);
    pub const WRITE: FsMode = FsMode(0x02);

    pub fn from_bits(bits: u8) -> Self {
        FsMode(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: FsMode) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for FsMode {
    type Output = FsMode;

    fn bitor(self, rhs: FsMode) -> FsMode {
        FsMode(self.0 | rhs.0)
    }
}

/// Seek origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Set,
    Cur,
    End,
}

/// Opaque owner of one open native file.
///
/// Not `Clone`: a handle is created by `open` and consumed by `close`.
/// Dropping it without `close` still releases the native file.
pub struct FileHandle(Box<dyn NativeFile>);

impl FileHandle {
    pub(crate) fn new(file: impl NativeFile + 'static) -> Self {
        FileHandle(Box::new(file))
    }

    pub(crate) fn native(&mut self) -> &mut dyn NativeFile {
        self.0.as_mut()
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FileHandle(..)")
    }
}

/// Opaque owner of one open directory cursor.
pub struct DirHandle(Box<dyn NativeDir>);

impl DirHandle {
    pub(crate) fn new(dir: impl NativeDir + 'static) -> Self {
        DirHandle(Box::new(dir))
    }

    pub(crate) fn next_name(&mut self) -> Option<String> {
        self.0.next()
    }
}

impl fmt::Debug for DirHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DirHandle(..)")
    }
}

/// The nine driver callbacks.
///
/// A `None` handle stands for the null pointer a misbehaving caller might
/// pass; every callback answers it with [`FsRes::Unknown`].
pub trait FsDriverOps: Send {
    /// Open a file; `None` on failure.
    fn open(&mut self, path: &str, mode: FsMode) -> Option<FileHandle>;

    fn close(&mut self, file: Option<FileHandle>) -> FsRes;

    /// Read up to `buf.len()` bytes, storing the count in `br`.
    fn read(&mut self, file: Option<&mut FileHandle>, buf: &mut [u8], br: &mut u32) -> FsRes;

    /// Write `buf`, storing the count in `bw`.
    fn write(&mut self, file: Option<&mut FileHandle>, buf: &[u8], bw: &mut u32) -> FsRes;

    fn seek(&mut self, file: Option<&mut FileHandle>, pos: u32, whence: Whence) -> FsRes;

    fn tell(&mut self, file: Option<&mut FileHandle>, pos: Option<&mut u32>) -> FsRes;

    /// Open a directory cursor; `None` on failure.
    fn dir_open(&mut self, path: &str) -> Option<DirHandle>;

    /// Copy the next entry name into `name` as a NUL-terminated string.
    /// An empty string means the directory is exhausted.
    fn dir_read(&mut self, dir: Option<&mut DirHandle>, name: &mut [u8]) -> FsRes;

    fn dir_close(&mut self, dir: Option<DirHandle>) -> FsRes;
}

/// Driver record handed to the toolkit registry.
pub struct FsDriver {
    pub letter: char,
    pub ops: Box<dyn FsDriverOps>,
}

impl FsDriver {
    pub fn new(letter: char, ops: impl FsDriverOps + 'static) -> Self {
        Self {
            letter,
            ops: Box::new(ops),
        }
    }
}

impl fmt::Debug for FsDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsDriver")
            .field("letter", &self.letter)
            .finish_non_exhaustive()
    }
}
