//! LVGL filesystem port over a flash-backed storage API.
//!
//! This crate exposes a flash volume (LittleFS on the device, a RAM or host
//! directory volume elsewhere) to the UI toolkit through its fixed driver
//! interface:
//! - Mounting the volume, formatting it on first use
//! - Translating `S:/path` toolkit paths to native paths under the mount point
//! - Answering the nine driver callbacks with `FsRes::Ok` / `FsRes::Unknown`
//!
//! # Architecture
//!
//! - `Storage` trait: the native POSIX-like file and directory API
//! - `FsDriverOps` trait: the toolkit's driver callbacks
//! - `PortFs`: implements `FsDriverOps` on top of any `Storage`
//! - `DriverTable`: the toolkit-side registry keyed by volume letter
//!
//! ```
//! use lvfs_core::{init, DriverTable, MemoryStorage, VolumeConfig};
//!
//! let mut table = DriverTable::new();
//! init(MemoryStorage::new(64 * 1024), &VolumeConfig::default(), &mut table).unwrap();
//!
//! table.write_all("S:/hello.txt", b"hi").unwrap();
//! assert_eq!(table.read_to_end("S:/hello.txt").unwrap(), b"hi");
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod path;
pub mod port;
pub mod provision;
pub mod registry;
pub mod storage;

pub use config::VolumeConfig;
pub use driver::{DirHandle, FileHandle, FsDriver, FsDriverOps, FsMode, FsRes, Whence};
pub use error::{FsError, FsResult};
pub use path::resolve_path;
pub use port::{init, mount_volume, PortFs};
pub use provision::{
    install_bundle, load_bundle, load_bundle_from_path, AssetBundle, AssetEntry, BundleManifest,
};
pub use registry::{split_path, DriverRegistry, DriverTable};
pub use storage::{
    HostStorage, MemoryStorage, MountRequest, NativeFile, OpenMode, Storage, VolumeInfo,
};
