//! Volume configuration.

use serde::{Deserialize, Serialize};

use crate::error::FsResult;

/// Volume letter the toolkit uses to reach the flash volume (`S:/...`).
pub const DEFAULT_LETTER: char = 'S';

/// Native directory the flash partition is mounted on.
pub const DEFAULT_MOUNT_POINT: &str = "/littlefs";

/// Size of the native path buffer, terminator included.
pub const DEFAULT_MAX_PATH: usize = 256;

/// Fixed configuration of the flash volume and its toolkit driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VolumeConfig {
    /// Toolkit volume letter
    pub letter: char,
    /// Native mount point; trailing separators are ignored
    pub mount_point: String,
    /// Partition label, `None` selects the default data partition
    pub partition_label: Option<String>,
    /// Format the partition when the first mount attempt fails
    pub format_if_mount_failed: bool,
    /// Native path buffer size including the terminator
    pub max_path: usize,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            letter: DEFAULT_LETTER,
            mount_point: DEFAULT_MOUNT_POINT.to_string(),
            partition_label: None,
            format_if_mount_failed: true,
            max_path: DEFAULT_MAX_PATH,
        }
    }
}

impl VolumeConfig {
    /// Parse a JSON configuration; missing fields keep their defaults.
    pub fn from_json(text: &str) -> FsResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Mount point without trailing separators; `""` for the root.
    pub fn native_mount_point(&self) -> &str {
        self.mount_point.trim_end_matches('/')
    }
}
