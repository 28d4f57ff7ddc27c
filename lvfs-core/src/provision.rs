//! Asset bundles: ZIP archives of UI assets installed onto the flash volume.
//!
//! A bundle may carry a `manifest.json` naming the bundle and mapping
//! archive files to destination paths on the volume. Files the manifest
//! does not mention are installed under their archive path.

use std::collections::BTreeMap;
use std::io::{Read, Seek};

use log::info;
use serde::{Deserialize, Serialize};
use zip::ZipArchive;

use crate::driver::{FsDriverOps, FsMode, FsRes};
use crate::error::{FsError, FsResult};
use crate::port::{PortFs, TAG};
use crate::storage::Storage;

/// Manifest file name (matched case-insensitively, at any depth).
pub const MANIFEST_NAME: &str = "manifest.json";

/// Write chunk used when copying assets onto the volume.
const CHUNK: usize = 1024;

/// File entry in a bundle manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEntry {
    /// Path inside the archive
    pub src: String,
    /// Path on the volume; defaults to `src`
    #[serde(default)]
    pub dst: Option<String>,
}

/// Bundle manifest schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifest {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub files: Vec<AssetEntry>,
}

/// Loaded bundle: destination path (relative to the volume root) to data.
#[derive(Debug, Clone)]
pub struct AssetBundle {
    pub manifest: BundleManifest,
    pub files: BTreeMap<String, Vec<u8>>,
}

/// Load a bundle from ZIP data.
pub fn load_bundle<R: Read + Seek>(reader: R) -> FsResult<AssetBundle> {
    let mut archive = ZipArchive::new(reader)?;
    let mut archived: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    let mut manifest: Option<BundleManifest> = None;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }

        let name = file.name().to_string();
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;

        let base = name.rsplit('/').next().unwrap_or(&name);
        if base.eq_ignore_ascii_case(MANIFEST_NAME) {
            manifest = Some(serde_json::from_slice(&content)?);
        } else {
            archived.insert(clean_path(&name)?, content);
        }
    }

    let manifest = manifest.unwrap_or_else(|| BundleManifest {
        name: "Unnamed Bundle".to_string(),
        version: None,
        description: None,
        files: Vec::new(),
    });

    // Listed files move to their destination, the rest keep their path.
    let mut files = BTreeMap::new();
    for entry in &manifest.files {
        let src = clean_path(&entry.src)?;
        let data = archived
            .remove(&src)
            .ok_or_else(|| FsError::Bundle(format!("{} listed but not archived", entry.src)))?;
        let dst = match &entry.dst {
            Some(dst) => clean_path(dst)?,
            None => src,
        };
        files.insert(dst, data);
    }
    for (name, data) in archived {
        files.entry(name).or_insert(data);
    }

    Ok(AssetBundle { manifest, files })
}

/// Load a bundle from a file path.
pub fn load_bundle_from_path(path: &std::path::Path) -> FsResult<AssetBundle> {
    let file = std::fs::File::open(path)?;
    load_bundle(std::io::BufReader::new(file))
}

/// Install every file of a bundle through the port's driver callbacks.
///
/// Parent directories are created first. Stops at the first failure.
/// Returns the number of files written.
pub fn install_bundle<S: Storage>(port: &mut PortFs<S>, bundle: &AssetBundle) -> FsResult<usize> {
    for (dst, data) in &bundle.files {
        if let Some((parent, _)) = dst.rsplit_once('/') {
            port.make_dirs(&format!("/{parent}"))?;
        }

        let path = format!("/{dst}");
        let mut file = port
            .open(&path, FsMode::WRITE)
            .ok_or_else(|| FsError::Bundle(format!("cannot create {path}")))?;

        let mut written = Ok(());
        for chunk in data.chunks(CHUNK) {
            let mut bw = 0;
            if port.write(Some(&mut file), chunk, &mut bw) != FsRes::Ok
                || bw as usize != chunk.len()
            {
                written = Err(FsError::NoSpace);
                break;
            }
        }
        port.close(Some(file));
        written?;

        info!(target: TAG, "installed {} ({} bytes)", path, data.len());
    }
    Ok(bundle.files.len())
}

/// Normalize an archive path to a volume-relative path.
///
/// Rejects paths that would climb out of the volume root.
fn clean_path(path: &str) -> FsResult<String> {
    let mut parts = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => return Err(FsError::Bundle(format!("path escapes volume: {path}"))),
            name => parts.push(name),
        }
    }
    if parts.is_empty() {
        return Err(FsError::Bundle(format!("empty path: {path:?}")));
    }
    Ok(parts.join("/"))
}
