//! Driver registry - the toolkit side of driver registration.
//!
//! A registry maps volume letters (A-Z) to driver records and routes
//! toolkit paths (`S:/img/logo.bin`) to the matching driver. The helpers
//! here only ever talk to a driver through its callbacks, the same way the
//! toolkit does.

use log::debug;

use crate::driver::{FsDriver, FsMode, FsRes};
use crate::error::{FsError, FsResult};
use crate::port::TAG;

/// Chunk size used by the whole-file helpers.
const CHUNK: usize = 512;

/// Entry name buffer size used by [`DriverTable::list_dir`].
const NAME_MAX: usize = 256;

/// Registration entry point of the toolkit.
pub trait DriverRegistry {
    /// Take ownership of a driver record.
    fn register(&mut self, driver: FsDriver) -> FsResult<()>;
}

/// Driver records keyed by volume letter.
pub struct DriverTable {
    /// A=0, B=1, ..., Z=25
    drivers: [Option<FsDriver>; 26],
}

impl Default for DriverTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverRegistry for DriverTable {
    fn register(&mut self, driver: FsDriver) -> FsResult<()> {
        let idx = letter_index(driver.letter)?;
        if self.drivers[idx].is_some() {
            return Err(FsError::AlreadyRegistered(driver.letter.to_ascii_uppercase()));
        }
        debug!(target: TAG, "registering driver {}:", driver.letter);
        self.drivers[idx] = Some(driver);
        Ok(())
    }
}

impl DriverTable {
    pub fn new() -> Self {
        Self {
            drivers: Default::default(),
        }
    }

    /// Check if a letter has a driver.
    pub fn is_registered(&self, letter: char) -> bool {
        letter_index(letter)
            .map(|idx| self.drivers[idx].is_some())
            .unwrap_or(false)
    }

    /// Get a registered driver.
    pub fn driver_mut(&mut self, letter: char) -> Option<&mut FsDriver> {
        let idx = letter_index(letter).ok()?;
        self.drivers[idx].as_mut()
    }

    /// Registered letters, in order.
    pub fn letters(&self) -> String {
        self.drivers
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_some())
            .map(|(i, _)| (b'A' + i as u8) as char)
            .collect()
    }

    /// Find the driver for a toolkit path and the path it receives.
    pub fn route<'p>(&mut self, path: &'p str) -> FsResult<(&mut FsDriver, &'p str)> {
        let (letter, real_path) = split_path(path)?;
        let driver = self
            .driver_mut(letter)
            .ok_or(FsError::NotFound(path.to_string()))?;
        Ok((driver, real_path))
    }

    /// Read a whole file through the driver callbacks.
    pub fn read_to_end(&mut self, path: &str) -> FsResult<Vec<u8>> {
        let (driver, real_path) = self.route(path)?;
        let ops = driver.ops.as_mut();

        let mut file = ops
            .open(real_path, FsMode::READ)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;

        let mut data = Vec::new();
        let mut chunk = [0u8; CHUNK];
        let status = loop {
            let mut br = 0;
            if ops.read(Some(&mut file), &mut chunk, &mut br) != FsRes::Ok {
                break FsRes::Unknown;
            }
            data.extend_from_slice(&chunk[..br as usize]);
            if (br as usize) < CHUNK {
                break FsRes::Ok;
            }
        };
        ops.close(Some(file));

        match status {
            FsRes::Ok => Ok(data),
            FsRes::Unknown => Err(io_failure(format!("read of {path} failed"))),
        }
    }

    /// Create or replace a file through the driver callbacks.
    pub fn write_all(&mut self, path: &str, data: &[u8]) -> FsResult<()> {
        let (driver, real_path) = self.route(path)?;
        let ops = driver.ops.as_mut();

        let mut file = ops
            .open(real_path, FsMode::WRITE)
            .ok_or_else(|| io_failure(format!("cannot create {path}")))?;

        let mut result = Ok(());
        for chunk in data.chunks(CHUNK) {
            let mut bw = 0;
            if ops.write(Some(&mut file), chunk, &mut bw) != FsRes::Ok || bw as usize != chunk.len()
            {
                result = Err(FsError::NoSpace);
                break;
            }
        }
        ops.close(Some(file));
        result
    }

    /// List a directory through the driver callbacks.
    pub fn list_dir(&mut self, path: &str) -> FsResult<Vec<String>> {
        let (driver, real_path) = self.route(path)?;
        let ops = driver.ops.as_mut();

        let mut dir = ops
            .dir_open(real_path)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;

        let mut names = Vec::new();
        let mut buf = [0u8; NAME_MAX];
        let status = loop {
            if ops.dir_read(Some(&mut dir), &mut buf) != FsRes::Ok {
                break FsRes::Unknown;
            }
            let name = c_name(&buf);
            if name.is_empty() {
                break FsRes::Ok;
            }
            names.push(name);
        };
        ops.dir_close(Some(dir));

        match status {
            FsRes::Ok => Ok(names),
            FsRes::Unknown => Err(io_failure(format!("listing {path} failed"))),
        }
    }
}

/// Split a toolkit path into its volume letter and the path the driver sees.
///
/// The first character names the volume; a `:` right after it is skipped.
pub fn split_path(path: &str) -> FsResult<(char, &str)> {
    let mut chars = path.chars();
    let letter = chars.next().ok_or(FsError::InvalidLetter('\0'))?;
    let rest = chars.as_str();
    Ok((letter, rest.strip_prefix(':').unwrap_or(rest)))
}

/// Decode a NUL-terminated entry name.
pub fn c_name(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

fn io_failure(msg: String) -> FsError {
    FsError::Io(std::io::Error::other(msg))
}

/// Convert volume letter to index (A=0, B=1, ..., Z=25).
fn letter_index(letter: char) -> FsResult<usize> {
    let upper = letter.to_ascii_uppercase();
    if upper.is_ascii_uppercase() {
        Ok((upper as u8 - b'A') as usize)
    } else {
        Err(FsError::InvalidLetter(letter))
    }
}
