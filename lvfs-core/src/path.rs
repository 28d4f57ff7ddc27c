//! Toolkit path to native path translation.

use crate::error::{FsError, FsResult};

/// Strip an optional `<letter>:` volume prefix.
///
/// Only a two-character prefix whose second character is `:` counts.
pub fn strip_volume_prefix(path: &str) -> &str {
    let mut chars = path.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic() => chars.as_str(),
        _ => path,
    }
}

/// Build the native path for a toolkit path.
///
/// The volume prefix is stripped, then the rest is appended to the mount
/// point, inserting a separator when it lacks one. `max_path` is the size
/// of the native path buffer including its terminator, so the result must
/// be strictly shorter.
pub fn resolve_path(mount_point: &str, path: &str, max_path: usize) -> FsResult<String> {
    let rest = strip_volume_prefix(path);

    let mut native = String::with_capacity(mount_point.len() + rest.len() + 1);
    native.push_str(mount_point);
    if !rest.starts_with('/') {
        native.push('/');
    }
    native.push_str(rest);

    if native.len() >= max_path {
        return Err(FsError::PathTooLong {
            len: native.len(),
            max: max_path.saturating_sub(1),
        });
    }
    Ok(native)
}
