//! Command name to executable path lookup.

use std::ffi::OsStr;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use nix::unistd::{access, AccessFlags};

/// Regular file that the current user may execute.
pub fn is_executable(path: &Path) -> bool {
    let is_file = fs::metadata(path).map(|m| m.is_file()).unwrap_or(false);
    is_file && access(path, AccessFlags::X_OK).is_ok()
}

/// Find the executable for `name`.
///
/// A name containing `/` is an explicit path (relative ones are taken from
/// `cwd`) and is only checked. Any other name is looked up in each directory
/// of `search_path` in order; an empty entry means `cwd`. Nothing is cached:
/// the filesystem may change between commands.
pub fn resolve(name: &str, search_path: Option<&OsStr>, cwd: &Path) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }

    if name.contains('/') {
        let path = cwd.join(name);
        return is_executable(&path).then_some(path);
    }

    let search_path = search_path?;
    env::split_paths(search_path)
        .map(|dir| {
            if dir.as_os_str().is_empty() {
                cwd.join(name)
            } else {
                cwd.join(dir).join(name)
            }
        })
        .find(|candidate| is_executable(candidate))
}
