use std::{
    fs,
    os::unix::prelude::MetadataExt,
    path::{Path, PathBuf},
};

/// Check whether a path points to a regular file and any executable flag is set
fn is_valid_executable(path: &PathBuf) -> bool {
    if path.is_file() {
        match fs::metadata(path) {
            Ok(meta) => meta.mode() & 0o111 != 0,
            _ => false,
        }
    } else {
        false
    }
}

/// Resolve an executable name based on a `PATH`-style search string. This
/// checks whether the target file is a regular file and has any executable
/// bits set; it does not specifically check for user, group, or others'
/// executable bit.
pub(crate) fn resolve_path(command: &Path, path: &str) -> Option<PathBuf> {
    path.split(':')
        .map(Path::new)
        // ignore all relative paths ("", "." or "./")
        .filter(|path| path.is_absolute())
        // construct a possible executable absolute path candidate
        .map(|path| path.join(command))
        // check whether the candidate is a regular file and any executable flag is set
        .find(is_valid_executable)
}
