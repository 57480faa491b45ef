use std::ffi::{CString, OsString};
use std::os::unix::ffi::OsStrExt;

use crate::common::{Environment, VariableAssignment};

/// The environment a launched child starts with: the interpreter's own
/// environment with the command's assignments layered on top. A name assigned
/// twice keeps the later value. The interpreter's environment itself is never
/// touched.
pub(crate) fn child_environment(assignments: &[VariableAssignment]) -> Environment {
    let mut environment: Environment = std::env::vars_os().collect();

    for assignment in assignments {
        environment.insert(
            OsString::from(&assignment.name),
            OsString::from(&assignment.value),
        );
    }

    environment
}

/// Render an environment as the `NAME=value` entries `execve` expects.
/// An entry with an interior NUL byte cannot be represented and is skipped.
pub(crate) fn render_env(environment: Environment) -> Vec<CString> {
    environment
        .into_iter()
        .filter_map(|(name, value)| {
            let mut entry = name.as_bytes().to_vec();
            entry.push(b'=');
            entry.extend_from_slice(value.as_bytes());
            CString::new(entry).ok()
        })
        .collect()
}
