use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;

use crate::common::{Error, RedirectionKind, RedirectionSpec};
use crate::system::{dup2_stdin, dup2_stdout};

// Redirection targets are created rw for everyone, moderated by the umask.
const CREATE_MODE: u32 = 0o666;

/// Open the file named by a redirection with the open mode its kind implies:
/// inputs must already exist, outputs are created on demand.
pub(crate) fn open_redirection(spec: &RedirectionSpec) -> Result<File, Error> {
    let mut options = OpenOptions::new();

    match spec.kind {
        RedirectionKind::Input => {
            options.read(true);
        }
        RedirectionKind::TruncateOutput => {
            options
                .write(true)
                .create(true)
                .truncate(true)
                .mode(CREATE_MODE);
        }
        RedirectionKind::AppendOutput => {
            options
                .write(true)
                .create(true)
                .append(true)
                .mode(CREATE_MODE);
        }
    }

    options.open(&spec.path).map_err(|error| Error::Open {
        path: spec.path.clone(),
        error,
    })
}

/// Bind the redirections onto standard input and output, in listed order.
///
/// A later redirection of the same stream wins simply because it is bound
/// last. This rebinds the calling process' own streams, so it must only run
/// in a forked child.
pub(crate) fn apply_redirections(redirections: &[RedirectionSpec]) -> Result<(), Error> {
    for spec in redirections {
        let file = open_redirection(spec)?;

        match spec.kind {
            RedirectionKind::Input => dup2_stdin(&file),
            RedirectionKind::TruncateOutput | RedirectionKind::AppendOutput => dup2_stdout(&file),
        }
        .map_err(|error| Error::Open {
            path: spec.path.clone(),
            error,
        })?;

        // dropping `file` closes the original descriptor; the bound copy stays
    }

    Ok(())
}
