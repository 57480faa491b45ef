use std::{fmt, path::PathBuf};

use crate::system::interface::ProcessId;

#[derive(Debug)]
pub enum Error {
    Fork(std::io::Error),
    Pipe(std::io::Error),
    Open {
        path: PathBuf,
        error: std::io::Error,
    },
    Exec {
        program: String,
        error: std::io::Error,
    },
    Wait(std::io::Error),
    Kill {
        pid: ProcessId,
        error: std::io::Error,
    },
    ChangeDirectory {
        path: PathBuf,
        error: std::io::Error,
    },
    MissingArgument(&'static str),
    InvalidArgument {
        what: &'static str,
        value: String,
    },
    CarryOccupied,
    Io(Option<PathBuf>, std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Fork(e) => write!(f, "fork: {e}"),
            Error::Pipe(e) => write!(f, "pipe: {e}"),
            Error::Open { path, error } => {
                write!(f, "cannot open '{}': {error}", path.display())
            }
            Error::Exec { program, error } => {
                write!(f, "cannot execute '{program}': {error}")
            }
            Error::Wait(e) => write!(f, "wait: {e}"),
            Error::Kill { pid, error } => write!(f, "kill: {pid}: {error}"),
            Error::ChangeDirectory { path, error } => {
                write!(f, "cannot change directory to '{}': {error}", path.display())
            }
            Error::MissingArgument(what) => write!(f, "{what}: missing argument"),
            Error::InvalidArgument { what, value } => {
                write!(f, "{what}: invalid argument '{value}'")
            }
            Error::CarryOccupied => {
                f.write_str("a piped command is still pending; cannot start another")
            }
            Error::Io(location, e) => {
                if let Some(path) = location {
                    write!(f, "'{}': {e}", path.display())
                } else {
                    write!(f, "IO error: {e}")
                }
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(None, err)
    }
}

#[cfg(test)]
mod tests {
    use super::Error;
    use std::io;

    // the logger prefixes "shex: ", so Display must render "<operation>: <details>"
    #[test]
    fn diagnostic_formats() {
        let missing = io::Error::from_raw_os_error(libc::ENOENT);
        assert_eq!(
            Error::Open {
                path: "in.txt".into(),
                error: missing,
            }
            .to_string(),
            format!(
                "cannot open 'in.txt': {}",
                io::Error::from_raw_os_error(libc::ENOENT)
            )
        );
        assert_eq!(
            Error::MissingArgument("cd").to_string(),
            "cd: missing argument"
        );
        assert_eq!(
            Error::InvalidArgument {
                what: "kill",
                value: "ninetynine".to_string(),
            }
            .to_string(),
            "kill: invalid argument 'ninetynine'"
        );
    }
}
