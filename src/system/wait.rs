use std::io;

use libc::{WEXITSTATUS, WIFEXITED, WIFSIGNALED, WNOHANG, WTERMSIG, c_int};

use crate::cutils::cerr;
use crate::system::interface::ProcessId;
use crate::system::signal::{SignalNumber, signal_name};

mod sealed {
    pub(crate) trait Sealed {}

    impl Sealed for crate::system::interface::ProcessId {}
}

pub(crate) trait Wait: sealed::Sealed {
    /// Wait for a process to change state.
    ///
    /// Calling this function will block until a child specified by the given process ID has
    /// changed state. This can be configured further using [`WaitOptions`].
    fn wait(self, options: WaitOptions) -> Result<(ProcessId, WaitStatus), WaitError>;
}

impl Wait for ProcessId {
    fn wait(self, options: WaitOptions) -> Result<(ProcessId, WaitStatus), WaitError> {
        waitpid(self.get(), options)
    }
}

/// Wait for any child of the calling process.
///
/// Combined with [`WaitOptions::no_hang`] this is the reap sweep primitive:
/// it collects whichever child has terminated, or reports [`WaitError::NotReady`]
/// when none has.
pub(crate) fn wait_any(options: WaitOptions) -> Result<(ProcessId, WaitStatus), WaitError> {
    waitpid(-1, options)
}

fn waitpid(pid: libc::pid_t, options: WaitOptions) -> Result<(ProcessId, WaitStatus), WaitError> {
    let mut status: c_int = 0;

    // SAFETY: a valid pointer is passed for the status; `waitpid` cannot
    // cause UB for any combination of the other arguments.
    let pid = cerr(unsafe { libc::waitpid(pid, &mut status, options.flags) })
        .map_err(WaitError::Io)?;

    if pid == 0 && options.flags & WNOHANG != 0 {
        return Err(WaitError::NotReady);
    }

    Ok((ProcessId::new(pid), WaitStatus { status }))
}

/// Error values returned when [`Wait::wait`] fails.
#[derive(Debug)]
pub(crate) enum WaitError {
    // No children were in a waitable state.
    //
    // This is only returned if the [`WaitOptions::no_hang`] option is used.
    NotReady,
    // Regular I/O error.
    Io(io::Error),
}

/// Options to configure how [`Wait::wait`] waits for children.
pub(crate) struct WaitOptions {
    flags: c_int,
}

impl WaitOptions {
    /// Only wait for terminated children.
    pub(crate) const fn new() -> Self {
        Self { flags: 0 }
    }

    /// Return immediately if no child has exited.
    pub(crate) const fn no_hang(mut self) -> Self {
        self.flags |= WNOHANG;
        self
    }
}

/// The status of the waited child.
pub(crate) struct WaitStatus {
    status: c_int,
}

impl std::fmt::Debug for WaitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(exit_status) = self.exit_status() {
            write!(f, "ExitStatus({exit_status})")
        } else if let Some(signal) = self.term_signal() {
            write!(f, "TermSignal({})", signal_name(signal).unwrap_or("unknown"))
        } else {
            write!(f, "Unknown")
        }
    }
}

impl WaitStatus {
    /// Return `true` if the child terminated normally, i.e., by calling `exit`.
    pub(crate) const fn did_exit(&self) -> bool {
        WIFEXITED(self.status)
    }

    /// Return the exit status of the child if the child terminated normally.
    pub(crate) const fn exit_status(&self) -> Option<c_int> {
        if self.did_exit() {
            Some(WEXITSTATUS(self.status))
        } else {
            None
        }
    }

    /// Return `true` if the child process was terminated by a signal.
    pub(crate) const fn was_signaled(&self) -> bool {
        WIFSIGNALED(self.status)
    }

    /// Return the signal number which caused the child to terminate if the child was terminated by
    /// a signal.
    pub(crate) const fn term_signal(&self) -> Option<SignalNumber> {
        if self.was_signaled() {
            Some(WTERMSIG(self.status))
        } else {
            None
        }
    }
}
