use std::{
    ffi::{CStr, CString},
    io,
    os::{
        fd::{AsRawFd, FromRawFd, OwnedFd},
        unix::prelude::OsStrExt,
    },
    path::Path,
};

use crate::cutils::cerr;

use self::interface::ProcessId;
use self::signal::SignalNumber;

// generalized traits for when we want to hide implementations
pub mod interface;

pub mod signal;

pub mod wait;

pub(crate) fn _exit(status: libc::c_int) -> ! {
    // SAFETY: `_exit` terminates the process immediately and never returns.
    unsafe { libc::_exit(status) }
}

pub(crate) enum ForkResult {
    // Parent process branch with the child process' PID.
    Parent(ProcessId),
    // Child process branch.
    Child,
}

unsafe fn inner_fork() -> io::Result<ForkResult> {
    let pid = cerr(unsafe { libc::fork() })?;
    if pid == 0 {
        Ok(ForkResult::Child)
    } else {
        Ok(ForkResult::Parent(ProcessId::new(pid)))
    }
}

#[cfg(target_os = "linux")]
/// Create a new process.
pub(crate) fn fork() -> io::Result<ForkResult> {
    // SAFETY: `fork` is implemented using `clone` in linux so we don't need to worry about signal
    // safety.
    unsafe { inner_fork() }
}

#[cfg(not(target_os = "linux"))]
/// Create a new process.
///
/// # Safety
///
/// In a multithreaded program, only async-signal-safe functions are guaranteed to work in the
/// child process until a call to `execve` or a similar function is done.
pub(crate) unsafe fn fork() -> io::Result<ForkResult> {
    inner_fork()
}

/// Create a pipe, returning the read and write ends in that order.
///
/// Both descriptors are close-on-exec; binding one over a standard stream
/// with [`dup2_stdin`]/[`dup2_stdout`] clears the flag on the copy.
pub(crate) fn pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0; 2];
    // SAFETY: `fds` is a valid pointer to an array able to hold two integers.
    cerr(unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) })?;
    // SAFETY: on success both file descriptors are open and owned by no one else.
    unsafe { Ok((OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1]))) }
}

/// Bind a descriptor over standard input. The original stays open.
pub(crate) fn dup2_stdin<F: AsRawFd>(fd: &F) -> io::Result<()> {
    // SAFETY: `dup2` cannot cause UB for any argument values.
    cerr(unsafe { libc::dup2(fd.as_raw_fd(), libc::STDIN_FILENO) }).map(|_| ())
}

/// Bind a descriptor over standard output. The original stays open.
pub(crate) fn dup2_stdout<F: AsRawFd>(fd: &F) -> io::Result<()> {
    // SAFETY: `dup2` cannot cause UB for any argument values.
    cerr(unsafe { libc::dup2(fd.as_raw_fd(), libc::STDOUT_FILENO) }).map(|_| ())
}

/// Change the working directory of the calling process.
pub(crate) fn chdir<P: AsRef<Path>>(path: P) -> io::Result<()> {
    let path = CString::new(path.as_ref().as_os_str().as_bytes())
        .map_err(|_| io::Error::from_raw_os_error(libc::ENOENT))?;
    // SAFETY: `path` is a valid NUL-terminated string.
    cerr(unsafe { libc::chdir(path.as_ptr()) }).map(|_| ())
}

/// Send a signal to a process with the specified ID.
pub(crate) fn kill(pid: ProcessId, signal: SignalNumber) -> io::Result<()> {
    // SAFETY: This function cannot cause UB even if `pid` is not a valid process ID or if
    // `signal` is not a valid signal code.
    cerr(unsafe { libc::kill(pid.get(), signal) }).map(|_| ())
}

/// `access(2)` check with the real user and group ID of this process.
pub(crate) fn file_access_ok<P: AsRef<Path>>(path: P, mode: libc::c_int) -> bool {
    let Ok(path) = CString::new(path.as_ref().as_os_str().as_bytes()) else {
        return false;
    };

    // SAFETY: `path` is a valid NUL-terminated string.
    unsafe { libc::access(path.as_ptr(), mode) == 0 }
}

/// Replace the current process image; only returns when that failed.
pub(crate) fn execve(path: &CStr, args: &[CString], env: &[CString]) -> io::Error {
    let mut argv: Vec<*const libc::c_char> = args.iter().map(|arg| arg.as_ptr()).collect();
    argv.push(std::ptr::null());

    let mut envp: Vec<*const libc::c_char> = env.iter().map(|var| var.as_ptr()).collect();
    envp.push(std::ptr::null());

    // SAFETY: `path` is a valid C string and `argv`/`envp` are NULL-terminated
    // arrays of valid C strings, which stay alive for the duration of the call.
    unsafe { libc::execve(path.as_ptr(), argv.as_ptr(), envp.as_ptr()) };

    io::Error::last_os_error()
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;
    use std::fs::File;
    use std::io::{Read, Write};

    use super::wait::{Wait, WaitOptions};
    use super::{ForkResult, _exit, chdir, execve, fork, pipe};

    #[test]
    fn fork_wait_roundtrip() {
        let _lock = crate::test_support::process_test_lock();

        let ForkResult::Parent(pid) = fork().unwrap() else {
            _exit(7);
        };

        let (waited, status) = pid.wait(WaitOptions::new()).unwrap();
        assert_eq!(waited, pid);
        assert_eq!(status.exit_status(), Some(7));
    }

    #[test]
    fn pipe_carries_bytes() {
        let (read_end, write_end) = pipe().unwrap();

        let mut tx = File::from(write_end);
        tx.write_all(b"across the pipe").unwrap();
        drop(tx);

        let mut buf = String::new();
        File::from(read_end).read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "across the pipe");
    }

    #[test]
    fn chdir_applies_to_calling_process() {
        let _lock = crate::test_support::process_test_lock();

        // run in a child so the test process' working directory stays put
        let ForkResult::Parent(pid) = fork().unwrap() else {
            if chdir("/").is_err() {
                _exit(1);
            }
            let at_root = std::env::current_dir()
                .map(|dir| dir == std::path::Path::new("/"))
                .unwrap_or(false);
            _exit(if at_root { 0 } else { 1 });
        };

        let (_, status) = pid.wait(WaitOptions::new()).unwrap();
        assert_eq!(status.exit_status(), Some(0));

        assert!(chdir("/definitely/not/a/directory").is_err());
    }

    #[test]
    fn execve_replaces_or_reports() {
        let _lock = crate::test_support::process_test_lock();

        let cs = |s: &str| CString::new(s).unwrap();

        let ForkResult::Parent(pid) = fork().unwrap() else {
            execve(&cs("/bin/sh"), &[cs("sh"), cs("-c"), cs("exit 3")], &[]);
            _exit(99);
        };
        let (_, status) = pid.wait(WaitOptions::new()).unwrap();
        assert_eq!(status.exit_status(), Some(3));

        let ForkResult::Parent(pid) = fork().unwrap() else {
            let err = execve(&cs("/nonexistent/program"), &[cs("program")], &[]);
            _exit(if err.raw_os_error() == Some(libc::ENOENT) {
                42
            } else {
                99
            });
        };
        let (_, status) = pid.wait(WaitOptions::new()).unwrap();
        assert_eq!(status.exit_status(), Some(42));
    }
}
