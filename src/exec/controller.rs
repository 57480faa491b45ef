use std::io;

use crate::common::{Error, ParsedCommand, TerminatorKind};
use crate::log::{dev_info, dev_warn};
use crate::system::interface::ProcessId;
use crate::system::pipe;
use crate::system::wait::{Wait, WaitError, WaitOptions, WaitStatus, wait_any};

use super::carry::PipeCarry;
use super::launch::{LaunchPlan, Payload, SpawnedChild, launch};

/// Runs commands and keeps the interpreter's ledger of children: which child
/// to wait for, which pipe read end to carry into the next command, and the
/// sweep that keeps finished background children from lingering as zombies.
pub struct JobController {
    carry: PipeCarry,
}

impl JobController {
    pub fn new() -> Self {
        JobController {
            carry: PipeCarry::new(),
        }
    }

    /// Launch one command with the given payload and apply its wait policy:
    /// a foreground command returns its wait status once collected, while
    /// backgrounded and pipe-producing commands return `None` right away.
    ///
    /// The reap sweep runs on every path out of here, launched or not.
    pub fn submit(
        &mut self,
        cmd: &ParsedCommand,
        payload: Payload,
    ) -> Result<Option<WaitStatus>, Error> {
        let result = self.run_one(cmd, payload);
        self.reap_finished();
        result
    }

    fn run_one(
        &mut self,
        cmd: &ParsedCommand,
        payload: Payload,
    ) -> Result<Option<WaitStatus>, Error> {
        // whatever the previous command left behind is consumed by this
        // launch, no matter how this command itself terminates
        let carried_stdin = self.carry.take();

        let pipe = if cmd.terminator == TerminatorKind::Piped {
            Some(pipe().map_err(Error::Pipe)?)
        } else {
            None
        };

        let plan = LaunchPlan {
            carried_stdin,
            pipe,
            redirections: &cmd.redirections,
            variables: &cmd.variables,
            payload,
        };

        let SpawnedChild { pid, carry } = launch(cmd, plan)?;

        if let Some(read_end) = carry {
            self.carry.set(read_end)?;
        }

        match cmd.terminator {
            TerminatorKind::Normal => {
                let status = wait_for(pid)?;
                dev_info!("foreground child {pid} finished: {status:?}");
                Ok(Some(status))
            }
            TerminatorKind::Backgrounded | TerminatorKind::Piped => {
                dev_info!("child {pid} running unattended");
                Ok(None)
            }
        }
    }

    /// Collect every child that has already terminated, without blocking.
    /// Returns how many were collected.
    pub fn reap_finished(&mut self) -> usize {
        let mut reaped = 0;

        loop {
            match wait_any(WaitOptions::new().no_hang()) {
                Ok((pid, status)) => {
                    dev_info!("reaped child {pid}: {status:?}");
                    reaped += 1;
                }
                Err(WaitError::NotReady) => break,
                Err(WaitError::Io(err)) => {
                    // ECHILD just means there is nothing left to collect
                    if err.raw_os_error() != Some(libc::ECHILD) {
                        dev_warn!("reap sweep: {err}");
                    }
                    break;
                }
            }
        }

        reaped
    }
}

/// Blocking wait for one specific child, retrying when a signal interrupts
/// the wait.
fn wait_for(pid: ProcessId) -> Result<WaitStatus, Error> {
    loop {
        match pid.wait(WaitOptions::new()) {
            Ok((_, status)) => return Ok(status),
            Err(WaitError::Io(err)) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(WaitError::Io(err)) => return Err(Error::Wait(err)),
            Err(WaitError::NotReady) => unreachable!("blocking wait cannot be `NotReady`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Read;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    use super::{JobController, Payload};
    use crate::common::{
        ParsedCommand, RedirectionKind, RedirectionSpec, TerminatorKind, VariableAssignment,
    };
    use crate::system::wait::{WaitError, WaitOptions, wait_any};

    fn command(words: &[&str], terminator: TerminatorKind) -> ParsedCommand {
        let mut cmd = ParsedCommand::new(words.iter().map(|w| w.to_string()).collect()).unwrap();
        cmd.terminator = terminator;
        cmd
    }

    fn redirect(cmd: &mut ParsedCommand, kind: RedirectionKind, path: &PathBuf) {
        cmd.redirections.push(RedirectionSpec {
            kind,
            path: path.clone(),
        });
    }

    fn scratch_path(tag: &str) -> PathBuf {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("Failed to get system time")
            .as_nanos();
        std::env::temp_dir().join(format!("shex_test_{tag}_{}_{timestamp}", std::process::id()))
    }

    fn read_file(path: &PathBuf) -> String {
        let mut content = String::new();
        File::open(path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        content
    }

    /// Block until this process has no children left at all.
    fn drain_children() {
        loop {
            match wait_any(WaitOptions::new()) {
                Ok(_) => continue,
                Err(WaitError::Io(err)) if err.raw_os_error() == Some(libc::ECHILD) => break,
                Err(err) => panic!("unexpected wait error: {err:?}"),
            }
        }
    }

    fn no_children_left() -> bool {
        matches!(
            wait_any(WaitOptions::new().no_hang()),
            Err(WaitError::Io(err)) if err.raw_os_error() == Some(libc::ECHILD)
        )
    }

    #[test]
    fn foreground_returns_that_childs_status() {
        let _lock = crate::test_support::process_test_lock();
        let mut controller = JobController::new();

        let cmd = command(&["sh", "-c", "exit 7"], TerminatorKind::Normal);
        let status = controller.submit(&cmd, Payload::Program).unwrap().unwrap();
        assert_eq!(status.exit_status(), Some(7));

        assert!(no_children_left());
    }

    #[test]
    fn background_does_not_wait() {
        let _lock = crate::test_support::process_test_lock();
        let mut controller = JobController::new();

        let started = Instant::now();
        let cmd = command(&["sleep", "2"], TerminatorKind::Backgrounded);
        let status = controller.submit(&cmd, Payload::Program).unwrap();
        assert!(status.is_none());
        assert!(started.elapsed() < Duration::from_secs(1));

        drain_children();
    }

    #[test]
    fn pipe_carry_connects_two_commands() {
        let _lock = crate::test_support::process_test_lock();
        let mut controller = JobController::new();

        let producer = command(&["printf", "hello brave new world"], TerminatorKind::Piped);
        assert!(controller.submit(&producer, Payload::Program).unwrap().is_none());

        let out = scratch_path("carry_out");
        let mut consumer = command(&["wc", "-w"], TerminatorKind::Normal);
        redirect(&mut consumer, RedirectionKind::TruncateOutput, &out);
        let status = controller
            .submit(&consumer, Payload::Program)
            .unwrap()
            .unwrap();
        assert_eq!(status.exit_status(), Some(0));

        assert_eq!(read_file(&out).trim(), "4");

        drain_children();
        std::fs::remove_file(&out).unwrap();
    }

    #[test]
    fn carry_is_consumed_by_a_background_command_too() {
        let _lock = crate::test_support::process_test_lock();
        let mut controller = JobController::new();

        let producer = command(&["printf", "x"], TerminatorKind::Piped);
        controller.submit(&producer, Payload::Program).unwrap();

        let out = scratch_path("bg_consumer");
        let mut consumer = command(&["cat"], TerminatorKind::Backgrounded);
        redirect(&mut consumer, RedirectionKind::TruncateOutput, &out);
        controller.submit(&consumer, Payload::Program).unwrap();

        drain_children();
        assert_eq!(read_file(&out), "x");
        std::fs::remove_file(&out).unwrap();
    }

    #[test]
    fn redirections_in_and_out() {
        let _lock = crate::test_support::process_test_lock();
        let mut controller = JobController::new();

        let input = scratch_path("words_in");
        std::fs::write(&input, "alpha beta\n").unwrap();
        let out = scratch_path("words_out");

        let mut cmd = command(&["wc", "-w"], TerminatorKind::Normal);
        redirect(&mut cmd, RedirectionKind::Input, &input);
        redirect(&mut cmd, RedirectionKind::TruncateOutput, &out);

        let status = controller.submit(&cmd, Payload::Program).unwrap().unwrap();
        assert_eq!(status.exit_status(), Some(0));
        assert_eq!(read_file(&out).trim(), "2");

        std::fs::remove_file(&input).unwrap();
        std::fs::remove_file(&out).unwrap();
    }

    #[test]
    fn truncate_then_append() {
        let _lock = crate::test_support::process_test_lock();
        let mut controller = JobController::new();
        let out = scratch_path("modes");

        let mut first = command(&["printf", "one"], TerminatorKind::Normal);
        redirect(&mut first, RedirectionKind::TruncateOutput, &out);
        controller.submit(&first, Payload::Program).unwrap();

        let mut second = command(&["printf", "two"], TerminatorKind::Normal);
        redirect(&mut second, RedirectionKind::AppendOutput, &out);
        controller.submit(&second, Payload::Program).unwrap();

        assert_eq!(read_file(&out), "onetwo");

        let mut third = command(&["printf", "three"], TerminatorKind::Normal);
        redirect(&mut third, RedirectionKind::TruncateOutput, &out);
        controller.submit(&third, Payload::Program).unwrap();

        assert_eq!(read_file(&out), "three");

        std::fs::remove_file(&out).unwrap();
    }

    #[test]
    fn missing_input_aborts_the_child() {
        let _lock = crate::test_support::process_test_lock();
        let mut controller = JobController::new();

        let mut cmd = command(&["cat"], TerminatorKind::Normal);
        redirect(
            &mut cmd,
            RedirectionKind::Input,
            &PathBuf::from("/definitely/not/here"),
        );

        let status = controller.submit(&cmd, Payload::Program).unwrap().unwrap();
        assert_eq!(status.exit_status(), Some(1));
    }

    #[test]
    fn variables_reach_the_child_with_later_duplicate_winning() {
        let _lock = crate::test_support::process_test_lock();
        let mut controller = JobController::new();
        let out = scratch_path("vars");

        let mut cmd = command(
            &["sh", "-c", "printf %s \"$SHEX_CONTROLLER_VAR\""],
            TerminatorKind::Normal,
        );
        cmd.variables = vec![
            VariableAssignment {
                name: "SHEX_CONTROLLER_VAR".to_string(),
                value: "lost".to_string(),
            },
            VariableAssignment {
                name: "SHEX_CONTROLLER_VAR".to_string(),
                value: "kept".to_string(),
            },
        ];
        redirect(&mut cmd, RedirectionKind::TruncateOutput, &out);

        controller.submit(&cmd, Payload::Program).unwrap();
        assert_eq!(read_file(&out), "kept");

        std::fs::remove_file(&out).unwrap();
    }

    #[test]
    fn sequences_leave_no_zombies_behind() {
        let _lock = crate::test_support::process_test_lock();
        let mut controller = JobController::new();

        for _ in 0..3 {
            let cmd = command(&["sh", "-c", "exit 0"], TerminatorKind::Normal);
            controller.submit(&cmd, Payload::Program).unwrap();
        }

        // a finished background child is collected by the next submission's sweep
        let cmd = command(&["sh", "-c", "exit 0"], TerminatorKind::Backgrounded);
        controller.submit(&cmd, Payload::Program).unwrap();
        std::thread::sleep(Duration::from_millis(200));

        let cmd = command(&["sh", "-c", "exit 0"], TerminatorKind::Normal);
        controller.submit(&cmd, Payload::Program).unwrap();

        assert!(no_children_left());
    }
}
