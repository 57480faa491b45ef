use std::ffi::CString;
use std::io;
use std::os::fd::OwnedFd;
use std::os::unix::ffi::OsStringExt;
use std::path::PathBuf;

use crate::common::command::is_qualified;
use crate::common::resolve::resolve_path;
use crate::common::{Error, ParsedCommand, RedirectionSpec, VariableAssignment};
use crate::log::user_error;
use crate::system::interface::ProcessId;
use crate::system::{ForkResult, _exit, dup2_stdin, dup2_stdout, execve, fork};

use super::environment::{child_environment, render_env};
use super::redirect::apply_redirections;

/// Exit status of a child that could not set up its standard streams.
const SETUP_FAILURE: i32 = 1;
/// Exit status of a child whose program could not be executed, as
/// established shells report it.
const EXEC_FAILURE: i32 = 127;

/// A builtin that runs inside the forked child after its streams are wired;
/// the return value becomes the child's exit status.
pub type ChildBuiltin = fn(&ParsedCommand) -> i32;

/// What the forked child should run.
pub enum Payload {
    /// One of the interpreter's own commands, run in the child.
    Builtin(ChildBuiltin),
    /// The external program named by the command, found on the search path.
    Program,
}

/// Everything the launcher needs to start one child.
pub(crate) struct LaunchPlan<'a> {
    /// Standard input carried over from the previous pipe-producing command.
    pub(crate) carried_stdin: Option<OwnedFd>,
    /// Fresh pipe for a pipe-producing command: (read end, write end).
    pub(crate) pipe: Option<(OwnedFd, OwnedFd)>,
    pub(crate) redirections: &'a [RedirectionSpec],
    pub(crate) variables: &'a [VariableAssignment],
    pub(crate) payload: Payload,
}

/// A started child. `carry` is the pipe read end the parent must hold on to
/// when the child was a pipe producer.
pub(crate) struct SpawnedChild {
    pub(crate) pid: ProcessId,
    pub(crate) carry: Option<OwnedFd>,
}

/// Fork and run the plan's payload in the child.
///
/// The child wires its standard streams in a fixed order: carried stdin
/// first, then the pipe write end over stdout, then the redirections as
/// listed. Later bindings of the same stream win, so an explicit redirection
/// overrides the pipe plumbing.
///
/// On fork failure no child exists and every descriptor in the plan is
/// closed on the way out.
pub(crate) fn launch(cmd: &ParsedCommand, plan: LaunchPlan) -> Result<SpawnedChild, Error> {
    let LaunchPlan {
        carried_stdin,
        pipe,
        redirections,
        variables,
        payload,
    } = plan;

    let ForkResult::Parent(pid) = fork().map_err(Error::Fork)? else {
        run_child(cmd, carried_stdin, pipe, redirections, variables, payload)
    };

    // the child owns these now; the parent keeps only the pipe read end
    drop(carried_stdin);
    let carry = pipe.map(|(read_end, write_end)| {
        drop(write_end);
        read_end
    });

    Ok(SpawnedChild { pid, carry })
}

fn run_child(
    cmd: &ParsedCommand,
    carried_stdin: Option<OwnedFd>,
    pipe: Option<(OwnedFd, OwnedFd)>,
    redirections: &[RedirectionSpec],
    variables: &[VariableAssignment],
    payload: Payload,
) -> ! {
    if let Some(fd) = carried_stdin {
        if let Err(err) = dup2_stdin(&fd) {
            user_error!("cannot attach piped input: {err}");
            _exit(SETUP_FAILURE);
        }
        drop(fd);
    }

    if let Some((read_end, write_end)) = pipe {
        // the consumer's end is of no use on this side
        drop(read_end);
        if let Err(err) = dup2_stdout(&write_end) {
            user_error!("cannot attach pipe output: {err}");
            _exit(SETUP_FAILURE);
        }
        drop(write_end);
    }

    if let Err(err) = apply_redirections(redirections) {
        user_error!("{err}");
        _exit(SETUP_FAILURE);
    }

    match payload {
        Payload::Builtin(builtin) => _exit(builtin(cmd)),
        Payload::Program => {
            let error = exec_program(cmd, variables);
            user_error!("{error}");
            _exit(EXEC_FAILURE);
        }
    }
}

/// Resolve the command on the search path and replace the process image.
/// Only returns when that failed.
fn exec_program(cmd: &ParsedCommand, variables: &[VariableAssignment]) -> Error {
    let exec_error = |error| Error::Exec {
        program: cmd.name.clone(),
        error,
    };

    let program = PathBuf::from(&cmd.name);
    let qualified_path = if is_qualified(&program) {
        program
    } else {
        let search_path =
            std::env::var("PATH").unwrap_or_else(|_| env!("SHEX_PATH_DEFAULT").to_string());
        match resolve_path(&program, &search_path) {
            Some(found) => found,
            None => return exec_error(io::Error::from_raw_os_error(libc::ENOENT)),
        }
    };

    let Ok(path) = CString::new(qualified_path.into_os_string().into_vec()) else {
        return exec_error(io::Error::from(io::ErrorKind::InvalidInput));
    };

    let arguments: Result<Vec<CString>, _> = cmd
        .arguments
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect();
    let Ok(arguments) = arguments else {
        return exec_error(io::Error::from(io::ErrorKind::InvalidInput));
    };

    let env = render_env(child_environment(variables));

    exec_error(execve(&path, &arguments, &env))
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::{Read, Write};

    use super::{LaunchPlan, Payload, launch};
    use crate::common::{ParsedCommand, VariableAssignment};
    use crate::system::pipe;
    use crate::system::wait::{Wait, WaitOptions};

    fn command(words: &[&str]) -> ParsedCommand {
        ParsedCommand::new(words.iter().map(|w| w.to_string()).collect()).unwrap()
    }

    fn plain_plan(payload: Payload) -> LaunchPlan<'static> {
        LaunchPlan {
            carried_stdin: None,
            pipe: None,
            redirections: &[],
            variables: &[],
            payload,
        }
    }

    #[test]
    fn builtin_status_becomes_exit_status() {
        let _lock = crate::test_support::process_test_lock();

        let cmd = command(&["whatever"]);
        let spawned = launch(&cmd, plain_plan(Payload::Builtin(|_| 5))).unwrap();
        let (_, status) = spawned.pid.wait(WaitOptions::new()).unwrap();
        assert_eq!(status.exit_status(), Some(5));
    }

    #[test]
    fn external_program_runs_with_its_arguments() {
        let _lock = crate::test_support::process_test_lock();

        let cmd = command(&["sh", "-c", "exit 3"]);
        let spawned = launch(&cmd, plain_plan(Payload::Program)).unwrap();
        let (_, status) = spawned.pid.wait(WaitOptions::new()).unwrap();
        assert_eq!(status.exit_status(), Some(3));
    }

    #[test]
    fn unresolvable_program_exits_127() {
        let _lock = crate::test_support::process_test_lock();

        let cmd = command(&["shex-no-such-program"]);
        let spawned = launch(&cmd, plain_plan(Payload::Program)).unwrap();
        let (_, status) = spawned.pid.wait(WaitOptions::new()).unwrap();
        assert_eq!(status.exit_status(), Some(127));
    }

    #[test]
    fn failed_redirection_exits_1() {
        let _lock = crate::test_support::process_test_lock();

        use crate::common::{RedirectionKind, RedirectionSpec};

        let cmd = command(&["sh", "-c", "exit 0"]);
        let redirections = [RedirectionSpec {
            kind: RedirectionKind::Input,
            path: "/definitely/not/here".into(),
        }];
        let plan = LaunchPlan {
            redirections: &redirections,
            ..plain_plan(Payload::Program)
        };

        let spawned = launch(&cmd, plan).unwrap();
        let (_, status) = spawned.pid.wait(WaitOptions::new()).unwrap();
        assert_eq!(status.exit_status(), Some(1));
    }

    #[test]
    fn pipe_producer_output_is_captured() {
        let _lock = crate::test_support::process_test_lock();

        let cmd = command(&["printf", "carried along"]);
        let plan = LaunchPlan {
            pipe: Some(pipe().unwrap()),
            ..plain_plan(Payload::Program)
        };

        let spawned = launch(&cmd, plan).unwrap();
        let carry = spawned.carry.expect("a pipe producer must yield a carry");

        let mut output = String::new();
        File::from(carry).read_to_string(&mut output).unwrap();
        assert_eq!(output, "carried along");

        spawned.pid.wait(WaitOptions::new()).unwrap();
    }

    #[test]
    fn carried_stdin_feeds_the_child() {
        let _lock = crate::test_support::process_test_lock();

        let (read_end, write_end) = pipe().unwrap();
        let mut tx = File::from(write_end);
        tx.write_all(b"abcde").unwrap();
        drop(tx);

        // `wc -c` reads the carried bytes, its own output goes through a pipe
        let cmd = command(&["wc", "-c"]);
        let plan = LaunchPlan {
            carried_stdin: Some(read_end),
            pipe: Some(pipe().unwrap()),
            ..plain_plan(Payload::Program)
        };

        let spawned = launch(&cmd, plan).unwrap();
        let mut output = String::new();
        File::from(spawned.carry.unwrap())
            .read_to_string(&mut output)
            .unwrap();
        assert_eq!(output.trim(), "5");

        spawned.pid.wait(WaitOptions::new()).unwrap();
    }

    #[test]
    fn variables_reach_only_the_child() {
        let _lock = crate::test_support::process_test_lock();

        let cmd = command(&["sh", "-c", "printf %s \"$SHEX_LAUNCH_VAR\""]);
        let variables = [VariableAssignment {
            name: "SHEX_LAUNCH_VAR".to_string(),
            value: "injected".to_string(),
        }];
        let plan = LaunchPlan {
            pipe: Some(pipe().unwrap()),
            variables: &variables,
            ..plain_plan(Payload::Program)
        };

        let spawned = launch(&cmd, plan).unwrap();
        let mut output = String::new();
        File::from(spawned.carry.unwrap())
            .read_to_string(&mut output)
            .unwrap();
        assert_eq!(output, "injected");
        assert!(std::env::var_os("SHEX_LAUNCH_VAR").is_none());

        spawned.pid.wait(WaitOptions::new()).unwrap();
    }
}
