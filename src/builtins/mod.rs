//! The interpreter's own commands and how each one is routed.
//!
//! Most builtins run inside the interpreter process itself. `echo` is the
//! exception: it writes to standard output, so it runs in a forked child
//! where redirections and the pipe carry apply to it like to any external
//! program. Names not in [`default_table`] run as external programs.

use crate::common::{Error, ParsedCommand};
use crate::exec::ChildBuiltin;
use crate::system;
use crate::system::interface::ProcessId;
use crate::system::signal::{self, SignalNumber};

mod cond;

/// A builtin that runs in the interpreter process. The returned flag tells
/// the interpreter loop to stop once it is `true`.
pub type InProcessBuiltin = fn(&ParsedCommand) -> Result<bool, Error>;

/// How a command name is to be run.
#[derive(Clone, Copy)]
pub enum Dispatch {
    /// Inside the interpreter process, without forking.
    InProcess(InProcessBuiltin),
    /// In a forked child, wired up like an external program.
    InChild(ChildBuiltin),
    /// As an external program image found on the search path.
    External,
}

/// The name-to-dispatch table a stock interpreter starts with.
pub fn default_table() -> Vec<(&'static str, Dispatch)> {
    vec![
        ("exit", Dispatch::InProcess(exit)),
        ("echo", Dispatch::InChild(echo_in_child)),
        ("cd", Dispatch::InProcess(cd)),
        ("kill", Dispatch::InProcess(kill)),
        ("test", Dispatch::InProcess(cond)),
    ]
}

/// Find the dispatch for a command name; unknown names run externally.
pub fn lookup(table: &[(&'static str, Dispatch)], name: &str) -> Dispatch {
    table
        .iter()
        .find(|&&(entry, _)| entry == name)
        .map(|&(_, dispatch)| dispatch)
        .unwrap_or(Dispatch::External)
}

/// Report the command line one last time and signal the loop to stop.
fn exit(cmd: &ParsedCommand) -> Result<bool, Error> {
    println_ignore_io_error!("command:   {}", cmd.name);
    println_ignore_io_error!("arguments: {}", cmd.arguments.join(" "));
    println_ignore_io_error!();
    Ok(true)
}

/// The child half of `echo`: operands joined by single spaces, one line.
fn echo_in_child(cmd: &ParsedCommand) -> i32 {
    println_ignore_io_error!("{}", cmd.operands().join(" "));
    0
}

/// Change the working directory of the interpreter itself.
fn cd(cmd: &ParsedCommand) -> Result<bool, Error> {
    let Some(path) = cmd.operands().first() else {
        return Err(Error::MissingArgument("cd"));
    };

    system::chdir(path).map_err(|error| Error::ChangeDirectory {
        path: path.into(),
        error,
    })?;

    Ok(false)
}

/// `kill <pid>` sends SIGTERM, `kill -s <signal> <pid>` sends the given
/// signal number, and `kill` alone prints a signal reference table. Other
/// operand counts pass without effect.
fn kill(cmd: &ParsedCommand) -> Result<bool, Error> {
    match cmd.operands() {
        [] => {
            for &(number, name) in signal::SIGNAL_TABLE {
                println_ignore_io_error!("{number:>2}) {name}");
            }
            Ok(false)
        }
        [pid] => send(parse_pid(pid)?, signal::consts::SIGTERM),
        [flag, number, pid] if flag == "-s" => send(parse_pid(pid)?, parse_signal(number)?),
        [flag, _, _] => Err(Error::InvalidArgument {
            what: "kill",
            value: flag.clone(),
        }),
        _ => Ok(false),
    }
}

fn parse_pid(operand: &str) -> Result<ProcessId, Error> {
    operand.parse().map_err(|_| Error::InvalidArgument {
        what: "kill",
        value: operand.to_string(),
    })
}

fn parse_signal(operand: &str) -> Result<SignalNumber, Error> {
    operand.parse().map_err(|_| Error::InvalidArgument {
        what: "kill",
        value: operand.to_string(),
    })
}

fn send(pid: ProcessId, signal: SignalNumber) -> Result<bool, Error> {
    system::kill(pid, signal).map_err(|error| Error::Kill { pid, error })?;
    Ok(false)
}

/// Evaluate a `test` expression and print the verdict. Word counts that do
/// not form an expression produce no verdict line.
fn cond(cmd: &ParsedCommand) -> Result<bool, Error> {
    if let Some(verdict) = cond::evaluate(cmd.operands())? {
        println_ignore_io_error!("{}", if verdict { "TRUE" } else { "FALSE" });
    }
    Ok(false)
}
