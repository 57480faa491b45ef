//! The interactive host around the execution engine: a read-parse-dispatch
//! loop over standard input, a command table the host application can
//! replace, and the `main` entry point of the `shex` binary.

use std::io::{self, BufRead, Write};

use crate::builtins::{self, Dispatch};
use crate::common::{Error, ParsedCommand};
use crate::cutils::safe_isatty;
use crate::exec::{JobController, Payload};
use crate::log::{dev_info, user_error};

use cli::{ShexAction, USAGE_MSG, long_help_message};

mod cli;
pub(crate) mod parser;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const INTRO_TEXT: &str = "\x1b[2J\x1b[Hshex - a small command shell\nType 'exit' to leave.\n";
const PROMPT_TEXT: &str = "$ ";

/// The interpreter: a job controller plus the table deciding how each
/// command name runs. Names absent from the table run as external programs.
pub struct Shell {
    controller: JobController,
    table: Vec<(&'static str, Dispatch)>,
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

impl Shell {
    /// A shell with the stock builtin table.
    pub fn new() -> Self {
        Self::with_table(builtins::default_table())
    }

    /// A shell whose command table the host application supplies.
    pub fn with_table(table: Vec<(&'static str, Dispatch)>) -> Self {
        Shell {
            controller: JobController::new(),
            table,
        }
    }

    /// Run one command the way its table entry dictates. `Ok(true)` means
    /// the interpreter should stop.
    pub fn submit(&mut self, cmd: &ParsedCommand) -> Result<bool, Error> {
        match builtins::lookup(&self.table, &cmd.name) {
            Dispatch::InProcess(builtin) => builtin(cmd),
            Dispatch::InChild(builtin) => {
                self.controller.submit(cmd, Payload::Builtin(builtin))?;
                Ok(false)
            }
            Dispatch::External => {
                self.controller.submit(cmd, Payload::Program)?;
                Ok(false)
            }
        }
    }

    /// Parse one line and submit its commands in order. Failures are
    /// reported and are local to one command; only `exit` stops the loop.
    fn interpret_line(&mut self, line: &str) -> bool {
        let commands = match parser::parse_line(line) {
            Ok(commands) => commands,
            Err(message) => {
                user_error!("{message}");
                return false;
            }
        };

        for cmd in &commands {
            match self.submit(cmd) {
                Ok(true) => return true,
                Ok(false) => {}
                Err(error) => user_error!("{error}"),
            }
        }

        false
    }

    /// The read-parse-dispatch loop over standard input. Ends at end of
    /// input or when a command asks the interpreter to stop.
    pub fn run(&mut self) -> io::Result<()> {
        let interactive = safe_isatty(libc::STDIN_FILENO);
        let stdin = io::stdin();
        self.run_loop(stdin.lock(), interactive)
    }

    fn run_loop(&mut self, input: impl BufRead, interactive: bool) -> io::Result<()> {
        let mut stdout = io::stdout();
        if interactive {
            // the shell itself must not die of an unwritable terminal
            let _ = stdout.write_all(INTRO_TEXT.as_bytes());
            let _ = stdout.flush();
        }

        let mut lines = input.lines();
        loop {
            if interactive {
                let _ = stdout.write_all(PROMPT_TEXT.as_bytes());
                let _ = stdout.flush();
            }

            let Some(line) = lines.next() else {
                break;
            };
            if self.interpret_line(&line?) {
                break;
            }
        }

        Ok(())
    }
}

pub fn main() {
    crate::log::ShexLogger::new("shex: ").into_global_logger();

    dev_info!("development logs are enabled");

    match ShexAction::from_env() {
        Ok(ShexAction::Help) => {
            println_ignore_io_error!("{}", long_help_message());
            std::process::exit(0);
        }
        Ok(ShexAction::Version) => {
            eprintln_ignore_io_error!("shex {VERSION}");
            std::process::exit(0);
        }
        Ok(ShexAction::Run) => {
            if let Err(error) = Shell::new().run() {
                user_error!("cannot read input: {error}");
                std::process::exit(1);
            }
        }
        Err(error) => {
            println_ignore_io_error!("shex: {error}\n{USAGE_MSG}");
            std::process::exit(1);
        }
    }
}
