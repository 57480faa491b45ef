pub const USAGE_MSG: &str = "Usage: shex [options]";

const DESCRIPTOR: &str = "Run a small interactive command shell.";

const HELP_MSG: &str = "Options:
-h, --help                      display this help
-V, --version                   display version
";

pub fn long_help_message() -> String {
    format!("{USAGE_MSG}\n\n{DESCRIPTOR}\n\n{HELP_MSG}")
}

#[cfg_attr(test, derive(Debug, PartialEq))]
pub enum ShexAction {
    Help,
    Version,
    Run,
}

impl ShexAction {
    pub fn from_env() -> Result<Self, String> {
        Self::parse_arguments(std::env::args())
    }

    /// The shell takes no operands; only the help and version flags exist.
    fn parse_arguments(arguments: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut help = false;
        let mut version = false;

        for arg in arguments.into_iter().skip(1) {
            match arg.as_str() {
                "-h" | "--help" => {
                    if help {
                        return Err(more_than_once("--help"));
                    }
                    help = true;
                }
                "-V" | "--version" => {
                    if version {
                        return Err(more_than_once("--version"));
                    }
                    version = true;
                }
                _ => return Err(format!("unrecognized option '{arg}'")),
            }
        }

        Ok(if help {
            ShexAction::Help
        } else if version {
            ShexAction::Version
        } else {
            ShexAction::Run
        })
    }
}

fn more_than_once(flag: &str) -> String {
    format!("argument '{flag}' was provided more than once, but cannot be used multiple times")
}
