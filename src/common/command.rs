use std::path::{Path, PathBuf};

/// One parsed command line, as handed to the execution engine.
///
/// `arguments` always carries the command name as its first element, so the
/// argv of an external program is the `arguments` vector as-is.
#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub struct ParsedCommand {
    pub name: String,
    pub arguments: Vec<String>,
    pub variables: Vec<VariableAssignment>,
    pub redirections: Vec<RedirectionSpec>,
    pub terminator: TerminatorKind,
}

impl ParsedCommand {
    /// A command made of bare words: a name, its arguments, and nothing else.
    /// Returns `None` when there is no name to speak of.
    pub fn new(words: Vec<String>) -> Option<Self> {
        let name = words.first()?.clone();
        Some(ParsedCommand {
            name,
            arguments: words,
            variables: Vec::new(),
            redirections: Vec::new(),
            terminator: TerminatorKind::Normal,
        })
    }

    /// The words after the command name (may be empty).
    pub fn operands(&self) -> &[String] {
        self.arguments.get(1..).unwrap_or_default()
    }
}

/// A `NAME=value` assignment that only the launched child gets to see.
#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub struct VariableAssignment {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone)]
#[cfg_attr(test, derive(PartialEq))]
pub struct RedirectionSpec {
    pub kind: RedirectionKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectionKind {
    /// `< path`: read standard input from an existing file.
    Input,
    /// `> path`: write standard output to a file, clobbering prior contents.
    TruncateOutput,
    /// `>> path`: write standard output to the end of a file.
    AppendOutput,
}

/// How the command line ended, which decides the wait policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminatorKind {
    /// Run in the foreground; the interpreter waits for this child.
    Normal,
    /// `&`: run in the background; collected by a later reap sweep.
    Backgrounded,
    /// `|`: run without waiting and carry standard output to the next command.
    Piped,
}

//checks whether the Path is actually describing a qualified path (i.e. contains "/")
//or just specifying the name of a file (in which case we are going to resolve it via PATH)
pub(crate) fn is_qualified(path: impl AsRef<Path>) -> bool {
    path.as_ref().parent() != Some(Path::new(""))
}
