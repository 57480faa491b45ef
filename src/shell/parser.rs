//! The line parser: one input line becomes the commands it submits, in order.
//!
//! The grammar is deliberately small: whitespace-separated words with single
//! and double quoting, `NAME=value` assignment prefixes, the `<`, `>` and
//! `>>` file redirections, and the `;`, `&` and `|` terminators. A terminator
//! ends the command before it and decides how it runs; the engine receives
//! the commands one at a time, so `a | b` is handled exactly like `a |` on
//! one line and `b` on the next: the carried pipe end connects them.

use std::iter::Peekable;
use std::str::Chars;

use crate::common::{
    ParsedCommand, RedirectionKind, RedirectionSpec, TerminatorKind, VariableAssignment,
};

#[derive(Debug, PartialEq)]
enum Token {
    Word(String),
    Redirect(RedirectionKind),
    Terminator(TerminatorKind),
}

fn is_operator(c: char) -> bool {
    matches!(c, '<' | '>' | ';' | '&' | '|')
}

fn tokenize(line: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut stream = line.chars().peekable();

    loop {
        while stream.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&c) = stream.peek() else {
            break;
        };

        let token = match c {
            '<' => {
                stream.next();
                Token::Redirect(RedirectionKind::Input)
            }
            '>' => {
                stream.next();
                if stream.next_if(|&c| c == '>').is_some() {
                    Token::Redirect(RedirectionKind::AppendOutput)
                } else {
                    Token::Redirect(RedirectionKind::TruncateOutput)
                }
            }
            ';' => {
                stream.next();
                Token::Terminator(TerminatorKind::Normal)
            }
            '&' => {
                stream.next();
                Token::Terminator(TerminatorKind::Backgrounded)
            }
            '|' => {
                stream.next();
                Token::Terminator(TerminatorKind::Piped)
            }
            _ => Token::Word(read_word(&mut stream)?),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

/// Read one word; quoted stretches keep their whitespace and operator
/// characters but lose the quotes themselves.
fn read_word(stream: &mut Peekable<Chars>) -> Result<String, String> {
    let mut word = String::new();

    while let Some(&c) = stream.peek() {
        match c {
            '\'' | '"' => {
                stream.next();
                loop {
                    match stream.next() {
                        Some(close) if close == c => break,
                        Some(inner) => word.push(inner),
                        None => return Err(format!("missing closing {c} quote")),
                    }
                }
            }
            c if c.is_whitespace() || is_operator(c) => break,
            c => {
                word.push(c);
                stream.next();
            }
        }
    }

    Ok(word)
}

/// A word of the shape `NAME=value` before the command name starts is an
/// assignment for the child's environment.
fn variable_assignment(word: &str) -> Option<VariableAssignment> {
    let (name, value) = word.split_once('=')?;

    let mut chars = name.chars();
    let leading_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !leading_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    Some(VariableAssignment {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn redirect_symbol(kind: RedirectionKind) -> &'static str {
    match kind {
        RedirectionKind::Input => "<",
        RedirectionKind::TruncateOutput => ">",
        RedirectionKind::AppendOutput => ">>",
    }
}

fn terminator_symbol(kind: TerminatorKind) -> char {
    match kind {
        TerminatorKind::Normal => ';',
        TerminatorKind::Backgrounded => '&',
        TerminatorKind::Piped => '|',
    }
}

/// One command under construction.
#[derive(Default)]
struct Segment {
    variables: Vec<VariableAssignment>,
    words: Vec<String>,
    redirections: Vec<RedirectionSpec>,
}

impl Segment {
    /// Close the segment. `Ok(None)` when it names no command: an empty
    /// stretch of line, or bare assignments with nothing to apply them to.
    fn finish(self, terminator: TerminatorKind) -> Result<Option<ParsedCommand>, String> {
        if self.words.is_empty() {
            if !self.redirections.is_empty() {
                return Err("redirection without a command".to_string());
            }
            return Ok(None);
        }

        let mut cmd = ParsedCommand::new(self.words).expect("words are nonempty");
        cmd.variables = self.variables;
        cmd.redirections = self.redirections;
        cmd.terminator = terminator;
        Ok(Some(cmd))
    }
}

/// Parse one line of input into the commands it submits, in order.
///
/// The final command of a line needs no explicit terminator and runs in the
/// foreground. An empty line, or one holding only variable assignments,
/// submits nothing.
pub fn parse_line(line: &str) -> Result<Vec<ParsedCommand>, String> {
    let mut commands = Vec::new();
    let mut segment = Segment::default();
    let mut tokens = tokenize(line)?.into_iter();

    while let Some(token) = tokens.next() {
        match token {
            Token::Word(word) => {
                if segment.words.is_empty() {
                    if let Some(assignment) = variable_assignment(&word) {
                        segment.variables.push(assignment);
                        continue;
                    }
                }
                segment.words.push(word);
            }
            Token::Redirect(kind) => {
                let Some(Token::Word(path)) = tokens.next() else {
                    return Err(format!(
                        "redirection '{}' needs a file name",
                        redirect_symbol(kind)
                    ));
                };
                segment.redirections.push(RedirectionSpec {
                    kind,
                    path: path.into(),
                });
            }
            Token::Terminator(kind) => {
                let Some(cmd) = std::mem::take(&mut segment).finish(kind)? else {
                    return Err(format!("missing command before '{}'", terminator_symbol(kind)));
                };
                commands.push(cmd);
            }
        }
    }

    if let Some(cmd) = segment.finish(TerminatorKind::Normal)? {
        commands.push(cmd);
    }

    Ok(commands)
}
