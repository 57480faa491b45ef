//! Expression evaluation for the `test` builtin.

use std::fs::{self, Metadata};
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::Path;
use std::time::SystemTime;

use crate::common::Error;
use crate::system::file_access_ok;

/// Evaluate the expression words of a `test` command.
///
/// Zero words are a false expression and a single word is true when it is
/// nonempty. `None` means the word count does not form an expression at all;
/// the caller prints no verdict in that case.
pub(crate) fn evaluate(words: &[String]) -> Result<Option<bool>, Error> {
    match words {
        [] => Ok(Some(false)),
        [word] => Ok(Some(!word.is_empty())),
        [operator, operand] => unary(operator, operand).map(Some),
        [lhs, operator, rhs] => binary(lhs, operator, rhs).map(Some),
        _ => Ok(None),
    }
}

/// File predicate flags. A path that does not exist (or cannot be inspected)
/// fails every predicate rather than erroring out.
fn unary(operator: &str, path: &str) -> Result<bool, Error> {
    let verdict = match operator {
        "-b" => metadata(path).map_or(false, |m| m.file_type().is_block_device()),
        "-c" => metadata(path).map_or(false, |m| m.file_type().is_char_device()),
        "-d" => metadata(path).map_or(false, |m| m.is_dir()),
        "-e" => Path::new(path).exists(),
        "-f" => metadata(path).map_or(false, |m| m.is_file()),
        "-g" => mode_bit_set(path, libc::S_ISGID as u32),
        "-h" | "-L" => {
            fs::symlink_metadata(path).map_or(false, |m| m.file_type().is_symlink())
        }
        "-k" => mode_bit_set(path, libc::S_ISVTX as u32),
        "-p" => metadata(path).map_or(false, |m| m.file_type().is_fifo()),
        "-r" => file_access_ok(path, libc::R_OK),
        "-s" => metadata(path).map_or(false, |m| m.len() > 0),
        "-S" => metadata(path).map_or(false, |m| m.file_type().is_socket()),
        "-u" => mode_bit_set(path, libc::S_ISUID as u32),
        "-w" => file_access_ok(path, libc::W_OK),
        "-x" => file_access_ok(path, libc::X_OK),
        unknown => {
            return Err(Error::InvalidArgument {
                what: "test",
                value: unknown.to_string(),
            });
        }
    };

    Ok(verdict)
}

fn binary(lhs: &str, operator: &str, rhs: &str) -> Result<bool, Error> {
    let verdict = match operator {
        "=" => lhs == rhs,
        "!=" => lhs != rhs,
        "-eq" => int(lhs) == int(rhs),
        "-ge" => int(lhs) >= int(rhs),
        "-gt" => int(lhs) > int(rhs),
        "-le" => int(lhs) <= int(rhs),
        "-lt" => int(lhs) < int(rhs),
        "-ne" => int(lhs) != int(rhs),
        "-ef" => same_file(lhs, rhs),
        "-nt" => newer_than(lhs, rhs),
        "-ot" => newer_than(rhs, lhs),
        unknown => {
            return Err(Error::InvalidArgument {
                what: "test",
                value: unknown.to_string(),
            });
        }
    };

    Ok(verdict)
}

fn metadata(path: &str) -> Option<Metadata> {
    fs::metadata(path).ok()
}

fn mode_bit_set(path: &str, bit: u32) -> bool {
    metadata(path).map_or(false, |m| m.permissions().mode() & bit != 0)
}

// operands that do not parse as integers compare as zero
fn int(operand: &str) -> i64 {
    operand.parse().unwrap_or(0)
}

fn same_file(lhs: &str, rhs: &str) -> bool {
    match (fs::metadata(lhs), fs::metadata(rhs)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

/// Modification-time comparison; a side that cannot be read never counts
/// as newer.
fn newer_than(lhs: &str, rhs: &str) -> bool {
    match (modified(lhs), modified(rhs)) {
        (Some(a), Some(b)) => a > b,
        _ => false,
    }
}

fn modified(path: &str) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}
