#![forbid(unsafe_code)]
use std::{collections::HashMap, ffi::OsString};

pub use command::{
    ParsedCommand, RedirectionKind, RedirectionSpec, TerminatorKind, VariableAssignment,
};
pub use error::Error;

pub mod command;
pub mod error;
pub mod resolve;

pub type Environment = HashMap<OsString, OsString>;
