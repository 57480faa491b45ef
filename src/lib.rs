#[macro_use]
mod macros;
pub(crate) mod builtins;
pub(crate) mod common;
pub(crate) mod cutils;
pub(crate) mod exec;
pub(crate) mod log;
pub(crate) mod system;

mod shell;

pub use shell::main;

#[cfg(test)]
pub(crate) mod test_support;
