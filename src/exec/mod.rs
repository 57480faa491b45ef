#![deny(unsafe_code)]

//! Launching commands and managing their lifecycle.
//!
//! A [`JobController`] turns one parsed command plus a [`Payload`] into a
//! child process: it consumes the pipe carry left by the previous command,
//! sets up fresh pipe plumbing for pipe producers, and applies the wait
//! policy the command's terminator asks for. All descriptor wiring happens
//! in the forked child, so the interpreter's own streams stay untouched.

mod carry;
mod controller;
mod environment;
mod launch;
mod redirect;

pub use controller::JobController;
pub use launch::{ChildBuiltin, Payload};
