use std::os::fd::OwnedFd;

use crate::common::Error;

/// Holder of the read end of the pipe created for the previous `Piped`
/// command.
///
/// At most one carry is outstanding at any time. The next launched command
/// consumes it as its standard input, whatever its own terminator is; a
/// command that never materializes leaves the carry for the one after it.
#[derive(Default)]
pub struct PipeCarry {
    slot: Option<OwnedFd>,
}

impl PipeCarry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve and clear the pending carry, if any.
    pub fn take(&mut self) -> Option<OwnedFd> {
        self.slot.take()
    }

    /// Store the read end produced by a pipe-producing command.
    ///
    /// Refuses to overwrite an occupied slot: losing the previous read end
    /// here would silently discard that command's output.
    pub fn set(&mut self, fd: OwnedFd) -> Result<(), Error> {
        if self.slot.is_some() {
            return Err(Error::CarryOccupied);
        }
        self.slot = Some(fd);
        Ok(())
    }
}
