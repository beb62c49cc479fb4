//! Execution context and frame identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Address, Architecture, ProcessId, ThreadId};

/// Identity of a call frame
///
/// Two stops with equal identities share every frame-scoped cache (the
/// register catalog and the instruction window). Any difference in the frame
/// address, thread or architecture forces a full rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameIdentity
{
    /// Address identifying the frame (the host's frame/stack address)
    pub address: Address,
    /// Thread owning the frame
    pub thread: ThreadId,
    /// Architecture the frame executes in
    pub architecture: Architecture,
}

impl fmt::Display for FrameIdentity
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}@{:#x}/{}", self.architecture, self.address, self.thread.raw())
    }
}

/// Everything a render needs to know about the current stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext
{
    /// Process the stop belongs to
    pub process: ProcessId,
    /// Selected frame
    pub frame: FrameIdentity,
    /// Program counter of the selected frame
    pub pc: Address,
}

impl ExecutionContext
{
    /// Architecture of the selected frame.
    pub fn architecture(&self) -> Architecture
    {
        self.frame.architecture
    }

    /// Thread of the selected frame.
    pub fn thread(&self) -> ThreadId
    {
        self.frame.thread
    }
}
