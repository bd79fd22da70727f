//! Call frames.
//!
//! Calls never recurse on the host stack: each `call` pushes a frame holding
//! the caller's routine and return address, and `ret` pops it.

use scrivener_bytecode::RoutineId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    pub routine: RoutineId,
    /// Address of the instruction after the call.
    pub return_addr: u32,
}

#[derive(Debug, Default)]
pub struct FrameStack {
    frames: Vec<Frame>,
}

impl FrameStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, routine: RoutineId, return_addr: u32) {
        self.frames.push(Frame {
            routine,
            return_addr,
        });
    }

    /// Pop the innermost frame; `None` once the entry routine returns.
    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.frames.len() as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
