use crate::bytecode::Instr;
use serde::{Deserialize, Serialize};

/// A compiled left-context program.
///
/// Entry point is address 0; every [`Instr::Stop`] and [`Instr::Fail`] is a
/// terminal state. A finished program contains no unfilled holes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub instructions: Vec<Instr>,
}

impl Program {
    pub fn new(instructions: Vec<Instr>) -> Self {
        Self { instructions }
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Serializes the program for embedding in a compiled table file.
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Deserializes a program previously written with [`Program::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}
