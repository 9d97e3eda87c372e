use serde::{Deserialize, Serialize};

// =============================================================================
// INSTR - Matching-machine instructions
// =============================================================================

/// Largest value an instruction operand may carry. Operands are stored in
/// 16-bit fields in the on-disk table format, so both character codes and
/// instruction addresses are capped here.
pub const OPERAND_MAX: u32 = 0xFFFF;

/// Sentinel stored in an address operand that has been reserved but not yet
/// backpatched. Deliberately above [`OPERAND_MAX`] so an unfilled hole can
/// never be mistaken for a real address.
pub const HOLE: u32 = u32::MAX;

/// One instruction of the left-context matching machine.
///
/// The machine walks backwards context with two registers: `pc` (instruction
/// address) and `cursor` (units consumed so far). There is no runtime stack;
/// all branching is compiled into the address operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instr {
    /// Unconditional jump to `addr`.
    Goto { addr: u32 },

    /// If the next unit equals `ch`, consume it and fall through.
    /// Otherwise (including at end of input) jump to `addr` without
    /// consuming anything.
    GotoNe { ch: u32, addr: u32 },

    /// Guard: if the next unit is below `ch`, jump to `addr`. On
    /// fall-through nothing is consumed; a later instruction does that.
    /// At end of input the guard jumps.
    GotoLt { ch: u32, addr: u32 },

    /// Guard: if the next unit is above `ch`, jump to `addr`. Same
    /// consumption rules as [`Instr::GotoLt`].
    GotoGt { ch: u32, addr: u32 },

    /// Hand the most recently consumed unit back (`cursor -= 1`) and fall
    /// through. Rewind ramps are built from runs of these.
    GotoNoAdvance,

    /// Jump to `addr` when the cursor sits at the end of the input,
    /// otherwise fall through.
    GotoEnd { addr: u32 },

    /// Consume one unit unconditionally. Running off the end of the input
    /// fails the match.
    Advance,

    /// Successful match; the cursor tells how many units matched.
    Stop,

    /// Unsuccessful match.
    Fail,
}

impl Instr {
    /// The address operand, for instructions that have one.
    pub fn addr_operand(&self) -> Option<u32> {
        match self {
            Instr::Goto { addr }
            | Instr::GotoNe { addr, .. }
            | Instr::GotoLt { addr, .. }
            | Instr::GotoGt { addr, .. }
            | Instr::GotoEnd { addr } => Some(*addr),
            Instr::GotoNoAdvance | Instr::Advance | Instr::Stop | Instr::Fail => None,
        }
    }

    /// Mutable access to the address operand; backpatching goes through here.
    pub fn addr_operand_mut(&mut self) -> Option<&mut u32> {
        match self {
            Instr::Goto { addr }
            | Instr::GotoNe { addr, .. }
            | Instr::GotoLt { addr, .. }
            | Instr::GotoGt { addr, .. }
            | Instr::GotoEnd { addr } => Some(addr),
            Instr::GotoNoAdvance | Instr::Advance | Instr::Stop | Instr::Fail => None,
        }
    }

    /// True while the address operand still holds the [`HOLE`] sentinel.
    pub fn is_hole(&self) -> bool {
        self.addr_operand() == Some(HOLE)
    }
}

impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn addr(a: u32) -> String {
            if a == HOLE {
                "????".to_string()
            } else {
                format!("{:04}", a)
            }
        }
        match self {
            Instr::Goto { addr: a } => write!(f, "GOTO         {}", addr(*a)),
            Instr::GotoNe { ch, addr: a } => write!(f, "GOTO_NE      {:5} {}", ch, addr(*a)),
            Instr::GotoLt { ch, addr: a } => write!(f, "GOTO_LT      {:5} {}", ch, addr(*a)),
            Instr::GotoGt { ch, addr: a } => write!(f, "GOTO_GT      {:5} {}", ch, addr(*a)),
            Instr::GotoNoAdvance => write!(f, "GOTO_NO_ADVANCE"),
            Instr::GotoEnd { addr: a } => write!(f, "GOTO_END     {}", addr(*a)),
            Instr::Advance => write!(f, "ADVANCE"),
            Instr::Stop => write!(f, "STOP"),
            Instr::Fail => write!(f, "FAIL"),
        }
    }
}
