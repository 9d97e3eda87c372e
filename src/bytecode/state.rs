use std::collections::HashMap;

use crate::bytecode::compile_error::CompileError;
use crate::bytecode::ir::Program;
use crate::bytecode::op::{Instr, HOLE, OPERAND_MAX};
use crate::pattern::LeftNode;

// =============================================================================
// COMPILER STATE - append-only instruction buffer with backpatching
// =============================================================================

/// A forward reference: the instruction at `addr` was appended with the
/// [`HOLE`] sentinel in its address operand and must be backpatched exactly
/// once before the program is finished.
///
/// `consumed` records how many input units the machine has consumed at the
/// moment this instruction jumps, measured from the nearest rewind anchor
/// (branch or repetition attempt entry). `None` means the count is not
/// statically known, which rules the hole out of rewind ramps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hole {
    pub addr: usize,
    pub consumed: Option<usize>,
}

impl Hole {
    /// Re-anchors the hole to an enclosing context that had already consumed
    /// `extra` units when the inner context was entered.
    pub fn offset(self, extra: usize) -> Self {
        Hole {
            addr: self.addr,
            consumed: self.consumed.map(|c| c + extra),
        }
    }
}

/// Assembler state for one left-context program.
///
/// The buffer is append-only; addresses handed out by [`append`] never move.
/// Forward jumps are appended with the [`HOLE`] sentinel and closed later via
/// [`fill_in`] or [`fill_with_rewind`]. `finish` refuses to produce a program
/// while any hole is open.
///
/// [`append`]: CompilerState::append
/// [`fill_in`]: CompilerState::fill_in
/// [`fill_with_rewind`]: CompilerState::fill_with_rewind
pub struct CompilerState {
    instructions: Vec<Instr>,
    aliases: HashMap<String, LeftNode>,
    /// Aliases currently being inlined, outermost first.
    expanding: Vec<String>,
    holes_created: usize,
    holes_filled: usize,
}

impl CompilerState {
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
            aliases: HashMap::new(),
            expanding: Vec::new(),
            holes_created: 0,
            holes_filled: 0,
        }
    }

    /// Address the next appended instruction will receive.
    pub fn here(&self) -> usize {
        self.instructions.len()
    }

    /// Appends one instruction, checking every operand against the 16-bit
    /// field limit, and returns its address.
    pub fn append(&mut self, instr: Instr) -> Result<usize, CompileError> {
        let addr = self.instructions.len();
        if addr as u32 > OPERAND_MAX {
            // the new instruction could never be jumped to
            return Err(CompileError::argument_too_big(addr as u32));
        }
        match instr {
            Instr::GotoNe { ch, .. } | Instr::GotoLt { ch, .. } | Instr::GotoGt { ch, .. } => {
                check_operand(ch)?;
            }
            _ => {}
        }
        if let Some(target) = instr.addr_operand() {
            if target != HOLE {
                check_operand(target)?;
            }
        }
        self.instructions.push(instr);
        Ok(addr)
    }

    /// Appends an instruction whose address operand is still unknown. The
    /// operand must carry the [`HOLE`] sentinel.
    pub fn append_hole(
        &mut self,
        instr: Instr,
        consumed: Option<usize>,
    ) -> Result<Hole, CompileError> {
        if !instr.is_hole() {
            return Err(CompileError::internal(format!(
                "append_hole on instruction without a hole: {:?}",
                instr
            )));
        }
        let addr = self.append(instr)?;
        self.holes_created += 1;
        Ok(Hole { addr, consumed })
    }

    /// Backpatches `hole` to jump to `target`. Filling the same hole twice
    /// is an internal defect and is rejected.
    pub fn fill_in(&mut self, hole: Hole, target: usize) -> Result<(), CompileError> {
        check_operand(target as u32)?;
        let instr = self
            .instructions
            .get_mut(hole.addr)
            .ok_or_else(|| CompileError::internal(format!("no instruction at {}", hole.addr)))?;
        let operand = instr.addr_operand_mut().ok_or_else(|| {
            CompileError::internal(format!("instruction at {} has no address operand", hole.addr))
        })?;
        if *operand != HOLE {
            return Err(CompileError::internal(format!(
                "hole at {} filled twice",
                hole.addr
            )));
        }
        *operand = target as u32;
        self.holes_filled += 1;
        Ok(())
    }

    /// Closes a set of failure holes so that each jump lands with the
    /// rewind anchor's cursor position restored, then continues at the
    /// common exit this function returns.
    ///
    /// Layout: with `k_max` the largest `consumed` among the holes, the
    /// buffer gains `k_max` consecutive `GOTO_NO_ADVANCE` instructions. A
    /// hole that had consumed `k` units is patched to enter the run `k`
    /// instructions before its end, so it hands back exactly `k` units
    /// before falling out at the exit address.
    pub fn fill_with_rewind(&mut self, holes: &[Hole]) -> Result<usize, CompileError> {
        let mut k_max = 0usize;
        for hole in holes {
            match hole.consumed {
                Some(k) => k_max = k_max.max(k),
                None => {
                    return Err(CompileError::unsupported(
                        "variable-length element before a point that must rewind",
                    ));
                }
            }
        }
        let base = self.here();
        for _ in 0..k_max {
            self.append(Instr::GotoNoAdvance)?;
        }
        let exit = base + k_max;
        for hole in holes {
            let k = hole.consumed.unwrap_or(0);
            self.fill_in(*hole, exit - k)?;
        }
        Ok(exit)
    }

    // -------------------------------------------------------------------------
    // Alias table
    // -------------------------------------------------------------------------

    /// Registers (or replaces) an alias definition.
    pub fn define_alias(&mut self, name: impl Into<String>, pattern: LeftNode) {
        self.aliases.insert(name.into(), pattern);
    }

    /// Looks up an alias body, cloning it out of the table, and pushes the
    /// name on the expansion stack to catch cycles.
    pub fn begin_alias(&mut self, name: &str) -> Result<LeftNode, CompileError> {
        if self.expanding.iter().any(|n| n == name) {
            return Err(CompileError::circular_alias(name));
        }
        let body = self
            .aliases
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::unknown_alias(name))?;
        self.expanding.push(name.to_string());
        Ok(body)
    }

    pub fn end_alias(&mut self) {
        self.expanding.pop();
    }

    // -------------------------------------------------------------------------
    // Finishing
    // -------------------------------------------------------------------------

    /// Seals the buffer into a [`Program`]. Any hole still carrying the
    /// sentinel is an internal defect, never a user error.
    pub fn finish(self) -> Result<Program, CompileError> {
        if self.holes_filled != self.holes_created {
            return Err(CompileError::internal(format!(
                "{} of {} holes unfilled",
                self.holes_created - self.holes_filled,
                self.holes_created
            )));
        }
        if let Some(addr) = self.instructions.iter().position(Instr::is_hole) {
            return Err(CompileError::internal(format!("unfilled hole at {}", addr)));
        }
        Ok(Program::new(self.instructions))
    }
}

impl Default for CompilerState {
    fn default() -> Self {
        Self::new()
    }
}

fn check_operand(value: u32) -> Result<(), CompileError> {
    if value > OPERAND_MAX {
        return Err(CompileError::argument_too_big(value));
    }
    Ok(())
}
