use crate::bytecode::ir::Program;
use crate::bytecode::op::Instr;

/// Default ceiling on executed instructions per match attempt.
pub const DEFAULT_STEP_LIMIT: usize = 100_000;

/// Result of running a compiled program against one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The pattern matched a prefix of `consumed` units.
    Matched { consumed: usize },
    Failed,
}

#[derive(Debug, Clone, Copy)]
pub struct MatcherConfig {
    /// Abort the attempt after this many executed instructions. A correct
    /// program terminates long before; the limit turns a compiler defect
    /// into a logged failure instead of a hang.
    pub step_limit: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }
}

/// Executes compiled left-context programs.
///
/// The machine has two registers: `pc` and a cursor counting consumed input
/// units. There is no stack; every internal invariant violation (rewind
/// below zero, jump out of range) is reported as a failed match rather than
/// a panic.
pub struct Matcher<'a> {
    program: &'a Program,
    config: MatcherConfig,
}

impl<'a> Matcher<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self {
            program,
            config: MatcherConfig::default(),
        }
    }

    pub fn with_config(program: &'a Program, config: MatcherConfig) -> Self {
        Self { program, config }
    }

    /// Runs the program against `input`, one `u32` per unit.
    pub fn run(&self, input: &[u32]) -> MatchOutcome {
        let code = &self.program.instructions;
        let mut pc = 0usize;
        let mut cursor = 0usize;
        let mut steps = 0usize;

        loop {
            steps += 1;
            if steps > self.config.step_limit {
                log::warn!("step limit {} exceeded, aborting match", self.config.step_limit);
                return MatchOutcome::Failed;
            }
            let Some(instr) = code.get(pc) else {
                log::error!("pc {} out of range (program has {} instructions)", pc, code.len());
                return MatchOutcome::Failed;
            };
            match *instr {
                Instr::Goto { addr } => pc = addr as usize,
                Instr::GotoNe { ch, addr } => {
                    if input.get(cursor) == Some(&ch) {
                        cursor += 1;
                        pc += 1;
                    } else {
                        pc = addr as usize;
                    }
                }
                Instr::GotoLt { ch, addr } => match input.get(cursor) {
                    Some(&unit) if unit >= ch => pc += 1,
                    _ => pc = addr as usize,
                },
                Instr::GotoGt { ch, addr } => match input.get(cursor) {
                    Some(&unit) if unit <= ch => pc += 1,
                    _ => pc = addr as usize,
                },
                Instr::GotoNoAdvance => {
                    if cursor == 0 {
                        log::error!("rewind below start of input at pc {}", pc);
                        return MatchOutcome::Failed;
                    }
                    cursor -= 1;
                    pc += 1;
                }
                Instr::GotoEnd { addr } => {
                    if cursor == input.len() {
                        pc = addr as usize;
                    } else {
                        pc += 1;
                    }
                }
                Instr::Advance => {
                    if cursor == input.len() {
                        return MatchOutcome::Failed;
                    }
                    cursor += 1;
                    pc += 1;
                }
                Instr::Stop => return MatchOutcome::Matched { consumed: cursor },
                Instr::Fail => return MatchOutcome::Failed,
            }
        }
    }

    /// Convenience wrapper treating each `char` of `input` as one unit.
    pub fn run_str(&self, input: &str) -> MatchOutcome {
        let units: Vec<u32> = input.chars().map(|c| c as u32).collect();
        self.run(&units)
    }
}
