use crate::{
    bytecode::{
        compile_error::CompileError,
        ir::Program,
        op::{Instr, HOLE},
        state::{CompilerState, Hole},
    },
    parser::parse_left_pattern,
    pattern::LeftNode,
    stream::ParserStream,
};

/// One-pass code generator for left patterns.
///
/// Each construct is emitted in a single forward sweep; jumps to code that
/// does not exist yet are reserved as holes and backpatched through
/// [`CompilerState`] once the target address is known.
pub struct Compiler {
    state: CompilerState,
}

/// Result of generating code for one construct.
///
/// Success always falls through to the next appended instruction. `fail`
/// holds the holes that must be routed to wherever a failed match of this
/// construct should continue; their `consumed` counts are relative to the
/// construct's entry. `consumed` is the fixed number of units a successful
/// match eats, when that number is statically known; `min_consumed` is the
/// fewest units any successful match can eat, which is always known and
/// bounds repetition loops away from zero-width iterations.
struct Gen {
    fail: Vec<Hole>,
    consumed: Option<usize>,
    min_consumed: usize,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            state: CompilerState::new(),
        }
    }

    /// Registers an alias usable as `{name}` in patterns compiled by this
    /// compiler. Aliases are inlined at every reference site.
    pub fn define_alias(
        &mut self,
        name: impl Into<String>,
        source: &str,
    ) -> Result<(), CompileError> {
        self.state.define_alias(name, parse_full(source)?);
        Ok(())
    }

    /// Like [`Compiler::define_alias`], for an already-built tree.
    pub fn define_alias_node(&mut self, name: impl Into<String>, pattern: LeftNode) {
        self.state.define_alias(name, pattern);
    }

    /// Parses and compiles `source` into a complete program.
    pub fn compile(self, source: &str) -> Result<Program, CompileError> {
        let node = parse_full(source)?;
        self.compile_node(&node)
    }

    /// Parses and compiles `source`, anchored (see
    /// [`Compiler::compile_anchored_node`]).
    pub fn compile_anchored(self, source: &str) -> Result<Program, CompileError> {
        let node = parse_full(source)?;
        self.compile_anchored_node(&node)
    }

    /// Compiles `pattern` into a complete program: success reaches `STOP`,
    /// any failure reaches `FAIL`.
    pub fn compile_node(mut self, pattern: &LeftNode) -> Result<Program, CompileError> {
        let emitted = self.gen_left(pattern)?;
        self.state.append(Instr::Stop)?;
        let fail_addr = self.state.append(Instr::Fail)?;
        // overall failure needs no cursor restoration
        for hole in emitted.fail {
            self.state.fill_in(hole, fail_addr)?;
        }
        let program = self.state.finish()?;
        log::debug!("compiled pattern to {} instructions", program.len());
        Ok(program)
    }

    /// Like [`Compiler::compile_node`], but the match only succeeds if the
    /// pattern consumed the whole input (a beginning-of-context anchor for
    /// a machine that walks context backwards).
    pub fn compile_anchored_node(mut self, pattern: &LeftNode) -> Result<Program, CompileError> {
        let emitted = self.gen_left(pattern)?;
        let at_end = self.state.append_hole(Instr::GotoEnd { addr: HOLE }, None)?;
        let not_end = self.state.append_hole(Instr::Goto { addr: HOLE }, None)?;
        let stop_addr = self.state.here();
        self.state.fill_in(at_end, stop_addr)?;
        self.state.append(Instr::Stop)?;
        let fail_addr = self.state.append(Instr::Fail)?;
        self.state.fill_in(not_end, fail_addr)?;
        for hole in emitted.fail {
            self.state.fill_in(hole, fail_addr)?;
        }
        let program = self.state.finish()?;
        log::debug!(
            "compiled anchored pattern to {} instructions",
            program.len()
        );
        Ok(program)
    }

    // =========================================================================
    // Code generation, one method per pattern construct
    // =========================================================================

    fn gen_left(&mut self, node: &LeftNode) -> Result<Gen, CompileError> {
        match node {
            LeftNode::Wildcard => self.gen_wildcard(),
            LeftNode::Constant(ch) => self.gen_constant(*ch),
            LeftNode::StringLiteral(text) => self.gen_string(text),
            LeftNode::DoubleRange(lo, hi) => self.gen_range(*lo, *hi),
            LeftNode::Alias(name) => self.gen_alias(name),
            LeftNode::Choice(branches) => self.gen_choice(branches),
            LeftNode::NotChoice(branches) => self.gen_not_choice(branches),
            LeftNode::RepeatRange(inner, min, max) => {
                self.gen_repeat_range(inner, *min as usize, *max as usize)
            }
            LeftNode::PlusRepeat(inner, min) => self.gen_plus_repeat(inner, *min as usize),
        }
    }

    /// `.` needs a unit to be present but never cares what it is.
    fn gen_wildcard(&mut self) -> Result<Gen, CompileError> {
        let at_end = self.state.append_hole(Instr::GotoEnd { addr: HOLE }, Some(0))?;
        self.state.append(Instr::Advance)?;
        Ok(Gen {
            fail: vec![at_end],
            consumed: Some(1),
            min_consumed: 1,
        })
    }

    fn gen_constant(&mut self, ch: u32) -> Result<Gen, CompileError> {
        let miss = self
            .state
            .append_hole(Instr::GotoNe { ch, addr: HOLE }, Some(0))?;
        Ok(Gen {
            fail: vec![miss],
            consumed: Some(1),
            min_consumed: 1,
        })
    }

    /// A string is a run of constants; character `i` misfires with `i`
    /// units already consumed.
    fn gen_string(&mut self, text: &str) -> Result<Gen, CompileError> {
        let mut fail = Vec::new();
        for (i, ch) in text.chars().enumerate() {
            let miss = self.state.append_hole(
                Instr::GotoNe {
                    ch: ch as u32,
                    addr: HOLE,
                },
                Some(i),
            )?;
            fail.push(miss);
        }
        let len = text.chars().count();
        Ok(Gen {
            consumed: Some(len),
            min_consumed: len,
            fail,
        })
    }

    /// `lo-hi`: two guards bracket the unit, then one consume. A unit that
    /// passes both guards always exists, so `ADVANCE` cannot run off the
    /// end here.
    fn gen_range(&mut self, lo: u32, hi: u32) -> Result<Gen, CompileError> {
        let below = self
            .state
            .append_hole(Instr::GotoLt { ch: lo, addr: HOLE }, Some(0))?;
        let above = self
            .state
            .append_hole(Instr::GotoGt { ch: hi, addr: HOLE }, Some(0))?;
        self.state.append(Instr::Advance)?;
        Ok(Gen {
            fail: vec![below, above],
            consumed: Some(1),
            min_consumed: 1,
        })
    }

    /// Aliases are inlined where they are referenced; the expansion stack
    /// in [`CompilerState`] turns self-reference into an error instead of
    /// infinite recursion.
    fn gen_alias(&mut self, name: &str) -> Result<Gen, CompileError> {
        let body = self.state.begin_alias(name)?;
        let emitted = self.gen_left(&body);
        self.state.end_alias();
        emitted
    }

    /// A sequence of elements; failures anywhere in the tail carry the
    /// consumption of everything already matched before them.
    fn gen_seq(&mut self, elements: &[LeftNode]) -> Result<Gen, CompileError> {
        let mut fail = Vec::new();
        let mut so_far = Some(0usize);
        let mut min_sum = 0usize;
        for element in elements {
            let emitted = self.gen_left(element)?;
            for hole in emitted.fail {
                fail.push(match so_far {
                    Some(k) => hole.offset(k),
                    None => Hole {
                        addr: hole.addr,
                        consumed: None,
                    },
                });
            }
            so_far = match (so_far, emitted.consumed) {
                (Some(a), Some(b)) => Some(a + b),
                _ => None,
            };
            min_sum += emitted.min_consumed;
        }
        Ok(Gen {
            fail,
            consumed: so_far,
            min_consumed: min_sum,
        })
    }

    /// Ordered alternation. Branch `i`'s failures rewind to the entry
    /// cursor and fall into branch `i + 1`; the last branch's rewind falls
    /// into a single outward jump, so the whole choice presents one
    /// zero-consumption failure hole to its context.
    fn gen_choice(&mut self, branches: &[Vec<LeftNode>]) -> Result<Gen, CompileError> {
        if branches.len() == 1 {
            return self.gen_seq(&branches[0]);
        }
        let mut success_holes = Vec::new();
        let mut consumed: Option<Option<usize>> = None;
        let mut min_consumed: Option<usize> = None;
        for branch in branches {
            let emitted = self.gen_seq(branch)?;
            let success = self.state.append_hole(Instr::Goto { addr: HOLE }, None)?;
            success_holes.push(success);
            consumed = Some(match consumed {
                None => emitted.consumed,
                Some(prev) if prev == emitted.consumed => prev,
                Some(_) => None,
            });
            min_consumed = Some(match min_consumed {
                None => emitted.min_consumed,
                Some(prev) => prev.min(emitted.min_consumed),
            });
            // rewind ramp; its exit is the next branch (or the outward jump)
            self.state.fill_with_rewind(&emitted.fail)?;
        }
        let outward = self.state.append_hole(Instr::Goto { addr: HOLE }, Some(0))?;
        let exit = self.state.here();
        for hole in success_holes {
            self.state.fill_in(hole, exit)?;
        }
        Ok(Gen {
            fail: vec![outward],
            consumed: consumed.flatten(),
            min_consumed: min_consumed.unwrap_or(0),
        })
    }

    /// `^(...)`: succeeds on exactly one unit provided no branch matches
    /// here. A branch that matches rewinds its consumption and jumps to
    /// the construct's failure; a branch that fails rewinds and tries the
    /// next. When every branch has failed, one unit is consumed (none
    /// being left is a failure too).
    fn gen_not_choice(&mut self, branches: &[Vec<LeftNode>]) -> Result<Gen, CompileError> {
        let mut outward = Vec::new();
        for branch in branches {
            let emitted = self.gen_seq(branch)?;
            let k = emitted.consumed.ok_or_else(|| {
                CompileError::unsupported("variable-length branch under negation")
            })?;
            for _ in 0..k {
                self.state.append(Instr::GotoNoAdvance)?;
            }
            let matched = self.state.append_hole(Instr::Goto { addr: HOLE }, Some(0))?;
            outward.push(matched);
            self.state.fill_with_rewind(&emitted.fail)?;
        }
        let at_end = self.state.append_hole(Instr::GotoEnd { addr: HOLE }, Some(0))?;
        outward.push(at_end);
        self.state.append(Instr::Advance)?;
        Ok(Gen {
            fail: outward,
            consumed: Some(1),
            min_consumed: 1,
        })
    }

    /// `<min,max>`: `min` mandatory copies whose failures propagate
    /// outward, then `max - min` optional attempts. A failed attempt
    /// rewinds to its own entry and leaves through the repeat's exit; the
    /// repeat still succeeds.
    fn gen_repeat_range(
        &mut self,
        inner: &LeftNode,
        min: usize,
        max: usize,
    ) -> Result<Gen, CompileError> {
        let mandatory = self.gen_mandatory(inner, min)?;

        let mut exit_holes = Vec::new();
        let mut pending_success: Option<Hole> = None;
        for _ in min..max {
            if let Some(success) = pending_success.take() {
                let entry = self.state.here();
                self.state.fill_in(success, entry)?;
            }
            let emitted = self.gen_left(inner)?;
            pending_success = Some(self.state.append_hole(Instr::Goto { addr: HOLE }, None)?);
            self.state.fill_with_rewind(&emitted.fail)?;
            let to_exit = self.state.append_hole(Instr::Goto { addr: HOLE }, None)?;
            exit_holes.push(to_exit);
        }
        if let Some(success) = pending_success {
            exit_holes.push(success);
        }
        let exit = self.state.here();
        for hole in exit_holes {
            self.state.fill_in(hole, exit)?;
        }

        Ok(Gen {
            fail: mandatory.fail,
            consumed: if min == max { mandatory.consumed } else { None },
            min_consumed: mandatory.min_consumed,
        })
    }

    /// `<min,>`: `min` mandatory copies, then a loop that keeps taking
    /// copies until one fails, rewinds that attempt, and exits.
    fn gen_plus_repeat(&mut self, inner: &LeftNode, min: usize) -> Result<Gen, CompileError> {
        let mandatory = self.gen_mandatory(inner, min)?;

        let loop_start = self.state.here();
        let emitted = self.gen_left(inner)?;
        // an iteration that can succeed on zero units never lets the loop
        // reach the failing exit
        if emitted.min_consumed == 0 {
            return Err(CompileError::unsupported(
                "unbounded repetition of a pattern that can match zero units",
            ));
        }
        self.state.append(Instr::Goto {
            addr: loop_start as u32,
        })?;
        // a failed iteration rewinds and falls out here
        self.state.fill_with_rewind(&emitted.fail)?;

        Ok(Gen {
            fail: mandatory.fail,
            consumed: None,
            min_consumed: mandatory.min_consumed,
        })
    }

    /// `count` consecutive copies of `inner`, fused into one sequence-like
    /// result.
    fn gen_mandatory(&mut self, inner: &LeftNode, count: usize) -> Result<Gen, CompileError> {
        let mut fail = Vec::new();
        let mut so_far = Some(0usize);
        let mut min_sum = 0usize;
        for _ in 0..count {
            let emitted = self.gen_left(inner)?;
            for hole in emitted.fail {
                fail.push(match so_far {
                    Some(k) => hole.offset(k),
                    None => Hole {
                        addr: hole.addr,
                        consumed: None,
                    },
                });
            }
            so_far = match (so_far, emitted.consumed) {
                (Some(a), Some(b)) => Some(a + b),
                _ => None,
            };
            min_sum += emitted.min_consumed;
        }
        Ok(Gen {
            fail,
            consumed: so_far,
            min_consumed: min_sum,
        })
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses and compiles a pattern in one call.
pub fn compile_pattern(source: &str) -> Result<Program, CompileError> {
    Compiler::new().compile(source)
}

/// Parses a complete pattern, rejecting trailing input.
fn parse_full(source: &str) -> Result<LeftNode, CompileError> {
    let mut stream = ParserStream::new(source);
    let node = parse_left_pattern(&mut stream)?;
    if let Some(extra) = stream.skip_space() {
        return Err(stream.error(Some(extra)).into());
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::op::OPERAND_MAX;

    fn instrs(source: &str) -> Vec<Instr> {
        compile_pattern(source).unwrap().instructions
    }

    // =========================================================================
    // Exact layouts
    // =========================================================================

    #[test]
    fn test_single_constant() {
        assert_eq!(
            instrs("97"),
            vec![
                Instr::GotoNe { ch: 97, addr: 2 },
                Instr::Stop,
                Instr::Fail,
            ]
        );
    }

    #[test]
    fn test_range_guards() {
        assert_eq!(
            instrs("65-90"),
            vec![
                Instr::GotoLt { ch: 65, addr: 4 },
                Instr::GotoGt { ch: 90, addr: 4 },
                Instr::Advance,
                Instr::Stop,
                Instr::Fail,
            ]
        );
    }

    #[test]
    fn test_string_emits_one_hole_per_char() {
        assert_eq!(
            instrs(r#""ab""#),
            vec![
                Instr::GotoNe { ch: 97, addr: 3 },
                Instr::GotoNe { ch: 98, addr: 3 },
                Instr::Stop,
                Instr::Fail,
            ]
        );
    }

    #[test]
    fn test_alternation_with_rewind_ramps() {
        // branch failures hand back what the branch consumed before the
        // next branch runs
        assert_eq!(
            instrs(r#""ab"|"ac""#),
            vec![
                Instr::GotoNe { ch: 97, addr: 4 },
                Instr::GotoNe { ch: 98, addr: 3 },
                Instr::Goto { addr: 9 },
                Instr::GotoNoAdvance,
                Instr::GotoNe { ch: 97, addr: 8 },
                Instr::GotoNe { ch: 99, addr: 7 },
                Instr::Goto { addr: 9 },
                Instr::GotoNoAdvance,
                Instr::Goto { addr: 10 },
                Instr::Stop,
                Instr::Fail,
            ]
        );
    }

    #[test]
    fn test_negation_of_single_char() {
        assert_eq!(
            instrs(r#"^("x")"#),
            vec![
                Instr::GotoNe { ch: 120, addr: 3 },
                Instr::GotoNoAdvance,
                Instr::Goto { addr: 6 },
                Instr::GotoEnd { addr: 6 },
                Instr::Advance,
                Instr::Stop,
                Instr::Fail,
            ]
        );
    }

    #[test]
    fn test_bounded_repeat() {
        assert_eq!(
            instrs("97<1,2>"),
            vec![
                Instr::GotoNe { ch: 97, addr: 5 },
                Instr::GotoNe { ch: 97, addr: 3 },
                Instr::Goto { addr: 4 },
                Instr::Goto { addr: 4 },
                Instr::Stop,
                Instr::Fail,
            ]
        );
    }

    #[test]
    fn test_unbounded_repeat_loops_backward() {
        assert_eq!(
            instrs("97<2,>"),
            vec![
                Instr::GotoNe { ch: 97, addr: 5 },
                Instr::GotoNe { ch: 97, addr: 5 },
                Instr::GotoNe { ch: 97, addr: 4 },
                Instr::Goto { addr: 2 },
                Instr::Stop,
                Instr::Fail,
            ]
        );
    }

    #[test]
    fn test_anchored_compile_checks_for_end() {
        let program = Compiler::new().compile_anchored("97").unwrap();
        assert_eq!(
            program.instructions,
            vec![
                Instr::GotoNe { ch: 97, addr: 4 },
                Instr::GotoEnd { addr: 3 },
                Instr::Goto { addr: 4 },
                Instr::Stop,
                Instr::Fail,
            ]
        );
    }

    // =========================================================================
    // Aliases
    // =========================================================================

    #[test]
    fn test_alias_is_inlined() {
        let mut compiler = Compiler::new();
        compiler.define_alias("letter", "97-122").unwrap();
        let program = compiler.compile("{letter}").unwrap();
        assert_eq!(program.instructions, instrs("97-122"));
    }

    #[test]
    fn test_alias_can_reference_other_aliases() {
        let mut compiler = Compiler::new();
        compiler.define_alias("lower", "97-122").unwrap();
        compiler.define_alias("twice", "{lower} {lower}").unwrap();
        let program = compiler.compile("{twice}").unwrap();
        assert_eq!(program.instructions, instrs("97-122 97-122"));
    }

    #[test]
    fn test_unknown_alias_is_reported() {
        let err = compile_pattern("{nope}").unwrap_err();
        assert!(matches!(err, CompileError::UnknownAlias { .. }));
    }

    #[test]
    fn test_circular_alias_is_reported() {
        let mut compiler = Compiler::new();
        compiler.define_alias("a", "{b}").unwrap();
        compiler.define_alias("b", "{a}").unwrap();
        let err = compiler.compile("{a}").unwrap_err();
        assert!(matches!(err, CompileError::CircularAlias { .. }));
    }

    #[test]
    fn test_trailing_input_is_rejected() {
        let err = compile_pattern("97 )").unwrap_err();
        assert!(matches!(err, CompileError::Syntax(_)));
    }

    // =========================================================================
    // Error cases
    // =========================================================================

    #[test]
    fn test_constant_operand_overflow() {
        let err = compile_pattern("70000").unwrap_err();
        assert!(matches!(err, CompileError::ArgumentTooBig { value: 70000, .. }));
    }

    #[test]
    fn test_syntax_error_propagates() {
        let err = compile_pattern("97|").unwrap_err();
        assert!(matches!(err, CompileError::Syntax(_)));
    }

    #[test]
    fn test_variable_length_branch_under_negation_rejected() {
        let err = compile_pattern("^(97<0,1>)").unwrap_err();
        assert!(matches!(err, CompileError::Unsupported { .. }));
    }

    #[test]
    fn test_variable_length_before_rewind_rejected() {
        // the first branch cannot be rewound once a variable-length
        // element has run
        let err = compile_pattern("(97<0,1> 98|99)").unwrap_err();
        assert!(matches!(err, CompileError::Unsupported { .. }));
    }

    #[test]
    fn test_unfailable_unbounded_repeat_rejected() {
        // a zero-copy repeat matches nothing and never fails; looping it
        // forever would never terminate
        let inner = LeftNode::RepeatRange(Box::new(LeftNode::Constant(97)), 0, 0);
        let node = LeftNode::PlusRepeat(Box::new(inner), 1);
        let err = Compiler::new().compile_node(&node).unwrap_err();
        assert!(matches!(err, CompileError::Unsupported { .. }));
    }

    #[test]
    fn test_zero_width_branch_unbounded_repeat_rejected() {
        // the empty-string branch lets an iteration succeed without
        // consuming, so the loop would never advance past it
        let err = compile_pattern(r#"(97|"")<1,>"#).unwrap_err();
        assert!(matches!(err, CompileError::Unsupported { .. }));
    }

    #[test]
    fn test_empty_string_unbounded_repeat_rejected() {
        let err = compile_pattern(r#"("")<1,>"#).unwrap_err();
        assert!(matches!(err, CompileError::Unsupported { .. }));
    }

    // =========================================================================
    // Structural properties
    // =========================================================================

    #[test]
    fn test_finished_programs_have_no_holes_and_valid_targets() {
        let corpus = [
            "97",
            ".",
            "65-90",
            r#""hello""#,
            r#""ab"|"ac"|"ad""#,
            "^(97|98 99)",
            "97<2,3>",
            "97<1,>",
            "(97|98) 99 (100|101)",
            "97 (98|99)<0,2> 100",
        ];
        for source in corpus {
            let program = compile_pattern(source).unwrap();
            for (addr, instr) in program.instructions.iter().enumerate() {
                assert!(!instr.is_hole(), "{}: hole left at {}", source, addr);
                if let Some(target) = instr.addr_operand() {
                    assert!(
                        (target as usize) < program.len(),
                        "{}: target {} out of range at {}",
                        source,
                        target,
                        addr
                    );
                }
            }
            assert!(program.len() <= OPERAND_MAX as usize);
        }
    }

    #[test]
    fn test_stop_and_fail_are_last() {
        for source in ["97", r#""ab"|"ac""#, "97<1,2>"] {
            let program = compile_pattern(source).unwrap();
            let n = program.len();
            assert_eq!(program.instructions[n - 2], Instr::Stop);
            assert_eq!(program.instructions[n - 1], Instr::Fail);
        }
    }
}
