use crate::bytecode::ir::Program;
use crate::bytecode::op::Instr;

/// Print disassembly of a compiled left-context program
pub fn print_program(program: &Program) {
    print!("{}", disassemble(program));
}

/// Render a program one instruction per line, marking jump targets so the
/// branch structure is visible at a glance.
pub fn disassemble(program: &Program) -> String {
    let targets = collect_jump_targets(&program.instructions);
    let mut out = String::new();

    for (addr, instr) in program.instructions.iter().enumerate() {
        let marker = if targets.contains(&addr) { "► " } else { "  " };
        out.push_str(&format!("{:04} {}{}\n", addr, marker, instr));
    }
    out
}

fn collect_jump_targets(instructions: &[Instr]) -> Vec<usize> {
    let mut targets = Vec::new();

    for instr in instructions {
        if let Some(target) = instr.addr_operand() {
            let target = target as usize;
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
    }
    targets
}
