pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod ir;
pub mod op;
pub mod state;

pub use compile::{compile_pattern, Compiler};
pub use compile_error::CompileError;
pub use ir::Program;
pub use op::Instr;
