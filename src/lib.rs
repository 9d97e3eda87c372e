//! Compiler and runtime for ocp left-context patterns.
//!
//! A pattern describes the context to the left of a position: constants,
//! inclusive ranges, string literals, ordered alternation, negation,
//! aliases, and bounded or unbounded repetition. The pipeline is
//!
//! 1. [`ParserStream`] + [`parse_left_pattern`]: text to [`LeftNode`],
//! 2. [`Compiler`]: one forward pass emitting [`Instr`] with backpatched
//!    forward jumps,
//! 3. [`Matcher`]: a two-register machine running the finished [`Program`].
//!
//! ```
//! use ocpc::{compile_pattern, MatchOutcome, Matcher};
//!
//! let program = compile_pattern(r#""ab"|"ac""#).unwrap();
//! let matcher = Matcher::new(&program);
//! assert_eq!(matcher.run_str("ac"), MatchOutcome::Matched { consumed: 2 });
//! assert_eq!(matcher.run_str("ad"), MatchOutcome::Failed);
//! ```

pub mod bytecode;
pub mod parser;
pub mod pattern;
pub mod stream;
pub mod syntax_error;
pub mod vm;

pub use bytecode::{compile_pattern, CompileError, Compiler, Instr, Program};
pub use parser::parse_left_pattern;
pub use pattern::LeftNode;
pub use stream::ParserStream;
pub use syntax_error::SyntaxError;
pub use vm::{MatchOutcome, Matcher, MatcherConfig};
