use crate::bytecode::op::OPERAND_MAX;
use crate::syntax_error::SyntaxError;

#[derive(Debug, Clone)]
pub enum CompileError {
    /// The pattern text did not parse.
    Syntax(SyntaxError),
    /// An operand (character code or instruction address) exceeds the
    /// 16-bit field it must be stored in.
    ArgumentTooBig { value: u32, max: u32 },
    /// A `{name}` reference with no definition in the alias table.
    UnknownAlias { name: String },
    /// An alias that expands, directly or through other aliases, to itself.
    CircularAlias { name: String },
    /// A pattern shape the one-pass backend cannot lay out.
    Unsupported { what: String },
    /// Internal compiler error (shouldn't happen in normal use)
    Internal(String),
}

impl CompileError {
    /// Create an error for an operand that overflows its field
    pub fn argument_too_big(value: u32) -> Self {
        CompileError::ArgumentTooBig {
            value,
            max: OPERAND_MAX,
        }
    }

    /// Create an error for an undefined alias reference
    pub fn unknown_alias(name: impl Into<String>) -> Self {
        CompileError::UnknownAlias { name: name.into() }
    }

    /// Create an error for an alias that expands to itself
    pub fn circular_alias(name: impl Into<String>) -> Self {
        CompileError::CircularAlias { name: name.into() }
    }

    /// Create an error for a pattern shape the backend cannot compile
    pub fn unsupported(what: impl Into<String>) -> Self {
        CompileError::Unsupported { what: what.into() }
    }

    /// Create an internal compiler error
    pub fn internal(msg: impl Into<String>) -> Self {
        CompileError::Internal(msg.into())
    }
}

impl From<SyntaxError> for CompileError {
    fn from(err: SyntaxError) -> Self {
        CompileError::Syntax(err)
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Syntax(err) => write!(f, "{}", err),
            CompileError::ArgumentTooBig { value, max } => {
                write!(
                    f,
                    "compile error: argument {} does not fit in an operand (max {})",
                    value, max
                )
            }
            CompileError::UnknownAlias { name } => {
                write!(f, "compile error: unknown alias '{}'", name)
            }
            CompileError::CircularAlias { name } => {
                write!(f, "compile error: alias '{}' expands to itself", name)
            }
            CompileError::Unsupported { what } => {
                write!(f, "compile error: unsupported pattern: {}", what)
            }
            CompileError::Internal(msg) => {
                write!(f, "compile error: internal error: {}", msg)
            }
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Syntax(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_too_big_display() {
        let err = CompileError::argument_too_big(70000);

        let msg = err.to_string();
        assert!(msg.contains("70000"));
        assert!(msg.contains("65535"));
    }

    #[test]
    fn test_unknown_alias_display() {
        let err = CompileError::unknown_alias("vowel");

        let msg = err.to_string();
        assert!(msg.contains("unknown alias"));
        assert!(msg.contains("vowel"));
    }

    #[test]
    fn test_circular_alias_display() {
        let err = CompileError::circular_alias("loop");

        let msg = err.to_string();
        assert!(msg.contains("expands to itself"));
        assert!(msg.contains("loop"));
    }

    #[test]
    fn test_internal_error_display() {
        let err = CompileError::internal("something went wrong");

        let msg = err.to_string();
        assert!(msg.contains("internal"));
        assert!(msg.contains("something went wrong"));
    }

    #[test]
    fn test_syntax_error_wraps_with_source() {
        use std::error::Error;

        let syntax = SyntaxError {
            message: "empty pattern".to_string(),
            line: 1,
            col: 1,
            found: None,
        };
        let err = CompileError::from(syntax);

        assert!(err.to_string().contains("empty pattern"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_implements_std_error() {
        let err = CompileError::internal("test");
        let _: &dyn std::error::Error = &err;
    }
}
