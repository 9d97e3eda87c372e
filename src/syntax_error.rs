/// A pattern-syntax error with source location.
///
/// `line` and `col` are 1-based positions computed from the stream offset.
/// `found` carries the offending character when there is one; `None` means
/// the error was triggered by end of input.
#[derive(Debug, Clone)]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
    pub col: usize,
    pub found: Option<char>,
}

impl std::fmt::Display for SyntaxError {
    /// Formats as `line:col: message` for CLI-friendly diagnostics.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.message)?;
        match self.found {
            Some(c) => write!(f, " (found {:?})", c),
            None => Ok(()),
        }
    }
}

impl std::error::Error for SyntaxError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_found() {
        let err = SyntaxError {
            message: "unexpected character".to_string(),
            line: 2,
            col: 7,
            found: Some('@'),
        };
        assert_eq!(err.to_string(), "2:7: unexpected character (found '@')");
    }

    #[test]
    fn test_display_at_eof() {
        let err = SyntaxError {
            message: "unterminated string literal".to_string(),
            line: 1,
            col: 4,
            found: None,
        };
        assert_eq!(err.to_string(), "1:4: unterminated string literal");
    }

    #[test]
    fn test_implements_std_error() {
        let err = SyntaxError {
            message: "x".to_string(),
            line: 1,
            col: 1,
            found: None,
        };
        let _: &dyn std::error::Error = &err;
    }
}
