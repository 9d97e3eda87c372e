use crate::syntax_error::SyntaxError;

/// Character-level reader over ocp pattern source.
///
/// The grammar never needs more than one symbol of lookahead, so the stream
/// offers exactly one slot of pushback via `unread`. Line/column positions
/// are computed on demand (errors are terminal, so the scan cost does not
/// matter).
pub struct ParserStream {
    source: Vec<char>,
    pos: usize,
}

impl ParserStream {
    pub fn new(source: &str) -> Self {
        ParserStream {
            source: source.chars().collect(),
            pos: 0,
        }
    }

    /// Reads the next character, advancing the position. `None` at end of
    /// input; the position does not move past the end.
    pub fn read(&mut self) -> Option<char> {
        let ch = self.source.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    /// Pushes the most recently read character back.
    ///
    /// Must not be called after `read` returned `None`, and never twice in a
    /// row without an intervening `read`.
    pub fn unread(&mut self) {
        debug_assert!(self.pos > 0, "unread at start of input");
        self.pos -= 1;
    }

    /// Consumes whitespace and returns the first non-whitespace character
    /// (already consumed), or `None` at end of input.
    pub fn skip_space(&mut self) -> Option<char> {
        loop {
            match self.read() {
                Some(c) if c.is_whitespace() => continue,
                other => return other,
            }
        }
    }

    /// Reads one character and fails unless it equals `want`.
    pub fn expect(&mut self, want: char) -> Result<(), SyntaxError> {
        match self.read() {
            Some(c) if c == want => Ok(()),
            found => Err(self.error_at_last(format!("expected {:?}", want), found)),
        }
    }

    /// Accumulates a decimal number whose first digit has already been read.
    pub fn parse_number(&mut self, first_digit: char) -> Result<u32, SyntaxError> {
        debug_assert!(first_digit.is_ascii_digit());
        let mut value = first_digit.to_digit(10).unwrap_or(0);
        loop {
            match self.read() {
                Some(c) if c.is_ascii_digit() => {
                    value = value
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(c.to_digit(10).unwrap_or(0)))
                        .ok_or_else(|| self.error_msg("number too large"))?;
                }
                Some(_) => {
                    self.unread();
                    break;
                }
                None => break,
            }
        }
        Ok(value)
    }

    /// Accumulates identifier characters (used for `{alias}` names) until a
    /// delimiter, which is left unconsumed.
    pub fn parse_id(&mut self) -> String {
        let mut id = String::new();
        loop {
            match self.read() {
                Some(c) if c.is_alphanumeric() || c == '_' => id.push(c),
                Some(_) => {
                    self.unread();
                    break;
                }
                None => break,
            }
        }
        id
    }

    /// 1-based line/column of the character at `idx`.
    fn position_at(&self, idx: usize) -> (usize, usize) {
        let mut line = 1;
        let mut col = 1;
        for &c in self.source.iter().take(idx) {
            if c == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }

    /// Builds a `SyntaxError` for an unexpected character that was just read
    /// (or unexpected end of input when `found` is `None`).
    pub fn error(&self, found: Option<char>) -> SyntaxError {
        self.error_at_last("unexpected character".to_string(), found)
    }

    /// Builds a `SyntaxError` with a custom message at the current position.
    pub fn error_msg(&self, message: impl Into<String>) -> SyntaxError {
        let (line, col) = self.position_at(self.pos);
        SyntaxError {
            message: message.into(),
            line,
            col,
            found: None,
        }
    }

    fn error_at_last(&self, message: String, found: Option<char>) -> SyntaxError {
        // Point at the offending character itself, not one past it.
        let idx = if found.is_some() {
            self.pos.saturating_sub(1)
        } else {
            self.pos
        };
        let (line, col) = self.position_at(idx);
        SyntaxError {
            message,
            line,
            col,
            found,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_and_unread() {
        let mut s = ParserStream::new("ab");
        assert_eq!(s.read(), Some('a'));
        s.unread();
        assert_eq!(s.read(), Some('a'));
        assert_eq!(s.read(), Some('b'));
        assert_eq!(s.read(), None);
        assert_eq!(s.read(), None);
    }

    #[test]
    fn test_skip_space() {
        let mut s = ParserStream::new("  \t\n x");
        assert_eq!(s.skip_space(), Some('x'));
        assert_eq!(s.skip_space(), None);
    }

    #[test]
    fn test_expect() {
        let mut s = ParserStream::new("(a");
        assert!(s.expect('(').is_ok());
        let err = s.expect(')').unwrap_err();
        assert!(err.message.contains("expected ')'"), "msg: {}", err.message);
        assert_eq!(err.found, Some('a'));
    }

    #[test]
    fn test_expect_at_eof() {
        let mut s = ParserStream::new("");
        let err = s.expect(')').unwrap_err();
        assert_eq!(err.found, None);
    }

    #[test]
    fn test_parse_number() {
        let mut s = ParserStream::new("23x");
        let first = s.read().unwrap();
        assert_eq!(s.parse_number(first).unwrap(), 23);
        // delimiter is pushed back
        assert_eq!(s.read(), Some('x'));
    }

    #[test]
    fn test_parse_number_overflow() {
        let mut s = ParserStream::new("99999999999");
        let first = s.read().unwrap();
        let err = s.parse_number(first).unwrap_err();
        assert!(err.message.contains("too large"), "msg: {}", err.message);
    }

    #[test]
    fn test_parse_id() {
        let mut s = ParserStream::new("uppercase_2}");
        assert_eq!(s.parse_id(), "uppercase_2");
        assert_eq!(s.read(), Some('}'));
    }

    #[test]
    fn test_error_positions() {
        let mut s = ParserStream::new("ab\ncd");
        for _ in 0..4 {
            s.read();
        }
        // last read char is 'c' at line 2, col 1
        let err = s.error(Some('c'));
        assert_eq!((err.line, err.col), (2, 1));
    }
}
