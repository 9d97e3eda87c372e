use crate::pattern::LeftNode;
use crate::stream::ParserStream;
use crate::syntax_error::SyntaxError;

/// Recursive-descent parser for left patterns.
///
/// Grammar (whitespace is insignificant):
///
/// ```text
/// choice   := list ('|' list)*
/// list     := element+
/// element  := quoted-string
///           | one [ '<' number [',' [number]] '>' ]
/// one      := '(' choice ')'
///           | '^' '(' choice ')'
///           | '{' id '}'
///           | '.'
///           | number ['-' number]
/// ```
///
/// Alternation is ordered (first match wins). `<n>` means exactly `n`
/// copies, `<n,m>` between `n` and `m`, `<n,>` at least `n`. Repetition
/// suffixes do not attach to bare string literals; parenthesize the string
/// to repeat it.
///
/// On failure the parser returns a [`SyntaxError`] and the stream position
/// is no longer meaningful; there is no recovery.
pub struct LeftParser<'a> {
    stream: &'a mut ParserStream,
}

/// Parses one left pattern from `stream`, leaving the stream positioned
/// exactly after the consumed pattern.
pub fn parse_left_pattern(stream: &mut ParserStream) -> Result<LeftNode, SyntaxError> {
    match stream.skip_space() {
        None => Err(stream.error_msg("empty pattern")),
        Some(_) => {
            stream.unread();
            LeftParser { stream }.parse_choice(None)
        }
    }
}

impl<'a> LeftParser<'a> {
    /// `choice := list ('|' list)*`, collapsed: a single-branch,
    /// single-element choice parses as the element itself.
    fn parse_choice(&mut self, closing: Option<char>) -> Result<LeftNode, SyntaxError> {
        let branches = self.parse_branches(closing)?;
        Ok(collapse(branches))
    }

    fn parse_branches(
        &mut self,
        closing: Option<char>,
    ) -> Result<Vec<Vec<LeftNode>>, SyntaxError> {
        let mut branches = Vec::new();
        loop {
            let branch = self.parse_list(closing)?;
            if branch.is_empty() {
                return Err(self.stream.error_msg("empty alternation branch"));
            }
            branches.push(branch);
            match self.stream.skip_space() {
                Some('|') => continue,
                Some(_) => {
                    // closing delimiter or trailing input; the caller decides
                    self.stream.unread();
                    break;
                }
                None => break,
            }
        }
        Ok(branches)
    }

    /// `list := element+`, ending (unconsumed) at `|`, the closing
    /// delimiter, or end of input.
    fn parse_list(&mut self, closing: Option<char>) -> Result<Vec<LeftNode>, SyntaxError> {
        let mut items = Vec::new();
        loop {
            match self.stream.skip_space() {
                None => break,
                Some('|') => {
                    self.stream.unread();
                    break;
                }
                Some(c) if Some(c) == closing => {
                    self.stream.unread();
                    break;
                }
                Some(c) => items.push(self.parse_element(c)?),
            }
        }
        Ok(items)
    }

    fn parse_element(&mut self, first: char) -> Result<LeftNode, SyntaxError> {
        match first {
            '(' => {
                let branches = self.parse_branches(Some(')'))?;
                self.stream.expect(')')?;
                self.maybe_repeat(collapse(branches))
            }
            '^' => {
                match self.stream.skip_space() {
                    Some('(') => {}
                    found => return Err(self.negation_error(found)),
                }
                let branches = self.parse_branches(Some(')'))?;
                self.stream.expect(')')?;
                self.maybe_repeat(LeftNode::NotChoice(branches))
            }
            '{' => {
                let name = self.stream.parse_id();
                if name.is_empty() {
                    return Err(self.stream.error_msg("expected alias name after '{'"));
                }
                self.stream.expect('}')?;
                self.maybe_repeat(LeftNode::Alias(name))
            }
            '.' => self.maybe_repeat(LeftNode::Wildcard),
            '"' => self.parse_string(),
            d if d.is_ascii_digit() => {
                let node = self.parse_number_or_range(d)?;
                self.maybe_repeat(node)
            }
            other => Err(self.stream.error(Some(other))),
        }
    }

    fn negation_error(&self, found: Option<char>) -> SyntaxError {
        let mut err = self.stream.error_msg("expected '(' after '^'");
        err.found = found;
        err
    }

    /// A quoted literal; `""` inside the string is an escaped quote.
    fn parse_string(&mut self) -> Result<LeftNode, SyntaxError> {
        let mut text = String::new();
        loop {
            match self.stream.read() {
                None => return Err(self.stream.error_msg("unterminated string literal")),
                Some('"') => match self.stream.read() {
                    Some('"') => text.push('"'),
                    Some(_) => {
                        self.stream.unread();
                        break;
                    }
                    None => break,
                },
                Some(c) => text.push(c),
            }
        }
        Ok(LeftNode::StringLiteral(text))
    }

    /// `number ['-' number]`: a constant or an inclusive range. The `-`
    /// must immediately follow the first number.
    fn parse_number_or_range(&mut self, first: char) -> Result<LeftNode, SyntaxError> {
        let lo = self.stream.parse_number(first)?;
        match self.stream.read() {
            Some('-') => {
                let hi = match self.stream.read() {
                    Some(d) if d.is_ascii_digit() => self.stream.parse_number(d)?,
                    found => {
                        let mut err = self.stream.error_msg("expected number after '-'");
                        err.found = found;
                        return Err(err);
                    }
                };
                if hi < lo {
                    return Err(self
                        .stream
                        .error_msg(format!("empty range: {}-{}", lo, hi)));
                }
                Ok(LeftNode::DoubleRange(lo, hi))
            }
            Some(_) => {
                self.stream.unread();
                Ok(LeftNode::Constant(lo))
            }
            None => Ok(LeftNode::Constant(lo)),
        }
    }

    /// Optional `<min[,[max]]>` repetition suffix.
    fn maybe_repeat(&mut self, inner: LeftNode) -> Result<LeftNode, SyntaxError> {
        match self.stream.skip_space() {
            Some('<') => {}
            Some(_) => {
                self.stream.unread();
                return Ok(inner);
            }
            None => return Ok(inner),
        }

        let min = self.parse_bound()?;
        match self.stream.skip_space() {
            Some('>') => Ok(LeftNode::RepeatRange(Box::new(inner), min, min)),
            Some(',') => match self.stream.skip_space() {
                Some('>') => Ok(LeftNode::PlusRepeat(Box::new(inner), min)),
                Some(d) if d.is_ascii_digit() => {
                    let max = self.stream.parse_number(d)?;
                    if max < min {
                        return Err(self.stream.error_msg(format!(
                            "repetition upper bound {} is below lower bound {}",
                            max, min
                        )));
                    }
                    match self.stream.skip_space() {
                        Some('>') => Ok(LeftNode::RepeatRange(Box::new(inner), min, max)),
                        found => Err(self.repeat_error(found)),
                    }
                }
                found => Err(self.repeat_error(found)),
            },
            found => Err(self.repeat_error(found)),
        }
    }

    fn parse_bound(&mut self) -> Result<u32, SyntaxError> {
        match self.stream.skip_space() {
            Some(d) if d.is_ascii_digit() => self.stream.parse_number(d),
            found => Err(self.repeat_error(found)),
        }
    }

    fn repeat_error(&self, found: Option<char>) -> SyntaxError {
        let mut err = self.stream.error_msg("malformed repetition range");
        err.found = found;
        err
    }
}

fn collapse(mut branches: Vec<Vec<LeftNode>>) -> LeftNode {
    if branches.len() == 1 && branches[0].len() == 1 {
        let mut branch = branches.pop().unwrap_or_default();
        return branch.pop().unwrap_or(LeftNode::Wildcard);
    }
    LeftNode::Choice(branches)
}
