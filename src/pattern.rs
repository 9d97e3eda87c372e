//! Left-pattern abstract syntax tree.
//!
//! A left pattern describes what the input must look like for a rule to
//! fire. The tree is produced by the parser, consumed exactly once by the
//! code generator, and never shared or mutated after construction.

/// One node of a left pattern.
///
/// `Display` renders each node in surface syntax, so a parsed tree can be
/// printed and re-parsed into a structurally equal tree.
#[derive(Debug, Clone, PartialEq)]
pub enum LeftNode {
    /// `.` matches any single input unit.
    Wildcard,

    /// A single code point written as a decimal number.
    Constant(u32),

    /// `"..."` is a quoted literal; a doubled quote stands for one `"`.
    StringLiteral(String),

    /// `lo-hi` is an inclusive code-point range.
    DoubleRange(u32, u32),

    /// `{name}` references a named sub-pattern.
    Alias(String),

    /// `(a b | c)` is ordered alternation over branch sequences.
    ///
    /// Branches are tried left to right; the first branch that matches
    /// wins. A single-branch choice doubles as a plain sequence.
    Choice(Vec<Vec<LeftNode>>),

    /// `^( ... )` is negated alternation; matches exactly one unit that
    /// none of the branches would accept.
    NotChoice(Vec<Vec<LeftNode>>),

    /// `p<m,n>` (or `p<m>` for `m == n`) matches between `m` and `n` copies.
    RepeatRange(Box<LeftNode>, u32, u32),

    /// `p<m,>` matches at least `m` copies, unbounded above.
    PlusRepeat(Box<LeftNode>, u32),
}

fn fmt_branches(
    f: &mut std::fmt::Formatter<'_>,
    branches: &[Vec<LeftNode>],
) -> std::fmt::Result {
    for (bi, branch) in branches.iter().enumerate() {
        if bi > 0 {
            write!(f, "|")?;
        }
        for (i, node) in branch.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", node)?;
        }
    }
    Ok(())
}

/// A repeat suffix does not attach to a bare string literal or to another
/// suffix, so those inners get re-parenthesized when printed.
fn fmt_repeat_inner(f: &mut std::fmt::Formatter<'_>, inner: &LeftNode) -> std::fmt::Result {
    match inner {
        LeftNode::StringLiteral(_) | LeftNode::RepeatRange(..) | LeftNode::PlusRepeat(..) => {
            write!(f, "({})", inner)
        }
        _ => write!(f, "{}", inner),
    }
}

impl std::fmt::Display for LeftNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeftNode::Wildcard => write!(f, "."),
            LeftNode::Constant(c) => write!(f, "{}", c),
            LeftNode::StringLiteral(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            LeftNode::DoubleRange(lo, hi) => write!(f, "{}-{}", lo, hi),
            LeftNode::Alias(name) => write!(f, "{{{}}}", name),
            LeftNode::Choice(branches) => {
                write!(f, "(")?;
                fmt_branches(f, branches)?;
                write!(f, ")")
            }
            LeftNode::NotChoice(branches) => {
                write!(f, "^(")?;
                fmt_branches(f, branches)?;
                write!(f, ")")
            }
            LeftNode::RepeatRange(inner, min, max) => {
                fmt_repeat_inner(f, inner)?;
                write!(f, "<{},{}>", min, max)
            }
            LeftNode::PlusRepeat(inner, min) => {
                fmt_repeat_inner(f, inner)?;
                write!(f, "<{},>", min)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_atoms() {
        assert_eq!(LeftNode::Wildcard.to_string(), ".");
        assert_eq!(LeftNode::Constant(97).to_string(), "97");
        assert_eq!(LeftNode::DoubleRange(65, 90).to_string(), "65-90");
        assert_eq!(LeftNode::Alias("vowel".to_string()).to_string(), "{vowel}");
    }

    #[test]
    fn test_display_string_doubles_quotes() {
        let node = LeftNode::StringLiteral("a\"b".to_string());
        assert_eq!(node.to_string(), "\"a\"\"b\"");
    }

    #[test]
    fn test_display_choice_and_negation() {
        let choice = LeftNode::Choice(vec![
            vec![LeftNode::Constant(97), LeftNode::Constant(98)],
            vec![LeftNode::Wildcard],
        ]);
        assert_eq!(choice.to_string(), "(97 98|.)");

        let negated = LeftNode::NotChoice(vec![vec![LeftNode::Constant(120)]]);
        assert_eq!(negated.to_string(), "^(120)");
    }

    #[test]
    fn test_display_repeats() {
        let bounded = LeftNode::RepeatRange(Box::new(LeftNode::Constant(97)), 2, 3);
        assert_eq!(bounded.to_string(), "97<2,3>");

        let unbounded = LeftNode::PlusRepeat(Box::new(LeftNode::Wildcard), 1);
        assert_eq!(unbounded.to_string(), ".<1,>");
    }

    #[test]
    fn test_display_repeated_string_is_reparenthesized() {
        let node = LeftNode::RepeatRange(Box::new(LeftNode::StringLiteral("ab".into())), 1, 2);
        assert_eq!(node.to_string(), "(\"ab\")<1,2>");
    }
}
