//! Custom error type that captures context strings from nom's context() combinator

use nom::error::{ContextError, ErrorKind, FromExternalError, ParseError};

/// A context label with the amount of input left when it was attached.
///
/// Remaining length rather than an absolute offset: the parser entry point
/// knows the full text and converts, so no global state is needed.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextWithLocation {
    pub context: &'static str,
    pub remaining: usize,
}

/// Custom error type that captures context strings
#[derive(Debug, Clone, PartialEq)]
pub struct ContextualError<I> {
    pub input: I,
    pub code: ErrorKind,
    /// Innermost context first
    pub contexts: Vec<ContextWithLocation>,
}

impl<I: AsRef<str>> ContextualError<I> {
    pub fn new(input: I, code: ErrorKind) -> Self {
        Self {
            input,
            code,
            contexts: Vec::new(),
        }
    }

    /// Bytes of input left where the failure happened
    pub fn remaining(&self) -> usize {
        self.input.as_ref().len()
    }

    /// The most specific label available
    pub fn message(&self) -> String {
        match self.contexts.first() {
            Some(ctx) => ctx.context.to_string(),
            None => match self.input.as_ref().chars().next() {
                Some(c) => format!("unexpected character '{}'", c),
                None => "unexpected end of input".to_string(),
            },
        }
    }
}

impl<I: AsRef<str>> ParseError<I> for ContextualError<I> {
    fn from_error_kind(input: I, kind: ErrorKind) -> Self {
        Self::new(input, kind)
    }

    fn append(_input: I, _kind: ErrorKind, other: Self) -> Self {
        // The original failure point is more precise than the backtrack point
        other
    }

    fn or(self, other: Self) -> Self {
        // alt(): keep the branch that got furthest, then the better described one
        match self.remaining().cmp(&other.remaining()) {
            std::cmp::Ordering::Less => self,
            std::cmp::Ordering::Greater => other,
            std::cmp::Ordering::Equal => {
                if self.contexts.len() >= other.contexts.len() {
                    self
                } else {
                    other
                }
            }
        }
    }
}

impl<I: AsRef<str>> ContextError<I> for ContextualError<I> {
    fn add_context(_input: I, ctx: &'static str, mut other: Self) -> Self {
        let remaining = other.remaining();
        other.contexts.push(ContextWithLocation {
            context: ctx,
            remaining,
        });
        other
    }
}

impl<I: AsRef<str>, E> FromExternalError<I, E> for ContextualError<I> {
    fn from_external_error(input: I, kind: ErrorKind, _e: E) -> Self {
        Self::new(input, kind)
    }
}

impl<I: AsRef<str>> std::fmt::Display for ContextualError<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nom::{IResult, Parser, branch::alt, bytes::complete::tag, error::context};

    type TestResult<'a, T> = IResult<&'a str, T, ContextualError<&'a str>>;

    fn hello(input: &str) -> TestResult<'_, &str> {
        context("expected 'hello'", tag("hello")).parse(input)
    }

    #[test]
    fn test_context_capture() {
        match hello("world") {
            Err(nom::Err::Error(e)) => {
                assert_eq!(e.contexts.len(), 1);
                assert_eq!(e.message(), "expected 'hello'");
                assert_eq!(e.remaining(), 5);
            }
            other => panic!("Expected error with context, got {:?}", other),
        }
    }

    #[test]
    fn test_alt_keeps_furthest_branch() {
        fn two_words(input: &str) -> TestResult<'_, &str> {
            alt((
                context("expected 'ab'", (tag("a"), tag("b"))).map(|(a, _)| a),
                context("expected 'x'", tag("x")),
            ))
            .parse(input)
        }

        match two_words("ac") {
            Err(nom::Err::Error(e)) => {
                assert_eq!(e.remaining(), 1);
                assert_eq!(e.message(), "expected 'ab'");
            }
            other => panic!("Expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_message_without_context() {
        let e = ContextualError::new("}", ErrorKind::Tag);
        assert_eq!(e.message(), "unexpected character '}'");
        let e = ContextualError::new("", ErrorKind::Eof);
        assert_eq!(e.message(), "unexpected end of input");
    }
}
