//! Expands number sequence shorthand such as `(1, 2)x2, 42x3` into
//! `1, 2, 1, 2, 42, 42, 42`.
//!
//! The pipeline is [`lex()`] → [`Parser`] → [`Evaluator`]. [`parse_and_evaluate`]
//! runs all three, [`validate`] stops after parsing.

use miette::{Diagnostic, NamedSource, Report};
use thiserror::Error;

pub mod eval;
pub mod lex;
pub mod parse;

pub use eval::{EvalError, Evaluator, evaluate};
pub use lex::{LexError, Lexer, Token, TokenKind, lex};
pub use parse::{Literal, Node, ParseError, Parser, parse_sequence};

/// Bounds on pathological input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Deepest parenthesis nesting accepted by the parser.
    pub max_depth: usize,
    /// Most values a single expansion may produce.
    pub max_output_len: usize,
}

impl Limits {
    pub const DEFAULT_MAX_DEPTH: usize = 256;
    pub const DEFAULT_MAX_OUTPUT_LEN: usize = 1 << 24;
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            max_output_len: Self::DEFAULT_MAX_OUTPUT_LEN,
        }
    }
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Eval(#[from] EvalError),
}

impl Error {
    /// Whether the input is malformed, as opposed to failing to evaluate.
    pub fn is_syntax(&self) -> bool {
        matches!(self, Error::Lex(_) | Error::Parse(_))
    }

    /// Attaches the input so the report can point into it.
    pub fn report(self, name: &str, source: &str) -> Report {
        Report::new(self).with_source_code(NamedSource::new(name, source.to_string()))
    }
}

pub fn parse_and_evaluate(input: &str) -> Result<Vec<f64>, Error> {
    parse_and_evaluate_with(input, Limits::default())
}

pub fn parse_and_evaluate_with(input: &str, limits: Limits) -> Result<Vec<f64>, Error> {
    let ast = Parser::new(input).with_limits(limits).parse()?;
    Ok(Evaluator::new(limits).evaluate(&ast)?)
}

/// Checks that `input` lexes and parses, without evaluating it.
pub fn validate(input: &str) -> Result<(), Error> {
    validate_with(input, Limits::default())
}

pub fn validate_with(input: &str, limits: Limits) -> Result<(), Error> {
    Parser::new(input).with_limits(limits).parse()?;
    Ok(())
}
