use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::{
    Limits,
    parse::{Literal, Node},
};

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum EvalError {
    #[error("Invalid number '{text}'")]
    #[diagnostic(
        code(eval::invalid_number),
        help("numbers look like `42`, `-0.5` or `.25`")
    )]
    InvalidNumber {
        text: String,
        #[label("not a number")]
        span: SourceSpan,
    },

    #[error("Invalid repetition count '{text}'")]
    #[diagnostic(code(eval::invalid_count))]
    InvalidCount {
        text: String,
        #[label("expected a non-negative integer")]
        span: SourceSpan,
    },

    #[error("Expansion exceeds {limit} values")]
    #[diagnostic(
        code(eval::output_too_large),
        help("lower the repetition counts or raise the output limit")
    )]
    OutputTooLarge {
        limit: usize,
        #[label("expands past the limit")]
        span: SourceSpan,
    },
}

pub struct Evaluator {
    limits: Limits,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

impl Evaluator {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    /// Expands `node` into its flat value sequence.
    pub fn evaluate(&self, node: &Node<'_>) -> Result<Vec<f64>, EvalError> {
        let mut out = Vec::new();
        self.expand_into(node, &mut out)?;
        Ok(out)
    }

    fn expand_into(&self, node: &Node<'_>, out: &mut Vec<f64>) -> Result<(), EvalError> {
        match node {
            Node::Sequence { children, .. } => {
                for child in children {
                    self.expand_into(child, out)?;
                }
            }
            Node::Loop { repeated, count } => {
                let times = eval_count(count)?;
                let once = self.evaluate(repeated)?;
                let total = once
                    .len()
                    .checked_mul(times)
                    .and_then(|len| len.checked_add(out.len()))
                    .filter(|&len| len <= self.limits.max_output_len)
                    .ok_or(EvalError::OutputTooLarge {
                        limit: self.limits.max_output_len,
                        span: node.span(),
                    })?;
                out.reserve(total - out.len());
                for _ in 0..times {
                    out.extend_from_slice(&once);
                }
            }
            Node::Value(literal) => {
                if out.len() >= self.limits.max_output_len {
                    return Err(EvalError::OutputTooLarge {
                        limit: self.limits.max_output_len,
                        span: literal.span,
                    });
                }
                out.push(eval_number(literal)?);
            }
        }
        Ok(())
    }
}

/// Expands `node` with the default [`Limits`].
pub fn evaluate(node: &Node<'_>) -> Result<Vec<f64>, EvalError> {
    Evaluator::default().evaluate(node)
}

fn eval_number(literal: &Literal<'_>) -> Result<f64, EvalError> {
    literal
        .text
        .parse()
        .map_err(|_| EvalError::InvalidNumber {
            text: literal.text.to_string(),
            span: literal.span,
        })
}

fn eval_count(literal: &Literal<'_>) -> Result<usize, EvalError> {
    let invalid = || EvalError::InvalidCount {
        text: literal.text.to_string(),
        span: literal.span,
    };
    if !literal.text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    literal.text.parse().map_err(|_| invalid())
}
