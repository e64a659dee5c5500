use std::fmt::Display;

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::{
    Limits,
    lex::{Token, TokenKind, lex},
};

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected {found} after {after}")]
    #[diagnostic(code(parse::unexpected_token), help("expected {expected} here"))]
    UnexpectedToken {
        found: TokenKind,
        after: TokenKind,
        expected: String,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("A sequence cannot start with {found}")]
    #[diagnostic(
        code(parse::unexpected_sequence_start),
        help("a sequence starts with a number or `(`")
    )]
    UnexpectedSequenceStart {
        found: TokenKind,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("Unmatched parenthesis")]
    #[diagnostic(code(parse::unmatched_parenthesis))]
    UnmatchedParenthesis {
        #[label("this parenthesis has no partner")]
        span: SourceSpan,
    },

    #[error("Invalid repetition count '{count}'")]
    #[diagnostic(
        code(parse::invalid_count),
        help("a repetition count is a non-negative integer, like `x3`")
    )]
    InvalidCount {
        count: String,
        #[label("expected a non-negative integer")]
        span: SourceSpan,
    },

    #[error("Repetitions cannot be chained")]
    #[diagnostic(
        code(parse::chained_repetition),
        help("group the inner repetition first, like `(1x2)x3`")
    )]
    ChainedRepetition {
        #[label("second repetition")]
        span: SourceSpan,
    },

    #[error("Expected a number or a group")]
    #[diagnostic(code(parse::empty_element))]
    EmptyElement {
        #[label("nothing here")]
        span: SourceSpan,
    },

    #[error("Parentheses nested deeper than {limit}")]
    #[diagnostic(code(parse::nesting_too_deep))]
    NestingTooDeep {
        limit: usize,
        #[label("too deep")]
        span: SourceSpan,
    },
}

/// A value literal; its text is only parsed as a number during evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Literal<'de> {
    pub text: &'de str,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node<'de> {
    Sequence {
        children: Vec<Node<'de>>,
        span: SourceSpan,
    },
    Loop {
        repeated: Box<Node<'de>>,
        count: Literal<'de>,
    },
    Value(Literal<'de>),
}

impl Node<'_> {
    pub fn span(&self) -> SourceSpan {
        match self {
            Node::Sequence { span, .. } => *span,
            Node::Loop { repeated, count } => join(repeated.span(), count.span),
            Node::Value(literal) => literal.span,
        }
    }
}

impl Display for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Sequence { children, .. } => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match child {
                        Node::Sequence { .. } => write!(f, "({child})")?,
                        _ => write!(f, "{child}")?,
                    }
                }
                Ok(())
            }
            Node::Loop { repeated, count } => match repeated.as_ref() {
                Node::Value(literal) => write!(f, "{}x{}", literal.text, count.text),
                group => write!(f, "({group})x{}", count.text),
            },
            Node::Value(literal) => write!(f, "{}", literal.text),
        }
    }
}

fn join(first: SourceSpan, last: SourceSpan) -> SourceSpan {
    let end = last.offset() + last.len();
    SourceSpan::from(first.offset()..end.max(first.offset()))
}

fn span_of(tokens: &[Token<'_>]) -> SourceSpan {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => join(first.span(), last.span()),
        _ => SourceSpan::from((0, 0)),
    }
}

/// Token kinds allowed to follow `kind`.
fn permitted_after(kind: TokenKind) -> &'static [TokenKind] {
    use TokenKind::*;
    match kind {
        LeftParen => &[Number, LeftParen],
        RightParen => &[Comma, RightParen, EndOfInput, RepeatMarker],
        Comma => &[Number, LeftParen],
        Number => &[Comma, RightParen, EndOfInput, RepeatMarker],
        RepeatMarker => &[Number],
        EndOfInput => &[EndOfInput],
    }
}

fn describe(kinds: &[TokenKind]) -> String {
    let names: Vec<String> = kinds.iter().map(ToString::to_string).collect();
    match names.as_slice() {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} or {last}", init.join(", ")),
    }
}

/// Index of the `)` matching the `(` at `open`.
fn matching_paren(tokens: &[Token<'_>], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            TokenKind::LeftParen => depth += 1,
            TokenKind::RightParen => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Index of the first `x` outside any group.
fn top_level_repeat(tokens: &[Token<'_>]) -> Result<Option<usize>, ParseError> {
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i].kind {
            TokenKind::RepeatMarker => return Ok(Some(i)),
            TokenKind::LeftParen => {
                let close = matching_paren(tokens, i).ok_or(ParseError::UnmatchedParenthesis {
                    span: tokens[i].span(),
                })?;
                i = close + 1;
            }
            _ => i += 1,
        }
    }
    Ok(None)
}

fn parse_count(text: &str) -> Option<usize> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

pub struct Parser<'de> {
    whole: &'de str,
    limits: Limits,
}

impl<'de> Parser<'de> {
    pub fn new(whole: &'de str) -> Self {
        Parser {
            whole,
            limits: Limits::default(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn parse(&self) -> Result<Node<'de>, crate::Error> {
        let tokens = lex(self.whole)?;
        Ok(self.parse_sequence(&tokens)?)
    }

    /// Parses a comma separated sequence, validating every adjacent token
    /// pair and the parenthesis balance before building any child.
    pub fn parse_sequence(&self, tokens: &[Token<'de>]) -> Result<Node<'de>, ParseError> {
        let body = match tokens.split_last() {
            Some((last, body)) if last.kind == TokenKind::EndOfInput => body,
            _ => tokens,
        };
        let Some(first) = body.first() else {
            return Ok(Node::Sequence {
                children: Vec::new(),
                span: span_of(tokens),
            });
        };
        if !matches!(first.kind, TokenKind::Number | TokenKind::LeftParen) {
            return Err(ParseError::UnexpectedSequenceStart {
                found: first.kind,
                span: first.span(),
            });
        }

        for (i, token) in tokens.iter().enumerate() {
            let next = match tokens.get(i + 1) {
                Some(next) => next.kind,
                None if token.kind == TokenKind::EndOfInput => continue,
                None => TokenKind::EndOfInput,
            };
            let permitted = permitted_after(token.kind);
            if !permitted.contains(&next) {
                let span = tokens.get(i + 1).map_or_else(
                    || SourceSpan::from((token.offset + token.literal.len(), 0)),
                    Token::span,
                );
                return Err(ParseError::UnexpectedToken {
                    found: next,
                    after: token.kind,
                    expected: describe(permitted),
                    span,
                });
            }
        }

        let mut open: Vec<&Token<'de>> = Vec::new();
        let mut start = 0;
        let mut elements = Vec::new();
        for (i, token) in body.iter().enumerate() {
            match token.kind {
                TokenKind::LeftParen => {
                    open.push(token);
                    if open.len() > self.limits.max_depth {
                        return Err(ParseError::NestingTooDeep {
                            limit: self.limits.max_depth,
                            span: token.span(),
                        });
                    }
                }
                TokenKind::RightParen => {
                    if open.pop().is_none() {
                        return Err(ParseError::UnmatchedParenthesis { span: token.span() });
                    }
                }
                TokenKind::Comma if open.is_empty() => {
                    elements.push(&body[start..i]);
                    start = i + 1;
                }
                _ => {}
            }
        }
        if let Some(unclosed) = open.first() {
            return Err(ParseError::UnmatchedParenthesis {
                span: unclosed.span(),
            });
        }
        elements.push(&body[start..]);

        let children = elements
            .into_iter()
            .map(|element| self.parse_element(element))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Node::Sequence {
            children,
            span: span_of(body),
        })
    }

    pub fn parse_element(&self, tokens: &[Token<'de>]) -> Result<Node<'de>, ParseError> {
        let Some(first) = tokens.first() else {
            return Err(ParseError::EmptyElement {
                span: span_of(tokens),
            });
        };
        // Scanning from the right, `)` opens a group and `(` closes it.
        let mut depth = 0usize;
        for token in tokens.iter().rev() {
            match token.kind {
                TokenKind::RightParen => depth += 1,
                TokenKind::LeftParen => depth = depth.saturating_sub(1),
                TokenKind::RepeatMarker if depth == 0 => return self.parse_loop(tokens),
                _ => {}
            }
        }
        if first.kind == TokenKind::Number {
            self.parse_number(tokens)
        } else {
            self.parse_group(tokens)
        }
    }

    pub fn parse_loop(&self, tokens: &[Token<'de>]) -> Result<Node<'de>, ParseError> {
        let Some(at) = top_level_repeat(tokens)? else {
            return Err(ParseError::EmptyElement {
                span: span_of(tokens),
            });
        };
        let (left, marker, right) = (&tokens[..at], &tokens[at], &tokens[at + 1..]);

        let repeated = match left.first() {
            None => return Err(ParseError::EmptyElement { span: marker.span() }),
            Some(first) if first.kind == TokenKind::Number => self.parse_number(left)?,
            Some(_) => self.parse_group(left)?,
        };

        let count = match right {
            [] => {
                return Err(ParseError::InvalidCount {
                    count: String::new(),
                    span: SourceSpan::from((marker.offset + marker.literal.len(), 0)),
                });
            }
            [count, rest @ ..] => {
                if let Some(extra) = rest.first() {
                    if extra.kind == TokenKind::RepeatMarker {
                        return Err(ParseError::ChainedRepetition { span: extra.span() });
                    }
                    return Err(ParseError::UnexpectedToken {
                        found: extra.kind,
                        after: count.kind,
                        expected: describe(&[TokenKind::Comma, TokenKind::RightParen]),
                        span: extra.span(),
                    });
                }
                if count.kind != TokenKind::Number || parse_count(count.literal).is_none() {
                    return Err(ParseError::InvalidCount {
                        count: count.literal.to_string(),
                        span: count.span(),
                    });
                }
                Literal {
                    text: count.literal,
                    span: count.span(),
                }
            }
        };

        Ok(Node::Loop {
            repeated: Box::new(repeated),
            count,
        })
    }

    /// Strips the outermost parenthesis pair and parses the interior.
    pub fn parse_group(&self, tokens: &[Token<'de>]) -> Result<Node<'de>, ParseError> {
        let Some(first) = tokens.first() else {
            return Err(ParseError::EmptyElement {
                span: span_of(tokens),
            });
        };
        if first.kind != TokenKind::LeftParen {
            return Err(ParseError::UnexpectedSequenceStart {
                found: first.kind,
                span: first.span(),
            });
        }
        let close = matching_paren(tokens, 0)
            .ok_or(ParseError::UnmatchedParenthesis { span: first.span() })?;
        if let Some(extra) = tokens.get(close + 1) {
            return Err(ParseError::UnexpectedToken {
                found: extra.kind,
                after: TokenKind::RightParen,
                expected: describe(permitted_after(TokenKind::RightParen)),
                span: extra.span(),
            });
        }

        match self.parse_sequence(&tokens[1..close])? {
            Node::Sequence { children, .. } => Ok(Node::Sequence {
                children,
                span: span_of(tokens),
            }),
            other => Ok(other),
        }
    }

    pub fn parse_number(&self, tokens: &[Token<'de>]) -> Result<Node<'de>, ParseError> {
        match tokens {
            [] => Err(ParseError::EmptyElement {
                span: SourceSpan::from((0, 0)),
            }),
            [number] => Ok(Node::Value(Literal {
                text: number.literal,
                span: number.span(),
            })),
            [number, extra, ..] => Err(ParseError::UnexpectedToken {
                found: extra.kind,
                after: number.kind,
                expected: describe(permitted_after(TokenKind::Number)),
                span: extra.span(),
            }),
        }
    }
}

/// Parses a token stream with the default [`Limits`].
pub fn parse_sequence<'de>(tokens: &[Token<'de>]) -> Result<Node<'de>, ParseError> {
    Parser::new("").parse_sequence(tokens)
}
