use std::fmt::Display;

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum LexError {
    #[error("Unexpected character '{ch}'")]
    #[diagnostic(
        code(lex::unknown_character),
        help("only digits, `.`, `-`, `,`, `x`, `(`, `)` and whitespace are allowed")
    )]
    UnknownCharacter {
        ch: char,
        #[label("this character")]
        span: SourceSpan,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'de> {
    pub kind: TokenKind,
    pub literal: &'de str,
    /// Byte offset of `literal` in the input.
    pub offset: usize,
}

impl Token<'_> {
    pub fn span(&self) -> SourceSpan {
        SourceSpan::from((self.offset, self.literal.len()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    Comma,
    RepeatMarker,
    LeftParen,
    RightParen,
    EndOfInput,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Number => write!(f, "number"),
            TokenKind::Comma => write!(f, "`,`"),
            TokenKind::RepeatMarker => write!(f, "`x`"),
            TokenKind::LeftParen => write!(f, "`(`"),
            TokenKind::RightParen => write!(f, "`)`"),
            TokenKind::EndOfInput => write!(f, "end of input"),
        }
    }
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.literal;
        match self.kind {
            TokenKind::Number => write!(f, "NUMBER {lit}"),
            TokenKind::Comma => write!(f, "COMMA {lit}"),
            TokenKind::RepeatMarker => write!(f, "REPEAT {lit}"),
            TokenKind::LeftParen => write!(f, "LEFT_PAREN {lit}"),
            TokenKind::RightParen => write!(f, "RIGHT_PAREN {lit}"),
            TokenKind::EndOfInput => write!(f, "EOF"),
        }
    }
}

pub struct Lexer<'de> {
    whole: &'de str,
    rest: &'de str,
    byte: usize,
    finished: bool,
}

impl<'de> Lexer<'de> {
    pub fn new(input: &'de str) -> Self {
        Lexer {
            whole: input,
            rest: input,
            byte: 0,
            finished: false,
        }
    }
}

/// Tokenizes the whole input, ending with a single [`TokenKind::EndOfInput`].
pub fn lex(input: &str) -> Result<Vec<Token<'_>>, LexError> {
    Lexer::new(input).collect()
}

impl<'de> Iterator for Lexer<'de> {
    type Item = Result<Token<'de>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            let mut chars = self.rest.chars();
            let Some(c) = chars.next() else {
                self.finished = true;
                return Some(Ok(Token {
                    kind: TokenKind::EndOfInput,
                    literal: &self.whole[self.whole.len()..],
                    offset: self.whole.len(),
                }));
            };
            let literal = &self.rest[..c.len_utf8()];
            let cur = self.rest;
            let offset = self.byte;
            self.rest = chars.as_str();
            self.byte += c.len_utf8();

            let process = |kind: TokenKind| {
                Some(Ok(Token {
                    kind,
                    literal,
                    offset,
                }))
            };

            match c {
                ',' => return process(TokenKind::Comma),
                'x' => return process(TokenKind::RepeatMarker),
                '(' => return process(TokenKind::LeftParen),
                ')' => return process(TokenKind::RightParen),
                '0'..='9' | '.' | '-' => {
                    // Sign and dot placement is left to the evaluator.
                    let end = cur
                        .find(|c| !matches!(c, '0'..='9' | '.' | '-'))
                        .unwrap_or(cur.len());
                    let literal = &cur[..end];

                    let extra_bytes = literal.len() - c.len_utf8();
                    self.byte += extra_bytes;
                    self.rest = &self.rest[extra_bytes..];

                    return Some(Ok(Token {
                        kind: TokenKind::Number,
                        literal,
                        offset,
                    }));
                }
                c if c.is_whitespace() => continue,
                c => {
                    self.finished = true;
                    return Some(Err(LexError::UnknownCharacter {
                        ch: c,
                        span: SourceSpan::from(offset..self.byte),
                    }));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_input_is_only_eof() {
        assert_eq!(kinds(""), vec![TokenKind::EndOfInput]);
        assert_eq!(kinds(" \t "), vec![TokenKind::EndOfInput]);
    }

    #[test]
    fn repetition_and_groups() {
        use TokenKind::*;
        assert_eq!(
            kinds("(1, 2)x2, 42x3"),
            vec![
                LeftParen,
                Number,
                Comma,
                Number,
                RightParen,
                RepeatMarker,
                Number,
                Comma,
                Number,
                RepeatMarker,
                Number,
                EndOfInput,
            ]
        );
    }

    #[test]
    fn numeric_runs_are_not_validated() {
        let tokens = lex("1-2.3.4").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].literal, "1-2.3.4");
    }

    #[test]
    fn whitespace_separates_numbers() {
        let tokens = lex("1 2").unwrap();
        let literals: Vec<_> = tokens.iter().map(|t| t.literal).collect();
        assert_eq!(literals, vec!["1", "2", ""]);
        assert_eq!(tokens[1].offset, 2);
    }

    #[test]
    fn offsets_track_source() {
        let tokens = lex("  -.5x10").unwrap();
        assert_eq!(tokens[0].literal, "-.5");
        assert_eq!(tokens[0].span(), SourceSpan::from((2, 3)));
        assert_eq!(tokens[1].offset, 5);
        assert_eq!(tokens[2].literal, "10");
        assert_eq!(tokens[3].offset, 8);
    }

    #[test]
    fn unknown_character() {
        let err = lex("1, 2y").unwrap_err();
        assert_eq!(
            err,
            LexError::UnknownCharacter {
                ch: 'y',
                span: SourceSpan::from((4, 1)),
            }
        );
    }

    #[test]
    fn unknown_multibyte_character_spans_whole_char() {
        let LexError::UnknownCharacter { ch, span } = lex("1×2").unwrap_err();
        assert_eq!(ch, '×');
        assert_eq!(span, SourceSpan::from((1, '×'.len_utf8())));
    }

    #[test]
    fn iterator_stops_after_error() {
        let mut lexer = Lexer::new("?1");
        assert!(matches!(lexer.next(), Some(Err(_))));
        assert!(lexer.next().is_none());
    }

    #[test]
    fn display_tokens() {
        let rendered: Vec<String> = lex("(7)x2,")
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        insta::assert_snapshot!(
            rendered.join(" | "),
            @"LEFT_PAREN ( | NUMBER 7 | RIGHT_PAREN ) | REPEAT x | NUMBER 2 | COMMA , | EOF"
        );
    }
}
