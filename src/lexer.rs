use crate::error::ParserError;
use logos::{Logos, SpannedIter};
use std::{borrow::Cow, num::ParseIntError};
use thiserror::Error;

#[derive(Default, Error, Debug, Clone, PartialEq)]
pub enum LexicalError {
    #[default]
    #[error("invalid token")]
    InvalidToken,
    #[error("failed to parse integer: {0}")]
    Integer(ParseIntError),
    #[error("integer literal does not fit in 64 bits")]
    IntegerOverflow,
}

#[derive(Clone, Debug, Logos, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+", error = LexicalError)]
pub enum Token {
    #[token("from")]
    From,
    #[token("where")]
    Where,
    #[token("local")]
    Local,
    #[token("list")]
    List,
    #[token("contains")]
    Contains,
    #[token("startswith")]
    StartsWith,
    #[token("endswith")]
    EndsWith,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("!")]
    Not,
    #[token("==")]
    Equal,
    #[token("!=")]
    NotEqual,
    #[token("<")]
    LessThan,
    #[token("<=")]
    LessThanEqual,
    #[token(">")]
    GreaterThan,
    #[token(">=")]
    GreaterThanEqual,
    #[token("<-")]
    In,
    #[token("->")]
    Contain,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token(".")]
    Dot,
    #[token("#")]
    Hash,
    #[token(",")]
    Comma,
    #[token("(")]
    LeftParenthesis,
    #[token(")")]
    RightParenthesis,
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u64>().map_err(LexicalError::Integer))]
    IntegerLiteral(u64),
    #[regex(r#""(\\.|[^"\\])*""#, |lex| unescape(&lex.slice()[1..lex.slice().len() - 1]))]
    StringLiteral(String),
    #[token("true", |_| true)]
    #[token("false", |_| false)]
    BooleanLiteral(bool),
    #[regex("[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_owned())]
    Identifier(String),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Undo the escaping applied by [`escape`]: `\"` and `\\` collapse, any other backslash is kept.
pub fn unescape(raw: &str) -> String {
    let mut value = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        match chars.next() {
            Some(escaped @ ('"' | '\\')) => value.push(escaped),
            Some(other) => {
                value.push('\\');
                value.push(other);
            }
            None => value.push('\\'),
        }
    }
    value
}

/// Render `value` as a double quoted literal that [`unescape`] reads back unchanged.
pub fn escape(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Render a screen name as written after `local.`, `user.` or `list.`.
///
/// Names shaped like an identifier, keywords included, stay bare. Anything else, such as a name
/// starting with a digit, is quoted like a string literal.
pub fn screen_name(name: &str) -> Cow<'_, str> {
    let mut chars = name.chars();
    let bare = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if bare {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(escape(name))
    }
}

pub type Spanned<Tok, Location, Error> = Result<(Location, Tok, Location), Error>;

pub struct Lexer<'input> {
    token_stream: SpannedIter<'input, Token>,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        Self {
            token_stream: Token::lexer(input).spanned(),
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Spanned<Token, usize, ParserError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.token_stream.next().map(|(token, span)| {
            let token = token.map_err(|error| ParserError::Lexical {
                position: span.start,
                error,
            })?;
            Ok((span.start, token, span.end))
        })
    }
}
