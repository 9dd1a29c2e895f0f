use crate::{
    ast::Expr,
    environment::RelationKind,
    error::{ParserError, QueryError, TypeError},
    lexer::{LexicalError, Lexer, Token},
    live::{AccountRef, AccountSelector, LiveKind, LiveValue},
    operators::Combinator,
    sources::StatusSource,
    types::FilterType,
    values::StatusProperty,
};
use itertools::Itertools;
use lalrpop_util::{lalrpop_mod, ParseError};
use std::fmt::{Display, Formatter};

lalrpop_mod!(grammar);

use self::grammar::{ExpressionParser, QueryParser};

pub(crate) type FilterParseError = ParseError<usize, Token, ParserError>;

type ActionResult<T> = Result<T, FilterParseError>;

/// The syntax tree of a whole query: where statuses come from and which of them are kept.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedQuery {
    pub sources: Vec<StatusSource>,
    pub root: Expr,
}

impl ParsedQuery {
    /// A query without a `where` clause keeps every status of its sources.
    pub fn new(sources: Vec<StatusSource>, root: Option<Expr>) -> Self {
        Self {
            sources,
            root: root.unwrap_or_else(|| Expr::boolean(true)),
        }
    }
}

impl Display for ParsedQuery {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        write!(
            formatter,
            "from {} where {}",
            self.sources.iter().join(", "),
            self.root
        )
    }
}

/// Parse and type check a complete query.
///
/// # Examples
///
/// ```rust
/// use status_filter::parse;
///
/// let query = parse(r#"from local, search "rust" where user == local.alice && !retweet"#).unwrap();
///
/// assert_eq!(2, query.sources.len());
/// assert_eq!(
///     r#"from local, search "rust" where (user == local.alice && !retweet)"#,
///     query.to_string()
/// );
/// ```
pub fn parse(input: &str) -> Result<ParsedQuery, QueryError> {
    let query = QueryParser::new().parse(Lexer::new(input))?;
    let found = query.root.supported_types();
    if !found.contains(FilterType::Boolean) {
        return Err(QueryError::NotBoolean { found });
    }
    Ok(query)
}

/// Parse and type check a lone expression, of any type.
pub fn parse_expression(input: &str) -> Result<Expr, QueryError> {
    Ok(ExpressionParser::new().parse(Lexer::new(input))?)
}

impl From<FilterParseError> for QueryError {
    fn from(error: FilterParseError) -> Self {
        match error {
            ParseError::InvalidToken { location } => Self::Syntax {
                position: location,
                reason: "invalid token".to_owned(),
            },
            ParseError::UnrecognizedEof { location, expected } => Self::Syntax {
                position: location,
                reason: format!(
                    "unexpected end of query, expected one of {}",
                    expected.join(", ")
                ),
            },
            ParseError::UnrecognizedToken {
                token: (start, token, _),
                expected,
            } => Self::Syntax {
                position: start,
                reason: format!(
                    "unexpected token {token}, expected one of {}",
                    expected.join(", ")
                ),
            },
            ParseError::ExtraToken {
                token: (start, token, _),
            } => Self::Syntax {
                position: start,
                reason: format!("unexpected trailing token {token}"),
            },
            ParseError::User { error } => match error {
                ParserError::Lexical { position, error } => Self::Syntax {
                    position,
                    reason: error.to_string(),
                },
                ParserError::Type(error) => Self::Type(error),
                ParserError::UnknownName { kind, name } => Self::UnknownName { kind, name },
            },
        }
    }
}

fn user_error<T>(error: ParserError) -> ActionResult<T> {
    Err(ParseError::User { error })
}

pub(crate) fn typed(expression: Result<Expr, TypeError>) -> ActionResult<Expr> {
    expression.or_else(|error| user_error(ParserError::Type(error)))
}

pub(crate) fn combine(combinator: Combinator, left: Expr, right: Expr) -> ActionResult<Expr> {
    typed(Expr::combinator(combinator, false, left, right))
}

pub(crate) fn property(name: String) -> ActionResult<Expr> {
    match StatusProperty::from_name(&name) {
        Some(property) => Ok(Expr::property(property)),
        None => user_error(ParserError::UnknownName {
            kind: "property",
            name,
        }),
    }
}

pub(crate) fn relation(selector: AccountSelector, name: String) -> ActionResult<LiveValue> {
    match RelationKind::from_name(&name) {
        Some(kind) => Ok(LiveValue::new(LiveKind::Relations { selector, kind })),
        None => user_error(ParserError::UnknownName {
            kind: "relation",
            name,
        }),
    }
}

pub(crate) fn user_source(kind: String, account: AccountRef) -> ActionResult<StatusSource> {
    match kind.as_str() {
        "user" => Ok(StatusSource::User(account)),
        _ => user_error(ParserError::UnknownName {
            kind: "source",
            name: kind,
        }),
    }
}

pub(crate) fn search_source(kind: String, term: String) -> ActionResult<StatusSource> {
    match kind.as_str() {
        "search" => Ok(StatusSource::Search(term)),
        _ => user_error(ParserError::UnknownName {
            kind: "source",
            name: kind,
        }),
    }
}

pub(crate) fn integer(position: usize, value: u64) -> ActionResult<i64> {
    i64::try_from(value).or_else(|_| overflow(position))
}

/// `-` directly followed by an integer literal. Accepts `i64::MIN`.
pub(crate) fn negative(position: usize, value: u64) -> ActionResult<Expr> {
    match 0i64.checked_sub_unsigned(value) {
        Some(value) => Ok(Expr::numeric(value)),
        None => overflow(position),
    }
}

fn overflow<T>(position: usize) -> ActionResult<T> {
    user_error(ParserError::Lexical {
        position,
        error: LexicalError::IntegerOverflow,
    })
}
