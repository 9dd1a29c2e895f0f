use crate::{lexer::LexicalError, types::TypeSet};
use thiserror::Error;

#[derive(Debug, PartialEq, Error)]
pub enum TypeError {
    #[error("no common type: left supports {left}, right supports {right}, operator supports {operator}")]
    Unresolvable {
        left: TypeSet,
        right: TypeSet,
        operator: TypeSet,
    },
    #[error("operator '{operator}' does not accept an operand supporting {operand}, expected {expected}")]
    UnsupportedOperand {
        operator: &'static str,
        operand: TypeSet,
        expected: TypeSet,
    },
}

#[derive(Debug, PartialEq, Error)]
pub enum ParserError {
    #[error("failed to lex the query at {position} with {error}")]
    Lexical { position: usize, error: LexicalError },
    #[error("{0}")]
    Type(TypeError),
    #[error("unknown {kind} '{name}'")]
    UnknownName { kind: &'static str, name: String },
}

#[derive(Debug, PartialEq, Error)]
pub enum QueryError {
    #[error("malformed query at {position}: {reason}")]
    Syntax { position: usize, reason: String },
    #[error("type check failed: {0}")]
    Type(TypeError),
    #[error("query root must be boolean, found an expression supporting {found}")]
    NotBoolean { found: TypeSet },
    #[error("unknown {kind} '{name}'")]
    UnknownName { kind: &'static str, name: String },
    #[error("a query needs at least one source")]
    NoSource,
}

impl From<TypeError> for QueryError {
    fn from(error: TypeError) -> Self {
        Self::Type(error)
    }
}

/// Failure reported by an external collaborator while refreshing live data.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum LookupError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("{0} was not found")]
    NotFound(String),
    #[error("lookup timed out after {0}ms")]
    TimedOut(u64),
}
