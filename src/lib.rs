//! A typed filter query language for social feed statuses.
//!
//! A query names the sources statuses are taken from and a boolean condition they must satisfy.
//! Each query is parsed, type checked, and compiled twice: into a predicate evaluated directly
//! against a [`Status`], and into an SQL `WHERE` fragment evaluated by a storage engine. Both
//! forms accept exactly the same statuses.
//!
//! # Examples
//!
//! Filtering statuses in memory:
//!
//! ```
//! use status_filter::{parse, compile_predicate, Status};
//!
//! let query = parse(r#"from local where text contains "rust" && !retweet"#).unwrap();
//! let predicate = compile_predicate(&query.root).unwrap();
//!
//! let status = Status::builder(1, 42, "alice")
//!     .with_text("Learning Rust today")
//!     .build();
//! assert!(predicate(&status));
//! ```
//!
//! Rendering the same condition for storage:
//!
//! ```
//! use status_filter::{compile_storage_fragment, parse_expression, EngineConfig};
//!
//! let root = parse_expression("created_at >= 1704067200 && via == \"web\"").unwrap();
//! let fragment = compile_storage_fragment(&root, &EngineConfig::default()).unwrap();
//!
//! assert_eq!(
//!     r#"(("statuses".created_at >= 1704067200) AND ("statuses".via = 'web'))"#,
//!     fragment
//! );
//! ```
//!
//! Queries that read live data (local accounts, relationships, lists) are built by a
//! [`FilterEngine`], which binds them to the collaborators of a [`FilterEnvironment`]. A
//! [`FilterQuery`] only fetches live data between [`FilterQuery::begin_lifecycle`] and
//! [`FilterQuery::end_lifecycle`], and raises a [`RefilterSignal`] whenever that data changes.
//!
//! # Domain Specific Language (DSL)
//!
//! A query reads `from <sources> [where <expression>]`. When the `where` clause is omitted, every
//! status of the sources matches. The sources are:
//!
//! * `local`: every status;
//! * `user.<screen name>` or `user.#<id>`: statuses authored by an account;
//! * `list.<owner>"<slug>"`: statuses authored by the current members of a list;
//! * `search "<term>"`: statuses whose text contains the term, ignoring ASCII case.
//!
//! Screen names are written bare when they look like an identifier, keywords included
//! (`user.where`). Any other name is double quoted like a string literal (`user."1st_user"`).
//!
//! Expressions are built from:
//!
//! * Literals: `true`, `false`, integers and double quoted strings (`\"` and `\\` escapes);
//! * Properties: `id`, `user`, `text`, `via`, `created_at`, `retweet`, `original`,
//!   `in_reply_to` and `mentions`;
//! * Live values: `*` (every local account), `local.<account>`, `*.<relation>`,
//!   `local.<account>.<relation>` and `list.<owner>"<slug>"`, where a relation is one of
//!   `following`, `followers`, `blocking` and `muting`;
//! * Boolean operators: `&&`, `||` and `!`;
//! * Comparison: `==`, `!=`, `<`, `<=`, `>`, `>=`;
//! * Arithmetic: `+`, `-`, `*`, `/` over 64-bit integers. Division by zero yields zero, and an
//!   operation that overflows continues in double precision, the way SQLite evaluates it;
//! * String matching: `contains`, `startswith`, `endswith`, which ignore ASCII case;
//! * Membership: `element <- set` and `set -> element`.
//!
//! As an example, the following would all be valid queries:
//!
//! ```text
//! from local where user <- *.following && !(user <- *.muting)
//! from list.alice"friends", search "rust" where !retweet
//! from user.#12 where mentions -> local.bob || text startswith "RT"
//! ```
//!
//! # Typing
//!
//! Every node supports a set of [`FilterType`]s. When an operator is applied, the type of its
//! operands is resolved from what both operands and the operator support, preferring booleans,
//! then numbers, then strings, then sets. A query whose condition cannot be resolved to a
//! boolean is rejected before anything is compiled.
mod ast;
mod compiler;
mod config;
mod environment;
mod error;
mod fragment;
mod identifiers;
mod lexer;
mod live;
mod operators;
mod parser;
mod query;
mod sources;
mod status;
#[cfg(test)]
mod test_utils;
mod types;
mod values;

pub use crate::{
    ast::{Expr, TreeNode},
    compiler::{
        compile_predicate, BooleanProvider, NumericProvider, SetProvider, SetValue,
        StringProvider, StringValue,
    },
    config::{ConfigError, EngineConfig},
    environment::{
        AccountRegistry, ChangeFeed, FilterEnvironment, ListRef, ListService, ListSnapshot,
        RelationKind, RelationshipStore,
    },
    error::{LookupError, ParserError, QueryError, TypeError},
    fragment::{compile_storage_fragment, storage_schema},
    identifiers::{AccountId, IdentifierSet},
    live::{AccountRef, AccountSelector, LiveKind, LivePhase, LiveValue, RefilterSignal},
    operators::{BinaryOperator, Combinator, OperandTypes, UnaryOperator},
    parser::{parse, parse_expression, ParsedQuery},
    query::{FilterEngine, FilterQuery},
    sources::StatusSource,
    status::{Author, Status, StatusBuilder, StatusId},
    types::{resolve, FilterType, TypeSet},
    values::{ImmediateValue, Number, StatusProperty, NO_ID},
};
