//! Render a checked [`Expr`] as an SQL `WHERE` clause fragment.
//!
//! The fragment reads the persisted tables described by [`storage_schema`] instead of the
//! in-memory live caches. Every rendered condition is NULL-free: absent references collapse to
//! the same `-1` sentinel the predicate uses, and boolean expressions always produce 0 or 1.
//! Arithmetic is left to SQLite, whose overflow behavior the predicate mirrors.

use crate::{
    ast::{Expr, TreeNode},
    config::EngineConfig,
    environment::ListRef,
    error::QueryError,
    live::{AccountRef, AccountSelector, LiveKind},
    operators::{BinaryOperator, UnaryOperator},
    sources::StatusSource,
    types::FilterType,
    values::{ImmediateValue, StatusProperty, NO_ID},
};
use itertools::Itertools;

/// DDL of the tables storage fragments are evaluated against.
pub fn storage_schema(config: &EngineConfig) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS {table} (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL,
    screen_name TEXT NOT NULL,
    text TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    original_id INTEGER,
    in_reply_to_id INTEGER,
    via TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS status_mentions (
    status_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    PRIMARY KEY (status_id, user_id)
);
CREATE TABLE IF NOT EXISTS local_accounts (
    id INTEGER PRIMARY KEY,
    screen_name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS relationships (
    account_id INTEGER NOT NULL,
    kind TEXT NOT NULL,
    target_id INTEGER NOT NULL,
    PRIMARY KEY (account_id, kind, target_id)
);
CREATE TABLE IF NOT EXISTS lists (
    id INTEGER PRIMARY KEY,
    owner TEXT NOT NULL,
    slug TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS list_members (
    list_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    PRIMARY KEY (list_id, user_id)
);
"#,
        table = quote_identifier(&config.status_table)
    )
}

/// Render a boolean root as a filter over the configured status table.
///
/// # Examples
///
/// ```rust
/// use status_filter::{compile_storage_fragment, BinaryOperator, EngineConfig, Expr, StatusProperty};
///
/// let root = Expr::binary(
///     BinaryOperator::Equal,
///     Expr::property(StatusProperty::Text),
///     Expr::string("it's"),
/// ).unwrap();
///
/// assert_eq!(
///     r#"("statuses".text = 'it''s')"#,
///     compile_storage_fragment(&root, &EngineConfig::default()).unwrap()
/// );
/// ```
pub fn compile_storage_fragment(root: &Expr, config: &EngineConfig) -> Result<String, QueryError> {
    let found = root.supported_types();
    if !found.contains(FilterType::Boolean) {
        return Err(QueryError::NotBoolean { found });
    }
    Ok(FragmentWriter::new(config).boolean(root))
}

/// Render a whole query: any of its sources, and its root.
pub(crate) fn compile_query_fragment(
    sources: &[StatusSource],
    root: &Expr,
    config: &EngineConfig,
) -> String {
    format!(
        "({}) AND ({})",
        compile_sources_fragment(sources, config),
        FragmentWriter::new(config).boolean(root)
    )
}

/// Render the sources of a query, OR-combined.
pub(crate) fn compile_sources_fragment(sources: &[StatusSource], config: &EngineConfig) -> String {
    let writer = FragmentWriter::new(config);
    sources
        .iter()
        .map(|source| writer.source(source))
        .join(" OR ")
}

pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn integer(value: i64) -> String {
    match value {
        i64::MIN => format!("({} - 1)", i64::MIN + 1),
        value if value < 0 => format!("({value})"),
        value => value.to_string(),
    }
}

struct FragmentWriter {
    table: String,
}

impl FragmentWriter {
    fn new(config: &EngineConfig) -> Self {
        Self {
            table: quote_identifier(&config.status_table),
        }
    }

    fn column(&self, name: &str) -> String {
        format!("{}.{name}", self.table)
    }

    fn source(&self, source: &StatusSource) -> String {
        match source {
            StatusSource::Local => "1".to_owned(),
            StatusSource::User(AccountRef::ScreenName(name)) => {
                format!("({} = {})", self.column("screen_name"), quote_string(name))
            }
            StatusSource::User(AccountRef::Id(id)) => {
                format!("({} = {})", self.column("user_id"), integer(*id))
            }
            StatusSource::List(members) => {
                format!("({} IN ({}))", self.column("user_id"), self.live_set(members.kind()))
            }
            StatusSource::Search(term) => format!(
                "(INSTR(LOWER({}), LOWER({})) > 0)",
                self.column("text"),
                quote_string(term)
            ),
        }
    }

    fn boolean(&self, expression: &Expr) -> String {
        match expression {
            Expr::Immediate(ImmediateValue::Boolean(value)) => u8::from(*value).to_string(),
            Expr::Property(StatusProperty::Retweet) => {
                format!("({} IS NOT NULL)", self.column("original_id"))
            }
            Expr::Combinator {
                combinator,
                negate,
                left,
                right,
            } => {
                let (left, right) = if *negate {
                    (
                        format!("(NOT {})", self.boolean(left)),
                        format!("(NOT {})", self.boolean(right)),
                    )
                } else {
                    (self.boolean(left), self.boolean(right))
                };
                format!("({left} {} {right})", combinator.sql())
            }
            Expr::Unary {
                operator: UnaryOperator::Not,
                operand,
            } => format!("(NOT {})", self.boolean(operand)),
            Expr::Binary {
                operator,
                operand_type,
                left,
                right,
            } if !operator.is_arithmetic() => match operand_type {
                FilterType::Boolean => format!(
                    "({} {} {})",
                    self.boolean(left),
                    operator.sql(),
                    self.boolean(right)
                ),
                FilterType::Numeric => non_null(
                    format!(
                        "({} {} {})",
                        self.numeric(left),
                        operator.sql(),
                        self.numeric(right)
                    ),
                    [left, right],
                ),
                FilterType::String => self.string_match(*operator, left, right),
                FilterType::Set => {
                    let (element, set) = match operator {
                        BinaryOperator::Contain => (right, left),
                        _ => (left, right),
                    };
                    non_null(
                        format!("({} IN ({}))", self.numeric(element), self.set(set)),
                        [element],
                    )
                }
                FilterType::Invalid => unreachable!("Unresolved operand type. This is a bug."),
            },
            Expr::Immediate(_) | Expr::Property(_) | Expr::Live(_) | Expr::Binary { .. } => {
                unsupported(expression, FilterType::Boolean)
            }
        }
    }

    fn string_match(&self, operator: BinaryOperator, left: &Expr, right: &Expr) -> String {
        let (left, right) = (self.string(left), self.string(right));
        match operator {
            BinaryOperator::Equal | BinaryOperator::NotEqual => {
                format!("({left} {} {right})", operator.sql())
            }
            BinaryOperator::Contains => format!("(INSTR(LOWER({left}), LOWER({right})) > 0)"),
            BinaryOperator::StartsWith => {
                format!("(SUBSTR(LOWER({left}), 1, LENGTH({right})) = LOWER({right}))")
            }
            BinaryOperator::EndsWith => format!(
                "((LENGTH({right}) = 0) OR (SUBSTR(LOWER({left}), -LENGTH({right})) = LOWER({right})))"
            ),
            other => unreachable!("{other:?} does not apply to strings. This is a bug."),
        }
    }

    fn numeric(&self, expression: &Expr) -> String {
        match expression {
            Expr::Immediate(ImmediateValue::Numeric(value)) => integer(*value),
            Expr::Property(property) => match property {
                StatusProperty::Id => self.column("id"),
                StatusProperty::User => self.column("user_id"),
                StatusProperty::CreatedAt => self.column("created_at"),
                StatusProperty::Original => {
                    format!("COALESCE({}, {NO_ID})", self.column("original_id"))
                }
                StatusProperty::InReplyTo => {
                    format!("COALESCE({}, {NO_ID})", self.column("in_reply_to_id"))
                }
                StatusProperty::Text
                | StatusProperty::Via
                | StatusProperty::Retweet
                | StatusProperty::Mentions => unsupported(expression, FilterType::Numeric),
            },
            Expr::Live(live) => match live.kind() {
                LiveKind::SpecificAccount(account) => format!(
                    "COALESCE((SELECT MIN(id) FROM local_accounts WHERE {}), {NO_ID})",
                    account_filter(account)
                ),
                LiveKind::AnyAccount | LiveKind::Relations { .. } | LiveKind::ListMembers(_) => {
                    unsupported(expression, FilterType::Numeric)
                }
            },
            Expr::Binary {
                operator: BinaryOperator::Divide,
                left,
                right,
                ..
            } => {
                let (left, right) = (self.numeric(left), self.numeric(right));
                format!("(CASE WHEN {right} = 0 THEN 0 ELSE {left} / {right} END)")
            }
            Expr::Binary {
                operator,
                left,
                right,
                ..
            } if operator.is_arithmetic() => format!(
                "({} {} {})",
                self.numeric(left),
                operator.sql(),
                self.numeric(right)
            ),
            Expr::Immediate(_) | Expr::Combinator { .. } | Expr::Unary { .. } | Expr::Binary { .. } => {
                unsupported(expression, FilterType::Numeric)
            }
        }
    }

    fn string(&self, expression: &Expr) -> String {
        match expression {
            Expr::Immediate(ImmediateValue::String(value)) => quote_string(value),
            Expr::Property(StatusProperty::User) => self.column("screen_name"),
            Expr::Property(StatusProperty::Text) => self.column("text"),
            Expr::Property(StatusProperty::Via) => self.column("via"),
            Expr::Immediate(_)
            | Expr::Property(_)
            | Expr::Live(_)
            | Expr::Combinator { .. }
            | Expr::Unary { .. }
            | Expr::Binary { .. } => unsupported(expression, FilterType::String),
        }
    }

    /// A `SELECT` producing the identifiers of a set expression.
    fn set(&self, expression: &Expr) -> String {
        match expression {
            Expr::Property(StatusProperty::Mentions) => format!(
                "SELECT user_id FROM status_mentions WHERE status_id = {}",
                self.column("id")
            ),
            Expr::Live(live) => self.live_set(live.kind()),
            Expr::Immediate(_)
            | Expr::Property(_)
            | Expr::Combinator { .. }
            | Expr::Unary { .. }
            | Expr::Binary { .. } => unsupported(expression, FilterType::Set),
        }
    }

    fn live_set(&self, kind: &LiveKind) -> String {
        match kind {
            LiveKind::AnyAccount => "SELECT id FROM local_accounts".to_owned(),
            LiveKind::SpecificAccount(account) => {
                format!("SELECT id FROM local_accounts WHERE {}", account_filter(account))
            }
            LiveKind::Relations { selector, kind } => {
                let accounts = match selector {
                    AccountSelector::Any => self.live_set(&LiveKind::AnyAccount),
                    AccountSelector::Local(account) => {
                        self.live_set(&LiveKind::SpecificAccount(account.clone()))
                    }
                };
                format!(
                    "SELECT target_id FROM relationships WHERE kind = {} AND account_id IN ({accounts})",
                    quote_string(kind.name())
                )
            }
            LiveKind::ListMembers(ListRef { owner, slug }) => format!(
                "SELECT user_id FROM list_members WHERE list_id IN \
                 (SELECT id FROM lists WHERE owner = {} AND slug = {})",
                quote_string(owner),
                quote_string(slug)
            ),
        }
    }
}

fn account_filter(account: &AccountRef) -> String {
    match account {
        AccountRef::ScreenName(name) => format!("screen_name = {}", quote_string(name)),
        AccountRef::Id(id) => format!("id = {}", integer(*id)),
    }
}

/// SQLite turns a NaN arithmetic result into NULL. A comparison reading one must still evaluate to
/// 0, the way the in-memory predicate treats NaN as unordered.
fn non_null<'a>(condition: String, operands: impl IntoIterator<Item = &'a TreeNode>) -> String {
    let nullable = operands.into_iter().any(|operand| {
        matches!(operand.as_ref(), Expr::Binary { operator, .. } if operator.is_arithmetic())
    });
    if nullable {
        format!("COALESCE({condition}, 0)")
    } else {
        condition
    }
}

fn unsupported(expression: &Expr, expected: FilterType) -> ! {
    unreachable!("'{expression}' cannot be rendered as {expected}. This is a bug.")
}
