//! Compile a checked [`Expr`] into closures evaluated directly against a [`Status`].
//!
//! Every node compiles into a provider of the type its parent resolved for it. Providers only
//! read live caches, they never trigger a refresh.

use crate::{
    ast::Expr,
    error::QueryError,
    identifiers::IdentifierSet,
    operators::{BinaryOperator, Combinator, UnaryOperator},
    status::Status,
    types::FilterType,
    values::{ImmediateValue, Number, StatusProperty, NO_ID},
};
use std::{ops::Deref, sync::Arc};

pub type BooleanProvider = Box<dyn Fn(&Status) -> bool + Send + Sync>;
pub type NumericProvider = Box<dyn Fn(&Status) -> Number + Send + Sync>;
pub type StringProvider = Box<dyn for<'a> Fn(&'a Status) -> StringValue<'a> + Send + Sync>;
pub type SetProvider = Box<dyn for<'a> Fn(&'a Status) -> SetValue<'a> + Send + Sync>;

/// A string produced for one status: borrowed from it, or shared with a literal.
#[derive(Clone, Debug)]
pub enum StringValue<'a> {
    Borrowed(&'a str),
    Shared(Arc<str>),
}

impl Deref for StringValue<'_> {
    type Target = str;

    fn deref(&self) -> &str {
        match self {
            Self::Borrowed(value) => value,
            Self::Shared(value) => value,
        }
    }
}

/// A set produced for one status: a live cache snapshot or an entity list of the status.
#[derive(Clone, Debug)]
pub enum SetValue<'a> {
    Shared(Arc<IdentifierSet>),
    Sorted(&'a [i64]),
}

impl SetValue<'_> {
    #[inline]
    pub fn contains(&self, id: i64) -> bool {
        match self {
            Self::Shared(set) => set.contains(id),
            Self::Sorted(values) => values.binary_search(&id).is_ok(),
        }
    }
}

/// Compile a boolean root into an in-memory predicate.
///
/// # Examples
///
/// ```rust
/// use status_filter::{compile_predicate, BinaryOperator, Expr, Status, StatusProperty};
///
/// let root = Expr::binary(
///     BinaryOperator::Contains,
///     Expr::property(StatusProperty::Text),
///     Expr::string("RUST"),
/// ).unwrap();
/// let predicate = compile_predicate(&root).unwrap();
///
/// assert!(predicate(&Status::builder(1, 2, "alice").with_text("I like rust").build()));
/// ```
pub fn compile_predicate(root: &Expr) -> Result<BooleanProvider, QueryError> {
    let found = root.supported_types();
    if !found.contains(FilterType::Boolean) {
        return Err(QueryError::NotBoolean { found });
    }
    Ok(boolean(root))
}

fn string_provider<F>(provider: F) -> StringProvider
where
    F: for<'a> Fn(&'a Status) -> StringValue<'a> + Send + Sync + 'static,
{
    Box::new(provider)
}

fn set_provider<F>(provider: F) -> SetProvider
where
    F: for<'a> Fn(&'a Status) -> SetValue<'a> + Send + Sync + 'static,
{
    Box::new(provider)
}

fn boolean(expression: &Expr) -> BooleanProvider {
    match expression {
        Expr::Immediate(ImmediateValue::Boolean(value)) => {
            let value = *value;
            Box::new(move |_| value)
        }
        Expr::Property(StatusProperty::Retweet) => {
            Box::new(|status| status.original_id().is_some())
        }
        Expr::Combinator {
            combinator,
            negate,
            left,
            right,
        } => {
            let negate = *negate;
            let left = boolean(left);
            let right = boolean(right);
            match combinator {
                Combinator::And => {
                    Box::new(move |status| (left(status) != negate) && (right(status) != negate))
                }
                Combinator::Or => {
                    Box::new(move |status| (left(status) != negate) || (right(status) != negate))
                }
            }
        }
        Expr::Unary {
            operator: UnaryOperator::Not,
            operand,
        } => {
            let operand = boolean(operand);
            Box::new(move |status| !operand(status))
        }
        Expr::Binary {
            operator,
            operand_type,
            left,
            right,
        } if !operator.is_arithmetic() => {
            let operator = *operator;
            match operand_type {
                FilterType::Boolean => {
                    let left = boolean(left);
                    let right = boolean(right);
                    Box::new(move |status| operator.compare(&left(status), &right(status)))
                }
                FilterType::Numeric => {
                    let left = numeric(left);
                    let right = numeric(right);
                    Box::new(move |status| operator.compare(&left(status), &right(status)))
                }
                FilterType::String => {
                    let left = string(left);
                    let right = string(right);
                    Box::new(move |status| operator.match_strings(&left(status), &right(status)))
                }
                FilterType::Set => {
                    let (element, members) = match operator {
                        BinaryOperator::Contain => (numeric(right), set(left)),
                        _ => (numeric(left), set(right)),
                    };
                    Box::new(move |status| {
                        element(status)
                            .as_integer()
                            .is_some_and(|id| members(status).contains(id))
                    })
                }
                FilterType::Invalid => unreachable!("Unresolved operand type. This is a bug."),
            }
        }
        Expr::Immediate(_) | Expr::Property(_) | Expr::Live(_) | Expr::Binary { .. } => {
            unsupported(expression, FilterType::Boolean)
        }
    }
}

fn numeric(expression: &Expr) -> NumericProvider {
    match expression {
        Expr::Immediate(ImmediateValue::Numeric(value)) => {
            let value = Number::Integer(*value);
            Box::new(move |_| value)
        }
        Expr::Property(property) => match property {
            StatusProperty::Id => Box::new(|status| status.id().into()),
            StatusProperty::User => Box::new(|status| status.author().id.into()),
            StatusProperty::CreatedAt => {
                Box::new(|status| status.created_at().timestamp().into())
            }
            StatusProperty::Original => {
                Box::new(|status| status.original_id().unwrap_or(NO_ID).into())
            }
            StatusProperty::InReplyTo => {
                Box::new(|status| status.in_reply_to_id().unwrap_or(NO_ID).into())
            }
            StatusProperty::Text
            | StatusProperty::Via
            | StatusProperty::Retweet
            | StatusProperty::Mentions => unsupported(expression, FilterType::Numeric),
        },
        Expr::Live(live) => {
            let live = live.clone();
            Box::new(move |_| live.account_id().into())
        }
        Expr::Binary {
            operator,
            left,
            right,
            ..
        } if operator.is_arithmetic() => {
            let operator = *operator;
            let left = numeric(left);
            let right = numeric(right);
            Box::new(move |status| operator.apply(left(status), right(status)))
        }
        Expr::Immediate(_) | Expr::Combinator { .. } | Expr::Unary { .. } | Expr::Binary { .. } => {
            unsupported(expression, FilterType::Numeric)
        }
    }
}

fn string(expression: &Expr) -> StringProvider {
    match expression {
        Expr::Immediate(ImmediateValue::String(value)) => {
            let value: Arc<str> = Arc::from(value.as_str());
            string_provider(move |_| StringValue::Shared(Arc::clone(&value)))
        }
        Expr::Property(StatusProperty::User) => {
            string_provider(|status| StringValue::Borrowed(&status.author().screen_name))
        }
        Expr::Property(StatusProperty::Text) => {
            string_provider(|status| StringValue::Borrowed(status.text()))
        }
        Expr::Property(StatusProperty::Via) => {
            string_provider(|status| StringValue::Borrowed(status.via()))
        }
        Expr::Immediate(_)
        | Expr::Property(_)
        | Expr::Live(_)
        | Expr::Combinator { .. }
        | Expr::Unary { .. }
        | Expr::Binary { .. } => unsupported(expression, FilterType::String),
    }
}

fn set(expression: &Expr) -> SetProvider {
    match expression {
        Expr::Property(StatusProperty::Mentions) => {
            set_provider(|status| SetValue::Sorted(status.mentions()))
        }
        Expr::Live(live) => {
            let live = live.clone();
            set_provider(move |_| SetValue::Shared(live.snapshot()))
        }
        Expr::Immediate(_)
        | Expr::Property(_)
        | Expr::Combinator { .. }
        | Expr::Unary { .. }
        | Expr::Binary { .. } => unsupported(expression, FilterType::Set),
    }
}

fn unsupported(expression: &Expr, expected: FilterType) -> ! {
    unreachable!("'{expression}' cannot be evaluated as {expected}. This is a bug.")
}
