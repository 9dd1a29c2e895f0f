use crate::{
    lexer::escape,
    types::{FilterType, TypeSet},
};
use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
};

/// Identifier standing for "no such entity": an unresolved account, a status that is not a
/// reshare or not a reply. Never a real identifier, so it never compares equal to one.
pub const NO_ID: i64 = -1;

/// A number produced while evaluating a numeric expression.
///
/// Integer arithmetic that overflows continues in double precision, which is how SQLite evaluates
/// the storage fragment. Integers and reals compare exactly, without rounding either side, and a
/// NaN is unordered.
#[derive(Clone, Copy, Debug)]
pub enum Number {
    Integer(i64),
    Real(f64),
}

impl Number {
    /// 2^63, the first real above every `i64`.
    const INTEGER_LIMIT: f64 = 9_223_372_036_854_775_808.0;

    #[inline]
    pub fn to_f64(self) -> f64 {
        match self {
            Self::Integer(value) => value as f64,
            Self::Real(value) => value,
        }
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        match self {
            Self::Integer(value) => value == 0,
            Self::Real(value) => value == 0.0,
        }
    }

    /// The integer this number is exactly equal to, if any.
    pub fn as_integer(self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(value),
            Self::Real(value)
                if value.fract() == 0.0
                    && (-Self::INTEGER_LIMIT..Self::INTEGER_LIMIT).contains(&value) =>
            {
                Some(value as i64)
            }
            Self::Real(_) => None,
        }
    }
}

/// Order an integer against a real without converting either.
fn compare_integer_to_real(integer: i64, real: f64) -> Option<Ordering> {
    if real.is_nan() {
        return None;
    }
    if real >= Number::INTEGER_LIMIT {
        return Some(Ordering::Less);
    }
    if real < -Number::INTEGER_LIMIT {
        return Some(Ordering::Greater);
    }
    let whole = real.trunc();
    let fraction = real - whole;
    Some(
        integer
            .cmp(&(whole as i64))
            .then(0.0_f64.partial_cmp(&fraction).unwrap_or(Ordering::Equal)),
    )
}

impl From<i64> for Number {
    #[inline]
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (*self, *other) {
            (Self::Integer(left), Self::Integer(right)) => Some(left.cmp(&right)),
            (Self::Real(left), Self::Real(right)) => left.partial_cmp(&right),
            (Self::Integer(left), Self::Real(right)) => compare_integer_to_real(left, right),
            (Self::Real(left), Self::Integer(right)) => {
                compare_integer_to_real(right, left).map(Ordering::reverse)
            }
        }
    }
}

/// A literal constant.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ImmediateValue {
    Boolean(bool),
    Numeric(i64),
    String(String),
}

impl ImmediateValue {
    pub fn supported_types(&self) -> TypeSet {
        match self {
            Self::Boolean(_) => TypeSet::BOOLEAN,
            Self::Numeric(_) => TypeSet::NUMERIC,
            Self::String(_) => TypeSet::STRING,
        }
    }
}

impl Display for ImmediateValue {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Boolean(value) => write!(formatter, "{value}"),
            Self::Numeric(value) => write!(formatter, "{value}"),
            Self::String(value) => write!(formatter, "{}", escape(value)),
        }
    }
}

/// A named projection of the status being filtered.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StatusProperty {
    Id,
    /// The author: its identifier as a number, its screen name as a string.
    User,
    Text,
    Via,
    /// Creation time in seconds since the Unix epoch.
    CreatedAt,
    Retweet,
    /// Identifier of the reshared status, [`NO_ID`] when the status is not a reshare.
    Original,
    /// Identifier of the replied-to status, [`NO_ID`] when the status is not a reply.
    InReplyTo,
    Mentions,
}

impl StatusProperty {
    const NUMERIC_OR_STRING: TypeSet = TypeSet::of(&[FilterType::Numeric, FilterType::String]);

    pub const ALL: [StatusProperty; 9] = [
        Self::Id,
        Self::User,
        Self::Text,
        Self::Via,
        Self::CreatedAt,
        Self::Retweet,
        Self::Original,
        Self::InReplyTo,
        Self::Mentions,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::User => "user",
            Self::Text => "text",
            Self::Via => "via",
            Self::CreatedAt => "created_at",
            Self::Retweet => "retweet",
            Self::Original => "original",
            Self::InReplyTo => "in_reply_to",
            Self::Mentions => "mentions",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|property| property.name() == name)
    }

    pub const fn supported_types(self) -> TypeSet {
        match self {
            Self::Id | Self::CreatedAt | Self::Original | Self::InReplyTo => TypeSet::NUMERIC,
            Self::User => Self::NUMERIC_OR_STRING,
            Self::Text | Self::Via => TypeSet::STRING,
            Self::Retweet => TypeSet::BOOLEAN,
            Self::Mentions => TypeSet::SET,
        }
    }
}

impl Display for StatusProperty {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        write!(formatter, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_names_round_trip() {
        for property in StatusProperty::ALL {
            assert_eq!(Some(property), StatusProperty::from_name(property.name()));
        }
    }

    #[test]
    fn integers_and_reals_compare_exactly() {
        let max = Number::Integer(i64::MAX);

        assert!(max < Number::Real(9_223_372_036_854_775_808.0));
        assert_eq!(Number::Real(1e18), Number::Integer(1_000_000_000_000_000_000));
        assert!(Number::Integer(1_000_000_000_000_000_001) > Number::Real(1e18));
        assert!(Number::Integer(-3) > Number::Real(-3.5));
        assert!(Number::Real(2.5) > Number::Integer(2));
        assert!(Number::Integer(i64::MIN) > Number::Real(f64::NEG_INFINITY));
    }

    #[test]
    fn nan_is_unordered() {
        let nan = Number::Real(f64::NAN);

        assert_eq!(None, nan.partial_cmp(&Number::Integer(0)));
        assert_ne!(nan, nan);
    }

    #[test]
    fn only_whole_reals_in_range_are_integers() {
        assert_eq!(Some(20), Number::Real(20.0).as_integer());
        assert_eq!(Some(i64::MIN), Number::Real(-9_223_372_036_854_775_808.0).as_integer());
        assert_eq!(None, Number::Real(20.5).as_integer());
        assert_eq!(None, Number::Real(9_223_372_036_854_775_808.0).as_integer());
        assert_eq!(None, Number::Real(f64::NAN).as_integer());
    }

    #[test]
    fn unknown_property_name_is_rejected() {
        assert_eq!(None, StatusProperty::from_name("favorites"));
    }

    #[test]
    fn user_can_be_a_number_or_a_string() {
        let types = StatusProperty::User.supported_types();

        assert!(types.contains(FilterType::Numeric));
        assert!(types.contains(FilterType::String));
        assert!(!types.contains(FilterType::Set));
    }

    #[test]
    fn string_literals_are_quoted_and_escaped() {
        let value = ImmediateValue::String(r#"foo "bar""#.to_owned());

        assert_eq!(r#""foo \"bar\"""#, value.to_string());
    }

    #[test]
    fn numeric_literals_are_rendered_verbatim() {
        assert_eq!("-42", ImmediateValue::Numeric(-42).to_string());
        assert_eq!("true", ImmediateValue::Boolean(true).to_string());
    }
}
