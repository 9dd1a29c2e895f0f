use crate::{
    error::TypeError,
    types::{resolve, FilterType, TypeSet},
    values::Number,
};
use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    /// The connective that keeps a combinator equivalent once its whole result is negated.
    #[inline]
    pub const fn dual(self) -> Self {
        match self {
            Self::And => Self::Or,
            Self::Or => Self::And,
        }
    }

    pub(crate) const fn sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl Display for Combinator {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::And => write!(formatter, "&&"),
            Self::Or => write!(formatter, "||"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum UnaryOperator {
    Not,
}

impl UnaryOperator {
    pub const fn operand_types(self) -> TypeSet {
        match self {
            Self::Not => TypeSet::BOOLEAN,
        }
    }

    pub const fn supported_types(self) -> TypeSet {
        match self {
            Self::Not => TypeSet::BOOLEAN,
        }
    }

    pub(crate) fn check(self, operand: TypeSet) -> Result<FilterType, TypeError> {
        let expected = self.operand_types();
        match operand.intersection(expected).first() {
            FilterType::Invalid => Err(TypeError::UnsupportedOperand {
                operator: self.symbol(),
                operand,
                expected,
            }),
            resolved => Ok(resolved),
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Not => "!",
        }
    }
}

impl Display for UnaryOperator {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        write!(formatter, "{}", self.symbol())
    }
}

/// What a binary operator accepts on each side.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperandTypes {
    /// Both sides must agree on a single type taken from this set.
    Uniform(TypeSet),
    /// A numeric element on one side and a set on the other.
    Membership { element_on_left: bool },
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BinaryOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Contains,
    StartsWith,
    EndsWith,
    /// `element <- set`
    In,
    /// `set -> element`
    Contain,
}

impl BinaryOperator {
    const EQUATABLE: TypeSet =
        TypeSet::of(&[FilterType::Boolean, FilterType::Numeric, FilterType::String]);

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessThanEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanEqual => ">=",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Contains => "contains",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
            Self::In => "<-",
            Self::Contain => "->",
        }
    }

    #[inline]
    pub const fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide
        )
    }

    /// Types the operator's result can be evaluated as.
    pub const fn supported_types(self) -> TypeSet {
        if self.is_arithmetic() {
            TypeSet::NUMERIC
        } else {
            TypeSet::BOOLEAN
        }
    }

    pub const fn operand_types(self) -> OperandTypes {
        match self {
            Self::Equal | Self::NotEqual => OperandTypes::Uniform(Self::EQUATABLE),
            Self::LessThan
            | Self::LessThanEqual
            | Self::GreaterThan
            | Self::GreaterThanEqual
            | Self::Add
            | Self::Subtract
            | Self::Multiply
            | Self::Divide => OperandTypes::Uniform(TypeSet::NUMERIC),
            Self::Contains | Self::StartsWith | Self::EndsWith => {
                OperandTypes::Uniform(TypeSet::STRING)
            }
            Self::In => OperandTypes::Membership {
                element_on_left: true,
            },
            Self::Contain => OperandTypes::Membership {
                element_on_left: false,
            },
        }
    }

    /// Resolve the type both operands are evaluated as.
    ///
    /// Membership operators resolve to [`FilterType::Set`]; the element side is then evaluated
    /// as a number.
    pub(crate) fn check(self, left: TypeSet, right: TypeSet) -> Result<FilterType, TypeError> {
        match self.operand_types() {
            OperandTypes::Uniform(accepted) => resolve(left, right, accepted),
            OperandTypes::Membership { element_on_left } => {
                let (element, set) = if element_on_left {
                    (left, right)
                } else {
                    (right, left)
                };
                if !element.contains(FilterType::Numeric) {
                    return Err(TypeError::UnsupportedOperand {
                        operator: self.symbol(),
                        operand: element,
                        expected: TypeSet::NUMERIC,
                    });
                }
                if !set.contains(FilterType::Set) {
                    return Err(TypeError::UnsupportedOperand {
                        operator: self.symbol(),
                        operand: set,
                        expected: TypeSet::SET,
                    });
                }
                Ok(FilterType::Set)
            }
        }
    }

    /// Unordered operands, such as a NaN, satisfy no comparison.
    pub(crate) fn compare<T: PartialOrd + ?Sized>(self, a: &T, b: &T) -> bool {
        let Some(ordering) = a.partial_cmp(b) else {
            return false;
        };
        match self {
            Self::Equal => ordering.is_eq(),
            Self::NotEqual => ordering.is_ne(),
            Self::LessThan => ordering.is_lt(),
            Self::LessThanEqual => ordering.is_le(),
            Self::GreaterThan => ordering.is_gt(),
            Self::GreaterThanEqual => ordering.is_ge(),
            other => {
                unreachable!("{other:?} is not a comparison. This is a bug.")
            }
        }
    }

    /// String operators. Matching is ASCII case-insensitive, equality is exact.
    pub(crate) fn match_strings(self, a: &str, b: &str) -> bool {
        match self {
            Self::Equal | Self::NotEqual => self.compare(a, b),
            Self::Contains => a
                .to_ascii_lowercase()
                .contains(&b.to_ascii_lowercase()),
            Self::StartsWith => {
                a.len() >= b.len() && a.as_bytes()[..b.len()].eq_ignore_ascii_case(b.as_bytes())
            }
            Self::EndsWith => {
                a.len() >= b.len()
                    && a.as_bytes()[a.len() - b.len()..].eq_ignore_ascii_case(b.as_bytes())
            }
            other => {
                unreachable!("{other:?} does not apply to strings. This is a bug.")
            }
        }
    }

    /// Arithmetic the way SQLite evaluates it.
    ///
    /// Integers stay integers while the result fits, an overflowing operation or a real operand
    /// continues in double precision. Division by zero yields zero.
    pub(crate) fn apply(self, a: Number, b: Number) -> Number {
        if self == Self::Divide && b.is_zero() {
            return Number::Integer(0);
        }
        if let (Number::Integer(a), Number::Integer(b)) = (a, b) {
            let exact = match self {
                Self::Add => a.checked_add(b),
                Self::Subtract => a.checked_sub(b),
                Self::Multiply => a.checked_mul(b),
                Self::Divide => a.checked_div(b),
                other => unreachable!("{other:?} is not arithmetic. This is a bug."),
            };
            if let Some(value) = exact {
                return Number::Integer(value);
            }
        }
        let (a, b) = (a.to_f64(), b.to_f64());
        Number::Real(match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide => a / b,
            other => unreachable!("{other:?} is not arithmetic. This is a bug."),
        })
    }

    pub(crate) const fn sql(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::LessThan => "<",
            Self::LessThanEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanEqual => ">=",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Contains => "INSTR",
            Self::StartsWith | Self::EndsWith => "SUBSTR",
            Self::In | Self::Contain => "IN",
        }
    }
}

impl Display for BinaryOperator {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        write!(formatter, "{}", self.symbol())
    }
}
