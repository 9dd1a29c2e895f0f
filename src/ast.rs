use crate::{
    error::TypeError,
    live::{LiveKind, LiveValue},
    operators::{BinaryOperator, Combinator, UnaryOperator},
    types::{resolve, FilterType, TypeSet},
    values::{ImmediateValue, StatusProperty},
};
use std::fmt::{Display, Formatter};

pub type TreeNode = Box<Expr>;

/// A type-checked filter expression.
///
/// Operator nodes can only be built through the checked constructors, so every tree in hand has
/// already passed type resolution.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Immediate(ImmediateValue),
    Property(StatusProperty),
    Live(LiveValue),
    /// `&&` or `||` over two boolean operands.
    ///
    /// When `negate` is set, each operand is negated before combining, i.e.
    /// `(left != negate) combinator (right != negate)`. The text form of such a pair is
    /// `!(left && right)`.
    #[non_exhaustive]
    Combinator {
        combinator: Combinator,
        negate: bool,
        left: TreeNode,
        right: TreeNode,
    },
    #[non_exhaustive]
    Unary {
        operator: UnaryOperator,
        operand: TreeNode,
    },
    /// `operand_type` is the type both operands are evaluated as.
    #[non_exhaustive]
    Binary {
        operator: BinaryOperator,
        operand_type: FilterType,
        left: TreeNode,
        right: TreeNode,
    },
}

impl Expr {
    #[inline]
    pub fn boolean(value: bool) -> Self {
        Self::Immediate(ImmediateValue::Boolean(value))
    }

    #[inline]
    pub fn numeric(value: i64) -> Self {
        Self::Immediate(ImmediateValue::Numeric(value))
    }

    #[inline]
    pub fn string(value: &str) -> Self {
        Self::Immediate(ImmediateValue::String(value.to_owned()))
    }

    #[inline]
    pub fn property(property: StatusProperty) -> Self {
        Self::Property(property)
    }

    /// A fresh, inactive live value.
    #[inline]
    pub fn live(kind: LiveKind) -> Self {
        Self::Live(LiveValue::new(kind))
    }

    pub fn combinator(
        combinator: Combinator,
        negate: bool,
        left: Expr,
        right: Expr,
    ) -> Result<Self, TypeError> {
        resolve(
            left.supported_types(),
            right.supported_types(),
            TypeSet::BOOLEAN,
        )?;
        Ok(Self::Combinator {
            combinator,
            negate,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    #[inline]
    pub fn and(left: Expr, right: Expr) -> Result<Self, TypeError> {
        Self::combinator(Combinator::And, false, left, right)
    }

    #[inline]
    pub fn or(left: Expr, right: Expr) -> Result<Self, TypeError> {
        Self::combinator(Combinator::Or, false, left, right)
    }

    /// The logical negation of `self`.
    ///
    /// Combinators absorb the negation through De Morgan's laws, so a [`Expr::Unary`] never wraps
    /// a combinator.
    pub fn not(self) -> Result<Self, TypeError> {
        match self {
            Self::Combinator {
                combinator,
                negate: false,
                left,
                right,
            } => Ok(Self::Combinator {
                combinator: combinator.dual(),
                negate: true,
                left,
                right,
            }),
            Self::Combinator {
                combinator,
                negate: true,
                left,
                right,
            } => Ok(Self::Combinator {
                combinator: combinator.dual(),
                negate: false,
                left,
                right,
            }),
            operand => {
                UnaryOperator::Not.check(operand.supported_types())?;
                Ok(Self::Unary {
                    operator: UnaryOperator::Not,
                    operand: Box::new(operand),
                })
            }
        }
    }

    /// Apply a textual `!` prefix.
    ///
    /// On a combinator the prefix toggles the pair negation flag; anywhere else it negates.
    pub fn prefix_not(self) -> Result<Self, TypeError> {
        match self {
            Self::Combinator {
                combinator,
                negate,
                left,
                right,
            } => Ok(Self::Combinator {
                combinator,
                negate: !negate,
                left,
                right,
            }),
            operand => operand.not(),
        }
    }

    pub fn binary(operator: BinaryOperator, left: Expr, right: Expr) -> Result<Self, TypeError> {
        let operand_type = operator.check(left.supported_types(), right.supported_types())?;
        Ok(Self::Binary {
            operator,
            operand_type,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// The types this node can be evaluated as.
    pub fn supported_types(&self) -> TypeSet {
        match self {
            Self::Immediate(value) => value.supported_types(),
            Self::Property(property) => property.supported_types(),
            Self::Live(live) => live.supported_types(),
            Self::Combinator { .. } => TypeSet::BOOLEAN,
            Self::Unary { operator, .. } => operator.supported_types(),
            Self::Binary { operator, .. } => operator.supported_types(),
        }
    }

    /// Every live value in the tree, left to right.
    pub fn live_values(&self) -> Vec<&LiveValue> {
        let mut values = Vec::new();
        self.collect_live_values(&mut values);
        values
    }

    fn collect_live_values<'a>(&'a self, values: &mut Vec<&'a LiveValue>) {
        match self {
            Self::Immediate(_) | Self::Property(_) => {}
            Self::Live(live) => values.push(live),
            Self::Unary { operand, .. } => operand.collect_live_values(values),
            Self::Combinator { left, right, .. } | Self::Binary { left, right, .. } => {
                left.collect_live_values(values);
                right.collect_live_values(values);
            }
        }
    }

    /// A copy of the tree whose live values are new, inactive bindings.
    pub fn rebind(&self) -> Self {
        match self {
            Self::Immediate(_) | Self::Property(_) => self.clone(),
            Self::Live(live) => Self::Live(live.rebind()),
            Self::Combinator {
                combinator,
                negate,
                left,
                right,
            } => Self::Combinator {
                combinator: *combinator,
                negate: *negate,
                left: Box::new(left.rebind()),
                right: Box::new(right.rebind()),
            },
            Self::Unary { operator, operand } => Self::Unary {
                operator: *operator,
                operand: Box::new(operand.rebind()),
            },
            Self::Binary {
                operator,
                operand_type,
                left,
                right,
            } => Self::Binary {
                operator: *operator,
                operand_type: *operand_type,
                left: Box::new(left.rebind()),
                right: Box::new(right.rebind()),
            },
        }
    }

    fn fmt_operand(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Binary { .. } => write!(formatter, "({self})"),
            _ => write!(formatter, "{self}"),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Immediate(value) => write!(formatter, "{value}"),
            Self::Property(property) => write!(formatter, "{property}"),
            Self::Live(live) => write!(formatter, "{live}"),
            Self::Combinator {
                combinator,
                negate,
                left,
                right,
            } => {
                if *negate {
                    write!(formatter, "!")?;
                }
                write!(formatter, "({left} {combinator} {right})")
            }
            Self::Unary { operator, operand } => {
                write!(formatter, "{operator}")?;
                operand.fmt_operand(formatter)
            }
            Self::Binary {
                operator,
                left,
                right,
                ..
            } => {
                left.fmt_operand(formatter)?;
                write!(formatter, " {operator} ")?;
                right.fmt_operand(formatter)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::compile_predicate,
        live::AccountRef,
        status::Status,
        test_utils::ast::{and, binary, not, or, property},
    };

    fn retweet() -> Expr {
        property!(Retweet)
    }

    fn reply() -> Expr {
        binary!(InReplyTo, GreaterThan, Expr::numeric(0))
    }

    #[test]
    fn combinators_require_boolean_operands() {
        let combined = Expr::and(property!(Text), retweet());

        assert_eq!(
            Err(TypeError::Unresolvable {
                left: TypeSet::STRING,
                right: TypeSet::BOOLEAN,
                operator: TypeSet::BOOLEAN,
            }),
            combined
        );
    }

    #[test]
    fn not_rejects_non_boolean_operands() {
        let negated = property!(Id).not();

        assert_eq!(
            Err(TypeError::UnsupportedOperand {
                operator: "!",
                operand: TypeSet::NUMERIC,
                expected: TypeSet::BOOLEAN,
            }),
            negated
        );
    }

    #[test]
    fn not_applies_de_morgan_to_combinators() {
        let negated = and!(retweet(), reply()).not().unwrap();

        assert_eq!(
            Expr::combinator(Combinator::Or, true, retweet(), reply()).unwrap(),
            negated
        );
    }

    #[test]
    fn double_negation_of_a_combinator_restores_it() {
        let expression = or!(retweet(), reply());

        assert_eq!(expression, expression.clone().not().unwrap().not().unwrap());
    }

    #[test]
    fn prefix_not_toggles_the_pair_negation() {
        let negated = and!(retweet(), reply()).prefix_not().unwrap();

        assert_eq!(
            Expr::combinator(Combinator::And, true, retweet(), reply()).unwrap(),
            negated
        );
    }

    #[test]
    fn prefix_not_negates_anything_else() {
        assert_eq!(not!(retweet()), retweet().prefix_not().unwrap());
    }

    #[test]
    fn negated_and_rejects_when_either_operand_holds() {
        let expression = Expr::combinator(Combinator::And, true, retweet(), reply()).unwrap();
        let predicate = compile_predicate(&expression).unwrap();

        for (original, in_reply_to) in [(None, None), (Some(1), None), (None, Some(2)), (Some(1), Some(2))] {
            let mut builder = Status::builder(5, 1, "alice");
            if let Some(original) = original {
                builder = builder.with_original(original);
            }
            if let Some(in_reply_to) = in_reply_to {
                builder = builder.with_in_reply_to(in_reply_to);
            }
            let status = builder.build();

            assert_eq!(
                original.is_none() && in_reply_to.is_none(),
                predicate(&status),
                "original: {original:?}, in reply to: {in_reply_to:?}"
            );
        }
    }

    #[test]
    fn binary_records_the_resolved_operand_type() {
        let expression = Expr::binary(
            BinaryOperator::Equal,
            property!(User),
            Expr::live(LiveKind::SpecificAccount(AccountRef::ScreenName(
                "alice".to_owned(),
            ))),
        )
        .unwrap();

        assert!(matches!(
            expression,
            Expr::Binary {
                operand_type: FilterType::Numeric,
                ..
            }
        ));
        assert_eq!(TypeSet::BOOLEAN, expression.supported_types());
    }

    #[test]
    fn arithmetic_is_numeric() {
        let expression = binary!(Id, Add, Expr::numeric(1));

        assert_eq!(TypeSet::NUMERIC, expression.supported_types());
    }

    #[test]
    fn can_collect_live_values() {
        let expression = and!(
            Expr::binary(BinaryOperator::In, property!(User), Expr::live(LiveKind::AnyAccount))
                .unwrap(),
            not!(Expr::binary(
                BinaryOperator::Contain,
                property!(Mentions),
                Expr::live(LiveKind::SpecificAccount(AccountRef::Id(3)))
            )
            .unwrap())
        );

        let kinds: Vec<_> = expression
            .live_values()
            .into_iter()
            .map(|live| live.kind().clone())
            .collect();

        assert_eq!(
            vec![
                LiveKind::AnyAccount,
                LiveKind::SpecificAccount(AccountRef::Id(3))
            ],
            kinds
        );
    }

    #[test]
    fn rebound_trees_are_equal_and_keep_their_shape() {
        let expression = or!(
            not!(Expr::binary(BinaryOperator::In, property!(User), Expr::live(LiveKind::AnyAccount))
                .unwrap()),
            binary!(Id, GreaterThan, binary!(CreatedAt, Divide, Expr::numeric(2)))
        );

        let rebound = expression.rebind();

        assert_eq!(expression, rebound);
        assert_eq!(expression.to_string(), rebound.to_string());
        assert_eq!(1, rebound.live_values().len());
    }

    #[test]
    fn render_expressions() {
        let expression = and!(
            binary!(User, Equal, Expr::string("alice")),
            not!(retweet())
        );

        assert_eq!(r#"(user == "alice" && !retweet)"#, expression.to_string());
    }

    #[test]
    fn render_negated_pairs_with_a_leading_bang() {
        let expression = Expr::combinator(Combinator::Or, true, retweet(), reply()).unwrap();

        assert_eq!("!(retweet || in_reply_to > 0)", expression.to_string());
    }

    #[test]
    fn parenthesize_nested_operators() {
        let sum = binary!(Id, Add, Expr::numeric(1));
        let expression = Expr::binary(BinaryOperator::LessThan, sum.clone(), Expr::numeric(10)).unwrap();
        let negated = Expr::binary(BinaryOperator::Equal, property!(Retweet), Expr::boolean(false))
            .unwrap()
            .not()
            .unwrap();

        assert_eq!("(id + 1) < 10", expression.to_string());
        assert_eq!("!(retweet == false)", negated.to_string());
    }
}
