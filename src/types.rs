use crate::error::TypeError;
use std::fmt::{Display, Formatter};

/// The kind of value an expression node evaluates to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FilterType {
    /// Sentinel produced when resolution fails. Never the type of a checked node.
    Invalid,
    Boolean,
    Numeric,
    String,
    Set,
}

impl FilterType {
    /// Resolution priority. Saved queries depend on this exact order.
    pub const PRIORITY: [FilterType; 4] = [Self::Boolean, Self::Numeric, Self::String, Self::Set];

    #[inline]
    const fn bit(self) -> u8 {
        match self {
            Self::Invalid => 0,
            Self::Boolean => 1 << 0,
            Self::Numeric => 1 << 1,
            Self::String => 1 << 2,
            Self::Set => 1 << 3,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Invalid => "Invalid",
            Self::Boolean => "Boolean",
            Self::Numeric => "Numeric",
            Self::String => "String",
            Self::Set => "Set",
        }
    }
}

impl Display for FilterType {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        write!(formatter, "{}", self.name())
    }
}

/// A set of [`FilterType`]s a node can produce or an operator accepts.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct TypeSet(u8);

impl TypeSet {
    pub const EMPTY: TypeSet = TypeSet(0);
    pub const BOOLEAN: TypeSet = TypeSet::of(&[FilterType::Boolean]);
    pub const NUMERIC: TypeSet = TypeSet::of(&[FilterType::Numeric]);
    pub const STRING: TypeSet = TypeSet::of(&[FilterType::String]);
    pub const SET: TypeSet = TypeSet::of(&[FilterType::Set]);

    pub const fn of(types: &[FilterType]) -> Self {
        let mut bits = 0u8;
        let mut i = 0;
        while i < types.len() {
            bits |= types[i].bit();
            i += 1;
        }
        Self(bits)
    }

    #[inline]
    pub const fn contains(self, value: FilterType) -> bool {
        let bit = value.bit();
        bit != 0 && self.0 & bit == bit
    }

    #[inline]
    pub const fn intersection(self, other: TypeSet) -> TypeSet {
        TypeSet(self.0 & other.0)
    }

    #[inline]
    pub const fn union(self, other: TypeSet) -> TypeSet {
        TypeSet(self.0 | other.0)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The members of the set, in resolution priority order.
    pub fn iter(self) -> impl Iterator<Item = FilterType> {
        FilterType::PRIORITY
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }

    /// First type in priority order present in the set, [`FilterType::Invalid`] otherwise.
    #[inline]
    pub fn first(self) -> FilterType {
        self.iter().next().unwrap_or(FilterType::Invalid)
    }
}

impl Display for TypeSet {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        write!(formatter, "[")?;
        for (i, kind) in self.iter().enumerate() {
            if i > 0 {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{kind}")?;
        }
        write!(formatter, "]")
    }
}

impl std::fmt::Debug for TypeSet {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        write!(formatter, "TypeSet{self}")
    }
}

impl FromIterator<FilterType> for TypeSet {
    fn from_iter<I: IntoIterator<Item = FilterType>>(iter: I) -> Self {
        iter.into_iter()
            .fold(TypeSet::EMPTY, |set, kind| TypeSet(set.0 | kind.bit()))
    }
}

/// Pick the single type satisfying both operands and the operator.
///
/// The three sets are intersected and the first member in [`FilterType::PRIORITY`] order
/// wins, so `Boolean` beats `Numeric` beats `String` beats `Set`.
///
/// # Examples
///
/// ```rust
/// use status_filter::{resolve, FilterType, TypeSet};
///
/// let operator = TypeSet::of(&[FilterType::Numeric, FilterType::Set]);
/// let left = TypeSet::NUMERIC;
/// let right = TypeSet::of(&[FilterType::Numeric, FilterType::Set]);
/// assert_eq!(Ok(FilterType::Numeric), resolve(left, right, operator));
///
/// assert!(resolve(TypeSet::NUMERIC, TypeSet::STRING, TypeSet::BOOLEAN).is_err());
/// ```
pub fn resolve(left: TypeSet, right: TypeSet, operator: TypeSet) -> Result<FilterType, TypeError> {
    match left.intersection(right).intersection(operator).first() {
        FilterType::Invalid => Err(TypeError::Unresolvable {
            left,
            right,
            operator,
        }),
        resolved => Ok(resolved),
    }
}
