//! Operators per value kind.
//!
//! Each kind only exposes the operators that make sense for it, so a text
//! column cannot be compared with `&&` and a list cannot be prefix-matched.

/// Operators for text columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextOperator {
    Equal,
    EqualIgnoreCase,
    NotEqual,
    NotEqualIgnoreCase,
    StartsWith,
    StartsWithIgnoreCase,
}

impl TextOperator {
    pub const fn as_sql(self) -> &'static str {
        match self {
            TextOperator::Equal | TextOperator::EqualIgnoreCase => "=",
            TextOperator::NotEqual | TextOperator::NotEqualIgnoreCase => "<>",
            TextOperator::StartsWith | TextOperator::StartsWithIgnoreCase => "LIKE",
        }
    }

    pub const fn ignores_case(self) -> bool {
        matches!(
            self,
            TextOperator::EqualIgnoreCase
                | TextOperator::NotEqualIgnoreCase
                | TextOperator::StartsWithIgnoreCase
        )
    }

    pub const fn is_prefix_match(self) -> bool {
        matches!(
            self,
            TextOperator::StartsWith | TextOperator::StartsWithIgnoreCase
        )
    }
}

/// Operators for ordered values (numbers and timestamps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberOperator {
    Equal,
    NotEqual,
    LessThan,
    AtMost,
    GreaterThan,
    AtLeast,
}

impl NumberOperator {
    pub const fn as_sql(self) -> &'static str {
        match self {
            NumberOperator::Equal => "=",
            NumberOperator::NotEqual => "<>",
            NumberOperator::LessThan => "<",
            NumberOperator::AtMost => "<=",
            NumberOperator::GreaterThan => ">",
            NumberOperator::AtLeast => ">=",
        }
    }
}

/// Operators for array columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListOperator {
    Equal,
    NotEqual,
    /// The column shares at least one element with the value.
    ContainsAny,
    /// The column contains every element of the value.
    ContainsAll,
    /// Every element of the column is in the value.
    ContainedBy,
    NotContainsAny,
    NotContainsAll,
}

impl ListOperator {
    pub const fn as_sql(self) -> &'static str {
        match self {
            ListOperator::Equal => "=",
            ListOperator::NotEqual => "<>",
            ListOperator::ContainsAny | ListOperator::NotContainsAny => "&&",
            ListOperator::ContainsAll | ListOperator::NotContainsAll => "@>",
            ListOperator::ContainedBy => "<@",
        }
    }

    /// Negated operators render as `NOT (<column> <op> <value>)`.
    pub const fn is_negated(self) -> bool {
        matches!(
            self,
            ListOperator::NotContainsAny | ListOperator::NotContainsAll
        )
    }
}

/// Operators for boolean columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanOperator {
    IsTrue,
    IsFalse,
}

impl BooleanOperator {
    pub const fn as_sql(self) -> &'static str {
        match self {
            BooleanOperator::IsTrue => "IS TRUE",
            BooleanOperator::IsFalse => "IS FALSE",
        }
    }
}

impl From<bool> for BooleanOperator {
    fn from(value: bool) -> Self {
        if value {
            BooleanOperator::IsTrue
        } else {
            BooleanOperator::IsFalse
        }
    }
}
