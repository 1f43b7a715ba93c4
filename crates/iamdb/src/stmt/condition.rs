//! Query condition tree for WHERE clauses.
//!
//! Conditions are immutable values. Rendering is infallible: every operator
//! maps to SQL through an exhaustive `match`.
//!
//! # Example
//! ```ignore
//! use iamdb::stmt::{Column, Condition};
//!
//! let username = Column::new("users", "username").with_lower_twin();
//! let instance = Column::new("users", "instance_id");
//!
//! let cond = Condition::and(vec![
//!     Condition::equal(&instance, "i1"),
//!     Condition::equal_ignore_case(&username, "Alice"),
//! ]);
//! // (users.instance_id = $1 AND users.username_lower = LOWER($2))
//! ```

use crate::stmt::{
    BooleanOperator, Column, ListOperator, NumberOperator, StatementBuilder, TextOperator,
};
use crate::value::{ListValue, NumberValue, TextValue, Value};

/// A composable WHERE predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition(ConditionInner);

#[derive(Debug, Clone, PartialEq)]
enum ConditionInner {
    Text {
        column: Column,
        op: TextOperator,
        value: Value,
    },
    /// Scalar comparison; also used for equality on any value kind.
    Compare {
        column: Column,
        op: NumberOperator,
        value: Value,
    },
    List {
        column: Column,
        op: ListOperator,
        value: Value,
    },
    Boolean {
        column: Column,
        op: BooleanOperator,
    },
    Null {
        column: Column,
        negated: bool,
    },
    AnyOf {
        column: Column,
        values: Value,
    },
    ColumnsEqual {
        left: Column,
        right: Column,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

impl Condition {
    // ==================== Operator forms ====================

    pub fn text(column: &Column, op: TextOperator, value: impl TextValue) -> Self {
        Self(ConditionInner::Text {
            column: column.clone(),
            op,
            value: value.into(),
        })
    }

    pub fn number(column: &Column, op: NumberOperator, value: impl NumberValue) -> Self {
        Self::compare(column, op, value.into())
    }

    pub fn list<T: ListValue>(column: &Column, op: ListOperator, values: Vec<T>) -> Self {
        Self(ConditionInner::List {
            column: column.clone(),
            op,
            value: T::into_list_value(values),
        })
    }

    pub fn boolean(column: &Column, op: BooleanOperator) -> Self {
        Self(ConditionInner::Boolean {
            column: column.clone(),
            op,
        })
    }

    fn compare(column: &Column, op: NumberOperator, value: Value) -> Self {
        Self(ConditionInner::Compare {
            column: column.clone(),
            op,
            value,
        })
    }

    // ==================== Any scalar ====================

    /// `column = value`
    pub fn equal(column: &Column, value: impl Into<Value>) -> Self {
        Self::compare(column, NumberOperator::Equal, value.into())
    }

    /// `column <> value`
    pub fn not_equal(column: &Column, value: impl Into<Value>) -> Self {
        Self::compare(column, NumberOperator::NotEqual, value.into())
    }

    // ==================== Ordered ====================

    pub fn less_than(column: &Column, value: impl NumberValue) -> Self {
        Self::number(column, NumberOperator::LessThan, value)
    }

    pub fn at_most(column: &Column, value: impl NumberValue) -> Self {
        Self::number(column, NumberOperator::AtMost, value)
    }

    pub fn greater_than(column: &Column, value: impl NumberValue) -> Self {
        Self::number(column, NumberOperator::GreaterThan, value)
    }

    pub fn at_least(column: &Column, value: impl NumberValue) -> Self {
        Self::number(column, NumberOperator::AtLeast, value)
    }

    // ==================== Text ====================

    pub fn equal_ignore_case(column: &Column, value: impl TextValue) -> Self {
        Self::text(column, TextOperator::EqualIgnoreCase, value)
    }

    pub fn not_equal_ignore_case(column: &Column, value: impl TextValue) -> Self {
        Self::text(column, TextOperator::NotEqualIgnoreCase, value)
    }

    /// `column LIKE $n || '%'`
    pub fn starts_with(column: &Column, prefix: impl TextValue) -> Self {
        Self::text(column, TextOperator::StartsWith, prefix)
    }

    pub fn starts_with_ignore_case(column: &Column, prefix: impl TextValue) -> Self {
        Self::text(column, TextOperator::StartsWithIgnoreCase, prefix)
    }

    // ==================== Lists ====================

    pub fn list_equal<T: ListValue>(column: &Column, values: Vec<T>) -> Self {
        Self::list(column, ListOperator::Equal, values)
    }

    pub fn list_not_equal<T: ListValue>(column: &Column, values: Vec<T>) -> Self {
        Self::list(column, ListOperator::NotEqual, values)
    }

    pub fn contains_any<T: ListValue>(column: &Column, values: Vec<T>) -> Self {
        Self::list(column, ListOperator::ContainsAny, values)
    }

    pub fn contains_all<T: ListValue>(column: &Column, values: Vec<T>) -> Self {
        Self::list(column, ListOperator::ContainsAll, values)
    }

    pub fn contained_by<T: ListValue>(column: &Column, values: Vec<T>) -> Self {
        Self::list(column, ListOperator::ContainedBy, values)
    }

    pub fn not_contains_any<T: ListValue>(column: &Column, values: Vec<T>) -> Self {
        Self::list(column, ListOperator::NotContainsAny, values)
    }

    pub fn not_contains_all<T: ListValue>(column: &Column, values: Vec<T>) -> Self {
        Self::list(column, ListOperator::NotContainsAll, values)
    }

    /// `column = ANY($n)`
    pub fn in_list<T: ListValue>(column: &Column, values: Vec<T>) -> Self {
        Self(ConditionInner::AnyOf {
            column: column.clone(),
            values: T::into_list_value(values),
        })
    }

    // ==================== Boolean / NULL ====================

    pub fn is_true(column: &Column) -> Self {
        Self::boolean(column, BooleanOperator::IsTrue)
    }

    pub fn is_false(column: &Column) -> Self {
        Self::boolean(column, BooleanOperator::IsFalse)
    }

    pub fn is_null(column: &Column) -> Self {
        Self(ConditionInner::Null {
            column: column.clone(),
            negated: false,
        })
    }

    pub fn is_not_null(column: &Column) -> Self {
        Self(ConditionInner::Null {
            column: column.clone(),
            negated: true,
        })
    }

    // ==================== Structure ====================

    /// `left = right`, both qualified.
    pub fn columns_equal(left: &Column, right: &Column) -> Self {
        Self(ConditionInner::ColumnsEqual {
            left: left.clone(),
            right: right.clone(),
        })
    }

    pub fn and(conditions: Vec<Condition>) -> Self {
        Self(ConditionInner::And(conditions))
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Self(ConditionInner::Or(conditions))
    }

    /// `true` if the condition renders no SQL.
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            ConditionInner::And(children) | ConditionInner::Or(children) => {
                children.iter().all(Condition::is_empty)
            }
            _ => false,
        }
    }

    /// Whether every row matched by this condition has a fixed value in `column`.
    ///
    /// True for an equality or membership test on `column`, an `AND` with any
    /// restricting child, and a non-empty `OR` whose children all restrict.
    pub fn is_restricting_column(&self, column: &Column) -> bool {
        match &self.0 {
            ConditionInner::Compare {
                column: c,
                op: NumberOperator::Equal,
                ..
            }
            | ConditionInner::Text {
                column: c,
                op: TextOperator::Equal,
                ..
            }
            | ConditionInner::AnyOf { column: c, .. } => c == column,
            ConditionInner::And(children) => {
                children.iter().any(|c| c.is_restricting_column(column))
            }
            ConditionInner::Or(children) => {
                let mut children = children.iter().filter(|c| !c.is_empty()).peekable();
                children.peek().is_some() && children.all(|c| c.is_restricting_column(column))
            }
            _ => false,
        }
    }

    /// Render into `builder`.
    pub fn write(&self, builder: &mut StatementBuilder) {
        match &self.0 {
            ConditionInner::Text { column, op, value } => {
                let placeholder = builder.append_arg(value.clone());
                if op.ignores_case() {
                    column.write_lower(builder);
                    builder
                        .push_char(' ')
                        .push(op.as_sql())
                        .push(" LOWER(")
                        .push(&placeholder)
                        .push_char(')');
                } else {
                    column.write_qualified(builder);
                    builder.push_char(' ').push(op.as_sql()).push_char(' ').push(&placeholder);
                }
                if op.is_prefix_match() {
                    builder.push(" || '%'");
                }
            }
            ConditionInner::Compare { column, op, value } => {
                column.write_qualified(builder);
                builder.push_char(' ').push(op.as_sql()).push_char(' ');
                builder.push_arg(value.clone());
            }
            ConditionInner::List { column, op, value } => {
                if op.is_negated() {
                    builder.push("NOT (");
                }
                column.write_qualified(builder);
                builder.push_char(' ').push(op.as_sql()).push_char(' ');
                builder.push_arg(value.clone());
                if op.is_negated() {
                    builder.push_char(')');
                }
            }
            ConditionInner::Boolean { column, op } => {
                column.write_qualified(builder);
                builder.push_char(' ').push(op.as_sql());
            }
            ConditionInner::Null { column, negated } => {
                column.write_qualified(builder);
                builder.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            ConditionInner::AnyOf { column, values } => {
                column.write_qualified(builder);
                builder.push(" = ANY(");
                builder.push_arg(values.clone());
                builder.push_char(')');
            }
            ConditionInner::ColumnsEqual { left, right } => {
                left.write_qualified(builder);
                builder.push(" = ");
                right.write_qualified(builder);
            }
            ConditionInner::And(children) => write_group(builder, children, " AND "),
            ConditionInner::Or(children) => write_group(builder, children, " OR "),
        }
    }

    /// Render on a fresh builder; returns the SQL and its arguments.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut builder = StatementBuilder::empty();
        self.write(&mut builder);
        builder.into_parts()
    }
}

fn write_group(builder: &mut StatementBuilder, children: &[Condition], separator: &str) {
    let children: Vec<&Condition> = children.iter().filter(|c| !c.is_empty()).collect();
    match children.as_slice() {
        [] => {}
        [only] => only.write(builder),
        many => {
            builder.push_char('(');
            for (i, child) in many.iter().enumerate() {
                if i > 0 {
                    builder.push(separator);
                }
                child.write(builder);
            }
            builder.push_char(')');
        }
    }
}
