//! Bind values and database instructions.
//!
//! Every argument that reaches a statement is a [`Value`]. Values compare by
//! equality so a [`StatementBuilder`](crate::stmt::StatementBuilder) can hand
//! out one placeholder per distinct value. An [`Instruction`] is rendered
//! literally (`NOW()`, `NULL`, `DEFAULT`) and never becomes a parameter.

use bytes::BytesMut;
use chrono::{DateTime, Utc};
use std::error::Error;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use uuid::Uuid;

/// A bindable statement argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    TextArray(Vec<String>),
    IntArray(Vec<i32>),
    BigIntArray(Vec<i64>),
}

impl Value {
    /// Short name of the variant, used in decode error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::SmallInt(_) => "smallint",
            Value::Int(_) => "integer",
            Value::BigInt(_) => "bigint",
            Value::Double(_) => "double precision",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytea",
            Value::Json(_) => "jsonb",
            Value::Timestamp(_) => "timestamptz",
            Value::Uuid(_) => "uuid",
            Value::TextArray(_) => "text[]",
            Value::IntArray(_) => "integer[]",
            Value::BigIntArray(_) => "bigint[]",
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Bool(v) => v.to_sql_checked(ty, out),
            Value::SmallInt(v) => v.to_sql_checked(ty, out),
            Value::Int(v) => v.to_sql_checked(ty, out),
            Value::BigInt(v) => v.to_sql_checked(ty, out),
            Value::Double(v) => v.to_sql_checked(ty, out),
            Value::Text(v) => v.to_sql_checked(ty, out),
            Value::Bytes(v) => v.to_sql_checked(ty, out),
            Value::Json(v) => v.to_sql_checked(ty, out),
            Value::Timestamp(v) => v.to_sql_checked(ty, out),
            Value::Uuid(v) => v.to_sql_checked(ty, out),
            Value::TextArray(v) => v.to_sql_checked(ty, out),
            Value::IntArray(v) => v.to_sql_checked(ty, out),
            Value::BigIntArray(v) => v.to_sql_checked(ty, out),
        }
    }

    // The wrapped value performs the real type check in `to_sql`.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// A database instruction rendered as literal SQL instead of a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// `NOW()`
    Now,
    /// `NULL`
    Null,
    /// `DEFAULT`
    Default,
}

impl Instruction {
    /// The literal SQL for this instruction.
    pub const fn as_sql(self) -> &'static str {
        match self {
            Instruction::Now => "NOW()",
            Instruction::Null => "NULL",
            Instruction::Default => "DEFAULT",
        }
    }
}

/// Either a bound value or a literal instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(Value),
    Instruction(Instruction),
}

/// Conversion into a statement argument.
///
/// `None` converts to [`Instruction::Null`].
pub trait IntoArg {
    fn into_arg(self) -> Arg;
}

impl IntoArg for Arg {
    fn into_arg(self) -> Arg {
        self
    }
}

impl IntoArg for Value {
    fn into_arg(self) -> Arg {
        Arg::Value(self)
    }
}

impl IntoArg for Instruction {
    fn into_arg(self) -> Arg {
        Arg::Instruction(self)
    }
}

impl<T: IntoArg> IntoArg for Option<T> {
    fn into_arg(self) -> Arg {
        match self {
            Some(v) => v.into_arg(),
            None => Arg::Instruction(Instruction::Null),
        }
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }

            impl IntoArg for $ty {
                fn into_arg(self) -> Arg {
                    Arg::Value(Value::from(self))
                }
            }
        )*
    };
}

impl_value_from! {
    bool => Bool,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    f64 => Double,
    String => Text,
    &str => Text,
    &String => Text,
    Vec<u8> => Bytes,
    serde_json::Value => Json,
    DateTime<Utc> => Timestamp,
    Uuid => Uuid,
    Vec<String> => TextArray,
    Vec<i32> => IntArray,
    Vec<i64> => BigIntArray,
}

impl From<Vec<&str>> for Value {
    fn from(v: Vec<&str>) -> Self {
        Value::TextArray(v.into_iter().map(str::to_string).collect())
    }
}

/// Values a text condition may compare against.
pub trait TextValue: Into<Value> {}

impl TextValue for String {}
impl TextValue for &str {}
impl TextValue for &String {}

/// Ordered, comparable values a number condition may compare against.
///
/// Timestamps are ordered as well, so they share the number operators.
pub trait NumberValue: Into<Value> + PartialOrd {}

impl NumberValue for i16 {}
impl NumberValue for i32 {}
impl NumberValue for i64 {}
impl NumberValue for f64 {}
impl NumberValue for DateTime<Utc> {}

/// Element types that bind as a PostgreSQL array.
pub trait ListValue: Sized {
    fn into_list_value(values: Vec<Self>) -> Value;
}

impl ListValue for String {
    fn into_list_value(values: Vec<Self>) -> Value {
        Value::TextArray(values)
    }
}

impl ListValue for &str {
    fn into_list_value(values: Vec<Self>) -> Value {
        Value::from(values)
    }
}

impl ListValue for i64 {
    fn into_list_value(values: Vec<Self>) -> Value {
        Value::BigIntArray(values)
    }
}

impl ListValue for i32 {
    fn into_list_value(values: Vec<Self>) -> Value {
        Value::IntArray(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_becomes_null_instruction() {
        assert_eq!(
            Option::<String>::None.into_arg(),
            Arg::Instruction(Instruction::Null)
        );
        assert_eq!(
            Some("a").into_arg(),
            Arg::Value(Value::Text("a".to_string()))
        );
    }

    #[test]
    fn text_values_compare_by_content() {
        assert_eq!(Value::from("alice"), Value::from("alice".to_string()));
        assert_ne!(Value::from("alice"), Value::from("bob"));
    }

    #[test]
    fn list_values_bind_as_arrays() {
        assert_eq!(
            <&str as ListValue>::into_list_value(vec!["a", "b"]),
            Value::TextArray(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(
            <i32 as ListValue>::into_list_value(vec![1, 2]),
            Value::IntArray(vec![1, 2])
        );
    }

    #[test]
    fn integer_lists_bind_to_int4_arrays() {
        let mut out = BytesMut::new();
        let ints = <i32 as ListValue>::into_list_value(vec![1, 2]);
        assert!(ints.to_sql_checked(&Type::INT4_ARRAY, &mut out).is_ok());
        assert!(ints.to_sql_checked(&Type::INT8_ARRAY, &mut out).is_err());

        let bigints = <i64 as ListValue>::into_list_value(vec![1, 2]);
        assert!(bigints.to_sql_checked(&Type::INT8_ARRAY, &mut out).is_ok());
    }

    #[test]
    fn instructions_render_literally() {
        assert_eq!(Instruction::Now.as_sql(), "NOW()");
        assert_eq!(Instruction::Null.as_sql(), "NULL");
        assert_eq!(Instruction::Default.as_sql(), "DEFAULT");
    }

    #[test]
    fn value_accepts_any_type_and_defers_check() {
        let mut out = BytesMut::new();
        assert!(Value::BigInt(7).to_sql_checked(&Type::INT8, &mut out).is_ok());
        assert!(Value::BigInt(7).to_sql_checked(&Type::TEXT, &mut out).is_err());
    }
}
