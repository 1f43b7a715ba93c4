//! Row mapping traits and utilities
//!
//! Executors return [`Record`]s: ordered column names plus nullable [`Value`]s.
//! Entities decode from a record through [`FromRecord`], one column at a time
//! through [`FromValue`].

use crate::error::{DbError, DbResult};
use crate::value::Value;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::sync::Arc;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type};
use uuid::Uuid;

/// A decoded result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Arc<[String]>,
    values: Vec<Option<Value>>,
}

impl Record {
    /// Create a record from column names and their values.
    ///
    /// Both lists must have the same length.
    pub fn new(columns: impl Into<Arc<[String]>>, values: Vec<Option<Value>>) -> DbResult<Self> {
        let columns = columns.into();
        if columns.len() != values.len() {
            return Err(DbError::validation(format!(
                "record has {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        Ok(Self { columns, values })
    }

    /// Build a record from `(column, value)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Option<Value>)>) -> Self {
        let (columns, values): (Vec<String>, Vec<Option<Value>>) = pairs
            .into_iter()
            .map(|(column, value)| (column.to_string(), value))
            .unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    /// Convert a tokio-postgres row.
    pub fn from_pg_row(row: &Row) -> DbResult<Self> {
        let mut columns = Vec::with_capacity(row.len());
        let mut values = Vec::with_capacity(row.len());
        for (idx, column) in row.columns().iter().enumerate() {
            values.push(read_pg_value(row, idx, column.name(), column.type_())?);
            columns.push(column.name().to_string());
        }
        Ok(Self {
            columns: columns.into(),
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The raw value at `idx`. `None` for NULL or an out of range index.
    pub fn value(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx).and_then(Option::as_ref)
    }

    /// Decode the value at `idx`.
    pub fn try_get<T: FromValue>(&self, idx: usize) -> DbResult<T> {
        let Some(value) = self.values.get(idx) else {
            return Err(DbError::decode(
                idx.to_string(),
                format!("column index out of range (record has {})", self.len()),
            ));
        };
        T::from_value(&self.columns[idx], value.as_ref())
    }

    /// Decode the value of the column called `name`.
    pub fn try_get_named<T: FromValue>(&self, name: &str) -> DbResult<T> {
        let Some(idx) = self.columns.iter().position(|c| c == name) else {
            return Err(DbError::decode(name, "column not found in record"));
        };
        T::from_value(name, self.values[idx].as_ref())
    }
}

fn read<'a, T: FromSql<'a>>(row: &'a Row, idx: usize, name: &str) -> DbResult<Option<T>> {
    row.try_get::<_, Option<T>>(idx)
        .map_err(|e| DbError::decode(name, e.to_string()))
}

fn read_pg_value(row: &Row, idx: usize, name: &str, ty: &Type) -> DbResult<Option<Value>> {
    let value = if *ty == Type::BOOL {
        read::<bool>(row, idx, name)?.map(Value::Bool)
    } else if *ty == Type::INT2 {
        read::<i16>(row, idx, name)?.map(Value::SmallInt)
    } else if *ty == Type::INT4 {
        read::<i32>(row, idx, name)?.map(Value::Int)
    } else if *ty == Type::INT8 {
        read::<i64>(row, idx, name)?.map(Value::BigInt)
    } else if *ty == Type::FLOAT4 {
        read::<f32>(row, idx, name)?.map(|v| Value::Double(v.into()))
    } else if *ty == Type::FLOAT8 {
        read::<f64>(row, idx, name)?.map(Value::Double)
    } else if [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME].contains(ty) {
        read::<String>(row, idx, name)?.map(Value::Text)
    } else if *ty == Type::BYTEA {
        read::<Vec<u8>>(row, idx, name)?.map(Value::Bytes)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        read::<serde_json::Value>(row, idx, name)?.map(Value::Json)
    } else if *ty == Type::TIMESTAMPTZ {
        read::<DateTime<Utc>>(row, idx, name)?.map(Value::Timestamp)
    } else if *ty == Type::TIMESTAMP {
        read::<NaiveDateTime>(row, idx, name)?.map(|v| Value::Timestamp(v.and_utc()))
    } else if *ty == Type::UUID {
        read::<Uuid>(row, idx, name)?.map(Value::Uuid)
    } else if *ty == Type::TEXT_ARRAY || *ty == Type::VARCHAR_ARRAY {
        read::<Vec<String>>(row, idx, name)?.map(Value::TextArray)
    } else if *ty == Type::INT8_ARRAY {
        read::<Vec<i64>>(row, idx, name)?.map(Value::BigIntArray)
    } else if *ty == Type::INT4_ARRAY {
        read::<Vec<i32>>(row, idx, name)?.map(Value::IntArray)
    } else {
        return Err(DbError::decode(
            name,
            format!("unsupported column type {}", ty.name()),
        ));
    };
    Ok(value)
}

/// Decode a single column value.
pub trait FromValue: Sized {
    /// `value` is `None` for SQL NULL.
    fn from_value(column: &str, value: Option<&Value>) -> DbResult<Self>;
}

/// Decode an entity from a record.
pub trait FromRecord: Sized {
    fn from_record(record: &Record) -> DbResult<Self>;
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(column: &str, value: Option<&Value>) -> DbResult<Self> {
        match value {
            None => Ok(None),
            Some(v) => T::from_value(column, Some(v)).map(Some),
        }
    }
}

fn mismatch(column: &str, expected: &str, got: Option<&Value>) -> DbError {
    match got {
        None => DbError::decode(column, format!("unexpected NULL, expected {expected}")),
        Some(v) => DbError::decode(column, format!("expected {expected}, got {}", v.kind())),
    }
}

macro_rules! impl_from_value {
    ($ty:ty, $expected:literal, $($pat:pat => $out:expr),+ $(,)?) => {
        impl FromValue for $ty {
            fn from_value(column: &str, value: Option<&Value>) -> DbResult<Self> {
                match value {
                    $(Some($pat) => Ok($out),)+
                    other => Err(mismatch(column, $expected, other)),
                }
            }
        }
    };
}

impl_from_value!(bool, "bool", Value::Bool(v) => *v);
impl_from_value!(i16, "smallint", Value::SmallInt(v) => *v);
impl_from_value!(i32, "integer",
    Value::Int(v) => *v,
    Value::SmallInt(v) => i32::from(*v),
);
impl_from_value!(i64, "bigint",
    Value::BigInt(v) => *v,
    Value::Int(v) => i64::from(*v),
    Value::SmallInt(v) => i64::from(*v),
);
impl_from_value!(f64, "double precision", Value::Double(v) => *v);
impl_from_value!(String, "text", Value::Text(v) => v.clone());
impl_from_value!(Vec<u8>, "bytea", Value::Bytes(v) => v.clone());
impl_from_value!(serde_json::Value, "jsonb", Value::Json(v) => v.clone());
impl_from_value!(DateTime<Utc>, "timestamptz", Value::Timestamp(v) => *v);
impl_from_value!(Uuid, "uuid", Value::Uuid(v) => *v);
impl_from_value!(Vec<String>, "text[]", Value::TextArray(v) => v.clone());
impl_from_value!(Vec<i32>, "integer[]", Value::IntArray(v) => v.clone());
impl_from_value!(Vec<i64>, "bigint[]",
    Value::BigIntArray(v) => v.clone(),
    Value::IntArray(v) => v.iter().copied().map(i64::from).collect(),
);
