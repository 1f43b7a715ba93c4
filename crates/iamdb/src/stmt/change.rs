//! SET clause encoding.
//!
//! A [`Change`] is one assignment (or a batch of them). JSON columns are
//! patched through [`JsonChange`]: each operation wraps the expression built
//! so far, so the first operation appended ends up innermost.
//!
//! ```text
//! metadata = jsonb_set_lax(jsonb_set_lax(users.metadata, '{a}', $1, true, 'delete_key'), '{b}', $2, true, 'delete_key')
//! ```
//!
//! Writes to other tables travel along as [`CteStatement`]s. They assign
//! nothing themselves; the statement owning the SET clause renders them as
//! common table expressions ahead of the `UPDATE`.

use crate::error::{DbError, DbResult};
use crate::stmt::{Column, StatementBuilder};
use crate::value::{Arg, Instruction, IntoArg, Value};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A path into a JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JsonPath(Vec<String>);

impl JsonPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The path as a quoted `text[]` literal, e.g. `'{a,"b c"}'`.
    fn write_literal(&self, builder: &mut StatementBuilder) {
        let mut literal = String::from("{");
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                literal.push(',');
            }
            if needs_array_quoting(segment) {
                literal.push('"');
                for c in segment.chars() {
                    if c == '"' || c == '\\' {
                        literal.push('\\');
                    }
                    literal.push(c);
                }
                literal.push('"');
            } else {
                literal.push_str(segment);
            }
        }
        literal.push('}');
        builder
            .push_char('\'')
            .push(&literal.replace('\'', "''"))
            .push_char('\'');
    }
}

fn needs_array_quoting(segment: &str) -> bool {
    segment.is_empty()
        || segment.eq_ignore_ascii_case("null")
        || segment
            .chars()
            .any(|c| matches!(c, '{' | '}' | ',' | '"' | '\\') || c.is_whitespace())
}

impl From<&str> for JsonPath {
    fn from(segment: &str) -> Self {
        Self(vec![segment.to_string()])
    }
}

impl From<String> for JsonPath {
    fn from(segment: String) -> Self {
        Self(vec![segment])
    }
}

impl From<Vec<String>> for JsonPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<&[&str]> for JsonPath {
    fn from(segments: &[&str]) -> Self {
        Self::new(segments.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for JsonPath {
    fn from(segments: [&str; N]) -> Self {
        Self::new(segments)
    }
}

/// Encoded payload, or the encoding error reported at render time.
type Encoded<T> = Result<T, String>;

#[derive(Debug, Clone, PartialEq)]
enum JsonOp {
    SetField {
        path: JsonPath,
        value: Encoded<serde_json::Value>,
    },
    ArrayAppend {
        path: JsonPath,
        value: Encoded<String>,
    },
    ArrayRemove {
        path: JsonPath,
        value: Encoded<String>,
    },
}

impl JsonOp {
    fn is_array_op(&self) -> bool {
        !matches!(self, JsonOp::SetField { .. })
    }

    fn check_encoded(&self) -> DbResult<()> {
        let (path, err) = match self {
            JsonOp::SetField {
                path,
                value: Err(err),
            }
            | JsonOp::ArrayAppend {
                path,
                value: Err(err),
            }
            | JsonOp::ArrayRemove {
                path,
                value: Err(err),
            } => (path, err),
            _ => return Ok(()),
        };
        Err(DbError::Serialization(format!(
            "value at JSON path {:?}: {err}",
            path.segments()
        )))
    }

    fn function(&self) -> &'static str {
        match self {
            JsonOp::SetField { .. } => "jsonb_set_lax(",
            JsonOp::ArrayAppend { .. } => "zitadel.jsonb_array_append(",
            JsonOp::ArrayRemove { .. } => "zitadel.jsonb_array_remove(",
        }
    }

    /// Everything after the wrapped expression, closing parenthesis included.
    fn write_arguments(&self, builder: &mut StatementBuilder) -> DbResult<()> {
        self.check_encoded()?;
        match self {
            JsonOp::SetField { path, value } => {
                builder.push(", ");
                path.write_literal(builder);
                builder.push(", ");
                match value {
                    Ok(serde_json::Value::Null) => {
                        builder.push_arg(Instruction::Null);
                    }
                    Ok(v) => {
                        builder.push_arg(Value::Json(v.clone()));
                    }
                    Err(_) => {}
                }
                builder.push(", true, 'delete_key')");
            }
            JsonOp::ArrayAppend { path, value } | JsonOp::ArrayRemove { path, value } => {
                builder.push(", ");
                builder.push_arg(Value::TextArray(path.segments().to_vec()));
                builder.push(", ");
                if let Ok(text) = value {
                    builder.push_arg(Value::Text(text.clone()));
                }
                builder.push("::TEXT)");
            }
        }
        Ok(())
    }
}

fn encode_value<T: Serialize + ?Sized>(value: &T) -> Encoded<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

fn encode_text<T: Serialize + ?Sized>(value: &T) -> Encoded<String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

/// A chain of patch operations on one JSON column.
///
/// Field operations and array operations cannot be mixed in one chain.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonChange {
    column: Column,
    ops: Vec<JsonOp>,
}

impl JsonChange {
    pub fn new(column: &Column) -> Self {
        Self {
            column: column.clone(),
            ops: Vec::new(),
        }
    }

    /// Replace the value at `path`. A JSON `null` payload removes the key.
    pub fn set_field<T: Serialize + ?Sized>(mut self, path: impl Into<JsonPath>, value: &T) -> Self {
        self.ops.push(JsonOp::SetField {
            path: path.into(),
            value: encode_value(value),
        });
        self
    }

    /// Remove the key at `path`.
    pub fn remove_field(mut self, path: impl Into<JsonPath>) -> Self {
        self.ops.push(JsonOp::SetField {
            path: path.into(),
            value: Ok(serde_json::Value::Null),
        });
        self
    }

    /// Append `value` to the array at `path`.
    pub fn array_append<T: Serialize + ?Sized>(mut self, path: impl Into<JsonPath>, value: &T) -> Self {
        self.ops.push(JsonOp::ArrayAppend {
            path: path.into(),
            value: encode_text(value),
        });
        self
    }

    /// Remove `value` from the array at `path`.
    pub fn array_remove<T: Serialize + ?Sized>(mut self, path: impl Into<JsonPath>, value: &T) -> Self {
        self.ops.push(JsonOp::ArrayRemove {
            path: path.into(),
            value: encode_text(value),
        });
        self
    }

    pub fn column(&self) -> &Column {
        &self.column
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl From<JsonChange> for Change {
    fn from(change: JsonChange) -> Self {
        Self(ChangeInner::Json(change))
    }
}

/// A data-modifying statement rendered as a common table expression.
///
/// `source` names the CTE holding `instance_id` and `id` of every row the
/// surrounding update matches. Implementations join against it so they only
/// touch rows belonging to those.
pub trait CteStatement: fmt::Debug + Send + Sync {
    fn write_cte(&self, builder: &mut StatementBuilder, source: &'static str) -> DbResult<()>;

    /// `true` if the statement would touch nothing. Empty statements are skipped.
    fn is_empty(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
struct SharedCte(Arc<dyn CteStatement>);

impl PartialEq for SharedCte {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

/// One or more column assignments.
#[derive(Debug, Clone, PartialEq)]
pub struct Change(ChangeInner);

#[derive(Debug, Clone, PartialEq)]
enum ChangeInner {
    Set { column: Column, value: Arg },
    Increment { column: Column },
    Json(JsonChange),
    Cte(SharedCte),
    Many(Vec<Change>),
}

impl Change {
    /// `column = value`. `None` and instructions are written literally.
    pub fn new(column: &Column, value: impl IntoArg) -> Self {
        Self(ChangeInner::Set {
            column: column.clone(),
            value: value.into_arg(),
        })
    }

    /// `column = NULL`
    pub fn to_null(column: &Column) -> Self {
        Self::new(column, Instruction::Null)
    }

    /// `column = NOW()`
    pub fn now(column: &Column) -> Self {
        Self::new(column, Instruction::Now)
    }

    /// `column = COALESCE(table.column, 0) + 1`
    pub fn increment(column: &Column) -> Self {
        Self(ChangeInner::Increment {
            column: column.clone(),
        })
    }

    /// A batch of changes rendered comma separated.
    pub fn many(changes: Vec<Change>) -> Self {
        Self(ChangeInner::Many(changes))
    }

    /// A write to another table carried along with the update.
    pub fn cte(statement: impl CteStatement + 'static) -> Self {
        Self(ChangeInner::Cte(SharedCte(Arc::new(statement))))
    }

    pub fn json_set_field<T: Serialize + ?Sized>(
        column: &Column,
        path: impl Into<JsonPath>,
        value: &T,
    ) -> Self {
        JsonChange::new(column).set_field(path, value).into()
    }

    pub fn json_remove_field(column: &Column, path: impl Into<JsonPath>) -> Self {
        JsonChange::new(column).remove_field(path).into()
    }

    pub fn json_array_append<T: Serialize + ?Sized>(
        column: &Column,
        path: impl Into<JsonPath>,
        value: &T,
    ) -> Self {
        JsonChange::new(column).array_append(path, value).into()
    }

    pub fn json_array_remove<T: Serialize + ?Sized>(
        column: &Column,
        path: impl Into<JsonPath>,
        value: &T,
    ) -> Self {
        JsonChange::new(column).array_remove(path, value).into()
    }

    /// Whether any assignment in this change targets `column`.
    pub fn is_on_column(&self, column: &Column) -> bool {
        match &self.0 {
            ChangeInner::Set { column: c, .. } | ChangeInner::Increment { column: c } => {
                c == column
            }
            ChangeInner::Json(json) => !json.is_empty() && json.column == *column,
            ChangeInner::Cte(_) => false,
            ChangeInner::Many(changes) => changes.iter().any(|c| c.is_on_column(column)),
        }
    }

    /// `true` if the change neither assigns nor carries a statement.
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            ChangeInner::Json(json) => json.is_empty(),
            ChangeInner::Cte(cte) => cte.0.is_empty(),
            ChangeInner::Many(changes) => changes.iter().all(Change::is_empty),
            _ => false,
        }
    }

    /// Every column assigned by this change, batches flattened.
    pub fn columns(&self) -> Vec<&Column> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
            .into_iter()
            .filter_map(|leaf| match leaf {
                ChangeInner::Set { column, .. } | ChangeInner::Increment { column } => Some(column),
                ChangeInner::Json(json) => Some(&json.column),
                ChangeInner::Cte(_) | ChangeInner::Many(_) => None,
            })
            .collect()
    }

    /// Every non-empty statement carried by this change, in order.
    pub fn ctes(&self) -> Vec<&dyn CteStatement> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
            .into_iter()
            .filter_map(|leaf| match leaf {
                ChangeInner::Cte(cte) => Some(&*cte.0),
                _ => None,
            })
            .collect()
    }

    /// Render the assignment list into `builder`.
    pub fn write(&self, builder: &mut StatementBuilder) -> DbResult<()> {
        write_changes(builder, std::slice::from_ref(self))
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a ChangeInner>) {
        match &self.0 {
            ChangeInner::Many(changes) => {
                for change in changes {
                    change.collect_leaves(out);
                }
            }
            ChangeInner::Json(json) if json.is_empty() => {}
            ChangeInner::Cte(cte) if cte.0.is_empty() => {}
            leaf => out.push(leaf),
        }
    }
}

enum Assignment<'a> {
    Plain(&'a ChangeInner),
    Json {
        column: &'a Column,
        ops: Vec<&'a JsonOp>,
    },
}

/// Render `changes` as a comma separated assignment list.
///
/// JSON changes on the same column are merged into one assignment at the
/// position of the first. Carried statements are not written here, see
/// [`Change::ctes`]. Nothing is written if an error is returned.
pub fn write_changes(builder: &mut StatementBuilder, changes: &[Change]) -> DbResult<()> {
    let mut leaves = Vec::new();
    for change in changes {
        change.collect_leaves(&mut leaves);
    }
    leaves.retain(|leaf| !matches!(leaf, ChangeInner::Cte(_)));
    if leaves.is_empty() {
        return Err(DbError::NoChanges);
    }

    let mut assignments: Vec<Assignment<'_>> = Vec::with_capacity(leaves.len());
    for leaf in leaves {
        let ChangeInner::Json(json) = leaf else {
            assignments.push(Assignment::Plain(leaf));
            continue;
        };
        let existing = assignments.iter_mut().find_map(|a| match a {
            Assignment::Json { column, ops } if **column == json.column => Some(ops),
            _ => None,
        });
        match existing {
            Some(ops) => ops.extend(json.ops.iter()),
            None => assignments.push(Assignment::Json {
                column: &json.column,
                ops: json.ops.iter().collect(),
            }),
        }
    }

    for assignment in &assignments {
        if let Assignment::Json { column, ops } = assignment {
            let has_array = ops.iter().any(|op| op.is_array_op());
            if has_array && ops.iter().any(|op| !op.is_array_op()) {
                return Err(DbError::MixedJsonChange {
                    column: column.qualified_name(),
                });
            }
            for op in ops {
                op.check_encoded()?;
            }
        }
    }

    for (i, assignment) in assignments.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        match assignment {
            Assignment::Plain(ChangeInner::Set { column, value }) => {
                column.write_unqualified(builder);
                builder.push(" = ").push_arg(value.clone());
            }
            Assignment::Plain(ChangeInner::Increment { column }) => {
                column.write_unqualified(builder);
                builder.push(" = COALESCE(");
                column.write_qualified(builder);
                builder.push(", 0) + 1");
            }
            // Leaves are never batches and JSON leaves are grouped above.
            Assignment::Plain(ChangeInner::Many(_) | ChangeInner::Json(_) | ChangeInner::Cte(_)) => {}
            Assignment::Json { column, ops } => {
                column.write_unqualified(builder);
                builder.push(" = ");
                for op in ops.iter().rev() {
                    builder.push(op.function());
                }
                column.write_qualified(builder);
                for op in ops {
                    op.write_arguments(builder)?;
                }
            }
        }
    }
    Ok(())
}
