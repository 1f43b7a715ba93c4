use crate::ident::Ident;
use crate::stmt::Condition;
use crate::value::{Arg, IntoArg, Value};
use tokio_postgres::types::ToSql;

/// A parameter-safe statement builder.
///
/// Holds the SQL text and the positional arguments it references. Equal
/// values share one placeholder, so binding the same value twice yields the
/// same `$n`. Instructions are written literally and never take a slot.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct StatementBuilder {
    sql: String,
    args: Vec<Value>,
}

impl StatementBuilder {
    /// Create a new builder with an initial SQL fragment.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        Self {
            sql: initial_sql.into(),
            args: Vec::new(),
        }
    }

    /// Create an empty builder.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    pub fn push_char(&mut self, c: char) -> &mut Self {
        self.sql.push(c);
        self
    }

    /// Append a validated identifier.
    pub fn push_ident(&mut self, ident: &Ident) -> &mut Self {
        ident.write_sql(&mut self.sql);
        self
    }

    /// Register an argument and return the text that stands for it.
    ///
    /// Values return their `$n` placeholder, reusing the index of an equal
    /// value bound earlier. Instructions return their literal SQL.
    pub fn append_arg(&mut self, arg: impl IntoArg) -> String {
        match arg.into_arg() {
            Arg::Instruction(instruction) => instruction.as_sql().to_string(),
            Arg::Value(value) => {
                let idx = match self.args.iter().position(|a| *a == value) {
                    Some(idx) => idx,
                    None => {
                        self.args.push(value);
                        self.args.len() - 1
                    }
                };
                format!("${}", idx + 1)
            }
        }
    }

    /// Register an argument and append its placeholder.
    pub fn push_arg(&mut self, arg: impl IntoArg) -> &mut Self {
        let placeholder = self.append_arg(arg);
        self.sql.push_str(&placeholder);
        self
    }

    /// Append a comma separated list of argument placeholders.
    pub fn push_args<I>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: IntoArg,
    {
        for (i, arg) in args.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.push_arg(arg);
        }
        self
    }

    /// Append ` WHERE <condition>` unless the condition renders nothing.
    pub fn push_where(&mut self, condition: &Condition) -> &mut Self {
        if !condition.is_empty() {
            self.sql.push_str(" WHERE ");
            condition.write(self);
        }
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Arguments as driver parameters.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.args.iter().map(|a| a as &(dyn ToSql + Sync)).collect()
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.args)
    }
}
