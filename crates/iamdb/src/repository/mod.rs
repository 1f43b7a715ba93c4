//! Repositories over the user tables.
//!
//! [`UserRepository`] reads and writes the base `users` table and joins the
//! trait tables. [`HumanUserRepository`] and [`MachineUserRepository`] are
//! views borrowed from it that only know their own table.
//! [`UserMetadataRepository`] builds writes to the per-key metadata table that
//! ride along with a users update.

mod user;
mod user_human;
mod user_machine;
mod user_metadata;

pub use user::UserRepository;
pub use user_human::HumanUserRepository;
pub use user_machine::MachineUserRepository;
pub use user_metadata::UserMetadataRepository;

use crate::error::{DbError, DbResult};
use crate::stmt::{Change, Column, Condition, StatementBuilder};

/// Fail unless `condition` pins every row to a single value of each column.
fn require_restricted(condition: Option<&Condition>, columns: &[Column]) -> DbResult<()> {
    for column in columns {
        if !condition.is_some_and(|c| c.is_restricting_column(column)) {
            return Err(DbError::missing_condition(column.qualified_name()));
        }
    }
    Ok(())
}

/// Fail if a change assigns a column of any table other than `table`.
fn require_table(changes: &[Change], table: &str) -> DbResult<()> {
    for column in changes.iter().flat_map(Change::columns) {
        if column.table() != table {
            return Err(DbError::validation(format!(
                "column {} cannot be changed through {table}",
                column.qualified_name()
            )));
        }
    }
    Ok(())
}

/// Fail if a change carries a statement. Only the `users` update runs them.
fn require_plain(changes: &[Change], table: &str) -> DbResult<()> {
    if changes.iter().any(|c| !c.ctes().is_empty()) {
        return Err(DbError::validation(format!(
            "changes to {table} cannot carry statements"
        )));
    }
    Ok(())
}

/// `a, b, c` with bare column names.
fn write_column_names(builder: &mut StatementBuilder, columns: &[Column]) {
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        column.write_unqualified(builder);
    }
}

/// `t.a, t.b, t.c` with qualified column names.
fn write_qualified_columns(builder: &mut StatementBuilder, columns: &[Column]) {
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        column.write_qualified(builder);
    }
}

/// ` RETURNING t.a, t.b`
fn write_returning(builder: &mut StatementBuilder, columns: &[Column]) {
    builder.push(" RETURNING ");
    write_qualified_columns(builder, columns);
}
