//! Typed statement building.
//!
//! - [`StatementBuilder`]: SQL text plus deduplicated positional arguments
//! - [`Column`]: a table-qualified column, optionally with a lowercase twin
//! - [`Condition`]: composable WHERE predicates
//! - [`Change`]: SET assignments, including folded JSON patches and
//!   statements carried as CTEs
//! - [`QueryOpts`]: condition, ordering and pagination for reads

mod builder;
mod change;
mod column;
mod condition;
mod operator;
mod query_opts;

pub use builder::StatementBuilder;
pub use change::{Change, CteStatement, JsonChange, JsonPath, write_changes};
pub use column::Column;
pub use condition::Condition;
pub use operator::{BooleanOperator, ListOperator, NumberOperator, TextOperator};
pub use query_opts::{Direction, OrderBy, QueryOpts};

#[cfg(test)]
mod tests;
