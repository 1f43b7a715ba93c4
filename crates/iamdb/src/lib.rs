//! # iamdb
//!
//! Typed PostgreSQL persistence for a multi-tenant identity backend.
//!
//! ## Features
//!
//! - **Statement builder**: SQL text plus positional arguments, with equal
//!   arguments sharing one placeholder
//! - **Typed conditions**: text, number, list and boolean operators that only
//!   accept values of the matching kind
//! - **Changes**: `SET` assignments, including chained JSONB patches folded
//!   into a single expression
//! - **Polymorphic users**: one base row plus a human or machine trait row,
//!   read through a join and created in one statement
//! - **Executor agnostic**: pass a client, a transaction or a pooled
//!   connection anywhere an [`Executor`] is expected
//!
//! ## Example
//!
//! ```ignore
//! use iamdb::{Condition, QueryOpts, TextOperator, UserRepository};
//!
//! let users = UserRepository::default();
//!
//! let found = users
//!     .list(
//!         &client,
//!         QueryOpts::new()
//!             .condition(Condition::and(vec![
//!                 users.instance_id_condition("instance"),
//!                 users.username_condition(TextOperator::StartsWithIgnoreCase, "ad"),
//!             ]))
//!             .limit(20),
//!     )
//!     .await?;
//!
//! users
//!     .update(
//!         &client,
//!         &users.primary_key_condition("instance", "user"),
//!         vec![users.set_metadata("team", "core")],
//!     )
//!     .await?;
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod ident;
pub mod repository;
pub mod row;
pub mod stmt;
pub mod value;

pub use config::StoreConfig;
pub use domain::{
    AccessTokenType, HumanGender, HumanUser, MachineUser, User, UserKind, UserMetadata, UserState,
    UserType,
};
pub use error::{DbError, DbResult};
pub use executor::Executor;
pub use ident::Ident;
pub use repository::{
    HumanUserRepository, MachineUserRepository, UserMetadataRepository, UserRepository,
};
pub use row::{FromRecord, FromValue, Record};
pub use stmt::{
    BooleanOperator, Change, Column, Condition, CteStatement, Direction, JsonChange, JsonPath,
    ListOperator, NumberOperator, OrderBy, QueryOpts, StatementBuilder, TextOperator,
};
pub use value::{Arg, Instruction, IntoArg, Value};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};

// Re-export tokio-postgres for convenience
pub use tokio_postgres;

#[cfg(feature = "pool")]
pub use deadpool_postgres;
