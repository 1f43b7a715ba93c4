use super::write_column_names;
use crate::domain::UserMetadata;
use crate::error::DbResult;
use crate::repository::UserRepository;
use crate::stmt::{Change, Column, Condition, CteStatement, StatementBuilder, TextOperator};
use crate::value::{Instruction, IntoArg};

const TABLE: &str = "user_metadata";

/// The per-key metadata table of [`UserRepository`].
///
/// Writes are [`Change`]s passed to [`UserRepository::update`], which runs
/// them as CTEs against exactly the users it updates.
///
/// ```ignore
/// let users = UserRepository::default();
/// let metadata = users.user_metadata();
/// users
///     .update(
///         &client,
///         &users.primary_key_condition("i1", "u1"),
///         vec![
///             metadata.set(vec![UserMetadata::new("team", "core")]),
///             metadata.remove(metadata.key_condition(TextOperator::StartsWith, "tmp.")),
///         ],
///     )
///     .await?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct UserMetadataRepository<'a> {
    user: &'a UserRepository,
}

impl<'a> UserMetadataRepository<'a> {
    pub(super) fn new(user: &'a UserRepository) -> Self {
        Self { user }
    }

    /// Insert `entries`, replacing the value of keys the user already has.
    pub fn set(&self, entries: Vec<UserMetadata>) -> Change {
        Change::cte(SetMetadata {
            user: self.user.clone(),
            entries,
        })
    }

    /// Delete the entries matching `condition`. An empty condition removes
    /// every entry of the updated users.
    pub fn remove(&self, condition: Condition) -> Change {
        Change::cte(RemoveMetadata {
            user: self.user.clone(),
            condition,
        })
    }

    // ==================== Columns ====================

    fn insert_columns(&self) -> [Column; 6] {
        [
            self.instance_id_column(),
            self.user_id_column(),
            self.key_column(),
            self.value_column(),
            self.created_at_column(),
            self.updated_at_column(),
        ]
    }

    pub fn instance_id_column(&self) -> Column {
        Column::new(TABLE, "instance_id")
    }

    pub fn user_id_column(&self) -> Column {
        Column::new(TABLE, "user_id")
    }

    pub fn key_column(&self) -> Column {
        Column::new(TABLE, "key")
    }

    pub fn value_column(&self) -> Column {
        Column::new(TABLE, "value")
    }

    pub fn created_at_column(&self) -> Column {
        Column::new(TABLE, "created_at")
    }

    pub fn updated_at_column(&self) -> Column {
        Column::new(TABLE, "updated_at")
    }

    // ==================== Conditions ====================

    pub fn key_condition(&self, op: TextOperator, key: &str) -> Condition {
        Condition::text(&self.key_column(), op, key)
    }

    pub fn keys_condition(&self, keys: Vec<&str>) -> Condition {
        Condition::in_list(&self.key_column(), keys)
    }

    pub fn value_condition(&self, value: &[u8]) -> Condition {
        Condition::equal(&self.value_column(), value.to_vec())
    }
}

/// Upsert of metadata entries for every row of the source CTE.
#[derive(Debug)]
struct SetMetadata {
    user: UserRepository,
    entries: Vec<UserMetadata>,
}

impl CteStatement for SetMetadata {
    fn write_cte(&self, builder: &mut StatementBuilder, source: &'static str) -> DbResult<()> {
        let metadata = self.user.user_metadata();

        builder.push("INSERT INTO ");
        self.user.write_table_name(builder, TABLE);
        builder.push(" (");
        write_column_names(builder, &metadata.insert_columns());
        builder.push(") SELECT ");
        builder.push(source).push(".instance_id, ");
        builder.push(source).push(".id, ");
        builder.push("md.key, md.value, md.created_at, md.updated_at FROM ");
        builder.push(source).push(" CROSS JOIN (VALUES ");
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            let created_at = entry
                .created_at
                .map_or(Instruction::Now.into_arg(), IntoArg::into_arg);
            let updated_at = entry
                .updated_at
                .or(entry.created_at)
                .map_or(Instruction::Now.into_arg(), IntoArg::into_arg);

            builder.push_char('(');
            builder.push_arg(entry.key.as_str()).push("::TEXT, ");
            builder.push_arg(entry.value.clone()).push("::BYTEA, ");
            builder.push_arg(created_at).push("::TIMESTAMPTZ, ");
            builder.push_arg(updated_at).push("::TIMESTAMPTZ)");
        }
        builder.push(
            ") AS md(key, value, created_at, updated_at) \
             ON CONFLICT (instance_id, user_id, key) \
             DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at",
        );
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Delete of metadata entries restricted to the rows of the source CTE.
#[derive(Debug)]
struct RemoveMetadata {
    user: UserRepository,
    condition: Condition,
}

impl CteStatement for RemoveMetadata {
    fn write_cte(&self, builder: &mut StatementBuilder, source: &'static str) -> DbResult<()> {
        let metadata = self.user.user_metadata();

        builder.push("DELETE FROM ");
        self.user.write_aliased_table(builder, TABLE);
        builder.push(" USING ").push(source);
        builder.push_where(&Condition::and(vec![
            Condition::columns_equal(
                &metadata.instance_id_column(),
                &Column::new(source, "instance_id"),
            ),
            Condition::columns_equal(&metadata.user_id_column(), &Column::new(source, "id")),
            self.condition.clone(),
        ]));
        Ok(())
    }
}
