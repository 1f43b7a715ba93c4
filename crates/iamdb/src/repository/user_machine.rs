use super::{
    require_plain, require_restricted, require_table, write_column_names, write_returning,
};
use crate::domain::{AccessTokenType, MachineUser};
use crate::error::{DbError, DbResult};
use crate::executor::Executor;
use crate::repository::UserRepository;
use crate::row::Record;
use crate::stmt::{Change, Column, Condition, StatementBuilder, TextOperator, write_changes};
use crate::value::IntoArg;

const TABLE: &str = "machine_users";

/// The machine trait of [`UserRepository`].
#[derive(Debug, Clone, Copy)]
pub struct MachineUserRepository<'a> {
    user: &'a UserRepository,
}

impl<'a> MachineUserRepository<'a> {
    pub(super) fn new(user: &'a UserRepository) -> Self {
        Self { user }
    }

    pub(super) fn table(&self) -> &'static str {
        TABLE
    }

    /// Update the machine rows matched by `condition`.
    ///
    /// Only `machine_users` columns may be changed.
    pub async fn update<E: Executor>(
        &self,
        client: &E,
        condition: &Condition,
        changes: Vec<Change>,
    ) -> DbResult<u64> {
        let builder = self.update_statement(condition, &changes)?;
        client.execute(builder.sql(), builder.args()).await
    }

    pub(super) fn update_statement(
        &self,
        condition: &Condition,
        changes: &[Change],
    ) -> DbResult<StatementBuilder> {
        require_restricted(Some(condition), &self.primary_key_columns())?;
        require_table(changes, TABLE)?;
        require_plain(changes, TABLE)?;
        if changes.iter().all(Change::is_empty) {
            return Err(DbError::NoChanges);
        }

        let mut builder = StatementBuilder::new("UPDATE ");
        self.user.write_aliased_table(&mut builder, TABLE);
        builder.push(" SET ");
        write_changes(&mut builder, changes)?;
        builder.push_where(condition);
        write_returning(&mut builder, &self.primary_key_columns());
        Ok(builder)
    }

    pub(super) fn write_insert(&self, builder: &mut StatementBuilder, machine: &MachineUser) {
        builder.push("INSERT INTO ");
        self.user.write_table_name(builder, TABLE);
        builder.push(" (");
        write_column_names(builder, &self.primary_key_columns());
        builder.push(", ");
        write_column_names(builder, &self.data_columns());
        builder.push(") SELECT created_user.instance_id, created_user.id, ");
        builder.push_args([
            machine.name.as_str().into_arg(),
            machine.description.as_deref().into_arg(),
            machine.access_token_type.into_arg(),
        ]);
        builder.push(" FROM created_user");
    }

    /// Decode the joined machine columns. `None` if the user has no machine row.
    pub(super) fn decode(record: &Record) -> DbResult<Option<MachineUser>> {
        let name: Option<String> = record.try_get_named("name")?;
        let description = record.try_get_named("description")?;
        let access_token_type: Option<AccessTokenType> =
            record.try_get_named("access_token_type")?;

        let Some(name) = name else {
            return Ok(None);
        };
        let access_token_type = access_token_type.ok_or_else(|| {
            DbError::decode("access_token_type", "machine user without token type")
        })?;
        Ok(Some(MachineUser {
            name,
            description,
            access_token_type,
        }))
    }

    // ==================== Columns ====================

    pub fn primary_key_columns(&self) -> [Column; 2] {
        [self.instance_id_column(), self.id_column()]
    }

    pub(super) fn data_columns(&self) -> [Column; 3] {
        [
            self.name_column(),
            self.description_column(),
            self.access_token_type_column(),
        ]
    }

    pub fn instance_id_column(&self) -> Column {
        Column::new(TABLE, "instance_id")
    }

    pub fn id_column(&self) -> Column {
        Column::new(TABLE, "id")
    }

    pub fn name_column(&self) -> Column {
        Column::new(TABLE, "name")
    }

    pub fn description_column(&self) -> Column {
        Column::new(TABLE, "description")
    }

    pub fn access_token_type_column(&self) -> Column {
        Column::new(TABLE, "access_token_type")
    }

    // ==================== Conditions ====================

    pub fn primary_key_condition(&self, instance_id: &str, user_id: &str) -> Condition {
        Condition::and(vec![
            Condition::equal(&self.instance_id_column(), instance_id),
            Condition::equal(&self.id_column(), user_id),
        ])
    }

    pub fn name_condition(&self, op: TextOperator, name: &str) -> Condition {
        Condition::text(&self.name_column(), op, name)
    }

    pub fn description_condition(&self, op: TextOperator, description: &str) -> Condition {
        Condition::text(&self.description_column(), op, description)
    }

    pub fn access_token_type_condition(&self, token_type: AccessTokenType) -> Condition {
        Condition::equal(&self.access_token_type_column(), token_type)
    }

    // ==================== Changes ====================

    pub fn set_name(&self, name: &str) -> Change {
        Change::new(&self.name_column(), name)
    }

    /// `None` stores NULL.
    pub fn set_description(&self, description: Option<&str>) -> Change {
        Change::new(&self.description_column(), description)
    }

    pub fn set_access_token_type(&self, token_type: AccessTokenType) -> Change {
        Change::new(&self.access_token_type_column(), token_type)
    }
}
