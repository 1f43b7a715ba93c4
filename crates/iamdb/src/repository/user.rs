use super::{
    require_restricted, require_table, write_column_names, write_qualified_columns,
    write_returning,
};
use crate::config::StoreConfig;
use crate::domain::{User, UserKind, UserState, UserType};
use crate::error::{DbError, DbResult};
use crate::executor::Executor;
use crate::ident::Ident;
use crate::repository::{HumanUserRepository, MachineUserRepository, UserMetadataRepository};
use crate::row::{FromRecord, Record};
use crate::stmt::{
    Change, Column, Condition, JsonChange, ListOperator, NumberOperator, QueryOpts,
    StatementBuilder, TextOperator, write_changes,
};
use crate::value::{Instruction, IntoArg, Value};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub(super) const TABLE: &str = "users";

/// CTE holding the primary key of every user an update matches.
const EXISTING_USER: &str = "existing_user";

/// Repository for users and their human or machine trait.
///
/// Every read must be scoped to an instance. Every write must restrict both
/// `instance_id` and `id`, either to one value or to a list of values.
///
/// # Example
/// ```ignore
/// let users = UserRepository::default();
/// let user = users
///     .get(&client, QueryOpts::new().condition(users.primary_key_condition("i1", "u1")))
///     .await?;
///
/// users
///     .human()
///     .update(
///         &client,
///         &users.human().primary_key_condition("i1", "u1"),
///         vec![users.human().increment_failed_password_attempts()],
///     )
///     .await?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRepository {
    schema: Ident,
}

impl Default for UserRepository {
    fn default() -> Self {
        Self::new(&StoreConfig::default())
    }
}

impl UserRepository {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            schema: config.schema.clone(),
        }
    }

    pub fn schema(&self) -> &Ident {
        &self.schema
    }

    /// Columns, conditions and changes of the human trait.
    pub fn human(&self) -> HumanUserRepository<'_> {
        HumanUserRepository::new(self)
    }

    /// Columns, conditions and changes of the machine trait.
    pub fn machine(&self) -> MachineUserRepository<'_> {
        MachineUserRepository::new(self)
    }

    /// Columns, conditions and changes of the per-key metadata table.
    pub fn user_metadata(&self) -> UserMetadataRepository<'_> {
        UserMetadataRepository::new(self)
    }

    /// `schema.table`
    pub(super) fn write_table_name(&self, builder: &mut StatementBuilder, table: &str) {
        builder.push_ident(&self.schema).push_char('.').push(table);
    }

    /// `schema.table table`
    pub(super) fn write_aliased_table(&self, builder: &mut StatementBuilder, table: &str) {
        self.write_table_name(builder, table);
        builder.push_char(' ').push(table);
    }

    // ==================== Operations ====================

    /// Fetch exactly one user.
    ///
    /// Returns [`DbError::NotFound`] for no match and [`DbError::TooManyRows`]
    /// if the condition matches more than one user.
    pub async fn get<E: Executor>(&self, client: &E, opts: QueryOpts) -> DbResult<User> {
        let builder = self.select_statement(&opts)?;
        let record = client.query_one_strict(builder.sql(), builder.args()).await?;
        User::from_record(&record)
    }

    /// Fetch all matching users in the order the database returns them.
    pub async fn list<E: Executor>(&self, client: &E, opts: QueryOpts) -> DbResult<Vec<User>> {
        let builder = self.select_statement(&opts)?;
        client
            .query(builder.sql(), builder.args())
            .await?
            .iter()
            .map(User::from_record)
            .collect()
    }

    /// Insert the base row and the trait row in one statement.
    ///
    /// `created_at` and `updated_at` are written back from the database.
    pub async fn create<E: Executor>(&self, client: &E, user: &mut User) -> DbResult<()> {
        let builder = self.insert_statement(user);
        let record = client.query_one(builder.sql(), builder.args()).await?;
        let created_at = record.try_get(0)?;
        let updated_at = record.try_get(1)?;
        user.created_at = Some(created_at);
        user.updated_at = Some(updated_at);
        Ok(())
    }

    /// Update base columns of the users matched by `condition`.
    ///
    /// `updated_at` is set to `NOW()` unless one of `changes` sets it.
    /// Changes carrying statements, such as [`UserMetadataRepository::set`],
    /// run in the same statement against the same users.
    pub async fn update<E: Executor>(
        &self,
        client: &E,
        condition: &Condition,
        changes: Vec<Change>,
    ) -> DbResult<u64> {
        let builder = self.update_statement(condition, changes)?;
        client.execute(builder.sql(), builder.args()).await
    }

    /// Delete the users matched by `condition`. Trait and metadata rows are
    /// removed by the foreign key cascade.
    pub async fn delete<E: Executor>(&self, client: &E, condition: &Condition) -> DbResult<u64> {
        let builder = self.delete_statement(condition)?;
        client.execute(builder.sql(), builder.args()).await
    }

    // ==================== Statements ====================

    pub(super) fn select_statement(&self, opts: &QueryOpts) -> DbResult<StatementBuilder> {
        require_restricted(opts.get_condition(), &[self.instance_id_column()])?;

        let human = self.human();
        let machine = self.machine();

        let mut builder = StatementBuilder::new("SELECT ");
        write_qualified_columns(&mut builder, &self.base_columns());
        builder.push(", ");
        write_qualified_columns(&mut builder, &human.data_columns());
        builder.push(", ");
        write_qualified_columns(&mut builder, &machine.data_columns());

        builder.push(" FROM ");
        self.write_aliased_table(&mut builder, TABLE);
        for (table, [instance_id, id]) in [
            (human.table(), human.primary_key_columns()),
            (machine.table(), machine.primary_key_columns()),
        ] {
            builder.push(" LEFT JOIN ");
            self.write_aliased_table(&mut builder, table);
            builder.push(" ON ");
            Condition::and(vec![
                Condition::columns_equal(&instance_id, &self.instance_id_column()),
                Condition::columns_equal(&id, &self.id_column()),
            ])
            .write(&mut builder);
        }

        opts.write(&mut builder);
        Ok(builder)
    }

    pub(super) fn insert_statement(&self, user: &User) -> StatementBuilder {
        let created_at = user
            .created_at
            .map_or(Instruction::Now.into_arg(), IntoArg::into_arg);
        let updated_at = user
            .updated_at
            .or(user.created_at)
            .map_or(Instruction::Now.into_arg(), IntoArg::into_arg);

        let mut builder = StatementBuilder::new("WITH created_user AS (INSERT INTO ");
        self.write_table_name(&mut builder, TABLE);
        builder.push(" (");
        write_column_names(&mut builder, &self.base_columns());
        builder.push(") VALUES (");
        builder.push_args([
            user.instance_id.as_str().into_arg(),
            user.organization_id.as_str().into_arg(),
            user.id.as_str().into_arg(),
            user.username.as_str().into_arg(),
            user.state.into_arg(),
            user.user_type().into_arg(),
            user.login_names.clone().into_arg(),
            Value::Json(serde_json::Value::Object(user.metadata.clone())).into_arg(),
            created_at,
            updated_at,
        ]);
        builder.push(") RETURNING instance_id, id, created_at, updated_at) ");

        match &user.kind {
            UserKind::Human(human) => self.human().write_insert(&mut builder, human),
            UserKind::Machine(machine) => self.machine().write_insert(&mut builder, machine),
        }

        builder.push(
            " RETURNING (SELECT created_at FROM created_user) AS created_at, \
             (SELECT updated_at FROM created_user) AS updated_at",
        );
        builder
    }

    pub(super) fn update_statement(
        &self,
        condition: &Condition,
        mut changes: Vec<Change>,
    ) -> DbResult<StatementBuilder> {
        require_restricted(Some(condition), &self.primary_key_columns())?;
        require_table(&changes, TABLE)?;
        if changes.iter().all(Change::is_empty) {
            return Err(DbError::NoChanges);
        }
        let updated_at = self.updated_at_column();
        if !changes.iter().any(|c| c.is_on_column(&updated_at)) {
            changes.push(Change::now(&updated_at));
        }

        let mut builder = StatementBuilder::new("WITH ");
        builder.push(EXISTING_USER).push(" AS (SELECT ");
        write_qualified_columns(&mut builder, &self.primary_key_columns());
        builder.push(" FROM ");
        self.write_aliased_table(&mut builder, TABLE);
        builder.push_where(condition);
        builder.push_char(')');
        for (i, cte) in changes.iter().flat_map(|c| c.ctes()).enumerate() {
            builder.push(", cte_").push(&i.to_string()).push(" AS (");
            cte.write_cte(&mut builder, EXISTING_USER)?;
            builder.push_char(')');
        }

        builder.push(" UPDATE ");
        self.write_aliased_table(&mut builder, TABLE);
        builder.push(" SET ");
        write_changes(&mut builder, &changes)?;
        builder.push(" FROM ").push(EXISTING_USER);
        builder.push_where(&Condition::and(vec![
            Condition::columns_equal(
                &self.instance_id_column(),
                &Column::new(EXISTING_USER, "instance_id"),
            ),
            Condition::columns_equal(&self.id_column(), &Column::new(EXISTING_USER, "id")),
        ]));
        write_returning(&mut builder, &self.primary_key_columns());
        Ok(builder)
    }

    pub(super) fn delete_statement(&self, condition: &Condition) -> DbResult<StatementBuilder> {
        require_restricted(Some(condition), &self.primary_key_columns())?;
        let mut builder = StatementBuilder::new("DELETE FROM ");
        self.write_aliased_table(&mut builder, TABLE);
        builder.push_where(condition);
        Ok(builder)
    }

    // ==================== Columns ====================

    fn base_columns(&self) -> [Column; 10] {
        [
            self.instance_id_column(),
            self.organization_id_column(),
            self.id_column(),
            self.username_column(),
            self.state_column(),
            self.type_column(),
            self.login_names_column(),
            self.metadata_column(),
            self.created_at_column(),
            self.updated_at_column(),
        ]
    }

    pub fn primary_key_columns(&self) -> [Column; 2] {
        [self.instance_id_column(), self.id_column()]
    }

    pub fn instance_id_column(&self) -> Column {
        Column::new(TABLE, "instance_id")
    }

    pub fn organization_id_column(&self) -> Column {
        Column::new(TABLE, "organization_id")
    }

    pub fn id_column(&self) -> Column {
        Column::new(TABLE, "id")
    }

    /// Searched case-insensitively through `username_lower`.
    pub fn username_column(&self) -> Column {
        Column::new(TABLE, "username").with_lower_twin()
    }

    pub fn state_column(&self) -> Column {
        Column::new(TABLE, "state")
    }

    pub fn type_column(&self) -> Column {
        Column::new(TABLE, "type")
    }

    pub fn login_names_column(&self) -> Column {
        Column::new(TABLE, "login_names")
    }

    pub fn metadata_column(&self) -> Column {
        Column::new(TABLE, "metadata")
    }

    pub fn created_at_column(&self) -> Column {
        Column::new(TABLE, "created_at")
    }

    pub fn updated_at_column(&self) -> Column {
        Column::new(TABLE, "updated_at")
    }

    // ==================== Conditions ====================

    pub fn primary_key_condition(&self, instance_id: &str, user_id: &str) -> Condition {
        Condition::and(vec![
            self.instance_id_condition(instance_id),
            self.id_condition(user_id),
        ])
    }

    pub fn instance_id_condition(&self, instance_id: &str) -> Condition {
        Condition::equal(&self.instance_id_column(), instance_id)
    }

    pub fn organization_id_condition(&self, organization_id: &str) -> Condition {
        Condition::equal(&self.organization_id_column(), organization_id)
    }

    pub fn id_condition(&self, user_id: &str) -> Condition {
        Condition::equal(&self.id_column(), user_id)
    }

    /// Users whose id is one of `user_ids`.
    pub fn ids_condition(&self, user_ids: Vec<&str>) -> Condition {
        Condition::in_list(&self.id_column(), user_ids)
    }

    pub fn username_condition(&self, op: TextOperator, username: &str) -> Condition {
        Condition::text(&self.username_column(), op, username)
    }

    pub fn state_condition(&self, state: UserState) -> Condition {
        Condition::equal(&self.state_column(), state)
    }

    pub fn type_condition(&self, user_type: UserType) -> Condition {
        Condition::equal(&self.type_column(), user_type)
    }

    /// Users that have `login_name` among their login names.
    pub fn login_name_condition(&self, login_name: &str) -> Condition {
        Condition::contains_any(&self.login_names_column(), vec![login_name])
    }

    pub fn login_names_condition(&self, op: ListOperator, login_names: Vec<String>) -> Condition {
        Condition::list(&self.login_names_column(), op, login_names)
    }

    pub fn created_at_condition(&self, op: NumberOperator, at: DateTime<Utc>) -> Condition {
        Condition::number(&self.created_at_column(), op, at)
    }

    pub fn updated_at_condition(&self, op: NumberOperator, at: DateTime<Utc>) -> Condition {
        Condition::number(&self.updated_at_column(), op, at)
    }

    // ==================== Changes ====================

    pub fn set_username(&self, username: &str) -> Change {
        Change::new(&self.username_column(), username)
    }

    pub fn set_state(&self, state: UserState) -> Change {
        Change::new(&self.state_column(), state)
    }

    pub fn set_organization_id(&self, organization_id: &str) -> Change {
        Change::new(&self.organization_id_column(), organization_id)
    }

    /// Used when replaying events with their original timestamp.
    pub fn set_updated_at(&self, updated_at: DateTime<Utc>) -> Change {
        Change::new(&self.updated_at_column(), updated_at)
    }

    pub fn set_login_names(&self, login_names: Vec<String>) -> Change {
        Change::new(&self.login_names_column(), login_names)
    }

    /// Set metadata `key` to `value`. A `null` value removes the key.
    pub fn set_metadata<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Change {
        Change::json_set_field(&self.metadata_column(), key, value)
    }

    /// Set several metadata keys in one assignment.
    pub fn set_metadata_entries<'a, T, I>(&self, entries: I) -> Change
    where
        T: Serialize + ?Sized + 'a,
        I: IntoIterator<Item = (&'a str, &'a T)>,
    {
        entries
            .into_iter()
            .fold(JsonChange::new(&self.metadata_column()), |change, (key, value)| {
                change.set_field(key, value)
            })
            .into()
    }

    pub fn remove_metadata(&self, key: &str) -> Change {
        Change::json_remove_field(&self.metadata_column(), key)
    }

    /// Append `value` to the array stored under metadata `key`.
    pub fn add_metadata_item<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Change {
        Change::json_array_append(&self.metadata_column(), key, value)
    }

    /// Remove `value` from the array stored under metadata `key`.
    pub fn remove_metadata_item<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Change {
        Change::json_array_remove(&self.metadata_column(), key, value)
    }
}

impl FromRecord for User {
    fn from_record(record: &Record) -> DbResult<Self> {
        let user_type: UserType = record.try_get_named("type")?;
        // Both trait column sets are decoded so a malformed value fails the
        // whole row even when it belongs to the other trait.
        let human = HumanUserRepository::decode(record)?;
        let machine = MachineUserRepository::decode(record)?;
        let kind = match user_type {
            UserType::Human => UserKind::Human(human.ok_or_else(|| {
                DbError::decode("first_name", "human user without human_users row")
            })?),
            UserType::Machine => UserKind::Machine(machine.ok_or_else(|| {
                DbError::decode("name", "machine user without machine_users row")
            })?),
        };

        let metadata = match record.try_get_named::<Option<serde_json::Value>>("metadata")? {
            None => serde_json::Map::new(),
            Some(serde_json::Value::Object(map)) => map,
            Some(other) => {
                return Err(DbError::decode(
                    "metadata",
                    format!("expected JSON object, got {other}"),
                ));
            }
        };

        Ok(User {
            instance_id: record.try_get_named("instance_id")?,
            organization_id: record.try_get_named("organization_id")?,
            id: record.try_get_named("id")?,
            username: record.try_get_named("username")?,
            state: record.try_get_named("state")?,
            login_names: record
                .try_get_named::<Option<Vec<String>>>("login_names")?
                .unwrap_or_default(),
            metadata,
            created_at: record.try_get_named("created_at")?,
            updated_at: record.try_get_named("updated_at")?,
            kind,
        })
    }
}
