use super::{
    require_plain, require_restricted, require_table, write_column_names, write_returning,
};
use crate::domain::{HumanGender, HumanUser};
use crate::error::{DbError, DbResult};
use crate::executor::Executor;
use crate::repository::UserRepository;
use crate::row::Record;
use crate::stmt::{
    Change, Column, Condition, NumberOperator, StatementBuilder, TextOperator, write_changes,
};
use crate::value::IntoArg;
use chrono::{DateTime, Utc};

const TABLE: &str = "human_users";

/// The human trait of [`UserRepository`].
///
/// Holds the shared repository for its schema and only exposes columns of
/// the `human_users` table.
#[derive(Debug, Clone, Copy)]
pub struct HumanUserRepository<'a> {
    user: &'a UserRepository,
}

impl<'a> HumanUserRepository<'a> {
    pub(super) fn new(user: &'a UserRepository) -> Self {
        Self { user }
    }

    pub(super) fn table(&self) -> &'static str {
        TABLE
    }

    /// Update the human rows matched by `condition`.
    ///
    /// Only `human_users` columns may be changed.
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

    /// Second half of the create statement, selecting keys from `created_user`.
    pub(super) fn write_insert(&self, builder: &mut StatementBuilder, human: &HumanUser) {
        builder.push("INSERT INTO ");
        self.user.write_table_name(builder, TABLE);
        builder.push(" (");
        write_column_names(builder, &self.primary_key_columns());
        builder.push(", ");
        write_column_names(builder, &self.data_columns());
        builder.push(") SELECT created_user.instance_id, created_user.id, ");
        builder.push_args([
            human.first_name.as_str().into_arg(),
            human.last_name.as_str().into_arg(),
            human.nickname.as_deref().into_arg(),
            human.display_name.as_deref().into_arg(),
            human.preferred_language.as_deref().into_arg(),
            human.gender.into_arg(),
            human.avatar_key.as_deref().into_arg(),
            human.email.as_str().into_arg(),
            human.email_verified_at.into_arg(),
            human.phone.as_deref().into_arg(),
            human.phone_verified_at.into_arg(),
            human.password_change_required.into_arg(),
            human.failed_password_attempts.into_arg(),
            human.multifactor_initialization_skipped_at.into_arg(),
        ]);
        builder.push(" FROM created_user");
    }

    /// Decode the joined human columns. `None` if the user has no human row.
    pub(super) fn decode(record: &Record) -> DbResult<Option<HumanUser>> {
        let first_name: Option<String> = record.try_get_named("first_name")?;
        let last_name: Option<String> = record.try_get_named("last_name")?;
        let nickname = record.try_get_named("nickname")?;
        let display_name = record.try_get_named("display_name")?;
        let preferred_language = record.try_get_named("preferred_language")?;
        let gender = record.try_get_named("gender")?;
        let avatar_key = record.try_get_named("avatar_key")?;
        let email: Option<String> = record.try_get_named("email")?;
        let email_verified_at = record.try_get_named("email_verified_at")?;
        let phone = record.try_get_named("phone")?;
        let phone_verified_at = record.try_get_named("phone_verified_at")?;
        let password_change_required: Option<bool> =
            record.try_get_named("password_change_required")?;
        let failed_password_attempts: Option<i16> =
            record.try_get_named("failed_password_attempts")?;
        let multifactor_initialization_skipped_at =
            record.try_get_named("multifactor_initialization_skipped_at")?;

        let Some(first_name) = first_name else {
            return Ok(None);
        };
        Ok(Some(HumanUser {
            first_name,
            last_name: last_name.unwrap_or_default(),
            nickname,
            display_name,
            preferred_language,
            gender,
            avatar_key,
            email: email.unwrap_or_default(),
            email_verified_at,
            phone,
            phone_verified_at,
            password_change_required: password_change_required.unwrap_or_default(),
            failed_password_attempts: failed_password_attempts.unwrap_or_default(),
            multifactor_initialization_skipped_at,
        }))
    }

    // ==================== Columns ====================

    pub fn primary_key_columns(&self) -> [Column; 2] {
        [self.instance_id_column(), self.id_column()]
    }

    /// Every column except the key, in insert and select order.
    pub(super) fn data_columns(&self) -> [Column; 14] {
        [
            self.first_name_column(),
            self.last_name_column(),
            self.nickname_column(),
            self.display_name_column(),
            self.preferred_language_column(),
            self.gender_column(),
            self.avatar_key_column(),
            self.email_column(),
            self.email_verified_at_column(),
            self.phone_column(),
            self.phone_verified_at_column(),
            self.password_change_required_column(),
            self.failed_password_attempts_column(),
            self.multifactor_initialization_skipped_at_column(),
        ]
    }

    pub fn instance_id_column(&self) -> Column {
        Column::new(TABLE, "instance_id")
    }

    pub fn id_column(&self) -> Column {
        Column::new(TABLE, "id")
    }

    pub fn first_name_column(&self) -> Column {
        Column::new(TABLE, "first_name")
    }

    pub fn last_name_column(&self) -> Column {
        Column::new(TABLE, "last_name")
    }

    pub fn nickname_column(&self) -> Column {
        Column::new(TABLE, "nickname")
    }

    pub fn display_name_column(&self) -> Column {
        Column::new(TABLE, "display_name")
    }

    pub fn preferred_language_column(&self) -> Column {
        Column::new(TABLE, "preferred_language")
    }

    pub fn gender_column(&self) -> Column {
        Column::new(TABLE, "gender")
    }

    pub fn avatar_key_column(&self) -> Column {
        Column::new(TABLE, "avatar_key")
    }

    /// Has no lowercase twin; ignore-case lookups fall back to `LOWER(email)`.
    pub fn email_column(&self) -> Column {
        Column::new(TABLE, "email")
    }

    pub fn email_verified_at_column(&self) -> Column {
        Column::new(TABLE, "email_verified_at")
    }

    pub fn phone_column(&self) -> Column {
        Column::new(TABLE, "phone")
    }

    pub fn phone_verified_at_column(&self) -> Column {
        Column::new(TABLE, "phone_verified_at")
    }

    pub fn password_change_required_column(&self) -> Column {
        Column::new(TABLE, "password_change_required")
    }

    pub fn failed_password_attempts_column(&self) -> Column {
        Column::new(TABLE, "failed_password_attempts")
    }

    pub fn multifactor_initialization_skipped_at_column(&self) -> Column {
        Column::new(TABLE, "multifactor_initialization_skipped_at")
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

    pub fn id_condition(&self, user_id: &str) -> Condition {
        Condition::equal(&self.id_column(), user_id)
    }

    pub fn first_name_condition(&self, op: TextOperator, first_name: &str) -> Condition {
        Condition::text(&self.first_name_column(), op, first_name)
    }

    pub fn last_name_condition(&self, op: TextOperator, last_name: &str) -> Condition {
        Condition::text(&self.last_name_column(), op, last_name)
    }

    pub fn nickname_condition(&self, op: TextOperator, nickname: &str) -> Condition {
        Condition::text(&self.nickname_column(), op, nickname)
    }

    pub fn display_name_condition(&self, op: TextOperator, display_name: &str) -> Condition {
        Condition::text(&self.display_name_column(), op, display_name)
    }

    pub fn preferred_language_condition(&self, language: &str) -> Condition {
        Condition::equal(&self.preferred_language_column(), language)
    }

    pub fn gender_condition(&self, gender: HumanGender) -> Condition {
        Condition::equal(&self.gender_column(), gender)
    }

    pub fn email_condition(&self, op: TextOperator, email: &str) -> Condition {
        Condition::text(&self.email_column(), op, email)
    }

    /// Users whose email is verified (`true`) or not (`false`).
    pub fn email_verified_condition(&self, verified: bool) -> Condition {
        let column = self.email_verified_at_column();
        if verified {
            Condition::is_not_null(&column)
        } else {
            Condition::is_null(&column)
        }
    }

    pub fn phone_condition(&self, op: TextOperator, phone: &str) -> Condition {
        Condition::text(&self.phone_column(), op, phone)
    }

    pub fn password_change_required_condition(&self, required: bool) -> Condition {
        Condition::boolean(&self.password_change_required_column(), required.into())
    }

    pub fn failed_password_attempts_condition(&self, op: NumberOperator, attempts: i16) -> Condition {
        Condition::number(&self.failed_password_attempts_column(), op, attempts)
    }

    // ==================== Changes ====================

    pub fn set_first_name(&self, first_name: &str) -> Change {
        Change::new(&self.first_name_column(), first_name)
    }

    pub fn set_last_name(&self, last_name: &str) -> Change {
        Change::new(&self.last_name_column(), last_name)
    }

    pub fn set_nickname(&self, nickname: Option<&str>) -> Change {
        Change::new(&self.nickname_column(), nickname)
    }

    pub fn set_display_name(&self, display_name: Option<&str>) -> Change {
        Change::new(&self.display_name_column(), display_name)
    }

    /// `None` stores NULL.
    pub fn set_preferred_language(&self, language: Option<&str>) -> Change {
        Change::new(&self.preferred_language_column(), language)
    }

    /// `None` stores NULL.
    pub fn set_gender(&self, gender: Option<HumanGender>) -> Change {
        Change::new(&self.gender_column(), gender)
    }

    /// `None` stores NULL.
    pub fn set_avatar_key(&self, avatar_key: Option<&str>) -> Change {
        Change::new(&self.avatar_key_column(), avatar_key)
    }

    /// Set a verified email address.
    pub fn set_email(&self, address: &str) -> Change {
        Change::many(vec![
            Change::new(&self.email_column(), address),
            Change::now(&self.email_verified_at_column()),
        ])
    }

    /// Set an email address that still has to be verified.
    pub fn set_unverified_email(&self, address: &str) -> Change {
        Change::many(vec![
            Change::new(&self.email_column(), address),
            Change::to_null(&self.email_verified_at_column()),
        ])
    }

    /// Mark the current email address as verified at `verified_at`.
    pub fn verify_email_at(&self, verified_at: DateTime<Utc>) -> Change {
        Change::new(&self.email_verified_at_column(), verified_at)
    }

    /// Set a verified phone number.
    pub fn set_phone(&self, number: &str) -> Change {
        Change::many(vec![
            Change::new(&self.phone_column(), number),
            Change::now(&self.phone_verified_at_column()),
        ])
    }

    /// Set a phone number that still has to be verified.
    pub fn set_unverified_phone(&self, number: &str) -> Change {
        Change::many(vec![
            Change::new(&self.phone_column(), number),
            Change::to_null(&self.phone_verified_at_column()),
        ])
    }

    pub fn remove_phone(&self) -> Change {
        Change::many(vec![
            Change::to_null(&self.phone_column()),
            Change::to_null(&self.phone_verified_at_column()),
        ])
    }

    pub fn set_password_change_required(&self, required: bool) -> Change {
        Change::new(&self.password_change_required_column(), required)
    }

    pub fn increment_failed_password_attempts(&self) -> Change {
        Change::increment(&self.failed_password_attempts_column())
    }

    pub fn reset_failed_password_attempts(&self) -> Change {
        Change::new(&self.failed_password_attempts_column(), 0_i16)
    }

    /// Record that multifactor initialization was skipped now.
    pub fn skip_multifactor_initialization(&self) -> Change {
        Change::now(&self.multifactor_initialization_skipped_at_column())
    }

    pub fn skip_multifactor_initialization_at(&self, skipped_at: DateTime<Utc>) -> Change {
        Change::new(&self.multifactor_initialization_skipped_at_column(), skipped_at)
    }
}
