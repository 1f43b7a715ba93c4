use super::*;
use crate::error::{DbError, DbResult};
use crate::ident::Ident;
use crate::value::{Instruction, Value};
use chrono::{TimeZone, Utc};
use serde::ser::{Serialize, Serializer};

fn render(condition: &Condition) -> String {
    condition.to_sql().0
}

fn render_change(change: &Change) -> (String, Vec<Value>) {
    let mut b = StatementBuilder::empty();
    change.write(&mut b).unwrap();
    b.into_parts()
}

fn col(table: &'static str, name: &'static str) -> Column {
    Column::new(table, name)
}

// ==================== StatementBuilder ====================

#[test]
fn builds_placeholders_in_order() {
    let mut b = StatementBuilder::new("SELECT * FROM users WHERE a = ");
    b.push_arg(1_i64).push(" AND b = ").push_arg("x");

    assert_eq!(b.sql(), "SELECT * FROM users WHERE a = $1 AND b = $2");
    assert_eq!(b.params_ref().len(), 2);
}

#[test]
fn equal_values_share_a_placeholder() {
    let mut b = StatementBuilder::empty();
    assert_eq!(b.append_arg("x"), "$1");
    assert_eq!(b.append_arg(2_i16), "$2");
    assert_eq!(b.append_arg("x".to_string()), "$1");
    assert_eq!(b.args(), &[Value::from("x"), Value::SmallInt(2)]);
}

#[test]
fn same_value_of_different_type_is_separate() {
    let mut b = StatementBuilder::empty();
    assert_eq!(b.append_arg(1_i32), "$1");
    assert_eq!(b.append_arg(1_i64), "$2");
}

#[test]
fn instructions_never_enter_args() {
    let mut b = StatementBuilder::empty();
    b.push_args([
        Some(Value::from("a")),
        None,
        Some(Value::from("b")),
    ]);
    b.push(", ").push_arg(Instruction::Now);
    b.push(", ").push_arg(Instruction::Default);

    assert_eq!(b.sql(), "$1, NULL, $2, NOW(), DEFAULT");
    assert_eq!(b.args().len(), 2);
}

#[test]
fn push_ident_writes_quoted_names() {
    let mut b = StatementBuilder::new("SELECT 1 FROM ");
    b.push_ident(&Ident::parse(r#""Tenant""#).unwrap()).push(".users");
    assert_eq!(b.sql(), r#"SELECT 1 FROM "Tenant".users"#);
}

// ==================== Conditions ====================

#[test]
fn two_columns_same_value_dedup() {
    let cond = Condition::or(vec![
        Condition::equal(&col("users", "id"), "u1"),
        Condition::equal(&col("users", "organization_id"), "u1"),
    ]);
    let (sql, args) = cond.to_sql();

    assert_eq!(sql, "(users.id = $1 OR users.organization_id = $1)");
    assert_eq!(args, vec![Value::from("u1")]);
}

#[test]
fn single_child_group_has_no_parentheses() {
    let a = Condition::equal(&col("users", "id"), "u1");
    assert_eq!(render(&Condition::or(vec![a.clone()])), "users.id = $1");
    assert_eq!(render(&Condition::and(vec![a])), "users.id = $1");
}

#[test]
fn multi_child_groups_are_parenthesised() {
    let id = col("users", "id");
    let state = col("users", "state");
    let cond = Condition::and(vec![
        Condition::equal(&id, "u1"),
        Condition::or(vec![
            Condition::equal(&state, 1_i16),
            Condition::equal(&state, 2_i16),
        ]),
    ]);
    assert_eq!(
        render(&cond),
        "(users.id = $1 AND (users.state = $2 OR users.state = $3))"
    );
}

#[test]
fn empty_groups_render_nothing() {
    let id = col("users", "id");
    assert_eq!(render(&Condition::and(vec![])), "");
    assert_eq!(render(&Condition::or(vec![])), "");

    let cond = Condition::and(vec![
        Condition::or(vec![]),
        Condition::equal(&id, "u1"),
    ]);
    assert_eq!(render(&cond), "users.id = $1");

    let mut b = StatementBuilder::new("SELECT 1");
    b.push_where(&Condition::and(vec![Condition::or(vec![])]));
    assert_eq!(b.sql(), "SELECT 1");
}

#[test]
fn ignore_case_without_twin_lowers_both_sides() {
    let email = col("human_users", "email");
    assert_eq!(
        render(&Condition::equal_ignore_case(&email, "A@B.C")),
        "LOWER(human_users.email) = LOWER($1)"
    );
    assert_eq!(
        render(&Condition::not_equal_ignore_case(&email, "A@B.C")),
        "LOWER(human_users.email) <> LOWER($1)"
    );
}

#[test]
fn ignore_case_with_twin_uses_lower_column() {
    let username = col("users", "username").with_lower_twin();
    assert_eq!(
        render(&Condition::equal_ignore_case(&username, "Alice")),
        "users.username_lower = LOWER($1)"
    );
    assert_eq!(
        render(&Condition::equal(&username, "Alice")),
        "users.username = $1"
    );
}

#[test]
fn starts_with_appends_wildcard() {
    let name = col("users", "username");
    assert_eq!(
        render(&Condition::starts_with(&name, "ab")),
        "users.username LIKE $1 || '%'"
    );
    assert_eq!(
        render(&Condition::starts_with_ignore_case(&name, "ab")),
        "LOWER(users.username) LIKE LOWER($1) || '%'"
    );
}

#[test]
fn number_operators() {
    let attempts = col("human_users", "failed_password_attempts");
    let created = col("users", "created_at");
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    assert_eq!(
        render(&Condition::less_than(&attempts, 3_i16)),
        "human_users.failed_password_attempts < $1"
    );
    assert_eq!(
        render(&Condition::at_most(&attempts, 3_i16)),
        "human_users.failed_password_attempts <= $1"
    );
    assert_eq!(
        render(&Condition::greater_than(&created, at)),
        "users.created_at > $1"
    );
    let (sql, args) = Condition::at_least(&created, at).to_sql();
    assert_eq!(sql, "users.created_at >= $1");
    assert_eq!(args, vec![Value::Timestamp(at)]);
    assert_eq!(
        render(&Condition::not_equal(&attempts, 0_i16)),
        "human_users.failed_password_attempts <> $1"
    );
}

#[test]
fn list_operators() {
    let names = col("users", "login_names");
    assert_eq!(
        render(&Condition::not_contains_any(&names, vec!["a", "b"])),
        "NOT (users.login_names && $1)"
    );
    assert_eq!(
        render(&Condition::not_contains_all(&names, vec!["a"])),
        "NOT (users.login_names @> $1)"
    );
    assert_eq!(
        render(&Condition::contains_any(&names, vec!["a"])),
        "users.login_names && $1"
    );
    assert_eq!(
        render(&Condition::contains_all(&names, vec!["a"])),
        "users.login_names @> $1"
    );
    assert_eq!(
        render(&Condition::contained_by(&names, vec!["a"])),
        "users.login_names <@ $1"
    );
    let (sql, args) = Condition::list_equal(&names, vec!["a".to_string()]).to_sql();
    assert_eq!(sql, "users.login_names = $1");
    assert_eq!(args, vec![Value::TextArray(vec!["a".to_string()])]);
    assert_eq!(
        render(&Condition::list_not_equal(&names, vec!["a"])),
        "users.login_names <> $1"
    );
}

#[test]
fn boolean_null_and_membership() {
    let required = col("human_users", "password_change_required");
    let phone = col("human_users", "phone");
    let id = col("users", "id");

    assert_eq!(
        render(&Condition::is_true(&required)),
        "human_users.password_change_required IS TRUE"
    );
    assert_eq!(
        render(&Condition::boolean(&required, false.into())),
        "human_users.password_change_required IS FALSE"
    );
    assert_eq!(render(&Condition::is_null(&phone)), "human_users.phone IS NULL");
    assert_eq!(
        render(&Condition::is_not_null(&phone)),
        "human_users.phone IS NOT NULL"
    );
    let (sql, args) = Condition::in_list(&id, vec!["a", "b"]).to_sql();
    assert_eq!(sql, "users.id = ANY($1)");
    assert_eq!(
        args,
        vec![Value::TextArray(vec!["a".to_string(), "b".to_string()])]
    );
}

#[test]
fn columns_equal_renders_both_qualified() {
    let cond = Condition::columns_equal(&col("users", "id"), &col("human_users", "id"));
    let (sql, args) = cond.to_sql();
    assert_eq!(sql, "users.id = human_users.id");
    assert!(args.is_empty());
}

#[test]
fn restricting_column_detection() {
    let instance = col("users", "instance_id");
    let id = col("users", "id");

    assert!(Condition::equal(&instance, "i1").is_restricting_column(&instance));
    assert!(!Condition::equal(&instance, "i1").is_restricting_column(&id));
    assert!(!Condition::not_equal(&instance, "i1").is_restricting_column(&instance));
    assert!(
        Condition::and(vec![
            Condition::equal(&id, "u1"),
            Condition::equal(&instance, "i1"),
        ])
        .is_restricting_column(&instance)
    );
    assert!(
        Condition::or(vec![
            Condition::equal(&instance, "i1"),
            Condition::equal(&instance, "i2"),
        ])
        .is_restricting_column(&instance)
    );
    assert!(
        !Condition::or(vec![
            Condition::equal(&instance, "i1"),
            Condition::equal(&id, "u1"),
        ])
        .is_restricting_column(&instance)
    );
    assert!(!Condition::or(vec![]).is_restricting_column(&instance));
    assert!(Condition::in_list(&instance, vec!["i1"]).is_restricting_column(&instance));
}

// ==================== Changes ====================

#[test]
fn direct_changes() {
    let username = col("users", "username");
    let state = col("users", "state");
    let updated = col("users", "updated_at");
    let change = Change::many(vec![
        Change::new(&username, "alice"),
        Change::new(&state, 1_i16),
        Change::now(&updated),
        Change::to_null(&col("users", "nickname")),
        Change::new(&col("users", "avatar_key"), Option::<String>::None),
    ]);
    let (sql, args) = render_change(&change);

    assert_eq!(
        sql,
        "username = $1, state = $2, updated_at = NOW(), nickname = NULL, avatar_key = NULL"
    );
    assert_eq!(args, vec![Value::from("alice"), Value::SmallInt(1)]);
}

#[test]
fn increment_coalesces_null() {
    let attempts = col("human_users", "failed_password_attempts");
    let (sql, args) = render_change(&Change::increment(&attempts));
    assert_eq!(
        sql,
        "failed_password_attempts = COALESCE(human_users.failed_password_attempts, 0) + 1"
    );
    assert!(args.is_empty());
}

#[test]
fn json_single_field_patch() {
    let column = col("table", "column");
    let (sql, args) = render_change(&Change::json_set_field(&column, "path", &"value"));

    assert_eq!(
        sql,
        "column = jsonb_set_lax(table.column, '{path}', $1, true, 'delete_key')"
    );
    assert_eq!(args, vec![Value::Json(serde_json::json!("value"))]);
}

#[test]
fn json_chained_field_patches_nest_first_innermost() {
    let column = col("table", "column");
    let change: Change = JsonChange::new(&column)
        .set_field("path1", &1)
        .set_field("path2", &2)
        .into();
    let (sql, args) = render_change(&change);

    assert_eq!(
        sql,
        "column = jsonb_set_lax(jsonb_set_lax(table.column, '{path1}', $1, true, 'delete_key'), '{path2}', $2, true, 'delete_key')"
    );
    assert_eq!(
        args,
        vec![
            Value::Json(serde_json::json!(1)),
            Value::Json(serde_json::json!(2))
        ]
    );
}

#[test]
fn json_null_payload_deletes_key() {
    let column = col("users", "metadata");
    let (sql, args) = render_change(&Change::json_remove_field(&column, "k"));
    assert_eq!(
        sql,
        "metadata = jsonb_set_lax(users.metadata, '{k}', NULL, true, 'delete_key')"
    );
    assert!(args.is_empty());

    let none: Option<String> = None;
    let (sql, _) = render_change(&Change::json_set_field(&column, "k", &none));
    assert!(sql.contains("'{k}', NULL, true"));
}

#[test]
fn json_array_append_then_remove_nests_remove_outside() {
    let column = col("table", "column");
    let change: Change = JsonChange::new(&column)
        .array_append("a", &"x")
        .array_remove("b", &"y")
        .into();
    let (sql, args) = render_change(&change);

    assert_eq!(
        sql,
        "column = zitadel.jsonb_array_remove(zitadel.jsonb_array_append(table.column, $1, $2::TEXT), $3, $4::TEXT)"
    );
    assert_eq!(
        args,
        vec![
            Value::TextArray(vec!["a".to_string()]),
            Value::from("\"x\""),
            Value::TextArray(vec!["b".to_string()]),
            Value::from("\"y\""),
        ]
    );
}

#[test]
fn json_array_append_then_remove_on_same_path() {
    let column = col("users", "metadata");
    let change: Change = JsonChange::new(&column)
        .array_append("roles", &"editor")
        .array_remove("roles", &"viewer")
        .into();
    let (sql, args) = render_change(&change);

    assert_eq!(
        sql,
        "metadata = zitadel.jsonb_array_remove(zitadel.jsonb_array_append(users.metadata, $1, $2::TEXT), $1, $3::TEXT)"
    );
    assert_eq!(
        args,
        vec![
            Value::TextArray(vec!["roles".to_string()]),
            Value::from("\"editor\""),
            Value::from("\"viewer\""),
        ]
    );

    // Removing the element just appended binds it once as well.
    let change: Change = JsonChange::new(&column)
        .array_append("roles", &"editor")
        .array_remove("roles", &"editor")
        .into();
    let (sql, args) = render_change(&change);
    assert!(sql.ends_with("$1, $2::TEXT), $1, $2::TEXT)"));
    assert_eq!(args.len(), 2);
}

#[derive(Debug)]
struct AuditInsert;

impl CteStatement for AuditInsert {
    fn write_cte(&self, builder: &mut StatementBuilder, source: &'static str) -> DbResult<()> {
        builder.push("INSERT INTO audit (id) SELECT id FROM ").push(source);
        Ok(())
    }
}

#[test]
fn carried_statements_assign_nothing() {
    let state = col("users", "state");
    let change = Change::many(vec![Change::cte(AuditInsert), Change::new(&state, "locked")]);

    let (sql, _) = render_change(&change);
    assert_eq!(sql, "state = $1");
    assert_eq!(change.columns(), vec![&state]);
    assert_eq!(change.ctes().len(), 1);

    let mut b = StatementBuilder::new("WITH ");
    change.ctes()[0].write_cte(&mut b, "src").unwrap();
    assert_eq!(b.sql(), "WITH INSERT INTO audit (id) SELECT id FROM src");

    let only = Change::cte(AuditInsert);
    assert!(!only.is_empty());
    assert!(!only.is_on_column(&state));
    assert!(only.columns().is_empty());
    let mut b = StatementBuilder::empty();
    assert!(matches!(only.write(&mut b), Err(DbError::NoChanges)));
}

#[test]
fn columns_flatten_batches_and_skip_empty_json() {
    let a = col("t", "a");
    let doc = col("t", "doc");
    let change = Change::many(vec![
        Change::increment(&a),
        Change::many(vec![JsonChange::new(&doc).into()]),
        Change::json_set_field(&col("u", "doc"), "k", &1),
    ]);
    let tables: Vec<&str> = change.columns().iter().map(|c| c.table()).collect();
    assert_eq!(tables, vec!["t", "u"]);
}

#[test]
fn json_changes_on_same_column_merge_in_batch() {
    let metadata = col("users", "metadata");
    let state = col("users", "state");
    let change = Change::many(vec![
        Change::json_set_field(&metadata, "a", &1),
        Change::new(&state, 2_i16),
        Change::json_set_field(&metadata, "b", &true),
    ]);
    let (sql, _) = render_change(&change);

    assert_eq!(
        sql,
        "metadata = jsonb_set_lax(jsonb_set_lax(users.metadata, '{a}', $1, true, 'delete_key'), '{b}', $2, true, 'delete_key'), state = $3"
    );
}

#[test]
fn json_path_literal_is_escaped() {
    let column = col("users", "metadata");
    let (sql, _) = render_change(&Change::json_set_field(
        &column,
        ["a b", "it's", "null", "x\"y"],
        &0,
    ));
    assert_eq!(
        sql,
        r#"metadata = jsonb_set_lax(users.metadata, '{"a b",it''s,"null","x\"y"}', $1, true, 'delete_key')"#
    );
}

#[test]
fn mixed_json_chain_is_rejected() {
    let column = col("users", "metadata");
    let change: Change = JsonChange::new(&column)
        .set_field("a", &1)
        .array_append("b", &2)
        .into();
    let mut b = StatementBuilder::new("UPDATE users SET ");
    let err = change.write(&mut b).unwrap_err();

    assert!(matches!(err, DbError::MixedJsonChange { ref column } if column == "users.metadata"));
    assert_eq!(b.sql(), "UPDATE users SET ");
}

struct Unserializable;

impl Serialize for Unserializable {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("not representable"))
    }
}

#[test]
fn json_encoding_failure_aborts_render() {
    let column = col("users", "metadata");
    let change = Change::many(vec![
        Change::new(&col("users", "state"), 1_i16),
        Change::json_set_field(&column, "a", &Unserializable),
    ]);
    let mut b = StatementBuilder::empty();
    let err = change.write(&mut b).unwrap_err();

    assert!(matches!(err, DbError::Serialization(_)));
    assert_eq!(b.sql(), "");
    assert!(b.args().is_empty());
}

#[test]
fn empty_change_list_is_rejected() {
    let mut b = StatementBuilder::empty();
    assert!(matches!(
        Change::many(vec![]).write(&mut b),
        Err(DbError::NoChanges)
    ));
    assert!(matches!(
        write_changes(&mut b, &[Change::from(JsonChange::new(&col("users", "metadata")))]),
        Err(DbError::NoChanges)
    ));
}

#[test]
fn change_targets_column() {
    let updated = col("users", "updated_at");
    let change = Change::many(vec![
        Change::new(&col("users", "state"), 1_i16),
        Change::many(vec![Change::now(&updated)]),
    ]);
    assert!(change.is_on_column(&updated));
    assert!(!change.is_on_column(&col("users", "username")));
}

// ==================== QueryOpts ====================

#[test]
fn pagination_limit_only() {
    let mut b = StatementBuilder::new("SELECT 1");
    QueryOpts::new().limit(10).offset(0).write(&mut b);
    assert_eq!(b.sql(), "SELECT 1 LIMIT $1");
    assert_eq!(b.args(), &[Value::BigInt(10)]);
}

#[test]
fn pagination_offset_only() {
    let mut b = StatementBuilder::new("SELECT 1");
    QueryOpts::new().limit(0).offset(10).write(&mut b);
    assert_eq!(b.sql(), "SELECT 1 OFFSET $1");
    assert_eq!(b.args(), &[Value::BigInt(10)]);
}

#[test]
fn pagination_none() {
    let mut b = StatementBuilder::new("SELECT 1");
    QueryOpts::new().write(&mut b);
    assert_eq!(b.sql(), "SELECT 1");
    assert!(b.args().is_empty());
}

#[test]
fn query_opts_full() {
    let id = col("users", "id");
    let created = col("users", "created_at");
    let mut b = StatementBuilder::new("SELECT users.id FROM zitadel.users AS users");
    QueryOpts::new()
        .condition(Condition::equal(&id, "u1"))
        .order_by_desc(&created)
        .order_by(&id)
        .limit(5)
        .offset(5)
        .write(&mut b);

    assert_eq!(
        b.sql(),
        "SELECT users.id FROM zitadel.users AS users WHERE users.id = $1 ORDER BY users.created_at DESC, users.id LIMIT $2 OFFSET $2"
    );
    assert_eq!(b.args(), &[Value::from("u1"), Value::BigInt(5)]);
}
