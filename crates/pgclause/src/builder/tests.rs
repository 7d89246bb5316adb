//! Tests for the query builder.

use crate::builder::{
    Cmp, Connector, FetchMode, Fetched, GroupOp, JoinKind, Membership, Operand, QueryBuilder,
    SortDir, Written,
};
use crate::client::GenericClient;
use crate::error::{DbError, DbResult};
use crate::named::Bindings;
use crate::row::Record;
use crate::value::Value;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use tokio_postgres::types::ToSql;

#[derive(Debug, Clone)]
struct Call {
    method: &'static str,
    sql: String,
    params: Vec<String>,
}

/// Records every statement and replays canned rows.
#[derive(Default)]
struct RecordingClient {
    calls: Mutex<Vec<Call>>,
    rows: Mutex<VecDeque<Vec<Record>>>,
    affected: u64,
    fail: bool,
}

impl RecordingClient {
    fn with_rows(rows: Vec<Record>) -> Self {
        let client = Self::default();
        client.rows.lock().unwrap().push_back(rows);
        client
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn record(&self, method: &'static str, sql: &str, params: &[&(dyn ToSql + Sync)]) {
        self.calls.lock().unwrap().push(Call {
            method,
            sql: sql.to_string(),
            params: params.iter().map(|p| format!("{:?}", p)).collect(),
        });
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl GenericClient for RecordingClient {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<Vec<Record>> {
        self.record("query", sql, params);
        if self.fail {
            return Err(DbError::Other("boom".to_string()));
        }
        Ok(self.rows.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        self.record("execute", sql, params);
        if self.fail {
            return Err(DbError::Other("boom".to_string()));
        }
        Ok(self.affected)
    }
}

fn record(pairs: &[(&str, Value)]) -> Record {
    pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
}

// ==================== SQL generation ====================

#[test]
fn test_select_single_equality() {
    let mut qb = QueryBuilder::new();
    qb.set_table("users")
        .add_where("id", 5, Connector::None)
        .set_fetch_mode(FetchMode::Single);

    let compiled = qb.build_select("*").unwrap();
    assert_eq!(compiled.sql(), "SELECT * FROM users WHERE  id = :id0");
    assert_eq!(compiled.bindings(), &Bindings::new().with(":id0", 5));
}

#[test]
fn test_select_without_predicates_has_no_where() {
    let mut qb = QueryBuilder::with_table("users");
    let compiled = qb.build_select("id, email").unwrap();
    assert_eq!(compiled.sql(), "SELECT id, email FROM users");
    assert!(compiled.bindings().is_empty());
}

#[test]
fn test_blank_select_expression_defaults_to_star() {
    let mut qb = QueryBuilder::with_table("users");
    assert_eq!(qb.build_select("  ").unwrap().sql(), "SELECT * FROM users");
}

#[test]
fn test_mixed_predicates_share_one_where() {
    let mut qb = QueryBuilder::with_table("t");
    qb.add_where("id", 1, Connector::None)
        .add_where_in("status", ["a", "b"], Membership::In, Connector::And)
        .start_group("g", Connector::And);
    qb.add_to_group("g", "x", Cmp::Eq, 1, Connector::None)
        .unwrap()
        .add_to_group("g", "y", Membership::In, vec![1, 2], Connector::Or)
        .unwrap();

    let compiled = qb.build_select("*").unwrap();
    assert_eq!(
        compiled.sql(),
        "SELECT * FROM t WHERE  id = :id0 AND status IN (:status1win0,:status1win1) \
         AND ( x = :g0 OR y IN (:g1gwin0,:g1gwin1) )"
    );
    assert_eq!(compiled.sql().matches("WHERE").count(), 1);
    assert_eq!(compiled.bindings().len(), 6);
}

#[test]
fn test_group_only_still_emits_where() {
    let mut qb = QueryBuilder::with_table("t");
    qb.start_group("only", Connector::None);
    qb.add_to_group("only", "a", Cmp::Gt, 3, Connector::None)
        .unwrap();

    let compiled = qb.build_select("*").unwrap();
    assert_eq!(compiled.sql(), "SELECT * FROM t WHERE  ( a > :only0 )");
}

#[test]
fn test_where_in_expands_each_value() {
    let mut qb = QueryBuilder::with_table("posts");
    qb.add_where_in("tag", vec!["x", "y", "z"], Membership::In, Connector::None);

    let compiled = qb.build_select("*").unwrap();
    assert_eq!(
        compiled.sql(),
        "SELECT * FROM posts WHERE  tag IN (:tag0win0,:tag0win1,:tag0win2)"
    );
    let names: Vec<&str> = compiled.bindings().names().collect();
    assert_eq!(names, vec!["tag0win0", "tag0win1", "tag0win2"]);
    let values: Vec<&Value> = compiled.bindings().values().collect();
    assert_eq!(
        values,
        vec![&Value::from("x"), &Value::from("y"), &Value::from("z")]
    );
}

#[test]
fn test_empty_where_in_matches_nothing() {
    let mut qb = QueryBuilder::with_table("t");
    qb.add_where_in("id", Vec::<i64>::new(), Membership::In, Connector::None);

    let compiled = qb.build_select("*").unwrap();
    assert_eq!(compiled.sql(), "SELECT * FROM t WHERE  FALSE");
    assert!(compiled.bindings().is_empty());
    assert!(compiled.to_positional().is_ok());
}

#[test]
fn test_empty_where_not_in_matches_everything() {
    let mut qb = QueryBuilder::with_table("t");
    qb.add_where("team", "red", Connector::None)
        .add_where_in("id", Vec::<i64>::new(), Membership::NotIn, Connector::And)
        .add_where_in("tag", ["a"], Membership::In, Connector::Or);

    let compiled = qb.build_select("*").unwrap();
    assert_eq!(
        compiled.sql(),
        "SELECT * FROM t WHERE  team = :team0 AND TRUE OR tag IN (:tag2win0)"
    );
    assert_eq!(compiled.bindings().len(), 2);
    assert!(compiled.to_positional().is_ok());
}

#[test]
fn test_empty_group_membership_reduces_to_constant() {
    let mut qb = QueryBuilder::with_table("t");
    qb.start_group("g", Connector::None);
    qb.add_to_group("g", "id", Membership::NotIn, Vec::<i64>::new(), Connector::None)
        .unwrap()
        .add_to_group("g", "id", Membership::In, Vec::<i64>::new(), Connector::Or)
        .unwrap()
        .add_to_group("g", "a", Cmp::Eq, 1, Connector::And)
        .unwrap();

    let compiled = qb.build_select("*").unwrap();
    assert_eq!(
        compiled.sql(),
        "SELECT * FROM t WHERE  ( TRUE OR FALSE AND a = :g2 )"
    );
    assert_eq!(compiled.bindings().len(), 1);
}

#[test]
fn test_or_group_renders_parenthesized() {
    let mut qb = QueryBuilder::with_table("users");
    qb.add_where("status", "active", Connector::None)
        .start_group("g", Connector::Or);
    qb.add_to_group("g", "role", Cmp::Eq, "admin", Connector::None)
        .unwrap();
    qb.add_to_group("g", "age", Cmp::Gt, 30, Connector::And)
        .unwrap();

    let compiled = qb.build_select("*").unwrap();
    assert_eq!(
        compiled.sql(),
        "SELECT * FROM users WHERE  status = :status0 OR ( role = :g0 AND age > :g1 )"
    );
}

#[test]
fn test_unknown_group_fails_fast() {
    let mut qb = QueryBuilder::with_table("users");
    let err = qb
        .add_to_group("never", "a", Cmp::Eq, 1, Connector::None)
        .unwrap_err();
    assert!(matches!(err, DbError::UnknownGroup(ref k) if k == "never"));
    assert!(err.is_misuse());
}

#[test]
fn test_empty_group_is_rejected_at_compile() {
    let mut qb = QueryBuilder::with_table("users");
    qb.start_group("g", Connector::None);
    let err = qb.build_select("*").unwrap_err();
    assert!(matches!(err, DbError::InvalidClause(_)));
}

#[test]
fn test_comparison_with_list_is_rejected() {
    let mut qb = QueryBuilder::with_table("users");
    qb.start_group("g", Connector::None);
    let err = qb
        .add_to_group("g", "a", Cmp::Eq, vec![1, 2], Connector::None)
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidClause(_)));
}

#[test]
fn test_membership_with_single_value_becomes_list() {
    let mut qb = QueryBuilder::with_table("t");
    qb.start_group("g", Connector::None);
    qb.add_to_group("g", "a", Membership::NotIn, 9, Connector::None)
        .unwrap();
    assert_eq!(
        qb.build_select("*").unwrap().sql(),
        "SELECT * FROM t WHERE  ( a NOT IN (:g0gwin0) )"
    );
}

#[test]
fn test_restarting_group_keeps_position() {
    let mut qb = QueryBuilder::with_table("t");
    qb.start_group("first", Connector::None);
    qb.add_to_group("first", "a", Cmp::Eq, 1, Connector::None)
        .unwrap();
    qb.start_group("second", Connector::Or);
    qb.add_to_group("second", "b", Cmp::Eq, 2, Connector::None)
        .unwrap();
    qb.start_group("first", Connector::None);
    qb.add_to_group("first", "c", Cmp::Eq, 3, Connector::None)
        .unwrap();

    assert_eq!(
        qb.build_select("*").unwrap().sql(),
        "SELECT * FROM t WHERE  ( c = :first0 ) OR ( b = :second0 )"
    );
}

#[test]
fn test_joins_render_in_declaration_order() {
    let mut qb = QueryBuilder::with_table("templates");
    qb.add_join(
        JoinKind::Left,
        "template_links",
        "template_links.template_id = templates.id",
    )
    .add_join(JoinKind::Inner, "users u", "u.id = templates.user_id")
    .add_where("templates.id", "1", Connector::None)
    .add_order_by("template_links.title", SortDir::Asc);

    let compiled = qb.build_select("templates.*").unwrap();
    assert_eq!(
        compiled.sql(),
        "SELECT templates.* FROM templates \
         LEFT JOIN template_links ON ( template_links.template_id = templates.id ) \
         INNER JOIN users u ON ( u.id = templates.user_id ) \
         WHERE  templates.id = :templatesid0 ORDER BY template_links.title ASC"
    );
}

#[test]
fn test_group_by_order_by_limit() {
    let mut qb = QueryBuilder::with_table("orders");
    qb.set_limit(10, 20)
        .add_order_by("total", SortDir::Desc)
        .add_group_by("customer_id");

    let compiled = qb
        .build_select("customer_id, SUM(total) AS total")
        .unwrap();
    assert_eq!(
        compiled.sql(),
        "SELECT customer_id, SUM(total) AS total FROM orders \
         GROUP BY customer_id ORDER BY total DESC LIMIT 10 OFFSET 20"
    );
}

#[test]
fn test_comparison_operators() {
    let mut qb = QueryBuilder::with_table("t");
    qb.add_where_cmp("a", Cmp::Gte, 1, Connector::None)
        .add_where_cmp("b", Cmp::ILike, "%x%", Connector::Or)
        .add_where_cmp("c", Cmp::Ne, Value::Null, Connector::And);
    assert_eq!(
        qb.build_select("*").unwrap().sql(),
        "SELECT * FROM t WHERE  a >= :a0 OR b ILIKE :b1 AND c != :c2"
    );
}

#[test]
fn test_insert_binds_columns_in_order() {
    let mut qb = QueryBuilder::with_table("t");
    let compiled = qb.build_insert([("a", 1), ("b", 2)]).unwrap();
    assert_eq!(compiled.sql(), "INSERT INTO t(a,b) VALUES (:a,:b)");
    let pairs: Vec<(&str, &Value)> = compiled.bindings().iter().collect();
    assert_eq!(pairs, vec![("a", &Value::Int(1)), ("b", &Value::Int(2))]);
}

#[test]
fn test_insert_with_returning() {
    let mut qb = QueryBuilder::with_table("users");
    qb.set_returning("id");
    let compiled = qb.build_insert([("email", "a@example.com")]).unwrap();
    assert_eq!(
        compiled.sql(),
        "INSERT INTO users(email) VALUES (:email) RETURNING id"
    );
}

#[test]
fn test_insert_rejects_empty_and_duplicate_columns() {
    let mut qb = QueryBuilder::with_table("t");
    let err = qb.build_insert(Vec::<(&str, i32)>::new()).unwrap_err();
    assert!(matches!(err, DbError::InvalidClause(_)));

    qb.set_table("t");
    let err = qb.build_insert([("a", 1), ("a", 2)]).unwrap_err();
    assert!(err.to_string().contains("more than once"));
}

#[test]
fn test_update_uses_full_where_section() {
    let mut qb = QueryBuilder::with_table("users");
    qb.add_where("id", 7, Connector::None)
        .add_where_in("role", ["guest"], Membership::NotIn, Connector::And)
        .start_group("recent", Connector::And);
    qb.add_to_group("recent", "last_seen", Cmp::Gt, "2024-01-01", Connector::None)
        .unwrap();

    let compiled = qb
        .build_update([("name", Value::from("bob")), ("active", Value::from(true))])
        .unwrap();
    assert_eq!(
        compiled.sql(),
        "UPDATE users SET name = :name, active = :active WHERE  id = :id0 \
         AND role NOT IN (:role1win0) AND ( last_seen > :recent0 )"
    );
    assert_eq!(compiled.bindings().len(), 5);
}

#[test]
fn test_update_set_and_where_never_collide() {
    let mut qb = QueryBuilder::with_table("t");
    qb.add_where("id", 2, Connector::None);
    let compiled = qb.build_update([("id0", 1)]).unwrap();
    assert_eq!(compiled.sql(), "UPDATE t SET id0 = :id0 WHERE  id = :id0_1");
    assert_eq!(compiled.bindings().get("id0_1"), Some(&Value::Int(2)));
}

#[test]
fn test_delete_with_where() {
    let mut qb = QueryBuilder::with_table("sessions");
    qb.add_where_cmp("expires_at", Cmp::Lt, "2024-01-01 00:00:00", Connector::None);
    assert_eq!(
        qb.build_delete().unwrap().sql(),
        "DELETE FROM sessions WHERE  expires_at < :expires_at0"
    );
}

#[test]
fn test_delete_without_where_targets_table() {
    let mut qb = QueryBuilder::with_table("sessions");
    assert_eq!(qb.build_delete().unwrap().sql(), "DELETE FROM sessions");
}

#[test]
fn test_placeholder_stems_are_sanitized() {
    let mut qb = QueryBuilder::with_table("t");
    qb.add_where("LOWER(u.email)", "a", Connector::None)
        .add_where("\"2nd\"", 1, Connector::And)
        .add_where("!!", 1, Connector::And);
    assert_eq!(
        qb.build_select("*").unwrap().sql(),
        "SELECT * FROM t WHERE  LOWER(u.email) = :LOWERuemail0 AND \"2nd\" = :p2nd1 AND !! = :p2"
    );
}

// ==================== Placeholder uniqueness ====================

#[test]
fn test_placeholders_unique_under_repetition() {
    for n in 0..15 {
        let mut qb = QueryBuilder::with_table("t");
        qb.add_where("a1", 0, Connector::None);
        for i in 0..n {
            qb.add_where("a", i, Connector::And);
        }
        qb.add_where_in("a", [1, 2], Membership::In, Connector::And)
            .start_group("a", Connector::Or);
        qb.add_to_group("a", "a", Cmp::Eq, 1, Connector::None)
            .unwrap();
        qb.add_to_group("a", "a.b", Membership::In, vec![1, 2, 3], Connector::And)
            .unwrap();

        let compiled = qb.build_select("*").unwrap();
        let expected = 1 + n as usize + 2 + 1 + 3;
        let distinct: HashSet<&str> = compiled.bindings().names().collect();
        assert_eq!(compiled.bindings().len(), expected);
        assert_eq!(distinct.len(), expected);

        let positional = compiled.to_positional().unwrap();
        assert_eq!(positional.params.len(), expected);
        assert!(!positional.sql.contains(':'));
    }
}

#[test]
fn test_colliding_stems_get_suffix() {
    let mut qb = QueryBuilder::with_table("t");
    qb.add_where("a1", 0, Connector::None);
    for i in 1..=10 {
        qb.add_where("a", i, Connector::And);
    }
    let compiled = qb.build_select("*").unwrap();
    assert!(compiled.sql().contains("a1 = :a10 "));
    assert!(compiled.sql().ends_with("a = :a10_1"));
    assert_eq!(compiled.bindings().get("a10"), Some(&Value::Int(0)));
    assert_eq!(compiled.bindings().get("a10_1"), Some(&Value::Int(10)));
}

// ==================== Reset semantics ====================

#[test]
fn test_build_resets_state() {
    let mut qb = QueryBuilder::with_table("users");
    qb.add_where("id", 1, Connector::None)
        .set_fetch_mode(FetchMode::Multi);
    qb.build_select("*").unwrap();

    assert!(qb.is_empty());
    assert_eq!(qb.fetch_mode(), FetchMode::None);
    let err = qb.build_select("*").unwrap_err();
    assert!(matches!(err, DbError::MissingTable("SELECT")));
}

#[test]
fn test_failed_compile_still_resets() {
    let mut qb = QueryBuilder::with_table("users");
    qb.add_where("id", 1, Connector::None);
    assert!(qb.build_update(Vec::<(&str, i32)>::new()).is_err());
    assert!(qb.is_empty());
}

#[test]
fn test_preview_does_not_reset() {
    let mut qb = QueryBuilder::with_table("users");
    qb.add_where("id", 1, Connector::None);
    let preview = qb.preview_select("*").unwrap();
    assert_eq!(preview, qb.build_select("*").unwrap());
}

#[test]
fn test_missing_table_for_every_statement() {
    let mut qb = QueryBuilder::new();
    assert!(matches!(qb.build_select("*"), Err(DbError::MissingTable("SELECT"))));
    assert!(matches!(qb.build_insert([("a", 1)]), Err(DbError::MissingTable("INSERT"))));
    assert!(matches!(qb.build_update([("a", 1)]), Err(DbError::MissingTable("UPDATE"))));
    assert!(matches!(qb.build_delete(), Err(DbError::MissingTable("DELETE"))));

    qb.set_table("   ");
    assert!(matches!(qb.build_delete(), Err(DbError::MissingTable("DELETE"))));
}

// ==================== Parsing ====================

#[test]
fn test_parse_clause_keywords() {
    assert_eq!("left".parse::<JoinKind>().unwrap(), JoinKind::Left);
    assert_eq!("and".parse::<Connector>().unwrap(), Connector::And);
    assert_eq!("".parse::<Connector>().unwrap(), Connector::None);
    assert_eq!("not  in".parse::<Membership>().unwrap(), Membership::NotIn);
    assert_eq!("<>".parse::<Cmp>().unwrap(), Cmp::Ne);
    assert_eq!("desc".parse::<SortDir>().unwrap(), SortDir::Desc);
    assert_eq!("single".parse::<FetchMode>().unwrap(), FetchMode::Single);
    assert_eq!(
        "IN".parse::<GroupOp>().unwrap(),
        GroupOp::Member(Membership::In)
    );
    assert_eq!(">=".parse::<GroupOp>().unwrap(), GroupOp::Cmp(Cmp::Gte));
    assert!("XOR".parse::<Connector>().is_err());
    assert!("= 1; DROP TABLE".parse::<Cmp>().is_err());
}

#[test]
fn test_operand_conversions() {
    assert_eq!(Operand::from(3), Operand::One(Value::Int(3)));
    assert_eq!(
        Operand::from(vec!["a", "b"]),
        Operand::Many(vec![Value::from("a"), Value::from("b")])
    );
    assert_eq!(Operand::from(None::<i32>), Operand::One(Value::Null));
}

// ==================== Execution ====================

#[tokio::test]
async fn test_select_single_returns_none_when_no_row() {
    let client = RecordingClient::default();
    let mut qb = QueryBuilder::with_table("users");
    qb.add_where("id", 5, Connector::None)
        .set_fetch_mode(FetchMode::Single);

    let fetched = qb.select(&client, "*").await.unwrap();
    assert_eq!(fetched, Fetched::One(None));

    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].sql, "SELECT * FROM users WHERE  id = $1");
    assert_eq!(calls[0].params, vec!["Int(5)".to_string()]);
    assert!(qb.is_empty());
}

#[tokio::test]
async fn test_select_multi_returns_rows() {
    let rows = vec![
        record(&[("id", Value::Int(1)), ("title", Value::from("a"))]),
        record(&[("id", Value::Int(2)), ("title", Value::from("b"))]),
    ];
    let client = RecordingClient::with_rows(rows.clone());
    let mut qb = QueryBuilder::with_table("templates");
    qb.set_fetch_mode(FetchMode::Multi);

    let fetched = qb.select(&client, "*").await.unwrap();
    assert_eq!(fetched.many(), rows);
}

#[tokio::test]
async fn test_select_without_fetch_mode_returns_rows() {
    let client = RecordingClient::with_rows(vec![record(&[("n", Value::Int(1))])]);
    let mut qb = QueryBuilder::with_table("t");
    let fetched = qb.select(&client, "1 AS n").await.unwrap();
    assert!(matches!(fetched, Fetched::Many(ref rows) if rows.len() == 1));
}

#[tokio::test]
async fn test_insert_returning_id() {
    let client = RecordingClient::with_rows(vec![record(&[("id", Value::Int(42))])]);
    let mut qb = QueryBuilder::with_table("users");
    qb.set_returning("id");

    let written = qb
        .insert(&client, [("name", "alice"), ("email", "alice@example.com")])
        .await
        .unwrap();
    assert_eq!(
        written,
        Written {
            rows_affected: 1,
            inserted_id: Some(Value::Int(42)),
        }
    );

    let calls = client.calls();
    assert_eq!(calls[0].method, "query");
    assert_eq!(
        calls[0].sql,
        "INSERT INTO users(name,email) VALUES ($1,$2) RETURNING id"
    );
}

#[tokio::test]
async fn test_insert_without_returning_executes() {
    let client = RecordingClient {
        affected: 1,
        ..RecordingClient::default()
    };
    let mut qb = QueryBuilder::with_table("users");
    let written = qb.insert(&client, [("name", "alice")]).await.unwrap();
    assert_eq!(written.rows_affected, 1);
    assert_eq!(written.inserted_id, None);
    assert_eq!(client.calls()[0].method, "execute");
}

#[tokio::test]
async fn test_update_and_delete_report_affected_rows() {
    let client = RecordingClient {
        affected: 3,
        ..RecordingClient::default()
    };
    let mut qb = QueryBuilder::with_table("users");
    qb.add_where("team", "red", Connector::None);
    let written = qb.update(&client, [("active", false)]).await.unwrap();
    assert_eq!(written.rows_affected, 3);

    qb.set_table("users")
        .add_where_in("id", [1, 2, 3], Membership::In, Connector::None);
    let written = qb.delete(&client).await.unwrap();
    assert_eq!(written.rows_affected, 3);

    let calls = client.calls();
    assert_eq!(calls[0].sql, "UPDATE users SET active = $1 WHERE  team = $2");
    assert_eq!(calls[1].sql, "DELETE FROM users WHERE  id IN ($1,$2,$3)");
    assert_eq!(calls[1].params, vec!["Int(1)", "Int(2)", "Int(3)"]);
}

#[tokio::test]
async fn test_custom_statement_uses_fetch_mode() {
    let client = RecordingClient {
        affected: 2,
        ..RecordingClient::default()
    };
    let mut qb = QueryBuilder::new();
    let bindings = Bindings::new().with(":cutoff", 30);

    let fetched = qb
        .custom(
            &client,
            "DELETE FROM sessions WHERE age > :cutoff",
            bindings.clone(),
        )
        .await
        .unwrap();
    assert_eq!(
        fetched.written(),
        Some(Written {
            rows_affected: 2,
            inserted_id: None
        })
    );

    client
        .rows
        .lock()
        .unwrap()
        .push_back(vec![record(&[("id", Value::Int(9))])]);
    qb.set_fetch_mode(FetchMode::Single);
    let fetched = qb
        .custom(&client, "SELECT id FROM sessions WHERE age > :cutoff", bindings)
        .await
        .unwrap();
    assert_eq!(fetched.one().and_then(|r| r.get("id").cloned()), Some(Value::Int(9)));
    assert_eq!(qb.fetch_mode(), FetchMode::None);
}

#[tokio::test]
async fn test_custom_statement_rejects_unbound_placeholder() {
    let client = RecordingClient::default();
    let mut qb = QueryBuilder::new();
    let err = qb
        .custom(&client, "SELECT * FROM t WHERE id = :id", Bindings::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Binding(_)));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_failed_execution_resets_state() {
    let client = RecordingClient::failing();
    let mut qb = QueryBuilder::with_table("users");
    qb.add_where("id", 1, Connector::None)
        .set_fetch_mode(FetchMode::Single);

    assert!(qb.select(&client, "*").await.is_err());
    assert!(qb.is_empty());

    // A second terminating call must not replay the previous statement.
    let err = qb.select(&client, "*").await.unwrap_err();
    assert!(matches!(err, DbError::MissingTable(_)));
    assert_eq!(client.calls().len(), 1);
}
