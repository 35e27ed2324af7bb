//! Integration tests for the mysql-mimic connection pipeline.
//!
//! These drive [`Connection`]s end to end against an in-memory backend that records what it is
//! sent.
//!
//! Run with: cargo test --package mimic-proxy --test integration_tests

use async_trait::async_trait;
use mimic_core::{MimicConfig, ResultSet, Value};
use mimic_proxy::{Connection, MimicProxy, ProxyError, Session};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Recorded {
    queries: Vec<String>,
    attributes: Vec<HashMap<String, String>>,
    sets: Vec<Vec<(String, Value)>>,
}

/// Backend that answers every statement with its own SQL. Statements mentioning `fail`, and SETs
/// of a value mentioning it, are rejected.
#[derive(Clone, Default)]
struct MockBackend {
    recorded: Arc<Mutex<Recorded>>,
}

impl MockBackend {
    fn queries(&self) -> Vec<String> {
        self.recorded.lock().unwrap().queries.clone()
    }

    fn sets(&self) -> Vec<Vec<(String, Value)>> {
        self.recorded.lock().unwrap().sets.clone()
    }
}

#[async_trait]
impl Session for MockBackend {
    async fn query(
        &self,
        sql: &str,
        attributes: &HashMap<String, String>,
    ) -> anyhow::Result<ResultSet> {
        {
            let mut recorded = self.recorded.lock().unwrap();
            recorded.queries.push(sql.to_string());
            recorded.attributes.push(attributes.clone());
        }
        tokio::task::yield_now().await;

        if sql.contains("fail") {
            anyhow::bail!("backend exploded");
        }
        Ok(ResultSet::new(
            vec!["sql".to_string()],
            vec![vec![Value::from(sql)]],
        ))
    }

    async fn set(&self, changed: &[(String, Value)]) -> anyhow::Result<()> {
        self.recorded.lock().unwrap().sets.push(changed.to_vec());
        if changed.iter().any(|(_, value)| value.to_string().contains("fail")) {
            anyhow::bail!("backend refused SET");
        }
        Ok(())
    }
}

fn proxy() -> MimicProxy {
    let config = MimicConfig::from_yaml(
        r#"
server:
  default_database: shop
schema:
  shop:
    users:
      id: {type: INT, is_nullable: false}
      name: {type: TEXT, comment: "display name"}
    orders:
      id: INT
      user_id: INT
  crm:
    leads:
      id: INT
"#,
    )
    .unwrap();
    MimicProxy::from_config(&config).unwrap()
}

async fn connect(proxy: &MimicProxy) -> Connection<MockBackend> {
    proxy
        .connect(MockBackend::default(), Some("alice"), None)
        .await
        .unwrap()
}

fn first_column(result: &ResultSet) -> Vec<String> {
    result.rows.iter().map(|row| row[0].to_string()).collect()
}

#[tokio::test]
async fn test_forward_rewrites_builtins_and_keeps_other_hints() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;

    let results = conn
        .handle_query(
            "SELECT /*+ SET_VAR(sql_mode='TRADITIONAL') BKA(t) */ @@sql_mode, CONNECTION_ID() FROM t",
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(
        conn.session().queries(),
        vec!["SELECT /*+ BKA(t) */ 'TRADITIONAL' AS `@@sql_mode`, 1 AS `CONNECTION_ID()` FROM t"]
    );
    assert_eq!(
        conn.variables().get("sql_mode").unwrap(),
        Value::from("ANSI")
    );
}

#[tokio::test]
async fn test_hint_text_in_literal_forwarded_unchanged() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;

    conn.handle_query("SELECT '/*+ BKA(t) */' AS s FROM t; SELECT /*+ BKA(t) */ 1 FROM t")
        .await
        .unwrap();
    assert_eq!(
        conn.session().queries(),
        vec![
            "SELECT '/*+ BKA(t) */' AS s FROM t",
            "SELECT /*+ BKA(t) */ 1 FROM t",
        ]
    );
}

#[tokio::test]
async fn test_union_branches_keep_builtin_names() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;

    conn.handle_query("SELECT VERSION() UNION SELECT VERSION()")
        .await
        .unwrap();
    assert_eq!(
        conn.session().queries(),
        vec!["SELECT '8.0.29' AS `VERSION()` UNION SELECT '8.0.29' AS `VERSION()`"]
    );
}

#[tokio::test]
async fn test_hints_restored_after_backend_failure() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;

    let err = conn
        .handle_query("SELECT /*+ SET_VAR(wait_timeout=5) */ fail FROM t")
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::Backend(_)));
    assert_eq!(err.code(), 1105);
    assert_eq!(
        conn.variables().get("wait_timeout").unwrap(),
        Value::Int(28_800)
    );

    // The connection stays usable.
    let results = conn.handle_query("SELECT @@wait_timeout").await.unwrap();
    assert_eq!(
        results[0].rows[0][0],
        Value::from("SELECT 28800 AS `@@wait_timeout`")
    );
}

#[tokio::test]
async fn test_hints_restored_after_cancellation() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;

    {
        let statement = conn.handle_query("SELECT /*+ SET_VAR(wait_timeout=5) */ a FROM t");
        futures::pin_mut!(statement);
        // The backend yields once, so the first poll leaves the statement in flight.
        assert!(futures::poll!(statement.as_mut()).is_pending());
    }

    assert_eq!(
        conn.variables().get("wait_timeout").unwrap(),
        Value::Int(28_800)
    );
}

#[tokio::test]
async fn test_set_updates_session_and_notifies_backend() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;

    let results = conn
        .handle_query("SET @@session.sql_mode = 'STRICT_ALL_TABLES', autocommit = 0")
        .await
        .unwrap();
    assert_eq!(results, vec![ResultSet::empty()]);
    assert!(conn.session().queries().is_empty());
    assert_eq!(
        conn.session().sets(),
        vec![vec![
            ("sql_mode".to_string(), Value::from("STRICT_ALL_TABLES")),
            ("autocommit".to_string(), Value::Bool(false)),
        ]]
    );

    conn.handle_query("SELECT @@sql_mode").await.unwrap();
    assert_eq!(
        conn.session().queries(),
        vec!["SELECT 'STRICT_ALL_TABLES' AS `@@sql_mode`"]
    );
}

#[tokio::test]
async fn test_set_from_another_variable() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;

    conn.handle_query("SET net_write_timeout = @@wait_timeout")
        .await
        .unwrap();
    assert_eq!(
        conn.variables().get("net_write_timeout").unwrap(),
        Value::Int(28_800)
    );
}

#[tokio::test]
async fn test_set_errors() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;

    let err = conn
        .handle_query("SET GLOBAL sql_mode = 'X'")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Cannot SET variable sql_mode with scope GLOBAL");
    assert_eq!(err.code(), 1238);

    let err = conn.handle_query("SET @total = 1").await.unwrap_err();
    assert_eq!(err.to_string(), "User-defined variables not supported yet");
    assert_eq!(err.code(), 1235);

    let err = conn.handle_query("SET version = '9'").await.unwrap_err();
    assert_eq!(err.code(), 1238);

    let err = conn.handle_query("SET no_such_thing = 1").await.unwrap_err();
    assert_eq!(err.to_string(), "Unknown system variable 'no_such_thing'");
    assert_eq!(err.code(), 1193);

    assert!(conn.session().sets().is_empty());
}

#[tokio::test]
async fn test_failed_set_leaves_session_untouched() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;

    let err = conn
        .handle_query("SET sql_mode = 'STRICT', autocommit = 'maybe'")
        .await
        .unwrap_err();
    assert_eq!(err.code(), 1231);
    assert_eq!(conn.variables().get("sql_mode").unwrap(), Value::from("ANSI"));

    let err = conn
        .handle_query("SET wait_timeout = 5, version = '9'")
        .await
        .unwrap_err();
    assert_eq!(err.code(), 1238);
    assert_eq!(
        conn.variables().get("wait_timeout").unwrap(),
        Value::Int(28_800)
    );
    assert!(conn.session().sets().is_empty());

    let err = conn
        .handle_query("SET sql_mode = 'STRICT', time_zone = 'fail'")
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::Backend(_)));
    assert_eq!(conn.session().sets().len(), 1);
    assert_eq!(conn.variables().get("sql_mode").unwrap(), Value::from("ANSI"));
    assert_eq!(conn.variables().get("time_zone").unwrap(), Value::from("SYSTEM"));
}

#[tokio::test]
async fn test_set_names() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;

    conn.handle_query("SET NAMES latin1").await.unwrap();
    assert_eq!(
        conn.variables().get("character_set_client").unwrap(),
        Value::from("latin1")
    );
    assert_eq!(conn.session().sets()[0].len(), 3);
}

#[tokio::test]
async fn test_use_and_show_tables() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;
    assert_eq!(conn.identity().database.as_deref(), Some("shop"));

    let results = conn.handle_query("USE crm; SHOW TABLES").await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(conn.identity().database.as_deref(), Some("crm"));
    assert_eq!(results[1].columns, vec!["Tables_in_crm"]);
    assert_eq!(first_column(&results[1]), vec!["leads"]);
    assert!(conn.session().queries().is_empty());
}

#[tokio::test]
async fn test_show_full_columns() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;

    let results = conn
        .handle_query("SHOW FULL COLUMNS FROM users")
        .await
        .unwrap();
    let result = &results[0];
    assert_eq!(result.columns.len(), 9);
    assert_eq!(first_column(result), vec!["id", "name"]);
    assert_eq!(result.column_values("Null"), vec![&Value::from("NO"), &Value::from("YES")]);
    assert_eq!(result.column_values("Comment")[1], &Value::from("display name"));
}

#[tokio::test]
async fn test_show_variables() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;

    let results = conn
        .handle_query("SHOW VARIABLES LIKE 'version%'")
        .await
        .unwrap();
    assert_eq!(
        results[0].rows,
        vec![
            vec![Value::from("version"), Value::from("8.0.29")],
            vec![Value::from("version_comment"), Value::from("mysql-mimic")],
        ]
    );
}

#[tokio::test]
async fn test_show_global_variables() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;

    let results = conn
        .handle_query(
            "SET sql_mode = 'STRICT'; SHOW GLOBAL VARIABLES LIKE 'sql_mode'; \
             SHOW SESSION VARIABLES LIKE 'sql_mode'",
        )
        .await
        .unwrap();
    assert_eq!(
        results[1].rows,
        vec![vec![Value::from("sql_mode"), Value::from("ANSI")]]
    );
    assert_eq!(
        results[2].rows,
        vec![vec![Value::from("sql_mode"), Value::from("STRICT")]]
    );
}

#[tokio::test]
async fn test_show_index() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;

    let results = conn
        .handle_query("SHOW INDEX FROM users; SHOW KEYS FROM leads IN crm")
        .await
        .unwrap();
    for result in &results {
        assert_eq!(result.columns.len(), 15);
        assert_eq!(result.columns[0], "Table");
        assert_eq!(result.columns[14], "Expression");
        assert!(result.rows.is_empty());
    }
    assert!(conn.session().queries().is_empty());
}

#[tokio::test]
async fn test_unsupported_show() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;

    let err = conn.handle_query("SHOW STATUS").await.unwrap_err();
    assert_eq!(err.to_string(), "Unsupported SHOW command: STATUS");
    assert_eq!(err.code(), 1235);
}

#[tokio::test]
async fn test_information_schema_answered_locally() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;

    let results = conn
        .handle_query(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = DATABASE() ORDER BY table_name",
        )
        .await
        .unwrap();
    assert_eq!(first_column(&results[0]), vec!["orders", "users"]);
    assert!(conn.session().queries().is_empty());
}

#[tokio::test]
async fn test_reload_applies_to_next_statement() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;

    proxy
        .reload(&json!({"shop": {"invoices": {"id": "INT"}}}))
        .unwrap();

    let results = conn.handle_query("SHOW TABLES").await.unwrap();
    assert_eq!(first_column(&results[0]), vec!["invoices"]);
}

#[tokio::test]
async fn test_multi_statement_stops_at_first_error() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;

    let err = conn
        .handle_query("SELECT 1; SET @@global.sql_mode = 'X'; SELECT 2")
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::Intercept(_)));
    assert_eq!(conn.session().queries(), vec!["SELECT 1"]);
}

#[tokio::test]
async fn test_parse_error() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;

    let err = conn.handle_query("SELEC 1").await.unwrap_err();
    assert_eq!(err.code(), 1064);
}

#[tokio::test]
async fn test_query_attributes_forwarded() {
    let proxy = proxy();
    let mut conn = connect(&proxy).await;

    let mut attributes = HashMap::new();
    attributes.insert("trace_id".to_string(), "abc".to_string());
    conn.handle_query_with_attributes("SELECT 1", &attributes)
        .await
        .unwrap();

    let recorded = conn.session().recorded.lock().unwrap();
    assert_eq!(recorded.attributes, vec![attributes.clone()]);
}

#[tokio::test]
async fn test_connections_are_isolated() {
    let proxy = proxy();
    let mut connections = Vec::new();
    for _ in 0..8 {
        connections.push(connect(&proxy).await);
    }

    let statements = connections.iter_mut().enumerate().map(|(i, conn)| async move {
        let timeout = 100 + i;
        conn.handle_query(&format!(
            "SELECT /*+ SET_VAR(wait_timeout={timeout}) */ @@wait_timeout"
        ))
        .await
        .unwrap();
        conn.handle_query(&format!("SET sql_mode = 'MODE_{i}'"))
            .await
            .unwrap();
    });
    futures::future::join_all(statements).await;

    for (i, conn) in connections.iter().enumerate() {
        assert_eq!(
            conn.session().queries(),
            vec![format!("SELECT {} AS `@@wait_timeout`", 100 + i)]
        );
        assert_eq!(
            conn.variables().get("wait_timeout").unwrap(),
            Value::Int(28_800)
        );
        assert_eq!(
            conn.variables().get("sql_mode").unwrap(),
            Value::from(format!("MODE_{i}"))
        );
    }
    assert_eq!(
        proxy.globals().get("sql_mode").unwrap(),
        Value::from("ANSI")
    );
}
