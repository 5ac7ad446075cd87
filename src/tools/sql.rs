//! `sql_tool`: runs one SQL statement against the users store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::hooks::{AuthAction, AuthContext, Authorization};
use rusqlite::types::ValueRef;
use rusqlite::{Batch, Connection, Statement};

use super::errors::ToolError;
use super::{param_text, require_param, Parameters, Tool};

pub const TOOL_NAME: &str = "sql_tool";

pub struct SqlTool {
    conn: Arc<Mutex<Connection>>,
    delete_password: Option<String>,
}

impl SqlTool {
    /// `delete_password`, when set, gates statements that delete rows.
    pub fn new(conn: Connection, delete_password: Option<&str>) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            delete_password: delete_password.map(str::to_string),
        }
    }

    /// Whether the supplied parameters unlock row deletion.
    fn delete_permission(&self, params: &Parameters) -> Result<(), ToolError> {
        let Some(expected) = self.delete_password.as_deref() else {
            return Ok(());
        };
        match param_text(params, "security_password") {
            Some(given) if given == expected => Ok(()),
            Some(_) => Err(ToolError::PermissionDenied {
                reason: "invalid security_password for DELETE statement".into(),
            }),
            None => Err(ToolError::PermissionDenied {
                reason: "security_password is required for DELETE statements".into(),
            }),
        }
    }
}

#[async_trait]
impl Tool for SqlTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    async fn execute(&self, params: &Parameters) -> Result<String, ToolError> {
        let sql = require_param(params, TOOL_NAME, "sql_query")?;
        let delete_permission = self.delete_permission(params);

        tracing::info!(sql = %sql, "executing SQL statement");

        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| ToolError::ConfigError {
                reason: "users database lock poisoned".into(),
            })?;
            run_guarded(&guard, &sql, delete_permission)
        })
        .await
        .map_err(|e| ToolError::ConfigError {
            reason: format!("SQL task failed: {e}"),
        })?
    }
}

/// Execute exactly one statement and render the outcome.
///
/// Row-returning statements list their rows; anything else reports the
/// affected row count. Text holding more than one statement is rejected
/// before any of it runs.
pub fn run_statement(conn: &Connection, sql: &str) -> Result<String, ToolError> {
    run_guarded(conn, sql, Ok(()))
}

/// Like [`run_statement`], but a statement that deletes rows only runs when
/// `delete_permission` is `Ok`.
fn run_guarded(
    conn: &Connection,
    sql: &str,
    delete_permission: Result<(), ToolError>,
) -> Result<String, ToolError> {
    let sql = sql.trim();
    let compiled = compile_single(conn, sql)?;
    if compiled.deletes_rows {
        delete_permission?;
    }
    render_statement(compiled.stmt, sql)
}

/// A compiled statement and whether SQLite reported a row deletion for it.
struct Compiled<'conn> {
    stmt: Statement<'conn>,
    deletes_rows: bool,
}

/// Compile `sql`, which must hold exactly one statement.
///
/// Deletion is read from the authorizer callbacks SQLite issues while
/// compiling, so leading comments, CTEs and `DELETE ... RETURNING` are all
/// seen. Writes to internal `sqlite_*` tables do not count.
fn compile_single<'conn>(
    conn: &'conn Connection,
    sql: &str,
) -> Result<Compiled<'conn>, ToolError> {
    let deletes = Arc::new(AtomicBool::new(false));
    let seen = Arc::clone(&deletes);
    conn.authorizer(Some(move |ctx: AuthContext<'_>| {
        if let AuthAction::Delete { table_name } = ctx.action {
            if !table_name.starts_with("sqlite_") {
                seen.store(true, Ordering::Relaxed);
            }
        }
        Authorization::Allow
    }));

    let stmt = first_and_only(conn, sql);
    conn.authorizer(None::<fn(AuthContext<'_>) -> Authorization>);

    Ok(Compiled {
        stmt: stmt?,
        deletes_rows: deletes.load(Ordering::Relaxed),
    })
}

fn first_and_only<'conn>(
    conn: &'conn Connection,
    sql: &str,
) -> Result<Statement<'conn>, ToolError> {
    let mut batch = Batch::new(conn, sql);
    let Some(stmt) = batch.next()? else {
        return Err(ToolError::InvalidStatement {
            reason: "no SQL statement given".into(),
        });
    };
    if batch.next()?.is_some() {
        return Err(ToolError::InvalidStatement {
            reason: "only one statement may be executed per query".into(),
        });
    }
    Ok(stmt)
}

fn render_statement(mut stmt: Statement<'_>, sql: &str) -> Result<String, ToolError> {
    if stmt.column_count() == 0 {
        let affected = stmt.execute([])?;
        return Ok(format!(
            "Query executed successfully: {sql} ({affected} row(s) affected)"
        ));
    }

    let labels: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(column_label)
        .collect();

    let mut rows = stmt.query([])?;
    let mut lines = Vec::new();
    while let Some(row) = rows.next()? {
        let mut fields = Vec::with_capacity(labels.len());
        for (idx, label) in labels.iter().enumerate() {
            fields.push(format!("{label}: {}", render_value(row.get_ref(idx)?)));
        }
        lines.push(fields.join(" "));
    }

    if lines.is_empty() {
        Ok("No results found.".to_string())
    } else {
        Ok(format!("Results:\n{}", lines.join("\n\n")))
    }
}

/// `created_at` → `Created At`, `id` → `ID`.
fn column_label(name: &str) -> String {
    if name.eq_ignore_ascii_case("id") {
        return "ID".to_string();
    }
    name.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<{} byte blob>", b.len()),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::UsersDatabase;
    use serde_json::json;

    fn seeded_conn() -> Connection {
        let db = UsersDatabase::open_in_memory().unwrap();
        db.seed_sample_users().unwrap();
        db.into_connection()
    }

    fn params(value: serde_json::Value) -> Parameters {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_select_renders_rows() {
        let conn = seeded_conn();
        let out = run_statement(&conn, "SELECT id, name, email FROM users WHERE id = 1").unwrap();
        assert_eq!(out, "Results:\nID: 1 Name: Alice Johnson Email: alice@example.com");
    }

    #[test]
    fn test_select_with_no_rows() {
        let conn = seeded_conn();
        let out = run_statement(&conn, "SELECT * FROM users WHERE name = 'Nobody'").unwrap();
        assert_eq!(out, "No results found.");
    }

    #[test]
    fn test_count_query() {
        let conn = seeded_conn();
        let out = run_statement(&conn, "SELECT COUNT(*) FROM users").unwrap();
        assert_eq!(out, "Results:\nCOUNT(*): 5");
    }

    #[test]
    fn test_delete_reports_affected_rows() {
        let conn = seeded_conn();
        let out = run_statement(&conn, "DELETE FROM users WHERE name = 'Bob Smith'").unwrap();
        assert_eq!(
            out,
            "Query executed successfully: DELETE FROM users WHERE name = 'Bob Smith' (1 row(s) affected)"
        );
    }

    #[test]
    fn test_multiple_statements_rejected() {
        let conn = seeded_conn();
        let err = run_statement(&conn, "DELETE FROM users; DROP TABLE users").unwrap_err();
        assert!(err.to_string().starts_with("SQL Error: "));

        let count = run_statement(&conn, "SELECT COUNT(*) FROM users").unwrap();
        assert!(count.ends_with(": 5"), "no statement should have run: {count}");
    }

    #[test]
    fn test_trailing_semicolon_is_one_statement() {
        let conn = seeded_conn();
        let out = run_statement(&conn, "SELECT COUNT(*) FROM users; ").unwrap();
        assert_eq!(out, "Results:\nCOUNT(*): 5");
    }

    #[test]
    fn test_no_statement_rejected() {
        let conn = seeded_conn();
        let err = run_statement(&conn, " ; -- nothing here").unwrap_err();
        assert!(matches!(err, ToolError::InvalidStatement { .. }));
    }

    #[test]
    fn test_compile_detects_deletes() {
        let conn = seeded_conn();
        let deletes = |sql: &str| compile_single(&conn, sql).unwrap().deletes_rows;

        assert!(deletes("DELETE FROM users WHERE id = 1"));
        assert!(deletes("/* x */ DELETE FROM users"));
        assert!(deletes("WITH t AS (SELECT 1) DELETE FROM users"));
        assert!(!deletes("SELECT * FROM users"));
        assert!(!deletes("UPDATE users SET name = 'deleted' WHERE id = 1"));
    }

    #[test]
    fn test_invalid_sql_is_sql_error() {
        let conn = seeded_conn();
        let err = run_statement(&conn, "SELEKT * FROM users").unwrap_err();
        assert!(matches!(err, ToolError::DatabaseError(_)));
    }

    #[test]
    fn test_column_label() {
        assert_eq!(column_label("created_at"), "Created At");
        assert_eq!(column_label("id"), "ID");
        assert_eq!(column_label("name"), "Name");
    }

    #[tokio::test]
    async fn test_execute_requires_sql_query() {
        let tool = SqlTool::new(seeded_conn(), None);
        let err = tool.execute(&Parameters::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "Error: sql_query parameter required for sql_tool");
    }

    #[tokio::test]
    async fn test_delete_password_gate() {
        let tool = SqlTool::new(seeded_conn(), Some("hunter2"));
        let delete = "DELETE FROM users WHERE name = 'Eva Brown'";

        let err = tool
            .execute(&params(json!({"sql_query": delete})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PermissionDenied { .. }));

        let err = tool
            .execute(&params(json!({"sql_query": delete, "security_password": "wrong"})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid security_password"));

        let out = tool
            .execute(&params(json!({"sql_query": delete, "security_password": "hunter2"})))
            .await
            .unwrap();
        assert!(out.contains("(1 row(s) affected)"));
    }

    #[tokio::test]
    async fn test_disguised_deletes_still_need_password() {
        let tool = SqlTool::new(seeded_conn(), Some("hunter2"));

        for sql in [
            "/* x */ DELETE FROM users",
            "WITH t AS (SELECT 1) DELETE FROM users",
            "-- note\n  delete from users where id = 3",
        ] {
            let err = tool
                .execute(&params(json!({ "sql_query": sql })))
                .await
                .unwrap_err();
            assert!(
                matches!(err, ToolError::PermissionDenied { .. }),
                "{sql} ran without a password: {err}"
            );
        }

        let count = tool
            .execute(&params(json!({"sql_query": "SELECT COUNT(*) FROM users"})))
            .await
            .unwrap();
        assert_eq!(count, "Results:\nCOUNT(*): 5");
    }

    #[tokio::test]
    async fn test_select_not_gated_by_delete_password() {
        let tool = SqlTool::new(seeded_conn(), Some("hunter2"));
        let out = tool
            .execute(&params(json!({"sql_query": "SELECT name FROM users WHERE id = 2"})))
            .await
            .unwrap();
        assert_eq!(out, "Results:\nName: Bob Smith");
    }
}
