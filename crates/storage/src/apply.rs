use colloboque_core::{BinaryCondition, ColumnValues, Operation, RangeCondition};
use rusqlite::hooks::{AuthAction, AuthContext, Authorization};
use rusqlite::{Connection, params_from_iter};
use rusqlite::types::Value as SqlValue;
use tracing::debug;

use crate::condition::{Predicate, build, quote_ident, to_sql_value};
use crate::error::StorageError;

/// Executes one operation on `conn` and returns the number of affected rows.
///
/// `conn` is normally a `rusqlite::Transaction`; Merge issues a lookup and a
/// write that are only atomic inside one.
pub fn apply_operation(conn: &Connection, operation: &Operation) -> Result<usize, StorageError> {
    let rows = match operation {
        Operation::Insert { table, values } => insert(conn, table, values)?,

        Operation::Delete {
            table,
            binary_conditions,
            range_conditions,
        } => {
            let predicate = where_clause(binary_conditions, range_conditions);
            let sql = format!("DELETE FROM {} WHERE {}", quote_ident(table), predicate.sql());
            conn.execute(&sql, params_from_iter(predicate.params()))?
        }

        Operation::Update {
            table,
            binary_conditions,
            range_conditions,
            new_values,
        } => {
            if new_values.is_empty() {
                return Err(StorageError::InvalidOperation(format!(
                    "update of {table} sets no columns"
                )));
            }
            let predicate = where_clause(binary_conditions, range_conditions);
            update(conn, table, new_values, predicate)?
        }

        Operation::Merge {
            table,
            binary_conditions,
            range_conditions,
            when_matched,
            when_not_matched,
        } => {
            let predicate = where_clause(binary_conditions, range_conditions);
            let lookup = format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {})",
                quote_ident(table),
                predicate.sql()
            );
            let matched: bool =
                conn.query_row(&lookup, params_from_iter(predicate.params()), |row| row.get(0))?;
            if !matched {
                insert(conn, table, when_not_matched)?
            } else if when_matched.is_empty() {
                0
            } else {
                update(conn, table, when_matched, predicate)?
            }
        }
    };
    debug!(kind = operation.kind(), table = operation.table(), rows, "applied operation");
    Ok(rows)
}

/// Runs store-native SQL verbatim. The text may hold several statements.
///
/// Transaction control (`BEGIN`, `COMMIT`, `END`, `ROLLBACK`) is refused at
/// prepare time so the statements cannot leave the caller's transaction.
pub fn execute_raw(conn: &Connection, sql: &str) -> Result<(), StorageError> {
    conn.authorizer(Some(deny_transaction_control));
    let result = conn.execute_batch(sql);
    conn.authorizer(None::<fn(AuthContext<'_>) -> Authorization>);
    result?;
    Ok(())
}

fn deny_transaction_control(ctx: AuthContext<'_>) -> Authorization {
    match ctx.action {
        AuthAction::Transaction { .. } => Authorization::Deny,
        _ => Authorization::Allow,
    }
}

fn where_clause(binary: &[BinaryCondition], range: &[RangeCondition]) -> Predicate {
    build(binary).and(build(range))
}

fn insert(conn: &Connection, table: &str, values: &ColumnValues) -> Result<usize, StorageError> {
    if values.is_empty() {
        let sql = format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table));
        return Ok(conn.execute(&sql, [])?);
    }
    let columns: Vec<String> = values.keys().map(|c| quote_ident(c)).collect();
    let placeholders = vec!["?"; values.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        quote_ident(table),
        columns.join(", ")
    );
    Ok(conn.execute(&sql, params_from_iter(values.values().map(to_sql_value)))?)
}

fn update(
    conn: &Connection,
    table: &str,
    values: &ColumnValues,
    predicate: Predicate,
) -> Result<usize, StorageError> {
    let assignments: Vec<String> = values
        .keys()
        .map(|c| format!("{} = ?", quote_ident(c)))
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        quote_ident(table),
        assignments.join(", "),
        predicate.sql()
    );
    let params: Vec<SqlValue> = values
        .values()
        .map(to_sql_value)
        .chain(predicate.into_params())
        .collect();
    Ok(conn.execute(&sql, params_from_iter(params))?)
}
