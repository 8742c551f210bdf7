//! Schema introspection for SQLite databases

use crate::error::{ErrorKind, Result, SqlGuardError};
use crate::result::ScalarValue;
use crate::schema::{ColumnDescriptor, SchemaSnapshot, TableDescriptor};
use rusqlite::Connection;
use tracing::{debug, warn};

/// Read every user table with its columns, row count and sample rows.
///
/// Internal `sqlite_*` tables are skipped. A database without user tables is
/// reported as `SchemaUnavailable`.
pub fn read_schema(conn: &Connection, sample_rows: usize) -> Result<SchemaSnapshot> {
    let names: Vec<String> = {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
             ORDER BY rowid",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        names
    };

    if names.is_empty() {
        return Err(SqlGuardError::pipeline(
            ErrorKind::SchemaUnavailable,
            "database has no tables",
        ));
    }

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let columns = read_columns(conn, &name)?;
        let quoted = quote_identifier(&name);

        let row_count = match conn.query_row(&format!("SELECT COUNT(*) FROM {}", quoted), [], |r| {
            r.get::<_, i64>(0)
        }) {
            Ok(n) => n.max(0) as u64,
            Err(e) => {
                warn!(table = %name, error = %e, "Could not count rows");
                0
            }
        };

        let samples = if sample_rows == 0 {
            Vec::new()
        } else {
            read_samples(conn, &quoted, columns.len(), sample_rows).unwrap_or_else(|e| {
                warn!(table = %name, error = %e, "Could not read sample rows");
                Vec::new()
            })
        };

        debug!(table = %name, columns = columns.len(), row_count, "Table introspected");
        tables.push(TableDescriptor {
            name,
            columns,
            row_count,
            sample_rows: samples,
        });
    }

    Ok(SchemaSnapshot::new(tables))
}

fn read_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnDescriptor>> {
    let mut stmt =
        conn.prepare("SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid")?;
    let columns = stmt
        .query_map([table], |row| {
            Ok(ColumnDescriptor {
                name: row.get(0)?,
                declared_type: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                nullable: row.get::<_, i64>(2)? == 0,
                primary_key: row.get::<_, i64>(3)? > 0,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn read_samples(
    conn: &Connection,
    quoted_table: &str,
    column_count: usize,
    limit: usize,
) -> Result<Vec<Vec<ScalarValue>>> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM {} LIMIT ?1", quoted_table))?;
    let width = column_count.min(stmt.column_count());
    let mut rows = stmt.query([limit as i64])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(ScalarValue::from_sqlite(row.get_ref(i)?));
        }
        out.push(values);
    }
    Ok(out)
}

/// Quote an identifier for interpolation into SQL text.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
