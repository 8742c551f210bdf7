//! Schema snapshots used to ground SQL generation
//!
//! A [`SchemaSnapshot`] is captured fresh for every query and never mutated
//! afterwards; concurrent queries may read one through a shared reference.

use crate::result::ScalarValue;
use serde::{Deserialize, Serialize};

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Declared type as written in the table definition (may be empty).
    pub declared_type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

/// Table metadata plus a handful of sample rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    /// Row count at capture time.
    pub row_count: u64,
    /// Up to `sample_rows` rows, aligned with `columns`.
    pub sample_rows: Vec<Vec<ScalarValue>>,
}

impl TableDescriptor {
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Ordered, immutable description of the target database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub tables: Vec<TableDescriptor>,
}

impl SchemaSnapshot {
    pub fn new(tables: Vec<TableDescriptor>) -> Self {
        Self { tables }
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// True if `name` is a table in this snapshot (case-insensitive).
    pub fn contains_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Render the schema as prompt context.
    ///
    /// One line per table listing `column (TYPE)` pairs, followed by the
    /// first sample row when one was captured.
    pub fn render_for_prompt(&self) -> String {
        let mut lines = Vec::with_capacity(self.tables.len() * 2);
        for table in &self.tables {
            let cols = table
                .columns
                .iter()
                .map(|c| {
                    if c.declared_type.is_empty() {
                        c.name.clone()
                    } else {
                        format!("{} ({})", c.name, c.declared_type)
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("- {}: {}", table.name, cols));

            if let Some(sample) = table.sample_rows.first() {
                let pairs = table
                    .columns
                    .iter()
                    .zip(sample)
                    .map(|(c, v)| format!("{}={}", c.name, v))
                    .collect::<Vec<_>>()
                    .join(", ");
                lines.push(format!("  sample: {}", pairs));
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SchemaSnapshot {
        SchemaSnapshot::new(vec![TableDescriptor {
            name: "sales_data".into(),
            columns: vec![
                ColumnDescriptor {
                    name: "id".into(),
                    declared_type: "INTEGER".into(),
                    nullable: false,
                    primary_key: true,
                },
                ColumnDescriptor {
                    name: "region".into(),
                    declared_type: "TEXT".into(),
                    nullable: true,
                    primary_key: false,
                },
            ],
            row_count: 2,
            sample_rows: vec![vec![ScalarValue::Integer(1), ScalarValue::Text("north".into())]],
        }])
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let schema = snapshot();
        assert!(schema.contains_table("SALES_DATA"));
        assert!(!schema.contains_table("users"));
        assert!(schema.tables[0].column("Region").is_some());
    }

    #[test]
    fn test_render_for_prompt() {
        let text = snapshot().render_for_prompt();
        assert_eq!(
            text,
            "- sales_data: id (INTEGER), region (TEXT)\n  sample: id=1, region=north"
        );
    }

    #[test]
    fn test_render_without_samples_or_types() {
        let mut schema = snapshot();
        schema.tables[0].sample_rows.clear();
        schema.tables[0].columns[1].declared_type.clear();
        assert_eq!(schema.render_for_prompt(), "- sales_data: id (INTEGER), region");
    }
}
