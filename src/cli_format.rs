use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use serde::Serialize;
use sqlguard::{
    ErrorHint, ExecutionResult, QueryOutcome, RewrittenStatement, Result, ScalarValue,
    SchemaSnapshot, ValidationVerdict,
};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print an error (with hint) to stderr
pub(crate) fn print_error(message: &str) {
    let mut lines = message.lines();
    if let Some(first) = lines.next() {
        eprintln!("{} {}", "error:".red().bold(), first);
    }
    for line in lines {
        eprintln!("{}", line.dimmed());
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cell_for(value: &ScalarValue) -> Cell {
    match value {
        ScalarValue::Null => Cell::new("NULL").fg(Color::DarkGrey),
        other => Cell::new(other.to_string()),
    }
}

/// Result rows as a table
pub(crate) fn result_table(result: &ExecutionResult) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        result
            .columns
            .iter()
            .map(|c| Cell::new(c).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );
    for row in &result.rows {
        table.add_row(row.values.iter().map(cell_for).collect::<Vec<_>>());
    }
    table
}

pub(crate) fn print_result(result: &ExecutionResult) {
    if result.columns.is_empty() {
        println!("{}", "(no columns)".dimmed());
    } else {
        println!("{}", result_table(result));
    }
    let mut footer = format!("{} row(s) in {} ms", result.row_count, result.execution_ms);
    if result.truncated {
        footer.push_str(&format!(", capped at {} rows", result.row_count));
    }
    println!("{}", footer.dimmed());
}

/// One query outcome in text form
pub(crate) fn print_outcome_text(outcome: &QueryOutcome) {
    println!("{} {}", "Question:".bold(), outcome.question);
    if let Some(ref sql) = outcome.generated_sql {
        println!("{}", "SQL:".bold());
        println!("  {}", sql.replace('\n', "\n  "));
    }
    if let Some(ref result) = outcome.result {
        if outcome.generated_sql.as_deref() != Some(result.statement.as_str()) {
            println!("{} {}", "Executed:".bold(), result.statement.dimmed());
        }
        print_result(result);
    }
    if let Some(ref interpretation) = outcome.interpretation {
        println!();
        println!("{}", "Interpretation:".bold());
        println!("{}", interpretation.trim());
    }
    if let Some(ref error) = outcome.error {
        print_error(&error.with_hint());
    }
}

pub(crate) fn print_outcomes(outcomes: &[QueryOutcome], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&outcomes),
        OutputFormat::Text => {
            for (i, outcome) in outcomes.iter().enumerate() {
                if i > 0 {
                    println!("{}", "─".repeat(60).dimmed());
                }
                print_outcome_text(outcome);
            }
            let failed = outcomes.iter().filter(|o| !o.is_success()).count();
            println!();
            println!(
                "{} {} succeeded, {} failed",
                "Batch:".bold(),
                (outcomes.len() - failed).to_string().green(),
                if failed > 0 {
                    failed.to_string().red()
                } else {
                    failed.to_string().normal()
                }
            );
            Ok(())
        }
    }
}

pub(crate) fn print_schema(schema: &SchemaSnapshot, format: OutputFormat) -> Result<()> {
    if let OutputFormat::Json = format {
        return print_json(schema);
    }

    for table_desc in &schema.tables {
        println!(
            "{} {}",
            table_desc.name.bold(),
            format!("({} rows)", table_desc.row_count).dimmed()
        );

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Column").fg(Color::Cyan),
            Cell::new("Type").fg(Color::Cyan),
            Cell::new("Nullable").fg(Color::Cyan),
            Cell::new("Key").fg(Color::Cyan),
        ]);
        for column in &table_desc.columns {
            table.add_row(vec![
                Cell::new(&column.name),
                Cell::new(&column.declared_type),
                Cell::new(if column.nullable { "yes" } else { "no" }),
                if column.primary_key {
                    Cell::new("PK").fg(Color::Yellow)
                } else {
                    Cell::new("")
                },
            ]);
        }
        println!("{}", table);

        for sample in &table_desc.sample_rows {
            let pairs = table_desc
                .columns
                .iter()
                .zip(sample)
                .map(|(c, v)| format!("{}={}", c.name, v))
                .collect::<Vec<_>>()
                .join(", ");
            println!("  {} {}", "sample:".dimmed(), pairs);
        }
        println!();
    }
    Ok(())
}

#[derive(Serialize)]
struct VerdictReport<'a> {
    verdict: &'a ValidationVerdict,
    rewritten: Option<&'a RewrittenStatement>,
}

pub(crate) fn print_verdict(
    verdict: &ValidationVerdict,
    rewritten: Option<&RewrittenStatement>,
    format: OutputFormat,
) -> Result<()> {
    if let OutputFormat::Json = format {
        return print_json(&VerdictReport { verdict, rewritten });
    }

    match (verdict.rejection(), rewritten) {
        (Some(error), _) => {
            println!("{}", "REJECTED".red().bold());
            print_error(&error.with_hint());
        }
        (None, Some(rewritten)) => {
            println!("{}", "ACCEPTED".green().bold());
            println!("{} {}", "Executes as:".bold(), rewritten.sql);
            if rewritten.ceiling_applied {
                println!(
                    "{}",
                    format!("Row cap of {} applied to the outermost query", rewritten.row_cap)
                        .dimmed()
                );
            }
        }
        (None, None) => println!("{}", "ACCEPTED".green().bold()),
    }
    Ok(())
}
