//! Output formatting: table, json, csv.

mod csv;
mod json;
mod table;

use anyhow::Result;
use clap::ValueEnum;
use serde_json::Value;
use strata_core::{columns, Record, RecordList};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// Pretty-printed JSON
    Json,
    /// Comma-separated values
    Csv,
}

/// Print a table of records.
pub fn print_table(list: &RecordList, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", table::render(list)),
        OutputFormat::Json => println!("{}", json::render(list)?),
        OutputFormat::Csv => {
            let rows = rows_of(list);
            print!("{}", csv::render(list.columns(), &rows));
        }
    }
    Ok(())
}

/// Print one record as a field/value listing (or a JSON object).
pub fn print_record(rec: &Record, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", json::render(rec)?),
        OutputFormat::Table | OutputFormat::Csv => {
            let order = columns::column_order(rec.kind(), std::slice::from_ref(rec));
            let rows: Vec<Vec<String>> =
                order.iter().map(|col| vec![col.clone(), rec.render(col)]).collect();
            let header = ["field".to_string(), "value".to_string()];
            if format == OutputFormat::Table {
                println!("{}", table::render_rows(&header, &rows));
            } else {
                print!("{}", csv::render(&header, &rows));
            }
        }
    }
    Ok(())
}

/// Print a raw API value: strings go out verbatim, everything else as JSON.
pub fn print_value(value: &Value) -> Result<()> {
    match value {
        Value::String(s) => println!("{s}"),
        other => println!("{}", json::render(other)?),
    }
    Ok(())
}

fn rows_of(list: &RecordList) -> Vec<Vec<String>> {
    list.iter()
        .map(|rec| list.columns().iter().map(|col| rec.render(col)).collect())
        .collect()
}
