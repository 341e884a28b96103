use super::{Cell, Table};
use clap::ValueEnum;
use serde::Serialize;
use std::io::Write;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Formatted terminal table, amounts to 2 decimal places
    #[default]
    Table,
    Csv,
    Json,
}

impl Cell {
    fn display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Amount(d) => format!("{:.2}", d.round_dp(2)),
            Cell::Whole(d) => d.round().to_string(),
        }
    }

    fn raw(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Amount(d) | Cell::Whole(d) => d.normalize().to_string(),
        }
    }
}

/// Every row as strings, padded to the header's width.
fn records(table: &Table, cell: fn(&Cell) -> String) -> Vec<Vec<String>> {
    let width = table.header.len();
    table
        .rows
        .iter()
        .chain(&table.footer)
        .map(|row| {
            let mut record: Vec<String> = row.iter().map(cell).collect();
            record.resize(width.max(record.len()), String::new());
            record
        })
        .collect()
}

pub fn render_table(table: &Table) -> String {
    let mut builder = Builder::default();
    builder.push_record(table.header.iter().cloned());
    for record in records(table, Cell::display) {
        builder.push_record(record);
    }
    builder
        .build()
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string()
}

pub fn write_csv<W: Write>(table: &Table, writer: W) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&table.header)?;
    for record in records(table, Cell::raw) {
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct NamedTable<'a> {
    report: &'a str,
    #[serde(flatten)]
    table: &'a Table,
}

/// Writes titled tables in the chosen format. JSON output is a single array.
pub fn write_reports<W: Write>(
    tables: &[(&str, Table)],
    format: OutputFormat,
    mut writer: W,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            for (title, table) in tables {
                writeln!(writer, "{}", title)?;
                writeln!(writer, "{}", render_table(table))?;
                writeln!(writer)?;
            }
        }
        OutputFormat::Csv => {
            for (index, (_, table)) in tables.iter().enumerate() {
                if index > 0 {
                    writeln!(writer)?;
                }
                write_csv(table, &mut writer)?;
            }
        }
        OutputFormat::Json => {
            let named: Vec<_> = tables
                .iter()
                .map(|(report, table)| NamedTable {
                    report: *report,
                    table,
                })
                .collect();
            serde_json::to_writer_pretty(&mut writer, &named)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}
