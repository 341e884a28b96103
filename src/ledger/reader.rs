use super::{BrokerFormat, Ledger, LedgerBuilder};
use crate::warnings::{Warning, Warnings};
use anyhow::Context;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads every file (or every file inside a directory) into one ledger.
pub fn load_paths(
    paths: &[PathBuf],
    format: &dyn BrokerFormat,
    warnings: &mut Warnings,
) -> anyhow::Result<Ledger> {
    let mut ledger = Ledger::default();
    for path in paths {
        if path.is_dir() {
            let mut files = fs::read_dir(path)
                .with_context(|| format!("reading directory {}", path.display()))?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<Result<Vec<_>, _>>()?;
            files.retain(|file| file.is_file());
            files.sort();
            for file in files {
                ledger.extend(load_csv(&file, format, warnings)?);
            }
        } else {
            ledger.extend(load_csv(path, format, warnings)?);
        }
    }
    Ok(ledger)
}

pub fn load_csv(
    path: &Path,
    format: &dyn BrokerFormat,
    warnings: &mut Warnings,
) -> anyhow::Result<Ledger> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let rows = read_rows(&bytes, format).with_context(|| format!("parsing {}", path.display()))?;
    log::info!("Read {} ledger rows from {}", rows.len(), path.display());
    Ok(parse_rows(rows, format, warnings))
}

/// Decodes the file (a byte order mark wins over the format's default
/// encoding) and splits it into rows, skipping the header.
fn read_rows(bytes: &[u8], format: &dyn BrokerFormat) -> anyhow::Result<Vec<Vec<String>>> {
    let (text, encoding, malformed) = format.encoding().decode(bytes);
    if malformed {
        log::warn!("Ledger contains invalid {} sequences", encoding.name());
    }

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(format.delimiter())
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    for record in rdr.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Orders rows by the broker's key and feeds them through the parser. Rows that
/// fail to parse are reported and skipped.
pub fn parse_rows(
    rows: Vec<Vec<String>>,
    format: &dyn BrokerFormat,
    warnings: &mut Warnings,
) -> Ledger {
    let mut rows: Vec<(usize, Vec<String>)> = rows.into_iter().enumerate().collect();
    rows.sort_by(|(_, a), (_, b)| compare_keys(format.order_key(a), format.order_key(b)));

    let mut builder = LedgerBuilder::new();
    for (index, row) in rows {
        if let Err(err) = format.parse_row(&row, &mut builder) {
            warnings.push(Warning::UnparsedRow {
                // header is line 1
                row: index + 2,
                message: err.to_string(),
            });
        }
    }
    builder.finish(warnings)
}

/// Numeric keys compare as numbers so that id `10` follows id `9`, and sort
/// before any other key. Other keys compare as text.
fn compare_keys(a: &str, b: &str) -> Ordering {
    fn sort_key(key: &str) -> (Option<u128>, &str) {
        (key.parse().ok(), key)
    }
    let ((a_num, a), (b_num, b)) = (sort_key(a), sort_key(b));
    a_num
        .is_none()
        .cmp(&b_num.is_none())
        .then(a_num.cmp(&b_num))
        .then(a.cmp(b))
}
