//! Column-level data quality profile of a raw CSV table: missing values,
//! cardinality, duplicate rows. Runs before any schema is applied, so it
//! works on any file.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::ReferralError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub missing: usize,
    /// Percentage of rows with an empty cell, rounded to two decimals.
    pub missing_pct: f64,
    /// Distinct non-empty values.
    pub unique: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub name: String,
    pub row_count: usize,
    pub column_count: usize,
    pub duplicate_rows: usize,
    pub columns: Vec<ColumnProfile>,
}

pub fn profile_csv(name: &str, csv_data: &str) -> Result<DatasetProfile, ReferralError> {
    let csv_err = |e: csv::Error| ReferralError::Csv {
        dataset: name.to_string(),
        message: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(csv_data.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut missing = vec![0usize; headers.len()];
    let mut distinct: Vec<HashSet<String>> = vec![HashSet::new(); headers.len()];
    let mut seen_rows: HashSet<Vec<String>> = HashSet::new();
    let mut row_count = 0;
    let mut duplicate_rows = 0;

    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        row_count += 1;

        let cells: Vec<String> = (0..headers.len())
            .map(|i| record.get(i).unwrap_or("").trim().to_string())
            .collect();
        for (i, cell) in cells.iter().enumerate() {
            if cell.is_empty() {
                missing[i] += 1;
            } else if !distinct[i].contains(cell) {
                distinct[i].insert(cell.clone());
            }
        }
        if !seen_rows.insert(cells) {
            duplicate_rows += 1;
        }
    }

    let columns = headers
        .into_iter()
        .zip(missing)
        .zip(distinct)
        .map(|((name, missing), distinct)| ColumnProfile {
            name,
            missing,
            missing_pct: percent(missing, row_count),
            unique: distinct.len(),
        })
        .collect::<Vec<_>>();

    log::debug!("profiled '{name}': {row_count} rows, {duplicate_rows} duplicates");

    Ok(DatasetProfile {
        name: name.to_string(),
        row_count,
        column_count: columns.len(),
        duplicate_rows,
        columns,
    })
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 * 10_000.0 / whole as f64).round() / 100.0
}
