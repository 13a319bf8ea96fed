use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use super::table::{Sheet, Table};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load one CSV file as a sheet named after the file stem.
///
/// Expected layout: a header row of column names followed by numeric rows.
/// Empty cells become NaN, so shorter summary columns (e.g. `SetVoltage`)
/// can share a file with the sweep.
pub fn load_csv(path: &Path) -> Result<Sheet> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let table = read_table(file).with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("sheet")
        .to_string();
    Ok(Sheet::new(name, table))
}

/// Parse CSV text into a [`Table`].
pub fn read_table<R: Read>(reader: R) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        for (col_idx, column) in columns.iter_mut().enumerate() {
            let cell = record.get(col_idx).unwrap_or("");
            column.push(parse_cell(cell, row_no, &headers[col_idx])?);
        }
    }

    let mut table = Table::new();
    for (name, values) in headers.into_iter().zip(columns) {
        table.insert_column(name, values);
    }
    Ok(table)
}

fn parse_cell(cell: &str, row: usize, col: &str) -> Result<f64> {
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>()
        .with_context(|| format!("Row {row}, {col}: '{cell}' is not a number"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_cells_become_nan() {
        let text = "Voltage,Current,SetVoltage\n0,1e-6,1.2\n0.1,,\n0.2,3e-6,\n";
        let table = read_table(text.as_bytes()).unwrap();
        assert_eq!(table.column("Voltage").unwrap(), &[0.0, 0.1, 0.2]);
        let current = table.column("Current").unwrap();
        assert!(current[1].is_nan());
        assert_eq!(current[2], 3e-6);
        let recorded = table.column("SetVoltage").unwrap();
        assert_eq!(recorded.len(), 3);
        assert_eq!(recorded[0], 1.2);
        assert!(recorded[1..].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn non_numeric_cell_is_reported() {
        let err = read_table("Voltage\nabc\n".as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("'abc' is not a number"));
    }

    #[test]
    fn load_csv_names_sheet_after_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cycle_07.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "Time,R").unwrap();
        writeln!(file, "0,1000").unwrap();
        drop(file);

        let sheet = load_csv(&path).unwrap();
        assert_eq!(sheet.name, "cycle_07");
        assert_eq!(sheet.table.column("R").unwrap(), &[1000.0]);
    }
}
