use std::path::Path;

use crate::ledger::tools::error::Result;
use crate::ledger::tools::model::{Cell, RawTable};

/// Reads a delimited-text file into a table.
///
/// The first record is the header row. Records may be ragged: short rows are
/// padded with missing cells, extra fields are ignored. Cells stay text;
/// numeric and date views are produced lazily by the cell coercions.
pub fn read_table(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let (mut table, slots) = RawTable::from_headers(headers.iter());

    for record in reader.records() {
        let record = record?;
        let mut row = vec![Cell::Missing; table.columns().len()];
        for (position, field) in record.iter().enumerate() {
            let Some(&Some(slot)) = slots.get(position) else {
                continue;
            };
            row[slot] = convert_field(field);
        }
        table.push_row(row);
    }
    Ok(table)
}

fn convert_field(field: &str) -> Cell {
    if field.trim().is_empty() {
        Cell::Missing
    } else {
        Cell::Text(field.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn ragged_rows_and_duplicate_headers_are_tolerated() {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .expect("temporary file");
        write!(
            file,
            "Invoice No,invoice-no,Qty\nA1,ignored,2\nB2\nC3,ignored,1,extra\n"
        )
        .expect("fixture written");

        let table = read_table(file.path()).expect("read");
        assert_eq!(table.columns(), ["invoice no", "qty"]);
        assert_eq!(table.row_count(), 3);
        // The duplicate header's cells are dropped with the column.
        assert_eq!(table.cell(0, 0), &Cell::Text("A1".into()));
        assert_eq!(table.cell(0, 1), &Cell::Text("2".into()));
        // Short rows pad with missing cells.
        assert_eq!(table.cell(1, 1), &Cell::Missing);
    }
}
