use std::path::Path;

use calamine::{DataType, Range, Reader, open_workbook_auto};
use tracing::debug;

use crate::ledger::tools::error::{LedgerError, Result};
use crate::ledger::tools::model::{Cell, RawTable};
use crate::ledger::tools::schema;

/// Reads the best-matching sheet of a workbook.
///
/// Every sheet is read with its first row as headers and scored by how many
/// semantic roles its columns cover; the highest score wins and ties keep the
/// first sheet seen. Sheets that fail to read are skipped. When every sheet
/// fails, the first sheet is retried and a second failure degrades to an
/// empty table, so a workbook with at least one sheet never errors here.
pub fn read_workbook(path: &Path) -> Result<(RawTable, String)> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_names = workbook.sheet_names().to_vec();
    let first_sheet = sheet_names.first().cloned().ok_or_else(|| {
        LedgerError::InvalidWorkbook(format!("workbook '{}' has no sheets", path.display()))
    })?;

    let mut best: Option<(usize, RawTable, String)> = None;
    for name in &sheet_names {
        let range = match workbook.worksheet_range(name) {
            Some(Ok(range)) => range,
            _ => continue,
        };
        let table = range_to_table(&range);
        let sheet_score = schema::score(table.columns());
        debug!(sheet = %name, score = sheet_score, "scored worksheet");
        if best
            .as_ref()
            .map_or(true, |(top_score, _, _)| sheet_score > *top_score)
        {
            best = Some((sheet_score, table, name.clone()));
        }
    }

    if let Some((_, table, name)) = best {
        return Ok((table, name));
    }

    let table = match workbook.worksheet_range(&first_sheet) {
        Some(Ok(range)) => range_to_table(&range),
        _ => RawTable::default(),
    };
    Ok((table, first_sheet))
}

/// Converts a worksheet range into a table, treating the first row as the
/// header row.
fn range_to_table(range: &Range<DataType>) -> RawTable {
    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return RawTable::default();
    };
    let (mut table, slots) = RawTable::from_headers(header_row.iter().map(header_text));

    for source_row in rows {
        let mut row = vec![Cell::Missing; table.columns().len()];
        for (position, value) in source_row.iter().enumerate() {
            let Some(&Some(slot)) = slots.get(position) else {
                continue;
            };
            row[slot] = convert_cell(value);
        }
        table.push_row(row);
    }
    table
}

fn header_text(value: &DataType) -> String {
    match value {
        DataType::String(text) => text.clone(),
        DataType::Empty => String::new(),
        other => other.to_string(),
    }
}

fn convert_cell(value: &DataType) -> Cell {
    match value {
        DataType::Empty => Cell::Missing,
        DataType::String(text) if text.trim().is_empty() => Cell::Missing,
        DataType::String(text) => Cell::Text(text.clone()),
        DataType::Float(number) => Cell::Number(*number),
        DataType::Int(number) => Cell::Number(*number as f64),
        DataType::Bool(flag) => Cell::Number(if *flag { 1.0 } else { 0.0 }),
        DataType::DateTime(_) => value
            .as_datetime()
            .map(Cell::Timestamp)
            .unwrap_or(Cell::Missing),
        other => Cell::Text(other.to_string()),
    }
}
