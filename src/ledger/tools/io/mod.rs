//! Reading data sources from disk into [`RawTable`]s.
//!
//! `load_source` is the single entry point: it dispatches on the file
//! extension, infers the schema from the normalized headers, coerces the date
//! role column, and materializes a derived total column when the source has
//! quantity and unit-price columns but no total.

pub mod csv_read;
pub mod excel_read;

use std::path::Path;

use crate::ledger::tools::error::{LedgerError, Result};
use crate::ledger::tools::model::{Cell, RawTable, Role, SchemaMapping};
use crate::ledger::tools::schema;

/// Name of the derived total column. Contains `_`, which normalized source
/// headers never do, so it cannot collide with a real column.
pub const COMPUTED_TOTAL_COLUMN: &str = "computed_total";

/// A fully prepared data source: table, inferred schema, and the selected
/// sheet for workbook files.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSource {
    pub table: RawTable,
    pub schema: SchemaMapping,
    pub sheet_name: Option<String>,
}

/// Reads and prepares the file at `path`.
pub fn load_source(path: &Path) -> Result<LoadedSource> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let (mut table, sheet_name) = match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => {
            let (table, sheet) = excel_read::read_workbook(path)?;
            (table, Some(sheet))
        }
        "csv" => (csv_read::read_table(path)?, None),
        _ => return Err(LedgerError::UnsupportedFileType(extension)),
    };

    let mut schema = schema::infer(table.columns());
    coerce_date_column(&mut table, &schema);
    derive_line_total(&mut table, &mut schema);

    Ok(LoadedSource {
        table,
        schema,
        sheet_name,
    })
}

/// Best-effort conversion of the date role column to timestamps.
/// Unparseable values become missing, never an error.
fn coerce_date_column(table: &mut RawTable, schema: &SchemaMapping) {
    let Some(column) = schema
        .get(Role::Date)
        .and_then(|name| table.column_index(name))
    else {
        return;
    };
    table.map_column(column, |cell| match cell.as_timestamp() {
        Some(timestamp) => Cell::Timestamp(timestamp),
        None => Cell::Missing,
    });
}

/// Appends a quantity × unit-price product column when no total is mapped,
/// and redirects the `line_total` role to it. Non-numeric factors count as
/// zero.
fn derive_line_total(table: &mut RawTable, schema: &mut SchemaMapping) {
    if schema.get(Role::LineTotal).is_some() {
        return;
    }
    let quantity = schema
        .get(Role::Quantity)
        .and_then(|name| table.column_index(name));
    let unit_price = schema
        .get(Role::UnitPrice)
        .and_then(|name| table.column_index(name));
    let (Some(quantity), Some(unit_price)) = (quantity, unit_price) else {
        return;
    };

    let cells: Vec<Cell> = table
        .rows()
        .iter()
        .map(|row| {
            let quantity = row[quantity].as_number().unwrap_or(0.0);
            let price = row[unit_price].as_number().unwrap_or(0.0);
            Cell::Number(quantity * price)
        })
        .collect();
    table.append_column(COMPUTED_TOTAL_COLUMN, cells);
    schema.set(Role::LineTotal, Some(COMPUTED_TOTAL_COLUMN.to_string()));
}
