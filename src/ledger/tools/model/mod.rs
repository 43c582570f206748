use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

use crate::ledger::tools::normalize::normalize_header;

/// Fixed rendering format for every timestamp that leaves the crate.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Text layouts accepted when coercing a cell to a timestamp.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%y %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];

/// A dynamically-typed cell value.
///
/// Source files mix text, numbers, and dates freely, so every cell carries
/// its own tag. Coercions are total: a value that cannot be read as the
/// requested type yields `None`, never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Plain text content.
    Text(String),
    /// Numeric content, including spreadsheet integers and booleans.
    Number(f64),
    /// A parsed point in time.
    Timestamp(NaiveDateTime),
    /// An empty or unusable cell.
    Missing,
}

impl Cell {
    /// Best-effort numeric view of the cell.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            Cell::Text(value) => value.trim().parse::<f64>().ok(),
            Cell::Timestamp(_) | Cell::Missing => None,
        }
    }

    /// Best-effort timestamp view of the cell.
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::Timestamp(value) => Some(*value),
            Cell::Text(value) => parse_timestamp(value),
            Cell::Number(_) | Cell::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Renders the cell as display text. Missing cells render empty.
    pub fn render(&self) -> String {
        match self {
            Cell::Text(value) => value.clone(),
            Cell::Number(value) => value.to_string(),
            Cell::Timestamp(value) => value.format(DATE_FORMAT).to_string(),
            Cell::Missing => String::new(),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Text(value) => serializer.serialize_str(value),
            Cell::Number(value) => serializer.serialize_f64(*value),
            Cell::Timestamp(value) => {
                serializer.serialize_str(&value.format(DATE_FORMAT).to_string())
            }
            Cell::Missing => serializer.serialize_none(),
        }
    }
}

/// Parses free-form text into a timestamp using the accepted layouts.
pub(crate) fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(value);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(value) = NaiveDate::parse_from_str(trimmed, format) {
            return value.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// An in-memory table with normalized, unique column names.
///
/// Rows are stored column-indexed and padded to the header width. Column
/// names that collide after normalization keep the first occurrence; later
/// duplicates and empty headers are dropped at construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// Builds an empty table from raw header strings.
    ///
    /// Returns the table together with a slot map from source column position
    /// to retained column position (`None` for dropped columns), which
    /// readers use to place cells from each source row.
    pub fn from_headers<I>(raw_headers: I) -> (Self, Vec<Option<usize>>)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut table = RawTable::default();
        let mut slots = Vec::new();
        for raw in raw_headers {
            let name = normalize_header(raw.as_ref());
            if name.is_empty() || table.index.contains_key(&name) {
                slots.push(None);
                continue;
            }
            table.index.insert(name.clone(), table.columns.len());
            slots.push(Some(table.columns.len()));
            table.columns.push(name);
        }
        (table, slots)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        &self.rows[row][column]
    }

    /// Appends a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Missing);
        self.rows.push(row);
    }

    /// Rewrites one column in place. Used for date coercion after load.
    pub fn map_column<F>(&mut self, column: usize, mut convert: F)
    where
        F: FnMut(&Cell) -> Cell,
    {
        for row in &mut self.rows {
            row[column] = convert(&row[column]);
        }
    }

    /// Appends a derived column with one cell per existing row.
    ///
    /// The caller guarantees the name is not already present; derived names
    /// contain `_`, which normalized headers never do.
    pub fn append_column(&mut self, name: &str, cells: Vec<Cell>) {
        debug_assert_eq!(cells.len(), self.rows.len());
        self.index.insert(name.to_string(), self.columns.len());
        self.columns.push(name.to_string());
        for (row, cell) in self.rows.iter_mut().zip(cells) {
            row.push(cell);
        }
    }
}

/// One of the eight semantic fields the engine locates among source columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    InvoiceId,
    Date,
    Quantity,
    UnitPrice,
    LineTotal,
    Customer,
    Country,
    Description,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::InvoiceId,
        Role::Date,
        Role::Quantity,
        Role::UnitPrice,
        Role::LineTotal,
        Role::Customer,
        Role::Country,
        Role::Description,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::InvoiceId => "invoice_id",
            Role::Date => "date",
            Role::Quantity => "quantity",
            Role::UnitPrice => "unit_price",
            Role::LineTotal => "line_total",
            Role::Customer => "customer",
            Role::Country => "country",
            Role::Description => "description",
        }
    }

    pub fn parse(name: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.as_str() == name)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Association of semantic roles to column names in the current table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaMapping {
    pub invoice_id: Option<String>,
    pub date: Option<String>,
    pub quantity: Option<String>,
    pub unit_price: Option<String>,
    pub line_total: Option<String>,
    pub customer: Option<String>,
    pub country: Option<String>,
    pub description: Option<String>,
}

impl SchemaMapping {
    pub fn get(&self, role: Role) -> Option<&str> {
        let slot = match role {
            Role::InvoiceId => &self.invoice_id,
            Role::Date => &self.date,
            Role::Quantity => &self.quantity,
            Role::UnitPrice => &self.unit_price,
            Role::LineTotal => &self.line_total,
            Role::Customer => &self.customer,
            Role::Country => &self.country,
            Role::Description => &self.description,
        };
        slot.as_deref()
    }

    pub fn set(&mut self, role: Role, column: Option<String>) {
        let slot = match role {
            Role::InvoiceId => &mut self.invoice_id,
            Role::Date => &mut self.date,
            Role::Quantity => &mut self.quantity,
            Role::UnitPrice => &mut self.unit_price,
            Role::LineTotal => &mut self.line_total,
            Role::Customer => &mut self.customer,
            Role::Country => &mut self.country,
            Role::Description => &mut self.description,
        };
        *slot = column;
    }
}

/// Result payload for selecting a data source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    pub schema: SchemaMapping,
    pub rows: usize,
}

/// Result payload for schema introspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaReport {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    pub schema: SchemaMapping,
    pub columns: Vec<String>,
    pub row_count: usize,
}

/// Filters for the invoice listing operation.
#[derive(Debug, Clone)]
pub struct InvoiceQuery {
    /// `YYYY-MM` or `YYYY-MM..YYYY-MM`, inclusive month window.
    pub date_range: Option<String>,
    /// Equality filter on the customer column, compared as text.
    pub customer: Option<String>,
    /// When false and a quantity role exists, negative-quantity rows drop.
    pub include_returns: bool,
    pub max_results: usize,
}

impl Default for InvoiceQuery {
    fn default() -> Self {
        Self {
            date_range: None,
            customer: None,
            include_returns: true,
            max_results: 200,
        }
    }
}

/// One invoice-level aggregate row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceSummary {
    pub invoice_id: String,
    pub total_amount: f64,
    pub line_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// One detail line of an invoice, projected onto the preferred roles.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InvoiceLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Cell>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Cell>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Cell>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Cell>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<Cell>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<Cell>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<Cell>,
}

/// A raw row rendered as a column → cell mapping.
pub type RawRow = BTreeMap<String, Cell>;

/// Detail lines for one invoice, with each degraded fallback kept as its own
/// named branch so callers (and tests) can tell which path was taken.
#[derive(Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InvoiceLines {
    /// Rows matched by invoice id, projected onto the preferred roles.
    Detailed(Vec<InvoiceLine>),
    /// Rows matched by invoice id, but no preferred role is mapped: the
    /// first 10 raw columns are returned instead.
    RawColumns(Vec<RawRow>),
    /// No invoice-id role is mapped: the first 50 raw rows are returned
    /// regardless of the requested id.
    UnkeyedRows(Vec<RawRow>),
}

/// Ranked customer entry in a monthly summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopClient {
    pub customer: String,
    pub total: f64,
}

/// Monthly revenue summary.
///
/// `expenses` and `profit` are always absent; sales data carries no cost
/// side, and the fields exist so callers need not special-case the payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    pub month: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
    pub expenses: Option<f64>,
    pub profit: Option<f64>,
    pub top_clients: Vec<TopClient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub natural_language: Option<String>,
}
