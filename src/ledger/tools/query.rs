//! Query operations over a loaded table and its schema mapping.
//!
//! Every function here is pure: it reads the table and mapping and produces a
//! result payload. Missing roles never fail a query; each one degrades along
//! an explicit fallback (see the individual operations).

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, hash_map::Entry};

use chrono::{Duration, Months, NaiveDate, NaiveDateTime};

use crate::ledger::tools::error::{LedgerError, Result};
use crate::ledger::tools::model::{
    Cell, DATE_FORMAT, InvoiceLine, InvoiceLines, InvoiceQuery, InvoiceSummary, MonthSummary,
    RawRow, RawTable, Role, SchemaMapping, TopClient,
};

/// How row totals are resolved, in order of preference: a mapped total
/// column, the quantity × unit-price product, or a constant 1.0 per line so
/// the operation still returns counts rather than failing.
enum TotalSource {
    Column(usize),
    Product { quantity: usize, unit_price: usize },
    LineCount,
}

fn role_column(table: &RawTable, schema: &SchemaMapping, role: Role) -> Option<usize> {
    schema.get(role).and_then(|name| table.column_index(name))
}

fn resolve_total_source(table: &RawTable, schema: &SchemaMapping) -> TotalSource {
    if let Some(column) = role_column(table, schema, Role::LineTotal) {
        return TotalSource::Column(column);
    }
    let quantity = role_column(table, schema, Role::Quantity);
    let unit_price = role_column(table, schema, Role::UnitPrice);
    match (quantity, unit_price) {
        (Some(quantity), Some(unit_price)) => TotalSource::Product {
            quantity,
            unit_price,
        },
        _ => TotalSource::LineCount,
    }
}

fn row_total(row: &[Cell], source: &TotalSource) -> f64 {
    match source {
        TotalSource::Column(column) => row[*column].as_number().unwrap_or(0.0),
        TotalSource::Product {
            quantity,
            unit_price,
        } => {
            row[*quantity].as_number().unwrap_or(0.0) * row[*unit_price].as_number().unwrap_or(0.0)
        }
        TotalSource::LineCount => 1.0,
    }
}

/// Bounds of one `YYYY-MM` month: its first through its last second.
pub(crate) fn month_bounds(month: &str) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let invalid = || LedgerError::InvalidDateRange(month.to_string());
    let first = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .map_err(|_| invalid())?;
    let next = first
        .checked_add_months(Months::new(1))
        .ok_or_else(invalid)?;
    let start = first.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
    let end = next.and_hms_opt(0, 0, 0).ok_or_else(invalid)? - Duration::seconds(1);
    Ok((start, end))
}

/// Bounds of a `YYYY-MM` month or an inclusive `A..B` month range.
pub(crate) fn resolve_range(date_range: &str) -> Result<(NaiveDateTime, NaiveDateTime)> {
    match date_range.split_once("..") {
        Some((from, to)) => {
            let (start, _) = month_bounds(from)?;
            let (_, end) = month_bounds(to)?;
            Ok((start, end))
        }
        None => month_bounds(date_range),
    }
}

/// Distinct `YYYY-MM` periods present in the date column, newest first.
/// Empty when no date role is mapped.
pub fn list_months(table: &RawTable, schema: &SchemaMapping, limit: usize) -> Vec<String> {
    let Some(date) = role_column(table, schema, Role::Date) else {
        return Vec::new();
    };
    let mut months = BTreeSet::new();
    for row in table.rows() {
        if let Some(timestamp) = row[date].as_timestamp() {
            months.insert(timestamp.format("%Y-%m").to_string());
        }
    }
    months.into_iter().rev().take(limit).collect()
}

/// Aggregates line records into invoice-level summaries.
pub fn invoices(
    table: &RawTable,
    schema: &SchemaMapping,
    query: &InvoiceQuery,
) -> Result<Vec<InvoiceSummary>> {
    let invoice = role_column(table, schema, Role::InvoiceId);
    let date = role_column(table, schema, Role::Date);
    let quantity = role_column(table, schema, Role::Quantity);
    let customer = role_column(table, schema, Role::Customer);
    let country = role_column(table, schema, Role::Country);
    let total_source = resolve_total_source(table, schema);

    // Without a date role the range filter is a no-op; the token is not even
    // parsed, so a malformed range cannot fail a dateless table.
    let bounds = match (&query.date_range, date) {
        (Some(range), Some(_)) => Some(resolve_range(range)?),
        _ => None,
    };

    let mut selected = Vec::new();
    for (row_index, row) in table.rows().iter().enumerate() {
        if !query.include_returns {
            if let Some(quantity) = quantity {
                if row[quantity].as_number().unwrap_or(0.0) < 0.0 {
                    continue;
                }
            }
        }
        if let (Some((start, end)), Some(date)) = (bounds, date) {
            match row[date].as_timestamp() {
                Some(timestamp) if timestamp >= start && timestamp <= end => {}
                _ => continue,
            }
        }
        if let (Some(filter), Some(customer)) = (&query.customer, customer) {
            if row[customer].render() != *filter {
                continue;
            }
        }
        selected.push(row_index);
    }
    if selected.is_empty() {
        return Ok(Vec::new());
    }

    struct Group {
        key: String,
        total: f64,
        line_count: usize,
        first_date: Option<NaiveDateTime>,
        customer: Option<String>,
        country: Option<String>,
    }

    let mut groups: Vec<Group> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();
    for (position, row_index) in selected.iter().enumerate() {
        let row = &table.rows()[*row_index];
        let key = match invoice {
            Some(column) if row[column].is_missing() => continue,
            Some(column) => row[column].render(),
            // Degraded mode: no invoice-id role, so every filtered row
            // becomes its own invoice under a 0-based surrogate key.
            None => position.to_string(),
        };
        let group_index = match by_key.entry(key) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let index = groups.len();
                groups.push(Group {
                    key: entry.key().clone(),
                    total: 0.0,
                    line_count: 0,
                    first_date: None,
                    customer: None,
                    country: None,
                });
                entry.insert(index);
                index
            }
        };
        let group = &mut groups[group_index];
        group.total += row_total(row, &total_source);
        group.line_count += 1;
        if let Some(date) = date {
            if let Some(timestamp) = row[date].as_timestamp() {
                group.first_date =
                    Some(group.first_date.map_or(timestamp, |seen| seen.min(timestamp)));
            }
        }
        if let Some(customer) = customer {
            if group.customer.is_none() && !row[customer].is_missing() {
                group.customer = Some(row[customer].render());
            }
        }
        if let Some(country) = country {
            if group.country.is_none() && !row[country].is_missing() {
                group.country = Some(row[country].render());
            }
        }
    }

    // Stable sorts keep first-seen group order on ties. Newest invoices
    // first; groups without a parseable date sort last.
    if date.is_some() {
        groups.sort_by(|a, b| match (a.first_date, b.first_date) {
            (Some(left), Some(right)) => right.cmp(&left),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
    } else {
        groups.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(Ordering::Equal));
    }
    groups.truncate(query.max_results);

    Ok(groups
        .into_iter()
        .map(|group| InvoiceSummary {
            invoice_id: group.key,
            total_amount: group.total,
            line_count: group.line_count,
            invoice_date: group
                .first_date
                .map(|timestamp| timestamp.format(DATE_FORMAT).to_string()),
            customer: group.customer,
            country: group.country,
        })
        .collect())
}

/// Detail lines for one invoice id.
pub fn invoice_lines(table: &RawTable, schema: &SchemaMapping, invoice_id: &str) -> InvoiceLines {
    let Some(key_column) = role_column(table, schema, Role::InvoiceId) else {
        // No invoice notion at all: dump the first 50 raw rows, whatever id
        // was asked for.
        let rows = table
            .rows()
            .iter()
            .take(50)
            .map(|row| render_raw_row(table, row, table.columns().len()))
            .collect();
        return InvoiceLines::UnkeyedRows(rows);
    };

    let matching: Vec<&Vec<Cell>> = table
        .rows()
        .iter()
        .filter(|row| row[key_column].render() == invoice_id)
        .collect();
    if matching.is_empty() {
        return InvoiceLines::Detailed(Vec::new());
    }

    let description = role_column(table, schema, Role::Description);
    let quantity = role_column(table, schema, Role::Quantity);
    let unit_price = role_column(table, schema, Role::UnitPrice);
    let line_total = role_column(table, schema, Role::LineTotal);
    let date = role_column(table, schema, Role::Date);
    let customer = role_column(table, schema, Role::Customer);
    let country = role_column(table, schema, Role::Country);
    let compute_total = line_total.is_none() && quantity.is_some() && unit_price.is_some();

    let any_preferred = [description, quantity, unit_price, line_total, date, customer, country]
        .iter()
        .any(Option::is_some);
    if !any_preferred {
        let width = table.columns().len().min(10);
        let rows = matching
            .iter()
            .map(|row| render_raw_row(table, row, width))
            .collect();
        return InvoiceLines::RawColumns(rows);
    }

    let lines = matching
        .iter()
        .map(|row| InvoiceLine {
            description: description.map(|column| row[column].clone()),
            quantity: quantity.map(|column| row[column].clone()),
            unit_price: unit_price.map(|column| row[column].clone()),
            total: if let Some(column) = line_total {
                Some(row[column].clone())
            } else if compute_total {
                let product = quantity
                    .and_then(|column| row[column].as_number())
                    .zip(unit_price.and_then(|column| row[column].as_number()))
                    .map(|(quantity, price)| quantity * price);
                Some(product.map(Cell::Number).unwrap_or(Cell::Missing))
            } else {
                None
            },
            date: date.map(|column| row[column].clone()),
            customer: customer.map(|column| row[column].clone()),
            country: country.map(|column| row[column].clone()),
        })
        .collect();
    InvoiceLines::Detailed(lines)
}

fn render_raw_row(table: &RawTable, row: &[Cell], width: usize) -> RawRow {
    table
        .columns()
        .iter()
        .take(width)
        .enumerate()
        .map(|(index, name)| (name.clone(), row[index].clone()))
        .collect()
}

/// Revenue and top customers for one `YYYY-MM` month.
pub fn summarize_month(
    table: &RawTable,
    schema: &SchemaMapping,
    month: &str,
    include_returns: bool,
    top_n_clients: usize,
) -> Result<MonthSummary> {
    let Some(date) = role_column(table, schema, Role::Date) else {
        return Ok(MonthSummary {
            month: month.to_string(),
            revenue: None,
            expenses: None,
            profit: None,
            top_clients: Vec::new(),
            message: Some("No usable date column detected.".to_string()),
            natural_language: None,
        });
    };
    let (start, end) = month_bounds(month)?;
    let quantity = role_column(table, schema, Role::Quantity);
    let customer = role_column(table, schema, Role::Customer);
    let total_source = resolve_total_source(table, schema);

    let mut revenue = 0.0;
    let mut clients: Vec<TopClient> = Vec::new();
    let mut client_index: HashMap<String, usize> = HashMap::new();
    let mut matched = false;
    for row in table.rows() {
        match row[date].as_timestamp() {
            Some(timestamp) if timestamp >= start && timestamp <= end => {}
            _ => continue,
        }
        if !include_returns {
            if let Some(quantity) = quantity {
                if row[quantity].as_number().unwrap_or(0.0) < 0.0 {
                    continue;
                }
            }
        }
        matched = true;
        let total = row_total(row, &total_source);
        revenue += total;
        if let Some(customer) = customer {
            if !row[customer].is_missing() {
                let index = match client_index.entry(row[customer].render()) {
                    Entry::Occupied(entry) => *entry.get(),
                    Entry::Vacant(entry) => {
                        let index = clients.len();
                        clients.push(TopClient {
                            customer: entry.key().clone(),
                            total: 0.0,
                        });
                        entry.insert(index);
                        index
                    }
                };
                clients[index].total += total;
            }
        }
    }

    if !matched {
        return Ok(MonthSummary {
            month: month.to_string(),
            revenue: Some(0.0),
            expenses: None,
            profit: None,
            top_clients: Vec::new(),
            message: Some("No data for this month.".to_string()),
            natural_language: None,
        });
    }

    // Stable sort: equal totals keep first-seen grouping order.
    clients.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(Ordering::Equal));
    clients.truncate(top_n_clients);

    let mut narrative = format!("For {month}, revenue ${}.", format_currency(revenue));
    if !clients.is_empty() {
        let ranked: Vec<String> = clients
            .iter()
            .map(|client| format!("{} (${})", client.customer, format_currency(client.total)))
            .collect();
        narrative.push_str(&format!(" Top clients: {}", ranked.join(", ")));
    }

    Ok(MonthSummary {
        month: month.to_string(),
        revenue: Some(revenue),
        expenses: None,
        profit: None,
        top_clients: clients,
        message: None,
        natural_language: Some(narrative),
    })
}

/// Renders a monetary value with thousands separators and two decimals.
fn format_currency(value: f64) -> String {
    let rounded = format!("{:.2}", value.abs());
    let (units, cents) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));
    let mut grouped = String::new();
    for (index, digit) in units.chars().enumerate() {
        if index > 0 && (units.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{cents}")
}
