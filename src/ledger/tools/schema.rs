//! Schema inference: mapping normalized source columns onto semantic roles.

use crate::ledger::tools::error::{LedgerError, Result};
use crate::ledger::tools::model::{RawTable, Role, SchemaMapping};

/// Known header spellings per role, in priority order.
///
/// Every entry is already in canonical form (see
/// [`normalize_header`](crate::ledger::tools::normalize::normalize_header)),
/// so membership tests against normalized table columns are plain string
/// equality. List order is the tie-break: the first spelling present in the
/// table wins, regardless of the physical column order in the source.
const SYNONYMS: &[(Role, &[&str])] = &[
    (
        Role::InvoiceId,
        &[
            "invoice no",
            "invoiceno",
            "invoice",
            "invoice number",
            "orderid",
            "order id",
            "order no",
            "billno",
            "bill no",
            "inv no",
            "invno",
            "document number",
        ],
    ),
    (
        Role::Date,
        &[
            "invoicedate",
            "invoice date",
            "date",
            "order date",
            "document date",
            "posting date",
        ],
    ),
    (Role::Quantity, &["quantity", "qty", "qnty", "units", "count"]),
    (
        Role::UnitPrice,
        &["unitprice", "unit price", "price", "rate", "unit cost", "cost"],
    ),
    (
        Role::LineTotal,
        &[
            "linetotal",
            "line total",
            "amount",
            "total",
            "value",
            "net amount",
            "gross amount",
            "subtotal",
        ],
    ),
    (
        Role::Customer,
        &[
            "customerid",
            "customer id",
            "customer",
            "client",
            "account",
            "buyer",
            "party",
            "sold to",
            "customer code",
            "customer no",
        ],
    ),
    (Role::Country, &["country", "region", "market"]),
    (
        Role::Description,
        &["description", "item", "product", "sku name", "name", "details"],
    ),
];

fn synonyms_for(role: Role) -> &'static [&'static str] {
    SYNONYMS
        .iter()
        .find(|(candidate, _)| *candidate == role)
        .map(|(_, spellings)| *spellings)
        .unwrap_or(&[])
}

/// Picks the first synonym, in table order, that is present in `columns`.
fn choose_best(columns: &[String], spellings: &[&str]) -> Option<String> {
    spellings
        .iter()
        .find(|spelling| columns.iter().any(|column| column == *spelling))
        .map(|spelling| (*spelling).to_string())
}

/// Infers a schema mapping from normalized column names.
pub fn infer(columns: &[String]) -> SchemaMapping {
    let mut mapping = SchemaMapping::default();
    for role in Role::ALL {
        mapping.set(role, choose_best(columns, synonyms_for(role)));
    }
    mapping
}

/// Counts the roles for which at least one synonym is present.
///
/// Used to rank candidate sheets in multi-sheet workbooks.
pub fn score(columns: &[String]) -> usize {
    Role::ALL
        .into_iter()
        .filter(|role| choose_best(columns, synonyms_for(*role)).is_some())
        .count()
}

/// Applies one manual override to the mapping.
///
/// The role name must be one of the eight known roles and the column, when
/// given, must exist in the current table. `None` explicitly unsets a role.
pub fn apply_override(
    mapping: &mut SchemaMapping,
    table: &RawTable,
    role_name: &str,
    column: Option<&str>,
) -> Result<()> {
    let role =
        Role::parse(role_name).ok_or_else(|| LedgerError::UnknownRole(role_name.to_string()))?;
    if let Some(column) = column {
        if table.column_index(column).is_none() {
            return Err(LedgerError::ColumnNotFound {
                column: column.to_string(),
            });
        }
    }
    mapping.set(role, column.map(str::to_string));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn infers_the_retail_layout() {
        let cols = columns(&[
            "invoiceno",
            "stockcode",
            "description",
            "quantity",
            "invoicedate",
            "unitprice",
            "customerid",
            "country",
        ]);
        let mapping = infer(&cols);
        assert_eq!(mapping.invoice_id.as_deref(), Some("invoiceno"));
        assert_eq!(mapping.date.as_deref(), Some("invoicedate"));
        assert_eq!(mapping.quantity.as_deref(), Some("quantity"));
        assert_eq!(mapping.unit_price.as_deref(), Some("unitprice"));
        assert_eq!(mapping.customer.as_deref(), Some("customerid"));
        assert_eq!(mapping.country.as_deref(), Some("country"));
        assert_eq!(mapping.description.as_deref(), Some("description"));
        assert_eq!(mapping.line_total, None);
    }

    #[test]
    fn synonym_order_beats_column_order() {
        // "invoice" precedes "order id" in the synonym table, so it wins even
        // when the source file lists the order id column first.
        let cols = columns(&["order id", "invoice"]);
        assert_eq!(infer(&cols).invoice_id.as_deref(), Some("invoice"));

        let reversed = columns(&["invoice", "order id"]);
        assert_eq!(infer(&reversed).invoice_id.as_deref(), Some("invoice"));
    }

    #[test]
    fn score_counts_matched_roles() {
        let all = columns(&[
            "invoice no",
            "date",
            "quantity",
            "unit price",
            "line total",
            "customer",
            "country",
            "description",
        ]);
        assert_eq!(score(&all), 8);
        assert_eq!(score(&[]), 0);
        assert_eq!(score(&columns(&["stockcode", "warehouse"])), 0);
    }

    #[test]
    fn override_validates_role_and_column() {
        let (table, _) = RawTable::from_headers(["invoice", "price"]);
        let mut mapping = infer(table.columns());

        apply_override(&mut mapping, &table, "unit_price", Some("price")).unwrap();
        assert_eq!(mapping.unit_price.as_deref(), Some("price"));

        apply_override(&mut mapping, &table, "unit_price", None).unwrap();
        assert_eq!(mapping.unit_price, None);

        let unknown = apply_override(&mut mapping, &table, "grand_total", Some("price"));
        assert!(matches!(unknown, Err(LedgerError::UnknownRole(_))));

        let missing = apply_override(&mut mapping, &table, "customer", Some("buyer name"));
        assert!(matches!(
            missing,
            Err(LedgerError::ColumnNotFound { column }) if column == "buyer name"
        ));
    }
}
