use std::fs;
use std::thread;
use std::time::Duration;

use ledger_tools::model::{Cell, InvoiceLines, InvoiceQuery};
use ledger_tools::{DataSession, LedgerError};
use tempfile::tempdir;

const RETAIL_CSV: &str = "\
InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country
536365,85123A,WHITE HANGING HEART,6,2010-12-01 08:26:00,2.5,17850,United Kingdom
536365,71053,WHITE METAL LANTERN,6,2010-12-01 08:26:00,3.25,17850,United Kingdom
C536379,D,Discount,-1,2010-12-02 09:41:00,27.5,14527,United Kingdom
536520,21754,HOME BUILDING BLOCK,3,2011-01-04 11:00:00,5.75,14606,United Kingdom
";

fn retail_session(dir: &tempfile::TempDir) -> (DataSession, std::path::PathBuf) {
    let path = dir.path().join("retail.csv");
    fs::write(&path, RETAIL_CSV).expect("fixture written");
    let mut session = DataSession::new();
    session.set_source(&path).expect("source selected");
    (session, path)
}

#[test]
fn selecting_a_source_infers_the_schema() {
    let dir = tempdir().expect("temporary directory");
    let path = dir.path().join("retail.csv");
    fs::write(&path, RETAIL_CSV).expect("fixture written");

    let mut session = DataSession::new();
    let summary = session.set_source(&path).expect("source selected");

    assert_eq!(summary.rows, 4);
    assert_eq!(summary.sheet, None);
    assert_eq!(summary.schema.invoice_id.as_deref(), Some("invoiceno"));
    assert_eq!(summary.schema.date.as_deref(), Some("invoicedate"));
    assert_eq!(summary.schema.customer.as_deref(), Some("customerid"));
    // No total column in the file, so one is derived from qty × price.
    assert_eq!(summary.schema.line_total.as_deref(), Some("computed_total"));

    let report = session.schema_report().expect("schema report");
    assert_eq!(report.row_count, 4);
    assert!(report.columns.iter().any(|column| column == "stockcode"));
    assert!(report.columns.iter().any(|column| column == "computed_total"));
}

#[test]
fn invoices_aggregate_lines_newest_first() {
    let dir = tempdir().expect("temporary directory");
    let (mut session, _) = retail_session(&dir);

    let invoices = session
        .invoices(&InvoiceQuery::default())
        .expect("invoice listing");
    assert_eq!(invoices.len(), 3);

    assert_eq!(invoices[0].invoice_id, "536520");
    assert_eq!(invoices[0].total_amount, 17.25);
    assert_eq!(
        invoices[0].invoice_date.as_deref(),
        Some("2011-01-04 11:00:00")
    );

    assert_eq!(invoices[1].invoice_id, "C536379");
    assert_eq!(invoices[1].total_amount, -27.5);

    assert_eq!(invoices[2].invoice_id, "536365");
    assert_eq!(invoices[2].total_amount, 34.5);
    assert_eq!(invoices[2].line_count, 2);
    assert_eq!(invoices[2].customer.as_deref(), Some("17850"));
    assert_eq!(invoices[2].country.as_deref(), Some("United Kingdom"));
    assert_eq!(
        invoices[2].invoice_date.as_deref(),
        Some("2010-12-01 08:26:00")
    );
}

#[test]
fn invoice_filters_compose() {
    let dir = tempdir().expect("temporary directory");
    let (mut session, _) = retail_session(&dir);

    let december = session
        .invoices(&InvoiceQuery {
            date_range: Some("2010-12".into()),
            ..InvoiceQuery::default()
        })
        .expect("december invoices");
    assert_eq!(december.len(), 2);

    let one_customer = session
        .invoices(&InvoiceQuery {
            customer: Some("17850".into()),
            ..InvoiceQuery::default()
        })
        .expect("customer invoices");
    assert_eq!(one_customer.len(), 1);
    assert_eq!(one_customer[0].invoice_id, "536365");

    // The credit note is a single negative-quantity line; excluding returns
    // removes the whole invoice.
    let sales_only = session
        .invoices(&InvoiceQuery {
            include_returns: false,
            ..InvoiceQuery::default()
        })
        .expect("sales-only invoices");
    assert_eq!(sales_only.len(), 2);
    assert!(sales_only.iter().all(|invoice| invoice.invoice_id != "C536379"));
}

#[test]
fn months_and_summary_reflect_the_date_column() {
    let dir = tempdir().expect("temporary directory");
    let (mut session, _) = retail_session(&dir);

    assert_eq!(
        session.list_months(24).expect("months"),
        ["2011-01", "2010-12"]
    );
    assert_eq!(session.list_months(1).expect("months"), ["2011-01"]);

    let summary = session
        .summarize_month("2010-12", true, 5)
        .expect("summary");
    assert_eq!(summary.revenue, Some(7.0));
    assert_eq!(summary.top_clients.len(), 2);
    assert_eq!(summary.top_clients[0].customer, "17850");
    assert_eq!(summary.top_clients[0].total, 34.5);
    assert_eq!(
        summary.natural_language.as_deref(),
        Some("For 2010-12, revenue $7.00. Top clients: 17850 ($34.50), 14527 ($-27.50)")
    );

    let sales_only = session
        .summarize_month("2010-12", false, 5)
        .expect("summary");
    assert_eq!(sales_only.revenue, Some(34.5));
}

#[test]
fn invoice_lines_are_projected_onto_preferred_roles() {
    let dir = tempdir().expect("temporary directory");
    let (mut session, _) = retail_session(&dir);

    let lines = session.invoice_lines("536365").expect("invoice lines");
    let InvoiceLines::Detailed(lines) = lines else {
        panic!("expected detailed lines");
    };
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0].description,
        Some(Cell::Text("WHITE HANGING HEART".into()))
    );
    assert_eq!(lines[0].quantity, Some(Cell::Text("6".into())));
    assert_eq!(lines[0].total, Some(Cell::Number(15.0)));
    assert!(matches!(lines[0].date, Some(Cell::Timestamp(_))));

    let missing = session.invoice_lines("999999").expect("invoice lines");
    assert_eq!(missing, InvoiceLines::Detailed(Vec::new()));
}

#[test]
fn error_taxonomy_is_surfaced_verbatim() {
    let dir = tempdir().expect("temporary directory");

    let mut fresh = DataSession::new();
    assert!(matches!(
        fresh.list_months(24),
        Err(LedgerError::NoDataSource)
    ));

    let mut session = DataSession::new();
    assert!(matches!(
        session.set_source(dir.path().join("absent.csv")),
        Err(LedgerError::SourceFileMissing(_))
    ));

    let notes = dir.path().join("notes.txt");
    fs::write(&notes, "not a table").expect("fixture written");
    assert!(matches!(
        session.set_source(&notes),
        Err(LedgerError::UnsupportedFileType(ext)) if ext == "txt"
    ));

    let (mut session, _) = retail_session(&dir);
    assert!(matches!(
        session.invoices(&InvoiceQuery {
            date_range: Some("last month".into()),
            ..InvoiceQuery::default()
        }),
        Err(LedgerError::InvalidDateRange(_))
    ));
    assert!(matches!(
        session.override_schema(&[("grand_total".into(), Some("country".into()))]),
        Err(LedgerError::UnknownRole(_))
    ));
    assert!(matches!(
        session.override_schema(&[("customer".into(), Some("buyer name".into()))]),
        Err(LedgerError::ColumnNotFound { .. })
    ));
}

#[test]
fn overrides_persist_until_the_file_changes() {
    let dir = tempdir().expect("temporary directory");
    let (mut session, path) = retail_session(&dir);

    let mapping = session
        .override_schema(&[("customer".into(), Some("country".into()))])
        .expect("override applied");
    assert_eq!(mapping.customer.as_deref(), Some("country"));

    // Queries reuse the cached table while the mtime is unchanged, so the
    // override keeps steering them.
    let invoices = session
        .invoices(&InvoiceQuery {
            customer: Some("United Kingdom".into()),
            ..InvoiceQuery::default()
        })
        .expect("invoice listing");
    assert_eq!(invoices.len(), 3);
    let report = session.schema_report().expect("schema report");
    assert_eq!(report.schema.customer.as_deref(), Some("country"));

    // Rewriting the file bumps the mtime; the next operation reloads and
    // re-infers, dropping the override.
    thread::sleep(Duration::from_millis(100));
    fs::write(&path, "Invoice,Amount\nZ9,4.0\n").expect("fixture rewritten");

    let report = session.schema_report().expect("schema report");
    assert_eq!(report.row_count, 1);
    assert_eq!(report.schema.invoice_id.as_deref(), Some("invoice"));
    assert_eq!(report.schema.customer, None);

    // Unsetting a role is an explicit override too.
    let mapping = session
        .override_schema(&[("line_total".into(), None)])
        .expect("override applied");
    assert_eq!(mapping.line_total, None);
}
