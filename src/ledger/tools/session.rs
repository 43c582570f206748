//! The caller-held session owning the active data source and its cache.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info, instrument};

use crate::ledger::tools::error::{LedgerError, Result};
use crate::ledger::tools::io::{self, LoadedSource};
use crate::ledger::tools::model::{
    InvoiceLines, InvoiceQuery, InvoiceSummary, MonthSummary, RawTable, SchemaMapping,
    SchemaReport, SourceSummary,
};
use crate::ledger::tools::{query, schema};

/// One analysis session over a single data source.
///
/// The session lazily loads the source and keeps the table and schema cached.
/// Before every operation the file's modification time is compared against
/// the cached one and the source is reloaded when it differs; this is the
/// only invalidation rule, so content changes that keep the mtime are not
/// detected. A reload re-infers the schema, discarding manual overrides.
#[derive(Debug, Default)]
pub struct DataSession {
    path: Option<PathBuf>,
    cache: Option<CachedSource>,
}

#[derive(Debug)]
struct CachedSource {
    loaded: LoadedSource,
    modified: SystemTime,
}

impl DataSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points the session at a spreadsheet or CSV file and loads it.
    #[instrument(level = "info", skip_all)]
    pub fn set_source(&mut self, path: impl AsRef<Path>) -> Result<SourceSummary> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(LedgerError::SourceFileMissing(path));
        }
        info!(path = %path.display(), "selecting data source");
        self.path = Some(path);
        self.cache = None;
        self.ensure_loaded()?;

        let cache = self.cached()?;
        Ok(SourceSummary {
            path: display_path(&self.path)?,
            sheet: cache.loaded.sheet_name.clone(),
            schema: cache.loaded.schema.clone(),
            rows: cache.loaded.table.row_count(),
        })
    }

    /// Returns the current schema mapping together with the table shape.
    #[instrument(level = "info", skip(self))]
    pub fn schema_report(&mut self) -> Result<SchemaReport> {
        self.ensure_loaded()?;
        let cache = self.cached()?;
        Ok(SchemaReport {
            path: display_path(&self.path)?,
            sheet: cache.loaded.sheet_name.clone(),
            schema: cache.loaded.schema.clone(),
            columns: cache.loaded.table.columns().to_vec(),
            row_count: cache.loaded.table.row_count(),
        })
    }

    /// Applies manual role overrides. A `None` column unsets the role.
    #[instrument(level = "info", skip(self, changes))]
    pub fn override_schema(
        &mut self,
        changes: &[(String, Option<String>)],
    ) -> Result<SchemaMapping> {
        self.ensure_loaded()?;
        let Some(cache) = self.cache.as_mut() else {
            return Err(LedgerError::NoDataSource);
        };
        for (role, column) in changes {
            schema::apply_override(
                &mut cache.loaded.schema,
                &cache.loaded.table,
                role,
                column.as_deref(),
            )?;
            info!(role = %role, column = ?column, "schema role overridden");
        }
        Ok(cache.loaded.schema.clone())
    }

    /// Distinct `YYYY-MM` months in the date column, newest first.
    #[instrument(level = "info", skip(self))]
    pub fn list_months(&mut self, limit: usize) -> Result<Vec<String>> {
        let (table, mapping) = self.source()?;
        Ok(query::list_months(table, mapping, limit))
    }

    /// Invoice-level aggregates, filtered per the query.
    #[instrument(level = "info", skip(self, request))]
    pub fn invoices(&mut self, request: &InvoiceQuery) -> Result<Vec<InvoiceSummary>> {
        let (table, mapping) = self.source()?;
        query::invoices(table, mapping, request)
    }

    /// Detail lines for one invoice id.
    #[instrument(level = "info", skip(self))]
    pub fn invoice_lines(&mut self, invoice_id: &str) -> Result<InvoiceLines> {
        let (table, mapping) = self.source()?;
        Ok(query::invoice_lines(table, mapping, invoice_id))
    }

    /// Revenue and top customers for one `YYYY-MM` month.
    #[instrument(level = "info", skip(self))]
    pub fn summarize_month(
        &mut self,
        month: &str,
        include_returns: bool,
        top_n_clients: usize,
    ) -> Result<MonthSummary> {
        let (table, mapping) = self.source()?;
        query::summarize_month(table, mapping, month, include_returns, top_n_clients)
    }

    /// Re-validates cache freshness and reloads the source when stale.
    fn ensure_loaded(&mut self) -> Result<()> {
        let path = self.path.clone().ok_or(LedgerError::NoDataSource)?;
        if !path.is_file() {
            return Err(LedgerError::SourceFileMissing(path));
        }
        let modified = std::fs::metadata(&path)?.modified()?;
        if let Some(cache) = &self.cache {
            if cache.modified == modified {
                return Ok(());
            }
        }
        debug!(path = %path.display(), "loading data source");
        let loaded = io::load_source(&path)?;
        info!(
            rows = loaded.table.row_count(),
            sheet = ?loaded.sheet_name,
            "data source loaded"
        );
        self.cache = Some(CachedSource { loaded, modified });
        Ok(())
    }

    fn cached(&self) -> Result<&CachedSource> {
        self.cache.as_ref().ok_or(LedgerError::NoDataSource)
    }

    fn source(&mut self) -> Result<(&RawTable, &SchemaMapping)> {
        self.ensure_loaded()?;
        let cache = self.cached()?;
        Ok((&cache.loaded.table, &cache.loaded.schema))
    }
}

fn display_path(path: &Option<PathBuf>) -> Result<String> {
    path.as_ref()
        .map(|path| path.display().to_string())
        .ok_or(LedgerError::NoDataSource)
}
