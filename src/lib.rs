//! Core library for the ledger-tools command line application.
//!
//! The library exposes high-level query helpers that power the command-line
//! interface as well as the tests. The modules are structured to keep
//! responsibilities narrow and composable: IO adapters live under
//! [`ledger::tools::io`], data representations inside [`ledger::tools::model`],
//! header canonicalization and role inference in [`ledger::tools::normalize`]
//! and [`ledger::tools::schema`], the query operations in
//! [`ledger::tools::query`], and the stateful source cache under
//! [`ledger::tools::session`].

pub mod ledger;

pub use ledger::tools::{
    DataSession, LedgerError, Result, error, io, logging, model, normalize, query, schema, session,
};
