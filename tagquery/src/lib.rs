//! Compile tagged filter maps into parameterized SQL predicates and
//! document-store queries.

pub mod app;
pub mod core;
pub mod filter;
pub mod sql;
pub mod utils;
