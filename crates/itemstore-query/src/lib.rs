//! Predicate compiler and lazy query engine for a remote item store.
//!
//! # Quick Start
//!
//! For convenient imports, use the prelude:
//!
//! ```
//! use itemstore_query_rs::prelude::*;
//! ```
//!
//! Predicates are built with [`Q`](predicate::Q), checked against a
//! [`FieldCatalog`](itemstore_api_rs::fields::FieldCatalog) and compiled into
//! a [`CompiledRestriction`](restriction::CompiledRestriction). A
//! [`QuerySet`](queryset::QuerySet) runs them through a
//! [`SearchExecutor`](executor::SearchExecutor), fetching pages lazily.

pub mod coerce;
pub mod config;
pub mod error;
pub mod executor;
pub mod memory;
pub mod predicate;
pub mod prelude;
pub mod queryset;
pub mod resolve;
pub mod restriction;
