//! Object model of the remote item store.
//!
//! # Quick Start
//!
//! For convenient imports, use the prelude:
//!
//! ```
//! use itemstore_api_rs::prelude::*;
//! ```
//!
//! This re-exports the field catalog, field paths, values, items and the
//! per-item [`RemoteError`](error::RemoteError).

pub mod error;
pub mod fields;
pub mod models;
pub mod prelude;
