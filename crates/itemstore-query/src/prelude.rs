//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```
//! use itemstore_query_rs::prelude::*;
//!
//! let q = Q::kw("subject__icontains", "report").unwrap() & !Q::kw("is_read", true).unwrap();
//! let restriction = compile(&q, &FieldCatalog::standard()).unwrap();
//! assert!(restriction.is_some());
//! ```

// Error types
pub use crate::error::{QueryError, Result};

// Predicates
pub use crate::predicate::{Conn, Lookup, Op, Q};
pub use crate::resolve::{FieldOrder, Resolver};
pub use crate::restriction::{compile, CompiledRestriction};

// Execution
pub use crate::config::QueryConfig;
pub use crate::executor::{Page, SearchExecutor, SearchRequest};
pub use crate::memory::MemoryExecutor;
pub use crate::queryset::{Entry, QuerySet, ResultShape, ResultStream, Row, Slice};

// Object model
pub use itemstore_api_rs::prelude::*;
