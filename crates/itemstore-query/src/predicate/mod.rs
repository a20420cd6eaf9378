//! Predicate trees over item fields.
//!
//! A [`Q`] is either a single comparison ([`Lookup`]) or a group of child
//! predicates joined by AND, OR or NOT. Predicates are plain values: combining
//! or negating one always produces a new tree.
//!
//! # Lookup keys
//!
//! [`Q::kw`] builds a predicate from a `field__suffix` key:
//!
//! | Suffix        | Meaning                                  |
//! |---------------|------------------------------------------|
//! | *(none)*      | equal                                    |
//! | `not`         | not equal                                |
//! | `gt`, `gte`   | greater than (or equal)                  |
//! | `lt`, `lte`   | less than (or equal)                     |
//! | `exact`       | full-string match                        |
//! | `iexact`      | full-string match, ignoring case         |
//! | `contains`    | substring (or list membership)           |
//! | `icontains`   | substring, ignoring case                 |
//! | `startswith`  | prefix                                   |
//! | `istartswith` | prefix, ignoring case                    |
//! | `in`          | equal to any of the given values         |
//! | `exists`      | field has a value (`true`) or not        |
//! | `range`       | `gte` first element AND `lte` second     |
//!
//! # Example
//!
//! ```
//! use itemstore_query_rs::predicate::Q;
//!
//! let q = Q::kw("subject", "Hi").unwrap() & !Q::kw("subject", "Bye").unwrap();
//! assert_eq!(q.to_string(), "subject == 'Hi' AND subject != 'Bye'");
//!
//! let range = Q::kw("size__range", (1, 5)).unwrap();
//! assert_eq!(range.to_string(), "size >= 1 AND size <= 5");
//! ```

mod lookup;
mod node;

pub use lookup::{Lookup, Op};
pub use node::{Conn, Q};
