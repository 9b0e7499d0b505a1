//! # Query Normalizer
//!
//! Turns raw request parameters into bounded, typed query options for the
//! store: pagination, ordering, and equality filters.

mod options;

pub use options::{QueryDefaults, QueryOptions, SortOrder, DEFAULT_LIMIT, DEFAULT_ORDER_BY, MAX_LIMIT};
