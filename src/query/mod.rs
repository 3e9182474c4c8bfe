pub mod builder;
pub mod engine;
pub mod filter;

pub use builder::{BuiltQuery, Filters, OrderBy, OrderDirection, SelectQuery, parse_columns, parse_order_by};
pub use engine::QueryEngine;
pub use filter::{FilterResolver, ResolvedFilters};
