//! Data models module
//!
//! Cache-side records and payloads live in models.rs, rows read from the
//! block-edit log in source.rs, and the table handle in table.rs.

mod models;
mod source;
mod table;

pub use models::*;
pub use source::*;
pub use table::Table;
