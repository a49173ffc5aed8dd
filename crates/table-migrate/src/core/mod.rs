//! Core abstractions shared by the inspector, engine and drivers.
//!
//! - [`schema`]: table and column metadata
//! - [`value`]: SQL value representation for positional row transfer
//! - [`traits`]: the [`Connection`] / [`ConnectionProvider`] seam

pub mod schema;
pub mod traits;
pub mod value;

pub use schema::{ColumnDescriptor, TableDescriptor};
pub use traits::{Connection, ConnectionProvider, RowStream};
pub use value::{Row, SqlNullType, SqlValue};
