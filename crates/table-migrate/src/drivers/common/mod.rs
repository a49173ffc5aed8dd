//! Helpers shared across database drivers.
//!
//! - [`coerce`]: conversions between value variants for typed parameter binding

pub mod coerce;
