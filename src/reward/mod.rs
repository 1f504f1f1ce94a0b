//! Gamified achievements granted from attendance history.

pub mod catalog;
pub mod store;

pub use catalog::{Achievement, CATALOG, Level};
