//! Data models
//!
//! Catalog-side records the order engine reads and writes.

pub mod product;

// Re-exports
pub use product::*;
