//! Curriculum catalog implementations for Shiksha.
//!
//! All catalogs implement `shiksha_core::CurriculumStore`.

pub mod catalog;

pub use catalog::{JsonCatalog, TextbookSummary};
