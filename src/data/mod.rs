//! Data ingestion and storage
//!
//! CSV loading, the in-memory play table and SQLite export.

pub mod database;
pub mod dataset;
pub mod loader;

pub use database::FeatureStore;
pub use dataset::{Column, PlayDataset};
pub use loader::{PlayFilter, PlayLoader};
