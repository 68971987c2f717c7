//! Retail Insights - sales CSV cleaning & ranked aggregation
//!
//! Loads a retail sales table, imputes missing values, reports data quality
//! and computes the grouped series behind each report view.

pub mod analysis;
pub mod config;
pub mod data;

pub use analysis::{
    AggregationEngine, AggregationError, AggregationRequest, AggregationResult, Reduction,
    RowFilter, SortDirection, View,
};
pub use config::{ConfigError, PipelineConfig};
pub use data::{
    DataCleaner, Dataset, DatasetCache, Field, ImputationError, ImputationReport, LoadError,
    NullReport, Record,
};
