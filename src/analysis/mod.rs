//! Analysis module - grouped aggregation and named report views

mod engine;
mod views;

pub use engine::{
    AggregationEngine, AggregationError, AggregationRequest, AggregationResult, Bucket, Reduction,
    RowFilter, SortDirection, KEY_SEPARATOR, MISSING_LABEL,
};
pub use views::{View, ViewParseError};
