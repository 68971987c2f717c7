//! Aggregation Engine Module
//! Grouped sums, counts and means over the dataset, ranked into
//! (label, value) series ready for tables and charts.

use crate::data::{Dataset, Field, Record};
use polars::prelude::*;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

const VALUE_COLUMN: &str = "value";

/// Joins the labels of a multi-field group key.
pub const KEY_SEPARATOR: &str = " | ";
/// Label of a missing optional value in a group key.
pub const MISSING_LABEL: &str = "(missing)";

#[derive(Error, Debug)]
pub enum AggregationError {
    #[error("Unknown field: '{0}'")]
    UnknownField(String),
    #[error("Field '{0}' is not numeric")]
    NonNumericField(Field),
    #[error("Reduction '{0}' requires a value field")]
    MissingValueField(Reduction),
    #[error("At least one group-by field is required")]
    NoGroupKey,
    #[error("No rows matched the filter")]
    EmptyResult,
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// Aggregate function applied within each bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    Sum,
    /// Row count; the value field is ignored.
    Count,
    Mean,
}

impl Reduction {
    fn expr(self) -> Expr {
        match self {
            Reduction::Sum => col(VALUE_COLUMN).sum(),
            Reduction::Count => len().cast(DataType::Float64),
            Reduction::Mean => col(VALUE_COLUMN).mean(),
        }
        .alias(VALUE_COLUMN)
    }
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Reduction::Sum => "sum",
            Reduction::Count => "count",
            Reduction::Mean => "mean",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Row predicate applied before grouping.
#[derive(Clone)]
pub enum RowFilter {
    /// Keep rows whose field label equals `value` (e.g. year "1985").
    /// Rows missing the field never match.
    Equals { field: String, value: String },
    Predicate(Arc<dyn Fn(&Record) -> bool + Send + Sync>),
}

impl RowFilter {
    pub fn equals(field: impl Into<String>, value: impl ToString) -> Self {
        RowFilter::Equals {
            field: field.into(),
            value: value.to_string(),
        }
    }

    pub fn predicate(predicate: impl Fn(&Record) -> bool + Send + Sync + 'static) -> Self {
        RowFilter::Predicate(Arc::new(predicate))
    }
}

impl fmt::Debug for RowFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowFilter::Equals { field, value } => write!(f, "{field} == {value:?}"),
            RowFilter::Predicate(_) => f.write_str("<predicate>"),
        }
    }
}

/// Filter with its field name resolved against the schema.
enum ResolvedFilter<'a> {
    All,
    Equals(Field, &'a str),
    Predicate(&'a (dyn Fn(&Record) -> bool + Send + Sync)),
}

impl<'a> ResolvedFilter<'a> {
    fn resolve(filter: Option<&'a RowFilter>) -> Result<Self, AggregationError> {
        Ok(match filter {
            None => ResolvedFilter::All,
            Some(RowFilter::Equals { field, value }) => {
                ResolvedFilter::Equals(resolve_field(field)?, value.as_str())
            }
            Some(RowFilter::Predicate(predicate)) => ResolvedFilter::Predicate(predicate.as_ref()),
        })
    }

    fn matches(&self, record: &Record) -> bool {
        match self {
            ResolvedFilter::All => true,
            ResolvedFilter::Equals(field, value) => record.label(*field).as_deref() == Some(*value),
            ResolvedFilter::Predicate(predicate) => predicate(record),
        }
    }
}

/// Parameters of one aggregation.
#[derive(Debug, Clone)]
pub struct AggregationRequest {
    pub group_by: Vec<String>,
    pub value_field: Option<String>,
    pub reduction: Reduction,
    pub filter: Option<RowFilter>,
    /// `None` orders buckets by key.
    pub sort: Option<SortDirection>,
    pub limit: Option<usize>,
    /// Fail with `EmptyResult` when no row passes the filter.
    pub strict_empty: bool,
}

impl AggregationRequest {
    /// Descending by value, no filter, no limit.
    pub fn new<I, S>(group_by: I, reduction: Reduction) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            group_by: group_by.into_iter().map(Into::into).collect(),
            value_field: None,
            reduction,
            filter: None,
            sort: Some(SortDirection::Descending),
            limit: None,
            strict_empty: false,
        }
    }

    pub fn with_value(mut self, field: impl Into<String>) -> Self {
        self.value_field = Some(field.into());
        self
    }

    pub fn with_filter(mut self, filter: RowFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_sort(mut self, sort: Option<SortDirection>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_strict_empty(mut self, strict: bool) -> Self {
        self.strict_empty = strict;
        self
    }
}

/// One group and its reduced value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    /// Display label: group values joined by `KEY_SEPARATOR`.
    pub key: String,
    /// Group-by values in request order, `None` where the value is missing.
    pub group: Vec<Option<String>>,
    pub value: f64,
}

/// Ordered (key, value) series. Each group tuple appears once.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AggregationResult {
    buckets: Vec<Bucket>,
}

impl AggregationResult {
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.buckets.iter().map(|b| b.key.as_str()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.buckets.iter().map(|b| b.value).collect()
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.buckets.iter().find(|b| b.key == key).map(|b| b.value)
    }

    pub fn total(&self) -> f64 {
        self.buckets.iter().map(|b| b.value).sum()
    }

    pub fn into_pairs(self) -> Vec<(String, f64)> {
        self.buckets.into_iter().map(|b| (b.key, b.value)).collect()
    }

    /// Values truncated toward zero, as shown in revenue-by-group tables.
    pub fn round_result(&self) -> Vec<(String, i64)> {
        self.buckets
            .iter()
            .map(|b| (b.key.clone(), b.value.trunc() as i64))
            .collect()
    }
}

/// Computes grouped reductions. Never mutates the dataset.
pub struct AggregationEngine;

impl AggregationEngine {
    pub fn aggregate(
        dataset: &Dataset,
        request: &AggregationRequest,
    ) -> Result<AggregationResult, AggregationError> {
        let keys = request
            .group_by
            .iter()
            .map(|name| resolve_field(name))
            .collect::<Result<Vec<_>, _>>()?;
        if keys.is_empty() {
            return Err(AggregationError::NoGroupKey);
        }

        let value = match (&request.value_field, request.reduction) {
            (Some(name), reduction) => {
                let field = resolve_field(name)?;
                if reduction != Reduction::Count && !field.is_numeric() {
                    return Err(AggregationError::NonNumericField(field));
                }
                Some(field)
            }
            (None, Reduction::Count) => None,
            (None, reduction) => return Err(AggregationError::MissingValueField(reduction)),
        };

        let filter = ResolvedFilter::resolve(request.filter.as_ref())?;
        let rows: Vec<&Record> = dataset
            .records()
            .iter()
            .filter(|r| filter.matches(r))
            .collect();

        debug!(
            group_by = ?request.group_by,
            reduction = %request.reduction,
            filter = ?request.filter,
            rows = rows.len(),
            "aggregating"
        );

        if rows.is_empty() {
            if request.strict_empty {
                return Err(AggregationError::EmptyResult);
            }
            return Ok(AggregationResult::default());
        }

        let key_columns: Vec<Expr> = (0..keys.len()).map(|i| col(key_name(i))).collect();
        let grouped = Self::bucket_frame(&rows, &keys, value)?
            .lazy()
            .group_by_stable(key_columns.clone())
            .agg([request.reduction.expr()])
            .filter(col(VALUE_COLUMN).is_not_null());

        // Ties on value fall back to ascending key order; missing keys sort last.
        let sorted = match request.sort {
            Some(direction) => {
                let by: Vec<Expr> = std::iter::once(col(VALUE_COLUMN))
                    .chain(key_columns)
                    .collect();
                let descending = std::iter::once(direction == SortDirection::Descending)
                    .chain(std::iter::repeat(false).take(keys.len()));
                grouped.sort_by_exprs(
                    by,
                    SortMultipleOptions::default()
                        .with_order_descending_multi(descending)
                        .with_nulls_last(true),
                )
            }
            None => grouped.sort_by_exprs(
                key_columns,
                SortMultipleOptions::default().with_nulls_last(true),
            ),
        };

        let limited = match request.limit {
            Some(n) => sorted.limit(IdxSize::try_from(n).unwrap_or(IdxSize::MAX)),
            None => sorted,
        };

        let out = limited.collect()?;
        let parts = keys
            .iter()
            .enumerate()
            .map(|(i, field)| key_parts(&out, i, *field))
            .collect::<Result<Vec<_>, _>>()?;
        let values = out.column(VALUE_COLUMN)?.f64()?;

        let buckets = values
            .into_iter()
            .enumerate()
            .filter_map(|(row, value)| {
                let group: Vec<Option<String>> = parts.iter().map(|p| p[row].clone()).collect();
                Some(Bucket {
                    key: display_key(&group),
                    group,
                    value: value?,
                })
            })
            .collect();

        Ok(AggregationResult { buckets })
    }

    /// One typed column per group-by field, plus the value to reduce.
    /// Missing optional values stay null so they form their own group.
    fn bucket_frame(
        rows: &[&Record],
        keys: &[Field],
        value: Option<Field>,
    ) -> Result<DataFrame, AggregationError> {
        let mut columns: Vec<Column> = keys
            .iter()
            .enumerate()
            .map(|(i, field)| key_column(key_name(i), *field, rows))
            .collect();
        let values: Vec<Option<f64>> = rows
            .iter()
            .map(|r| value.and_then(|f| r.numeric(f)))
            .collect();
        columns.push(Column::new(VALUE_COLUMN.into(), values));

        let df = DataFrame::new(columns)?;
        Ok(df)
    }
}

fn key_name(index: usize) -> String {
    format!("key_{index}")
}

fn key_column(name: String, field: Field, rows: &[&Record]) -> Column {
    match field {
        Field::EstablishmentYear => {
            let years: Vec<i32> = rows.iter().map(|r| r.establishment_year).collect();
            Column::new(name.into(), years)
        }
        numeric if numeric.is_numeric() => {
            let numbers: Vec<Option<f64>> = rows.iter().map(|r| r.numeric(numeric)).collect();
            Column::new(name.into(), numbers)
        }
        text => {
            let labels: Vec<Option<String>> = rows.iter().map(|r| r.label(text)).collect();
            Column::new(name.into(), labels)
        }
    }
}

/// Group-key values of one output column, rendered like `Record::label`.
fn key_parts(
    out: &DataFrame,
    index: usize,
    field: Field,
) -> Result<Vec<Option<String>>, AggregationError> {
    let column = out.column(key_name(index).as_str())?;
    let parts = match field {
        Field::EstablishmentYear => column
            .i32()?
            .into_iter()
            .map(|v| v.map(|year| year.to_string()))
            .collect(),
        numeric if numeric.is_numeric() => column
            .f64()?
            .into_iter()
            .map(|v| v.map(|x| x.to_string()))
            .collect(),
        _ => column
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect(),
    };
    Ok(parts)
}

fn display_key(group: &[Option<String>]) -> String {
    group
        .iter()
        .map(|part| part.as_deref().unwrap_or(MISSING_LABEL))
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

fn resolve_field(name: &str) -> Result<Field, AggregationError> {
    Field::lookup(name).ok_or_else(|| AggregationError::UnknownField(name.to_string()))
}
