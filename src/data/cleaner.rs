//! Data Cleaner Module
//! Missing-value imputation and data-quality reports.

use crate::data::loader::Dataset;
use crate::data::record::Field;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, PartialEq)]
pub enum ImputationError {
    #[error("Cannot impute '{field}': every value is missing, mean is undefined")]
    UndefinedMean { field: Field },
}

/// Fill values used by `DataCleaner::impute_missing`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImputationRules {
    pub outlet_size_fill: String,
}

impl Default for ImputationRules {
    fn default() -> Self {
        Self {
            outlet_size_fill: "Medium".to_string(),
        }
    }
}

/// How many values each imputation rule replaced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImputationReport {
    pub weight_filled: usize,
    pub outlet_size_filled: usize,
    /// Mean used for `weight`, when any weight needed filling.
    pub weight_mean: Option<f64>,
}

impl ImputationReport {
    pub fn total(&self) -> usize {
        self.weight_filled + self.outlet_size_filled
    }
}

/// Missing-value counts per column, in schema order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NullReport {
    counts: Vec<(Field, usize)>,
}

impl NullReport {
    pub fn get(&self, field: Field) -> usize {
        self.counts
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, count)| *count)
            .unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, count)| count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, usize)> + '_ {
        self.counts.iter().copied()
    }
}

/// Handles data cleaning and quality checks.
pub struct DataCleaner;

impl DataCleaner {
    /// Fill missing weights with the mean of the present ones and missing
    /// outlet sizes with a fixed category.
    ///
    /// The mean is taken once, before any replacement. Nothing is modified
    /// when the call fails, and a second call is a no-op.
    pub fn impute_missing(
        dataset: &mut Dataset,
        rules: &ImputationRules,
    ) -> Result<ImputationReport, ImputationError> {
        let missing_weights = dataset
            .records()
            .iter()
            .filter(|r| r.weight.is_none())
            .count();

        let weight_mean = if missing_weights == 0 {
            None
        } else {
            let mean = dataset
                .records()
                .iter()
                .filter_map(|r| r.weight)
                .collect::<Vec<f64>>()
                .mean();
            if !mean.is_finite() {
                return Err(ImputationError::UndefinedMean {
                    field: Field::Weight,
                });
            }
            Some(mean)
        };

        let mut report = ImputationReport {
            weight_mean,
            ..ImputationReport::default()
        };
        for record in dataset.records_mut() {
            if let (None, Some(mean)) = (record.weight, weight_mean) {
                record.weight = Some(mean);
                report.weight_filled += 1;
            }
            if record.outlet_size.is_none() {
                record.outlet_size = Some(rules.outlet_size_fill.clone());
                report.outlet_size_filled += 1;
            }
        }

        info!(
            weight_filled = report.weight_filled,
            outlet_size_filled = report.outlet_size_filled,
            weight_mean = ?report.weight_mean,
            "imputed missing values"
        );
        Ok(report)
    }

    /// Count missing values per column without touching the data.
    pub fn null_report(dataset: &Dataset) -> NullReport {
        let counts = Field::ALL
            .into_iter()
            .map(|field| {
                let missing = dataset
                    .records()
                    .iter()
                    .filter(|r| r.is_missing(field))
                    .count();
                (field, missing)
            })
            .collect();
        NullReport { counts }
    }

    /// Number of rows that exactly repeat an earlier row.
    pub fn duplicate_count(dataset: &Dataset) -> usize {
        let mut seen = HashSet::with_capacity(dataset.len());
        let duplicates = dataset
            .records()
            .iter()
            .filter(|r| !seen.insert(r.identity()))
            .count();
        debug!(duplicates, "duplicate scan finished");
        duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::sample_record;

    fn with_weights(weights: &[Option<f64>]) -> Dataset {
        let records = weights
            .iter()
            .enumerate()
            .map(|(i, weight)| {
                let mut record = sample_record("Snacks", 100.0 + i as f64);
                record.weight = *weight;
                record
            })
            .collect();
        Dataset::from_records(records)
    }

    #[test]
    fn weight_mean_is_taken_before_filling() {
        let mut dataset = with_weights(&[Some(10.0), None, Some(20.0)]);
        let report = DataCleaner::impute_missing(&mut dataset, &ImputationRules::default()).unwrap();

        let weights: Vec<Option<f64>> = dataset.records().iter().map(|r| r.weight).collect();
        assert_eq!(weights, vec![Some(10.0), Some(15.0), Some(20.0)]);
        assert_eq!(report.weight_filled, 1);
        assert_eq!(report.weight_mean, Some(15.0));
    }

    #[test]
    fn several_gaps_share_one_mean() {
        let mut dataset = with_weights(&[None, Some(4.0), None, Some(8.0), None]);
        DataCleaner::impute_missing(&mut dataset, &ImputationRules::default()).unwrap();
        let weights: Vec<f64> = dataset.records().iter().filter_map(|r| r.weight).collect();
        assert_eq!(weights, vec![6.0, 4.0, 6.0, 8.0, 6.0]);
    }

    #[test]
    fn outlet_size_uses_fill_category() {
        let mut dataset = with_weights(&[Some(1.0), Some(2.0)]);
        dataset.records_mut()[1].outlet_size = None;

        let rules = ImputationRules {
            outlet_size_fill: "Small".to_string(),
        };
        let report = DataCleaner::impute_missing(&mut dataset, &rules).unwrap();
        assert_eq!(report.outlet_size_filled, 1);
        assert_eq!(report.weight_mean, None);
        assert_eq!(dataset.records()[1].outlet_size.as_deref(), Some("Small"));
    }

    #[test]
    fn imputation_clears_nulls_and_is_idempotent() {
        let mut dataset = with_weights(&[None, Some(3.0), None]);
        dataset.records_mut()[0].outlet_size = None;
        let before = DataCleaner::null_report(&dataset);
        assert_eq!(before.get(Field::Weight), 2);
        assert_eq!(before.get(Field::OutletSize), 1);
        assert_eq!(before.total(), 3);

        let first = DataCleaner::impute_missing(&mut dataset, &ImputationRules::default()).unwrap();
        assert_eq!(first.total(), 3);
        let once = dataset.clone();

        let second = DataCleaner::impute_missing(&mut dataset, &ImputationRules::default()).unwrap();
        assert_eq!(second, ImputationReport::default());
        assert_eq!(dataset, once);

        let after = DataCleaner::null_report(&dataset);
        assert_eq!(after.get(Field::Weight), 0);
        assert_eq!(after.get(Field::OutletSize), 0);
        assert_eq!(after.total(), 0);
    }

    #[test]
    fn all_weights_missing_fails_without_mutation() {
        let mut dataset = with_weights(&[None, None]);
        dataset.records_mut()[0].outlet_size = None;
        let original = dataset.clone();

        let err = DataCleaner::impute_missing(&mut dataset, &ImputationRules::default()).unwrap_err();
        assert_eq!(
            err,
            ImputationError::UndefinedMean {
                field: Field::Weight
            }
        );
        assert_eq!(dataset, original);
    }

    #[test]
    fn empty_dataset_is_a_no_op() {
        let mut dataset = Dataset::default();
        assert_eq!(DataCleaner::null_report(&dataset).total(), 0);
        assert_eq!(DataCleaner::null_report(&dataset).iter().count(), 12);

        let report = DataCleaner::impute_missing(&mut dataset, &ImputationRules::default()).unwrap();
        assert_eq!(report, ImputationReport::default());
        assert_eq!(DataCleaner::duplicate_count(&dataset), 0);
    }

    #[test]
    fn duplicates_are_counted_not_removed() {
        let mut records = vec![
            sample_record("Dairy", 10.0),
            sample_record("Snacks", 20.0),
            sample_record("Dairy", 30.0),
        ];
        assert_eq!(
            DataCleaner::duplicate_count(&Dataset::from_records(records.clone())),
            0
        );

        records.push(records[1].clone());
        let dataset = Dataset::from_records(records.clone());
        assert_eq!(DataCleaner::duplicate_count(&dataset), 1);
        assert_eq!(dataset.len(), 4);

        records.push(records[1].clone());
        records.push(records[0].clone());
        assert_eq!(
            DataCleaner::duplicate_count(&Dataset::from_records(records)),
            3
        );
    }

    #[test]
    fn rows_differing_in_one_field_are_not_duplicates() {
        let a = sample_record("Dairy", 10.0);
        let mut b = a.clone();
        b.outlet_size = None;
        let mut c = a.clone();
        c.establishment_year = 1985;
        let dataset = Dataset::from_records(vec![a, b, c]);
        assert_eq!(DataCleaner::duplicate_count(&dataset), 0);
    }
}
