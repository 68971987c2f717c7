//! Named Views Module
//! The fixed set of report views, each resolved to one aggregation request.

use crate::analysis::engine::{
    AggregationEngine, AggregationError, AggregationRequest, AggregationResult, Reduction,
    RowFilter,
};
use crate::config::PipelineConfig;
use crate::data::{Dataset, Field};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ViewParseError {
    #[error("Unknown view '{0}'")]
    UnknownView(String),
    #[error("Invalid year in view '{0}'")]
    InvalidYear(String),
}

const IN_YEAR_PREFIX: &str = "revenue-by-category-in-year";

/// A report view over the sales table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Top-N categories by summed sales.
    RevenueByCategory,
    CountByCategory,
    RevenueByOutlet,
    RevenueByYear,
    RevenueByLocation,
    /// Top-N categories by sales, only outlets established in the given year.
    RevenueByCategoryInYear(i32),
    CountByYear,
    CountByLocation,
    CountByOutletSize,
}

impl View {
    /// Every view, in report order.
    pub fn all(config: &PipelineConfig) -> Vec<View> {
        vec![
            View::CountByOutletSize,
            View::CountByYear,
            View::RevenueByYear,
            View::RevenueByOutlet,
            View::RevenueByCategoryInYear(config.focus_year),
            View::CountByCategory,
            View::RevenueByCategory,
            View::CountByLocation,
            View::RevenueByLocation,
        ]
    }

    pub fn title(&self) -> String {
        match self {
            View::RevenueByCategory => "Revenue by product category".to_string(),
            View::CountByCategory => "Best-selling product categories".to_string(),
            View::RevenueByOutlet => "Revenue by outlet".to_string(),
            View::RevenueByYear => "Revenue by establishment year".to_string(),
            View::RevenueByLocation => "Revenue by outlet location".to_string(),
            View::RevenueByCategoryInYear(year) => {
                format!("Revenue by product category, outlets established in {year}")
            }
            View::CountByYear => "Rows by establishment year".to_string(),
            View::CountByLocation => "Rows by outlet location".to_string(),
            View::CountByOutletSize => "Rows by outlet size".to_string(),
        }
    }

    pub fn reduction(&self) -> Reduction {
        match self {
            View::CountByCategory
            | View::CountByYear
            | View::CountByLocation
            | View::CountByOutletSize => Reduction::Count,
            _ => Reduction::Sum,
        }
    }

    /// The aggregation this view stands for.
    pub fn request(&self, config: &PipelineConfig) -> AggregationRequest {
        let revenue = |field: Field| {
            AggregationRequest::new([field.name()], Reduction::Sum)
                .with_value(Field::OutletSales.name())
        };
        let count = |field: Field| AggregationRequest::new([field.name()], Reduction::Count);

        let request = match *self {
            View::RevenueByCategory => revenue(Field::ProductType).with_limit(config.top_n),
            View::CountByCategory => count(Field::ProductType),
            View::RevenueByOutlet => revenue(Field::OutletId).with_sort(None),
            View::RevenueByYear => revenue(Field::EstablishmentYear).with_sort(None),
            View::RevenueByLocation => revenue(Field::LocationType).with_sort(None),
            View::RevenueByCategoryInYear(year) => revenue(Field::ProductType)
                .with_filter(RowFilter::equals(Field::EstablishmentYear.name(), year))
                .with_limit(config.top_n),
            View::CountByYear => count(Field::EstablishmentYear),
            View::CountByLocation => count(Field::LocationType),
            View::CountByOutletSize => count(Field::OutletSize),
        };
        request.with_strict_empty(config.strict_empty)
    }

    pub fn compute(
        &self,
        dataset: &Dataset,
        config: &PipelineConfig,
    ) -> Result<AggregationResult, AggregationError> {
        AggregationEngine::aggregate(dataset, &self.request(config))
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::RevenueByCategory => f.write_str("revenue-by-category"),
            View::CountByCategory => f.write_str("count-by-category"),
            View::RevenueByOutlet => f.write_str("revenue-by-outlet"),
            View::RevenueByYear => f.write_str("revenue-by-year"),
            View::RevenueByLocation => f.write_str("revenue-by-location"),
            View::RevenueByCategoryInYear(year) => write!(f, "{IN_YEAR_PREFIX}:{year}"),
            View::CountByYear => f.write_str("count-by-year"),
            View::CountByLocation => f.write_str("count-by-location"),
            View::CountByOutletSize => f.write_str("count-by-outlet-size"),
        }
    }
}

impl FromStr for View {
    type Err = ViewParseError;

    /// Parses the names printed by `Display`, e.g. `revenue-by-category-in-year:1985`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(year) = s.strip_prefix(IN_YEAR_PREFIX) {
            return year
                .strip_prefix(':')
                .and_then(|y| y.trim().parse().ok())
                .map(View::RevenueByCategoryInYear)
                .ok_or_else(|| ViewParseError::InvalidYear(s.to_string()));
        }

        match s {
            "revenue-by-category" => Ok(View::RevenueByCategory),
            "count-by-category" => Ok(View::CountByCategory),
            "revenue-by-outlet" => Ok(View::RevenueByOutlet),
            "revenue-by-year" => Ok(View::RevenueByYear),
            "revenue-by-location" => Ok(View::RevenueByLocation),
            "count-by-year" => Ok(View::CountByYear),
            "count-by-location" => Ok(View::CountByLocation),
            "count-by-outlet-size" => Ok(View::CountByOutletSize),
            _ => Err(ViewParseError::UnknownView(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SortDirection;
    use crate::data::{sample_record, Record};

    fn record(category: &str, outlet: &str, year: i32, sales: f64) -> Record {
        let mut record = sample_record(category, sales);
        record.outlet_id = outlet.to_string();
        record.establishment_year = year;
        record
    }

    fn dataset() -> Dataset {
        Dataset::from_records(vec![
            record("Snacks", "OUT019", 1985, 100.0),
            record("Dairy", "OUT019", 1985, 40.0),
            record("Snacks", "OUT049", 1999, 60.0),
            record("Meat", "OUT027", 1985, 70.0),
            record("Dairy", "OUT049", 1999, 10.0),
        ])
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for view in View::all(&PipelineConfig::default()) {
            assert_eq!(view.to_string().parse::<View>(), Ok(view));
        }
        assert_eq!(
            "revenue-by-category-in-year:1990".parse::<View>(),
            Ok(View::RevenueByCategoryInYear(1990))
        );
        assert!(matches!(
            "revenue-by-category-in-year".parse::<View>(),
            Err(ViewParseError::InvalidYear(_))
        ));
        assert!(matches!(
            "revenue-by-weather".parse::<View>(),
            Err(ViewParseError::UnknownView(_))
        ));
    }

    #[test]
    fn revenue_by_category_is_top_n() {
        let config = PipelineConfig {
            top_n: 2,
            ..PipelineConfig::default()
        };
        let request = View::RevenueByCategory.request(&config);
        assert_eq!(request.group_by, vec!["product_type".to_string()]);
        assert_eq!(request.value_field.as_deref(), Some("outlet_sales"));
        assert_eq!(request.sort, Some(SortDirection::Descending));
        assert_eq!(request.limit, Some(2));

        let result = View::RevenueByCategory.compute(&dataset(), &config).unwrap();
        assert_eq!(
            result.into_pairs(),
            vec![("Snacks".to_string(), 160.0), ("Meat".to_string(), 70.0)]
        );
    }

    #[test]
    fn category_revenue_for_one_year() {
        let config = PipelineConfig::default();
        let result = View::RevenueByCategoryInYear(1985)
            .compute(&dataset(), &config)
            .unwrap();
        assert_eq!(
            result.round_result(),
            vec![
                ("Snacks".to_string(), 100),
                ("Meat".to_string(), 70),
                ("Dairy".to_string(), 40)
            ]
        );

        let none = View::RevenueByCategoryInYear(2020)
            .compute(&dataset(), &config)
            .unwrap();
        assert!(none.is_empty());

        let strict = PipelineConfig {
            strict_empty: true,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            View::RevenueByCategoryInYear(2020).compute(&dataset(), &strict),
            Err(AggregationError::EmptyResult)
        ));
    }

    #[test]
    fn group_views_keep_key_order() {
        let config = PipelineConfig::default();
        let by_outlet = View::RevenueByOutlet.compute(&dataset(), &config).unwrap();
        assert_eq!(by_outlet.keys(), vec!["OUT019", "OUT027", "OUT049"]);
        assert_eq!(by_outlet.get("OUT019"), Some(140.0));

        let by_year = View::RevenueByYear.compute(&dataset(), &config).unwrap();
        assert_eq!(
            by_year.into_pairs(),
            vec![("1985".to_string(), 210.0), ("1999".to_string(), 70.0)]
        );
    }

    #[test]
    fn count_views_rank_by_frequency() {
        let config = PipelineConfig::default();
        let counts = View::CountByCategory.compute(&dataset(), &config).unwrap();
        assert_eq!(
            counts.into_pairs(),
            vec![
                ("Dairy".to_string(), 2.0),
                ("Snacks".to_string(), 2.0),
                ("Meat".to_string(), 1.0)
            ]
        );
        assert_eq!(View::CountByYear.reduction(), Reduction::Count);

        let sizes = View::CountByOutletSize.compute(&dataset(), &config).unwrap();
        assert_eq!(sizes.into_pairs(), vec![("Medium".to_string(), 5.0)]);
    }
}
