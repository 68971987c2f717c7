//! CSV Data Loader Module
//! Parses delimited sales data into typed records and exposes table views.

use crate::data::record::{Field, Record};
use polars::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Cell values treated as "no value" in optional columns.
const NULL_TOKENS: [&str; 6] = ["", "NA", "N/A", "NaN", "nan", "null"];

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Parse error at line {line}{suffix}: {message}", suffix = column_suffix(.column))]
    Parse {
        line: u64,
        column: Option<Field>,
        message: String,
    },
    #[error("Missing required columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to read CSV: {0}")]
    Csv(csv::Error),
    #[error("No data loaded")]
    NoData,
}

fn column_suffix(column: &Option<Field>) -> String {
    column.map(|c| format!(", column '{c}'")).unwrap_or_default()
}

impl From<csv::Error> for LoadError {
    fn from(err: csv::Error) -> Self {
        match err.kind() {
            csv::ErrorKind::UnequalLengths {
                pos,
                expected_len,
                len,
            } => LoadError::Parse {
                line: position_line(pos),
                column: None,
                message: format!("expected {expected_len} fields, found {len}"),
            },
            csv::ErrorKind::Utf8 { pos, err: utf8 } => LoadError::Parse {
                line: position_line(pos),
                column: None,
                message: format!("invalid UTF-8 in field {}", utf8.field() + 1),
            },
            _ => LoadError::Csv(err),
        }
    }
}

fn position_line(pos: &Option<csv::Position>) -> u64 {
    pos.as_ref().map(|p| p.line()).unwrap_or_default()
}

/// Options for reading the input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub delimiter: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// Per-column summary, like a dataframe's `info()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub field: Field,
    pub dtype: &'static str,
    pub non_null: usize,
}

/// The in-memory sales table. Row count is fixed once loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Load a CSV file from disk.
    pub fn from_path(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self, LoadError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading dataset");
        let file = File::open(path)?;
        Self::from_reader(file, options)
    }

    /// Parse delimited text with a header row.
    ///
    /// Fails on the first malformed row; no partial dataset is returned.
    pub fn from_reader<R: Read>(source: R, options: &LoadOptions) -> Result<Self, LoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(source);

        let layout = ColumnLayout::resolve(reader.headers()?)?;

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let line = row.position().map(|p| p.line()).unwrap_or_default();
            records.push(layout.parse_row(&row, line)?);
        }

        info!(rows = records.len(), "dataset loaded");
        Ok(Self { records })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub(crate) fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First `n` records, for table previews.
    pub fn preview(&self, n: usize) -> &[Record] {
        &self.records[..n.min(self.records.len())]
    }

    /// Column types and non-null counts.
    pub fn info(&self) -> Vec<ColumnInfo> {
        Field::ALL
            .into_iter()
            .map(|field| ColumnInfo {
                field,
                dtype: field.dtype(),
                non_null: self.records.iter().filter(|r| !r.is_missing(field)).count(),
            })
            .collect()
    }

    /// Convert to a Polars DataFrame for tabular display.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let records = &self.records;
        let weights: Vec<Option<f64>> = records.iter().map(|r| r.weight).collect();
        let years: Vec<i32> = records.iter().map(|r| r.establishment_year).collect();
        let sizes: Vec<Option<&str>> = records.iter().map(|r| r.outlet_size.as_deref()).collect();

        DataFrame::new(vec![
            Column::new(Field::ProductId.name().into(), texts(records, |r| r.product_id.as_str())),
            Column::new(Field::Weight.name().into(), weights),
            Column::new(Field::FatContent.name().into(), texts(records, |r| r.fat_content.as_str())),
            Column::new(Field::Visibility.name().into(), numbers(records, |r| r.visibility)),
            Column::new(Field::ProductType.name().into(), texts(records, |r| r.product_type.as_str())),
            Column::new(Field::Mrp.name().into(), numbers(records, |r| r.mrp)),
            Column::new(Field::OutletId.name().into(), texts(records, |r| r.outlet_id.as_str())),
            Column::new(Field::EstablishmentYear.name().into(), years),
            Column::new(Field::OutletSize.name().into(), sizes),
            Column::new(Field::LocationType.name().into(), texts(records, |r| r.location_type.as_str())),
            Column::new(Field::OutletType.name().into(), texts(records, |r| r.outlet_type.as_str())),
            Column::new(Field::OutletSales.name().into(), numbers(records, |r| r.outlet_sales)),
        ])
    }
}

fn texts(records: &[Record], get: impl Fn(&Record) -> &str) -> Vec<&str> {
    records.iter().map(get).collect()
}

fn numbers(records: &[Record], get: impl Fn(&Record) -> f64) -> Vec<f64> {
    records.iter().map(get).collect()
}

/// Position of every schema field in the input header.
struct ColumnLayout {
    positions: [usize; Field::ALL.len()],
}

impl ColumnLayout {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, LoadError> {
        let mut found: [Option<usize>; Field::ALL.len()] = [None; Field::ALL.len()];
        for (position, header) in headers.iter().enumerate() {
            match Field::lookup(header) {
                Some(field) if found[field.index()].is_none() => {
                    found[field.index()] = Some(position);
                }
                Some(_) => {}
                None => debug!(header, "ignoring unknown column"),
            }
        }

        let missing: Vec<String> = Field::ALL
            .into_iter()
            .filter(|field| found[field.index()].is_none())
            .map(|field| field.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(LoadError::Schema { missing });
        }

        let mut positions = [0; Field::ALL.len()];
        for (slot, position) in positions.iter_mut().zip(found) {
            *slot = position.unwrap_or_default();
        }
        Ok(Self { positions })
    }

    fn parse_row(&self, row: &csv::StringRecord, line: u64) -> Result<Record, LoadError> {
        let cells = RowCells {
            row,
            layout: self,
            line,
        };

        Ok(Record {
            product_id: cells.text(Field::ProductId),
            weight: cells.optional_number(Field::Weight)?,
            fat_content: cells.text(Field::FatContent),
            visibility: cells.number_in(Field::Visibility, |v| (0.0..=1.0).contains(&v))?,
            product_type: cells.text(Field::ProductType),
            mrp: cells.number_in(Field::Mrp, |v| v > 0.0)?,
            outlet_id: cells.text(Field::OutletId),
            establishment_year: cells.year()?,
            outlet_size: cells.optional_text(Field::OutletSize),
            location_type: cells.text(Field::LocationType),
            outlet_type: cells.text(Field::OutletType),
            outlet_sales: cells.number_in(Field::OutletSales, |v| v >= 0.0)?,
        })
    }
}

struct RowCells<'a> {
    row: &'a csv::StringRecord,
    layout: &'a ColumnLayout,
    line: u64,
}

impl RowCells<'_> {
    fn raw(&self, field: Field) -> &str {
        self.row
            .get(self.layout.positions[field.index()])
            .unwrap_or_default()
    }

    fn error(&self, field: Field, message: String) -> LoadError {
        LoadError::Parse {
            line: self.line,
            column: Some(field),
            message,
        }
    }

    fn text(&self, field: Field) -> String {
        self.raw(field).to_string()
    }

    fn optional_text(&self, field: Field) -> Option<String> {
        let raw = self.raw(field);
        (!NULL_TOKENS.contains(&raw)).then(|| raw.to_string())
    }

    fn number(&self, field: Field) -> Result<f64, LoadError> {
        let raw = self.raw(field);
        if raw.is_empty() {
            return Err(self.error(field, "missing required value".to_string()));
        }
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(self.error(field, format!("'{raw}' is not a number"))),
        }
    }

    fn number_in(&self, field: Field, valid: impl Fn(f64) -> bool) -> Result<f64, LoadError> {
        let value = self.number(field)?;
        if !valid(value) {
            return Err(self.error(field, format!("{value} is out of range")));
        }
        Ok(value)
    }

    fn optional_number(&self, field: Field) -> Result<Option<f64>, LoadError> {
        if NULL_TOKENS.contains(&self.raw(field)) {
            return Ok(None);
        }
        self.number_in(field, |v| v > 0.0).map(Some)
    }

    fn year(&self) -> Result<i32, LoadError> {
        let raw = self.raw(Field::EstablishmentYear);
        raw.parse::<i32>().map_err(|_| {
            self.error(
                Field::EstablishmentYear,
                format!("'{raw}' is not an integer year"),
            )
        })
    }
}
