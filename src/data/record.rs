//! Record Module
//! Row type and column schema of the retail sales dataset.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One column of the sales table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ProductId,
    Weight,
    FatContent,
    Visibility,
    ProductType,
    Mrp,
    OutletId,
    EstablishmentYear,
    OutletSize,
    LocationType,
    OutletType,
    OutletSales,
}

impl Field {
    /// All columns in schema order.
    pub const ALL: [Field; 12] = [
        Field::ProductId,
        Field::Weight,
        Field::FatContent,
        Field::Visibility,
        Field::ProductType,
        Field::Mrp,
        Field::OutletId,
        Field::EstablishmentYear,
        Field::OutletSize,
        Field::LocationType,
        Field::OutletType,
        Field::OutletSales,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::ProductId => "product_id",
            Field::Weight => "weight",
            Field::FatContent => "fat_content",
            Field::Visibility => "visibility",
            Field::ProductType => "product_type",
            Field::Mrp => "mrp",
            Field::OutletId => "outlet_id",
            Field::EstablishmentYear => "establishment_year",
            Field::OutletSize => "outlet_size",
            Field::LocationType => "location_type",
            Field::OutletType => "outlet_type",
            Field::OutletSales => "outlet_sales",
        }
    }

    /// Semantic type name, as shown by `Dataset::info`.
    pub fn dtype(self) -> &'static str {
        match self {
            Field::Weight | Field::Visibility | Field::Mrp | Field::OutletSales => "f64",
            Field::EstablishmentYear => "i32",
            _ => "str",
        }
    }

    pub fn is_numeric(self) -> bool {
        self.dtype() != "str"
    }

    /// Resolve a column name or header, ignoring case, `_`, `-` and spaces.
    ///
    /// `outlet_sales`, `OutletSales` and `Outlet Sales` all name the same field.
    pub fn lookup(name: &str) -> Option<Field> {
        let wanted = normalize(name);
        if wanted == "productvisibility" {
            return Some(Field::Visibility);
        }
        Field::ALL
            .into_iter()
            .find(|field| normalize(field.name()) == wanted)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// One row of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub product_id: String,
    pub weight: Option<f64>,
    pub fat_content: String,
    pub visibility: f64,
    pub product_type: String,
    pub mrp: f64,
    pub outlet_id: String,
    pub establishment_year: i32,
    pub outlet_size: Option<String>,
    pub location_type: String,
    pub outlet_type: String,
    pub outlet_sales: f64,
}

impl Record {
    /// Textual value of a field, `None` when an optional field is missing.
    pub fn label(&self, field: Field) -> Option<String> {
        match field {
            Field::ProductId => Some(self.product_id.clone()),
            Field::Weight => self.weight.map(|w| w.to_string()),
            Field::FatContent => Some(self.fat_content.clone()),
            Field::Visibility => Some(self.visibility.to_string()),
            Field::ProductType => Some(self.product_type.clone()),
            Field::Mrp => Some(self.mrp.to_string()),
            Field::OutletId => Some(self.outlet_id.clone()),
            Field::EstablishmentYear => Some(self.establishment_year.to_string()),
            Field::OutletSize => self.outlet_size.clone(),
            Field::LocationType => Some(self.location_type.clone()),
            Field::OutletType => Some(self.outlet_type.clone()),
            Field::OutletSales => Some(self.outlet_sales.to_string()),
        }
    }

    /// Numeric value of a field; `None` for text columns or a missing weight.
    pub fn numeric(&self, field: Field) -> Option<f64> {
        match field {
            Field::Weight => self.weight,
            Field::Visibility => Some(self.visibility),
            Field::Mrp => Some(self.mrp),
            Field::EstablishmentYear => Some(f64::from(self.establishment_year)),
            Field::OutletSales => Some(self.outlet_sales),
            _ => None,
        }
    }

    pub fn is_missing(&self, field: Field) -> bool {
        match field {
            Field::Weight => self.weight.is_none(),
            Field::OutletSize => self.outlet_size.is_none(),
            _ => false,
        }
    }

    /// Hashable view over every field, used for exact-duplicate detection.
    pub(crate) fn identity(&self) -> RecordIdentity<'_> {
        RecordIdentity {
            text: [
                self.product_id.as_str(),
                self.fat_content.as_str(),
                self.product_type.as_str(),
                self.outlet_id.as_str(),
                self.location_type.as_str(),
                self.outlet_type.as_str(),
            ],
            outlet_size: self.outlet_size.as_deref(),
            weight: self.weight.map(float_bits),
            numbers: [
                float_bits(self.visibility),
                float_bits(self.mrp),
                float_bits(self.outlet_sales),
            ],
            establishment_year: self.establishment_year,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub(crate) struct RecordIdentity<'a> {
    text: [&'a str; 6],
    outlet_size: Option<&'a str>,
    weight: Option<u64>,
    numbers: [u64; 3],
    establishment_year: i32,
}

// -0.0 and 0.0 compare equal, so they must hash equal too.
fn float_bits(value: f64) -> u64 {
    (value + 0.0).to_bits()
}

#[cfg(test)]
pub(crate) fn sample_record(product_type: &str, outlet_sales: f64) -> Record {
    Record {
        product_id: "FDA15".to_string(),
        weight: Some(9.3),
        fat_content: "Low Fat".to_string(),
        visibility: 0.016,
        product_type: product_type.to_string(),
        mrp: 249.8092,
        outlet_id: "OUT049".to_string(),
        establishment_year: 1999,
        outlet_size: Some("Medium".to_string()),
        location_type: "Tier 1".to_string(),
        outlet_type: "Supermarket Type1".to_string(),
        outlet_sales,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_accepts_header_spellings() {
        assert_eq!(Field::lookup("outlet_sales"), Some(Field::OutletSales));
        assert_eq!(Field::lookup("OutletSales"), Some(Field::OutletSales));
        assert_eq!(Field::lookup("Outlet Sales"), Some(Field::OutletSales));
        assert_eq!(Field::lookup("ProductID"), Some(Field::ProductId));
        assert_eq!(Field::lookup("MRP"), Some(Field::Mrp));
        assert_eq!(Field::lookup("ProductVisibility"), Some(Field::Visibility));
        assert_eq!(Field::lookup("revenue"), None);
    }

    #[test]
    fn numeric_fields() {
        let numeric: Vec<Field> = Field::ALL.into_iter().filter(|f| f.is_numeric()).collect();
        assert_eq!(
            numeric,
            vec![
                Field::Weight,
                Field::Visibility,
                Field::Mrp,
                Field::EstablishmentYear,
                Field::OutletSales
            ]
        );
    }

    #[test]
    fn labels_and_missing_values() {
        let mut record = sample_record("Dairy", 3735.138);
        assert_eq!(record.label(Field::EstablishmentYear).as_deref(), Some("1999"));
        assert_eq!(record.numeric(Field::ProductType), None);

        record.weight = None;
        record.outlet_size = None;
        assert!(record.is_missing(Field::Weight));
        assert!(record.is_missing(Field::OutletSize));
        assert_eq!(record.label(Field::OutletSize), None);
        assert_eq!(record.numeric(Field::Weight), None);
    }

    #[test]
    fn identity_ignores_sign_of_zero() {
        let mut a = sample_record("Dairy", 0.0);
        let mut b = sample_record("Dairy", -0.0);
        assert_eq!(a.identity(), b.identity());

        a.weight = None;
        b.weight = Some(9.3);
        assert_ne!(a.identity(), b.identity());
    }
}
