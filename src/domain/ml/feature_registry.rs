use crate::domain::vehicle::VehicleAttributes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MANUFACTURER: &str = "Manufacturer";
pub const MODEL: &str = "Model";
pub const ENGINE_SIZE: &str = "Engine size";
pub const FUEL_TYPE: &str = "Fuel type";
pub const YEAR_OF_MANUFACTURE: &str = "Year of manufacture";
pub const MILEAGE: &str = "Mileage";

/// Training target column
pub const PRICE: &str = "Price";

/// Input columns of the sales dataset, in dataset order.
/// Renaming any of these is a breaking change for trained artifacts.
pub const FEATURE_NAMES: &[&str] = &[
    MANUFACTURER,
    MODEL,
    ENGINE_SIZE,
    FUEL_TYPE,
    YEAR_OF_MANUFACTURE,
    MILEAGE,
];

/// Columns scaled as numbers
pub const NUMERIC_FEATURES: &[&str] = &[ENGINE_SIZE, YEAR_OF_MANUFACTURE, MILEAGE];

/// Columns one-hot encoded as categories
pub const CATEGORICAL_FEATURES: &[&str] = &[MANUFACTURER, MODEL, FUEL_TYPE];

/// A single typed cell of a feature row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureValue {
    Numeric(f64),
    Categorical(String),
}

impl FeatureValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FeatureValue::Numeric(_) => "numeric",
            FeatureValue::Categorical(_) => "categorical",
        }
    }
}

/// One named record handed to a fitted model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    values: BTreeMap<String, FeatureValue>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_numeric(mut self, name: &str, value: f64) -> Self {
        self.insert(name, FeatureValue::Numeric(value));
        self
    }

    pub fn with_categorical(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, FeatureValue::Categorical(value.into()));
        self
    }

    pub fn insert(&mut self, name: &str, value: FeatureValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<FeatureValue> {
        self.values.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Builds the single-row record the artifact's preprocessing expects.
pub fn vehicle_to_row(attrs: &VehicleAttributes) -> FeatureRow {
    FeatureRow::new()
        .with_categorical(MANUFACTURER, attrs.manufacturer.as_str())
        .with_categorical(MODEL, attrs.model.as_str())
        .with_numeric(ENGINE_SIZE, attrs.engine_size.liters())
        .with_categorical(FUEL_TYPE, attrs.fuel_type.as_str())
        .with_numeric(YEAR_OF_MANUFACTURE, f64::from(attrs.year))
        .with_numeric(MILEAGE, f64::from(attrs.mileage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vehicle::{EngineSize, FuelType, Manufacturer};

    #[test]
    fn test_feature_groups_cover_all_columns() {
        assert_eq!(
            NUMERIC_FEATURES.len() + CATEGORICAL_FEATURES.len(),
            FEATURE_NAMES.len()
        );
        for name in NUMERIC_FEATURES.iter().chain(CATEGORICAL_FEATURES) {
            assert!(FEATURE_NAMES.contains(name));
        }
    }

    #[test]
    fn test_vehicle_row_matches_registry() {
        let attrs = VehicleAttributes {
            manufacturer: Manufacturer::Ford,
            model: "Focus".to_string(),
            fuel_type: FuelType::Diesel,
            year: 2018,
            engine_size: EngineSize::from_liters(1.6).unwrap(),
            mileage: 54_000,
        };
        let row = vehicle_to_row(&attrs);

        assert_eq!(row.len(), FEATURE_NAMES.len());
        assert!(row.names().all(|n| FEATURE_NAMES.contains(&n)));
        assert_eq!(
            row.get(MANUFACTURER),
            Some(&FeatureValue::Categorical("Ford".to_string()))
        );
        assert_eq!(row.get(ENGINE_SIZE), Some(&FeatureValue::Numeric(1.6)));
        assert_eq!(
            row.get(YEAR_OF_MANUFACTURE),
            Some(&FeatureValue::Numeric(2018.0))
        );
        assert_eq!(row.get(MILEAGE), Some(&FeatureValue::Numeric(54_000.0)));
    }
}
