use crate::domain::errors::ValidationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Oldest model year accepted for a valuation
pub const MIN_MODEL_YEAR: u16 = 2000;
/// Newest model year accepted for a valuation
pub const MAX_MODEL_YEAR: u16 = 2024;
/// Upper bound on recorded mileage (miles)
pub const MAX_MILEAGE: u32 = 300_000;

/// Supported engine displacements, in tenths of a litre.
const ENGINE_SIZES_DL: [u8; 11] = [10, 12, 14, 16, 18, 20, 25, 30, 35, 40, 50];

/// Vehicle manufacturers known to the valuation model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Manufacturer {
    BMW,
    Toyota,
    Ford,
    Porsche,
    VW,
}

impl Manufacturer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Manufacturer::BMW => "BMW",
            Manufacturer::Toyota => "Toyota",
            Manufacturer::Ford => "Ford",
            Manufacturer::Porsche => "Porsche",
            Manufacturer::VW => "VW",
        }
    }

    /// Model names sold under this manufacturer
    pub fn models(&self) -> &'static [&'static str] {
        match self {
            Manufacturer::BMW => &["Z4", "M5", "X3"],
            Manufacturer::Toyota => &["RAV4", "Prius", "Yaris"],
            Manufacturer::Ford => &["Fiesta", "Mondeo", "Focus"],
            Manufacturer::Porsche => &["718 Cayman", "911", "Cayenne"],
            Manufacturer::VW => &["Polo", "Golf", "Passat"],
        }
    }

    pub fn has_model(&self, model: &str) -> bool {
        self.models().contains(&model)
    }

    pub fn all() -> Vec<Manufacturer> {
        vec![
            Manufacturer::BMW,
            Manufacturer::Toyota,
            Manufacturer::Ford,
            Manufacturer::Porsche,
            Manufacturer::VW,
        ]
    }
}

impl fmt::Display for Manufacturer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Manufacturer {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Manufacturer::all()
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownManufacturer {
                name: s.to_string(),
            })
    }
}

/// Fuel / drivetrain category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuelType {
    Petrol,
    Diesel,
    Hybrid,
    Electric,
}

impl FuelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::Petrol => "Petrol",
            FuelType::Diesel => "Diesel",
            FuelType::Hybrid => "Hybrid",
            FuelType::Electric => "Electric",
        }
    }

    pub fn all() -> Vec<FuelType> {
        vec![
            FuelType::Petrol,
            FuelType::Diesel,
            FuelType::Hybrid,
            FuelType::Electric,
        ]
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FuelType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FuelType::all()
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownFuelType {
                name: s.to_string(),
            })
    }
}

/// Engine displacement restricted to the sizes offered by the valuation form.
///
/// Stored as tenths of a litre so that comparisons and currency arithmetic
/// stay exact; serialized as litres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct EngineSize(u8);

impl EngineSize {
    pub fn from_liters(liters: f64) -> Result<Self, ValidationError> {
        let scaled = liters * 10.0;
        let rounded = scaled.round();
        if liters.is_finite() && (scaled - rounded).abs() < 1e-6 {
            if let Some(dl) = ENGINE_SIZES_DL.iter().find(|&&dl| f64::from(dl) == rounded) {
                return Ok(EngineSize(*dl));
            }
        }
        Err(ValidationError::UnsupportedEngineSize { liters })
    }

    pub fn liters(&self) -> f64 {
        f64::from(self.0) / 10.0
    }

    /// Exact litre value for currency arithmetic
    pub fn as_decimal(&self) -> Decimal {
        Decimal::new(i64::from(self.0), 1)
    }

    pub fn all() -> Vec<EngineSize> {
        ENGINE_SIZES_DL.iter().map(|&dl| EngineSize(dl)).collect()
    }
}

impl TryFrom<f64> for EngineSize {
    type Error = ValidationError;

    fn try_from(liters: f64) -> Result<Self, Self::Error> {
        EngineSize::from_liters(liters)
    }
}

impl From<EngineSize> for f64 {
    fn from(size: EngineSize) -> f64 {
        size.liters()
    }
}

impl fmt::Display for EngineSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:.1}L", self.liters())
    }
}

impl FromStr for EngineSize {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches(['L', 'l']);
        let liters = trimmed
            .parse::<f64>()
            .map_err(|_| ValidationError::UnparseableEngineSize {
                input: s.trim().to_string(),
            })?;
        EngineSize::from_liters(liters)
    }
}

/// Vehicle description entered by the user for a valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleAttributes {
    pub manufacturer: Manufacturer,
    pub model: String,
    pub fuel_type: FuelType,
    pub year: u16,
    pub engine_size: EngineSize,
    pub mileage: u32,
}

impl VehicleAttributes {
    /// Checks every field against the catalog and range limits.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.manufacturer.has_model(&self.model) {
            return Err(ValidationError::UnknownModel {
                manufacturer: self.manufacturer.to_string(),
                model: self.model.clone(),
            });
        }

        if !(MIN_MODEL_YEAR..=MAX_MODEL_YEAR).contains(&self.year) {
            return Err(ValidationError::YearOutOfRange {
                year: self.year,
                min: MIN_MODEL_YEAR,
                max: MAX_MODEL_YEAR,
            });
        }

        if self.mileage > MAX_MILEAGE {
            return Err(ValidationError::MileageOutOfRange {
                mileage: self.mileage,
                max: MAX_MILEAGE,
            });
        }

        Ok(())
    }
}
