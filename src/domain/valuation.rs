//! Valuation output types and the heuristic price breakdown.
//!
//! The breakdown shown next to a prediction is computed from fixed lookup
//! tables and linear formulas. It never reads the model output and the model
//! never reads it, so the two can disagree arbitrarily for unusual vehicles
//! (e.g. an old car with a large engine may show an engine bonus larger than
//! the predicted price). The figures are display-only.

use crate::domain::vehicle::{EngineSize, VehicleAttributes};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum price ever reported, regardless of raw model output
pub const PRICE_FLOOR: Decimal = dec!(5000);

/// Year the heuristic depreciation is measured from
pub const REFERENCE_YEAR: i32 = 2024;

/// Base value used when the manufacturer has no table entry
pub const DEFAULT_BASE_PRICE: Decimal = dec!(25000);

const DEPRECIATION_RATE_PER_YEAR: Decimal = dec!(0.12);
const MILEAGE_RATE_PER_MILE: Decimal = dec!(0.05);
const ENGINE_BONUS_PER_LITER: Decimal = dec!(1000);

/// Bounds of the cosmetic confidence score
pub const CONFIDENCE_MIN: f64 = 0.85;
pub const CONFIDENCE_MAX: f64 = 0.98;

/// Placeholder used in deterministic mode (midpoint of the range)
pub const CONFIDENCE_MIDPOINT: f64 = 0.915;

/// Heuristic new-car base value by manufacturer name.
pub fn base_price_for(manufacturer: &str) -> Decimal {
    match manufacturer {
        "BMW" => dec!(35000),
        "Toyota" => dec!(22000),
        "Ford" => dec!(18000),
        "Porsche" => dec!(65000),
        "VW" => dec!(20000),
        _ => DEFAULT_BASE_PRICE,
    }
}

/// Applies the floor policy; low or negative outputs are corrected, not rejected.
pub fn apply_price_floor(price: Decimal) -> Decimal {
    price.max(PRICE_FLOOR)
}

/// Display-only contribution terms shown alongside a prediction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base_price: Decimal,
    pub depreciation: Decimal,
    pub mileage_impact: Decimal,
    pub engine_bonus: Decimal,
}

impl PriceBreakdown {
    pub fn for_vehicle(attrs: &VehicleAttributes) -> Self {
        Self::compute(
            attrs.manufacturer.as_str(),
            attrs.year,
            attrs.mileage,
            attrs.engine_size,
        )
    }

    /// Pure function of its inputs; repeated calls give identical values.
    pub fn compute(manufacturer: &str, year: u16, mileage: u32, engine_size: EngineSize) -> Self {
        let base_price = base_price_for(manufacturer);
        let age = Decimal::from(REFERENCE_YEAR - i32::from(year));

        Self {
            base_price,
            depreciation: base_price * DEPRECIATION_RATE_PER_YEAR * age,
            mileage_impact: Decimal::from(mileage) * MILEAGE_RATE_PER_MILE,
            engine_bonus: engine_size.as_decimal() * ENGINE_BONUS_PER_LITER,
        }
    }
}

/// How the confidence figure is produced.
///
/// The value is cosmetic: it is not derived from model uncertainty in
/// either mode.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ConfidencePolicy {
    /// Uniform draw from [CONFIDENCE_MIN, CONFIDENCE_MAX]
    #[default]
    Sampled,
    /// Constant placeholder, for reproducible output
    Fixed(f64),
}

impl ConfidencePolicy {
    pub fn deterministic() -> Self {
        ConfidencePolicy::Fixed(CONFIDENCE_MIDPOINT)
    }

    pub fn confidence(&self) -> f64 {
        match self {
            ConfidencePolicy::Sampled => {
                let mut rng = rand::rng();
                rng.random_range(CONFIDENCE_MIN..=CONFIDENCE_MAX)
            }
            ConfidencePolicy::Fixed(value) => value.clamp(CONFIDENCE_MIN, CONFIDENCE_MAX),
        }
    }
}

/// Outcome of a single valuation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub request_id: Uuid,
    /// Predicted resale price after the floor, rounded to pence
    pub price: Decimal,
    /// Unmodified scalar returned by the model
    pub raw_model_output: f64,
    pub floor_applied: bool,
    /// Cosmetic score in [0.85, 0.98]
    pub confidence: f64,
    pub breakdown: PriceBreakdown,
    pub model_name: String,
    pub model_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(liters: f64) -> EngineSize {
        EngineSize::from_liters(liters).unwrap()
    }

    #[test]
    fn test_base_price_table() {
        assert_eq!(base_price_for("BMW"), dec!(35000));
        assert_eq!(base_price_for("Toyota"), dec!(22000));
        assert_eq!(base_price_for("Ford"), dec!(18000));
        assert_eq!(base_price_for("Porsche"), dec!(65000));
        assert_eq!(base_price_for("VW"), dec!(20000));
    }

    #[test]
    fn test_unknown_manufacturer_uses_default_base() {
        assert_eq!(base_price_for("Skoda"), dec!(25000));
        let breakdown = PriceBreakdown::compute("Skoda", 2024, 0, engine(1.0));
        assert_eq!(breakdown.base_price, dec!(25000));
        assert_eq!(breakdown.depreciation, Decimal::ZERO);
    }

    #[test]
    fn test_toyota_2020_depreciation() {
        let breakdown = PriceBreakdown::compute("Toyota", 2020, 30_000, engine(2.0));
        assert_eq!(breakdown.base_price, dec!(22000));
        assert_eq!(breakdown.depreciation, dec!(10560));
        assert_eq!(breakdown.mileage_impact, dec!(1500));
        assert_eq!(breakdown.engine_bonus, dec!(2000));
    }

    #[test]
    fn test_fractional_engine_bonus_is_exact() {
        let breakdown = PriceBreakdown::compute("VW", 2015, 12_345, engine(1.2));
        assert_eq!(breakdown.engine_bonus, dec!(1200));
        assert_eq!(breakdown.mileage_impact, dec!(617.25));
        assert_eq!(breakdown.depreciation, dec!(21600));
    }

    #[test]
    fn test_breakdown_is_reproducible() {
        let a = PriceBreakdown::compute("Porsche", 2003, 250_000, engine(5.0));
        let b = PriceBreakdown::compute("Porsche", 2003, 250_000, engine(5.0));
        assert_eq!(a, b);
        // 21 years at 12% exceeds the base value; the heuristic does not cap it
        assert!(a.depreciation > a.base_price);
    }

    #[test]
    fn test_price_floor() {
        assert_eq!(apply_price_floor(dec!(-1200)), PRICE_FLOOR);
        assert_eq!(apply_price_floor(dec!(4999.99)), PRICE_FLOOR);
        assert_eq!(apply_price_floor(dec!(18250.40)), dec!(18250.40));
    }

    #[test]
    fn test_sampled_confidence_in_range() {
        let policy = ConfidencePolicy::Sampled;
        for _ in 0..1000 {
            let c = policy.confidence();
            assert!((CONFIDENCE_MIN..=CONFIDENCE_MAX).contains(&c));
        }
    }

    #[test]
    fn test_fixed_confidence() {
        assert_eq!(ConfidencePolicy::deterministic().confidence(), 0.915);
        assert_eq!(ConfidencePolicy::Fixed(0.5).confidence(), CONFIDENCE_MIN);
    }
}
