//! Static explanation content shown with every valuation.
//!
//! Nothing here is computed from the model: the narrative is a fixed
//! template and the importance weights are fixed figures.

use crate::domain::vehicle::VehicleAttributes;

/// Display weights for the importance chart, highest first
pub const FEATURE_IMPORTANCE: &[(&str, f64)] = &[
    ("Age", 0.35),
    ("Mileage", 0.28),
    ("Engine Size", 0.18),
    ("Manufacturer", 0.12),
    ("Fuel Type", 0.07),
];

/// Fills the explanation template for one vehicle.
pub fn explanation_text(attrs: &VehicleAttributes) -> String {
    format!(
        "The valuation model weighs your vehicle against a random forest \
         ensemble fitted on historical sales. It accounts for depreciation \
         with age, market demand for {} vehicles and current {} fuel type \
         trends. Your {:.1}L engine and {} miles are the key value drivers \
         for this estimate.",
        attrs.manufacturer,
        attrs.fuel_type,
        attrs.engine_size.liters(),
        group_thousands(u64::from(attrs.mileage)),
    )
}

/// Formats an integer with comma thousands separators.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vehicle::{EngineSize, FuelType, Manufacturer};

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(300_000), "300,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_explanation_mentions_inputs() {
        let attrs = VehicleAttributes {
            manufacturer: Manufacturer::Porsche,
            model: "911".to_string(),
            fuel_type: FuelType::Petrol,
            year: 2019,
            engine_size: EngineSize::from_liters(3.0).unwrap(),
            mileage: 42_500,
        };
        let text = explanation_text(&attrs);
        assert!(text.contains("Porsche"));
        assert!(text.contains("Petrol"));
        assert!(text.contains("3.0L"));
        assert!(text.contains("42,500 miles"));
    }

    #[test]
    fn test_importance_weights_sum_to_one() {
        let total: f64 = FEATURE_IMPORTANCE.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
