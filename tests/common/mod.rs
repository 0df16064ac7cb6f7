#![allow(dead_code)]

use autovalue::application::ml::pipeline::ForestParams;
use autovalue::application::ml::training::{SalesRecord, TrainingParams, save_artifact, train};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn temp_dir(prefix: &str) -> PathBuf {
    let unique_id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!(
        "{}_{}_{}_{}",
        prefix,
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0),
        unique_id
    ));
    fs::create_dir_all(&dir).expect("Failed to create test temp dir");
    dir
}

/// Sales history over catalogue vehicles where price rises with year and
/// falls with mileage.
pub fn synthetic_records(n: usize) -> Vec<SalesRecord> {
    let vehicles = [
        ("BMW", "X3"),
        ("Ford", "Focus"),
        ("VW", "Golf"),
        ("Toyota", "Yaris"),
        ("Porsche", "911"),
    ];
    let engines = [1.0, 1.4, 2.0, 3.0];
    let fuels = ["Petrol", "Diesel", "Hybrid"];

    (0..n)
        .map(|i| {
            let (make, model) = vehicles[i % vehicles.len()];
            let year = 2002.0 + (i % 22) as f64;
            let mileage = 2_000.0 + (i * 7_919 % 180_000) as f64;
            let engine = engines[i % engines.len()];
            let brand_premium = if make == "Porsche" { 30_000.0 } else { 0.0 };
            SalesRecord {
                manufacturer: make.to_string(),
                model: model.to_string(),
                engine_size: engine,
                fuel_type: fuels[i % fuels.len()].to_string(),
                year,
                mileage,
                price: (1_400.0 * (year - 2000.0) - mileage * 0.06
                    + engine * 1_000.0
                    + brand_premium
                    + 3_000.0)
                    .max(500.0),
            }
        })
        .collect()
}

pub fn small_params() -> TrainingParams {
    TrainingParams {
        forest: ForestParams {
            n_trees: 10,
            max_depth: 8,
            min_samples_split: 2,
            seed: 42,
        },
        train_fraction: 0.8,
    }
}

/// Trains a small forest and writes it to `<dir>/model.json`.
pub fn write_trained_artifact(dir: &Path) -> PathBuf {
    let outcome = train(&synthetic_records(200), &small_params()).expect("training failed");
    let path = dir.join("model.json");
    save_artifact(&outcome.artifact, &path).expect("saving artifact failed");
    path
}
