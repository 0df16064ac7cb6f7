use autovalue::application::ml::training::{
    SalesRecord, TrainingParams, read_sales_file, save_artifact, train,
};
use autovalue::application::ml::pipeline::ForestParams;
use autovalue::config::DEFAULT_MODEL_PATH;
use autovalue::domain::ports::PricePredictor;
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Fit the used-car price model from historical sales", long_about = None)]
struct Args {
    /// Path to the sales dataset CSV
    #[arg(long, default_value = "data/car_sales_data.csv")]
    input: PathBuf,

    /// Path to output model artifact
    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    output: PathBuf,

    /// Number of trees in the random forest
    #[arg(long, default_value_t = 100)]
    n_trees: usize,

    /// Maximum depth of trees
    #[arg(long, default_value_t = 10)]
    max_depth: u16,

    /// Minimum samples required to split an internal node
    #[arg(long, default_value_t = 5)]
    min_split: usize,

    /// Seed for the train/test shuffle and the forest
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Disable train/test split (train on 100% of data). Use after validation.
    #[arg(long)]
    no_split: bool,

    /// Maximum number of rows to use. 0 = use all.
    #[arg(long, default_value_t = 0)]
    max_rows: usize,
}

/// Prints residual distribution of the hold-out predictions
fn print_residual_analysis(predictions: &[f64], actuals: &[f64]) {
    let n = predictions.len();
    if n == 0 {
        return;
    }

    println!("\n══════════════════════════════════════════════════════");
    println!("  HOLD-OUT RESIDUAL ANALYSIS");
    println!("══════════════════════════════════════════════════════");

    let residuals: Vec<f64> = predictions
        .iter()
        .zip(actuals)
        .map(|(p, a)| p - a)
        .collect();

    let mean = residuals.iter().sum::<f64>() / n as f64;
    let std = (residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n as f64).sqrt();
    let min = residuals.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = residuals.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    println!("\n  Residuals (predicted - actual, n={}):", n);
    println!("    Mean:   {:>10.2}", mean);
    println!("    StdDev: {:>10.2}", std);
    println!("    Min:    {:>10.2}", min);
    println!("    Max:    {:>10.2}", max);

    let within = |pct: f64| {
        predictions
            .iter()
            .zip(actuals)
            .filter(|(p, a)| **a > 0.0 && ((*p - *a) / *a).abs() <= pct)
            .count()
    };
    println!("\n  Relative Accuracy:");
    for pct in [0.05, 0.10, 0.20] {
        let count = within(pct);
        println!(
            "    Within ±{:>2.0}%: {:>7} ({:.1}%)",
            pct * 100.0,
            count,
            count as f64 / n as f64 * 100.0
        );
    }

    let below_floor = predictions.iter().filter(|&&p| p < 5000.0).count();
    println!(
        "\n  Predictions below the £5,000 floor: {} ({:.1}%)",
        below_floor,
        below_floor as f64 / n as f64 * 100.0
    );

    println!("\n  Residual Histogram:");
    let range = max - min;
    if range > 0.0 {
        let n_buckets = 10;
        let bucket_size = range / n_buckets as f64;
        let mut buckets = vec![0usize; n_buckets];
        for r in &residuals {
            let idx = ((r - min) / bucket_size).floor() as usize;
            buckets[idx.min(n_buckets - 1)] += 1;
        }
        let max_count = *buckets.iter().max().unwrap_or(&1);
        for (i, count) in buckets.iter().enumerate() {
            let lo = min + i as f64 * bucket_size;
            let hi = lo + bucket_size;
            let bar_len = (*count as f64 / max_count as f64 * 40.0).ceil() as usize;
            println!(
                "    [{:>+10.0} .. {:>+10.0}] {:>7} {}",
                lo,
                hi,
                count,
                "█".repeat(bar_len)
            );
        }
    }

    println!("══════════════════════════════════════════════════════\n");
}

fn print_target_distribution(records: &[SalesRecord]) {
    let n = records.len();
    let prices: Vec<f64> = records.iter().map(|r| r.price).collect();
    let mean = prices.iter().sum::<f64>() / n as f64;
    let min = prices.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = prices.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let below_floor = prices.iter().filter(|&&p| p < 5000.0).count();

    println!("\nTarget Distribution (Price):");
    println!("  Total:    {}", n);
    println!("  Mean:     £{:.2}", mean);
    println!("  Min:      £{:.2}", min);
    println!("  Max:      £{:.2}", max);
    println!(
        "  < £5,000: {} ({:.1}%)",
        below_floor,
        below_floor as f64 / n as f64 * 100.0
    );
    println!();
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    let args = Args::parse();

    if !args.input.exists() {
        println!(
            "Sales data not found at {:?}. Pass --input with a CSV of historical sales.",
            args.input
        );
        return Ok(());
    }

    println!("Loading sales data from {:?}", args.input);
    let mut records = read_sales_file(&args.input)?;

    if records.is_empty() {
        println!("No sales records found.");
        return Ok(());
    }

    if args.max_rows > 0 && records.len() > args.max_rows {
        let dropped = records.len() - args.max_rows;
        records.truncate(args.max_rows);
        println!("Using first {} rows (dropped {})", args.max_rows, dropped);
    }

    print_target_distribution(&records);

    let params = TrainingParams {
        forest: ForestParams {
            n_trees: args.n_trees,
            max_depth: args.max_depth,
            min_samples_split: args.min_split,
            seed: args.seed,
        },
        train_fraction: if args.no_split { 1.0 } else { 0.8 },
    };

    let outcome = train(&records, &params)?;

    if let Some(report) = outcome.artifact.metadata().evaluation {
        println!(
            "OOS Test (n={}): RMSE={:.2}, MAE={:.2}, R²={:.4}",
            report.samples, report.rmse, report.mae, report.r2
        );
        print_residual_analysis(&outcome.holdout_predictions, &outcome.holdout_actuals);
    }

    println!("Saving model to {:?}", args.output);
    save_artifact(&outcome.artifact, &args.output)?;

    println!(
        "Done. Model {} saved successfully.",
        outcome.artifact.version()
    );
    Ok(())
}
