use autovalue::application::prediction_service::PredictionService;
use autovalue::config::Config;
use autovalue::domain::errors::{PredictionError, ValidationError};
use autovalue::domain::ml::feature_registry::{
    ENGINE_SIZE, FUEL_TYPE, MANUFACTURER, MILEAGE, MODEL, YEAR_OF_MANUFACTURE,
};
use autovalue::domain::vehicle::VehicleAttributes;
use autovalue::infrastructure::ArtifactLoader;
use autovalue::infrastructure::observability::{Metrics, MetricsReporter};
use autovalue::interfaces::terminal;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "autovalue", author, version, about = "Used-car resale price estimates", long_about = None)]
struct Cli {
    /// Model artifact to load (overrides MODEL_PATH)
    #[arg(long, global = true)]
    model_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Value a single vehicle
    Predict {
        #[arg(long)]
        manufacturer: String,
        #[arg(long)]
        model: String,
        #[arg(long)]
        fuel_type: String,
        #[arg(long)]
        year: u16,
        /// Engine size in litres, e.g. 2.0
        #[arg(long)]
        engine_size: String,
        #[arg(long)]
        mileage: u32,
        /// Print the result as JSON instead of the text report
        #[arg(long)]
        json: bool,
    },
    /// Value every vehicle in a CSV file
    Batch {
        #[arg(long)]
        input: PathBuf,
        /// Write results here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List valid manufacturers, models, fuel types and ranges
    Catalog,
    /// Show metadata of the model artifact
    ModelInfo,
}

/// Input row for batch valuation, keyed by the model's column names
#[derive(Debug, Deserialize)]
struct BatchInput {
    #[serde(rename = "Manufacturer")]
    manufacturer: String,
    #[serde(rename = "Model")]
    model: String,
    #[serde(rename = "Engine size")]
    engine_size: String,
    #[serde(rename = "Fuel type")]
    fuel_type: String,
    #[serde(rename = "Year of manufacture")]
    year: u16,
    #[serde(rename = "Mileage")]
    mileage: u32,
}

#[derive(Debug, Serialize)]
struct BatchOutput {
    row: usize,
    manufacturer: String,
    model: String,
    price: Option<String>,
    confidence: Option<String>,
    floor_applied: Option<bool>,
    base_price: Option<String>,
    depreciation: Option<String>,
    mileage_impact: Option<String>,
    engine_bonus: Option<String>,
    error: Option<String>,
}

fn parse_vehicle(
    manufacturer: &str,
    model: &str,
    fuel_type: &str,
    year: u16,
    engine_size: &str,
    mileage: u32,
) -> Result<VehicleAttributes, ValidationError> {
    Ok(VehicleAttributes {
        manufacturer: manufacturer.parse()?,
        model: model.trim().to_string(),
        fuel_type: fuel_type.parse()?,
        year,
        engine_size: engine_size.parse()?,
        mileage,
    })
}

fn run_predict(
    service: &PredictionService,
    attrs: Result<VehicleAttributes, ValidationError>,
    json: bool,
) -> anyhow::Result<bool> {
    let outcome = attrs
        .map_err(PredictionError::from)
        .and_then(|attrs| service.predict(&attrs).map(|result| (attrs, result)));

    match outcome {
        Ok((attrs, result)) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", terminal::render_prediction(&attrs, &result));
            }
            Ok(true)
        }
        Err(e) => {
            eprintln!("{}", terminal::render_error(&e));
            Ok(false)
        }
    }
}

fn run_batch(
    service: &PredictionService,
    input: &Path,
    output: Option<&Path>,
) -> anyhow::Result<bool> {
    let file = File::open(input)
        .map_err(|e| anyhow::anyhow!("Failed to open batch input {:?}: {}", input, e))?;
    let mut rdr = csv::Reader::from_reader(BufReader::new(file));

    let headers = rdr.headers()?.clone();
    for column in [MANUFACTURER, MODEL, ENGINE_SIZE, FUEL_TYPE, YEAR_OF_MANUFACTURE, MILEAGE] {
        if !headers.iter().any(|h| h == column) {
            anyhow::bail!("Batch input is missing column '{}'", column);
        }
    }

    let mut labels = Vec::new();
    let mut parsed = Vec::new();
    for (i, record) in rdr.deserialize::<BatchInput>().enumerate() {
        let row = record.map_err(|e| anyhow::anyhow!("Malformed batch row {}: {}", i + 1, e))?;
        labels.push((row.manufacturer.clone(), row.model.clone()));
        parsed.push(parse_vehicle(
            &row.manufacturer,
            &row.model,
            &row.fuel_type,
            row.year,
            &row.engine_size,
            row.mileage,
        ));
    }

    // Valid rows are valued in parallel; rejected rows keep their slot.
    let valid: Vec<VehicleAttributes> = parsed.iter().filter_map(|p| p.clone().ok()).collect();
    let mut valued = service.predict_batch(&valid).into_iter();

    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout()),
    };
    let mut wtr = csv::Writer::from_writer(writer);

    let mut failures = 0usize;
    for (i, (attrs, (manufacturer, model))) in parsed.into_iter().zip(labels).enumerate() {
        let result = match attrs {
            Ok(_) => valued.next().unwrap_or_else(|| {
                Err(PredictionError::InferenceFailure {
                    reason: "missing batch result".to_string(),
                })
            }),
            Err(e) => Err(PredictionError::from(e)),
        };

        let out = match result {
            Ok(prediction) => BatchOutput {
                row: i + 1,
                manufacturer,
                model,
                price: Some(prediction.price.round_dp(0).to_string()),
                confidence: Some(format!("{:.3}", prediction.confidence)),
                floor_applied: Some(prediction.floor_applied),
                base_price: Some(prediction.breakdown.base_price.to_string()),
                depreciation: Some(prediction.breakdown.depreciation.to_string()),
                mileage_impact: Some(prediction.breakdown.mileage_impact.to_string()),
                engine_bonus: Some(prediction.breakdown.engine_bonus.to_string()),
                error: None,
            },
            Err(e) => {
                failures += 1;
                BatchOutput {
                    row: i + 1,
                    manufacturer,
                    model,
                    price: None,
                    confidence: None,
                    floor_applied: None,
                    base_price: None,
                    depreciation: None,
                    mileage_impact: None,
                    engine_bonus: None,
                    error: Some(e.to_string()),
                }
            }
        };
        wtr.serialize(out)?;
    }
    wtr.flush()?;

    info!("Batch complete: {} failed rows", failures);
    Ok(failures == 0)
}

fn run(cli: Cli, config: Config, metrics: &Metrics) -> anyhow::Result<bool> {
    let model_path = cli.model_path.unwrap_or(config.model_path);
    let loader = Arc::new(ArtifactLoader::new(model_path).with_metrics(metrics.clone()));
    let service =
        PredictionService::new(loader.clone(), config.confidence).with_metrics(metrics.clone());

    match cli.command {
        Command::Predict {
            manufacturer,
            model,
            fuel_type,
            year,
            engine_size,
            mileage,
            json,
        } => {
            let attrs = parse_vehicle(
                &manufacturer,
                &model,
                &fuel_type,
                year,
                &engine_size,
                mileage,
            );
            run_predict(&service, attrs, json)
        }
        Command::Batch { input, output } => run_batch(&service, &input, output.as_deref()),
        Command::Catalog => {
            print!("{}", terminal::render_catalog());
            Ok(true)
        }
        Command::ModelInfo => match loader.load() {
            Ok(artifact) => {
                print!("{}", terminal::render_model_info(loader.path(), artifact.metadata()));
                Ok(true)
            }
            Err(e) => {
                eprintln!("{}", terminal::render_error(&PredictionError::from(e)));
                Ok(false)
            }
        },
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries only the rendered result
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            eprintln!("Invalid configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let metrics = match Metrics::new() {
        Ok(metrics) => metrics,
        Err(e) => {
            eprintln!("Failed to initialise metrics: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    let observability_enabled = config.observability_enabled;

    let outcome = run(cli, config, &metrics);

    if observability_enabled {
        MetricsReporter::new(metrics).report();
    }

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
