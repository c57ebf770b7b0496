//! climalog - building climate sensor log analysis
//!
//! Reads one sensor log per room (or a previously exported aligned dataset),
//! runs a single analysis and prints the result as JSON on stdout.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use climalog::analysis::bounds::BoundsResult;
use climalog::analysis::filters::{DateRange, MonthSet};
use climalog::analysis::swing::SwingSummary;
use climalog::analysis::{AnalyzerRegistry, Parameter};
use climalog::dataset::{DatasetSource, RawLog};
use climalog::parsers::types::parse_timestamp;
use climalog::session::{AnalysisSession, BoundsRequest, RoomReport, Selection, SwingRequest};
use climalog::settings::AnalysisSettings;
use climalog::units::TemperatureUnit;

#[derive(Parser)]
#[command(name = "climalog", version)]
#[command(about = "Analyze building climate sensor logs", long_about = None)]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Unit for entered and reported temperatures (fahrenheit, celsius, kelvin)
    #[arg(long, global = true)]
    unit: Option<TemperatureUnit>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Sensor log files, one per room named after the file stem
    logs: Vec<PathBuf>,

    /// Previously exported aligned dataset (.csv or .parquet)
    #[arg(long, conflicts_with = "logs")]
    dataset: Option<PathBuf>,
}

#[derive(Args)]
struct SelectionArgs {
    /// Exclusive start of the date range
    #[arg(long)]
    start: Option<String>,

    /// Inclusive end of the date range
    #[arg(long)]
    end: Option<String>,

    /// Comma-separated months to keep (1-12)
    #[arg(long, value_delimiter = ',')]
    months: Vec<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Time spent at or beyond lower/upper limits, per room
    Bounds {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        selection: SelectionArgs,

        /// Parameter (temperature, rh, dew_point)
        #[arg(short, long, default_value = "temperature")]
        parameter: Parameter,

        /// Lower limit, in --unit for temperature parameters
        #[arg(long)]
        lower: Option<f64>,

        /// Upper limit, in --unit for temperature parameters
        #[arg(long)]
        upper: Option<f64>,

        /// Print the monthly breakdown for one room instead
        #[arg(long)]
        monthly: Option<String>,

        /// Print room severity codes instead of statistics
        #[arg(long)]
        map: bool,
    },

    /// Rolling 24-hour swing, per room
    Swing {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        selection: SelectionArgs,

        /// Parameter (temperature, rh, dew_point)
        #[arg(short, long, default_value = "temperature")]
        parameter: Parameter,

        /// Swing threshold, in --unit degrees for temperature parameters
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Print the monthly breakdown for one room instead
        #[arg(long)]
        monthly: Option<String>,

        /// Print room severity codes instead of statistics
        #[arg(long)]
        map: bool,
    },

    /// Pearson correlation between rooms
    Correlate {
        #[command(flatten)]
        input: InputArgs,

        /// Parameter (temperature, rh)
        #[arg(short, long, default_value = "temperature")]
        parameter: Parameter,

        /// Print every room's correlation with this room
        #[arg(long)]
        room: Option<String>,
    },

    /// Bartlett's sphericity test and KMO adequacy
    Suitability {
        #[command(flatten)]
        input: InputArgs,

        /// Parameter (temperature, rh)
        #[arg(short, long, default_value = "temperature")]
        parameter: Parameter,
    },

    /// Principal-axis factor extraction with varimax rotation
    Factors {
        #[command(flatten)]
        input: InputArgs,

        /// Parameter (temperature, rh)
        #[arg(short, long, default_value = "temperature")]
        parameter: Parameter,

        /// Number of factors (defaults to the eigenvalue-one count)
        #[arg(short = 'k', long)]
        factors: Option<usize>,

        /// Print room loadings for this 1-based factor
        #[arg(long)]
        map: Option<usize>,
    },

    /// Run a registered analyzer on one room
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Room name
        #[arg(short, long)]
        room: String,

        /// Analyzer id (see `analyzers`)
        #[arg(short, long)]
        analyzer: String,

        /// Analyzer parameters as key=value
        #[arg(long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },

    /// List registered analyzers
    Analyzers,

    /// Save the aligned dataset (.csv or .parquet)
    Export {
        #[command(flatten)]
        input: InputArgs,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("expected key=value, got '{s}'"))
}

fn load_settings(path: Option<&PathBuf>, unit: Option<TemperatureUnit>) -> AnalysisSettings {
    let mut settings = match path {
        Some(path) => AnalysisSettings::load_from(path),
        None => AnalysisSettings::load(),
    };
    if let Some(unit) = unit {
        settings.temperature_unit = unit;
    }
    settings
}

fn open_session(input: &InputArgs, settings: AnalysisSettings) -> Result<AnalysisSession> {
    let source = match &input.dataset {
        Some(path) => DatasetSource::Persisted(path.clone()),
        None => {
            if input.logs.is_empty() {
                bail!("no input: pass one or more log files or --dataset");
            }
            let logs = input
                .logs
                .iter()
                .map(|path| {
                    RawLog::read(path).with_context(|| format!("failed to read {}", path.display()))
                })
                .collect::<Result<Vec<_>>>()?;
            DatasetSource::Logs(logs)
        }
    };

    AnalysisSession::open(&source, settings).context("failed to load dataset")
}

fn selection(args: &SelectionArgs) -> Result<Selection> {
    let parse = |label: &str, value: &Option<String>| -> Result<Option<chrono::NaiveDateTime>> {
        value
            .as_deref()
            .map(|v| parse_timestamp(v).with_context(|| format!("cannot parse --{label} '{v}'")))
            .transpose()
    };

    let range = match (parse("start", &args.start)?, parse("end", &args.end)?) {
        (None, None) => None,
        (start, end) => {
            let start = start.unwrap_or(chrono::NaiveDateTime::MIN);
            let end = end.unwrap_or(chrono::NaiveDateTime::MAX);
            Some(DateRange::new(start, end)?)
        }
    };

    Ok(Selection {
        range,
        months: MonthSet::new(args.months.iter().copied())?,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn is_temperature(parameter: Parameter) -> bool {
    parameter != Parameter::RelativeHumidity
}

/// Limits entered on the command line, converted to the stored Fahrenheit scale
fn limits_to_fahrenheit(
    parameter: Parameter,
    unit: TemperatureUnit,
    lower: Option<f64>,
    upper: Option<f64>,
) -> (Option<f64>, Option<f64>) {
    if !is_temperature(parameter) {
        return (lower, upper);
    }
    let convert = |v: f64| unit.convert_to_fahrenheit(v);
    (lower.map(convert), upper.map(convert))
}

fn threshold_to_fahrenheit(
    parameter: Parameter,
    unit: TemperatureUnit,
    threshold: Option<f64>,
) -> Option<f64> {
    if !is_temperature(parameter) {
        return threshold;
    }
    threshold.map(|t| unit.convert_delta_to_fahrenheit(t))
}

fn convert_bounds(reports: &mut [RoomReport<BoundsResult>], unit: TemperatureUnit) {
    for report in reports {
        let r = &mut report.result;
        for v in [&mut r.lower, &mut r.upper, &mut r.min, &mut r.max] {
            *v = unit.convert_from_fahrenheit(*v);
        }
    }
}

fn convert_swing(reports: &mut [RoomReport<SwingSummary>], unit: TemperatureUnit) {
    for report in reports {
        let s = &mut report.result;
        s.max_swing = unit.convert_delta_from_fahrenheit(s.max_swing);
        s.threshold = unit.convert_delta_from_fahrenheit(s.threshold);
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.settings.as_ref(), cli.unit);
    let unit = settings.temperature_unit;

    match cli.command {
        Commands::Bounds {
            input,
            selection: sel,
            parameter,
            lower,
            upper,
            monthly,
            map,
        } => {
            let session = open_session(&input, settings)?;
            let (lower, upper) = limits_to_fahrenheit(parameter, unit, lower, upper);
            let request = BoundsRequest {
                parameter,
                selection: selection(&sel)?,
                lower,
                upper,
            };

            if let Some(room) = monthly {
                return print_json(&session.monthly_bounds(&room, &request)?);
            }

            let mut reports = session.bounds_report(&request)?;
            if map {
                return print_json(&session.bounds_map(&reports));
            }
            if is_temperature(parameter) {
                convert_bounds(&mut reports, unit);
            }
            print_json(&reports)
        }
        Commands::Swing {
            input,
            selection: sel,
            parameter,
            threshold,
            monthly,
            map,
        } => {
            let session = open_session(&input, settings)?;
            let request = SwingRequest {
                parameter,
                selection: selection(&sel)?,
                threshold: threshold_to_fahrenheit(parameter, unit, threshold),
            };

            if let Some(room) = monthly {
                return print_json(&session.monthly_swing(&room, &request)?);
            }

            let mut reports = session.swing_report(&request)?;
            if map {
                return print_json(&session.swing_map(&reports));
            }
            if is_temperature(parameter) {
                convert_swing(&mut reports, unit);
            }
            print_json(&reports)
        }
        Commands::Correlate {
            input,
            parameter,
            room,
        } => {
            let session = open_session(&input, settings)?;
            match room {
                Some(room) => print_json(&session.correlation_map(&room, parameter.kind())?),
                None => print_json(&session.correlation(parameter.kind())?),
            }
        }
        Commands::Suitability { input, parameter } => {
            let session = open_session(&input, settings)?;
            print_json(&session.suitability(parameter.kind())?)
        }
        Commands::Factors {
            input,
            parameter,
            factors,
            map,
        } => {
            let session = open_session(&input, settings)?;
            let report = session.factors(parameter.kind(), factors)?;
            match map {
                Some(factor) => print_json(&session.factor_map(&report.model, factor)?),
                None => print_json(&report),
            }
        }
        Commands::Analyze {
            input,
            room,
            analyzer,
            params,
        } => {
            let session = open_session(&input, settings)?;
            let params: HashMap<String, String> = params.into_iter().collect();
            print_json(&session.run_analyzer(&room, &analyzer, &params)?)
        }
        Commands::Analyzers => {
            let registry = AnalyzerRegistry::new();
            let listing: Vec<_> = registry
                .all()
                .iter()
                .map(|a| {
                    serde_json::json!({
                        "id": a.id(),
                        "name": a.name(),
                        "category": a.category(),
                        "description": a.description(),
                        "parameters": a.get_config().parameters,
                    })
                })
                .collect();
            print_json(&listing)
        }
        Commands::Export { input, output } => {
            let session = open_session(&input, settings)?;
            session
                .export(&output)
                .with_context(|| format!("failed to write {}", output.display()))
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}
