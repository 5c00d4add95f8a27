//! `powercast` command line: fetch a patch, train or search a model, score a date.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use log::info;
use polars::prelude::{CsvWriter, SerWriter};
use powercast::{
    build_features, parse_power_date, FeatureTable, LongTable, LonLat, PatchAssembler,
    PowerClient, PowercastError, Predictor, RetryPolicy, Search, SearchConfig, Trainer,
    TrainerConfig, DEFAULT_MODEL_PATH,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "powercast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "NASA POWER precipitation threshold classifier", long_about = None)]
struct Cli {
    #[command(flatten)]
    client: ClientArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch the patch around a location and print the first rows
    Fetch(FetchArgs),
    /// Train a model on a single stratified train/test split
    Train(TrainArgs),
    /// Cross-validate a small parameter grid and keep the best model
    Search(SearchArgs),
    /// Score one location and date with a saved model
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
struct ClientArgs {
    /// Directory for cached POWER responses
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Neither read nor write the response cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = 15)]
    timeout_secs: u64,

    /// Retries after a failed request
    #[arg(long, global = true, default_value_t = 3)]
    retries: u32,

    /// Pause between network fetches in milliseconds
    #[arg(long, global = true, default_value_t = 100)]
    pause_ms: u64,
}

#[derive(Args, Debug)]
struct PatchArgs {
    #[arg(long, default_value_t = -80.25, allow_hyphen_values = true)]
    lon: f64,

    #[arg(long, default_value_t = 43.55, allow_hyphen_values = true)]
    lat: f64,

    /// First date, YYYYMMDD or YYYY-MM-DD
    #[arg(long, value_parser = parse_date, default_value = "19810101")]
    start: NaiveDate,

    /// Last date, YYYYMMDD or YYYY-MM-DD; defaults to today
    #[arg(long, value_parser = parse_date)]
    end: Option<NaiveDate>,

    /// Grid spacing in degrees
    #[arg(long, default_value_t = 0.1)]
    radius: f64,

    #[arg(long, default_value_t = 3)]
    grid_width: usize,

    #[arg(long, default_value_t = 3)]
    grid_height: usize,
}

#[derive(Args, Debug)]
struct FetchArgs {
    #[command(flatten)]
    patch: PatchArgs,

    /// Fetch only the center point instead of the whole grid
    #[arg(long)]
    single: bool,
}

impl FetchArgs {
    fn grid(&self) -> (usize, usize) {
        if self.single {
            (1, 1)
        } else {
            (self.patch.grid_width, self.patch.grid_height)
        }
    }
}

#[derive(Args, Debug)]
struct TrainArgs {
    #[command(flatten)]
    patch: PatchArgs,

    /// Precipitation (mm/day) at or above which a day is positive
    #[arg(long, default_value_t = 0.1)]
    threshold: f64,

    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    out: PathBuf,

    /// Also write the feature table to this CSV file
    #[arg(long)]
    export_features: Option<PathBuf>,

    #[arg(long, default_value_t = 200)]
    iterations: usize,

    #[arg(long, default_value_t = 0.1)]
    learning_rate: f32,

    #[arg(long, default_value_t = 5)]
    max_depth: u32,

    #[arg(long, default_value_t = 20)]
    min_leaf_size: usize,
}

#[derive(Args, Debug)]
struct SearchArgs {
    #[command(flatten)]
    patch: PatchArgs,

    #[arg(long, default_value_t = 0.1)]
    threshold: f64,

    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    out: PathBuf,

    #[arg(long, default_value_t = 5)]
    folds: usize,

    /// Number of parameter sets tried
    #[arg(long, default_value_t = 6)]
    candidates: usize,

    #[arg(long, default_value_t = 200)]
    iterations: usize,
}

#[derive(Args, Debug)]
struct PredictArgs {
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Date to score, YYYYMMDD or YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    date: NaiveDate,

    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    model: PathBuf,

    /// Days of history fetched before the date; lag features need at least 3
    #[arg(long, default_value_t = 10)]
    lookback_days: u64,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    parse_power_date(value).ok_or_else(|| format!("invalid date '{value}'"))
}

fn main() -> Result<(), PowercastError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let client = build_client(&cli.client)?;
    let assembler =
        PatchAssembler::new(&client).with_pause(Duration::from_millis(cli.client.pause_ms));

    match cli.command {
        Commands::Fetch(args) => run_fetch(&assembler, &args),
        Commands::Train(args) => run_train(&assembler, &args),
        Commands::Search(args) => run_search(&assembler, &args),
        Commands::Predict(args) => run_predict(&assembler, &args),
    }
}

fn build_client(args: &ClientArgs) -> Result<PowerClient, PowercastError> {
    PowerClient::configure()
        .maybe_cache_folder(args.cache_dir.clone())
        .disable_cache(args.no_cache)
        .timeout(Duration::from_secs(args.timeout_secs))
        .retry(RetryPolicy {
            max_retries: args.retries,
            ..RetryPolicy::default()
        })
        .call()
}

fn fetch_patch(
    assembler: &PatchAssembler<'_, PowerClient>,
    args: &PatchArgs,
) -> Result<LongTable, PowercastError> {
    fetch_grid(assembler, args, args.grid_width, args.grid_height)
}

fn fetch_grid(
    assembler: &PatchAssembler<'_, PowerClient>,
    args: &PatchArgs,
    grid_width: usize,
    grid_height: usize,
) -> Result<LongTable, PowercastError> {
    info!(
        "Fetching {}x{} patch around lon={} lat={}",
        grid_width, grid_height, args.lon, args.lat
    );
    let table = assembler
        .fetch_patch()
        .center(LonLat(args.lon, args.lat))
        .radius(args.radius)
        .grid_width(grid_width)
        .grid_height(grid_height)
        .start(args.start)
        .maybe_end(args.end)
        .call()?;
    Ok(table)
}

fn features_for(
    assembler: &PatchAssembler<'_, PowerClient>,
    args: &PatchArgs,
    threshold: f64,
) -> Result<FeatureTable, PowercastError> {
    let history = fetch_patch(assembler, args)?;
    println!("Fetched {} rows", history.height());
    let features = build_features(&history, threshold)?;
    println!("Feature rows: {}", features.height());
    Ok(features)
}

fn run_fetch(
    assembler: &PatchAssembler<'_, PowerClient>,
    args: &FetchArgs,
) -> Result<(), PowercastError> {
    let (grid_width, grid_height) = args.grid();
    let table = fetch_grid(assembler, &args.patch, grid_width, grid_height)?;
    println!("Rows: {}", table.height());
    println!("{}", table.frame.head(Some(5)));
    Ok(())
}

fn run_train(
    assembler: &PatchAssembler<'_, PowerClient>,
    args: &TrainArgs,
) -> Result<(), PowercastError> {
    let features = features_for(assembler, &args.patch, args.threshold)?;
    if let Some(path) = &args.export_features {
        export_features(&features, path)?;
        println!("Wrote features to {}", path.display());
    }

    let mut config = TrainerConfig::default();
    config.params.iterations = args.iterations;
    config.params.learning_rate = args.learning_rate;
    config.params.max_depth = args.max_depth;
    config.params.min_leaf_size = args.min_leaf_size;

    let artifact = Trainer::new(config).train_and_save(&features, &args.out)?;
    if let Some(evaluation) = &artifact.evaluation {
        println!("{evaluation}");
    }
    println!("Saved model to {}", args.out.display());
    Ok(())
}

fn run_search(
    assembler: &PatchAssembler<'_, PowerClient>,
    args: &SearchArgs,
) -> Result<(), PowercastError> {
    let features = features_for(assembler, &args.patch, args.threshold)?;
    let search = Search::new(SearchConfig {
        folds: args.folds,
        candidates: args.candidates,
        iterations: args.iterations,
        ..SearchConfig::default()
    });

    let outcome = search.run_and_save(&features, &args.out)?;
    for score in &outcome.scores {
        match score.mean_roc_auc {
            Some(auc) => println!("{:?} -> mean roc_auc {:.4}", score.params, auc),
            None => println!("{:?} -> not scored", score.params),
        }
    }
    println!("Best params: {:?}", outcome.artifact.params);
    println!("Saved best model to {}", args.out.display());
    Ok(())
}

fn run_predict(
    assembler: &PatchAssembler<'_, PowerClient>,
    args: &PredictArgs,
) -> Result<(), PowercastError> {
    let predictor = Predictor::load(&args.model)?.with_lookback_days(args.lookback_days);
    let prediction = predictor.predict_point(assembler, LonLat(args.lon, args.lat), args.date)?;
    println!(
        "P(precip >= {} mm) on {} at lon={} lat={}: {:.4} (class {})",
        predictor.artifact().threshold,
        prediction.date,
        prediction.location.lon(),
        prediction.location.lat(),
        prediction.probability,
        prediction.predicted_class
    );
    Ok(())
}

fn export_features(features: &FeatureTable, path: &Path) -> Result<(), PowercastError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PowercastError::Io(parent.to_path_buf(), e))?;
    }
    let mut file = File::create(path).map_err(|e| PowercastError::Io(path.to_path_buf(), e))?;
    let mut frame = features.frame.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut frame)
        .map_err(|e| PowercastError::FeatureExport(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetch_args(args: &[&str]) -> FetchArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Fetch(args) => args,
            other => panic!("expected fetch, got {other:?}"),
        }
    }

    #[test]
    fn test_single_fetches_only_the_center() {
        let args = fetch_args(&[
            "powercast", "fetch", "--single", "--start", "20150101", "--end", "2016-12-31",
        ]);
        assert_eq!(args.grid(), (1, 1));
        assert_eq!(args.patch.start, NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());
        assert_eq!(args.patch.end, NaiveDate::from_ymd_opt(2016, 12, 31));
    }

    #[test]
    fn test_fetch_defaults_to_full_grid() {
        let args = fetch_args(&["powercast", "fetch", "--grid-width", "5"]);
        assert_eq!(args.grid(), (5, 3));
        assert_eq!(args.patch.lon, -80.25);
    }

    #[test]
    fn test_global_client_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["powercast", "fetch", "--single", "--no-cache"]).unwrap();
        assert!(cli.client.no_cache);
        assert_eq!(cli.client.retries, 3);
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        assert!(Cli::try_parse_from(["powercast", "fetch", "--start", "2015-13-01"]).is_err());
    }
}
