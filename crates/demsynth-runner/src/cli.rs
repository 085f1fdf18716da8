//! Command-line interface.

use crate::config::{load_config, DemsConfig, JobConfig, MergeOrderSetting};
use crate::error::RunnerError;
use clap::{Args, Parser, Subcommand};
use demsynth_fill::gap_fill_with;
use demsynth_pipeline::{
    ClassifyMethod, ClassifyParams, DemOrchestrator, DemType, GroundClassifier, PdalCli,
    PdalGroundClassifier, Radius, RadiusScheduler, RasterProduct, Reporter, TracingReporter,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = "demsynth")]
#[command(author, version, about = "Multi-radius DEM synthesis from point clouds", long_about = None)]
pub struct Cli {
    /// Debug logging and verbose PDAL output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// YAML job file; flags override its values
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Classify ground points of a point cloud in place
    Classify {
        /// Point cloud (LAS/LAZ)
        file: PathBuf,
        #[command(flatten)]
        params: ClassifyArgs,
    },
    /// Create DEMs from point clouds at one or more radii
    Dems(DemsArgs),
    /// Merge rasters into one hole-free raster
    GapFill {
        /// Output raster
        output: PathBuf,
        /// Input rasters
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Merge priority: `radius` sorts finest `_r<radius>` first, `lexicographic` sorts by name
        #[arg(long, value_parser = parse_order)]
        order: Option<MergeOrderSetting>,
        /// Median window size (odd)
        #[arg(long)]
        median_size: Option<usize>,
    },
    /// Classify the source point clouds, then create DEMs
    Run {
        #[command(flatten)]
        classify: ClassifyArgs,
        #[command(flatten)]
        dems: DemsArgs,
    },
}

/// Ground classification flags.
#[derive(Debug, Clone, Default, Args)]
pub struct ClassifyArgs {
    /// Use SMRF instead of PMF
    #[arg(long)]
    pub smrf: bool,
    #[arg(long)]
    pub slope: Option<f64>,
    #[arg(long)]
    pub cell_size: Option<f64>,
    #[arg(long)]
    pub max_window_size: Option<f64>,
    #[arg(long)]
    pub max_distance: Option<f64>,
    #[arg(long)]
    pub initial_distance: Option<f64>,
    #[arg(long)]
    pub approximate: bool,
}

impl ClassifyArgs {
    pub fn apply(&self, params: &mut ClassifyParams) {
        if self.smrf {
            params.method = ClassifyMethod::Smrf;
        }
        if let Some(v) = self.slope {
            params.slope = v;
        }
        if let Some(v) = self.cell_size {
            params.cell_size = v;
        }
        if let Some(v) = self.max_window_size {
            params.max_window_size = v;
        }
        if let Some(v) = self.max_distance {
            params.max_distance = v;
        }
        if let Some(v) = self.initial_distance {
            params.initial_distance = v;
        }
        if self.approximate {
            params.approximate = true;
        }
    }
}

/// DEM generation flags.
#[derive(Debug, Clone, Default, Args)]
pub struct DemsArgs {
    /// Point clouds to rasterize
    #[arg(value_name = "LAS")]
    pub sources: Vec<PathBuf>,
    /// DEM type: dsm, dtm, mesh_dsm
    #[arg(long = "type", value_name = "TYPE")]
    pub dem_type: Option<String>,
    /// Comma-separated radii
    #[arg(long, value_delimiter = ',')]
    pub radii: Vec<Radius>,
    /// Comma-separated products (idw, max, mean, ...)
    #[arg(long, value_delimiter = ',')]
    pub products: Vec<String>,
    /// Return the first radius raster instead of merging
    #[arg(long)]
    pub no_gap_fill: bool,
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    #[arg(long)]
    pub suffix: Option<String>,
    #[arg(long)]
    pub resolution: Option<f64>,
    #[arg(long)]
    pub decimation: Option<u32>,
    #[arg(long)]
    pub max_std_dev: Option<f64>,
    #[arg(long)]
    pub max_elevation: Option<f64>,
    #[arg(long)]
    pub max_angle: Option<f64>,
    #[arg(long)]
    pub max_return_number: Option<u32>,
    #[arg(long)]
    pub max_workers: Option<usize>,
    /// Deadline for the whole radius batch, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<f64>,
}

impl DemsArgs {
    pub fn apply(&self, config: &mut DemsConfig) {
        if !self.sources.is_empty() {
            config.source_files = self.sources.clone();
        }
        if let Some(name) = &self.dem_type {
            config.dem_type = DemType::from(name.as_str());
        }
        if !self.radii.is_empty() {
            config.radii = self.radii.clone();
        }
        if !self.products.is_empty() {
            config.products = self.products.iter().map(|p| RasterProduct::from(p.as_str())).collect();
        }
        if self.no_gap_fill {
            config.gap_fill = false;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(suffix) = &self.suffix {
            config.suffix = suffix.clone();
        }
        let options = &mut config.options;
        if let Some(v) = self.resolution {
            options.resolution = v;
        }
        if self.decimation.is_some() {
            options.decimation = self.decimation;
        }
        if self.max_std_dev.is_some() {
            options.max_std_dev = self.max_std_dev;
        }
        if self.max_elevation.is_some() {
            options.max_elevation = self.max_elevation;
        }
        if self.max_angle.is_some() {
            options.max_angle = self.max_angle;
        }
        if self.max_return_number.is_some() {
            options.max_return_number = self.max_return_number;
        }
        if self.max_workers.is_some() {
            config.max_workers = self.max_workers;
        }
        if self.timeout.is_some() {
            config.batch_timeout_secs = self.timeout;
        }
    }
}

fn parse_order(s: &str) -> Result<MergeOrderSetting, String> {
    match s {
        "radius" => Ok(MergeOrderSetting::Radius),
        "lexicographic" => Ok(MergeOrderSetting::Lexicographic),
        other => Err(format!("unknown merge order '{}'", other)),
    }
}

/// Apply the config file and flags into the effective job settings.
pub fn resolve_config(cli: &Cli) -> Result<JobConfig, RunnerError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => JobConfig::default(),
    };
    if cli.verbose {
        config.dems.options.verbose = true;
        config.classify.verbose = true;
    }
    match &cli.command {
        Command::Classify { params, .. } => params.apply(&mut config.classify),
        Command::Dems(args) => args.apply(&mut config.dems),
        Command::GapFill {
            order, median_size, ..
        } => {
            if let Some(order) = order {
                config.gap_fill.order = *order;
            }
            if let Some(size) = median_size {
                config.gap_fill.median_size = *size;
            }
        }
        Command::Run { classify, dems } => {
            classify.apply(&mut config.classify);
            dems.apply(&mut config.dems);
        }
    }
    Ok(config)
}

/// Execute the parsed command line.
pub fn run(cli: Cli) -> Result<(), RunnerError> {
    let config = resolve_config(&cli)?;
    debug!(?config, "Resolved job configuration");
    let reporter: Arc<dyn Reporter> = Arc::new(TracingReporter);

    match &cli.command {
        Command::Classify { file, .. } => {
            let classifier = PdalGroundClassifier::new(PdalCli::from_env(), reporter);
            let out = classifier.classify(file, &config.classify)?;
            println!("{}", out.display());
        }
        Command::Dems(_) => {
            let request = config.dems.to_request()?;
            let scheduler = RadiusScheduler::with_pdal(PdalCli::from_env(), reporter)
                .with_gap_fill_options(config.gap_fill.to_options());
            print_outputs(&scheduler.create_dems(&request)?);
        }
        Command::GapFill { output, inputs, .. } => {
            let report = gap_fill_with(inputs.as_slice(), output, &config.gap_fill.to_options())?;
            println!("{}", report.output.display());
        }
        Command::Run { .. } => {
            let request = config.dems.to_request()?;
            let executor = PdalCli::from_env();
            let classifier = PdalGroundClassifier::new(executor.clone(), Arc::clone(&reporter));
            let scheduler = RadiusScheduler::with_pdal(executor, reporter)
                .with_gap_fill_options(config.gap_fill.to_options());
            let orchestrator = DemOrchestrator::new(Arc::new(classifier), scheduler);
            print_outputs(&orchestrator.classify_then_generate(&config.classify, &request)?);
        }
    }
    Ok(())
}

fn print_outputs(outputs: &BTreeMap<RasterProduct, PathBuf>) {
    for (product, path) in outputs {
        println!("{}\t{}", product, path.display());
    }
}
