use anyhow::{ensure, Context, Result};
use clap::{Parser, ValueEnum};
use config::{Config, Environment, File};
use log::{info, LevelFilter};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::{
    error::OpticsError,
    grid::SamplingGrid,
    jones::{self, Element, JonesVector},
    lens::{Lens, LensSystem},
    ray::{Propagation, RayBundle},
    tracer::RayTracer,
};

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn default_config_loads() {
        let settings = load_default_config().unwrap();
        assert_eq!(settings.lenses.len(), 2);
        assert_eq!(settings.grid.num_samples, 500);
        assert_eq!(settings.rays.count, 11);
        assert_eq!(settings.propagation, Propagation::Tangent);
        assert_eq!(settings.polarization.elements.len(), 3);
        assert!(settings.render.enabled);
    }

    #[test]
    fn default_config_builds_valid_inputs() {
        let settings = load_default_config().unwrap();
        assert_eq!(settings.lens_system().unwrap().len(), 2);
        assert_eq!(settings.sampling_grid().unwrap().len(), 500);
        assert_eq!(settings.ray_bundle().unwrap().len(), 11);
    }

    #[test]
    fn explicit_heights_take_precedence() {
        let mut settings = load_default_config().unwrap();
        settings.rays.heights = Some(vec![0.5, -0.5]);
        assert_eq!(settings.ray_bundle().unwrap().heights(), &[0.5, -0.5]);
    }

    #[test]
    fn cli_overrides() {
        let mut settings = load_default_config().unwrap();
        let args = CliArgs::parse_from([
            "optisim",
            "--samples",
            "42",
            "--rays",
            "3",
            "--lens",
            "2.0,1.5 8.0,-4.0",
            "--small-angle",
            "--no-render",
        ]);
        apply_cli_overrides(&mut settings, &args);

        assert_eq!(settings.grid.num_samples, 42);
        assert_eq!(settings.rays.count, 3);
        assert_eq!(
            settings.lenses,
            vec![Lens::new(2.0, 1.5), Lens::new(8.0, -4.0)]
        );
        assert_eq!(settings.propagation, Propagation::SmallAngle);
        assert!(!settings.render.enabled);
    }

    #[test]
    fn environment_then_cli_layers() {
        // the only test that reads the environment through load_config
        let config = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml");
        let config = config.to_str().unwrap();
        env::set_var("OPTISIM_GRID__NUM_SAMPLES", "64");

        let from_env = load_config(&CliArgs::parse_from(["optisim", "--config", config]));
        let from_cli = load_config(&CliArgs::parse_from([
            "optisim", "--config", config, "--samples", "32",
        ]));
        env::remove_var("OPTISIM_GRID__NUM_SAMPLES");

        let from_env = from_env.unwrap();
        assert_eq!(from_env.grid.num_samples, 64);
        assert_eq!(from_env.rays.count, 11);
        assert_eq!(from_cli.unwrap().grid.num_samples, 32);
    }

    #[test]
    fn lens_parser() {
        assert_eq!(parse_lens("5,2").unwrap(), Lens::new(5.0, 2.0));
        assert!(parse_lens("5").is_err());
        assert!(parse_lens("a,2").is_err());
    }

    #[test]
    fn validation_rejects_bad_render_range() {
        let mut settings = load_default_config().unwrap();
        settings.render.y_min = 1.0;
        settings.render.y_max = -1.0;
        assert!(validate_config(&settings).is_err());
    }

    #[test]
    fn validation_rejects_zero_focal_length() {
        let mut settings = load_default_config().unwrap();
        settings.lenses.push(Lens::new(12.0, 0.0));
        let err = validate_config(&settings).unwrap_err();
        assert!(err.to_string().contains("lens"), "{}", err);
    }
}

/// Axial sampling grid parameters.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GridSettings {
    pub start: f64,
    pub end: f64,
    pub num_samples: usize,
}

/// Initial ray heights. An explicit `heights` list overrides the even spread.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RaySettings {
    pub start: f64,
    pub end: f64,
    pub count: usize,
    #[serde(default)]
    pub heights: Option<Vec<f64>>,
}

/// Jones calculus pipeline: linear input state and element sequence.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PolarizationSettings {
    pub input_angle: f32, // degrees from horizontal
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RenderSettings {
    pub enabled: bool,
    pub width: u32,
    pub height: u32,
    pub y_min: f64,
    pub y_max: f64,
    pub frames: usize,
    pub frame_delay_ms: u32,
}

/// Runtime configuration for the application.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Settings {
    pub directory: PathBuf,
    #[serde(default)]
    pub propagation: Propagation,
    #[serde(default)]
    pub lenses: Vec<Lens>,
    pub grid: GridSettings,
    pub rays: RaySettings,
    pub polarization: PolarizationSettings,
    pub render: RenderSettings,
}

impl Settings {
    pub fn lens_system(&self) -> Result<LensSystem, OpticsError> {
        LensSystem::new(self.lenses.clone())
    }

    pub fn sampling_grid(&self) -> Result<SamplingGrid, OpticsError> {
        SamplingGrid::linspace(self.grid.start, self.grid.end, self.grid.num_samples)
    }

    pub fn ray_bundle(&self) -> Result<RayBundle, OpticsError> {
        match &self.rays.heights {
            Some(heights) => RayBundle::new(heights.clone()),
            None => RayBundle::linspace(self.rays.start, self.rays.end, self.rays.count),
        }
    }

    pub fn tracer(&self) -> Result<RayTracer, OpticsError> {
        Ok(RayTracer::new(self.lens_system()?, self.sampling_grid()?)
            .with_propagation(self.propagation))
    }

    pub fn polarization_input(&self) -> JonesVector {
        jones::linear(self.polarization.input_angle)
    }
}

/// Loads the shipped default configuration, ignoring local overrides,
/// the environment and the command line.
pub fn load_default_config() -> Result<Settings> {
    let root = retrieve_project_root()?;
    let settings = load_config_file(&root.join("config/default.toml"))?;
    validate_config(&settings)?;
    Ok(settings)
}

/// Loads a single configuration file.
pub fn load_config_file(path: &Path) -> Result<Settings> {
    Config::builder()
        .add_source(File::from(path).required(true))
        .build()
        .with_context(|| format!("Error loading configuration: {}", path.display()))?
        .try_deserialize()
        .with_context(|| format!("Error deserializing configuration: {}", path.display()))
}

/// Loads the layered configuration:
/// config file, then `OPTISIM_*` environment variables, then command-line flags.
pub fn load_config(args: &CliArgs) -> Result<Settings> {
    let config_file = match &args.config {
        Some(path) => path.clone(),
        None => {
            let root = retrieve_project_root()?;
            let local_config = root.join("config/local.toml");
            // local config replaces the default entirely
            if local_config.exists() {
                local_config
            } else {
                root.join("config/default.toml")
            }
        }
    };
    info!("Using configuration: {}", config_file.display());

    let mut settings: Settings = Config::builder()
        .add_source(File::from(config_file.as_path()).required(true))
        .add_source(
            Environment::with_prefix("optisim")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Error loading configuration: {}", config_file.display()))?
        .try_deserialize()
        .context("Error deserializing configuration")?;

    apply_cli_overrides(&mut settings, args);
    validate_config(&settings)?;

    Ok(settings)
}

fn apply_cli_overrides(settings: &mut Settings, args: &CliArgs) {
    if let Some(directory) = &args.directory {
        settings.directory = directory.clone();
    }
    if let Some(num_samples) = args.samples {
        settings.grid.num_samples = num_samples;
    }
    if let Some(end) = args.end {
        settings.grid.end = end;
    }
    if let Some(count) = args.rays {
        settings.rays.count = count;
        settings.rays.heights = None;
    }
    if let Some(lenses) = &args.lens {
        settings.lenses = lenses.clone();
    }
    if args.small_angle {
        settings.propagation = Propagation::SmallAngle;
    }
    if args.no_render {
        settings.render.enabled = false;
    }
}

/// Retrieve the project root directory.
/// This function tries to find the project root directory in different ways:
/// 1. If the CARGO_MANIFEST_DIR environment variable is set, use it.
/// 2. If the OPTISIM_ROOT_DIR environment variable is set, use it.
/// 3. If the "config" subdirectory is found in the executable directory or any of its parents, use it.
fn retrieve_project_root() -> Result<PathBuf> {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        // When running through cargo (e.g. cargo run, cargo test)
        return Ok(PathBuf::from(manifest_dir));
    }
    if let Ok(path) = env::var("OPTISIM_ROOT_DIR") {
        return Ok(PathBuf::from(path));
    }

    let exe_path = env::current_exe().context("Failed to get current executable path")?;
    exe_path
        .ancestors()
        .skip(1)
        .find(|dir| dir.join("config").is_dir())
        .map(Path::to_path_buf)
        .context("Could not find project root directory")
}

/// Checks that the settings describe a runnable simulation.
pub fn validate_config(config: &Settings) -> Result<()> {
    config.lens_system().context("Invalid lens configuration")?;
    config.sampling_grid().context("Invalid grid configuration")?;
    config.ray_bundle().context("Invalid ray configuration")?;

    let render = &config.render;
    ensure!(
        render.y_max > render.y_min,
        "Render y range must be increasing, got {} to {}",
        render.y_min,
        render.y_max
    );
    ensure!(
        render.width > 0 && render.height > 0,
        "Render size must be positive, got {}x{}",
        render.width,
        render.height
    );
    ensure!(render.frames > 0, "Animation must have at least one frame");
    Ok(())
}

/// Logging levels selectable from the command line.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Parser, Debug, Default)]
#[command(
    version,
    about = "optisim - thin lens ray tracing and Jones calculus polarization"
)]
pub struct CliArgs {
    /// Configuration file. Defaults to config/local.toml if present, else config/default.toml.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for data files, plots and animations.
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// Number of samples along the optical axis.
    #[arg(long)]
    pub samples: Option<usize>,

    /// Last sampled axial position.
    #[arg(long)]
    pub end: Option<f64>,

    /// Number of rays, spread evenly between the configured start and end heights.
    #[arg(long)]
    pub rays: Option<usize>,

    /// Thin lenses replacing the configured ones, separated by spaces.
    /// Format: position1,focal1 position2,focal2 ...
    #[arg(long, value_parser = parse_lens, num_args = 1.., value_delimiter = ' ')]
    pub lens: Option<Vec<Lens>>,

    /// Propagate with `dx * angle` instead of `dx * tan(angle)`.
    #[arg(long)]
    pub small_angle: bool,

    /// Write data files only, skipping plots and animations.
    #[arg(long)]
    pub no_render: bool,

    /// Logging level.
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

/// Parse a lens in the format "position,focal_length"
fn parse_lens(s: &str) -> Result<Lens, String> {
    let values: Vec<&str> = s.split(',').collect();
    if values.len() != 2 {
        return Err(format!(
            "Invalid lens format: '{}'. Expected 'position,focal_length'",
            s
        ));
    }

    let position = values[0]
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("Failed to parse lens position: {}", values[0]))?;
    let focal_length = values[1]
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("Failed to parse focal length: {}", values[1]))?;

    Ok(Lens::new(position, focal_length))
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Settings:")?;
        writeln!(
            f,
            "  - Grid: {} samples from {} to {}",
            self.grid.num_samples, self.grid.start, self.grid.end
        )?;
        match &self.rays.heights {
            Some(heights) => writeln!(f, "  - Rays: {:?}", heights)?,
            None => writeln!(
                f,
                "  - Rays: {} from {} to {}",
                self.rays.count, self.rays.start, self.rays.end
            )?,
        }
        writeln!(f, "  - Propagation: {:?}", self.propagation)?;
        for lens in &self.lenses {
            writeln!(f, "  - Lens: {}", lens)?;
        }
        write!(f, "  - Polarization: linear {}° ->", self.polarization.input_angle)?;
        for element in &self.polarization.elements {
            write!(f, " {}", element)?;
        }
        writeln!(f)?;
        write!(f, "  - Output: {}", self.directory.display())
    }
}
