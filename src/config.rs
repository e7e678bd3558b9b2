/// Sub-directory of the output directory for polarization artifacts.
pub const POLARIZATION_DIR: &str = "figures_polarization";
/// Sub-directory of the output directory for ray tracing artifacts.
pub const RAY_TRACING_DIR: &str = "figures_ray_tracing";
/// Margin around the plot area in pixels.
pub const PLOT_MARGIN: u32 = 40;
/// Fraction of the data span added above and below fitted plot ranges.
pub const PLOT_PADDING: f64 = 0.05;
/// Number of grid divisions drawn along each plot axis.
pub const PLOT_GRID_DIVISIONS: u32 = 10;
/// Length of each dash when drawing lens markers, in pixels.
pub const DASH_LENGTH: u32 = 8;
/// Side length of the square polarization plot, in pixels.
pub const POLARIZATION_PLOT_SIZE: u32 = 600;
