//! Static plots and animations of ray trajectories and polarization states.
//!
//! The renderer only consumes finished results: trajectories, the lens system
//! they were traced through, and evaluated Jones vectors. It never touches the
//! numerics. Images are rasterised with the `image` crate; ray plots and
//! polarization plots are written as PNG, the propagation animation as a
//! looping GIF.

use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use image::{
    codecs::gif::{GifEncoder, Repeat},
    Delay, DynamicImage, Frame, Rgb, RgbImage,
};
use itertools::Itertools;
use log::{debug, info};

use crate::{
    config::{
        DASH_LENGTH, PLOT_GRID_DIVISIONS, PLOT_MARGIN, PLOT_PADDING, POLARIZATION_PLOT_SIZE,
    },
    grid::SamplingGrid,
    jones::Polarization,
    lens::LensSystem,
    ray::Trajectory,
    settings::RenderSettings,
};


const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GRID_COLOR: Rgb<u8> = Rgb([225, 225, 225]);
const AXIS_COLOR: Rgb<u8> = Rgb([40, 40, 40]);
const RAY_COLOR: Rgb<u8> = Rgb([31, 119, 180]);
const LENS_COLOR: Rgb<u8> = Rgb([214, 39, 40]);
const INPUT_COLOR: Rgb<u8> = RAY_COLOR;
const OUTPUT_COLOR: Rgb<u8> = LENS_COLOR;
/// Arrow head length in pixels.
const ARROW_HEAD: f32 = 12.0;

/// A raster canvas with a linear mapping from data to pixel coordinates.
#[derive(Debug, Clone)]
pub struct Plot {
    image: RgbImage,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl Plot {
    pub fn new(width: u32, height: u32, x_range: (f64, f64), y_range: (f64, f64)) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, BACKGROUND),
            x_range,
            y_range,
        }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Data coordinates to pixel coordinates. The y axis points up.
    fn to_pixel(&self, x: f64, y: f64) -> (f32, f32) {
        let margin = PLOT_MARGIN as f64;
        let width = self.image.width() as f64 - 2.0 * margin;
        let height = self.image.height() as f64 - 2.0 * margin;
        let (x0, x1) = self.x_range;
        let (y0, y1) = self.y_range;
        (
            (margin + (x - x0) / (x1 - x0) * width) as f32,
            (margin + (y1 - y) / (y1 - y0) * height) as f32,
        )
    }

    /// Light grid, frame, and the zero axes when they are in range.
    pub fn draw_grid(&mut self) {
        let (x0, x1) = self.x_range;
        let (y0, y1) = self.y_range;
        let divisions = PLOT_GRID_DIVISIONS as f64;
        for i in 0..=PLOT_GRID_DIVISIONS {
            let t = i as f64 / divisions;
            let x = x0 + (x1 - x0) * t;
            let y = y0 + (y1 - y0) * t;
            self.draw_segment((x, y0), (x, y1), GRID_COLOR);
            self.draw_segment((x0, y), (x1, y), GRID_COLOR);
        }

        let corners = [(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)];
        for (a, b) in corners.iter().tuple_windows() {
            self.draw_segment(*a, *b, AXIS_COLOR);
        }
        if y0 < 0.0 && 0.0 < y1 {
            self.draw_segment((x0, 0.0), (x1, 0.0), AXIS_COLOR);
        }
        if x0 < 0.0 && 0.0 < x1 {
            self.draw_segment((0.0, y0), (0.0, y1), AXIS_COLOR);
        }
    }

    pub fn draw_segment(&mut self, from: (f64, f64), to: (f64, f64), color: Rgb<u8>) {
        let a = self.to_pixel(from.0, from.1);
        let b = self.to_pixel(to.0, to.1);
        draw_pixel_line(&mut self.image, a, b, color);
    }

    pub fn draw_polyline(&mut self, points: &[(f64, f64)], color: Rgb<u8>) {
        for (a, b) in points.iter().tuple_windows() {
            self.draw_segment(*a, *b, color);
        }
    }

    /// Dashed vertical line spanning the plot area at data coordinate `x`.
    /// Positions outside the canvas draw nothing.
    pub fn draw_dashed_vertical(&mut self, x: f64, color: Rgb<u8>) {
        let (px, _) = self.to_pixel(x, 0.0);
        let px = px.round();
        if !px.is_finite() || px < 0.0 || px >= self.image.width() as f32 {
            return;
        }
        let px = px as u32;
        let top = PLOT_MARGIN;
        let bottom = self.image.height().saturating_sub(PLOT_MARGIN);
        for py in top..bottom {
            if ((py - top) / DASH_LENGTH) % 2 == 0 {
                for dx in 0..2 {
                    let column = px.saturating_add(dx);
                    if column < self.image.width() {
                        self.image.put_pixel(column, py, color);
                    }
                }
            }
        }
    }

    /// Straight arrow from `from` to `to` with a head at `to`.
    pub fn draw_arrow(&mut self, from: (f64, f64), to: (f64, f64), color: Rgb<u8>) {
        let a = self.to_pixel(from.0, from.1);
        let b = self.to_pixel(to.0, to.1);
        draw_pixel_line(&mut self.image, a, b, color);

        let (dx, dy) = (a.0 - b.0, a.1 - b.1);
        let length = (dx * dx + dy * dy).sqrt();
        if length < 1.0 {
            return;
        }
        let (ux, uy) = (dx / length, dy / length);
        for angle in [0.45f32, -0.45] {
            let (s, c) = angle.sin_cos();
            let head = (
                b.0 + ARROW_HEAD * (ux * c - uy * s),
                b.1 + ARROW_HEAD * (ux * s + uy * c),
            );
            draw_pixel_line(&mut self.image, b, head, color);
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.image
            .save(path)
            .with_context(|| format!("Failed to save image {}", path.display()))
    }
}

/// Clips a pixel-space segment to `[0, width-1] x [0, height-1]` (Liang-Barsky).
fn clip_segment(
    a: (f32, f32),
    b: (f32, f32),
    width: u32,
    height: u32,
) -> Option<((f32, f32), (f32, f32))> {
    if ![a.0, a.1, b.0, b.1].iter().all(|v| v.is_finite()) {
        return None;
    }
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let x_max = width.saturating_sub(1) as f32;
    let y_max = height.saturating_sub(1) as f32;
    let (mut t0, mut t1) = (0.0f32, 1.0f32);

    for (p, q) in [(-dx, a.0), (dx, x_max - a.0), (-dy, a.1), (dy, y_max - a.1)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    Some((
        (a.0 + t0 * dx, a.1 + t0 * dy),
        (a.0 + t1 * dx, a.1 + t1 * dy),
    ))
}

fn draw_pixel_line(image: &mut RgbImage, a: (f32, f32), b: (f32, f32), color: Rgb<u8>) {
    let Some((a, b)) = clip_segment(a, b, image.width(), image.height()) else {
        return;
    };
    let steps = (b.0 - a.0).abs().max((b.1 - a.1).abs()).ceil().max(1.0) as u32;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let x = (a.0 + t * (b.0 - a.0)).round();
        let y = (a.1 + t * (b.1 - a.1)).round();
        if x >= 0.0 && y >= 0.0 && (x as u32) < image.width() && (y as u32) < image.height() {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

/// Draws trajectories and polarization states into image files.
#[derive(Debug, Clone)]
pub struct Renderer {
    config: RenderSettings,
    x_range: (f64, f64),
}

impl Renderer {
    pub fn new(config: RenderSettings, grid: &SamplingGrid) -> Self {
        let x_range = if grid.end() > grid.start() {
            (grid.start(), grid.end())
        } else {
            (grid.start() - 1.0, grid.start() + 1.0)
        };
        Self { config, x_range }
    }

    fn ray_canvas(&self, lenses: &LensSystem, y_range: (f64, f64)) -> Plot {
        let mut plot = Plot::new(self.config.width, self.config.height, self.x_range, y_range);
        plot.draw_grid();
        for lens in lenses {
            plot.draw_dashed_vertical(lens.position, LENS_COLOR);
        }
        plot
    }

    /// Vertical extent of the static plot: the finite heights of all
    /// trajectories with a margin, or the configured range when there are none.
    pub fn fitted_y_range(&self, trajectories: &[Trajectory]) -> (f64, f64) {
        let (low, high) = trajectories
            .iter()
            .flat_map(Trajectory::heights)
            .filter(|h| h.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), h| {
                (low.min(h), high.max(h))
            });
        if low > high {
            return (self.config.y_min, self.config.y_max);
        }
        let pad = if high > low {
            (high - low) * PLOT_PADDING
        } else {
            low.abs().max(1.0) * PLOT_PADDING
        };
        (low - pad, high + pad)
    }

    /// Every whole trajectory as a polyline, with lenses as dashed vertical lines.
    /// The y axis is fitted to the data.
    pub fn ray_plot(&self, trajectories: &[Trajectory], lenses: &LensSystem) -> Plot {
        let mut plot = self.ray_canvas(lenses, self.fitted_y_range(trajectories));
        for trajectory in trajectories {
            plot.draw_polyline(trajectory.samples(), RAY_COLOR);
        }
        plot
    }

    pub fn write_ray_plot(
        &self,
        trajectories: &[Trajectory],
        lenses: &LensSystem,
        directory: &Path,
    ) -> Result<PathBuf> {
        fs::create_dir_all(directory)?;
        let path = directory.join("ray_tracing.png");
        self.ray_plot(trajectories, lenses).save(&path)?;
        info!("Saved ray tracing plot: {}", path.display());
        Ok(path)
    }

    /// Number of samples shown in each animation frame.
    /// The last frame always shows the full trajectories.
    pub fn frame_ends(&self, num_samples: usize) -> Vec<usize> {
        let frames = self.config.frames.min(num_samples).max(1);
        (1..=frames)
            .map(|k| (k * num_samples).div_ceil(frames))
            .collect()
    }

    /// Looping GIF where each frame extends every trajectory a little further.
    /// Frames share the configured y range.
    pub fn write_ray_animation(
        &self,
        trajectories: &[Trajectory],
        lenses: &LensSystem,
        directory: &Path,
    ) -> Result<PathBuf> {
        fs::create_dir_all(directory)?;
        let path = directory.join("ray_propagation.gif");
        let file =
            File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;

        let canvas = self.ray_canvas(lenses, (self.config.y_min, self.config.y_max));
        let num_samples = trajectories.iter().map(Trajectory::len).max().unwrap_or(0);
        let frame_ends = self.frame_ends(num_samples);
        debug!("Encoding {} animation frames", frame_ends.len());

        let mut encoder = GifEncoder::new(BufWriter::new(file));
        encoder.set_repeat(Repeat::Infinite)?;
        for end in frame_ends {
            let mut plot = canvas.clone();
            for trajectory in trajectories {
                plot.draw_polyline(trajectory.truncated(end), RAY_COLOR);
            }
            let rgba = DynamicImage::ImageRgb8(plot.image).into_rgba8();
            let delay = Delay::from_numer_denom_ms(self.config.frame_delay_ms, 1);
            encoder.encode_frame(Frame::from_parts(rgba, 0, 0, delay))?;
        }
        drop(encoder);

        info!("Saved ray propagation animation: {}", path.display());
        Ok(path)
    }

    /// Real parts of the input and output Jones vectors as arrows in the Ex/Ey plane.
    pub fn polarization_plot(&self, polarization: &Polarization) -> Plot {
        let size = POLARIZATION_PLOT_SIZE;
        let mut plot = Plot::new(size, size, (-1.0, 1.0), (-1.0, 1.0));
        plot.draw_grid();
        for (field, color) in [
            (&polarization.input, INPUT_COLOR),
            (&polarization.output, OUTPUT_COLOR),
        ] {
            plot.draw_arrow((0.0, 0.0), (field[0].re as f64, field[1].re as f64), color);
        }
        plot
    }

    pub fn write_polarization_plot(
        &self,
        polarization: &Polarization,
        directory: &Path,
    ) -> Result<PathBuf> {
        fs::create_dir_all(directory)?;
        let path = directory.join("polarization_jones.png");
        self.polarization_plot(polarization).save(&path)?;
        info!("Saved polarization plot: {}", path.display());
        Ok(path)
    }
}
