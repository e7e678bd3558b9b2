//! Interactive on-screen playback of traced rays.
//!
//! Only built with the `visualization` feature. The viewer maps trajectory
//! coordinates to screen coordinates every frame, so the window can be
//! resized freely, and reveals the trajectories sample by sample.

use macroquad::prelude::*;

use crate::{lens::LensSystem, ray::Trajectory};

const MARGIN: f32 = 40.0; // screen margin in pixels
const RAY_COLOR: Color = Color::new(0.12, 0.47, 0.71, 1.0);
const LENS_COLOR: Color = Color::new(0.84, 0.15, 0.16, 1.0);

/// Mapping from trajectory coordinates to the current screen.
#[derive(Debug, Clone, Copy)]
pub struct ViewPort {
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl ViewPort {
    pub fn new(x_range: (f64, f64), y_range: (f64, f64)) -> Self {
        Self { x_range, y_range }
    }

    /// Trajectory coordinates to screen pixels. The y axis points up.
    pub fn to_screen(&self, x: f64, y: f64) -> (f32, f32) {
        let width = screen_width() - 2.0 * MARGIN;
        let height = screen_height() - 2.0 * MARGIN;
        let (x0, x1) = self.x_range;
        let (y0, y1) = self.y_range;
        (
            MARGIN + ((x - x0) / (x1 - x0)) as f32 * width,
            MARGIN + ((y1 - y) / (y1 - y0)) as f32 * height,
        )
    }
}

/// Draws the first `upto` samples of every trajectory.
pub fn draw_trajectories(trajectories: &[Trajectory], upto: usize, view: &ViewPort) {
    for trajectory in trajectories {
        let points = trajectory.truncated(upto);
        for pair in points.windows(2) {
            let (x1, y1) = view.to_screen(pair[0].0, pair[0].1);
            let (x2, y2) = view.to_screen(pair[1].0, pair[1].1);
            if [x1, y1, x2, y2].iter().all(|v| v.is_finite()) {
                draw_line(x1, y1, x2, y2, 1.5, RAY_COLOR);
            }
        }
    }
}

/// Draws each lens as a vertical line across the view.
pub fn draw_lenses(lenses: &LensSystem, view: &ViewPort) {
    let (y0, y1) = view.y_range;
    for lens in lenses {
        let (x, top) = view.to_screen(lens.position, y1);
        let (_, bottom) = view.to_screen(lens.position, y0);
        draw_line(x, top, x, bottom, 1.0, LENS_COLOR);
    }
}

/// Frame around the plot area and the optical axis.
pub fn draw_axes(view: &ViewPort) {
    let (x0, x1) = view.x_range;
    let (y0, y1) = view.y_range;
    let (left, top) = view.to_screen(x0, y1);
    let (right, bottom) = view.to_screen(x1, y0);
    draw_rectangle_lines(left, top, right - left, bottom - top, 1.0, DARKGRAY);
    if y0 < 0.0 && 0.0 < y1 {
        let (_, axis) = view.to_screen(x0, 0.0);
        draw_line(left, axis, right, axis, 1.0, GRAY);
    }
}
