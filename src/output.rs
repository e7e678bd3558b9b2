//! Plain-text and JSON output of simulation results.
//!
//! Every writer takes the destination directory explicitly, creates it if
//! needed, and flushes its buffered writer before returning the path of the
//! written file.

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::{
    jones::{self, JonesVector, Polarization, Stokes},
    ray::{Propagation, Trajectory},
    settings::Settings,
};

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{
        grid::SamplingGrid,
        jones::{Element, ElementKind},
        lens::LensSystem,
        ray::RayBundle,
        tracer::RayTracer,
    };

    #[test]
    fn trajectories_file_has_one_line_per_sample() {
        let dir = tempfile::tempdir().unwrap();
        let tracer = RayTracer::new(
            LensSystem::from_pairs(&[(5.0, 2.0)]).unwrap(),
            SamplingGrid::new(vec![0.0, 5.0, 10.0, 15.0]).unwrap(),
        );
        let trajectories = tracer.trace(&RayBundle::new(vec![2.0, 0.0]).unwrap());

        let path = write_trajectories(&trajectories, dir.path()).unwrap();
        let contents = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = contents.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0].split_whitespace().collect::<Vec<_>>(), ["0", "0", "2"]);
        assert!(lines[7].starts_with("1 15 "));
    }

    #[test]
    fn polarization_file_written() {
        let dir = tempfile::tempdir().unwrap();
        let polarization = Polarization::evaluate(
            jones::horizontal(),
            vec![Element::new(ElementKind::Polarizer, 90.0)],
        );
        let path = write_polarization(&polarization, &dir.path().join("nested")).unwrap();
        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.contains("input"));
        assert!(contents.contains("output"));
        assert!(contents.contains("POL(90°)"));
    }

    #[test]
    fn vector_components_interleave_re_im() {
        let v = JonesVector::new(
            num_complex::Complex32::new(1.0, 2.0),
            num_complex::Complex32::new(3.0, 4.0),
        );
        assert_eq!(components(&v), [1.0, 2.0, 3.0, 4.0]);
    }
}

/// Run metadata written alongside the data files.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub timestamp: String,
    pub version: String,
    pub num_rays: usize,
    pub num_samples: usize,
    pub num_lenses: usize,
    pub propagation: Propagation,
    pub final_heights: Vec<f64>,
    pub polarization: Option<PolarizationSummary>,
}

#[derive(Debug, Serialize)]
pub struct PolarizationSummary {
    pub input: [f32; 4], // re(Ex), im(Ex), re(Ey), im(Ey)
    pub output: [f32; 4],
    pub stokes_input: Stokes,
    pub stokes_output: Stokes,
    pub transmission: f32,
}

impl PolarizationSummary {
    pub fn new(polarization: &Polarization) -> Self {
        Self {
            input: components(&polarization.input),
            output: components(&polarization.output),
            stokes_input: Stokes::from_jones(&polarization.input),
            stokes_output: Stokes::from_jones(&polarization.output),
            transmission: polarization.transmission(),
        }
    }
}

fn components(v: &JonesVector) -> [f32; 4] {
    [v[0].re, v[0].im, v[1].re, v[1].im]
}

fn create_file(directory: &Path, name: &str) -> Result<(PathBuf, BufWriter<File>)> {
    fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create directory {}", directory.display()))?;
    let path = directory.join(name);
    let file =
        File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok((path, BufWriter::new(file)))
}

/// Writes every trajectory sample as `ray position height`, one per line.
pub fn write_trajectories(trajectories: &[Trajectory], directory: &Path) -> Result<PathBuf> {
    let (path, mut writer) = create_file(directory, "trajectories.dat")?;

    writeln!(writer, "# ray position height")?;
    for (index, trajectory) in trajectories.iter().enumerate() {
        for (position, height) in trajectory.samples() {
            writeln!(writer, "{} {} {}", index, position, height)?;
        }
    }
    writer.flush()?;

    info!("Wrote {}", path.display());
    Ok(path)
}

/// Writes the input and output Jones vectors with their Stokes parameters.
pub fn write_polarization(polarization: &Polarization, directory: &Path) -> Result<PathBuf> {
    let (path, mut writer) = create_file(directory, "polarization.dat")?;

    write!(writer, "# elements:")?;
    for element in &polarization.elements {
        write!(writer, " {}", element)?;
    }
    writeln!(writer)?;
    writeln!(writer, "# state re(Ex) im(Ex) re(Ey) im(Ey) S0 S1 S2 S3")?;
    for (label, field) in [("input", &polarization.input), ("output", &polarization.output)] {
        let stokes = Stokes::from_jones(field);
        write!(writer, "{}", label)?;
        for value in components(field) {
            write!(writer, " {}", value)?;
        }
        writeln!(
            writer,
            " {} {} {} {}",
            stokes.s0, stokes.s1, stokes.s2, stokes.s3
        )?;
    }
    writeln!(
        writer,
        "# intensity in {} out {}",
        jones::intensity(&polarization.input),
        jones::intensity(&polarization.output)
    )?;
    writer.flush()?;

    info!("Wrote {}", path.display());
    Ok(path)
}

pub fn write_summary(summary: &Summary, directory: &Path) -> Result<PathBuf> {
    let (path, mut writer) = create_file(directory, "summary.json")?;
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writeln!(writer)?;
    writer.flush()?;

    info!("Wrote {}", path.display());
    Ok(path)
}

/// Writes the resolved settings so a run can be reproduced with `--config`.
pub fn write_settings(settings: &Settings, directory: &Path) -> Result<PathBuf> {
    let (path, mut writer) = create_file(directory, "settings.toml")?;
    let contents = toml::to_string_pretty(settings).context("Failed to serialize settings")?;
    writer.write_all(contents.as_bytes())?;
    writer.flush()?;

    info!("Wrote {}", path.display());
    Ok(path)
}
