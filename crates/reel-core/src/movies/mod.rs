//! # Movies
//!
//! Turns a `MovieConfig` into a ready-to-run clip sequence.
//!
//! ## Startup
//! 1. `MovieResources::load` fetches every CSV in one concurrent batch
//!    (camera, rays, scalar tables). Any failure aborts startup.
//! 2. Keyframe meshes load afterwards, in order. Failures are skipped.
//! 3. The sky panorama loads last; without it the movie plays on black.
//! 4. `build_movie` sets up the sky and static scenery, then dispatches on
//!    the clip plan to build the clips.

mod deforming_mesh;
mod lockstep;
mod photon_shell;
mod sequential;

use crate::assets::{fetch_tables, load_meshes, load_sky, surviving_meshes, AssetLoader};
use crate::config::{ClipPlan, MovieConfig};
use crate::driver::CameraMotion;
use crate::errors::{ReelError, ReelResult};
use crate::mesh::Mesh;
use crate::scene::{Element, Lifetime, Material, NodeId, Rgb, SpherePatch};
use crate::sequencer::ClipSequencer;
use crate::sky::SkyTexture;
use crate::stage::Stage;
use crate::tracker::TrackerStyle;
use crate::trajectory::{CsvTable, Trajectory};
use glam::Vec3;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything a movie reads, fully resident before the first tick.
#[derive(Clone, Debug, Default)]
pub struct MovieResources {
    pub camera: Option<Arc<Trajectory>>,
    pub rays: Vec<Arc<Trajectory>>,
    pub spin_values: Vec<f64>,
    /// Keyframes that loaded, with their index in the request.
    pub meshes: Vec<(usize, Arc<Mesh>)>,
    pub sky: Option<Arc<SkyTexture>>,
}

impl MovieResources {
    pub fn load(loader: &dyn AssetLoader, config: &MovieConfig) -> ReelResult<Self> {
        let mut paths: Vec<String> = Vec::new();
        paths.extend(config.camera_path.iter().cloned());
        paths.extend(config.ray_paths.iter().cloned());
        paths.extend(config.spin_values_path.iter().cloned());

        let mut tables = fetch_tables(loader, &paths)?.into_iter();

        let camera = match config.camera_path {
            Some(_) => tables
                .next()
                .map(|t| Trajectory::from_table(&t).map(Arc::new))
                .transpose()?,
            None => None,
        };
        let rays = tables
            .by_ref()
            .take(config.ray_paths.len())
            .map(|t| Trajectory::from_table(&t).map(Arc::new))
            .collect::<ReelResult<Vec<_>>>()?;
        let spin_values = match tables.next() {
            Some(table) => parse_scalars(&table)?,
            None => Vec::new(),
        };

        let meshes = surviving_meshes(&config.mesh_paths, load_meshes(loader, &config.mesh_paths));

        let sky = config
            .sky_path
            .as_deref()
            .and_then(|path| match load_sky(loader, path) {
                Ok(sky) => Some(Arc::new(sky)),
                Err(e) => {
                    warn!("Playing without sky: {}", e);
                    None
                }
            });

        info!(
            "Resources ready: {} rays, {} keyframes, {} spin values",
            rays.len(),
            meshes.len(),
            spin_values.len()
        );
        Ok(Self {
            camera,
            rays,
            spin_values,
            meshes,
            sky,
        })
    }
}

/// First column of every row, as numbers.
fn parse_scalars(table: &CsvTable) -> ReelResult<Vec<f64>> {
    table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let field = row.first().map(String::as_str).unwrap_or("");
            field.parse::<f64>().map_err(|e| ReelError::Parse {
                path: table.source.clone(),
                line: idx + 1,
                message: format!("'{}': {}", field, e),
            })
        })
        .collect()
}

/// A movie ready for the render driver.
pub struct Movie {
    pub sequencer: ClipSequencer,
    pub stage: Stage,
    pub camera_motion: CameraMotion,
}

pub fn build_movie(config: &MovieConfig, resources: MovieResources, fps: u32) -> ReelResult<Movie> {
    let mut stage = Stage::new(fps);
    stage.camera.far = config.camera_far;
    stage.camera.position = config.camera_position;
    stage.camera.look_at(config.camera_target);

    if let Some(sky) = &resources.sky {
        stage.spawn(
            Element::Sky(Arc::clone(sky)),
            Material::solid(Rgb::WHITE),
            Vec3::ZERO,
            Lifetime::Static,
        );
    }

    let (clips, camera_motion) = match &config.plan {
        ClipPlan::Lockstep { step } => lockstep::build(config, &resources, &mut stage, *step)?,
        ClipPlan::Sequential { step } => sequential::build(config, &resources, &mut stage, *step)?,
        ClipPlan::PhotonShell(plan) => photon_shell::build(config, plan, &resources, &mut stage)?,
        ClipPlan::KeyframeCycle {
            frames_per_keyframe,
        } => deforming_mesh::build(config, &resources, &mut stage, *frames_per_keyframe)?,
    };

    let sequencer = ClipSequencer::new(clips)?;
    info!(
        "Built {:?} movie: clips [{}]",
        config.variant,
        sequencer.clip_names().join(", ")
    );
    Ok(Movie {
        sequencer,
        stage,
        camera_motion,
    })
}

/// Camera motion for movies with a camera path.
fn follow_camera(config: &MovieConfig, resources: &MovieResources, step: usize) -> ReelResult<CameraMotion> {
    let trajectory = resources.camera.clone().ok_or_else(|| {
        ReelError::InvalidConfiguration(format!("{:?} movie needs a camera trajectory", config.variant))
    })?;
    Ok(CameraMotion::Follow {
        trajectory,
        target: config.camera_target,
        step,
    })
}

fn ray_style(config: &MovieConfig, color: Rgb) -> TrackerStyle {
    TrackerStyle {
        marker_radius: config.scenery.ray_marker_radius,
        marker: Material::solid(color),
        trail: Material::line(color, 3.0),
        policy: config.trail_policy,
        capacity: config.trail_capacity,
    }
}

/// One style per ray, cycling through the palette.
fn ray_styles(config: &MovieConfig, count: usize) -> Vec<TrackerStyle> {
    (0..count)
        .map(|i| {
            let color = config
                .palette
                .get(i % config.palette.len().max(1))
                .copied()
                .unwrap_or(Rgb::WHITE);
            ray_style(config, color)
        })
        .collect()
}

const AXIS_COLOR: Rgb = Rgb::from_hex(0xE1E1E1);
/// Drawn slightly off black so the wireframe shows against the background.
const HORIZON_COLOR: Rgb = Rgb::from_hex(0x303030);

fn add_black_hole(stage: &mut Stage, radius: f32) -> Option<NodeId> {
    (radius > 0.0).then(|| {
        stage.spawn(
            Element::Sphere(SpherePatch::full(radius)),
            Material::line(HORIZON_COLOR, 1.0),
            Vec3::ZERO,
            Lifetime::Static,
        )
    })
}

fn add_spin_axis(stage: &mut Stage, half_length: f32) -> Option<NodeId> {
    (half_length > 0.0).then(|| {
        stage.spawn(
            Element::Polyline(vec![Vec3::Z * half_length, Vec3::Z * -half_length]),
            Material::line(AXIS_COLOR, 3.0),
            Vec3::ZERO,
            Lifetime::Static,
        )
    })
}

/// Black hole and spin axis; returns the black hole node if one was added.
fn add_scenery(config: &MovieConfig, stage: &mut Stage) -> Option<NodeId> {
    let black_hole = add_black_hole(stage, config.scenery.black_hole_radius);
    add_spin_axis(stage, config.scenery.spin_axis_half_length);
    black_hole
}
