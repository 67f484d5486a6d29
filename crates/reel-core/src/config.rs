//! # Configuration
//!
//! Two layers:
//! - `RuntimeConfig`: switches read once at startup (environment or CLI).
//! - `MovieConfig`: the immutable description of one movie variant, built
//!   from the strategy table in [`MovieConfig::for_variant`].

use crate::errors::{ReelError, ReelResult};
use crate::scene::Rgb;
use crate::trail::TrailPolicy;
use glam::Vec3;
use serde::Serialize;
use std::f32::consts::PI;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub capture_on: bool,
    pub capture_seconds: f64,
    /// Raw movie selector; resolved by [`MovieVariant::from_selector`].
    pub variant: i64,
    pub max_trail_points: usize,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub asset_root: PathBuf,
    pub output: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            capture_on: false,
            capture_seconds: 15.0,
            variant: 1,
            max_trail_points: 10_000,
            fps: 60,
            width: 1280,
            height: 720,
            asset_root: PathBuf::from("."),
            output: PathBuf::from("movie.webm"),
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> ReelResult<()> {
        if self.max_trail_points == 0 {
            return Err(ReelError::InvalidConfiguration(
                "max trail points must be positive".to_string(),
            ));
        }
        if self.capture_on && !(self.capture_seconds > 0.0 && self.capture_seconds.is_finite()) {
            return Err(ReelError::InvalidConfiguration(format!(
                "capture seconds must be positive, got {}",
                self.capture_seconds
            )));
        }
        if self.fps == 0 {
            return Err(ReelError::InvalidConfiguration("fps must be positive".to_string()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ReelError::InvalidConfiguration(format!(
                "frame size {}x{} is empty",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MovieVariant {
    Lockstep,
    SequentialCrossing,
    EmbeddingDiagram,
    PhotonShell,
    DeformingMesh,
}

impl MovieVariant {
    pub const ALL: [MovieVariant; 5] = [
        MovieVariant::Lockstep,
        MovieVariant::SequentialCrossing,
        MovieVariant::EmbeddingDiagram,
        MovieVariant::PhotonShell,
        MovieVariant::DeformingMesh,
    ];

    pub fn from_selector(selector: i64) -> ReelResult<Self> {
        match selector {
            1 => Ok(Self::Lockstep),
            2 => Ok(Self::SequentialCrossing),
            3 => Ok(Self::EmbeddingDiagram),
            4 => Ok(Self::PhotonShell),
            5 => Ok(Self::DeformingMesh),
            other => Err(ReelError::UnknownVariant(other)),
        }
    }

    pub fn selector(self) -> i64 {
        match self {
            Self::Lockstep => 1,
            Self::SequentialCrossing => 2,
            Self::EmbeddingDiagram => 3,
            Self::PhotonShell => 4,
            Self::DeformingMesh => 5,
        }
    }
}

/// Static scenery shared by the trajectory movies.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Scenery {
    pub black_hole_radius: f32,
    /// The spin axis runs from `-spin_axis_half_length` to
    /// `+spin_axis_half_length` along z.
    pub spin_axis_half_length: f32,
    pub ray_marker_radius: f32,
}

/// One cross-section of the photon shell.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct CrossSection {
    pub rcrit: f32,
    pub theta_minus: f32,
    pub theta_plus: f32,
    pub color: Rgb,
    pub pulse_frames: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct PhotonShellPlan {
    pub intro_rays: usize,
    pub intro_step: usize,
    /// Camera azimuth advance per tick while orbiting.
    pub orbit_rate: f32,
    pub photon_sphere_radius: f32,
    pub initial_black_hole_radius: f32,
    pub sphere_pulse_frames: usize,
    pub descent_rate: f32,
    pub descent_floor: f32,
    pub contraction_rate: f32,
    pub contraction_floor: f32,
    /// Ticks each shell keyframe stays on screen.
    pub keyframe_hold: usize,
    pub spin_limit: f64,
    pub ascent_rate: f32,
    pub ascent_theta: f32,
    pub rays_per_section: usize,
    pub section_ray_frames: usize,
    pub sections: Vec<CrossSection>,
}

impl Default for PhotonShellPlan {
    fn default() -> Self {
        Self {
            intro_rays: 20,
            intro_step: 5,
            orbit_rate: PI / 600.0,
            photon_sphere_radius: 30.0,
            initial_black_hole_radius: 20.0,
            sphere_pulse_frames: 100,
            descent_rate: 0.25,
            descent_floor: 0.25,
            contraction_rate: 0.025,
            contraction_floor: 0.02,
            keyframe_hold: 3,
            spin_limit: 0.5,
            ascent_rate: 0.25,
            ascent_theta: PI / 3.0,
            rays_per_section: 10,
            section_ray_frames: 400,
            sections: vec![
                CrossSection {
                    rcrit: 24.07,
                    theta_minus: 1.05,
                    theta_plus: 2.09,
                    color: Rgb::RED,
                    pulse_frames: 200,
                },
                CrossSection {
                    rcrit: 27.62,
                    theta_minus: 0.20,
                    theta_plus: 2.94,
                    color: Rgb::GREEN,
                    pulse_frames: 200,
                },
                CrossSection {
                    rcrit: 31.17,
                    theta_minus: 0.38,
                    theta_plus: 2.76,
                    color: Rgb::BLUE,
                    pulse_frames: 1200,
                },
            ],
        }
    }
}

/// How the clips of a movie are laid out.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClipPlan {
    /// Every ray and the camera stepped together in one clip.
    Lockstep { step: usize },
    /// Rays padded so each plays after the previous one finishes.
    Sequential { step: usize },
    PhotonShell(PhotonShellPlan),
    /// Keyframe meshes cycled, one every `frames_per_keyframe` ticks.
    KeyframeCycle { frames_per_keyframe: usize },
}

#[derive(Clone, Debug, Serialize)]
pub struct MovieConfig {
    pub variant: MovieVariant,
    /// Ray colors, in ray order.
    pub palette: Vec<Rgb>,
    pub trail_policy: TrailPolicy,
    pub trail_capacity: usize,
    pub scenery: Scenery,
    pub camera_path: Option<String>,
    /// Point the camera looks at.
    pub camera_target: Vec3,
    /// Fixed camera position for movies without a camera path.
    pub camera_position: Vec3,
    pub camera_far: f32,
    /// Star-field panorama; a movie still plays without it.
    pub sky_path: Option<String>,
    /// Fetched concurrently; any failure aborts startup.
    pub ray_paths: Vec<String>,
    pub spin_values_path: Option<String>,
    /// Loaded in order; failures are logged and skipped.
    pub mesh_paths: Vec<String>,
    pub plan: ClipPlan,
}

const SKY_TEXTURE: &str = "eso0932a.jpg";

fn numbered(prefix: &str, range: std::ops::RangeInclusive<usize>, suffix: &str) -> Vec<String> {
    range.map(|i| format!("{}{}{}", prefix, i, suffix)).collect()
}

impl MovieConfig {
    /// Strategy table: one entry per movie variant.
    pub fn for_variant(variant: MovieVariant, runtime: &RuntimeConfig) -> Self {
        let trail_capacity = runtime.max_trail_points;
        match variant {
            MovieVariant::Lockstep => Self {
                variant,
                palette: vec![Rgb::RED, Rgb::GREEN, Rgb::BLUE],
                trail_policy: TrailPolicy::Circular,
                trail_capacity,
                scenery: Scenery {
                    black_hole_radius: 13.0,
                    spin_axis_half_length: 20.0,
                    ray_marker_radius: 0.2,
                },
                camera_path: Some("cameraTrajectory.csv".to_string()),
                camera_target: Vec3::ZERO,
                camera_position: Vec3::ZERO,
                camera_far: 5000.0,
                sky_path: Some(SKY_TEXTURE.to_string()),
                ray_paths: numbered("ray", 1..=3, ".csv"),
                spin_values_path: None,
                mesh_paths: Vec::new(),
                plan: ClipPlan::Lockstep { step: 1 },
            },
            MovieVariant::SequentialCrossing => Self {
                variant,
                palette: vec![Rgb::WHITE, Rgb::from_hex(0x3F84E5), Rgb::from_hex(0xBAFF29)],
                trail_policy: TrailPolicy::Shift,
                trail_capacity,
                scenery: Scenery {
                    black_hole_radius: 10.4,
                    spin_axis_half_length: 15.0,
                    ray_marker_radius: 0.05,
                },
                camera_path: Some("trajectories/tau/cameraTrajectory.csv".to_string()),
                camera_target: Vec3::ZERO,
                camera_position: Vec3::ZERO,
                camera_far: 5000.0,
                sky_path: Some(SKY_TEXTURE.to_string()),
                ray_paths: numbered("trajectories/sequential-crossing-times/ray", 1..=3, ".csv"),
                spin_values_path: None,
                mesh_paths: Vec::new(),
                plan: ClipPlan::Sequential { step: 1 },
            },
            MovieVariant::EmbeddingDiagram => Self {
                variant,
                palette: vec![Rgb::from_hex(0x3E8914), Rgb::from_hex(0x17BEBB)],
                trail_policy: TrailPolicy::Shift,
                trail_capacity,
                scenery: Scenery {
                    black_hole_radius: 0.0,
                    spin_axis_half_length: 0.0,
                    ray_marker_radius: 0.01,
                },
                camera_path: Some("trajectories/embeddingDiagram/cameraTrajectory.csv".to_string()),
                camera_target: Vec3::new(0.0, 0.0, -10.0),
                camera_position: Vec3::new(0.0, -20.0, 10.0),
                camera_far: 1000.0,
                sky_path: None,
                ray_paths: numbered("trajectories/embeddingDiagram/ray", 1..=2, ".csv"),
                spin_values_path: None,
                mesh_paths: vec!["models/surface.obj".to_string()],
                plan: ClipPlan::Lockstep { step: 2 },
            },
            MovieVariant::PhotonShell => {
                let plan = PhotonShellPlan::default();
                let base = "trajectories/photon-sphere-to-photon-shell/";
                let mut ray_paths = Vec::new();
                for point in 1..=10 {
                    for angle in 1..=2 {
                        ray_paths.push(format!("{}scene1/ray-{}-{}.csv", base, point, angle));
                    }
                }
                for shell in ["inner", "middle", "outer"] {
                    ray_paths.extend(numbered(
                        &format!("{}{}-photon-shell-cross-section-trajectories/ray-", base, shell),
                        1..=plan.rays_per_section,
                        ".csv",
                    ));
                }

                Self {
                    variant,
                    palette: vec![Rgb::WHITE],
                    trail_policy: TrailPolicy::Shift,
                    trail_capacity,
                    scenery: Scenery {
                        black_hole_radius: plan.initial_black_hole_radius,
                        spin_axis_half_length: 15.0,
                        ray_marker_radius: 0.05,
                    },
                    camera_path: Some(format!("{}scene1/cameraTrajectory.csv", base)),
                    camera_target: Vec3::ZERO,
                    camera_position: Vec3::ZERO,
                    camera_far: 5000.0,
                    sky_path: Some(SKY_TEXTURE.to_string()),
                    ray_paths,
                    spin_values_path: Some("models/photonShellAnimation/spinValues.csv".to_string()),
                    mesh_paths: numbered(
                        "models/photonShellAnimation/photon-shell-keyframe-",
                        1..=230,
                        ".obj",
                    ),
                    plan: ClipPlan::PhotonShell(plan),
                }
            }
            MovieVariant::DeformingMesh => Self {
                variant,
                palette: vec![Rgb::GREEN],
                trail_policy: TrailPolicy::Shift,
                trail_capacity,
                scenery: Scenery {
                    black_hole_radius: 0.0,
                    spin_axis_half_length: 0.0,
                    ray_marker_radius: 0.0,
                },
                camera_path: None,
                camera_target: Vec3::ZERO,
                camera_position: Vec3::new(0.0, 5.0, 0.0),
                camera_far: 5000.0,
                sky_path: None,
                ray_paths: Vec::new(),
                spin_values_path: None,
                mesh_paths: numbered(
                    "models/photonShellAnimation/photon-shell-keyframe-",
                    1..=80,
                    ".obj",
                ),
                plan: ClipPlan::KeyframeCycle {
                    frames_per_keyframe: 5,
                },
            },
        }
    }

    /// Resolves the runtime selector and builds the matching config.
    pub fn from_runtime(runtime: &RuntimeConfig) -> ReelResult<Self> {
        let variant = MovieVariant::from_selector(runtime.variant)?;
        Ok(Self::for_variant(variant, runtime))
    }
}
