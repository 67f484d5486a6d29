//! # Photon Sphere to Photon Shell
//!
//! Eleven clips:
//! 0. Schwarzschild rays, stepped until the data runs out, camera orbiting.
//! 1. The photon sphere pulses in.
//! 2. The camera descends to the equatorial plane while the sphere contracts
//!    to a thin cross-section.
//! 3. Shell keyframes expand with the spin; the horizon shrinks to match.
//! 4. The camera climbs back up.
//! 5. to 10. For each shell cross-section: its rays, then a pulse of the
//!    section itself. Rays of earlier sections keep moving.
//!
//! Cross-section clips share state (the azimuth facing the camera and the
//! per-section trackers) through `ShellState`, which the first clip resets
//! at the start of every loop.

use super::{add_scenery, ray_style, MovieResources};
use crate::animation::{linear_ramp, outer_horizon_radius, pulse_opacity, PulseConfig};
use crate::clip::{check_budget, Clip, FrameBudget};
use crate::config::{CrossSection, MovieConfig, PhotonShellPlan};
use crate::driver::CameraMotion;
use crate::errors::{ReelError, ReelResult};
use crate::mesh::Mesh;
use crate::playback::TrajectoryPlayback;
use crate::scene::{Element, Lifetime, Material, NodeId, Rgb, SpherePatch};
use crate::stage::{format_readout, Stage};
use crate::tracker::{ObjectTracker, TrackerStyle};
use crate::trajectory::Trajectory;
use glam::Vec3;
use keyframe::AnimationSequence;
use std::cell::RefCell;
use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, warn};

const INTRO_CLIP: usize = 0;
const ARC_POINTS: usize = 256;

struct SectionState {
    trackers: Vec<ObjectTracker>,
    cursor: usize,
}

#[derive(Default)]
struct ShellState {
    /// Azimuth of the cross-section plane, fixed when the shell appears.
    angular_offset: f32,
    sections: Vec<SectionState>,
}

/// Shared by the clips of one photon-shell movie.
type SharedShell = Rc<RefCell<ShellState>>;

/// Steps the rays of sections `0..=upto` by one sample.
fn advance_sections(stage: &mut Stage, shared: &SharedShell, upto: usize) -> ReelResult<()> {
    let mut state = shared.borrow_mut();
    for section in state.sections.iter_mut().take(upto + 1) {
        for tracker in &mut section.trackers {
            tracker.advance(stage, section.cursor)?;
        }
        section.cursor += 1;
    }
    Ok(())
}

fn set_sphere(stage: &mut Stage, id: NodeId, patch: SpherePatch) {
    if let Some(node) = stage.scene.get_node_mut(id) {
        node.element = Element::Sphere(patch);
    }
}

/// Ticks during which the rays of `section` move: from its own ray clip to
/// the end of the plan.
fn section_ticks(plan: &PhotonShellPlan, section: usize) -> usize {
    plan.sections[section..]
        .iter()
        .map(|s| plan.section_ray_frames + s.pulse_frames)
        .sum()
}

fn validate(plan: &PhotonShellPlan) -> ReelResult<()> {
    let rates = [
        ("descent rate", plan.descent_rate),
        ("contraction rate", plan.contraction_rate),
        ("ascent rate", plan.ascent_rate),
    ];
    for (what, rate) in rates {
        if !(rate > 0.0) {
            return Err(ReelError::InvalidConfiguration(format!(
                "photon shell {} must be positive, got {}",
                what, rate
            )));
        }
    }
    if plan.keyframe_hold == 0 || plan.sphere_pulse_frames == 0 || plan.section_ray_frames == 0 {
        return Err(ReelError::InvalidConfiguration(
            "photon shell frame counts must be positive".to_string(),
        ));
    }
    if plan.sections.iter().any(|s| s.pulse_frames == 0) {
        return Err(ReelError::InvalidConfiguration(
            "cross-section pulse frames must be positive".to_string(),
        ));
    }
    Ok(())
}

pub(super) fn build(
    config: &MovieConfig,
    plan: &PhotonShellPlan,
    resources: &MovieResources,
    stage: &mut Stage,
) -> ReelResult<(Vec<Box<dyn Clip>>, CameraMotion)> {
    validate(plan)?;

    let expected = plan.intro_rays + plan.rays_per_section * plan.sections.len();
    if resources.rays.len() != expected {
        return Err(ReelError::InvalidConfiguration(format!(
            "photon shell movie expects {} rays, got {}",
            expected,
            resources.rays.len()
        )));
    }

    let camera_start = resources
        .camera
        .as_ref()
        .ok_or_else(|| ReelError::InvalidConfiguration("photon shell movie needs a camera path".to_string()))?
        .position(0)?;
    stage.camera.position = camera_start;
    stage.camera.look_at(config.camera_target);

    let black_hole = add_scenery(config, stage);
    let shared = SharedShell::default();
    let intro_color = config.palette.first().copied().unwrap_or(Rgb::WHITE);

    let (intro, sections) = resources.rays.split_at(plan.intro_rays);
    let intro_styles = vec![ray_style(config, intro_color); intro.len()];
    let intro_playback =
        TrajectoryPlayback::until_exhausted("schwarzschild-rays", intro.to_vec(), intro_styles, plan.intro_step)?
            .orbiting(plan.orbit_rate)
            .persist_until_loop();

    let mut clips: Vec<Box<dyn Clip>> = vec![
        Box::new(SchwarzschildRays {
            playback: intro_playback,
            shared: shared.clone(),
            camera_start,
            camera_target: config.camera_target,
            black_hole,
            black_hole_radius: plan.initial_black_hole_radius,
        }),
        Box::new(PulsingSphere {
            radius: plan.photon_sphere_radius,
            frames: plan.sphere_pulse_frames,
            orbit_rate: plan.orbit_rate,
            pulse: PulseConfig::new(1.0),
            node: None,
            started: 0.0,
        }),
        Box::new(SphereContraction {
            radius: plan.photon_sphere_radius,
            descent_rate: plan.descent_rate,
            descent_floor: plan.descent_floor,
            contraction_rate: plan.contraction_rate,
            contraction_floor: plan.contraction_floor,
            phi_length: SphereContraction::ramp(plan.contraction_rate),
            ticks: 0,
            halves: None,
        }),
        Box::new(ShellExpansion {
            keyframes: resources.meshes.clone(),
            spins: resources.spin_values.clone(),
            hold: plan.keyframe_hold,
            spin_limit: plan.spin_limit,
            black_hole,
            shared: shared.clone(),
            node: None,
            rotation: 0.0,
            done: false,
        }),
        Box::new(CameraAscent {
            rate: plan.ascent_rate,
            theta_limit: plan.ascent_theta,
        }),
    ];

    for (i, (cross, rays)) in plan
        .sections
        .iter()
        .zip(sections.chunks(plan.rays_per_section.max(1)))
        .enumerate()
    {
        let rays_name = format!("section-{}-rays", i);
        let min_len = rays.iter().map(|t| t.len()).min().unwrap_or(0);
        check_budget(&rays_name, section_ticks(plan, i), 1, min_len)?;

        clips.push(Box::new(SectionRays {
            name: rays_name,
            section: i,
            frames: plan.section_ray_frames,
            trajectories: rays.to_vec(),
            style: ray_style(config, cross.color),
            orbit_rate: plan.orbit_rate,
            shared: shared.clone(),
        }));
        clips.push(Box::new(SectionPulse {
            name: format!("section-{}-pulse", i),
            section: i,
            cross: *cross,
            orbit_rate: plan.orbit_rate,
            shared: shared.clone(),
            sphere: None,
            arcs: Vec::new(),
            started: 0.0,
        }));
    }

    Ok((clips, CameraMotion::ClipDriven))
}

struct SchwarzschildRays {
    playback: TrajectoryPlayback,
    shared: SharedShell,
    camera_start: Vec3,
    camera_target: Vec3,
    black_hole: Option<NodeId>,
    black_hole_radius: f32,
}

impl Clip for SchwarzschildRays {
    fn name(&self) -> &str {
        self.playback.name()
    }

    fn budget(&self) -> FrameBudget {
        self.playback.budget()
    }

    fn on_enter(&mut self, stage: &mut Stage) -> ReelResult<()> {
        *self.shared.borrow_mut() = ShellState::default();
        stage.camera.position = self.camera_start;
        stage.camera.look_at(self.camera_target);
        if let Some(id) = self.black_hole {
            set_sphere(stage, id, SpherePatch::full(self.black_hole_radius));
        }
        stage.hud.set("spin", format_readout(0.0, 2));
        self.playback.on_enter(stage)
    }

    fn on_tick(&mut self, stage: &mut Stage, frame: usize) -> ReelResult<()> {
        self.playback.on_tick(stage, frame)
    }

    fn is_finished(&self, stage: &Stage, frame: usize) -> bool {
        self.playback.is_finished(stage, frame)
    }

    fn on_exit(&mut self, stage: &mut Stage) {
        self.playback.on_exit(stage)
    }
}

struct PulsingSphere {
    radius: f32,
    frames: usize,
    orbit_rate: f32,
    pulse: PulseConfig,
    node: Option<NodeId>,
    started: f64,
}

impl Clip for PulsingSphere {
    fn name(&self) -> &str {
        "photon-sphere-pulse"
    }

    fn budget(&self) -> FrameBudget {
        FrameBudget::Fixed(self.frames)
    }

    fn on_enter(&mut self, stage: &mut Stage) -> ReelResult<()> {
        self.started = stage.time();
        self.node = Some(stage.spawn(
            Element::Sphere(SpherePatch::full(self.radius)),
            Material::line(Rgb::WHITE, 1.0),
            Vec3::ZERO,
            Lifetime::Clip,
        ));
        Ok(())
    }

    fn on_tick(&mut self, stage: &mut Stage, _frame: usize) -> ReelResult<()> {
        stage.camera.orbit(self.orbit_rate);
        if let Some(id) = self.node {
            let opacity = pulse_opacity(stage.time() - self.started, &self.pulse);
            stage.scene.set_opacity(id, opacity);
        }
        Ok(())
    }

    fn on_exit(&mut self, _stage: &mut Stage) {
        self.node = None;
    }
}

struct SphereContraction {
    radius: f32,
    descent_rate: f32,
    descent_floor: f32,
    contraction_rate: f32,
    contraction_floor: f32,
    /// Azimuthal extent of each wedge, by tick.
    phi_length: AnimationSequence<f32>,
    ticks: usize,
    halves: Option<[NodeId; 2]>,
}

impl SphereContraction {
    fn ramp(contraction_rate: f32) -> AnimationSequence<f32> {
        linear_ramp(PI, 0.0, (PI / contraction_rate) as f64)
    }

    /// Two opposite wedges of the sphere, edge-on to the camera.
    fn wedges(&self, stage: &Stage) -> [SpherePatch; 2] {
        let alpha = stage.camera.spherical().phi - FRAC_PI_2;
        let half = self.phi_length.now() / 2.0;
        [alpha, alpha + PI].map(|center| SpherePatch {
            radius: self.radius,
            theta_start: 0.0,
            theta_end: PI,
            phi_start: center - half,
            phi_end: center + half,
        })
    }
}

impl Clip for SphereContraction {
    fn name(&self) -> &str {
        "sphere-contraction"
    }

    fn budget(&self) -> FrameBudget {
        FrameBudget::OpenEnded
    }

    fn on_enter(&mut self, stage: &mut Stage) -> ReelResult<()> {
        let removed = stage.teardown_spawned_by(INTRO_CLIP);
        debug!("Removed {} intro nodes", removed);

        self.phi_length = Self::ramp(self.contraction_rate);
        self.ticks = 0;

        let material = Material::line(Rgb::WHITE, 1.0);
        let [left, right] = self.wedges(stage);
        self.halves = Some([
            stage.spawn(Element::Sphere(left), material, Vec3::ZERO, Lifetime::Clip),
            stage.spawn(Element::Sphere(right), material, Vec3::ZERO, Lifetime::Clip),
        ]);
        Ok(())
    }

    fn on_tick(&mut self, stage: &mut Stage, _frame: usize) -> ReelResult<()> {
        if stage.camera.position.z >= self.descent_floor {
            stage.camera.raise(-self.descent_rate);
        }

        if self.phi_length.now() >= self.contraction_floor {
            self.ticks += 1;
            self.phi_length.advance_to(self.ticks as f64);
            if let Some(ids) = self.halves {
                let patches = self.wedges(stage);
                for (id, patch) in ids.into_iter().zip(patches) {
                    set_sphere(stage, id, patch);
                }
            }
        }
        Ok(())
    }

    fn is_finished(&self, stage: &Stage, _frame: usize) -> bool {
        stage.camera.position.z < self.descent_floor
            && self.phi_length.now() < self.contraction_floor
    }

    fn on_exit(&mut self, _stage: &mut Stage) {
        self.halves = None;
    }
}

struct ShellExpansion {
    keyframes: Vec<(usize, Arc<Mesh>)>,
    spins: Vec<f64>,
    hold: usize,
    spin_limit: f64,
    black_hole: Option<NodeId>,
    shared: SharedShell,
    node: Option<NodeId>,
    rotation: f32,
    done: bool,
}

impl ShellExpansion {
    /// Keyframe and its spin for `frame`, or `None` once either runs out.
    fn keyframe_at(&self, frame: usize) -> Option<(Arc<Mesh>, f64)> {
        let (request_idx, mesh) = self.keyframes.get(frame / self.hold)?;
        let spin = self.spins.get(*request_idx)?.abs();
        Some((mesh.clone(), spin))
    }
}

impl Clip for ShellExpansion {
    fn name(&self) -> &str {
        "shell-expansion"
    }

    fn budget(&self) -> FrameBudget {
        FrameBudget::OpenEnded
    }

    fn on_enter(&mut self, stage: &mut Stage) -> ReelResult<()> {
        // Turn the shell so its cross-section faces the camera.
        self.rotation = stage.camera.spherical().phi + FRAC_PI_2;
        self.shared.borrow_mut().angular_offset = self.rotation;
        self.node = None;
        self.done = false;
        if self.keyframes.is_empty() {
            warn!("No shell keyframes loaded; skipping expansion");
        }
        Ok(())
    }

    fn on_tick(&mut self, stage: &mut Stage, frame: usize) -> ReelResult<()> {
        let Some((mesh, spin)) = self.keyframe_at(frame).filter(|(_, s)| *s <= self.spin_limit) else {
            self.done = true;
            return Ok(());
        };

        let element = Element::Mesh {
            mesh,
            rotation_z: self.rotation,
        };
        match self.node.and_then(|id| stage.scene.get_node_mut(id)) {
            Some(node) => node.element = element,
            None => {
                // Stays up behind the cross-section clips until the loop ends.
                self.node = Some(stage.spawn(
                    element,
                    Material::line(Rgb::WHITE, 1.0).with_opacity(0.5),
                    Vec3::ZERO,
                    Lifetime::Loop,
                ));
            }
        }

        if let Some(id) = self.black_hole {
            set_sphere(stage, id, SpherePatch::full(outer_horizon_radius(spin)));
        }
        stage.hud.set("spin", format_readout(spin, 2));
        Ok(())
    }

    fn is_finished(&self, _stage: &Stage, _frame: usize) -> bool {
        self.done
    }
}

struct CameraAscent {
    rate: f32,
    theta_limit: f32,
}

impl Clip for CameraAscent {
    fn name(&self) -> &str {
        "camera-ascent"
    }

    fn budget(&self) -> FrameBudget {
        FrameBudget::OpenEnded
    }

    fn on_enter(&mut self, _stage: &mut Stage) -> ReelResult<()> {
        Ok(())
    }

    fn on_tick(&mut self, stage: &mut Stage, _frame: usize) -> ReelResult<()> {
        stage.camera.raise(self.rate);
        Ok(())
    }

    fn is_finished(&self, stage: &Stage, _frame: usize) -> bool {
        stage.camera.spherical().theta < self.theta_limit
    }
}

struct SectionRays {
    name: String,
    section: usize,
    frames: usize,
    trajectories: Vec<Arc<Trajectory>>,
    style: TrackerStyle,
    orbit_rate: f32,
    shared: SharedShell,
}

impl Clip for SectionRays {
    fn name(&self) -> &str {
        &self.name
    }

    fn budget(&self) -> FrameBudget {
        FrameBudget::Fixed(self.frames)
    }

    fn on_enter(&mut self, stage: &mut Stage) -> ReelResult<()> {
        let trackers = self
            .trajectories
            .iter()
            .map(|t| ObjectTracker::spawn(stage, t.clone(), &self.style, Lifetime::Loop))
            .collect::<ReelResult<Vec<_>>>()?;

        let mut state = self.shared.borrow_mut();
        state.sections.truncate(self.section);
        state.sections.push(SectionState { trackers, cursor: 0 });
        Ok(())
    }

    fn on_tick(&mut self, stage: &mut Stage, _frame: usize) -> ReelResult<()> {
        stage.camera.orbit(self.orbit_rate);
        advance_sections(stage, &self.shared, self.section)
    }
}

struct SectionPulse {
    name: String,
    section: usize,
    cross: CrossSection,
    orbit_rate: f32,
    shared: SharedShell,
    sphere: Option<NodeId>,
    arcs: Vec<NodeId>,
    started: f64,
}

impl SectionPulse {
    /// Meridian arc of the cross-section at azimuth `phi`.
    fn arc(&self, phi: f32) -> Vec<Vec3> {
        let c = &self.cross;
        (0..=ARC_POINTS)
            .map(|i| {
                let theta = c.theta_minus + (c.theta_plus - c.theta_minus) * i as f32 / ARC_POINTS as f32;
                c.rcrit * Vec3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos())
            })
            .collect()
    }
}

impl Clip for SectionPulse {
    fn name(&self) -> &str {
        &self.name
    }

    fn budget(&self) -> FrameBudget {
        FrameBudget::Fixed(self.cross.pulse_frames)
    }

    fn on_enter(&mut self, stage: &mut Stage) -> ReelResult<()> {
        self.started = stage.time();
        let offset = self.shared.borrow().angular_offset;

        let color = self.cross.color;
        self.arcs = [offset, offset + PI]
            .into_iter()
            .map(|phi| {
                let points = self.arc(phi);
                stage.spawn(Element::Polyline(points), Material::line(color, 6.0), Vec3::ZERO, Lifetime::Loop)
            })
            .collect();

        let patch = SpherePatch {
            radius: self.cross.rcrit,
            theta_start: self.cross.theta_minus,
            theta_end: self.cross.theta_plus,
            phi_start: 0.0,
            phi_end: TAU,
        };
        self.sphere = Some(stage.spawn(
            Element::Sphere(patch),
            Material::line(color, 1.0),
            Vec3::ZERO,
            Lifetime::Loop,
        ));
        Ok(())
    }

    fn on_tick(&mut self, stage: &mut Stage, _frame: usize) -> ReelResult<()> {
        stage.camera.orbit(self.orbit_rate);

        let elapsed = stage.time() - self.started;
        if let Some(id) = self.sphere {
            stage.scene.set_opacity(id, pulse_opacity(elapsed, &PulseConfig::new(0.0)));
        }
        let arc_opacity = pulse_opacity(elapsed, &PulseConfig::new(0.5));
        for &id in &self.arcs {
            stage.scene.set_opacity(id, arc_opacity);
        }

        advance_sections(stage, &self.shared, self.section)
    }

    fn on_exit(&mut self, _stage: &mut Stage) {
        self.sphere = None;
        self.arcs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh() -> Arc<Mesh> {
        Arc::new(Mesh {
            vertices: vec![Vec3::ZERO, Vec3::X],
            edges: vec![(0, 1)],
        })
    }

    fn expansion(spins: Vec<f64>, keyframes: usize) -> ShellExpansion {
        ShellExpansion {
            keyframes: (0..keyframes).map(|i| (i, mesh())).collect(),
            spins,
            hold: 3,
            spin_limit: 0.5,
            black_hole: None,
            shared: SharedShell::default(),
            node: None,
            rotation: 0.0,
            done: false,
        }
    }

    fn run_open_ended(clip: &mut dyn Clip, stage: &mut Stage, cap: usize) -> usize {
        clip.on_enter(stage).unwrap();
        for frame in 0..cap {
            clip.on_tick(stage, frame).unwrap();
            if clip.is_finished(stage, frame) {
                return frame + 1;
            }
        }
        panic!("clip did not finish within {} ticks", cap);
    }

    #[test]
    fn section_ticks_cover_remaining_clips() {
        let plan = PhotonShellPlan::default();
        assert_eq!(section_ticks(&plan, 2), 400 + 1200);
        assert_eq!(section_ticks(&plan, 0), 3 * 400 + 200 + 200 + 1200);
    }

    #[test]
    fn expansion_stops_past_spin_limit() {
        let mut stage = Stage::new(60);
        let mut clip = expansion(vec![0.1, 0.3, 0.6, 0.7], 4);

        // Keyframes 0 and 1 are held for three ticks each; keyframe 2 exceeds the limit.
        assert_eq!(run_open_ended(&mut clip, &mut stage, 100), 7);
        assert_eq!(stage.hud.get("spin"), Some("  0.30"));
    }

    #[test]
    fn expansion_stops_when_keyframes_run_out() {
        let mut stage = Stage::new(60);
        let mut clip = expansion(vec![0.1, 0.2, 0.3], 2);
        assert_eq!(run_open_ended(&mut clip, &mut stage, 100), 7);
    }

    #[test]
    fn expansion_follows_dropped_keyframe_indices() {
        let mut stage = Stage::new(60);
        let mut clip = expansion(vec![0.1, 0.9, 0.2], 0);
        // Keyframe 1 failed to load, so the second survivor carries spin 0.2.
        clip.keyframes = vec![(0, mesh()), (2, mesh())];

        assert_eq!(run_open_ended(&mut clip, &mut stage, 100), 7);
        assert_eq!(stage.hud.get("spin"), Some("  0.20"));
    }

    #[test]
    fn contraction_ends_in_equatorial_plane() {
        let mut stage = Stage::new(60);
        stage.camera.position = Vec3::new(0.0, -40.0, 10.0);
        let mut clip = SphereContraction {
            radius: 30.0,
            descent_rate: 0.25,
            descent_floor: 0.25,
            contraction_rate: 0.025,
            contraction_floor: 0.02,
            phi_length: SphereContraction::ramp(0.025),
            ticks: 0,
            halves: None,
        };

        let ticks = run_open_ended(&mut clip, &mut stage, 1000);

        assert!(stage.camera.position.z < 0.25);
        assert!(clip.phi_length.now() < 0.02);
        // The contraction needs about pi / 0.025 ticks, more than the descent.
        assert!((125..=127).contains(&ticks), "ticks = {}", ticks);
    }

    #[test]
    fn ascent_stops_above_theta_limit() {
        let mut stage = Stage::new(60);
        stage.camera.position = Vec3::new(40.0, 0.0, 0.0);
        let mut clip = CameraAscent {
            rate: 0.25,
            theta_limit: PI / 3.0,
        };

        run_open_ended(&mut clip, &mut stage, 10_000);
        assert!(stage.camera.spherical().theta < PI / 3.0);
    }

    #[test]
    fn invalid_rates_are_rejected() {
        let plan = PhotonShellPlan {
            contraction_rate: 0.0,
            ..PhotonShellPlan::default()
        };
        assert!(validate(&plan).is_err());
        assert!(validate(&PhotonShellPlan::default()).is_ok());
    }
}
