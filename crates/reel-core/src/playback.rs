//! # Trajectory Playback Clip
//!
//! The clip every movie is built around: a group of trajectories stepped in
//! lockstep, each with a marker and a trail.
//!
//! ## Termination
//! - **Fixed**: plays `budget` ticks reading `frame * step`. The budget is
//!   checked against the shortest trajectory when the clip is built.
//! - **Until exhausted**: open-ended, finishes on the tick after which the
//!   next read would run past the shortest trajectory (`ceil(len / step)`
//!   ticks in total).

use crate::clip::{check_budget, Clip, FrameBudget};
use crate::errors::{ReelError, ReelResult};
use crate::scene::Lifetime;
use crate::stage::Stage;
use crate::tracker::{ObjectTracker, TrackerStyle};
use crate::trajectory::Trajectory;
use std::sync::Arc;

pub struct TrajectoryPlayback {
    name: String,
    trajectories: Vec<Arc<Trajectory>>,
    styles: Vec<TrackerStyle>,
    step: usize,
    budget: FrameBudget,
    lifetime: Lifetime,
    orbit_per_tick: Option<f32>,
    trackers: Vec<ObjectTracker>,
}

impl TrajectoryPlayback {
    /// Fixed-length playback whose budget is derived from the shortest
    /// trajectory: `len / step` ticks.
    pub fn new(
        name: impl Into<String>,
        trajectories: Vec<Arc<Trajectory>>,
        styles: Vec<TrackerStyle>,
        step: usize,
    ) -> ReelResult<Self> {
        let name = name.into();
        let min_len = shortest(&name, &trajectories)?;
        if step == 0 {
            return Err(ReelError::InvalidConfiguration(format!(
                "clip '{}' has a zero trajectory step",
                name
            )));
        }
        let budget = FrameBudget::fixed(min_len / step).map_err(|_| ReelError::ClipBudget {
            clip: name.clone(),
            budget: 1,
            step,
            len: min_len,
        })?;
        Self::build(name, trajectories, styles, step, budget)
    }

    /// Fixed-length playback with an explicit budget.
    pub fn with_budget(
        name: impl Into<String>,
        trajectories: Vec<Arc<Trajectory>>,
        styles: Vec<TrackerStyle>,
        step: usize,
        budget: usize,
    ) -> ReelResult<Self> {
        let name = name.into();
        let min_len = shortest(&name, &trajectories)?;
        check_budget(&name, budget, step, min_len)?;
        let budget = FrameBudget::fixed(budget)?;
        Self::build(name, trajectories, styles, step, budget)
    }

    /// Open-ended playback that stops once the data runs out.
    pub fn until_exhausted(
        name: impl Into<String>,
        trajectories: Vec<Arc<Trajectory>>,
        styles: Vec<TrackerStyle>,
        step: usize,
    ) -> ReelResult<Self> {
        let name = name.into();
        shortest(&name, &trajectories)?;
        check_budget(&name, 1, step, usize::MAX)?;
        Self::build(name, trajectories, styles, step, FrameBudget::OpenEnded)
    }

    fn build(
        name: String,
        trajectories: Vec<Arc<Trajectory>>,
        styles: Vec<TrackerStyle>,
        step: usize,
        budget: FrameBudget,
    ) -> ReelResult<Self> {
        if styles.len() != trajectories.len() {
            return Err(ReelError::InvalidConfiguration(format!(
                "clip '{}' has {} trajectories but {} styles",
                name,
                trajectories.len(),
                styles.len()
            )));
        }
        Ok(Self {
            name,
            trajectories,
            styles,
            step,
            budget,
            lifetime: Lifetime::Clip,
            orbit_per_tick: None,
            trackers: Vec::new(),
        })
    }

    /// Keeps markers and trails alive past this clip until the sequence wraps.
    pub fn persist_until_loop(mut self) -> Self {
        self.lifetime = Lifetime::Loop;
        self
    }

    /// Orbits the camera about +z by `dphi` every tick.
    pub fn orbiting(mut self, dphi: f32) -> Self {
        self.orbit_per_tick = Some(dphi);
        self
    }

    pub fn trackers(&self) -> &[ObjectTracker] {
        &self.trackers
    }

    fn min_len(&self) -> usize {
        self.trajectories.iter().map(|t| t.len()).min().unwrap_or(0)
    }
}

fn shortest(name: &str, trajectories: &[Arc<Trajectory>]) -> ReelResult<usize> {
    trajectories
        .iter()
        .map(|t| t.len())
        .min()
        .filter(|&len| len > 0)
        .ok_or_else(|| {
            ReelError::InvalidConfiguration(format!("clip '{}' has no trajectory data", name))
        })
}

impl Clip for TrajectoryPlayback {
    fn name(&self) -> &str {
        &self.name
    }

    fn budget(&self) -> FrameBudget {
        self.budget
    }

    fn on_enter(&mut self, stage: &mut Stage) -> ReelResult<()> {
        self.trackers = self
            .trajectories
            .iter()
            .zip(&self.styles)
            .map(|(traj, style)| ObjectTracker::spawn(stage, traj.clone(), style, self.lifetime))
            .collect::<ReelResult<Vec<_>>>()?;
        Ok(())
    }

    fn on_tick(&mut self, stage: &mut Stage, frame: usize) -> ReelResult<()> {
        if let Some(dphi) = self.orbit_per_tick {
            stage.camera.orbit(dphi);
        }
        let index = frame * self.step;
        for tracker in &mut self.trackers {
            tracker.advance(stage, index)?;
        }
        Ok(())
    }

    fn is_finished(&self, _stage: &Stage, frame: usize) -> bool {
        (frame + 1) * self.step >= self.min_len()
    }

    fn on_exit(&mut self, _stage: &mut Stage) {
        self.trackers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Material, Rgb};
    use crate::sequencer::ClipSequencer;
    use crate::trail::TrailPolicy;
    use glam::Vec3;

    fn style() -> TrackerStyle {
        TrackerStyle {
            marker_radius: 0.2,
            marker: Material::solid(Rgb::WHITE),
            trail: Material::line(Rgb::WHITE, 3.0),
            policy: TrailPolicy::Circular,
            capacity: 50,
        }
    }

    fn ray(len: usize) -> Arc<Trajectory> {
        Arc::new(Trajectory::from_points((0..len).map(|i| Vec3::splat(i as f32))))
    }

    #[test]
    fn derived_budget_never_overruns() {
        let clip = TrajectoryPlayback::new("rays", vec![ray(10), ray(12)], vec![style(); 2], 3).unwrap();
        assert_eq!(clip.budget(), FrameBudget::Fixed(3));
    }

    #[test]
    fn explicit_budget_past_data_is_rejected() {
        let err = TrajectoryPlayback::with_budget("rays", vec![ray(100)], vec![style()], 1, 101);
        assert!(matches!(err, Err(ReelError::ClipBudget { .. })));
    }

    #[test]
    fn mismatched_styles_are_rejected() {
        assert!(TrajectoryPlayback::new("rays", vec![ray(10)], vec![style(); 2], 1).is_err());
    }

    #[test]
    fn until_exhausted_stops_within_ceil_len_over_step() {
        let clip = TrajectoryPlayback::until_exhausted("rays", vec![ray(11)], vec![style()], 5).unwrap();
        let mut seq = ClipSequencer::new(vec![Box::new(clip)]).unwrap();
        let mut stage = Stage::new(60);

        // ceil(11 / 5) = 3 ticks reading 0, 5 and 10.
        for _ in 0..3 {
            seq.tick(&mut stage).unwrap();
        }
        assert_eq!(seq.loops(), 1);
        assert_eq!(seq.current_frame(), 0);
    }

    #[test]
    fn orbiting_playback_moves_camera() {
        let mut clip = TrajectoryPlayback::new("rays", vec![ray(4)], vec![style()], 1)
            .unwrap()
            .orbiting(0.1);
        let mut stage = Stage::new(60);
        let before = stage.camera.spherical().phi;

        clip.on_enter(&mut stage).unwrap();
        clip.on_tick(&mut stage, 0).unwrap();

        assert!((stage.camera.spherical().phi - before - 0.1).abs() < 1e-4);
        assert_eq!(clip.trackers().len(), 1);
    }
}
