mod common;

use glam::Vec3;
use reel_core::clip::{Clip, FrameBudget};
use common::{Recording, RecordingCapture};
use reel_core::driver::DriverState;
use reel_core::playback::TrajectoryPlayback;
use reel_core::render::WireframeRenderer;
use reel_core::scene::{Element, Lifetime, Material, Rgb};
use reel_core::tracker::TrackerStyle;
use reel_core::{
    CameraMotion, ClipSequencer, FixedRateScheduler, ReelError, ReelResult, RenderDriver, Stage,
    Trajectory, TrailPolicy,
};
use std::sync::{Arc, Mutex};

fn ray(len: usize, y: f32) -> Arc<Trajectory> {
    Arc::new(Trajectory::from_points((0..len).map(|i| Vec3::new(i as f32, y, 0.0))))
}

fn style(policy: TrailPolicy, capacity: usize) -> TrackerStyle {
    TrackerStyle {
        marker_radius: 0.2,
        marker: Material::solid(Rgb::RED),
        trail: Material::line(Rgb::RED, 3.0),
        policy,
        capacity,
    }
}

#[test]
fn three_rays_wrap_after_full_budget() {
    common::init_tracing();
    let rays = vec![ray(100, 0.0), ray(100, 1.0), ray(100, 2.0)];
    let styles = vec![style(TrailPolicy::Circular, 10_000); 3];
    let playback = TrajectoryPlayback::with_budget("rays", rays, styles, 1, 100).unwrap();

    let mut seq = ClipSequencer::new(vec![Box::new(playback)]).unwrap();
    let mut stage = Stage::new(60);

    for _ in 0..99 {
        seq.tick(&mut stage).unwrap();
    }
    assert_eq!(seq.current_frame(), 99);
    assert_eq!(seq.loops(), 0);

    seq.tick(&mut stage).unwrap();
    assert_eq!(seq.current_clip(), 0);
    assert_eq!(seq.current_frame(), 0);
    assert_eq!(seq.loops(), 1);
    assert_eq!(seq.total_ticks(), 100);
    // Clip-lifetime markers and trails are gone once the clip exits.
    assert!(stage.scene.is_empty());
}

#[test]
fn budget_past_trajectory_end_is_rejected() {
    let rays = vec![ray(100, 0.0), ray(60, 1.0)];
    let styles = vec![style(TrailPolicy::Shift, 5); 2];
    let result = TrajectoryPlayback::with_budget("rays", rays, styles, 1, 100);
    assert!(matches!(
        result,
        Err(ReelError::ClipBudget { budget: 100, step: 1, len: 60, .. })
    ));
}

#[test]
fn circular_trail_shows_every_point_until_full() {
    let rays = vec![ray(50, 0.0)];
    let playback =
        TrajectoryPlayback::new("rays", rays, vec![style(TrailPolicy::Circular, 20)], 1).unwrap();
    let mut seq = ClipSequencer::new(vec![Box::new(playback)]).unwrap();
    let mut stage = Stage::new(60);

    let visible = |stage: &Stage| {
        stage
            .scene
            .iter()
            .find_map(|(_, n)| match &n.element {
                Element::Trail(trail) => Some(trail.visible_range().len()),
                _ => None,
            })
            .unwrap()
    };

    for _ in 0..9 {
        seq.tick(&mut stage).unwrap();
    }
    assert_eq!(visible(&stage), 9);
    for _ in 9..40 {
        seq.tick(&mut stage).unwrap();
    }
    assert_eq!(visible(&stage), 20);
}

/// Logs every callback into a shared journal.
struct Journaled {
    name: &'static str,
    budget: FrameBudget,
    journal: Arc<Mutex<Vec<String>>>,
}

impl Clip for Journaled {
    fn name(&self) -> &str {
        self.name
    }

    fn budget(&self) -> FrameBudget {
        self.budget
    }

    fn on_enter(&mut self, stage: &mut Stage) -> ReelResult<()> {
        self.journal.lock().unwrap().push(format!("{}:enter", self.name));
        stage.spawn(
            Element::Marker { radius: 1.0 },
            Material::solid(Rgb::WHITE),
            Vec3::ZERO,
            Lifetime::Loop,
        );
        Ok(())
    }

    fn on_tick(&mut self, _stage: &mut Stage, frame: usize) -> ReelResult<()> {
        self.journal.lock().unwrap().push(format!("{}:{}", self.name, frame));
        Ok(())
    }

    fn is_finished(&self, _stage: &Stage, frame: usize) -> bool {
        frame == 1
    }

    fn on_exit(&mut self, _stage: &mut Stage) {
        self.journal.lock().unwrap().push(format!("{}:exit", self.name));
    }
}

#[test]
fn mixed_budgets_run_in_order_and_clear_loop_nodes() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let clips: Vec<Box<dyn Clip>> = vec![
        Box::new(Journaled {
            name: "a",
            budget: FrameBudget::Fixed(3),
            journal: journal.clone(),
        }),
        Box::new(Journaled {
            name: "b",
            budget: FrameBudget::OpenEnded,
            journal: journal.clone(),
        }),
    ];
    let mut seq = ClipSequencer::new(clips).unwrap();
    let mut stage = Stage::new(60);

    for _ in 0..4 {
        seq.tick(&mut stage).unwrap();
    }
    assert_eq!(stage.scene.len(), 2);

    seq.tick(&mut stage).unwrap();
    assert_eq!(seq.loops(), 1);
    assert!(stage.scene.is_empty());
    assert_eq!(
        *journal.lock().unwrap(),
        ["a:enter", "a:0", "a:1", "a:2", "a:exit", "b:enter", "b:0", "b:1", "b:exit"]
    );
}

/// Plays until `fails_at`, then reports a missing sample.
struct BreaksAt {
    fails_at: usize,
}

impl Clip for BreaksAt {
    fn name(&self) -> &str {
        "breaks"
    }

    fn budget(&self) -> FrameBudget {
        FrameBudget::Fixed(10)
    }

    fn on_enter(&mut self, _stage: &mut Stage) -> ReelResult<()> {
        Ok(())
    }

    fn on_tick(&mut self, _stage: &mut Stage, frame: usize) -> ReelResult<()> {
        if frame == self.fails_at {
            return Err(ReelError::IndexOutOfRange { index: frame, len: self.fails_at });
        }
        Ok(())
    }
}

#[test]
fn failed_tick_keeps_partial_capture() {
    common::init_tracing();
    let record = Arc::new(Mutex::new(Recording::default()));
    let mut driver = RenderDriver::new(
        ClipSequencer::new(vec![Box::new(BreaksAt { fails_at: 2 })]).unwrap(),
        Stage::new(60),
        Box::new(WireframeRenderer::new(8, 8).unwrap()),
        CameraMotion::Static,
    )
    .with_capture(Box::new(RecordingCapture(record.clone())), 100);

    let result = FixedRateScheduler::offline(None).run(&mut driver);

    assert!(matches!(result, Err(ReelError::IndexOutOfRange { index: 2, .. })));
    assert_eq!(driver.state(), DriverState::Finished);
    let record = record.lock().unwrap();
    assert_eq!(record.frames, [0, 1]);
    assert!(record.finished);
}
