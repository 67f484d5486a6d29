//! # Clip Sequencer
//!
//! Cyclic state machine over an ordered list of clips.
//!
//! Each `tick` enters the current clip on its first frame, ticks it, then
//! either advances the intra-clip frame or moves on to the next clip. After
//! the last clip the sequence wraps back to the first one; it never halts on
//! its own.
//!
//! Leaving a clip calls `on_exit` and removes the nodes it spawned with
//! `Lifetime::Clip`. Wrapping to the first clip also removes `Lifetime::Loop`
//! nodes so every pass starts from the setup scene.

use crate::clip::{Clip, FrameBudget};
use crate::errors::{ReelError, ReelResult};
use crate::stage::Stage;
use tracing::{debug, info};

pub struct ClipSequencer {
    clips: Vec<Box<dyn Clip>>,
    current: usize,
    frame: usize,
    total_ticks: u64,
    /// Ticks since the sequence last started over.
    loop_ticks: u64,
    loops: u64,
}

impl ClipSequencer {
    pub fn new(clips: Vec<Box<dyn Clip>>) -> ReelResult<Self> {
        if clips.is_empty() {
            return Err(ReelError::InvalidConfiguration(
                "a movie needs at least one clip".to_string(),
            ));
        }
        Ok(Self {
            clips,
            current: 0,
            frame: 0,
            total_ticks: 0,
            loop_ticks: 0,
            loops: 0,
        })
    }

    pub fn current_clip(&self) -> usize {
        self.current
    }

    pub fn current_frame(&self) -> usize {
        self.frame
    }

    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    pub fn loop_ticks(&self) -> u64 {
        self.loop_ticks
    }

    /// Completed passes over the whole clip list.
    pub fn loops(&self) -> u64 {
        self.loops
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn clip_names(&self) -> Vec<&str> {
        self.clips.iter().map(|c| c.name()).collect()
    }

    pub fn tick(&mut self, stage: &mut Stage) -> ReelResult<()> {
        let idx = self.current;
        let frame = self.frame;
        let clip = &mut self.clips[idx];

        stage.active_clip = Some(idx);

        if frame == 0 {
            info!(clip = idx, name = clip.name(), "Entering clip");
            clip.on_enter(stage)?;
        }

        clip.on_tick(stage, frame)?;
        self.total_ticks += 1;
        self.loop_ticks += 1;

        let finished = match clip.budget() {
            FrameBudget::Fixed(budget) => frame + 1 == budget,
            FrameBudget::OpenEnded => clip.is_finished(stage, frame),
        };

        if !finished {
            self.frame += 1;
            return Ok(());
        }

        debug!(clip = idx, frames = frame + 1, "Leaving clip");
        clip.on_exit(stage);
        let removed = stage.teardown_clip(idx);
        if removed > 0 {
            debug!(clip = idx, removed, "Removed clip nodes");
        }

        self.current = (idx + 1) % self.clips.len();
        self.frame = 0;

        if self.current == 0 {
            self.loops += 1;
            self.loop_ticks = 0;
            let removed = stage.teardown_loop();
            info!(loops = self.loops, removed, "Clip sequence wrapped");
        }
        stage.active_clip = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Element, Lifetime, Material, Rgb};
    use glam::Vec3;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Counts {
        enters: usize,
        ticks: Vec<usize>,
        exits: usize,
    }

    struct CountingClip {
        budget: FrameBudget,
        finish_after: usize,
        counts: Arc<Mutex<Counts>>,
    }

    impl CountingClip {
        fn fixed(budget: usize) -> (Self, Arc<Mutex<Counts>>) {
            let counts = Arc::new(Mutex::new(Counts::default()));
            (
                Self {
                    budget: FrameBudget::Fixed(budget),
                    finish_after: 0,
                    counts: counts.clone(),
                },
                counts,
            )
        }
    }

    impl Clip for CountingClip {
        fn name(&self) -> &str {
            "counting"
        }

        fn budget(&self) -> FrameBudget {
            self.budget
        }

        fn on_enter(&mut self, stage: &mut Stage) -> ReelResult<()> {
            self.counts.lock().unwrap().enters += 1;
            stage.spawn(
                Element::Marker { radius: 1.0 },
                Material::solid(Rgb::WHITE),
                Vec3::ZERO,
                Lifetime::Clip,
            );
            Ok(())
        }

        fn on_tick(&mut self, _stage: &mut Stage, frame: usize) -> ReelResult<()> {
            self.counts.lock().unwrap().ticks.push(frame);
            Ok(())
        }

        fn is_finished(&self, _stage: &Stage, frame: usize) -> bool {
            frame + 1 >= self.finish_after
        }

        fn on_exit(&mut self, _stage: &mut Stage) {
            self.counts.lock().unwrap().exits += 1;
        }
    }

    #[test]
    fn empty_plan_is_rejected() {
        assert!(ClipSequencer::new(Vec::new()).is_err());
    }

    #[test]
    fn fixed_clip_enters_once_and_ticks_budget_times() {
        let (clip, counts) = CountingClip::fixed(4);
        let (next, _) = CountingClip::fixed(1);
        let mut seq = ClipSequencer::new(vec![Box::new(clip), Box::new(next)]).unwrap();
        let mut stage = Stage::new(60);

        for _ in 0..4 {
            seq.tick(&mut stage).unwrap();
        }

        let counts = counts.lock().unwrap();
        assert_eq!(counts.enters, 1);
        assert_eq!(counts.ticks, vec![0, 1, 2, 3]);
        assert_eq!(counts.exits, 1);
        assert_eq!(seq.current_clip(), 1);
        assert_eq!(seq.current_frame(), 0);
    }

    #[test]
    fn full_cycle_takes_sum_of_budgets_and_wraps() {
        let budgets = [3, 1, 5];
        let clips: Vec<Box<dyn Clip>> = budgets
            .iter()
            .map(|&b| Box::new(CountingClip::fixed(b).0) as Box<dyn Clip>)
            .collect();
        let mut seq = ClipSequencer::new(clips).unwrap();
        let mut stage = Stage::new(60);

        let total: usize = budgets.iter().sum();
        for _ in 0..total {
            assert!(seq.current_clip() < seq.len());
            seq.tick(&mut stage).unwrap();
        }

        assert_eq!(seq.total_ticks(), total as u64);
        assert_eq!(seq.loop_ticks(), 0);
        assert_eq!(seq.current_clip(), 0);
        assert_eq!(seq.current_frame(), 0);
        assert_eq!(seq.loops(), 1);

        seq.tick(&mut stage).unwrap();
        assert_eq!(seq.loop_ticks(), 1);
        assert_eq!(seq.total_ticks(), total as u64 + 1);
    }

    #[test]
    fn open_ended_clip_runs_until_predicate() {
        let counts = Arc::new(Mutex::new(Counts::default()));
        let clip = CountingClip {
            budget: FrameBudget::OpenEnded,
            finish_after: 7,
            counts: counts.clone(),
        };
        let (next, _) = CountingClip::fixed(2);
        let mut seq = ClipSequencer::new(vec![Box::new(clip), Box::new(next)]).unwrap();
        let mut stage = Stage::new(60);

        for _ in 0..7 {
            seq.tick(&mut stage).unwrap();
        }
        assert_eq!(counts.lock().unwrap().ticks.len(), 7);
        assert_eq!(seq.current_clip(), 1);
    }

    #[test]
    fn clip_nodes_are_removed_on_exit() {
        let (clip, _) = CountingClip::fixed(2);
        let (next, _) = CountingClip::fixed(2);
        let mut seq = ClipSequencer::new(vec![Box::new(clip), Box::new(next)]).unwrap();
        let mut stage = Stage::new(60);

        seq.tick(&mut stage).unwrap();
        assert_eq!(stage.scene.len(), 1);
        seq.tick(&mut stage).unwrap();
        assert_eq!(stage.scene.len(), 0);

        seq.tick(&mut stage).unwrap();
        assert_eq!(stage.scene.len(), 1);
    }
}
