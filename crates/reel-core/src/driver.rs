//! # Render Driver
//!
//! Per-frame callback tying the pieces together.
//!
//! ## Frame Order
//! 1. Move the camera (`CameraMotion`).
//! 2. Tick the clip sequencer.
//! 3. Render the stage.
//! 4. Hand the frame to the capture backend, if one is active.
//!
//! With capture enabled the driver stops itself once the capture window has
//! elapsed and finalizes the recording. Without capture it runs until the
//! scheduler stops calling it. A failing frame also stops the driver, so a
//! partial recording is still finalized.

use crate::capture::Capture;
use crate::errors::ReelResult;
use crate::render::{Frame, Renderer};
use crate::sequencer::ClipSequencer;
use crate::stage::Stage;
use crate::trajectory::Trajectory;
use glam::Vec3;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// How the camera moves before each tick.
#[derive(Clone, Debug)]
pub enum CameraMotion {
    /// Never moved.
    Static,
    /// Moved only by the clips themselves (orbits, descents).
    ClipDriven,
    /// Placed on `trajectory[tick * step]` and aimed at `target`, where
    /// `tick` counts from the start of the current pass over the clips. The
    /// trajectory loops when a pass outlasts it.
    Follow {
        trajectory: Arc<Trajectory>,
        target: Vec3,
        step: usize,
    },
}

impl CameraMotion {
    pub fn apply(&self, stage: &mut Stage, loop_tick: u64) -> ReelResult<()> {
        match self {
            CameraMotion::Static | CameraMotion::ClipDriven => Ok(()),
            CameraMotion::Follow {
                trajectory,
                target,
                step,
            } => {
                let len = trajectory.len().max(1) as u64;
                let idx = ((loop_tick * *step as u64) % len) as usize;
                stage.camera.position = trajectory.position(idx)?;
                stage.camera.look_at(*target);
                Ok(())
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Running,
    Finished,
}

struct CaptureWindow {
    sink: Box<dyn Capture>,
    remaining: u64,
}

pub struct RenderDriver {
    pub sequencer: ClipSequencer,
    pub stage: Stage,
    renderer: Box<dyn Renderer>,
    camera_motion: CameraMotion,
    capture: Option<CaptureWindow>,
    state: DriverState,
    last_frame: Option<Frame>,
}

impl RenderDriver {
    pub fn new(
        sequencer: ClipSequencer,
        stage: Stage,
        renderer: Box<dyn Renderer>,
        camera_motion: CameraMotion,
    ) -> Self {
        Self {
            sequencer,
            stage,
            renderer,
            camera_motion,
            capture: None,
            state: DriverState::Running,
            last_frame: None,
        }
    }

    /// Records the next `frames` frames into `sink`, then stops the movie.
    pub fn with_capture(mut self, sink: Box<dyn Capture>, frames: u64) -> Self {
        info!("Capture armed for {} frames", frames);
        self.capture = Some(CaptureWindow {
            sink,
            remaining: frames,
        });
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    /// Runs one frame.
    pub fn frame(&mut self) -> ReelResult<DriverState> {
        if self.state == DriverState::Finished {
            return Ok(self.state);
        }

        match self.step() {
            Ok(()) => Ok(self.state),
            Err(e) => {
                error!(
                    clip = self.sequencer.current_clip(),
                    frame = self.sequencer.current_frame(),
                    "Playback aborted: {}",
                    e
                );
                self.abort();
                Err(e)
            }
        }
    }

    fn step(&mut self) -> ReelResult<()> {
        self.camera_motion
            .apply(&mut self.stage, self.sequencer.loop_ticks())?;
        self.sequencer.tick(&mut self.stage)?;
        let frame = self.renderer.render(&self.stage)?;
        self.stage.global_frame += 1;

        if let Some(window) = self.capture.as_mut() {
            window.sink.capture(&frame)?;
            window.remaining = window.remaining.saturating_sub(1);
            if window.remaining == 0 {
                self.stop()?;
            }
        }

        self.last_frame = Some(frame);
        Ok(())
    }

    /// Stops after a failed frame; the first error is the one reported.
    fn abort(&mut self) {
        if let Err(e) = self.stop() {
            error!("Failed to finalize capture: {}", e);
        }
    }

    /// Hard stop: detaches from the scheduler and saves any capture.
    pub fn stop(&mut self) -> ReelResult<()> {
        self.state = DriverState::Finished;
        if let Some(window) = self.capture.take() {
            info!("Capture window elapsed, finalizing");
            window.sink.finish()?;
        }
        Ok(())
    }
}

/// Calls the driver at a fixed rate until it finishes or a frame limit hits.
pub struct FixedRateScheduler {
    pub fps: u32,
    /// Sleep between frames to match wall-clock time.
    pub paced: bool,
    pub max_frames: Option<u64>,
}

impl FixedRateScheduler {
    pub fn offline(max_frames: Option<u64>) -> Self {
        Self {
            fps: 60,
            paced: false,
            max_frames,
        }
    }

    /// Returns the number of frames driven.
    pub fn run(&self, driver: &mut RenderDriver) -> ReelResult<u64> {
        let period = Duration::from_secs_f64(1.0 / self.fps.max(1) as f64);
        let mut frames = 0u64;

        while driver.state() == DriverState::Running {
            if self.max_frames.is_some_and(|max| frames >= max) {
                driver.stop()?;
                break;
            }
            let started = Instant::now();
            driver.frame()?;
            frames += 1;

            if self.paced {
                if let Some(rest) = period.checked_sub(started.elapsed()) {
                    std::thread::sleep(rest);
                }
            }
        }
        Ok(frames)
    }
}
