//! # Clips
//!
//! One phase of a scripted movie.
//!
//! A clip is entered on its first tick (`on_enter`), ticked every frame
//! including the entry frame (`on_tick`), and left when its budget runs out
//! or, for open-ended clips, when `is_finished` reports true (`on_exit`).
//! Per-activation state belongs in the clip and is rebuilt on every entry.

use crate::errors::{ReelError, ReelResult};
use crate::stage::Stage;
use serde::Serialize;

/// Planned length of a clip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FrameBudget {
    /// Exactly this many ticks (always at least one).
    Fixed(usize),
    /// Runs until the clip's predicate reports completion.
    OpenEnded,
}

impl FrameBudget {
    /// Planned counts of `-1` mean open-ended.
    pub const OPEN_ENDED_SENTINEL: i64 = -1;

    pub fn from_planned(count: i64) -> ReelResult<Self> {
        match count {
            Self::OPEN_ENDED_SENTINEL => Ok(Self::OpenEnded),
            n if n > 0 => Ok(Self::Fixed(n as usize)),
            n => Err(ReelError::InvalidConfiguration(format!(
                "planned frame count must be positive or {}, got {}",
                Self::OPEN_ENDED_SENTINEL,
                n
            ))),
        }
    }

    pub fn fixed(count: usize) -> ReelResult<Self> {
        if count == 0 {
            return Err(ReelError::InvalidConfiguration(
                "fixed clip budget must be positive".to_string(),
            ));
        }
        Ok(Self::Fixed(count))
    }
}

pub trait Clip {
    fn name(&self) -> &str;

    fn budget(&self) -> FrameBudget;

    /// Builds per-activation state. Called once, before the first `on_tick`.
    fn on_enter(&mut self, stage: &mut Stage) -> ReelResult<()>;

    fn on_tick(&mut self, stage: &mut Stage, frame: usize) -> ReelResult<()>;

    /// Termination predicate for open-ended clips, evaluated after `on_tick`.
    fn is_finished(&self, _stage: &Stage, _frame: usize) -> bool {
        false
    }

    /// Drops per-activation state. Nodes spawned with `Lifetime::Clip` are
    /// removed by the sequencer right after this returns.
    fn on_exit(&mut self, _stage: &mut Stage) {}
}

/// Rejects budgets whose trajectory reads would run past `len`.
///
/// A clip reading index `frame * step` for `budget` frames is accepted only
/// when `budget * step <= len`.
pub fn check_budget(clip: &str, budget: usize, step: usize, len: usize) -> ReelResult<()> {
    if step == 0 {
        return Err(ReelError::InvalidConfiguration(format!(
            "clip '{}' has a zero trajectory step",
            clip
        )));
    }
    if budget.saturating_mul(step) > len {
        return Err(ReelError::ClipBudget {
            clip: clip.to_string(),
            budget,
            step,
            len,
        });
    }
    Ok(())
}
