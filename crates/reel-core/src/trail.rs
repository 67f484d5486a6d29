//! # Trail Buffers
//!
//! Fixed-capacity point history behind every rendered ray trail.
//!
//! ## Policies
//! - **Shift**: newest point at index 0, older points slide toward the tail.
//!   Pre-seeded with the initial point, so the whole buffer is always visible.
//! - **Circular**: a write cursor advances modulo capacity and a valid-length
//!   counter grows until the buffer saturates. Only the valid prefix is drawn
//!   until then.
//!
//! Every mutation bumps `revision`, which is how the renderer learns that
//! the underlying storage changed.

use crate::errors::{ReelError, ReelResult};
use glam::Vec3;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TrailPolicy {
    Shift,
    Circular,
}

#[derive(Clone, Debug)]
pub struct TrailBuffer {
    policy: TrailPolicy,
    points: Vec<Vec3>,
    cursor: usize,
    valid: usize,
    revision: u64,
}

impl TrailBuffer {
    /// Creates a buffer of `capacity` slots seeded with `initial`.
    ///
    /// The circular policy seeds the storage too but starts with nothing
    /// visible.
    pub fn new(policy: TrailPolicy, capacity: usize, initial: Vec3) -> ReelResult<Self> {
        if capacity == 0 {
            return Err(ReelError::InvalidConfiguration(
                "trail capacity must be positive".to_string(),
            ));
        }

        let valid = match policy {
            TrailPolicy::Shift => capacity,
            TrailPolicy::Circular => 0,
        };

        Ok(Self {
            policy,
            points: vec![initial; capacity],
            cursor: 0,
            valid,
            revision: 0,
        })
    }

    pub fn policy(&self) -> TrailPolicy {
        self.policy
    }

    pub fn capacity(&self) -> usize {
        self.points.len()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Records `point` as the most recent sample.
    pub fn push(&mut self, point: Vec3) {
        match self.policy {
            TrailPolicy::Shift => {
                self.points.rotate_right(1);
                self.points[0] = point;
            }
            TrailPolicy::Circular => {
                self.points[self.cursor] = point;
                self.cursor = (self.cursor + 1) % self.points.len();
                self.valid = (self.valid + 1).min(self.points.len());
            }
        }
        self.revision += 1;
    }

    /// Overwrites every slot with `point`, starting a fresh segment.
    pub fn reset(&mut self, point: Vec3) {
        self.points.fill(point);
        match self.policy {
            TrailPolicy::Shift => self.valid = self.points.len(),
            TrailPolicy::Circular => {
                self.cursor = 0;
                self.valid = 0;
            }
        }
        self.revision += 1;
    }

    /// Contiguous slice to draw.
    ///
    /// Storage order is not chronological for a saturated circular buffer;
    /// use [`TrailBuffer::ordered_points`] for a polyline.
    pub fn visible_range(&self) -> &[Vec3] {
        &self.points[..self.valid]
    }

    /// Most recent point, if anything is visible.
    pub fn latest(&self) -> Option<Vec3> {
        if self.valid == 0 {
            return None;
        }
        match self.policy {
            TrailPolicy::Shift => Some(self.points[0]),
            TrailPolicy::Circular => {
                let len = self.points.len();
                Some(self.points[(self.cursor + len - 1) % len])
            }
        }
    }

    /// Visible points from newest to oldest.
    pub fn ordered_points(&self) -> Vec<Vec3> {
        match self.policy {
            TrailPolicy::Shift => self.points.clone(),
            TrailPolicy::Circular => {
                let len = self.points.len();
                (0..self.valid)
                    .map(|i| self.points[(self.cursor + len - 1 - i) % len])
                    .collect()
            }
        }
    }
}
