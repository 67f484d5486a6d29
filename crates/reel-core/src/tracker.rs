//! # Object Trackers
//!
//! Binds one marker node and one trail node to a trajectory.

use crate::errors::{ReelError, ReelResult};
use crate::scene::{Element, Lifetime, Material, NodeId};
use crate::stage::Stage;
use crate::trail::{TrailBuffer, TrailPolicy};
use crate::trajectory::Trajectory;
use std::sync::Arc;

#[derive(Clone, Copy, Debug)]
pub struct TrackerStyle {
    pub marker_radius: f32,
    pub marker: Material,
    pub trail: Material,
    pub policy: TrailPolicy,
    pub capacity: usize,
}

#[derive(Clone, Debug)]
pub struct ObjectTracker {
    pub marker: NodeId,
    pub trail: NodeId,
    trajectory: Arc<Trajectory>,
    cursor: usize,
}

impl ObjectTracker {
    /// Spawns the marker at the first sample and a trail seeded with it.
    pub fn spawn(
        stage: &mut Stage,
        trajectory: Arc<Trajectory>,
        style: &TrackerStyle,
        lifetime: Lifetime,
    ) -> ReelResult<Self> {
        let start = trajectory.position(0)?;
        let buffer = TrailBuffer::new(style.policy, style.capacity, start)?;

        let trail = stage.spawn(Element::Trail(buffer), style.trail, glam::Vec3::ZERO, lifetime);
        let marker = stage.spawn(
            Element::Marker {
                radius: style.marker_radius,
            },
            style.marker,
            start,
            lifetime,
        );

        Ok(Self {
            marker,
            trail,
            trajectory,
            cursor: 0,
        })
    }

    pub fn trajectory(&self) -> &Arc<Trajectory> {
        &self.trajectory
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Moves the marker to `trajectory[index]` and appends it to the trail.
    pub fn advance(&mut self, stage: &mut Stage, index: usize) -> ReelResult<()> {
        let position = self.trajectory.position(index)?;
        stage.scene.set_position(self.marker, position);
        self.trail_mut(stage)?.push(position);
        self.cursor = index;
        Ok(())
    }

    /// Moves the marker to `trajectory[index]` and restarts the trail there.
    pub fn restart(&mut self, stage: &mut Stage, index: usize) -> ReelResult<()> {
        let position = self.trajectory.position(index)?;
        stage.scene.set_position(self.marker, position);
        self.trail_mut(stage)?.reset(position);
        self.cursor = index;
        Ok(())
    }

    pub fn set_color(&self, stage: &mut Stage, color: crate::scene::Rgb) {
        for id in [self.marker, self.trail] {
            if let Some(node) = stage.scene.get_node_mut(id) {
                node.material.color = color;
            }
        }
    }

    fn trail_mut<'a>(&self, stage: &'a mut Stage) -> ReelResult<&'a mut TrailBuffer> {
        stage
            .scene
            .trail_mut(self.trail)
            .ok_or_else(|| ReelError::InvalidConfiguration(format!("node {} is not a trail", self.trail)))
    }
}
