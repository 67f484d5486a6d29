//! Cycles through keyframe meshes next to a reference cube.

use super::MovieResources;
use crate::clip::{Clip, FrameBudget};
use crate::config::MovieConfig;
use crate::driver::CameraMotion;
use crate::errors::{ReelError, ReelResult};
use crate::mesh::Mesh;
use crate::scene::{Element, Lifetime, Material, NodeId, Rgb};
use crate::stage::Stage;
use glam::Vec3;
use std::sync::Arc;
use tracing::warn;

pub(super) fn build(
    config: &MovieConfig,
    resources: &MovieResources,
    stage: &mut Stage,
    frames_per_keyframe: usize,
) -> ReelResult<(Vec<Box<dyn Clip>>, CameraMotion)> {
    let color = config.palette.first().copied().unwrap_or(Rgb::GREEN);
    stage.spawn(
        Element::Cube { size: 1.0 },
        Material::line(color, 1.0),
        Vec3::ZERO,
        Lifetime::Static,
    );

    let keyframes: Vec<Arc<Mesh>> = resources.meshes.iter().map(|(_, m)| m.clone()).collect();
    if keyframes.is_empty() {
        warn!("No keyframes loaded; showing the cube only");
    }
    let clip = KeyframeCycle::new(keyframes, frames_per_keyframe)?;
    Ok((vec![Box::new(clip)], CameraMotion::Static))
}

/// Shows keyframe `frame / hold`; one pass over all keyframes per loop.
pub(crate) struct KeyframeCycle {
    keyframes: Vec<Arc<Mesh>>,
    hold: usize,
    node: Option<NodeId>,
    shown: Option<usize>,
}

impl KeyframeCycle {
    pub(crate) fn new(keyframes: Vec<Arc<Mesh>>, hold: usize) -> ReelResult<Self> {
        if hold == 0 {
            return Err(ReelError::InvalidConfiguration(
                "frames per keyframe must be positive".to_string(),
            ));
        }
        Ok(Self {
            keyframes,
            hold,
            node: None,
            shown: None,
        })
    }
}

impl Clip for KeyframeCycle {
    fn name(&self) -> &str {
        "keyframe-cycle"
    }

    fn budget(&self) -> FrameBudget {
        FrameBudget::Fixed(self.keyframes.len().max(1) * self.hold)
    }

    fn on_enter(&mut self, _stage: &mut Stage) -> ReelResult<()> {
        self.node = None;
        self.shown = None;
        Ok(())
    }

    fn on_tick(&mut self, stage: &mut Stage, frame: usize) -> ReelResult<()> {
        let index = frame / self.hold;
        if self.shown == Some(index) {
            return Ok(());
        }
        let Some(mesh) = self.keyframes.get(index) else {
            return Ok(());
        };

        let element = Element::Mesh {
            mesh: mesh.clone(),
            rotation_z: 0.0,
        };
        match self.node.and_then(|id| stage.scene.get_node_mut(id)) {
            Some(node) => node.element = element,
            None => {
                self.node = Some(stage.spawn(
                    element,
                    Material::line(Rgb::WHITE, 1.0),
                    Vec3::ZERO,
                    Lifetime::Clip,
                ));
            }
        }
        self.shown = Some(index);
        Ok(())
    }

    fn on_exit(&mut self, _stage: &mut Stage) {
        self.node = None;
        self.shown = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::ClipSequencer;

    fn mesh(vertices: usize) -> Arc<Mesh> {
        Arc::new(Mesh {
            vertices: vec![Vec3::ZERO; vertices],
            edges: Vec::new(),
        })
    }

    fn shown_vertices(stage: &Stage) -> Option<usize> {
        stage.scene.iter().find_map(|(_, n)| match &n.element {
            Element::Mesh { mesh, .. } => Some(mesh.vertices.len()),
            _ => None,
        })
    }

    #[test]
    fn keyframe_advances_every_hold_ticks_and_wraps() {
        let clip = KeyframeCycle::new(vec![mesh(1), mesh(2), mesh(3)], 5).unwrap();
        let mut seq = ClipSequencer::new(vec![Box::new(clip)]).unwrap();
        let mut stage = Stage::new(60);

        seq.tick(&mut stage).unwrap();
        assert_eq!(shown_vertices(&stage), Some(1));
        for _ in 0..5 {
            seq.tick(&mut stage).unwrap();
        }
        assert_eq!(shown_vertices(&stage), Some(2));

        for _ in 6..15 {
            seq.tick(&mut stage).unwrap();
        }
        assert_eq!(seq.loops(), 1);
        assert_eq!(shown_vertices(&stage), None);

        seq.tick(&mut stage).unwrap();
        assert_eq!(shown_vertices(&stage), Some(1));
    }

    #[test]
    fn zero_hold_is_rejected() {
        assert!(KeyframeCycle::new(vec![mesh(1)], 0).is_err());
    }
}
