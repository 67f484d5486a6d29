//! # Stage
//!
//! Mutable world state shared by the clips of one movie: the scene graph,
//! the camera, text readouts and the movie clock.

use crate::camera::Camera;
use crate::scene::{Element, Lifetime, Material, NodeId, SceneGraph, SceneNode};
use glam::Vec3;
use std::collections::BTreeMap;
use tracing::debug;

/// Named text readouts shown next to the picture (spin value, ...).
#[derive(Clone, Debug, Default)]
pub struct Hud {
    readouts: BTreeMap<String, String>,
}

impl Hud {
    pub fn set(&mut self, key: &str, value: String) {
        debug!(readout = key, %value, "HUD update");
        self.readouts.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.readouts.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.readouts.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Right-aligns the integer part to three columns so readouts line up on
/// the decimal point.
pub fn format_readout(value: f64, precision: usize) -> String {
    let text = format!("{:.*}", precision, value);
    match text.split_once('.') {
        Some((int_part, dec_part)) => format!("{:>3}.{}", int_part, dec_part),
        None => format!("{:>3}", text),
    }
}

#[derive(Clone, Debug)]
pub struct Stage {
    pub scene: SceneGraph,
    pub camera: Camera,
    pub hud: Hud,
    pub fps: u32,
    /// Frames rendered since the movie started.
    pub global_frame: u64,
    /// Clip currently being ticked; nodes spawned meanwhile are tagged with it.
    pub active_clip: Option<usize>,
}

impl Stage {
    pub fn new(fps: u32) -> Self {
        Self {
            scene: SceneGraph::new(),
            camera: Camera::default(),
            hud: Hud::default(),
            fps,
            global_frame: 0,
            active_clip: None,
        }
    }

    /// Movie time in seconds.
    pub fn time(&self) -> f64 {
        self.global_frame as f64 / self.fps.max(1) as f64
    }

    pub fn spawn(
        &mut self,
        element: Element,
        material: Material,
        position: Vec3,
        lifetime: Lifetime,
    ) -> NodeId {
        let mut node = SceneNode::new(element, material, lifetime);
        node.position = position;
        node.owner = self.active_clip;
        self.scene.add_node(node)
    }

    /// Removes the `Clip`-lifetime nodes spawned by `clip`.
    pub fn teardown_clip(&mut self, clip: usize) -> usize {
        self.scene
            .destroy_where(|n| n.lifetime == Lifetime::Clip && n.owner == Some(clip))
    }

    /// Removes every playback node spawned by `clip`, including `Loop` ones.
    pub fn teardown_spawned_by(&mut self, clip: usize) -> usize {
        self.scene
            .destroy_where(|n| n.lifetime != Lifetime::Static && n.owner == Some(clip))
    }

    /// Removes everything spawned during playback, leaving setup nodes.
    pub fn teardown_loop(&mut self) -> usize {
        self.scene.destroy_where(|n| n.lifetime != Lifetime::Static)
    }
}
