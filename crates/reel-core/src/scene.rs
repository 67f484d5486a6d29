//! # Scene Graph Module
//!
//! Arena-based storage for everything the renderer draws.
//!
//! ## Responsibilities
//! - **Node Storage**: `Vec<Option<SceneNode>>` arena with `NodeId` indices
//!   and slot reuse.
//! - **Lifetimes**: Every node records how long it should live so clip
//!   teardown is explicit instead of implied.
//!
//! ## Key Types
//! - `SceneGraph`: The arena container.
//! - `SceneNode`: An `Element` plus placement, material and lifetime.
//! - `Element`: The drawable payload (marker, trail, sphere patch, ...).

use crate::mesh::Mesh;
use crate::sky::SkyTexture;
use crate::trail::TrailBuffer;
use glam::Vec3;
use serde::Serialize;
use std::sync::Arc;

pub type NodeId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const RED: Rgb = Rgb(255, 0, 0);
    pub const GREEN: Rgb = Rgb(0, 255, 0);
    pub const BLUE: Rgb = Rgb(0, 0, 255);

    pub const fn from_hex(hex: u32) -> Self {
        Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub color: Rgb,
    pub opacity: f32,
    pub line_width: f32,
}

impl Material {
    pub fn solid(color: Rgb) -> Self {
        Self {
            color,
            opacity: 1.0,
            line_width: 1.0,
        }
    }

    pub fn line(color: Rgb, line_width: f32) -> Self {
        Self {
            color,
            opacity: 1.0,
            line_width,
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }
}

/// How long a node stays in the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifetime {
    /// Movie setup; never removed by the sequencer.
    Static,
    /// Survives clip exits, removed when the sequence wraps to the first clip.
    Loop,
    /// Removed when the clip that spawned it exits.
    Clip,
}

/// A patch of a sphere bounded by polar and azimuthal ranges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpherePatch {
    pub radius: f32,
    pub theta_start: f32,
    pub theta_end: f32,
    pub phi_start: f32,
    pub phi_end: f32,
}

impl SpherePatch {
    pub fn full(radius: f32) -> Self {
        Self {
            radius,
            theta_start: 0.0,
            theta_end: std::f32::consts::PI,
            phi_start: 0.0,
            phi_end: std::f32::consts::TAU,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Element {
    /// Small sphere following a trajectory.
    Marker { radius: f32 },
    Trail(TrailBuffer),
    Sphere(SpherePatch),
    Polyline(Vec<Vec3>),
    Mesh { mesh: Arc<Mesh>, rotation_z: f32 },
    Cube { size: f32 },
    /// Background dome; drawn before everything else.
    Sky(Arc<SkyTexture>),
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub element: Element,
    pub position: Vec3,
    pub material: Material,
    pub visible: bool,
    pub lifetime: Lifetime,
    /// Clip index that spawned the node, if it was spawned during playback.
    pub owner: Option<usize>,
}

impl SceneNode {
    pub fn new(element: Element, material: Material, lifetime: Lifetime) -> Self {
        Self {
            element,
            position: Vec3::ZERO,
            material,
            visible: true,
            lifetime,
            owner: None,
        }
    }
}

/// The scene graph arena.
#[derive(Clone, Debug, Default)]
pub struct SceneGraph {
    pub nodes: Vec<Option<SceneNode>>,
    /// Indices of nodes that have been removed and can be reused.
    pub free_indices: Vec<usize>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: SceneNode) -> NodeId {
        if let Some(id) = self.free_indices.pop() {
            self.nodes[id] = Some(node);
            id
        } else {
            let id = self.nodes.len();
            self.nodes.push(Some(node));
            id
        }
    }

    /// Frees a node's slot. Removing a missing node is a no-op.
    pub fn destroy_node(&mut self, id: NodeId) {
        if let Some(slot) = self.nodes.get_mut(id) {
            if slot.take().is_some() {
                self.free_indices.push(id);
            }
        }
    }

    /// Destroys every node matching `pred`, returning how many were removed.
    pub fn destroy_where(&mut self, pred: impl Fn(&SceneNode) -> bool) -> usize {
        let doomed: Vec<NodeId> = self
            .iter()
            .filter(|(_, node)| pred(node))
            .map(|(id, _)| id)
            .collect();
        for &id in &doomed {
            self.destroy_node(id);
        }
        doomed.len()
    }

    pub fn get_node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id).and_then(|n| n.as_ref())
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id).and_then(|n| n.as_mut())
    }

    pub fn trail(&self, id: NodeId) -> Option<&TrailBuffer> {
        match self.get_node(id).map(|n| &n.element) {
            Some(Element::Trail(trail)) => Some(trail),
            _ => None,
        }
    }

    pub fn trail_mut(&mut self, id: NodeId) -> Option<&mut TrailBuffer> {
        match self.get_node_mut(id).map(|n| &mut n.element) {
            Some(Element::Trail(trail)) => Some(trail),
            _ => None,
        }
    }

    pub fn set_position(&mut self, id: NodeId, position: Vec3) {
        if let Some(node) = self.get_node_mut(id) {
            node.position = position;
        }
    }

    pub fn set_opacity(&mut self, id: NodeId, opacity: f32) {
        if let Some(node) = self.get_node_mut(id) {
            node.material.opacity = opacity;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, n)| n.as_ref().map(|n| (id, n)))
    }

    pub fn len(&self) -> usize {
        self.nodes.len() - self.free_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
