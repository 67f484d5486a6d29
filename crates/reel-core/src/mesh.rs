//! # Meshes
//!
//! Minimal Wavefront OBJ reader for keyframe surfaces.
//!
//! Only `v`, `f` and `l` statements are read; the renderer draws meshes as
//! wireframes so normals, texture coordinates and materials are ignored.

use crate::errors::{ReelError, ReelResult};
use glam::Vec3;
use std::collections::BTreeSet;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    /// Unique undirected edges as vertex index pairs (low, high).
    pub edges: Vec<(u32, u32)>,
}

impl Mesh {
    pub fn parse_obj(source: &str, text: &str) -> ReelResult<Self> {
        let mut vertices = Vec::new();
        let mut edges = BTreeSet::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            let mut parts = line.split_whitespace();
            let Some(tag) = parts.next() else {
                continue;
            };

            let parse_err = |message: String| ReelError::Parse {
                path: source.to_string(),
                line: idx + 1,
                message,
            };

            match tag {
                "v" => {
                    let coords = parts
                        .take(3)
                        .map(|s| s.parse::<f32>().map_err(|e| parse_err(e.to_string())))
                        .collect::<ReelResult<Vec<f32>>>()?;
                    if coords.len() != 3 {
                        return Err(parse_err("vertex needs three coordinates".to_string()));
                    }
                    vertices.push(Vec3::new(coords[0], coords[1], coords[2]));
                }
                "f" | "l" => {
                    let indices = parts
                        .map(|s| resolve_index(s, vertices.len()).ok_or_else(|| parse_err(format!("bad index '{}'", s))))
                        .collect::<ReelResult<Vec<u32>>>()?;
                    let closed = tag == "f" && indices.len() > 2;
                    for pair in indices.windows(2) {
                        edges.insert(ordered(pair[0], pair[1]));
                    }
                    if closed {
                        edges.insert(ordered(indices[indices.len() - 1], indices[0]));
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            vertices,
            edges: edges.into_iter().collect(),
        })
    }
}

fn ordered(a: u32, b: u32) -> (u32, u32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// OBJ indices are 1-based, negative values count back from the end, and
/// face entries may carry `/vt/vn` suffixes.
fn resolve_index(token: &str, vertex_count: usize) -> Option<u32> {
    let head = token.split('/').next()?;
    let raw: i64 = head.parse().ok()?;
    let idx = if raw > 0 {
        raw - 1
    } else if raw < 0 {
        vertex_count as i64 + raw
    } else {
        return None;
    };
    if idx < 0 || idx as usize >= vertex_count {
        return None;
    }
    u32::try_from(idx).ok()
}
