//! # Wireframe Renderer
//!
//! Rasterizes a `Stage` into an RGBA frame with `tiny-skia`.
//!
//! ## Responsibilities
//! - **Projection**: World points go through the camera's perspective
//!   look-at matrix; segments with an endpoint behind the camera are dropped.
//! - **Background**: A visible sky node fills the frame first, one view ray
//!   per pixel.
//! - **Drawing**: Markers become filled discs sized by depth, trails and
//!   polylines are stroked newest to oldest, sphere patches are drawn as
//!   latitude/longitude lines and meshes as their edge lists.

use crate::camera::Camera;
use crate::errors::{ReelError, ReelResult};
use crate::scene::{Element, Material, SceneNode, SpherePatch};
use crate::sky::SkyTexture;
use crate::stage::Stage;
use glam::{Mat4, Quat, Vec3};
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

/// One rendered frame, tightly packed RGBA8.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

pub trait Renderer {
    fn render(&mut self, stage: &Stage) -> ReelResult<Frame>;
}

const SPHERE_RINGS: usize = 8;
const SPHERE_MERIDIANS: usize = 12;
const SPHERE_SEGMENTS: usize = 48;

pub struct WireframeRenderer {
    width: u32,
    height: u32,
    background: Color,
}

struct Projector {
    view_proj: Mat4,
    width: f32,
    height: f32,
    eye: Vec3,
    focal: f32,
}

impl Projector {
    fn project(&self, p: Vec3) -> Option<(f32, f32)> {
        let clip = self.view_proj * p.extend(1.0);
        if clip.w <= 1e-4 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some((
            (ndc.x + 1.0) * 0.5 * self.width,
            (1.0 - ndc.y) * 0.5 * self.height,
        ))
    }

    /// Screen-space radius of a world-space sphere centered at `p`.
    fn radius_at(&self, p: Vec3, radius: f32) -> f32 {
        let depth = (p - self.eye).length().max(1e-3);
        (radius * self.focal / depth).max(1.0)
    }
}

impl WireframeRenderer {
    pub fn new(width: u32, height: u32) -> ReelResult<Self> {
        if width == 0 || height == 0 {
            return Err(ReelError::InvalidConfiguration(format!(
                "frame size {}x{} is empty",
                width, height
            )));
        }
        Ok(Self {
            width,
            height,
            background: Color::BLACK,
        })
    }

    fn paint(material: &Material) -> Paint<'static> {
        let mut paint = Paint::default();
        let alpha = (material.opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        paint.set_color_rgba8(material.color.0, material.color.1, material.color.2, alpha);
        paint.anti_alias = true;
        paint
    }

    fn stroke_polyline(
        pixmap: &mut Pixmap,
        proj: &Projector,
        points: impl IntoIterator<Item = Vec3>,
        material: &Material,
    ) {
        let mut pb = PathBuilder::new();
        let mut pen_down = false;
        for p in points {
            match proj.project(p) {
                Some((x, y)) if pen_down => pb.line_to(x, y),
                Some((x, y)) => {
                    pb.move_to(x, y);
                    pen_down = true;
                }
                None => pen_down = false,
            }
        }
        if let Some(path) = pb.finish() {
            let stroke = Stroke {
                width: material.line_width.max(0.5),
                ..Stroke::default()
            };
            pixmap.stroke_path(&path, &Self::paint(material), &stroke, Transform::identity(), None);
        }
    }

    fn draw_segments(
        pixmap: &mut Pixmap,
        proj: &Projector,
        segments: impl IntoIterator<Item = (Vec3, Vec3)>,
        material: &Material,
    ) {
        let mut pb = PathBuilder::new();
        for (a, b) in segments {
            if let (Some(pa), Some(pb_)) = (proj.project(a), proj.project(b)) {
                pb.move_to(pa.0, pa.1);
                pb.line_to(pb_.0, pb_.1);
            }
        }
        if let Some(path) = pb.finish() {
            let stroke = Stroke {
                width: material.line_width.max(0.5),
                ..Stroke::default()
            };
            pixmap.stroke_path(&path, &Self::paint(material), &stroke, Transform::identity(), None);
        }
    }

    fn draw_sphere(pixmap: &mut Pixmap, proj: &Projector, node: &SceneNode, patch: &SpherePatch) {
        let point = |theta: f32, phi: f32| {
            node.position
                + patch.radius * Vec3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos())
        };
        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;

        for ring in 0..=SPHERE_RINGS {
            let theta = lerp(patch.theta_start, patch.theta_end, ring as f32 / SPHERE_RINGS as f32);
            let line = (0..=SPHERE_SEGMENTS).map(|s| {
                point(theta, lerp(patch.phi_start, patch.phi_end, s as f32 / SPHERE_SEGMENTS as f32))
            });
            Self::stroke_polyline(pixmap, proj, line, &node.material);
        }
        for meridian in 0..=SPHERE_MERIDIANS {
            let phi = lerp(patch.phi_start, patch.phi_end, meridian as f32 / SPHERE_MERIDIANS as f32);
            let line = (0..=SPHERE_SEGMENTS).map(|s| {
                point(lerp(patch.theta_start, patch.theta_end, s as f32 / SPHERE_SEGMENTS as f32), phi)
            });
            Self::stroke_polyline(pixmap, proj, line, &node.material);
        }
    }

    fn draw_sky(pixmap: &mut Pixmap, camera: &Camera, sky: &SkyTexture, opacity: f32) {
        let (w, h) = (pixmap.width(), pixmap.height());
        let forward = (camera.target - camera.position).normalize_or_zero();
        let right = forward.cross(camera.up).normalize_or_zero();
        let up = right.cross(forward);
        let tan_half = (0.5 * camera.fov_y.to_radians()).tan();
        let aspect = w as f32 / h as f32;
        let scale = |c: u8| (c as f32 * opacity).round() as u8;

        let data = pixmap.data_mut();
        for py in 0..h {
            let ndc_y = 1.0 - 2.0 * (py as f32 + 0.5) / h as f32;
            for px in 0..w {
                let ndc_x = 2.0 * (px as f32 + 0.5) / w as f32 - 1.0;
                let ray = forward + right * (ndc_x * tan_half * aspect) + up * (ndc_y * tan_half);
                let [r, g, b, _] = sky.sample(ray);
                let i = ((py * w + px) * 4) as usize;
                data[i..i + 4].copy_from_slice(&[scale(r), scale(g), scale(b), 255]);
            }
        }
    }

    fn draw_node(pixmap: &mut Pixmap, proj: &Projector, node: &SceneNode) {
        match &node.element {
            Element::Sky(_) => {}
            Element::Marker { radius } => {
                if let Some((x, y)) = proj.project(node.position) {
                    let r = proj.radius_at(node.position, *radius);
                    if let Some(path) = PathBuilder::from_circle(x, y, r) {
                        pixmap.fill_path(
                            &path,
                            &Self::paint(&node.material),
                            FillRule::Winding,
                            Transform::identity(),
                            None,
                        );
                    }
                }
            }
            Element::Trail(trail) => {
                let offset = node.position;
                Self::stroke_polyline(
                    pixmap,
                    proj,
                    trail.ordered_points().into_iter().map(|p| p + offset),
                    &node.material,
                );
            }
            Element::Polyline(points) => {
                let offset = node.position;
                Self::stroke_polyline(pixmap, proj, points.iter().map(|&p| p + offset), &node.material);
            }
            Element::Sphere(patch) => Self::draw_sphere(pixmap, proj, node, patch),
            Element::Mesh { mesh, rotation_z } => {
                let rot = Quat::from_rotation_z(*rotation_z);
                let world = |i: u32| node.position + rot * mesh.vertices[i as usize];
                Self::draw_segments(
                    pixmap,
                    proj,
                    mesh.edges.iter().map(|&(a, b)| (world(a), world(b))),
                    &node.material,
                );
            }
            Element::Cube { size } => {
                let h = size * 0.5;
                let corner = |i: usize| {
                    node.position
                        + Vec3::new(
                            if i & 1 == 0 { -h } else { h },
                            if i & 2 == 0 { -h } else { h },
                            if i & 4 == 0 { -h } else { h },
                        )
                };
                let edges = (0..8usize).flat_map(|i| {
                    [1usize, 2, 4]
                        .into_iter()
                        .filter(move |bit| i & bit == 0)
                        .map(move |bit| (i, i | bit))
                });
                Self::draw_segments(pixmap, proj, edges.map(|(a, b)| (corner(a), corner(b))), &node.material);
            }
        }
    }
}

impl Renderer for WireframeRenderer {
    fn render(&mut self, stage: &Stage) -> ReelResult<Frame> {
        let mut pixmap = Pixmap::new(self.width, self.height).ok_or_else(|| {
            ReelError::InvalidConfiguration(format!("cannot allocate {}x{} frame", self.width, self.height))
        })?;
        pixmap.fill(self.background);

        for (_, node) in stage.scene.iter() {
            if let Element::Sky(sky) = &node.element {
                if node.visible {
                    let opacity = node.material.opacity.clamp(0.0, 1.0);
                    Self::draw_sky(&mut pixmap, &stage.camera, sky, opacity);
                }
            }
        }

        let aspect = self.width as f32 / self.height as f32;
        let proj = Projector {
            view_proj: stage.camera.view_projection(aspect),
            width: self.width as f32,
            height: self.height as f32,
            eye: stage.camera.position,
            focal: 0.5 * self.height as f32 / (0.5 * stage.camera.fov_y.to_radians()).tan(),
        };

        for (_, node) in stage.scene.iter() {
            if node.visible && node.material.opacity > 0.0 {
                Self::draw_node(&mut pixmap, &proj, node);
            }
        }

        Ok(Frame {
            index: stage.global_frame,
            width: self.width,
            height: self.height,
            // Opaque background keeps premultiplied and straight alpha identical.
            rgba: pixmap.take(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Lifetime, Rgb};

    #[test]
    fn empty_size_is_rejected() {
        assert!(WireframeRenderer::new(0, 10).is_err());
    }

    #[test]
    fn frame_has_expected_layout() {
        let mut renderer = WireframeRenderer::new(32, 16).unwrap();
        let stage = Stage::new(60);
        let frame = renderer.render(&stage).unwrap();

        assert_eq!(frame.rgba.len(), 32 * 16 * 4);
        assert!(frame.rgba.chunks(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn marker_in_front_of_camera_lights_center_pixel() {
        let mut renderer = WireframeRenderer::new(64, 64).unwrap();
        let mut stage = Stage::new(60);
        stage.camera.position = Vec3::new(0.0, -10.0, 0.0);
        stage.spawn(
            Element::Marker { radius: 1.0 },
            Material::solid(Rgb::RED),
            Vec3::ZERO,
            Lifetime::Static,
        );

        let frame = renderer.render(&stage).unwrap();
        let center = ((32 * 64 + 32) * 4) as usize;
        assert_eq!(&frame.rgba[center..center + 4], &[255, 0, 0, 255]);
    }

    #[test]
    fn sky_fills_background_under_markers() {
        let mut renderer = WireframeRenderer::new(64, 64).unwrap();
        let mut stage = Stage::new(60);
        stage.camera.position = Vec3::new(0.0, -10.0, 0.0);
        let sky = SkyTexture::from_rgba(2, 2, [10, 20, 30, 255].repeat(4)).unwrap();
        stage.spawn(
            Element::Marker { radius: 1.0 },
            Material::solid(Rgb::RED),
            Vec3::ZERO,
            Lifetime::Static,
        );
        stage.spawn(
            Element::Sky(std::sync::Arc::new(sky)),
            Material::solid(Rgb::WHITE),
            Vec3::ZERO,
            Lifetime::Static,
        );

        let frame = renderer.render(&stage).unwrap();
        assert_eq!(&frame.rgba[0..4], &[10, 20, 30, 255]);
        let center = ((32 * 64 + 32) * 4) as usize;
        assert_eq!(&frame.rgba[center..center + 4], &[255, 0, 0, 255]);
    }

    #[test]
    fn hidden_nodes_are_skipped() {
        let mut renderer = WireframeRenderer::new(64, 64).unwrap();
        let mut stage = Stage::new(60);
        stage.camera.position = Vec3::new(0.0, -10.0, 0.0);
        let id = stage.spawn(
            Element::Marker { radius: 1.0 },
            Material::solid(Rgb::RED),
            Vec3::ZERO,
            Lifetime::Static,
        );
        stage.scene.get_node_mut(id).unwrap().visible = false;

        let frame = renderer.render(&stage).unwrap();
        assert!(frame.rgba.chunks(4).all(|px| px == [0, 0, 0, 255]));
    }
}
