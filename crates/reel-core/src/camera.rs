//! # Camera
//!
//! Look-at camera with +z up, plus the spherical helpers clips use to orbit,
//! descend and climb around the black hole.

use glam::{Mat4, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spherical {
    pub r: f32,
    /// Polar angle from +z.
    pub theta: f32,
    /// Azimuth from +x.
    pub phi: f32,
}

pub fn cartesian_to_spherical(p: Vec3) -> Spherical {
    let r = p.length();
    let theta = if r > 0.0 { (p.z / r).clamp(-1.0, 1.0).acos() } else { 0.0 };
    Spherical {
        r,
        theta,
        phi: p.y.atan2(p.x),
    }
}

pub fn spherical_to_cartesian(s: Spherical) -> Vec3 {
    Vec3::new(
        s.r * s.theta.sin() * s.phi.cos(),
        s.r * s.theta.sin() * s.phi.sin(),
        s.r * s.theta.cos(),
    )
}

#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, -50.0, 20.0),
            target: Vec3::ZERO,
            up: Vec3::Z,
            fov_y: 75.0,
            near: 0.1,
            far: 5000.0,
        }
    }
}

impl Camera {
    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn spherical(&self) -> Spherical {
        cartesian_to_spherical(self.position)
    }

    /// Rotates the camera about the z axis by `dphi` at constant r and theta.
    pub fn orbit(&mut self, dphi: f32) {
        let mut s = self.spherical();
        s.phi += dphi;
        self.position = spherical_to_cartesian(s);
    }

    pub fn raise(&mut self, dz: f32) {
        self.position.z += dz;
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        let proj = Mat4::perspective_rh(self.fov_y.to_radians(), aspect, self.near, self.far);
        let view = Mat4::look_at_rh(self.position, self.target, self.up);
        proj * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn spherical_round_trip_preserves_point() {
        let p = Vec3::new(3.0, -4.0, 12.0);
        let back = spherical_to_cartesian(cartesian_to_spherical(p));
        assert!((back - p).length() < 1e-4);
    }

    #[test]
    fn orbit_keeps_radius_and_height() {
        let mut cam = Camera {
            position: Vec3::new(30.0, 0.0, 10.0),
            ..Camera::default()
        };
        cam.orbit(FRAC_PI_2);

        assert!((cam.position.length() - Vec3::new(30.0, 0.0, 10.0).length()).abs() < 1e-3);
        assert!((cam.position.z - 10.0).abs() < 1e-3);
        assert!((cam.position.y - 30.0).abs() < 1e-3);
    }

    #[test]
    fn origin_is_projected_to_screen_center() {
        let cam = Camera {
            position: Vec3::new(0.0, -10.0, 0.0),
            ..Camera::default()
        };
        let clip = cam.view_projection(16.0 / 9.0) * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!((cartesian_to_spherical(Vec3::new(0.0, 0.0, -1.0)).theta - PI).abs() < 1e-6);
    }
}
