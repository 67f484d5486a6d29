//! Every ray stepped together by one fixed clip while the camera flies its
//! own path. With a keyframe mesh loaded (the embedding diagram) the first
//! one is shown as static scenery.

use super::{add_scenery, follow_camera, ray_styles, MovieResources};
use crate::clip::Clip;
use crate::config::MovieConfig;
use crate::driver::CameraMotion;
use crate::errors::ReelResult;
use crate::playback::TrajectoryPlayback;
use crate::scene::{Element, Lifetime, Material, Rgb};
use crate::stage::Stage;
use glam::Vec3;
use tracing::warn;

pub(super) fn build(
    config: &MovieConfig,
    resources: &MovieResources,
    stage: &mut Stage,
    step: usize,
) -> ReelResult<(Vec<Box<dyn Clip>>, CameraMotion)> {
    add_scenery(config, stage);

    if !config.mesh_paths.is_empty() {
        match resources.meshes.first() {
            Some((_, mesh)) => {
                stage.spawn(
                    Element::Mesh {
                        mesh: mesh.clone(),
                        rotation_z: 0.0,
                    },
                    Material::line(Rgb::WHITE, 1.0).with_opacity(0.6),
                    Vec3::ZERO,
                    Lifetime::Static,
                );
            }
            None => warn!("No surface mesh loaded; playing rays without it"),
        }
    }

    let styles = ray_styles(config, resources.rays.len());
    let playback = TrajectoryPlayback::new("lockstep-rays", resources.rays.clone(), styles, step)?;
    let camera = follow_camera(config, resources, step)?;
    Ok((vec![Box::new(playback)], camera))
}
