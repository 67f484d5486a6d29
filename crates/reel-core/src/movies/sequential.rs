//! Rays that play one after another: each is padded with its first sample
//! until the previous ones have finished and with its last sample while the
//! following ones run.

use super::{add_scenery, follow_camera, ray_styles, MovieResources};
use crate::clip::Clip;
use crate::config::MovieConfig;
use crate::driver::CameraMotion;
use crate::errors::ReelResult;
use crate::playback::TrajectoryPlayback;
use crate::stage::Stage;
use crate::trajectory::{crossing_indices, pad_sequential};
use tracing::debug;

pub(super) fn build(
    config: &MovieConfig,
    resources: &MovieResources,
    stage: &mut Stage,
    step: usize,
) -> ReelResult<(Vec<Box<dyn Clip>>, CameraMotion)> {
    add_scenery(config, stage);

    let lengths: Vec<usize> = resources.rays.iter().map(|t| t.len()).collect();
    for (i, end) in crossing_indices(&lengths).into_iter().enumerate() {
        debug!("Ray {} finishes at sample {}", i + 1, end);
    }

    let rays = pad_sequential(&resources.rays);
    let styles = ray_styles(config, rays.len());
    let playback = TrajectoryPlayback::new("sequential-rays", rays, styles, step)?;
    let camera = follow_camera(config, resources, step)?;
    Ok((vec![Box::new(playback)], camera))
}
