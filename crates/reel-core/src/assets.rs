//! # Asset Loading
//!
//! Startup resource fetching.
//!
//! ## Responsibilities
//! - **AssetLoader**: Seam that resolves a resource path to bytes.
//! - **Trajectory Batch**: All CSVs are fetched concurrently; results keep the
//!   order of the requested paths and one failure fails the batch.
//! - **Keyframe Batch**: OBJ keyframes load one after the other in ascending
//!   order; each slot carries its own `Result` so callers decide what a
//!   missing keyframe means.
//! - **Sky**: One panorama image, decoded up front.

use crate::errors::{ReelError, ReelResult};
use crate::mesh::Mesh;
use crate::sky::SkyTexture;
use crate::trajectory::{CsvTable, Trajectory};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Resolves resource paths to raw bytes.
pub trait AssetLoader: Send + Sync {
    fn load_bytes(&self, path: &str) -> anyhow::Result<Vec<u8>>;
}

/// Reads resources from the filesystem relative to `root`.
#[derive(Clone, Debug, Default)]
pub struct DefaultAssetLoader {
    pub root: PathBuf,
}

impl DefaultAssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetLoader for DefaultAssetLoader {
    fn load_bytes(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        let full = self.root.join(path);
        std::fs::read(&full).map_err(|e| anyhow::anyhow!("{}: {}", full.display(), e))
    }
}

fn load_text(loader: &dyn AssetLoader, path: &str) -> ReelResult<String> {
    let bytes = loader
        .load_bytes(path)
        .map_err(|source| ReelError::ResourceFetch {
            path: path.to_string(),
            source,
        })?;
    String::from_utf8(bytes).map_err(|e| ReelError::ResourceFetch {
        path: path.to_string(),
        source: e.into(),
    })
}

/// Fetches and parses every CSV in `paths` concurrently.
///
/// The returned tables are index-aligned with `paths` regardless of the
/// order in which individual fetches complete.
pub fn fetch_tables(loader: &dyn AssetLoader, paths: &[String]) -> ReelResult<Vec<CsvTable>> {
    info!("Fetching {} CSV resources", paths.len());
    paths
        .par_iter()
        .map(|path| {
            let text = load_text(loader, path)?;
            let table = CsvTable::parse(path, &text)?;
            debug!("Fetched {} ({} rows)", path, table.len());
            Ok(table)
        })
        .collect()
}

/// Fetches a batch of trajectories; see [`fetch_tables`].
pub fn fetch_trajectories(
    loader: &dyn AssetLoader,
    paths: &[String],
) -> ReelResult<Vec<Arc<Trajectory>>> {
    fetch_tables(loader, paths)?
        .iter()
        .map(|table| Trajectory::from_table(table).map(Arc::new))
        .collect()
}

/// Loads OBJ meshes sequentially. Never fails as a whole.
pub fn load_meshes(loader: &dyn AssetLoader, paths: &[String]) -> Vec<ReelResult<Mesh>> {
    paths
        .iter()
        .map(|path| {
            debug!("Loading mesh {}", path);
            let text = load_text(loader, path)?;
            Mesh::parse_obj(path, &text)
        })
        .collect()
}

pub fn load_sky(loader: &dyn AssetLoader, path: &str) -> ReelResult<SkyTexture> {
    let bytes = loader
        .load_bytes(path)
        .map_err(|source| ReelError::ResourceFetch {
            path: path.to_string(),
            source,
        })?;
    let sky = SkyTexture::decode(path, &bytes)?;
    debug!("Loaded sky {} ({}x{})", path, sky.width(), sky.height());
    Ok(sky)
}

/// Keeps the meshes that loaded, logging and dropping the rest.
///
/// Each survivor is paired with its index in the request, so data aligned
/// with the request (spin values, ...) still lines up.
pub fn surviving_meshes(
    paths: &[String],
    results: Vec<ReelResult<Mesh>>,
) -> Vec<(usize, Arc<Mesh>)> {
    let requested = results.len();
    let meshes: Vec<(usize, Arc<Mesh>)> = paths
        .iter()
        .zip(results)
        .enumerate()
        .filter_map(|(idx, (path, result))| match result {
            Ok(mesh) => Some((idx, Arc::new(mesh))),
            Err(e) => {
                error!("Error loading {}: {}", path, e);
                None
            }
        })
        .collect();

    if meshes.len() < requested {
        info!("Loaded {} of {} keyframes", meshes.len(), requested);
    }
    meshes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MapLoader {
        files: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl MapLoader {
        fn new(files: &[(&str, &str)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl AssetLoader for MapLoader {
        fn load_bytes(&self, path: &str) -> anyhow::Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.files
                .get(path)
                .map(|s| s.clone().into_bytes())
                .ok_or_else(|| anyhow::anyhow!("File not found"))
        }
    }

    fn paths(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn batch_keeps_request_order() {
        let files: Vec<(String, String)> = (0..32)
            .map(|i| (format!("ray{}.csv", i), format!("{},0,0", i)))
            .collect();
        let refs: Vec<(&str, &str)> = files.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
        let loader = MapLoader::new(&refs);

        let requested: Vec<String> = files.iter().map(|(p, _)| p.clone()).collect();
        let trajectories = fetch_trajectories(&loader, &requested).unwrap();

        for (i, traj) in trajectories.iter().enumerate() {
            assert_eq!(traj.position(0).unwrap().x, i as f32);
        }
    }

    #[test]
    fn one_missing_csv_fails_the_batch() {
        let loader = MapLoader::new(&[("a.csv", "0,0,0")]);
        let err = fetch_tables(&loader, &paths(&["a.csv", "missing.csv"])).unwrap_err();
        match err {
            ReelError::ResourceFetch { path, .. } => assert_eq!(path, "missing.csv"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn mesh_batch_is_index_aligned_and_lenient() {
        let loader = MapLoader::new(&[
            ("k1.obj", "v 0 0 0\nv 1 0 0\nl 1 2\n"),
            ("k3.obj", "v 0 0 0\n"),
        ]);
        let requested = paths(&["k1.obj", "k2.obj", "k3.obj"]);

        let results = load_meshes(&loader, &requested);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
        assert_eq!(loader.calls.load(Ordering::SeqCst), 3);

        let kept = surviving_meshes(&requested, results);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].1.edges.len(), 1);
        assert_eq!(kept[1].0, 2);
    }

    #[test]
    fn sky_errors_name_the_path() {
        let loader = MapLoader::new(&[("sky.jpg", "not an image")]);
        assert!(matches!(
            load_sky(&loader, "sky.jpg"),
            Err(ReelError::Parse { path, .. }) if path == "sky.jpg"
        ));
        assert!(matches!(
            load_sky(&loader, "other.jpg"),
            Err(ReelError::ResourceFetch { path, .. }) if path == "other.jpg"
        ));
    }

    #[test]
    fn default_loader_reads_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("camera.csv"), "1,2,3\n").unwrap();

        let loader = DefaultAssetLoader::new(dir.path());
        let bytes = loader.load_bytes("camera.csv").unwrap();
        assert_eq!(bytes, b"1,2,3\n");
        assert!(loader.load_bytes("nope.csv").is_err());
    }
}
