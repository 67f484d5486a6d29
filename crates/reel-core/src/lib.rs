//! # Reel Core
//!
//! Plays precomputed light-ray trajectories around a black hole as looping,
//! multi-clip movies.
//!
//! ## Layout
//! - `trail`, `trajectory`, `mesh`: data the movies are made of.
//! - `scene`, `stage`, `camera`, `sky`: what gets drawn and from where.
//! - `clip`, `sequencer`, `playback`, `tracker`: clips and their scheduling.
//! - `render`, `capture`, `driver`: turning ticks into frames and files.
//! - `config`, `movies`: the built-in movie variants.

pub mod animation;
pub mod assets;
pub mod camera;
pub mod capture;
pub mod clip;
pub mod config;
pub mod driver;
pub mod errors;
pub mod mesh;
pub mod movies;
pub mod playback;
pub mod render;
pub mod scene;
pub mod sequencer;
pub mod sky;
pub mod stage;
pub mod tracker;
pub mod trail;
pub mod trajectory;

pub use assets::{AssetLoader, DefaultAssetLoader};
pub use clip::{Clip, FrameBudget};
pub use config::{MovieConfig, MovieVariant, RuntimeConfig};
pub use driver::{CameraMotion, DriverState, FixedRateScheduler, RenderDriver};
pub use errors::{ReelError, ReelResult};
pub use movies::{build_movie, Movie, MovieResources};
pub use sequencer::ClipSequencer;
pub use stage::Stage;
pub use trail::{TrailBuffer, TrailPolicy};
pub use trajectory::Trajectory;
