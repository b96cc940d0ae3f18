// src/lib.rs

pub mod app;
pub mod audio;
pub mod config;
pub mod controller;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod graph;
pub mod orbit;
pub mod recorder;
pub mod render;
pub mod session;
pub mod source;

pub use config::EnhancerConfig;
pub use controller::EffectController;
pub use error::EnhancerError;
pub use graph::{PanningModel, Position, SpatialPreset};
pub use recorder::{Recorder, RecordingArtifact};
pub use render::{render_file, RenderPlan};
pub use session::AudioSession;
pub use source::{BufferSource, SampleSource, StreamingSource};
