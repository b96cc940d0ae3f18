// src/error.rs

use thiserror::Error;

/// Domain failures. Plumbing code wraps these in `anyhow::Error`;
/// callers that care can `downcast_ref::<EnhancerError>()`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnhancerError {
    #[error("no default audio track in {path}")]
    NoAudioTrack { path: String },

    #[error("missing sample rate in {path}")]
    MissingSampleRate { path: String },

    #[error("missing channel layout in {path}")]
    MissingChannels { path: String },

    #[error("no output device available")]
    NoOutputDevice,

    #[error("unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("unknown spatial preset: {0:?} (expected 4, 6 or 8)")]
    UnknownPreset(String),

    #[error("unknown render step: {0:?}")]
    UnknownRenderStep(String),

    #[error("recorder is not running")]
    RecorderNotRunning,

    #[error("recorder collector thread panicked")]
    CollectorPanicked,

    #[error("invalid config value: {field} = {value}")]
    InvalidConfig { field: &'static str, value: f64 },
}
