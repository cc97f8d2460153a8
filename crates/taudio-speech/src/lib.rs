//! Document-to-speech pipeline for taudio.
//!
//! This crate owns everything between a user submission and a replayable
//! audio file:
//!
//! - [`pipeline`] — the orchestrator state machine
//!   (`analyzing → generating → ready | error`) with simulated progress,
//!   classified failure handling, and the quota-triggered system-voice
//!   fallback
//! - [`wav`] / [`codec`] / [`pcm`] — the PCM container encoder, the base64
//!   payload decoder, and the float-sample decoder for playback
//! - [`text`] — document chunking and fallback titling
//! - [`progress`] — the injectable progress estimator and its
//!   abort-on-drop phase ticker
//! - [`remote`] — the HTTP implementation of the speech service port
//!
//! The pipeline reaches persistence and the remote service only through the
//! `taudio-core` port traits, so tests drive it entirely with in-memory
//! mocks (see `tests/pipeline_state_machine.rs`).

pub mod codec;
pub mod error;
pub mod pcm;
pub mod pipeline;
pub mod progress;
pub mod remote;
pub mod text;
pub mod wav;

// Re-export key types for convenience
pub use codec::DecodeError;
pub use error::{PipelineError, RetryError};
pub use pcm::FloatBuffer;
pub use pipeline::{
    PipelineConfig, PipelineEvent, SourceInput, SpeechPipeline, SubmitRequest,
};
pub use progress::{LinearRamp, PhaseBounds, ProgressEstimator, ProgressTicker};
pub use remote::{HttpSpeechClient, HttpSpeechClientConfig};
