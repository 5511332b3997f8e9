//! # say-rs
//!
//! A Rust library that turns a text document into a numbered sequence of
//! speech audio files using a remote synthesis service.
//!
//! ## Features
//!
//! - **Segmentation**: splits text into request-sized, SSML-escaped chunks
//! - **Concurrent dispatch**: a fixed pool of workers synthesizes chunks in parallel,
//!   retrying rejected chunks sentence by sentence
//! - **Ordered output**: files are named by chunk position, not completion order
//! - **Amazon Polly**: backend built on the AWS SDK (feature `polly`, on by default)
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use say::{engines::polly::{PollyBackend, PollyConfig}, Pipeline, PipelineConfigBuilder};
//!
//! let backend = PollyBackend::new(PollyConfig::default())?;
//! let config = PipelineConfigBuilder::default().workers(4usize).build()?;
//! let summary = Pipeline::new(config, Arc::new(backend)).run("Hello, world!")?;
//! println!("Wrote {} files", summary.files.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod engines;
pub mod error;
pub mod markup;
pub mod output;
pub mod pipeline;
pub mod playback;
pub mod pool;
pub mod report;
pub mod segment;

use std::fmt;
use std::io::Read;

pub use error::{BackendError, SayError, SegmentError};
pub use output::OutputWriter;
pub use pipeline::{Pipeline, PipelineConfig, PipelineConfigBuilder};
pub use pool::{DispatchPool, Failure, FailureKind, OutputFile, PoolSummary};
pub use report::{LogReporter, Reporter};
pub use segment::{segment, Chunk};

/// Audio bytes returned by a backend. Dropping the stream closes it.
pub type AudioStream = Box<dyn Read + Send>;

/// Audio produced for one output position.
///
/// Ownership of the stream passes to the [`OutputWriter`], which consumes it
/// completely before closing it.
pub struct SynthesisResult {
    /// Output file index the audio belongs to
    pub index: usize,
    /// Encoded audio (mp3 for Polly)
    pub stream: AudioStream,
}

impl SynthesisResult {
    pub fn new(index: usize, stream: AudioStream) -> Self {
        Self { index, stream }
    }
}

impl fmt::Debug for SynthesisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisResult")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

/// Common interface for remote text-to-speech services.
///
/// A backend is built once and then shared read-only by every pool worker, so
/// `synthesize` takes `&self` and implementations must be `Send + Sync`.
pub trait SynthesisBackend: Send + Sync {
    /// Synthesize one markup-wrapped request.
    ///
    /// Any error is treated by the pool as retryable once, by sentence.
    fn synthesize(&self, markup: &str) -> Result<AudioStream, BackendError>;
}
