use std::path::PathBuf;

/// Errors raised while cutting a document into request-sized chunks.
#[derive(thiserror::Error, Debug)]
pub enum SegmentError {
    #[error("Segment budget must be positive, got {0}")]
    InvalidBudget(usize),
    #[error("sentence is too long for a single request ({len} chars, budget {budget}): {sentence:?}")]
    SentenceTooLong {
        sentence: String,
        len: usize,
        budget: usize,
    },
}

/// Errors returned by a synthesis backend for a single request.
///
/// The variants follow the error codes the Polly service reports, so the
/// reporter can name what went wrong with the offending fragment.
#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("Text length exceeded: {0}")]
    TextLengthExceeded(String),
    #[error("Invalid SSML: {0}")]
    InvalidSsml(String),
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(String),
    #[error("Service failure: {0}")]
    ServiceFailure(String),
    #[error("Request throttled: {0}")]
    Throttled(String),
    #[error("Lexicon not found: {0}")]
    LexiconNotFound(String),
    #[error("Speech marks not supported: {0}")]
    MarksNotSupported(String),
    #[error("Request rejected: {0}")]
    Rejected(String),
    #[error("Request did not reach the service: {0}")]
    Transport(String),
    #[error("No usable credentials: {0}")]
    Credentials(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-level error for configuration, coordination and escalated failures.
#[derive(thiserror::Error, Debug)]
pub enum SayError {
    #[error(transparent)]
    Segment(#[from] SegmentError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Failed to parse configuration file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Backend unavailable: {0}")]
    Backend(#[from] BackendError),
    #[error("Dispatch pool is closed, no worker is left to take chunk {0}")]
    PoolClosed(usize),
    #[error("Worker {0} panicked")]
    WorkerPanicked(String),
    #[error("Chunk {index} could not be synthesized ({source}): {text:?}")]
    Synthesis {
        index: usize,
        text: String,
        #[source]
        source: BackendError,
    },
}
