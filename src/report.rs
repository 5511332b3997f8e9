//! Progress and failure reporting for the dispatch pool.

use std::io;
use std::path::Path;

use crate::error::BackendError;

/// Receives events from pool workers.
///
/// Implementations are shared by every worker and must be thread-safe. All
/// methods default to doing nothing so callers only override what they need.
pub trait Reporter: Send + Sync {
    /// A whole chunk was rejected and is being retried sentence by sentence.
    fn chunk_failed(&self, _index: usize, _text: &str, _error: &BackendError) {}

    /// A single sentence failed during retry; its audio is omitted.
    fn sentence_failed(&self, _index: usize, _sentence: &str, _error: &BackendError) {}

    fn written(&self, _index: usize, _path: &Path, _bytes: u64, _total: u64) {}

    fn write_failed(&self, _index: usize, _path: &Path, _error: &io::Error) {}
}

/// Forwards pool events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn chunk_failed(&self, index: usize, text: &str, error: &BackendError) {
        log::error!("Chunk {index} failed, retrying by sentence: {error}\n{text}");
    }

    fn sentence_failed(&self, index: usize, sentence: &str, error: &BackendError) {
        log::error!("Sentence from chunk {index} dropped: {error}\n{sentence}");
    }

    fn written(&self, _index: usize, path: &Path, bytes: u64, total: u64) {
        log::info!("{}: {bytes} bytes / {total} bytes", path.display());
    }

    fn write_failed(&self, index: usize, path: &Path, error: &io::Error) {
        log::error!("Writing chunk {index} to {} failed: {error}", path.display());
    }
}
