//! Wires the segmenter, the dispatch pool and the output writer together.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use derive_builder::Builder;

use crate::error::SayError;
use crate::markup::{Envelope, DEFAULT_RATE};
use crate::output::{OutputWriter, DEFAULT_EXTENSION};
use crate::pool::{
    DispatchPool, PoolOptions, PoolSummary, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS,
};
use crate::report::{LogReporter, Reporter};
use crate::segment::{segment, DEFAULT_BUDGET};
use crate::SynthesisBackend;

/// Settings for one conversion run.
///
/// ```
/// use say::PipelineConfigBuilder;
///
/// let config = PipelineConfigBuilder::default()
///     .workers(8)
///     .prefix("chapter1")
///     .build()
///     .unwrap();
/// assert_eq!(config.budget, 1500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(default, build_fn(validate = "Self::validate"))]
pub struct PipelineConfig {
    /// Every chunk stays strictly below this many characters.
    pub budget: usize,
    pub workers: usize,
    pub queue_capacity: usize,
    /// Prosody rate applied to every request
    #[builder(setter(into))]
    pub rate: String,
    #[builder(setter(into))]
    pub out_dir: PathBuf,
    /// Prepended to the zero-padded file index
    #[builder(setter(into))]
    pub prefix: String,
    #[builder(setter(into))]
    pub extension: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            budget: DEFAULT_BUDGET,
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            rate: DEFAULT_RATE.to_string(),
            out_dir: PathBuf::from("."),
            prefix: String::new(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl PipelineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.budget == Some(0) {
            return Err("budget must be positive".to_string());
        }
        if self.workers == Some(0) {
            return Err("worker count must be at least 1".to_string());
        }
        Ok(())
    }
}

impl From<PipelineConfigBuilderError> for SayError {
    fn from(err: PipelineConfigBuilderError) -> Self {
        SayError::Config(err.to_string())
    }
}

/// Segment, dispatch, drain.
pub struct Pipeline {
    config: PipelineConfig,
    backend: Arc<dyn SynthesisBackend>,
    reporter: Arc<dyn Reporter>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, backend: Arc<dyn SynthesisBackend>) -> Self {
        Self {
            config,
            backend,
            reporter: Arc::new(LogReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The writer this pipeline produces files with.
    pub fn writer(&self) -> OutputWriter {
        OutputWriter::new(&self.config.out_dir)
            .with_prefix(&self.config.prefix)
            .with_extension(&self.config.extension)
    }

    /// Convert `text` and return once every worker has exited.
    ///
    /// Segmentation runs to completion before any request is sent, so an
    /// unsegmentable document fails without producing files. Empty chunks are
    /// dropped before numbering so file indices stay contiguous from 0.
    ///
    /// Failed fragments are listed in the summary. Only a document that is a
    /// single chunk which cannot be split further turns into an error.
    pub fn run(&self, text: &str) -> Result<PoolSummary, SayError> {
        let chunks: Vec<String> = segment(text, self.config.budget)?
            .into_iter()
            .filter(|chunk| !chunk.is_empty())
            .collect();
        log::info!(
            "Dispatching {} chunks to {} workers",
            chunks.len(),
            self.config.workers
        );

        let options = PoolOptions {
            workers: self.config.workers,
            queue_capacity: self.config.queue_capacity,
            envelope: Envelope::with_rate(&self.config.rate),
            reporter: Arc::clone(&self.reporter),
        };
        let writer = Arc::new(self.writer());
        let pool = DispatchPool::spawn(Arc::clone(&self.backend), writer, options)?;
        pool.say_all(chunks)?;
        let summary = pool.close()?;

        log::info!(
            "Wrote {} files ({} bytes), {} fragments failed",
            summary.files.len(),
            summary.bytes,
            summary.failures.len()
        );
        summary.into_result()
    }

    pub fn run_file(&self, path: &Path) -> Result<PoolSummary, SayError> {
        let text = std::fs::read_to_string(path)?;
        log::info!("Finished reading {}", path.display());
        self.run(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::{Pipeline, PipelineConfig, PipelineConfigBuilder};
    use crate::error::{BackendError, SayError, SegmentError};
    use crate::{AudioStream, SynthesisBackend};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl SynthesisBackend for Counting {
        fn synthesize(&self, markup: &str) -> Result<AudioStream, BackendError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Cursor::new(markup.as_bytes().to_vec())))
        }
    }

    fn config_in(dir: &std::path::Path) -> PipelineConfig {
        PipelineConfigBuilder::default()
            .out_dir(dir)
            .rate("1.3")
            .budget(30)
            .workers(2)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_fills_defaults() {
        let config = PipelineConfigBuilder::default().build().unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.workers, 4);
        assert_eq!(config.queue_capacity, 1);
        assert_eq!(config.extension, "mp3");
    }

    #[test]
    fn builder_rejects_zero_budget_and_workers() {
        assert!(PipelineConfigBuilder::default().budget(0).build().is_err());
        let err: SayError = PipelineConfigBuilder::default()
            .workers(0)
            .build()
            .unwrap_err()
            .into();
        assert!(matches!(err, SayError::Config(_)));
    }

    #[test]
    fn wraps_each_chunk_in_the_configured_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(Counting::default());
        let pipeline = Pipeline::new(config_in(dir.path()), backend.clone());

        let summary = pipeline.run("First line.\nSecond line & more.").unwrap();
        assert_eq!(summary.files.len(), 2);
        assert_eq!(backend.0.load(Ordering::SeqCst), 2);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("0001.mp3")).unwrap(),
            "<speak><prosody rate='1.3'>Second line &amp; more.\n</prosody></speak>"
        );
    }

    #[test]
    fn empty_document_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(Counting::default());
        let pipeline = Pipeline::new(config_in(dir.path()), backend.clone());

        let summary = pipeline.run("\n\n").unwrap();
        assert!(summary.files.is_empty());
        assert_eq!(backend.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsegmentable_document_stops_before_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(Counting::default());
        let pipeline = Pipeline::new(config_in(dir.path()), backend.clone());

        let err = pipeline.run(&"word ".repeat(20)).unwrap_err();
        assert!(matches!(
            err,
            SayError::Segment(SegmentError::SentenceTooLong { .. })
        ));
        assert_eq!(backend.0.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn oversized_opening_paragraph_still_starts_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfigBuilder::default()
            .out_dir(dir.path())
            .budget(20)
            .build()
            .unwrap();
        let pipeline = Pipeline::new(config, Arc::new(Counting::default()));

        let summary = pipeline
            .run("First sentence. Second sentence.\nShort")
            .unwrap();
        let indices: Vec<usize> = summary.files.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(pipeline.writer().sequential_files().len(), 3);
    }

    #[test]
    fn reads_documents_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("doc.txt");
        std::fs::write(&input, "Just one line.").unwrap();

        let config = PipelineConfigBuilder::default()
            .out_dir(dir.path())
            .prefix("doc")
            .build()
            .unwrap();
        let pipeline = Pipeline::new(config, Arc::new(Counting::default()));
        let summary = pipeline.run_file(&input).unwrap();
        assert_eq!(summary.paths(), vec![dir.path().join("doc0000.mp3")]);
    }
}
