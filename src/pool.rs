//! Bounded concurrent dispatch of chunks to a synthesis backend.
//!
//! A fixed set of worker threads drains one shared FIFO queue. Chunks are
//! submitted in document order but finish in any order; output files are
//! keyed by chunk index so the order is restored on disk.
//!
//! When the backend rejects a chunk, the worker retries it once per sentence.
//! The first sentence that succeeds keeps the chunk's own index, later ones
//! take fresh indices from a shared counter that already sits past every
//! submitted chunk, so retried audio is appended and never collides.
//!
//! A failed chunk never stops its siblings. Only a batch made of a single
//! chunk that cannot be split any further is marked as escalated.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use crate::error::{BackendError, SayError};
use crate::markup::{split_sentences, Envelope};
use crate::output::OutputWriter;
use crate::report::{LogReporter, Reporter};
use crate::segment::Chunk;
use crate::{SynthesisBackend, SynthesisResult};

/// Worker threads used when the caller does not choose.
pub const DEFAULT_WORKERS: usize = 4;

/// Chunks buffered between the producer and the workers.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1;

/// Tuning and collaborators for a [`DispatchPool`].
#[derive(Clone)]
pub struct PoolOptions {
    pub workers: usize,
    pub queue_capacity: usize,
    pub envelope: Envelope,
    pub reporter: Arc<dyn Reporter>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            envelope: Envelope::default(),
            reporter: Arc::new(LogReporter),
        }
    }
}

#[derive(Debug)]
pub enum FailureKind {
    Synthesis(BackendError),
    Write(io::Error),
}

/// A fragment whose audio is missing from the output.
#[derive(Debug)]
pub struct Failure {
    /// Index of the chunk the fragment came from
    pub index: usize,
    /// The offending text fragment
    pub text: String,
    pub kind: FailureKind,
    /// The batch was this one unsplittable chunk, so nothing was produced.
    pub escalated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub index: usize,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Outcome of a drained pool. Files and failures are sorted by index.
#[derive(Debug, Default)]
pub struct PoolSummary {
    pub files: Vec<OutputFile>,
    pub failures: Vec<Failure>,
    pub bytes: u64,
}

impl PoolSummary {
    pub fn paths(&self) -> Vec<&Path> {
        self.files.iter().map(|f| f.path.as_path()).collect()
    }

    pub fn escalated(&self) -> Option<&Failure> {
        self.failures.iter().find(|f| f.escalated)
    }

    /// Turn the first escalated failure into an error.
    pub fn into_result(mut self) -> Result<Self, SayError> {
        let Some(pos) = self.failures.iter().position(|f| f.escalated) else {
            return Ok(self);
        };
        let failure = self.failures.swap_remove(pos);
        match failure.kind {
            FailureKind::Synthesis(source) => Err(SayError::Synthesis {
                index: failure.index,
                text: failure.text,
                source,
            }),
            FailureKind::Write(err) => Err(SayError::Io(err)),
        }
    }

    fn absorb(&mut self, report: WorkerReport) {
        self.files.extend(report.files);
        self.failures.extend(report.failures);
    }
}

/// Fixed-size pool of workers sharing one chunk queue.
///
/// Dropping the pool without calling [`DispatchPool::close`] still closes
/// the queue and waits for the workers.
pub struct DispatchPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<WorkerReport>>,
    shared: Arc<Shared>,
}

impl DispatchPool {
    /// Start `options.workers` threads waiting on an empty queue.
    pub fn spawn(
        backend: Arc<dyn SynthesisBackend>,
        writer: Arc<OutputWriter>,
        options: PoolOptions,
    ) -> Result<Self, SayError> {
        if options.workers == 0 {
            return Err(SayError::Config("worker count must be at least 1".into()));
        }

        let (sender, receiver) = crossbeam_channel::bounded(options.queue_capacity);
        let shared = Arc::new(Shared {
            backend,
            writer,
            envelope: options.envelope,
            reporter: options.reporter,
            next_index: AtomicUsize::new(0),
        });

        let mut pool = Self {
            sender: Some(sender),
            workers: Vec::with_capacity(options.workers),
            shared,
        };

        for id in 0..options.workers {
            let shared = Arc::clone(&pool.shared);
            let queue: Receiver<Job> = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("say-worker-{id}"))
                .spawn(move || shared.work(queue))?;
            pool.workers.push(handle);
        }
        log::debug!("Started {} synthesis workers", options.workers);

        Ok(pool)
    }

    /// Queue every text in order, tagged with consecutive indices.
    ///
    /// The indices for the whole batch are reserved before the first chunk is
    /// sent, so sentence retries can never take one of them. Blocks while the
    /// queue is full. Returns the index of the first chunk.
    pub fn say_all<I, S>(&self, texts: I) -> Result<usize, SayError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let texts: Vec<String> = texts.into_iter().map(Into::into).collect();
        let base = self
            .shared
            .next_index
            .fetch_add(texts.len(), Ordering::SeqCst);
        let sole = texts.iter().filter(|t| !t.is_empty()).count() == 1;

        let sender = self.sender.as_ref().ok_or(SayError::PoolClosed(base))?;
        for (offset, text) in texts.into_iter().enumerate() {
            let index = base + offset;
            let job = Job {
                chunk: Chunk::new(index, text),
                sole,
            };
            sender.send(job).map_err(|_| SayError::PoolClosed(index))?;
        }
        Ok(base)
    }

    /// Close the queue and block until every worker has exited.
    pub fn close(mut self) -> Result<PoolSummary, SayError> {
        drop(self.sender.take());

        let mut summary = PoolSummary::default();
        let mut panicked = None;
        for handle in std::mem::take(&mut self.workers) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            match handle.join() {
                Ok(report) => summary.absorb(report),
                Err(_) => panicked = Some(name),
            }
        }
        if let Some(name) = panicked {
            return Err(SayError::WorkerPanicked(name));
        }

        summary.files.sort_by_key(|f| f.index);
        summary.failures.sort_by_key(|f| f.index);
        summary.bytes = summary.files.iter().map(|f| f.bytes).sum();
        Ok(summary)
    }
}

impl Drop for DispatchPool {
    fn drop(&mut self) {
        self.sender.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

struct Job {
    chunk: Chunk,
    /// Only non-empty chunk of its batch
    sole: bool,
}

#[derive(Default)]
struct WorkerReport {
    files: Vec<OutputFile>,
    failures: Vec<Failure>,
}

/// Read-only collaborators plus the shared index counter.
struct Shared {
    backend: Arc<dyn SynthesisBackend>,
    writer: Arc<OutputWriter>,
    envelope: Envelope,
    reporter: Arc<dyn Reporter>,
    next_index: AtomicUsize,
}

impl Shared {
    fn work(&self, queue: Receiver<Job>) -> WorkerReport {
        let mut report = WorkerReport::default();
        for job in queue.iter() {
            if job.chunk.is_empty() {
                continue;
            }
            self.dispatch(&job, &mut report);
        }
        report
    }

    fn dispatch(&self, job: &Job, report: &mut WorkerReport) {
        let chunk = &job.chunk;
        match self.backend.synthesize(&self.envelope.wrap(&chunk.text)) {
            Ok(stream) => {
                self.store(SynthesisResult::new(chunk.index, stream), &chunk.text, report)
            }
            Err(err) => {
                self.reporter.chunk_failed(chunk.index, &chunk.text, &err);
                self.retry_by_sentence(job, report);
            }
        }
    }

    fn retry_by_sentence(&self, job: &Job, report: &mut WorkerReport) {
        let chunk = &job.chunk;
        let mut sentences = split_sentences(&chunk.text);
        if sentences.is_empty() {
            sentences.push(&chunk.text);
        }
        let escalated = job.sole && sentences.len() == 1;

        let mut own_index = Some(chunk.index);
        for sentence in sentences {
            match self.backend.synthesize(&self.envelope.wrap(sentence)) {
                Ok(stream) => {
                    let index = own_index
                        .take()
                        .unwrap_or_else(|| self.next_index.fetch_add(1, Ordering::SeqCst));
                    self.store(SynthesisResult::new(index, stream), sentence, report);
                }
                Err(err) => {
                    self.reporter.sentence_failed(chunk.index, sentence, &err);
                    report.failures.push(Failure {
                        index: chunk.index,
                        text: sentence.to_string(),
                        kind: FailureKind::Synthesis(err),
                        escalated,
                    });
                }
            }
        }
    }

    fn store(&self, result: SynthesisResult, text: &str, report: &mut WorkerReport) {
        let index = result.index;
        let path = self.writer.path_for(index);
        match self.writer.write_result(result) {
            Ok(bytes) => {
                self.reporter
                    .written(index, &path, bytes, self.writer.total_bytes());
                report.files.push(OutputFile { index, path, bytes });
            }
            Err(err) => {
                self.reporter.write_failed(index, &path, &err);
                report.failures.push(Failure {
                    index,
                    text: text.to_string(),
                    kind: FailureKind::Write(err),
                    escalated: false,
                });
            }
        }
    }
}
