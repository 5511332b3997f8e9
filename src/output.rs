//! Output files keyed by chunk index.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::SynthesisResult;

/// Extension used for produced audio files.
pub const DEFAULT_EXTENSION: &str = "mp3";

/// Writes synthesized audio to `<dir>/<prefix><NNNN>.<ext>`.
///
/// The file name depends only on the index, so workers can call
/// [`OutputWriter::write`] concurrently in any completion order. The running
/// byte total is the only shared state.
#[derive(Debug)]
pub struct OutputWriter {
    dir: PathBuf,
    prefix: String,
    extension: String,
    total: AtomicU64,
}

impl OutputWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: String::new(),
            extension: DEFAULT_EXTENSION.to_string(),
            total: AtomicU64::new(0),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir
            .join(format!("{}{:04}.{}", self.prefix, index, self.extension))
    }

    /// Copy `stream` into the file for `index`, truncating any previous file.
    ///
    /// A partially written file is removed when the copy fails.
    pub fn write(&self, index: usize, stream: &mut dyn Read) -> io::Result<u64> {
        let path = self.path_for(index);
        let mut file = File::create(&path)?;
        let bytes = match io::copy(stream, &mut file) {
            Ok(bytes) => bytes,
            Err(err) => {
                drop(file);
                if let Err(cleanup) = std::fs::remove_file(&path) {
                    log::warn!("Could not remove partial {}: {cleanup}", path.display());
                }
                return Err(err);
            }
        };
        file.sync_all()?;
        self.total.fetch_add(bytes, Ordering::Relaxed);
        Ok(bytes)
    }

    /// Write a synthesis result and close its stream.
    pub fn write_result(&self, result: SynthesisResult) -> io::Result<u64> {
        let SynthesisResult { index, mut stream } = result;
        self.write(index, &mut stream)
    }

    /// Bytes written so far across all workers.
    pub fn total_bytes(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Existing output files, probing indices from 0 until one is missing.
    pub fn sequential_files(&self) -> Vec<PathBuf> {
        (0..)
            .map(|index| self.path_for(index))
            .take_while(|path| path.is_file())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::OutputWriter;
    use crate::SynthesisResult;
    use std::io::{self, Cursor, Read};

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "stream reset"))
        }
    }

    #[test]
    fn names_files_by_zero_padded_index() {
        let writer = OutputWriter::new("out").with_prefix("book");
        assert_eq!(writer.path_for(7), std::path::Path::new("out/book0007.mp3"));
        assert_eq!(
            OutputWriter::new("").path_for(12345),
            std::path::Path::new("12345.mp3")
        );
    }

    #[test]
    fn writes_stream_and_tracks_total() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());

        let bytes = writer.write(3, &mut Cursor::new(b"abcdef".to_vec())).unwrap();
        assert_eq!(bytes, 6);
        let bytes = writer
            .write_result(SynthesisResult::new(0, Box::new(Cursor::new(b"xy".to_vec()))))
            .unwrap();
        assert_eq!(bytes, 2);

        assert_eq!(std::fs::read(dir.path().join("0003.mp3")).unwrap(), b"abcdef");
        assert_eq!(std::fs::read(dir.path().join("0000.mp3")).unwrap(), b"xy");
        assert_eq!(writer.total_bytes(), 8);
    }

    #[test]
    fn rewriting_an_index_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());
        writer.write(0, &mut Cursor::new(vec![1u8; 64])).unwrap();
        writer.write(0, &mut Cursor::new(vec![2u8; 4])).unwrap();
        assert_eq!(std::fs::read(writer.path_for(0)).unwrap(), vec![2u8; 4]);
    }

    #[test]
    fn failed_copy_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());
        assert!(writer.write(1, &mut Broken).is_err());
        assert!(!writer.path_for(1).exists());
        assert_eq!(writer.total_bytes(), 0);
    }

    #[test]
    fn sequential_scan_stops_at_first_gap() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());
        for index in [0, 1, 3] {
            writer.write(index, &mut Cursor::new(b"a".to_vec())).unwrap();
        }
        assert_eq!(
            writer.sequential_files(),
            vec![writer.path_for(0), writer.path_for(1)]
        );
    }
}
