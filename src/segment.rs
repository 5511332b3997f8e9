//! Text segmentation into request-sized chunks.
//!
//! The backend embeds every request inside SSML, so the segmenter first
//! replaces markup-significant characters with their entities and then packs
//! paragraphs greedily into blocks that stay strictly below the budget. A
//! paragraph too large for an empty block is packed sentence by sentence; a
//! sentence too large for an empty block is a fatal error.

use crate::error::SegmentError;

/// Maximum characters per synthesis request.
pub const DEFAULT_BUDGET: usize = 1500;

/// Characters replaced before text is embedded in markup.
const ENTITIES: &[(char, &str)] = &[
    ('<', "&lt;"),
    ('>', "&gt;"),
    ('&', "&amp;"),
    ('"', "&quot;"),
    ('\'', "&apos;"),
    ('¢', "&cent;"),
    ('£', "&pound;"),
    ('¥', "&yen;"),
    ('€', "&euro;"),
    ('©', "&copy;"),
    ('®', "&reg;"),
];

/// One unit of work for the dispatch pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the original document, used to name the output file.
    pub index: usize,
    pub text: String,
}

impl Chunk {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Replace every character in the entity table with its escaped form.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ENTITIES.iter().find(|(c, _)| *c == ch) {
            Some((_, entity)) => escaped.push_str(entity),
            None => escaped.push(ch),
        }
    }
    escaped
}

/// Split `raw` into escaped chunks, each strictly shorter than `budget` characters.
///
/// The last accumulated block is always emitted, so the result is never
/// empty; empty chunks are valid and callers treat them as no-ops.
pub fn segment(raw: &str, budget: usize) -> Result<Vec<String>, SegmentError> {
    if budget == 0 {
        return Err(SegmentError::InvalidBudget(budget));
    }

    let normalized = escape(raw);
    let mut blocks = Blocks::new(budget);
    for paragraph in normalized.split('\n') {
        if paragraph.is_empty() {
            continue;
        }
        blocks.push_paragraph(paragraph)?;
    }

    let chunks = blocks.finish();
    log::debug!("Segmented {} chars into {} chunks", raw.len(), chunks.len());
    Ok(chunks)
}

/// Greedy block accumulator. Lengths are counted in characters.
struct Blocks {
    budget: usize,
    done: Vec<String>,
    block: String,
    block_len: usize,
}

impl Blocks {
    fn new(budget: usize) -> Self {
        Self {
            budget,
            done: Vec::new(),
            block: String::new(),
            block_len: 0,
        }
    }

    /// One character is always held back for the trailing separator.
    fn fits(&self, len: usize) -> bool {
        self.block_len + len + 1 < self.budget
    }

    fn append(&mut self, text: &str, len: usize) {
        self.block.push_str(text);
        self.block_len += len;
    }

    fn flush(&mut self) {
        self.done.push(std::mem::take(&mut self.block));
        self.block_len = 0;
    }

    fn push_paragraph(&mut self, paragraph: &str) -> Result<(), SegmentError> {
        let len = paragraph.chars().count();
        if !self.fits(len) {
            self.flush();
        }
        if self.fits(len) {
            self.append(paragraph, len);
            self.append("\n", 1);
            return Ok(());
        }

        for sentence in paragraph.split_inclusive('.') {
            self.push_sentence(sentence)?;
        }
        // the last sentence was admitted with room for this
        self.append("\n", 1);
        Ok(())
    }

    fn push_sentence(&mut self, sentence: &str) -> Result<(), SegmentError> {
        let len = sentence.chars().count();
        if !self.fits(len) {
            self.flush();
        }
        if self.fits(len) {
            self.append(sentence, len);
            return Ok(());
        }
        Err(SegmentError::SentenceTooLong {
            sentence: sentence.to_string(),
            len,
            budget: self.budget,
        })
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.done
    }
}
