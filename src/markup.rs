//! SSML helpers shared by the segmenter and the dispatch pool.

/// Default speaking rate applied through the prosody envelope.
pub const DEFAULT_RATE: &str = "130%";

/// The markup envelope every request is wrapped in before it reaches the backend.
///
/// Text handed to [`Envelope::wrap`] must already be entity-escaped; the
/// segmenter guarantees this for everything it emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    rate: String,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::with_rate(DEFAULT_RATE)
    }
}

impl Envelope {
    pub fn with_rate(rate: impl Into<String>) -> Self {
        Self { rate: rate.into() }
    }

    pub fn rate(&self) -> &str {
        &self.rate
    }

    pub fn wrap(&self, text: &str) -> String {
        format!(
            "<speak><prosody rate='{}'>{}</prosody></speak>",
            self.rate, text
        )
    }
}

/// Split text after every `.`, keeping the period on the sentence it ends.
///
/// A trailing fragment without a period is returned as is. Fragments that are
/// only whitespace are dropped since there is nothing to speak.
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.split_inclusive('.')
        .filter(|s| !s.trim().is_empty())
        .collect()
}
