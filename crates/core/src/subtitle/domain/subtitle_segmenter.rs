use std::time::Duration;

use crate::shared::constants::DEFAULT_WORDS_PER_CUE;
use crate::subtitle::domain::subtitle_cue::SubtitleCue;
use crate::subtitle::domain::subtitle_document::SubtitleDocument;
use crate::subtitle::domain::tokenizer::{Tokenizer, WhitespaceTokenizer};

/// Groups transcript words into fixed-size cues spread evenly over the video.
///
/// Timing is uniform: every cue lasts `duration / N` for `N` groups. It does
/// not follow actual speech pacing, since the transcript carries no word-level
/// timestamps. This is a deliberate simplification, not a defect.
pub struct SubtitleSegmenter {
    words_per_cue: usize,
    tokenizer: Box<dyn Tokenizer>,
}

impl SubtitleSegmenter {
    pub fn new(words_per_cue: usize) -> Self {
        Self::with_tokenizer(words_per_cue, Box::new(WhitespaceTokenizer))
    }

    /// A zero group size is treated as one word per cue.
    pub fn with_tokenizer(words_per_cue: usize, tokenizer: Box<dyn Tokenizer>) -> Self {
        Self {
            words_per_cue: words_per_cue.max(1),
            tokenizer,
        }
    }

    pub fn words_per_cue(&self) -> usize {
        self.words_per_cue
    }

    /// Builds the cue list for `text` over `duration_secs` seconds.
    ///
    /// Empty or blank text yields an empty document. A zero (or negative,
    /// or non-finite) duration collapses every cue to a zero-length interval
    /// at the origin.
    pub fn segment(&self, text: &str, duration_secs: f64) -> SubtitleDocument {
        let words = self.tokenizer.tokenize(text);
        let groups: Vec<&[&str]> = words.chunks(self.words_per_cue).collect();
        let n = groups.len();
        if n == 0 {
            return SubtitleDocument::empty();
        }

        let total = if duration_secs.is_finite() && duration_secs > 0.0 {
            duration_secs
        } else {
            0.0
        };
        // i * D / N rather than i * (D / N) so the last cue ends exactly at D
        let boundary = |i: usize| Duration::from_secs_f64(total * i as f64 / n as f64);

        let cues = groups
            .into_iter()
            .enumerate()
            .map(|(i, group)| SubtitleCue::new(i + 1, boundary(i), boundary(i + 1), group.join(" ")))
            .collect();

        SubtitleDocument::new(cues)
    }
}

impl Default for SubtitleSegmenter {
    fn default() -> Self {
        Self::new(DEFAULT_WORDS_PER_CUE)
    }
}
