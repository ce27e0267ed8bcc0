use std::fmt::Write as _;
use std::path::Path;

use crate::subtitle::domain::subtitle_cue::{format_timestamp, SubtitleCue};

/// Ordered cue list for one run, serializable as SubRip (`.srt`).
///
/// Empty when transcription produced nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubtitleDocument {
    cues: Vec<SubtitleCue>,
}

impl SubtitleDocument {
    pub fn new(cues: Vec<SubtitleCue>) -> Self {
        Self { cues }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn cues(&self) -> &[SubtitleCue] {
        &self.cues
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Whitespace-separated words of all cues, in cue order.
    pub fn words(&self) -> Vec<&str> {
        self.cues
            .iter()
            .flat_map(|c| c.text.split_whitespace())
            .collect()
    }

    /// Numbered blocks of `index`, `start --> end` and text, separated by a
    /// blank line.
    pub fn to_srt(&self) -> String {
        let mut out = String::new();
        for cue in &self.cues {
            let _ = write!(
                out,
                "{}\n{} --> {}\n{}\n\n",
                cue.index,
                format_timestamp(cue.start),
                format_timestamp(cue.end),
                cue.text
            );
        }
        out
    }

    pub fn write_srt(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_srt())
    }
}
