/// The speech recognized in one run's audio track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transcript {
    Text(String),
    /// Transcription failed; the run continues without subtitles.
    Unavailable,
}

impl Transcript {
    /// The recognized text, or `""` when unavailable.
    pub fn text(&self) -> &str {
        match self {
            Transcript::Text(text) => text,
            Transcript::Unavailable => "",
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Transcript::Text(_))
    }

    pub fn word_count(&self) -> usize {
        self.text().split_whitespace().count()
    }
}
