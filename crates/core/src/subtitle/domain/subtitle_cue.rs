use std::time::Duration;

/// One subtitle entry: a 1-based index, a time interval and its text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubtitleCue {
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

impl SubtitleCue {
    pub fn new(index: usize, start: Duration, end: Duration, text: impl Into<String>) -> Self {
        Self {
            index,
            start,
            end,
            text: text.into(),
        }
    }

    pub fn start_secs(&self) -> f64 {
        self.start.as_secs_f64()
    }

    pub fn end_secs(&self) -> f64 {
        self.end.as_secs_f64()
    }

    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }

    /// Half-open: a cue covers its start but not its end.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_secs() && t < self.end_secs()
    }
}

/// Formats a time offset as `HH:MM:SS,mmm`, rounded to the nearest millisecond.
pub fn format_timestamp(offset: Duration) -> String {
    let total_ms = (offset.as_nanos() + 500_000) / 1_000_000;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let s = total_secs % 60;
    let m = (total_secs / 60) % 60;
    let h = total_secs / 3600;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}
