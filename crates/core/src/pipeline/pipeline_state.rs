use std::fmt;

/// Stages of one subtitle-burning run.
///
/// The happy path is `Extracting → Transcribing → Segmenting → Rendering →
/// Compositing → Encoding → Done`. Only `Extracting` and `Encoding` may end
/// in `Failed`; transcription and rendering failures move on with degraded
/// input. Any non-terminal state may end in `Cancelled`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Extracting,
    Transcribing,
    Segmenting,
    Rendering,
    Compositing,
    Encoding,
    Done,
    Failed,
    Cancelled,
}

impl PipelineState {
    /// Successor on the happy path, `None` for terminal states.
    pub fn next(self) -> Option<Self> {
        use PipelineState::*;
        match self {
            Extracting => Some(Transcribing),
            Transcribing => Some(Segmenting),
            Segmenting => Some(Rendering),
            Rendering => Some(Compositing),
            Compositing => Some(Encoding),
            Encoding => Some(Done),
            Done | Failed | Cancelled => None,
        }
    }

    /// Whether a failure in this state aborts the run.
    pub fn can_fail(self) -> bool {
        matches!(self, PipelineState::Extracting | PipelineState::Encoding)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Done | PipelineState::Failed | PipelineState::Cancelled
        )
    }

    pub fn can_transition_to(self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match to {
            PipelineState::Failed => self.can_fail(),
            PipelineState::Cancelled => true,
            _ => self.next() == Some(to),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PipelineState::Extracting => "extracting",
            PipelineState::Transcribing => "transcribing",
            PipelineState::Segmenting => "segmenting",
            PipelineState::Rendering => "rendering",
            PipelineState::Compositing => "compositing",
            PipelineState::Encoding => "encoding",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
            PipelineState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
