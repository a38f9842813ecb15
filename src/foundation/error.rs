pub type CueResult<T> = Result<T, CueError>;

/// Pipeline stage a [`CueError`] originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Configuration checks before any stage runs.
    Config,
    /// Row ingestion and cue timeline construction.
    Timeline,
    /// Source audio decode and audio composition.
    Audio,
    /// Frame rasterization.
    Render,
    /// Video sink writes and finalization.
    Encode,
}

#[derive(thiserror::Error, Debug)]
pub enum CueError {
    #[error("timeline error: no valid cue rows after filtering")]
    EmptyTimeline,

    #[error("input error: {0}")]
    Input(String),

    #[error("audio decode error: {0}")]
    AudioDecode(String),

    #[error("audio compose error: {0}")]
    AudioCompose(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("encode cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CueError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn audio_decode(msg: impl Into<String>) -> Self {
        Self::AudioDecode(msg.into())
    }

    pub fn audio_compose(msg: impl Into<String>) -> Self {
        Self::AudioCompose(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// The stage that failed, so callers can tell bad input apart from a broken encoder.
    pub fn stage(&self) -> Stage {
        match self {
            Self::EmptyTimeline | Self::Input(_) => Stage::Timeline,
            Self::AudioDecode(_) | Self::AudioCompose(_) => Stage::Audio,
            Self::Render(_) => Stage::Render,
            Self::Encode(_) | Self::Cancelled | Self::Other(_) => Stage::Encode,
            Self::Validation(_) => Stage::Config,
        }
    }
}
