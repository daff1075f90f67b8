//! Error types shared across ClipForge crates.

/// Top-level error type for ClipForge operations.
#[derive(Debug, thiserror::Error)]
pub enum ClipforgeError {
    #[error("Project error: {message}")]
    Project { message: String },

    #[error("Timeline operation rejected: {message}")]
    Operation { message: String },

    #[error("Render compilation aborted: {message}")]
    Compile { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    /// Failure reported by the transcoding engine, passed through verbatim.
    #[error("Engine failure: {reason}")]
    EngineFailure { reason: String },

    #[error("An export is already running for this session")]
    ExportBusy,

    #[error("Export cancelled")]
    ExportCancelled,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ClipforgeError.
pub type ClipforgeResult<T> = Result<T, ClipforgeError>;

impl ClipforgeError {
    pub fn project(msg: impl Into<String>) -> Self {
        Self::Project {
            message: msg.into(),
        }
    }

    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation {
            message: msg.into(),
        }
    }

    pub fn compile(msg: impl Into<String>) -> Self {
        Self::Compile {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn engine_failure(reason: impl Into<String>) -> Self {
        Self::EngineFailure {
            reason: reason.into(),
        }
    }
}
