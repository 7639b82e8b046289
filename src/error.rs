use thiserror::Error;

/// Errors surfaced by the display engine to its control surface
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Malformed or out-of-range command parameter; nothing was stopped or started
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// File or stream could not be opened or decoded; the engine stays idle
    #[error("cannot open {target}: {reason}")]
    Resource { target: String, reason: String },

    /// A single frame or tick could not be produced; recovered where it happens
    #[error("frame error: {0}")]
    TransientFrame(String),

    /// Unrecoverable stream fault; ends the active render loop only
    #[error("stream failed: {0}")]
    FatalStream(String),

    /// The hardware sink rejected a frame
    #[error("sink error: {0}")]
    Sink(String),
}

impl EngineError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn transient(message: impl std::fmt::Display) -> Self {
        Self::TransientFrame(message.to_string())
    }

    /// Recoverable errors end one iteration, never the loop
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientFrame(_))
    }

    pub fn resource(target: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Resource {
            target: target.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors reported by a video source while pulling frames
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Frame data arrived but could not be decoded or converted
    #[error("corrupt frame: {0}")]
    Corrupt(String),

    /// Decoder produced nothing within the read timeout
    #[error("decoder read timed out")]
    Timeout,

    /// Decoder died; no further frames will arrive
    #[error("decoder failed: {0}")]
    Decoder(String),
}

/// Errors reported by a time source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    #[error("time server unreachable: {0}")]
    Unreachable(String),

    #[error("malformed time response: {0}")]
    Malformed(String),
}
