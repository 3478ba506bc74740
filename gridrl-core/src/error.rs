//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug)]
pub enum GridRlError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// An environment was stepped after its episode had ended.
    ///
    /// The episode must be started again with `reset()`.
    #[error("The episode is over (terminated or truncated); call reset() before step()")]
    EpisodeFinished,

    /// The name does not denote one of the four moves.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// A configuration violates an invariant of the object built from it.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A checkpoint exists but does not fit the agent loading it.
    #[error("Checkpoint does not match the agent: {0}")]
    CheckpointMismatch(String),
}
