use thiserror::Error;

/// Result alias used throughout the motion core.
pub type HexapodResult<T> = Result<T, HexapodError>;

/// Error taxonomy for the hexapod motion core.
///
/// `QueueFull`, `PreCheckFail` and `PostCheckFail` are rejections that never
/// mutate state; `Unreachable` signals that a planned move collapsed to a
/// no-op.
#[derive(Error, Debug)]
pub enum HexapodError {
    #[error("queue is at capacity, enqueue rejected")]
    QueueFull,

    #[error("pre-check rejected the requested body pose")]
    PreCheckFail,

    #[error("post-check rejected a computed leg-frame target")]
    PostCheckFail,

    #[error("requested move collapsed to a no-op")]
    Unreachable,

    #[error("failed to parse hexapod configuration")]
    ConfigError(#[from] toml::de::Error),
}

impl PartialEq for HexapodError {
    fn eq(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::QueueFull, Self::QueueFull)
                | (Self::PreCheckFail, Self::PreCheckFail)
                | (Self::PostCheckFail, Self::PostCheckFail)
                | (Self::Unreachable, Self::Unreachable)
                | (Self::ConfigError(_), Self::ConfigError(_))
        )
    }
}
impl Eq for HexapodError {}

/// Non-fatal outcome of a speed-bounded move setup.
///
/// Distinct from [`HexapodError`] because a capped speed is not a failure:
/// the move proceeds, just slower than requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Ok,
    SpeedCapped,
}
