use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid parameter {name}={value} for {effect}: {reason}")]
    InvalidParameter {
        effect: &'static str,
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("image dimensions changed during run: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("pixel data length {len} doesn't match {width}x{height}x4")]
    BufferSize { width: u32, height: u32, len: usize },

    #[error("a run is already active on this image: {active}")]
    ConcurrentRun { active: Uuid },

    #[error("outcome for run {got} does not belong to active run {expected:?}")]
    ForeignRun { expected: Option<Uuid>, got: Uuid },

    #[error("run cancelled")]
    Cancelled,

    #[error("worker exited without reporting completion")]
    WorkerLost,

    #[error("unknown effect: {0}")]
    UnknownEffect(String),

    #[error("unknown parameter {name} for {effect}")]
    UnknownParameter { effect: &'static str, name: String },

    #[error("unsupported chain version {found} (supported: {supported})")]
    IncompatibleVersion {
        found: semver::Version,
        supported: semver::Version,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
