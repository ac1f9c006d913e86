use thiserror::Error;

#[derive(Error, Debug)]
pub enum DistMulError {
    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid value for {flag}: {value}")]
    InvalidArgument { flag: &'static str, value: String },

    #[error("Unknown flag: {0}")]
    UnknownFlag(String),

    #[error("Run aborted by root: {0}")]
    Aborted(String),

    #[error("Invalid dimension: expected {expected}, got {got}")]
    InvalidDimension { expected: usize, got: usize },

    #[error("Malformed CSR matrix: {0}")]
    MalformedCsr(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid rank {rank} for a group of {size}")]
    InvalidRank { rank: usize, size: usize },

    #[error("Collective mismatch on rank {rank}: expected {expected}, received {received}")]
    CollectiveMismatch {
        rank: usize,
        expected: &'static str,
        received: &'static str,
    },

    #[error("Unexpected payload type for {0}")]
    PayloadType(&'static str),

    #[error("Participant disconnected during {0}")]
    Disconnected(&'static str),

    #[error("Participant {0} panicked")]
    ParticipantPanicked(usize),

    #[error("Communication error: {0}")]
    Communication(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DistMulError {
    /// Errors caused by bad command-line input, for which usage is printed.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::MissingArgument(_) | Self::InvalidArgument { .. } | Self::UnknownFlag(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DistMulError>;
