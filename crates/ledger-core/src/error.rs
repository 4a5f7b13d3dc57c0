use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("block index {index} out of range (chain length {len})")]
    OutOfRange { index: usize, len: usize },

    #[error("nonce search exhausted after {attempts} attempts")]
    MiningExhausted { attempts: u64 },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("difficulty {difficulty} exceeds digest length {max}")]
    InvalidDifficulty { difficulty: usize, max: usize },

    #[error("failed to build mining thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
