use burn::record::RecorderError;

/// Fatal errors surfaced by the training core.
///
/// Configuration defects are detected at construction time, before any
/// episode runs; numerical instability aborts the run without retry.
#[derive(Debug, thiserror::Error)]
pub enum NtmError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("non-finite loss ({loss}) at episode {episode}")]
    NumericalInstability { episode: usize, loss: f64 },

    #[error("unknown {kind} name: {name:?}")]
    UnknownName { kind: &'static str, name: String },

    #[error("checkpoint error: {0}")]
    Checkpoint(String),
}

impl From<RecorderError> for NtmError {
    fn from(err: RecorderError) -> Self {
        Self::Checkpoint(err.to_string())
    }
}
