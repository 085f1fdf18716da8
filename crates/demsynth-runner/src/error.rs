use demsynth_fill::GapFillError;
use demsynth_pipeline::PipelineError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the `demsynth` commands.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    GapFill(#[from] GapFillError),
}
