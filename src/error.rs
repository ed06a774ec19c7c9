use thiserror::Error;

/// Failure kinds surfaced by pipeline stages.
///
/// Every stage failure aborts the run; the orchestrator records the
/// originating stage alongside the error. No kind is retried automatically.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("calibration error: {0}")]
    Calibration(String),

    #[error("decomposition error: {0}")]
    Decomposition(String),

    #[error("segmentation error: {0}")]
    Segmentation(String),

    #[error("registration error: {0}")]
    Registration(String),

    #[error("quantification error: {0}")]
    Quantification(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("artifact error: {0}")]
    Artifact(String),
}

impl PipelineError {
    /// Short kind tag used in logs and the failure record.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Calibration(_) => "calibration",
            Self::Decomposition(_) => "decomposition",
            Self::Segmentation(_) => "segmentation",
            Self::Registration(_) => "registration",
            Self::Quantification(_) => "quantification",
            Self::Config(_) => "config",
            Self::Artifact(_) => "artifact",
        }
    }
}
