use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] minbar_core::ValidationError),

    #[error(transparent)]
    Pipeline(#[from] minbar_core::PipelineError),

    #[error(transparent)]
    Warehouse(#[from] minbar_core::WarehouseError),

    #[error(transparent)]
    Source(#[from] minbar_core::SourceError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Pipeline(_) => 3,
            Self::Source(_) => 4,
            Self::Warehouse(_) | Self::Io(_) => 10,
        }
    }
}
