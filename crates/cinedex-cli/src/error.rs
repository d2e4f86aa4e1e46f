use cinedex_core::telemetry::TelemetryError;
use cinedex_core::{ConfigError, FixtureError, ServiceError, ValidationError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("page_number {page_number} is past the last page ({last_page})")]
    PageOutOfRange { page_number: u32, last_page: u64 },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("no {entity} found")]
    NoResults { entity: &'static str },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot load fixtures: {0}")]
    Fixture(#[from] FixtureError),

    #[error("search backend unavailable: {0}")]
    Unavailable(ServiceError),

    #[error(transparent)]
    Service(ServiceError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

impl From<ServiceError> for CliError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Validation(error) => Self::Validation(error),
            ServiceError::Config(error) => Self::Config(error),
            error if error.is_unavailable() => Self::Unavailable(error),
            error => Self::Service(error),
        }
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::PageOutOfRange { .. } | Self::Config(_) => 2,
            Self::Fixture(FixtureError::Io(_)) => 10,
            Self::Fixture(_) => 2,
            Self::NotFound { .. } | Self::NoResults { .. } => 3,
            Self::Serialization(_) => 4,
            Self::Unavailable(_) => 5,
            Self::Io(_) => 10,
            Self::Service(_) | Self::Telemetry(_) => 1,
        }
    }
}
