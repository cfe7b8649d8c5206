use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignalDeskError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown value for {field}: {value}")]
    UnknownValue { field: &'static str, value: String },

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
