use thiserror::Error;
use uuid::Uuid;

/// Request-fatal errors. Everything else (collaborator outages, scorer
/// failures, bad article data) degrades locally and shows up in the stats.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("organization_id is required")]
    MissingOrganization,

    #[error("Organization {0} not found")]
    OrganizationNotFound(Uuid),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid selection config: {0}")]
    InvalidConfig(String),
}

impl SelectionError {
    /// HTTP status the API surface should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            SelectionError::MissingOrganization | SelectionError::InvalidRequest(_) => 400,
            SelectionError::OrganizationNotFound(_) => 404,
            SelectionError::InvalidConfig(_) => 500,
        }
    }
}
