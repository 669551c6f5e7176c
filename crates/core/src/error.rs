use thiserror::Error;
use uuid::Uuid;

pub type AdResult<T> = Result<T, AdError>;

#[derive(Error, Debug)]
pub enum AdError {
    #[error("required field '{field}' is missing for {ad_type} content")]
    MissingContentField {
        ad_type: &'static str,
        field: String,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("ad not found: {0}")]
    AdNotFound(Uuid),

    #[error("tenant not found: {0}")]
    TenantNotFound(Uuid),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
