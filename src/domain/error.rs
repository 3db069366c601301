use thiserror::Error;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("webhook signature: {0}")]
    Signature(String),

    #[error("malformed payload: {0}")]
    Payload(String),

    #[error("unsupported event type: {0}")]
    UnsupportedEvent(String),

    #[error("no user for customer: {0}")]
    UserNotFound(String),

    #[error("insufficient credits: balance {available}, requested {requested}")]
    InsufficientCredits { available: i64, requested: i64 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("provider api: {0}")]
    Provider(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}
