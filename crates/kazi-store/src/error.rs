//! Error types for kazi-entitlements storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("not found")]
    NotFound,

    /// A trial was already used for this plan by this account.
    #[error("trial already used: {email} / {plan}")]
    TrialAlreadyUsed {
        /// The account.
        email: String,
        /// The plan whose trial was already consumed.
        plan: String,
    },
}
