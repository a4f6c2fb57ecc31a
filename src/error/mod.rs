use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Agent registry and definition errors
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent not found: {agent_id}")]
    NotFound { agent_id: String },

    #[error("Agent directory unreadable: {path}: {message}")]
    Directory { path: String, message: String },
}

/// Provider gateway errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("All providers failed (attempted: {attempted})")]
    AllProvidersFailed { attempted: String },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Document version store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {document_id}")]
    DocumentNotFound { document_id: String },

    #[error("Version {version} not found for document {document_id}")]
    VersionNotFound { document_id: String, version: u64 },
}

/// Auth and billing stub errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User already registered: {email}")]
    UserExists { email: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: String },

    #[error("Quota exceeded: {used} of {limit} tokens used this period")]
    QuotaExceeded { used: u64, limit: u64 },
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for auth operations
pub type AuthResult<T> = Result<T, AuthError>;
