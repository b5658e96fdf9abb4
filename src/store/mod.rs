//! Local key/value storage (replaces browser local storage).

pub mod credentials;
pub mod file;
pub mod memory;

pub use credentials::CredentialStore;
pub use file::FileStore;
pub use memory::MemoryStore;

/// Storage key names as constants.
pub mod keys {
    /// Cached API key record
    pub const API_DATA: &str = "botnoi_api_data";
    /// Cached Botnoi login credentials
    pub const CREDENTIALS: &str = "botnoi_credentials";
    /// Remember-me preference from the last sign-in
    pub const REMEMBER_ME: &str = "rememberMe";
    /// Persisted identity session
    pub const IDENTITY_SESSION: &str = "identity_session";
}

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed value stored under {key}: {source}")]
    Malformed {
        key: String,
        source: serde_json::Error,
    },

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// String-keyed store of string values.
///
/// Implementations are shared between the orchestrator and the identity
/// session, each of which writes only its own keys.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}
