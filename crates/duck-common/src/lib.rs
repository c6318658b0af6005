pub mod errors;

pub use errors::{ConfigError, DuckChatError, StorageError};

pub type Result<T> = std::result::Result<T, DuckChatError>;
