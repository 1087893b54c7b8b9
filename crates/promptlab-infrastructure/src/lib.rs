pub mod paths;
pub mod secret_service;
pub mod storage;

pub use paths::PromptLabPaths;
pub use secret_service::SecretServiceImpl;
pub use storage::{ConfigStorage, SecretStorage, SecretStorageError};
