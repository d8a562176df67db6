use thiserror::Error;

use crate::core::types::DoorId;
use crate::predicate::PredicateError;
use crate::predicate::registry::RegistryError;

#[derive(Error, Debug)]
pub enum GateError {
    #[error("Door not registered: {0}")]
    DoorNotFound(DoorId),

    #[error("Door already registered: {0}")]
    DoorAlreadyRegistered(DoorId),

    #[error("Unknown predicate kind: {0}")]
    UnknownKind(String),

    #[error("Unknown predicate category: {0}")]
    UnknownCategory(String),

    #[error("No predicate set for category {category} on {door}")]
    PredicateNotSet { door: DoorId, category: String },

    #[error("Predicate error: {0}")]
    Predicate(#[from] PredicateError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Config error: {0}")]
    Config(#[from] crate::core::config::ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GateError>;
