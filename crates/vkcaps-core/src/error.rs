//! Error type shared by every registry stage

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to read registry: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed registry document: {0}")]
    Malformed(String),
    #[error("Failed to parse rule set: {0}")]
    Rules(#[from] toml::de::Error),
    #[error("Failed to serialize model: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown data type '{type_name}' (C type '{c_type}') in struct '{struct_name}'")]
    UnknownType {
        type_name: String,
        c_type: String,
        struct_name: String,
    },
    #[error("No structure type identifier for '{0}'")]
    MissingStructureType(String),
    #[error("No extends classification for '{0}'")]
    UnknownExtendsMapping(String),
    #[error("Struct composition cycle through '{0}'")]
    CompositionCycle(String),
    #[error("Invalid enum extension for '{enum_name}' in '{owner}': {reason}")]
    InvalidGrowableEnum {
        enum_name: String,
        owner: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, RegistryError>;
