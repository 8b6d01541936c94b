//! vkcaps Codegen - generated outputs for a built registry model
//!
//! Two artifacts are produced from one [`RegistryModel`]:
//! - a Rust module with the registry's enums, constants, structs and mapping tables
//! - a C++ header with zero-initialized device records, `Iterate` visitor
//!   templates, `pNext` chain wiring, list resizing, and format queries
//!
//! Both are pure functions of the model, so repeated runs are byte-identical.

mod fragments;
pub mod header;
pub mod module;

use thiserror::Error;
use vkcaps_core::{RegistryError, RegistryModel};

pub use header::generate_header;
pub use module::generate_module;

#[derive(Error, Debug)]
pub enum CodegenError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Failed to format generated code: {0}")]
    Fmt(#[from] std::fmt::Error),
}

pub type Result<T> = std::result::Result<T, CodegenError>;

/// Both generated artifacts of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedOutputs {
    pub module: String,
    pub header: String,
}

pub fn generate(model: &RegistryModel) -> Result<GeneratedOutputs> {
    Ok(GeneratedOutputs {
        module: generate_module(model)?,
        header: generate_header(model)?,
    })
}
