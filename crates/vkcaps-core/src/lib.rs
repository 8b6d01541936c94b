//! vkcaps Core - Vulkan registry parsing and capability mapping
//!
//! This crate turns the machine-readable Vulkan registry (`vk.xml`) into the
//! tables a device capability reporter needs:
//! - XML loading into an owned element tree
//! - Extraction of structs, enums, constants, handles, features and extensions
//! - The disabled-struct filter and the dependency closure over struct members
//! - Alias resolution, core/feature/extension partitioning, and enum ranges
//! - Naming transforms from registry identifiers to generated field names

pub mod alias;
pub mod closure;
pub mod error;
pub mod extract;
pub mod filter;
pub mod mapping;
pub mod model;
pub mod naming;
pub mod ranges;
pub mod rules;
pub mod types;
pub mod xml;

pub use alias::{AliasGraph, Resolution};
pub use closure::{classify, DependencyClosure, TypeClass};
pub use error::{RegistryError, Result};
pub use extract::Registry;
pub use filter::{DisableReason, DisabledSet};
pub use mapping::{CoreGroup, ExtensionEntry, FeatureEntry, GrowableEnum, Mappings, StructEntry};
pub use model::RegistryModel;
pub use ranges::{find_contiguous_ranges, ValueRange};
pub use rules::FilterRules;
pub use types::{EnumDecl, Member, StructDecl, TypeKind};
pub use xml::{load_registry, parse_document, XmlElement};
