//! The immutable model threaded through every stage

use crate::closure::DependencyClosure;
use crate::error::Result;
use crate::extract::Registry;
use crate::filter::DisabledSet;
use crate::mapping::Mappings;
use crate::rules::FilterRules;
use crate::types::{ApiConstant, ApiVersion};
use crate::xml::{load_registry, parse_document, XmlElement};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Extracted registry plus every derived table, built once per run
#[derive(Debug, Clone)]
pub struct RegistryModel {
    pub rules: FilterRules,
    pub registry: Registry,
    pub disabled: DisabledSet,
    pub closure: DependencyClosure,
    pub mappings: Mappings,
}

/// Serializable view of the derived tables
#[derive(Serialize)]
struct ModelDump<'a> {
    rules: &'a FilterRules,
    api_constants: &'a [ApiConstant],
    api_versions: &'a [(String, ApiVersion)],
    disabled: &'a DisabledSet,
    closure: &'a DependencyClosure,
    mappings: &'a Mappings,
}

impl RegistryModel {
    /// Run every stage over a parsed registry document
    pub fn build(root: &XmlElement, rules: FilterRules) -> Result<Self> {
        let registry = Registry::from_document(root)?;
        let disabled = DisabledSet::compute(&registry, &rules);
        let closure = DependencyClosure::compute(&registry, &disabled, &rules)?;
        let mappings = Mappings::build(&registry, &disabled, &closure, &rules)?;
        Ok(Self {
            rules,
            registry,
            disabled,
            closure,
            mappings,
        })
    }

    pub fn parse(content: &str, rules: FilterRules) -> Result<Self> {
        Self::build(&parse_document(content)?, rules)
    }

    pub fn load(path: &Path, rules: FilterRules) -> Result<Self> {
        info!(path = %path.display(), "Loading registry");
        Self::build(&load_registry(path)?, rules)
    }

    pub fn to_json(&self) -> Result<String> {
        let dump = ModelDump {
            rules: &self.rules,
            api_constants: &self.registry.api_constants,
            api_versions: &self.registry.api_versions,
            disabled: &self.disabled,
            closure: &self.closure,
            mappings: &self.mappings,
        };
        Ok(serde_json::to_string_pretty(&dump)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = r#"
<registry>
  <types>
    <type category="struct" name="VkPhysicalDeviceFooProperties" structextends="VkPhysicalDeviceProperties2">
      <member values="VK_STRUCTURE_TYPE_PHYSICAL_DEVICE_FOO_PROPERTIES"><type>VkStructureType</type> <name>sType</name></member>
      <member><type>void</type>* <name>pNext</name></member>
      <member><type>uint32_t</type> <name>maxFoo</name></member>
    </type>
  </types>
  <enums name="API Constants">
    <enum type="uint32_t" value="256" name="VK_MAX_EXTENSION_NAME_SIZE"/>
  </enums>
</registry>"#;

    #[test]
    fn test_build_threads_every_stage() {
        let model = RegistryModel::parse(REGISTRY, FilterRules::default()).unwrap();
        assert_eq!(model.registry.structs.len(), 1);
        assert!(model.disabled.contains("VkPhysicalDeviceHostImageCopyProperties"));
        assert!(!model.disabled.contains("VkPhysicalDeviceFooProperties"));
        assert!(model.closure.contains("VkPhysicalDeviceFooProperties"));
        assert_eq!(model.mappings.independent, vec!["VkPhysicalDeviceFooProperties"]);
    }

    #[test]
    fn test_json_dump() {
        let model = RegistryModel::parse(REGISTRY, FilterRules::default()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&model.to_json().unwrap()).unwrap();
        assert_eq!(
            json["mappings"]["type_tags"]["VkPhysicalDeviceFooProperties"],
            "VK_STRUCTURE_TYPE_PHYSICAL_DEVICE_FOO_PROPERTIES"
        );
        assert_eq!(json["api_constants"][0]["value"], "256");
        assert_eq!(json["rules"]["supported_platform"], "android");
    }

    #[test]
    fn test_dump_is_stable() {
        let a = RegistryModel::parse(REGISTRY, FilterRules::default()).unwrap();
        let b = RegistryModel::parse(REGISTRY, FilterRules::default()).unwrap();
        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }
}
