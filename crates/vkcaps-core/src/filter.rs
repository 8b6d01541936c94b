//! Disabled-struct computation
//!
//! A name lands in the disabled set when any one rule fires. Rules run in a
//! fixed order over the registry and never remove a name once added.

use crate::extract::Registry;
use crate::rules::FilterRules;
use crate::types::StructDecl;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

/// Why a name was disabled. Only the first reason is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", content = "source", rename_all = "snake_case")]
pub enum DisableReason {
    /// Listed in the rule set
    AlwaysDisabled,
    /// Extends something other than an aggregator
    ForeignExtends,
    /// Required by a restricted API feature
    RestrictedApi(String),
    /// Required by an extension that is not compiled in
    UnsupportedExtension(String),
    /// A non-capability type required by an enabled extension
    ExtensionPlumbing(String),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DisabledSet {
    entries: Vec<(String, DisableReason)>,
    #[serde(skip)]
    names: HashSet<String>,
}

impl DisabledSet {
    pub fn compute(registry: &Registry, rules: &FilterRules) -> Self {
        let mut set = DisabledSet::default();

        for name in &rules.always_disabled {
            set.insert(name, DisableReason::AlwaysDisabled);
        }

        for decl in &registry.structs {
            if let Some(extends) = decl.extends.as_deref() {
                if !rules.extends_aggregator(extends) {
                    set.insert(&decl.name, DisableReason::ForeignExtends);
                }
            }
        }

        for feature in registry.features.iter().filter(|f| f.api == rules.restricted_api) {
            for name in feature.requires.types.iter().filter(|n| rules.is_capability(n)) {
                set.insert(name, DisableReason::RestrictedApi(feature.name.clone()));
            }
        }

        for ext in &registry.extensions {
            if !rules.extension_enabled(&ext.supported, ext.platform.as_deref()) {
                debug!(extension = %ext.name, platform = ?ext.platform, "Extension not enabled");
                for name in &ext.requires.types {
                    set.insert(name, DisableReason::UnsupportedExtension(ext.name.clone()));
                }
                continue;
            }
            for name in &ext.requires.types {
                let declared = registry.struct_decl(name).is_some() || registry.is_handle(name);
                if declared && !name.contains("Properties") && !name.contains("Features") {
                    set.insert(name, DisableReason::ExtensionPlumbing(ext.name.clone()));
                }
            }
        }

        info!(disabled = set.len(), "Disabled set computed");
        set
    }

    fn insert(&mut self, name: &str, reason: DisableReason) {
        if self.names.insert(name.to_string()) {
            self.entries.push((name.to_string(), reason));
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// A struct is disabled when its own name or the name it aliases is
    pub fn excludes(&self, decl: &StructDecl) -> bool {
        self.contains(&decl.name) || decl.alias.as_deref().is_some_and(|a| self.contains(a))
    }

    pub fn reason(&self, name: &str) -> Option<&DisableReason> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_document;

    const REGISTRY: &str = r#"
<registry>
  <types>
    <type category="handle"><type>VK_DEFINE_HANDLE</type>(<name>VkSurfaceKHR</name>)</type>
    <type category="struct" name="VkPhysicalDeviceFooFeatures" structextends="VkPhysicalDeviceFeatures2,VkDeviceCreateInfo"/>
    <type category="struct" name="VkPhysicalDeviceImageFormatInfo2"/>
    <type category="struct" name="VkPhysicalDeviceExternalImageFormatInfo" structextends="VkPhysicalDeviceImageFormatInfo2"/>
    <type category="struct" name="VkPhysicalDeviceScProperties" structextends="VkPhysicalDeviceProperties2"/>
    <type category="struct" name="VkPhysicalDeviceWin32Properties" structextends="VkPhysicalDeviceProperties2"/>
    <type category="struct" name="VkSurfaceCapabilitiesFoo"/>
    <type category="struct" name="VkPhysicalDeviceHostImageCopyProperties" structextends="VkPhysicalDeviceProperties2"/>
  </types>
  <feature api="vulkansc" name="VKSC_VERSION_1_0">
    <require><type name="VkPhysicalDeviceScProperties"/><type name="VkFaultData"/></require>
  </feature>
  <extensions>
    <extension name="VK_KHR_win32_thing" number="1" supported="vulkan" platform="win32">
      <require><type name="VkPhysicalDeviceWin32Properties"/><type name="VkWin32Handle"/></require>
    </extension>
    <extension name="VK_KHR_surface_thing" number="2" supported="vulkan">
      <require><type name="VkSurfaceKHR"/><type name="VkSurfaceCapabilitiesFoo"/><type name="VkPhysicalDeviceFooFeatures"/></require>
    </extension>
  </extensions>
</registry>"#;

    fn compute() -> DisabledSet {
        let registry = Registry::from_document(&parse_document(REGISTRY).unwrap()).unwrap();
        DisabledSet::compute(&registry, &FilterRules::default())
    }

    #[test]
    fn test_foreign_extends() {
        let set = compute();
        assert!(!set.contains("VkPhysicalDeviceFooFeatures"));
        assert!(!set.contains("VkPhysicalDeviceImageFormatInfo2"));
        assert_eq!(
            set.reason("VkPhysicalDeviceExternalImageFormatInfo"),
            Some(&DisableReason::ForeignExtends)
        );
    }

    #[test]
    fn test_restricted_api() {
        let set = compute();
        assert_eq!(
            set.reason("VkPhysicalDeviceScProperties"),
            Some(&DisableReason::RestrictedApi("VKSC_VERSION_1_0".to_string()))
        );
        assert!(!set.contains("VkFaultData"));
    }

    #[test]
    fn test_unsupported_extension_disables_every_type() {
        let set = compute();
        assert!(set.contains("VkPhysicalDeviceWin32Properties"));
        assert!(set.contains("VkWin32Handle"));
    }

    #[test]
    fn test_enabled_extension_plumbing() {
        let set = compute();
        assert!(set.contains("VkSurfaceKHR"));
        assert!(set.contains("VkSurfaceCapabilitiesFoo"));
        assert!(!set.contains("VkPhysicalDeviceFooFeatures"));
    }

    #[test]
    fn test_seed_and_alias_exclusion() {
        let set = compute();
        assert_eq!(
            set.reason("VkPhysicalDeviceHostImageCopyProperties"),
            Some(&DisableReason::AlwaysDisabled)
        );
        let alias = StructDecl {
            name: "VkPhysicalDeviceHostImageCopyPropertiesEXT".to_string(),
            alias: Some("VkPhysicalDeviceHostImageCopyProperties".to_string()),
            extends: None,
            type_tag: None,
            members: vec![],
        };
        assert!(set.excludes(&alias));
    }
}
