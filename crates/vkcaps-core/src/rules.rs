//! Fixed rule tables that steer filtering and mapping
//!
//! The defaults describe an Android-targeted Vulkan build. Every value can be
//! overridden from a TOML table.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRules {
    /// Struct names with this prefix are capability structs
    #[serde(default = "default_capability_prefix")]
    pub capability_prefix: String,
    /// Umbrella structs a reportable struct must extend
    #[serde(default = "default_aggregators")]
    pub aggregators: Vec<String>,
    /// `api` of features whose capability structs are never reported
    #[serde(default = "default_restricted_api")]
    pub restricted_api: String,
    /// The one platform whose extensions stay enabled
    #[serde(default = "default_supported_platform")]
    pub supported_platform: String,
    /// Feature `api` values mapped to structs, in processing order
    #[serde(default = "default_feature_apis")]
    pub feature_apis: Vec<String>,
    /// Enum whose extension-provided values are tracked as ranges
    #[serde(default = "default_growable_enum")]
    pub growable_enum: String,
    /// Struct names disabled regardless of the registry
    #[serde(default = "default_always_disabled")]
    pub always_disabled: Vec<String>,
    /// Structs queried outside any pNext chain and always emitted
    #[serde(default = "default_standalone_structs")]
    pub standalone_structs: Vec<String>,
    /// Capability structs every device reports without an extension
    #[serde(default = "default_device_structs")]
    pub device_structs: Vec<String>,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            capability_prefix: default_capability_prefix(),
            aggregators: default_aggregators(),
            restricted_api: default_restricted_api(),
            supported_platform: default_supported_platform(),
            feature_apis: default_feature_apis(),
            growable_enum: default_growable_enum(),
            always_disabled: default_always_disabled(),
            standalone_structs: default_standalone_structs(),
            device_structs: default_device_structs(),
        }
    }
}

fn default_capability_prefix() -> String {
    "VkPhysicalDevice".to_string()
}

fn default_aggregators() -> Vec<String> {
    vec![
        "VkPhysicalDeviceProperties2".to_string(),
        "VkPhysicalDeviceFeatures2".to_string(),
    ]
}

fn default_restricted_api() -> String {
    "vulkansc".to_string()
}

fn default_supported_platform() -> String {
    "android".to_string()
}

fn default_feature_apis() -> Vec<String> {
    vec!["vulkan,vulkansc".to_string(), "vulkan".to_string()]
}

fn default_growable_enum() -> String {
    "VkFormat".to_string()
}

fn default_always_disabled() -> Vec<String> {
    vec!["VkPhysicalDeviceHostImageCopyProperties".to_string()]
}

fn default_standalone_structs() -> Vec<String> {
    [
        "VkImageFormatProperties",
        "VkQueueFamilyProperties",
        "VkExtensionProperties",
        "VkLayerProperties",
        "VkFormatProperties",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_device_structs() -> Vec<String> {
    [
        "VkPhysicalDeviceProperties",
        "VkPhysicalDeviceFeatures",
        "VkPhysicalDeviceMemoryProperties",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl FilterRules {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn is_capability(&self, name: &str) -> bool {
        name.starts_with(&self.capability_prefix)
    }

    /// Whether a `structextends` list names one of the aggregators
    pub fn extends_aggregator(&self, extends: &str) -> bool {
        extends
            .split(',')
            .map(str::trim)
            .any(|target| self.aggregators.iter().any(|a| a == target))
    }

    /// Whether an extension with these attributes is compiled in
    pub fn extension_enabled(&self, supported: &str, platform: Option<&str>) -> bool {
        supported != "disabled" && platform.map_or(true, |p| p == self.supported_platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let rules = FilterRules::default();
        assert!(rules.is_capability("VkPhysicalDeviceIDProperties"));
        assert!(!rules.is_capability("VkExtent2D"));
        assert!(rules.extends_aggregator("VkPhysicalDeviceProperties2"));
        assert!(rules.extends_aggregator("VkPhysicalDeviceFeatures2,VkDeviceCreateInfo"));
        assert!(!rules.extends_aggregator("VkDeviceCreateInfo"));
    }

    #[test]
    fn test_extension_enabled() {
        let rules = FilterRules::default();
        assert!(rules.extension_enabled("vulkan", None));
        assert!(rules.extension_enabled("vulkan", Some("android")));
        assert!(!rules.extension_enabled("vulkan", Some("win32")));
        assert!(!rules.extension_enabled("disabled", None));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let rules = FilterRules::from_toml(
            r#"
supported_platform = "ggp"
always_disabled = []
"#,
        )
        .unwrap();
        assert_eq!(rules.supported_platform, "ggp");
        assert!(rules.always_disabled.is_empty());
        assert_eq!(rules.capability_prefix, "VkPhysicalDevice");
        assert_eq!(rules.feature_apis.len(), 2);
        assert_eq!(rules.device_structs.len(), 3);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::write(&path, "growable_enum = \"VkColorSpaceKHR\"\n").unwrap();
        let rules = FilterRules::from_file(&path).unwrap();
        assert_eq!(rules.growable_enum, "VkColorSpaceKHR");
    }
}
