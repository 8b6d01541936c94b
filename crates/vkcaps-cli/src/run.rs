//! One generation run: load, build, render, write

use crate::config::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;
use vkcaps_codegen::generate;
use vkcaps_core::RegistryModel;

/// Counts reported after a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub structs: usize,
    pub disabled: usize,
    pub reportable: usize,
    pub core_groups: usize,
    pub features: usize,
    pub extensions: usize,
    pub independent: usize,
    pub module_bytes: usize,
    pub header_bytes: usize,
}

/// Run the pipeline; outputs are only written when `write` is set
pub fn run(config: &Config, write: bool) -> Result<Summary> {
    let model = RegistryModel::load(&config.input.registry, config.rules.clone())
        .with_context(|| format!("Failed to process registry {}", config.input.registry.display()))?;
    let outputs = generate(&model).context("Failed to generate outputs")?;

    if write {
        write_output(&config.output.module, &outputs.module)?;
        write_output(&config.output.header, &outputs.header)?;
        if let Some(path) = &config.output.model_json {
            let json = model.to_json().context("Failed to serialize model")?;
            write_output(path, &json)?;
        }
    }

    let mappings = &model.mappings;
    Ok(Summary {
        structs: model.closure.order.len(),
        disabled: model.disabled.len(),
        reportable: mappings.reportable.len(),
        core_groups: mappings.core_groups.len(),
        features: mappings.features.len(),
        extensions: mappings.extensions.len(),
        independent: mappings.independent.len(),
        module_bytes: outputs.module.len(),
        header_bytes: outputs.header.len(),
    })
}

fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = content.len(), "Wrote output");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const REGISTRY: &str = r#"
<registry>
  <types>
    <type category="struct" name="VkPhysicalDeviceFooProperties" structextends="VkPhysicalDeviceProperties2">
      <member values="VK_STRUCTURE_TYPE_PHYSICAL_DEVICE_FOO_PROPERTIES"><type>VkStructureType</type> <name>sType</name></member>
      <member><type>void</type>* <name>pNext</name></member>
      <member><type>uint32_t</type> <name>maxFoo</name></member>
    </type>
  </types>
</registry>"#;

    fn config_in(dir: &TempDir) -> Config {
        let registry = dir.path().join("vk.xml");
        fs::write(&registry, REGISTRY).unwrap();
        let mut config = Config::default();
        config.input.registry = registry;
        config.output.module = dir.path().join("gen/vk_registry.rs");
        config.output.header = dir.path().join("gen/vkjson.h");
        config.output.model_json = Some(dir.path().join("gen/model.json"));
        config
    }

    #[test]
    fn test_run_writes_outputs() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let summary = run(&config, true).unwrap();
        assert_eq!(summary.reportable, 1);
        assert_eq!(summary.independent, 1);

        let module = fs::read_to_string(&config.output.module).unwrap();
        assert!(module.contains("pub struct VkPhysicalDeviceFooProperties {"));
        assert_eq!(module.len(), summary.module_bytes);
        let header = fs::read_to_string(&config.output.header).unwrap();
        assert!(header.contains("VkPhysicalDeviceFooProperties foo_properties;"));
        assert!(dir.path().join("gen/model.json").exists());
    }

    #[test]
    fn test_check_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        run(&config, false).unwrap();
        assert!(!config.output.module.exists());
        assert!(!config.output.header.exists());
    }

    #[test]
    fn test_missing_registry_fails() {
        let dir = TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.input.registry = dir.path().join("absent.xml");

        let err = run(&config, true).unwrap_err();
        assert!(err.to_string().contains("absent.xml"));
        assert!(!config.output.module.exists());
    }
}
