use std::fs;
use tempfile::TempDir;
use vkcaps_codegen::{generate, GeneratedOutputs};
use vkcaps_core::{FilterRules, RegistryModel};

const REGISTRY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<registry>
  <types>
    <type category="struct" name="VkPhysicalDeviceBarPropertiesEXT" structextends="VkPhysicalDeviceProperties2">
      <member values="VK_STRUCTURE_TYPE_PHYSICAL_DEVICE_BAR_PROPERTIES_EXT"><type>VkStructureType</type> <name>sType</name></member>
      <member optional="true"><type>void</type>* <name>pNext</name></member>
      <member><type>uint32_t</type> <name>maxBar</name></member>
      <member><type>float</type> <name>minBar</name></member>
    </type>
  </types>
  <extensions>
    <extension name="VK_EXT_bar" number="7" supported="vulkan">
      <require>
        <type name="VkPhysicalDeviceBarPropertiesEXT"/>
      </require>
    </extension>
  </extensions>
</registry>
"#;

/// Collapse every whitespace run to one space so layout changes do not matter
fn normalize(code: &str) -> String {
    code.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn assert_contains_code(haystack: &str, needle: &str) {
    let haystack = normalize(haystack);
    let needle = normalize(needle);
    assert!(haystack.contains(&needle), "missing fragment:\n{}", needle);
}

fn outputs() -> GeneratedOutputs {
    let model = RegistryModel::parse(REGISTRY, FilterRules::default()).unwrap();
    generate(&model).unwrap()
}

#[test]
fn test_single_struct_pipeline() {
    let outputs = outputs();

    assert_contains_code(
        &outputs.header,
        r#"
        struct VkJsonExtBar {
          VkJsonExtBar() {
            reported = false;
            memset(&bar_properties_ext, 0, sizeof(VkPhysicalDeviceBarPropertiesEXT));
          }
          bool reported;
          VkPhysicalDeviceBarPropertiesEXT bar_properties_ext;
        };
        "#,
    );
    assert_contains_code(
        &outputs.header,
        r#"
        template <typename Visitor>
        inline bool Iterate(Visitor* visitor, VkPhysicalDeviceBarPropertiesEXT* properties) {
          return visitor->Visit("maxBar", &properties->maxBar) &&
                 visitor->Visit("minBar", &properties->minBar);
        }
        "#,
    );
    assert_contains_code(
        &outputs.module,
        r#"
        #[repr(C)]
        #[derive(Clone, Copy, Debug)]
        pub struct VkPhysicalDeviceBarPropertiesEXT {
            pub maxBar: u32,
            pub minBar: f32,
        }
        "#,
    );
}

#[test]
fn test_mapping_tables_in_module() {
    let outputs = outputs();
    assert_contains_code(
        &outputs.module,
        r#"
        pub const EXTENSION_STRUCTS: &[(&str, &[(&str, &str)])] = &[
            (
                "VK_EXT_bar",
                &[
                    ("VkPhysicalDeviceBarPropertiesEXT", "VK_STRUCTURE_TYPE_PHYSICAL_DEVICE_BAR_PROPERTIES_EXT"),
                ],
            ),
        ];
        "#,
    );
    assert_contains_code(
        &outputs.module,
        r#"pub const EXTENSION_INDEPENDENT_STRUCTS: &[&str] = &[ ];"#,
    );
    assert_contains_code(
        &outputs.module,
        r#"("VkPhysicalDeviceBarPropertiesEXT", "VkPhysicalDeviceProperties2"),"#,
    );
}

#[test]
fn test_extension_chain_wiring() {
    let outputs = outputs();
    assert_contains_code(
        &outputs.header,
        r#"
        if (HasExtension("VK_EXT_bar", device.extensions)) {
          device.ext_bar.reported = true;
          device.ext_bar.bar_properties_ext.sType = VK_STRUCTURE_TYPE_PHYSICAL_DEVICE_BAR_PROPERTIES_EXT;
          device.ext_bar.bar_properties_ext.pNext = properties.pNext;
          properties.pNext = &device.ext_bar.bar_properties_ext;
        }
        "#,
    );
}

const CORE_ONLY_REGISTRY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<registry>
  <types>
    <type category="struct" name="VkPhysicalDeviceBazProperties" structextends="VkPhysicalDeviceProperties2">
      <member values="VK_STRUCTURE_TYPE_PHYSICAL_DEVICE_BAZ_PROPERTIES"><type>VkStructureType</type> <name>sType</name></member>
      <member optional="true"><type>void</type>* <name>pNext</name></member>
      <member><type>uint32_t</type> <name>maxBaz</name></member>
      <member><type>uint64_t</type> <name>bazSize</name></member>
    </type>
  </types>
</registry>
"#;

/// The text from `start` up to and including the next line that is exactly `end`
fn section<'a>(code: &'a str, start: &str, end: &str) -> &'a str {
    let from = code.find(start).unwrap_or_else(|| panic!("missing {}", start));
    let rest = &code[from..];
    let to = rest.find(end).unwrap_or_else(|| panic!("unterminated {}", start));
    &rest[..to + end.len()]
}

#[test]
fn test_struct_without_extension() {
    let model = RegistryModel::parse(CORE_ONLY_REGISTRY, FilterRules::default()).unwrap();
    assert!(model.mappings.extensions.is_empty());
    assert_eq!(model.mappings.independent, vec!["VkPhysicalDeviceBazProperties".to_string()]);
    let outputs = generate(&model).unwrap();

    let device = section(&outputs.header, "struct VkJsonDevice {", "\n};\n");
    assert!(device.contains("    memset(&baz_properties, 0, sizeof(VkPhysicalDeviceBazProperties));\n"));
    assert!(device.contains("  VkPhysicalDeviceBazProperties baz_properties;\n"));
    assert!(!outputs.header.contains("struct VkJsonExt"));

    let iterate = section(
        &outputs.header,
        "inline bool Iterate(Visitor* visitor, VkPhysicalDeviceBazProperties* properties) {",
        "\n}\n",
    );
    assert_eq!(iterate.matches("visitor->Visit(").count(), 2);
    assert_eq!(iterate.matches("&&").count(), 1);
    assert_eq!(
        normalize(iterate),
        normalize(
            r#"
            inline bool Iterate(Visitor* visitor, VkPhysicalDeviceBazProperties* properties) {
              return visitor->Visit("maxBaz", &properties->maxBaz) &&
                     visitor->Visit("bazSize", &properties->bazSize);
            }
            "#
        )
    );

    assert_contains_code(
        &outputs.module,
        r#"
        #[repr(C)]
        #[derive(Clone, Copy, Debug)]
        pub struct VkPhysicalDeviceBazProperties {
            pub maxBaz: u32,
            pub bazSize: u64,
        }
        "#,
    );
    assert_contains_code(
        &outputs.module,
        r#"
        pub const EXTENSION_INDEPENDENT_STRUCTS: &[&str] = &[
            "VkPhysicalDeviceBazProperties",
        ];
        "#,
    );
    assert_contains_code(
        &outputs.module,
        r#"pub const EXTENSION_STRUCTS: &[(&str, &[(&str, &str)])] = &[ ];"#,
    );
}

#[test]
fn test_generation_is_idempotent() {
    assert_eq!(outputs(), outputs());
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vk.xml");
    fs::write(&path, REGISTRY).unwrap();

    let model = RegistryModel::load(&path, FilterRules::default()).unwrap();
    assert_eq!(generate(&model).unwrap(), outputs());
}

#[test]
fn test_missing_registry_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = RegistryModel::load(&dir.path().join("absent.xml"), FilterRules::default());
    assert!(result.is_err());
}
