//! Generated Rust module writer
//!
//! Sections follow a fixed order: enumerations, constants, version
//! identifiers, type aliases, handles, structs, struct aliases, then the
//! mapping tables.

use crate::fragments::MODULE_PREAMBLE;
use crate::Result;
use std::fmt::Write;
use tracing::{debug, info};
use vkcaps_core::closure::{classify, TypeClass};
use vkcaps_core::mapping::StructEntry;
use vkcaps_core::types::{EnumDecl, EnumValue, Member};
use vkcaps_core::{RegistryError, RegistryModel};

const RUST_KEYWORDS: &[&str] = &[
    "as", "box", "break", "const", "crate", "enum", "fn", "impl", "loop", "match", "mod", "move", "ref", "self",
    "static", "struct", "trait", "type", "use", "where",
];

/// Render the registry module for a built model
pub fn generate_module(model: &RegistryModel) -> Result<String> {
    let mut w = String::new();
    w.push_str(MODULE_PREAMBLE);

    write_enums(&mut w, model)?;
    write_constants(&mut w, model)?;
    write_type_aliases(&mut w, model)?;
    write_handles(&mut w, model)?;
    write_structs(&mut w, model)?;
    write_struct_aliases(&mut w, model)?;
    write_tables(&mut w, model)?;

    info!(bytes = w.len(), "Registry module generated");
    Ok(w)
}

/// Rust spelling of a scalar member type
fn scalar_type(name: &str) -> &str {
    match name {
        "uint8_t" => "u8",
        "uint16_t" => "u16",
        "uint32_t" => "u32",
        "uint64_t" => "u64",
        "int8_t" => "i8",
        "int16_t" => "i16",
        "int32_t" | "int" => "i32",
        "int64_t" => "i64",
        "float" | "float_t" => "f32",
        "double" => "f64",
        "size_t" => "usize",
        "char" => "c_char",
        "void" => "c_void",
        "str" => "*const c_char",
        other => other,
    }
}

fn constant_type(type_name: &str) -> &'static str {
    match type_name {
        "uint64_t" => "u64",
        "int32_t" => "i32",
        "float" => "f32",
        _ => "u32",
    }
}

fn field_name(name: &str) -> String {
    if RUST_KEYWORDS.contains(&name) {
        format!("r#{}", name)
    } else {
        name.to_string()
    }
}

fn array_len_expr(len: &str) -> String {
    match len.parse::<usize>() {
        Ok(n) => n.to_string(),
        Err(_) => format!("{} as usize", len),
    }
}

/// Full Rust type of a struct member, pointers and arrays included
pub fn member_type(model: &RegistryModel, owner: &str, member: &Member) -> vkcaps_core::Result<String> {
    let mut ty = match classify(&model.registry, &member.type_name) {
        TypeClass::Scalar => scalar_type(&member.type_name).to_string(),
        TypeClass::Declared(_) => member.type_name.clone(),
        TypeClass::Unknown => {
            return Err(RegistryError::UnknownType {
                type_name: member.type_name.clone(),
                c_type: member.c_type.clone(),
                struct_name: owner.to_string(),
            })
        }
    };
    for level in 0..member.pointer_depth {
        let qualifier = if level == 0 && member.is_const { "*const" } else { "*mut" };
        ty = format!("{} {}", qualifier, ty);
    }
    if let Some(len) = &member.array_len {
        ty = format!("[{}; {}]", ty, array_len_expr(len));
    }
    Ok(ty)
}

fn enum_repr(decl: &EnumDecl) -> &'static str {
    if decl.kind != "bitmask" {
        return "i32";
    }
    let wide = decl.members.iter().any(|m| match &m.value {
        EnumValue::BitPos(_) => m.value.as_i64().is_some_and(|bit| bit >= 32),
        EnumValue::Value(_) => m.value.as_i64().is_some_and(|v| v > i64::from(u32::MAX)),
    });
    if wide {
        "u64"
    } else {
        "u32"
    }
}

fn enum_value_expr(value: &EnumValue) -> Option<String> {
    let n = value.as_i64()?;
    Some(match value {
        EnumValue::BitPos(_) => format!("1 << {}", n),
        EnumValue::Value(_) => n.to_string(),
    })
}

fn write_enums(w: &mut String, model: &RegistryModel) -> Result<()> {
    let growable = model.mappings.growable.as_ref();
    for decl in model
        .registry
        .enums
        .iter()
        .filter(|e| model.closure.uses_enum(&e.name))
    {
        writeln!(w)?;
        writeln!(w, "#[repr(transparent)]")?;
        writeln!(w, "#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]")?;
        writeln!(w, "pub struct {}(pub {});", decl.name, enum_repr(decl))?;
        writeln!(w)?;
        writeln!(w, "impl {} {{", decl.name)?;
        for member in &decl.members {
            match enum_value_expr(&member.value) {
                Some(expr) => writeln!(w, "    pub const {}: Self = Self({});", member.name, expr)?,
                None => debug!(enum_name = %decl.name, member = %member.name, "Enumerant without a numeric value"),
            }
        }
        if let Some(growable) = growable.filter(|g| g.name == decl.name) {
            for (name, value) in &growable.added {
                if !decl.members.iter().any(|m| &m.name == name) {
                    writeln!(w, "    pub const {}: Self = Self({});", name, value)?;
                }
            }
        }
        writeln!(w, "}}")?;
    }
    Ok(())
}

fn constant_literal(value: &str, ty: &str) -> String {
    if ty == "f32" && !value.contains(['.', 'e', 'E']) {
        format!("{}.0", value)
    } else {
        value.to_string()
    }
}

fn write_constants(w: &mut String, model: &RegistryModel) -> Result<()> {
    writeln!(w)?;
    for constant in &model.registry.api_constants {
        let ty = constant_type(&constant.type_name);
        writeln!(
            w,
            "pub const {}: {} = {};",
            constant.name,
            ty,
            constant_literal(&constant.value, ty)
        )?;
    }

    writeln!(w)?;
    for (name, version) in &model.registry.api_versions {
        writeln!(w, "pub const {}: u32 = {};", name, version.packed())?;
    }
    Ok(())
}

fn write_type_aliases(w: &mut String, model: &RegistryModel) -> Result<()> {
    let registry = &model.registry;
    writeln!(w)?;
    for name in &model.closure.aliases {
        if registry.struct_decl(name).is_some() {
            continue;
        }
        if let Some(flags) = registry.flag_alias(name) {
            writeln!(w, "pub type {} = {};", name, flags)?;
        } else if let Some(target) = registry.alias_target(name) {
            writeln!(w, "pub type {} = {};", name, target)?;
        }
    }
    for name in &model.closure.base_types {
        if let Some(underlying) = registry.base_type(name) {
            writeln!(w, "pub type {} = {};", name, scalar_type(underlying))?;
        }
    }
    Ok(())
}

fn write_handles(w: &mut String, model: &RegistryModel) -> Result<()> {
    writeln!(w)?;
    for handle in &model.closure.handles {
        writeln!(w, "pub type {} = *mut c_void;", handle)?;
    }
    Ok(())
}

fn write_structs(w: &mut String, model: &RegistryModel) -> Result<()> {
    for entry in &model.closure.order {
        let Some(decl) = model.registry.struct_decl(&entry.name) else {
            continue;
        };
        writeln!(w)?;
        writeln!(w, "#[repr(C)]")?;
        writeln!(w, "#[derive(Clone, Copy, Debug)]")?;
        if decl.members.is_empty() {
            writeln!(w, "pub struct {} {{}}", decl.name)?;
            continue;
        }
        writeln!(w, "pub struct {} {{", decl.name)?;
        for member in &decl.members {
            let ty = member_type(model, &decl.name, member)?;
            writeln!(w, "    pub {}: {},", field_name(&member.name), ty)?;
        }
        writeln!(w, "}}")?;
    }
    Ok(())
}

fn write_struct_aliases(w: &mut String, model: &RegistryModel) -> Result<()> {
    writeln!(w)?;
    for decl in &model.registry.structs {
        let Some(target) = decl.alias.as_deref() else {
            continue;
        };
        let used = model.closure.uses_alias(&decl.name);
        if used || (model.closure.contains(target) && !model.disabled.contains(&decl.name)) {
            writeln!(w, "pub type {} = {};", decl.name, target)?;
        }
    }
    Ok(())
}

fn write_names(w: &mut String, name: &str, items: &[String]) -> Result<()> {
    writeln!(w)?;
    writeln!(w, "pub const {}: &[&str] = &[", name)?;
    for item in items {
        writeln!(w, "    \"{}\",", item)?;
    }
    writeln!(w, "];")?;
    Ok(())
}

fn write_pairs<'a>(w: &mut String, name: &str, pairs: impl Iterator<Item = (&'a str, &'a str)>) -> Result<()> {
    writeln!(w)?;
    writeln!(w, "pub const {}: &[(&str, &str)] = &[", name)?;
    for (key, value) in pairs {
        writeln!(w, "    (\"{}\", \"{}\"),", key, value)?;
    }
    writeln!(w, "];")?;
    Ok(())
}

fn write_groups<'a>(
    w: &mut String,
    name: &str,
    groups: impl Iterator<Item = (&'a str, &'a [StructEntry])>,
) -> Result<()> {
    writeln!(w)?;
    writeln!(w, "pub const {}: &[(&str, &[(&str, &str)])] = &[", name)?;
    for (key, entries) in groups {
        writeln!(w, "    (")?;
        writeln!(w, "        \"{}\",", key)?;
        writeln!(w, "        &[")?;
        for entry in entries {
            writeln!(w, "            (\"{}\", \"{}\"),", entry.name, entry.type_tag)?;
        }
        writeln!(w, "        ],")?;
        writeln!(w, "    ),")?;
    }
    writeln!(w, "];")?;
    Ok(())
}

fn write_tables(w: &mut String, model: &RegistryModel) -> Result<()> {
    let mappings = &model.mappings;

    write_names(w, "REPORTABLE_STRUCTS", &mappings.reportable)?;
    write_groups(
        w,
        "EXTENSION_STRUCTS",
        mappings
            .extensions
            .iter()
            .map(|e| (e.name.as_str(), e.structs.as_slice())),
    )?;
    write_groups(
        w,
        "FEATURE_STRUCTS",
        mappings
            .features
            .iter()
            .map(|f| (f.name.as_str(), f.structs.as_slice())),
    )?;
    write_names(w, "EXTENSION_INDEPENDENT_STRUCTS", &mappings.independent)?;
    write_groups(
        w,
        "CORE_STRUCTS",
        mappings
            .core_groups
            .iter()
            .map(|g| (g.key.as_str(), g.structs.as_slice())),
    )?;
    write_pairs(
        w,
        "LIST_SIZE_MEMBERS",
        mappings.list_sizes.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    )?;
    write_pairs(
        w,
        "STRUCT_EXTENDS",
        mappings.extends.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    )?;

    writeln!(w)?;
    writeln!(w, "pub const ENUM_MEMBERS: &[(&str, &[&str])] = &[")?;
    for membership in &mappings.enum_members {
        writeln!(w, "    (")?;
        writeln!(w, "        \"{}\",", membership.name)?;
        writeln!(w, "        &[")?;
        for member in &membership.members {
            writeln!(w, "            \"{}\",", member)?;
        }
        writeln!(w, "        ],")?;
        writeln!(w, "    ),")?;
    }
    writeln!(w, "];")?;

    if let Some(growable) = &mappings.growable {
        writeln!(w)?;
        writeln!(w, "pub const GROWABLE_ENUM_RANGES: &[(&str, &[(&str, &str)])] = &[")?;
        for owner in &growable.owners {
            writeln!(w, "    (")?;
            writeln!(w, "        \"{}\",", owner.owner)?;
            writeln!(w, "        &[")?;
            for range in &owner.ranges {
                writeln!(w, "            (\"{}\", \"{}\"),", range.first, range.last)?;
            }
            writeln!(w, "        ],")?;
            writeln!(w, "    ),")?;
        }
        writeln!(w, "];")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CodegenError;
    use vkcaps_core::FilterRules;

    const REGISTRY: &str = r#"
<registry>
  <types>
    <type category="bitmask">typedef <type>VkFlags</type> <name>VkSampleCountFlags</name>;</type>
    <type category="basetype">typedef <type>uint64_t</type> <name>VkDeviceAddress</name>;</type>
    <type category="handle"><type>VK_DEFINE_HANDLE</type>(<name>VkPhysicalDevice</name>)</type>
    <type api="vulkan" category="define">#define <name>VK_API_VERSION_1_1</name> <type>VK_MAKE_API_VERSION</type>(0, 1, 1, 0)</type>
    <type category="struct" name="VkPhysicalDeviceIDProperties" structextends="VkPhysicalDeviceProperties2">
      <member values="VK_STRUCTURE_TYPE_PHYSICAL_DEVICE_ID_PROPERTIES"><type>VkStructureType</type> <name>sType</name></member>
      <member><type>void</type>* <name>pNext</name></member>
      <member><type>uint8_t</type> <name>deviceUUID</name>[<enum>VK_UUID_SIZE</enum>]</member>
      <member><type>VkSampleCountFlags</type> <name>sampleCounts</name></member>
      <member><type>VkSampleCountFlagBits</type> <name>maxSamples</name></member>
      <member><type>VkDeviceAddress</type> <name>address</name></member>
      <member><type>VkPhysicalDevice</type> <name>device</name></member>
      <member len="null-terminated">const <type>char</type>* <name>pName</name></member>
      <member><type>uint32_t</type> <name>type</name></member>
    </type>
    <type category="struct" name="VkPhysicalDeviceIDPropertiesKHR" alias="VkPhysicalDeviceIDProperties"/>
    <type category="struct" name="VkPhysicalDeviceEmptyFeatures" structextends="VkPhysicalDeviceFeatures2"/>
  </types>
  <enums name="API Constants">
    <enum type="uint32_t" value="16" name="VK_UUID_SIZE"/>
    <enum type="float" value="1000.0F" name="VK_LOD_CLAMP_NONE"/>
  </enums>
  <enums name="VkSampleCountFlagBits" type="bitmask">
    <enum bitpos="0" name="VK_SAMPLE_COUNT_1_BIT"/>
    <enum bitpos="2" name="VK_SAMPLE_COUNT_4_BIT"/>
  </enums>
  <feature api="vulkan" name="VK_VERSION_1_1">
    <require>
      <type name="VkSampleCountFlags"/>
    </require>
  </feature>
</registry>"#;

    fn module_for(xml: &str) -> Result<String> {
        let model = RegistryModel::parse(xml, FilterRules::default())?;
        generate_module(&model)
    }

    #[test]
    fn test_struct_members() {
        let module = module_for(REGISTRY).unwrap();
        assert!(module.contains("pub struct VkPhysicalDeviceIDProperties {\n"));
        assert!(module.contains("    pub deviceUUID: [u8; VK_UUID_SIZE as usize],\n"));
        assert!(module.contains("    pub sampleCounts: VkSampleCountFlags,\n"));
        assert!(module.contains("    pub pName: *const c_char,\n"));
        assert!(module.contains("    pub r#type: u32,\n"));
        assert!(!module.contains("sType"));
        assert!(module.contains("pub struct VkPhysicalDeviceEmptyFeatures {}\n"));
    }

    #[test]
    fn test_declarations() {
        let module = module_for(REGISTRY).unwrap();
        assert!(module.contains("pub struct VkSampleCountFlagBits(pub u32);"));
        assert!(module.contains("    pub const VK_SAMPLE_COUNT_4_BIT: Self = Self(1 << 2);"));
        assert!(module.contains("pub const VK_UUID_SIZE: u32 = 16;"));
        assert!(module.contains("pub const VK_LOD_CLAMP_NONE: f32 = 1000.0;"));
        assert!(module.contains("pub const VK_API_VERSION_1_1: u32 = 4198400;"));
        assert!(module.contains("pub type VkSampleCountFlags = VkFlags;"));
        assert!(module.contains("pub type VkDeviceAddress = u64;"));
        assert!(module.contains("pub type VkPhysicalDevice = *mut c_void;"));
        assert!(module.contains("pub type VkPhysicalDeviceIDPropertiesKHR = VkPhysicalDeviceIDProperties;"));
    }

    #[test]
    fn test_feature_tables_skip_empty_versions() {
        let module = module_for(REGISTRY).unwrap();
        assert!(module.contains("pub const FEATURE_STRUCTS: &[(&str, &[(&str, &str)])] = &[\n];\n"));
        assert!(!module.contains("\"VK_VERSION_1_1\""));
    }

    #[test]
    fn test_section_order() {
        let module = module_for(REGISTRY).unwrap();
        let position = |needle: &str| module.find(needle).unwrap();
        let sections = [
            "pub struct VkSampleCountFlagBits",
            "pub const VK_UUID_SIZE",
            "pub const VK_API_VERSION_1_1",
            "pub type VkSampleCountFlags",
            "pub type VkPhysicalDevice =",
            "pub struct VkPhysicalDeviceIDProperties",
            "pub type VkPhysicalDeviceIDPropertiesKHR",
            "pub const REPORTABLE_STRUCTS",
            "pub const EXTENSION_STRUCTS",
            "pub const FEATURE_STRUCTS",
            "pub const EXTENSION_INDEPENDENT_STRUCTS",
            "pub const CORE_STRUCTS",
            "pub const LIST_SIZE_MEMBERS",
            "pub const STRUCT_EXTENDS",
            "pub const ENUM_MEMBERS",
        ];
        for pair in sections.windows(2) {
            assert!(position(pair[0]) < position(pair[1]), "{} after {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_unknown_member_type_is_fatal() {
        let xml = r#"
<registry><types>
  <type category="struct" name="VkPhysicalDeviceOddProperties" structextends="VkPhysicalDeviceProperties2">
    <member><type>VkMystery</type> <name>mystery</name></member>
  </type>
</types></registry>"#;
        let err = module_for(xml).unwrap_err();
        assert!(matches!(
            err,
            CodegenError::Registry(RegistryError::UnknownType { ref type_name, .. }) if type_name == "VkMystery"
        ));
    }
}
