//! Native traversal header emitter
//!
//! The header carries the device record, one `Iterate` template per
//! reportable shape, the `pNext` chain wiring, list resizing and format
//! queries. Everything is rendered from [`RegistryModel`] tables; the few
//! irregular blocks come from [`crate::fragments`].

use crate::fragments::{
    CHAIN_CATEGORIES, DEVICE_TAIL_MEMBERS, ENUM_TRAITS_SKIPPED, HEADER_EPILOGUE, HEADER_PREAMBLE,
    PROPERTIES_SETTER_LINE, TRAVERSAL_VARIABLES,
};
use crate::Result;
use std::fmt::Write;
use tracing::info;
use vkcaps_core::mapping::{ListMember, BASE_VERSION_OWNER};
use vkcaps_core::naming::{
    capability_struct_to_field_name, extension_member_key, extension_to_field_name, extension_to_wrapper_name,
    list_member_to_field_name, to_display_name,
};
use vkcaps_core::{CoreGroup, RegistryError, RegistryModel, StructEntry};

const VISITOR_JOIN: &str = " &&\n         ";

/// Render the traversal header for a built model
pub fn generate_header(model: &RegistryModel) -> Result<String> {
    let mut w = String::new();
    w.push_str(HEADER_PREAMBLE);

    write_extension_wrappers(&mut w, model)?;
    write_core_groups(&mut w, model)?;
    write_device(&mut w, model)?;
    write_enum_traits(&mut w, model)?;
    write_struct_templates(&mut w, model)?;
    write_core_templates(&mut w, model)?;
    write_extension_templates(&mut w, model)?;
    write_version_visits(&mut w, model)?;
    write_chain_init(&mut w, model)?;
    write_list_resizing(&mut w, model)?;
    write_format_queries(&mut w, model)?;

    w.push_str(HEADER_EPILOGUE);
    info!(bytes = w.len(), "Traversal header generated");
    Ok(w)
}

/// One struct held by value in a generated record
struct Record<'a> {
    field: String,
    struct_name: &'a str,
}

impl<'a> Record<'a> {
    fn new(struct_name: &'a str) -> Self {
        Self {
            field: capability_struct_to_field_name(struct_name),
            struct_name,
        }
    }
}

/// Structs held directly by the device record, deduplicated by field name
fn device_records(model: &RegistryModel) -> Vec<Record<'_>> {
    let mappings = &model.mappings;
    let names = mappings
        .features
        .iter()
        .flat_map(|f| f.structs.iter().map(|s| s.name.as_str()))
        .chain(mappings.independent.iter().map(String::as_str))
        .chain(model.rules.device_structs.iter().map(String::as_str));

    let mut records: Vec<Record> = Vec::new();
    for name in names {
        let record = Record::new(name);
        if !records.iter().any(|r| r.field == record.field) {
            records.push(record);
        }
    }
    records
}

fn core_field(struct_name: &str) -> &'static str {
    if struct_name.contains("Properties") {
        "properties"
    } else {
        "features"
    }
}

fn extends_category(model: &RegistryModel, struct_name: &str, category: &str) -> bool {
    let Some(extends) = model.mappings.extends_of(struct_name) else {
        return false;
    };
    CHAIN_CATEGORIES
        .iter()
        .any(|(cat, aggregator)| *cat == category && extends.contains(aggregator))
}

/// List members of a Properties struct that get a growable companion
fn list_members<'m>(model: &'m RegistryModel, struct_name: &str) -> &'m [ListMember] {
    if !struct_name.contains("Properties") {
        return &[];
    }
    let canonical = model.mappings.canonical(struct_name);
    model
        .mappings
        .dynamic_list(canonical)
        .map(|d| d.members.as_slice())
        .unwrap_or_default()
}

fn write_list_vectors<'a>(
    w: &mut String,
    model: &RegistryModel,
    indent: &str,
    structs: impl Iterator<Item = &'a str>,
) -> Result<()> {
    let mut seen: Vec<String> = Vec::new();
    for name in structs {
        for member in list_members(model, name) {
            let field = list_member_to_field_name(&member.name);
            if seen.contains(&field) {
                continue;
            }
            writeln!(w, "{}std::vector<{}> {};", indent, member.type_name, field)?;
            seen.push(field);
        }
    }
    Ok(())
}

fn write_extension_wrappers(w: &mut String, model: &RegistryModel) -> Result<()> {
    for ext in &model.mappings.extensions {
        let wrapper = extension_to_wrapper_name(&ext.name);
        let records: Vec<Record> = ext.structs.iter().map(|s| Record::new(&s.name)).collect();

        writeln!(w, "struct {} {{", wrapper)?;
        writeln!(w, "  {}() {{", wrapper)?;
        writeln!(w, "    reported = false;")?;
        for record in &records {
            writeln!(w, "    memset(&{}, 0, sizeof({}));", record.field, record.struct_name)?;
        }
        writeln!(w, "  }}")?;
        writeln!(w, "  bool reported;")?;
        for record in &records {
            writeln!(w, "  {} {};", record.struct_name, record.field)?;
        }
        write_list_vectors(w, model, "  ", records.iter().map(|r| r.struct_name))?;
        writeln!(w, "}};")?;
        writeln!(w)?;
    }
    Ok(())
}

fn write_core_groups(w: &mut String, model: &RegistryModel) -> Result<()> {
    for group in &model.mappings.core_groups {
        let name = format!("VkJson{}", group.key);
        writeln!(w, "struct {} {{", name)?;
        writeln!(w, "  {}() {{", name)?;
        for entry in &group.structs {
            writeln!(w, "    memset(&{}, 0, sizeof({}));", core_field(&entry.name), entry.name)?;
        }
        writeln!(w, "  }}")?;
        for entry in &group.structs {
            writeln!(w, "  {} {};", entry.name, core_field(&entry.name))?;
        }
        write_list_vectors(w, model, "  ", group.structs.iter().map(|s| s.name.as_str()))?;
        writeln!(w, "}};")?;
        writeln!(w)?;
    }
    Ok(())
}

fn write_device(w: &mut String, model: &RegistryModel) -> Result<()> {
    let records = device_records(model);

    writeln!(w, "struct VkJsonDevice {{")?;
    writeln!(w, "  VkJsonDevice() {{")?;
    for record in &records {
        writeln!(w, "    memset(&{}, 0, sizeof({}));", record.field, record.struct_name)?;
    }
    writeln!(w, "  }}")?;
    for record in &records {
        writeln!(w, "  {} {};", record.struct_name, record.field)?;
    }
    for group in &model.mappings.core_groups {
        writeln!(w, "  VkJson{} {};", group.key, group.key.to_lowercase())?;
    }
    for ext in &model.mappings.extensions {
        writeln!(
            w,
            "  {} {};",
            extension_to_wrapper_name(&ext.name),
            extension_to_field_name(&ext.name)
        )?;
    }
    write_list_vectors(w, model, "  ", records.iter().map(|r| r.struct_name))?;
    w.push_str(DEVICE_TAIL_MEMBERS);
    writeln!(w, "}};")?;
    writeln!(w)?;
    Ok(())
}

fn write_enum_traits(w: &mut String, model: &RegistryModel) -> Result<()> {
    for membership in &model.mappings.enum_members {
        if ENUM_TRAITS_SKIPPED.contains(&membership.name.as_str()) {
            continue;
        }
        writeln!(w, "template <>")?;
        writeln!(w, "struct EnumTraits<{}> {{", membership.name)?;
        writeln!(w, "  static bool exist(uint32_t e) {{")?;
        writeln!(w, "    switch (e) {{")?;
        for member in &membership.members {
            writeln!(w, "      case {}:", member)?;
        }
        if !membership.members.is_empty() {
            writeln!(w, "        return true;")?;
        }
        writeln!(w, "    }}")?;
        writeln!(w, "    return false;")?;
        writeln!(w, "  }}")?;
        writeln!(w, "}};")?;
        writeln!(w)?;
    }
    Ok(())
}

fn write_iterate(w: &mut String, param_type: &str, param: &str, calls: &[String]) -> Result<()> {
    writeln!(w, "template <typename Visitor>")?;
    writeln!(w, "inline bool Iterate(Visitor* visitor, {}* {}) {{", param_type, param)?;
    if calls.is_empty() {
        writeln!(w, "  return true;")?;
    } else {
        writeln!(w, "  return {};", calls.join(VISITOR_JOIN))?;
    }
    writeln!(w, "}}")?;
    writeln!(w)?;
    Ok(())
}

fn write_struct_templates(w: &mut String, model: &RegistryModel) -> Result<()> {
    for entry in &model.closure.order {
        let Some(decl) = model.registry.struct_decl(&entry.name) else {
            continue;
        };
        let Some((_, var)) = TRAVERSAL_VARIABLES.iter().find(|(marker, _)| decl.name.contains(marker)) else {
            continue;
        };
        let calls: Vec<String> = decl
            .members
            .iter()
            .map(|member| match member.len_attr.as_deref() {
                Some(size) if member.is_pointer() => format!(
                    "visitor->VisitArray(\"{}\", {}->{}, &{}->{})",
                    member.name, var, size, var, member.name
                ),
                _ => format!("visitor->Visit(\"{}\", &{}->{})", member.name, var, member.name),
            })
            .collect();
        write_iterate(w, &decl.name, var, &calls)?;
    }
    Ok(())
}

fn write_core_templates(w: &mut String, model: &RegistryModel) -> Result<()> {
    for group in &model.mappings.core_groups {
        let calls: Vec<String> = group
            .structs
            .iter()
            .map(|entry| {
                let field = core_field(&entry.name);
                format!("visitor->Visit(\"{}\", &core->{})", field, field)
            })
            .collect();
        write_iterate(w, &format!("VkJson{}", group.key), "core", &calls)?;
    }
    Ok(())
}

fn write_extension_templates(w: &mut String, model: &RegistryModel) -> Result<()> {
    for ext in &model.mappings.extensions {
        let calls: Vec<String> = ext
            .structs
            .iter()
            .map(|entry| {
                format!(
                    "visitor->Visit(\"{}\", &structs->{})",
                    extension_member_key(&entry.name),
                    capability_struct_to_field_name(&entry.name)
                )
            })
            .collect();
        write_iterate(w, &extension_to_wrapper_name(&ext.name), "structs", &calls)?;
    }
    Ok(())
}

/// `VK_VERSION_1_2` to `1_2`
fn version_suffix(feature: &str) -> Option<&str> {
    feature.strip_prefix("VK_VERSION_")
}

fn write_version_visits(w: &mut String, model: &RegistryModel) -> Result<()> {
    for feature in &model.mappings.features {
        let Some(suffix) = version_suffix(&feature.name) else {
            continue;
        };
        let calls: Vec<String> = feature
            .structs
            .iter()
            .map(|entry| {
                let field = capability_struct_to_field_name(&entry.name);
                format!("visitor->Visit(\"{}\", &device->{})", to_display_name(&field), field)
            })
            .collect();
        writeln!(w, "template <typename Visitor>")?;
        writeln!(w, "inline bool VisitVersion{}(Visitor* visitor, VkJsonDevice* device) {{", suffix)?;
        writeln!(w, "  return {};", calls.join(VISITOR_JOIN))?;
        writeln!(w, "}}")?;
        writeln!(w)?;
    }
    Ok(())
}

fn write_chain_link(w: &mut String, indent: &str, target: &str, entry: &StructEntry, head: &str) -> Result<()> {
    if entry.type_tag.is_empty() {
        return Err(RegistryError::MissingStructureType(entry.name.clone()).into());
    }
    writeln!(w, "{}{}.sType = {};", indent, target, entry.type_tag)?;
    writeln!(w, "{}{}.pNext = {}.pNext;", indent, target, head)?;
    writeln!(w, "{}{}.pNext = &{};", indent, head, target)?;
    Ok(())
}

/// Core group digits are a one-digit major followed by the minor, so
/// `Vulkan14` guards on `VK_API_VERSION_1_4`. Groups always carry at least
/// two digits.
fn core_api_version(group: &CoreGroup) -> String {
    let (major, minor) = group.digits.split_at(1);
    format!("VK_API_VERSION_{}_{}", major, minor)
}

fn write_core_chains(w: &mut String, model: &RegistryModel) -> Result<()> {
    for group in &model.mappings.core_groups {
        let mut properties = String::new();
        let mut features = String::new();
        for entry in &group.structs {
            let (out, field) = if extends_category(model, &entry.name, "Features") {
                (&mut features, "features")
            } else if extends_category(model, &entry.name, "Properties") {
                (&mut properties, "properties")
            } else {
                return Err(RegistryError::UnknownExtendsMapping(entry.name.clone()).into());
            };
            let target = format!("device.{}.{}", group.key.to_lowercase(), field);
            write_chain_link(out, "    ", &target, entry, field)?;
        }
        writeln!(w, "  if (device.properties.apiVersion >= {}) {{", core_api_version(group))?;
        w.push_str(&properties);
        w.push_str(&features);
        writeln!(w, "  }}")?;
    }
    Ok(())
}

fn write_version_chains(w: &mut String, model: &RegistryModel) -> Result<()> {
    for feature in model.mappings.features.iter().filter(|f| !f.structs.is_empty()) {
        let guard = version_suffix(&feature.name).map(|v| format!("VK_API_VERSION_{}", v));
        let indent = if guard.is_some() { "    " } else { "  " };
        if let Some(guard) = &guard {
            writeln!(w, "  if (device.properties.apiVersion >= {}) {{", guard)?;
        }
        for (category, _) in CHAIN_CATEGORIES {
            let head = category.to_lowercase();
            for entry in feature.structs.iter().filter(|s| s.name.contains(category)) {
                let target = format!("device.{}", capability_struct_to_field_name(&entry.name));
                write_chain_link(w, indent, &target, entry, &head)?;
            }
        }
        if guard.is_some() {
            writeln!(w, "  }}")?;
        }
    }
    Ok(())
}

fn write_extension_chains(w: &mut String, model: &RegistryModel) -> Result<()> {
    for (category, _) in CHAIN_CATEGORIES {
        let head = category.to_lowercase();
        for ext in &model.mappings.extensions {
            let wrapper_field = extension_to_field_name(&ext.name);
            let mut block = String::new();
            for entry in &ext.structs {
                if model.mappings.extends_of(&entry.name).is_none()
                    && entry.name.to_lowercase().contains(&head)
                {
                    return Err(RegistryError::UnknownExtendsMapping(entry.name.clone()).into());
                }
                if !extends_category(model, &entry.name, category) {
                    continue;
                }
                let target = format!(
                    "device.{}.{}",
                    wrapper_field,
                    capability_struct_to_field_name(&entry.name)
                );
                write_chain_link(&mut block, "    ", &target, entry, &head)?;
            }
            if block.is_empty() {
                continue;
            }
            writeln!(w, "  if (HasExtension(\"{}\", device.extensions)) {{", ext.name)?;
            writeln!(w, "    device.{}.reported = true;", wrapper_field)?;
            w.push_str(&block);
            writeln!(w, "  }}")?;
        }
    }
    Ok(())
}

fn write_chain_init(w: &mut String, model: &RegistryModel) -> Result<()> {
    writeln!(w, "inline void VkJsonChainStructs(VkJsonDevice& device,")?;
    writeln!(w, "                               VkPhysicalDeviceProperties2& properties,")?;
    writeln!(w, "                               VkPhysicalDeviceFeatures2& features) {{")?;
    write_core_chains(w, model)?;
    write_version_chains(w, model)?;
    write_extension_chains(w, model)?;
    writeln!(w, "}}")?;
    writeln!(w)?;
    Ok(())
}

/// Resize blocks for every list member of one struct instance
///
/// `owner` is the path holding the companion vectors and `instance` the
/// path of the struct itself.
fn write_resize_blocks(w: &mut String, owner: &str, instance: &str, lists: &[ListMember]) -> Result<()> {
    let conditions: Vec<String> = lists
        .iter()
        .map(|m| format!("{}.{}", instance, m.size_member))
        .collect();
    let merged = lists.len() > 1;
    let indent = if merged { "    " } else { "  " };

    if merged {
        let combined: Vec<String> = conditions.iter().map(|c| format!("{} > 0", c)).collect();
        writeln!(w, "  if ({}) {{", combined.join(" || "))?;
    }
    for (member, condition) in lists.iter().zip(&conditions) {
        let vector = format!("{}.{}", owner, list_member_to_field_name(&member.name));
        writeln!(w, "{}if ({} > 0) {{", indent, condition)?;
        writeln!(w, "{}  {}.resize({});", indent, vector, condition)?;
        writeln!(w, "{}  {}.{} = {}.data();", indent, instance, member.name, vector)?;
        if !merged {
            writeln!(w, "{}  {}", indent, PROPERTIES_SETTER_LINE)?;
        }
        writeln!(w, "{}}}", indent)?;
    }
    if merged {
        writeln!(w, "    {}", PROPERTIES_SETTER_LINE)?;
        writeln!(w, "  }}")?;
    }
    Ok(())
}

fn write_list_resizing(w: &mut String, model: &RegistryModel) -> Result<()> {
    writeln!(w, "inline void VkJsonResizeLists(VkPhysicalDevice physical_device,")?;
    writeln!(w, "                              VkJsonDevice& device,")?;
    writeln!(w, "                              VkPhysicalDeviceProperties2& properties) {{")?;

    for group in &model.mappings.core_groups {
        let owner = format!("device.{}", group.key.to_lowercase());
        for entry in group.structs.iter().filter(|s| extends_category(model, &s.name, "Properties")) {
            let lists = list_members(model, &entry.name);
            if !lists.is_empty() {
                write_resize_blocks(w, &owner, &format!("{}.{}", owner, core_field(&entry.name)), lists)?;
            }
        }
    }
    for record in device_records(model) {
        if !extends_category(model, record.struct_name, "Properties") {
            continue;
        }
        let lists = list_members(model, record.struct_name);
        if !lists.is_empty() {
            write_resize_blocks(w, "device", &format!("device.{}", record.field), lists)?;
        }
    }
    for ext in &model.mappings.extensions {
        let owner = format!("device.{}", extension_to_field_name(&ext.name));
        for entry in ext.structs.iter().filter(|s| extends_category(model, &s.name, "Properties")) {
            let lists = list_members(model, &entry.name);
            if !lists.is_empty() {
                let instance = format!("{}.{}", owner, capability_struct_to_field_name(&entry.name));
                write_resize_blocks(w, &owner, &instance, lists)?;
            }
        }
    }

    writeln!(w, "}}")?;
    writeln!(w)?;
    Ok(())
}

fn write_format_range(w: &mut String, indent: &str, first: &str, last: &str) -> Result<()> {
    if first == last {
        writeln!(w, "{}{{", indent)?;
        writeln!(w, "{}  VkFormat format = {};", indent, first)?;
        writeln!(w, "{}  vkGetPhysicalDeviceFormatProperties(physical_device, format,", indent)?;
        writeln!(w, "{}                                      &format_properties);", indent)?;
        writeln!(w, "{}  device.formats.insert(std::make_pair(format, format_properties));", indent)?;
        writeln!(w, "{}}}", indent)?;
    } else {
        writeln!(w, "{}for (VkFormat format = {};", indent, first)?;
        writeln!(w, "{}     format <= {};", indent, last)?;
        writeln!(w, "{}     format = static_cast<VkFormat>(format + 1)) {{", indent)?;
        writeln!(w, "{}  vkGetPhysicalDeviceFormatProperties(physical_device, format,", indent)?;
        writeln!(w, "{}                                      &format_properties);", indent)?;
        writeln!(w, "{}  device.formats.insert(std::make_pair(format, format_properties));", indent)?;
        writeln!(w, "{}}}", indent)?;
    }
    Ok(())
}

fn write_format_queries(w: &mut String, model: &RegistryModel) -> Result<()> {
    let Some(growable) = &model.mappings.growable else {
        return Ok(());
    };
    writeln!(w, "inline void VkJsonQueryFormats(VkPhysicalDevice physical_device,")?;
    writeln!(w, "                               VkJsonDevice& device) {{")?;
    writeln!(w, "  VkFormatProperties format_properties;")?;

    for owner in growable.owners.iter().filter(|o| o.owner.starts_with("VK_VERSION_")) {
        let guard = version_suffix(&owner.owner)
            .filter(|_| owner.owner != BASE_VERSION_OWNER)
            .map(|v| format!("VK_API_VERSION_{}", v));
        let indent = if guard.is_some() { "    " } else { "  " };
        if let Some(guard) = &guard {
            writeln!(w, "  if (device.properties.apiVersion >= {}) {{", guard)?;
        }
        for range in &owner.ranges {
            write_format_range(w, indent, &range.first, &range.last)?;
        }
        if guard.is_some() {
            writeln!(w, "  }}")?;
        }
    }
    for owner in growable.owners.iter().filter(|o| !o.owner.starts_with("VK_VERSION_")) {
        for range in &owner.ranges {
            writeln!(w, "  if (HasExtension(\"{}\", device.extensions)) {{", owner.owner)?;
            write_format_range(w, "    ", &range.first, &range.last)?;
            writeln!(w, "  }}")?;
        }
    }

    writeln!(w, "}}")?;
    writeln!(w)?;
    Ok(())
}
