//! Type, enum, constant and require-block extraction
//!
//! Walks the loaded document once and produces a [`Registry`] holding every
//! declaration the later stages need, in document order.

use crate::error::{RegistryError, Result};
use crate::types::{
    ApiConstant, ApiVersion, EnumDecl, EnumExtension, EnumMember, EnumValue, Extension,
    FeatureVersion, Member, Requirements, StructDecl, TypeKind, CHAIN_MEMBERS, FLAG_BASE_TYPES,
    NULL_TERMINATED,
};
use crate::xml::XmlElement;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Name of the enums block that holds plain numeric constants
pub const API_CONSTANTS_BLOCK: &str = "API Constants";

/// API whose declarations are extracted; `api=` variants for other APIs are skipped
pub const TARGET_API: &str = "vulkan";

fn targets_api(element: &XmlElement) -> bool {
    element
        .attr("api")
        .map_or(true, |apis| apis.split(',').any(|api| api.trim() == TARGET_API))
}

fn array_tail_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\s*([^\]]+?)\s*\]").expect("valid regex"))
}

fn api_version_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^VK_API_VERSION_\d+_\d+$").expect("valid regex"))
}

fn handle_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]").expect("valid regex"))
}

/// Every declaration extracted from one registry document
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// Struct and union declarations, alias declarations included
    pub structs: Vec<StructDecl>,
    pub enums: Vec<EnumDecl>,
    pub handles: Vec<String>,
    /// Bitmask typedefs against `VkFlags`/`VkFlags64`: (name, flag type)
    pub flag_aliases: Vec<(String, String)>,
    /// Base typedefs such as `VkDeviceAddress`: (name, underlying type)
    pub base_types: Vec<(String, String)>,
    /// `alias=` declarations of every category: (name, target)
    pub type_aliases: Vec<(String, String)>,
    pub api_constants: Vec<ApiConstant>,
    pub api_versions: Vec<(String, ApiVersion)>,
    pub extensions: Vec<Extension>,
    pub features: Vec<FeatureVersion>,
    struct_index: HashMap<String, usize>,
    enum_index: HashMap<String, usize>,
}

impl Registry {
    /// Extract every declaration from a loaded registry document
    pub fn from_document(root: &XmlElement) -> Result<Self> {
        let mut registry = Registry::default();

        for types in root.elements_named("types") {
            for ty in types.elements_named("type").filter(|ty| targets_api(ty)) {
                registry.extract_type(ty)?;
            }
        }
        for block in root.elements_named("enums") {
            registry.extract_enums_block(block);
        }
        for feature in root.elements_named("feature") {
            registry.features.push(extract_feature(feature)?);
        }
        for extensions in root.elements_named("extensions") {
            for ext in extensions.elements_named("extension") {
                if let Some(extension) = extract_extension(ext)? {
                    registry.extensions.push(extension);
                }
            }
        }

        registry.reindex();
        info!(
            structs = registry.structs.len(),
            enums = registry.enums.len(),
            handles = registry.handles.len(),
            extensions = registry.extensions.len(),
            features = registry.features.len(),
            "Registry extracted"
        );
        Ok(registry)
    }

    fn reindex(&mut self) {
        self.struct_index.clear();
        for (i, decl) in self.structs.iter().enumerate() {
            self.struct_index.entry(decl.name.clone()).or_insert(i);
        }
        self.enum_index.clear();
        for (i, decl) in self.enums.iter().enumerate() {
            self.enum_index.entry(decl.name.clone()).or_insert(i);
        }
    }

    pub fn struct_decl(&self, name: &str) -> Option<&StructDecl> {
        self.struct_index.get(name).map(|&i| &self.structs[i])
    }

    pub fn enum_decl(&self, name: &str) -> Option<&EnumDecl> {
        self.enum_index.get(name).map(|&i| &self.enums[i])
    }

    pub fn is_handle(&self, name: &str) -> bool {
        self.handles.iter().any(|h| h == name)
    }

    /// Target of a generic type alias declaration
    pub fn alias_target(&self, name: &str) -> Option<&str> {
        self.type_aliases
            .iter()
            .find(|(alias, _)| alias == name)
            .map(|(_, target)| target.as_str())
    }

    pub fn flag_alias(&self, name: &str) -> Option<&str> {
        self.flag_aliases
            .iter()
            .find(|(alias, _)| alias == name)
            .map(|(_, flags)| flags.as_str())
    }

    pub fn base_type(&self, name: &str) -> Option<&str> {
        self.base_types
            .iter()
            .find(|(base, _)| base == name)
            .map(|(_, underlying)| underlying.as_str())
    }

    /// Classify a declared type name. Scalars are not reported here.
    pub fn kind_of(&self, name: &str) -> Option<TypeKind> {
        if self.struct_index.contains_key(name) {
            let decl = self.struct_decl(name)?;
            return Some(if decl.alias.is_some() {
                TypeKind::Alias
            } else {
                TypeKind::Struct
            });
        }
        if self.enum_index.contains_key(name) {
            return Some(TypeKind::Enum);
        }
        if self.is_handle(name) {
            return Some(TypeKind::Handle);
        }
        if self.flag_alias(name).is_some() || self.alias_target(name).is_some() {
            return Some(TypeKind::Alias);
        }
        if self.base_type(name).is_some() {
            return Some(TypeKind::Primitive);
        }
        None
    }

    fn extract_type(&mut self, ty: &XmlElement) -> Result<()> {
        let category = ty.attr("category").unwrap_or_default();
        if let (Some(name), Some(target)) = (ty.attr("name"), ty.attr("alias")) {
            self.type_aliases.push((name.to_string(), target.to_string()));
        }
        match category {
            "struct" | "union" => self.structs.push(extract_struct(ty)?),
            "handle" => {
                if let Some(name) = ty.child_text("name") {
                    let name = handle_name_regex().replace_all(&name, "").into_owned();
                    if !name.is_empty() && !self.handles.contains(&name) {
                        self.handles.push(name);
                    }
                }
            }
            "bitmask" => {
                if let (Some(base), Some(name)) = (ty.child_text("type"), ty.child_text("name")) {
                    if ty.leading_text().contains("typedef") && FLAG_BASE_TYPES.contains(&base.as_str()) {
                        self.flag_aliases.push((name, base));
                    }
                }
            }
            "basetype" => {
                if let (Some(base), Some(name)) = (ty.child_text("type"), ty.child_text("name")) {
                    if ty.leading_text().contains("typedef") {
                        self.base_types.push((name, base));
                    }
                }
            }
            "define" => {
                if let Some((name, version)) = extract_api_version(ty) {
                    self.api_versions.push((name, version));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn extract_enums_block(&mut self, block: &XmlElement) {
        let Some(name) = block.attr("name") else {
            return;
        };
        if name == API_CONSTANTS_BLOCK {
            for constant in block.elements_named("enum") {
                if let Some(c) = extract_api_constant(constant) {
                    self.api_constants.push(c);
                }
            }
            return;
        }
        if self.enums.iter().any(|e| e.name == name) {
            debug!(name, "Skipping repeated enums block");
            return;
        }

        let members = block
            .elements_named("enum")
            .filter_map(|e| {
                let name = e.attr("name")?;
                let value = match (e.attr("value"), e.attr("bitpos")) {
                    (Some(v), _) if !v.is_empty() => EnumValue::Value(v.to_string()),
                    (_, Some(bit)) => EnumValue::BitPos(bit.to_string()),
                    _ => return None,
                };
                Some(EnumMember {
                    name: name.to_string(),
                    value,
                })
            })
            .collect();

        self.enums.push(EnumDecl {
            name: name.to_string(),
            kind: block.attr("type").unwrap_or("enum").to_string(),
            members,
        });
    }
}

fn extract_struct(ty: &XmlElement) -> Result<StructDecl> {
    let name = ty
        .attr("name")
        .ok_or_else(|| RegistryError::Malformed("struct declaration without a name".to_string()))?
        .to_string();

    let mut type_tag = None;
    let mut members = Vec::new();
    for member in ty.elements_named("member").filter(|m| targets_api(m)) {
        let Some(member_name) = member.child_text("name") else {
            continue;
        };
        if member_name == "sType" {
            type_tag = member.attr("values").map(str::to_string);
        }
        if CHAIN_MEMBERS.contains(&member_name.as_str()) {
            continue;
        }
        let Some(type_name) = member.child_text("type") else {
            return Err(RegistryError::Malformed(format!(
                "member '{}' of '{}' has no type",
                member_name, name
            )));
        };
        members.push(extract_member(member, member_name, type_name));
    }

    Ok(StructDecl {
        name,
        alias: ty.attr("alias").map(str::to_string),
        extends: ty.attr("structextends").map(str::to_string),
        type_tag,
        members,
    })
}

fn extract_member(member: &XmlElement, name: String, type_name: String) -> Member {
    let c_type = member.text_before("name").trim().to_string();
    let pointer_depth = c_type.matches('*').count() as u8;
    let is_const = c_type.split_whitespace().any(|word| word == "const");

    let (len_attr, null_terminated) = match member.attr("len").map(str::trim) {
        Some(len) if len.eq_ignore_ascii_case(NULL_TERMINATED) => (None, true),
        // `len="enabledLayerCount,null-terminated"` is a list of strings
        Some(len) => {
            let first = len.split(',').next().unwrap_or(len).trim();
            (Some(first.to_string()), len.contains(NULL_TERMINATED))
        }
        None => (None, false),
    };

    let tail = member.text_after("name");
    let array_len = array_tail_regex()
        .captures(tail.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|len| !len.is_empty());

    Member {
        name,
        type_name,
        c_type,
        is_const,
        pointer_depth,
        array_len,
        len_attr,
        null_terminated,
    }
}

fn strip_numeric_suffix(literal: &str) -> &str {
    if literal.starts_with("0x") || literal.starts_with("0X") {
        literal.trim_end_matches(['U', 'u', 'L', 'l'])
    } else {
        literal.trim_end_matches(['F', 'f', 'U', 'u', 'L', 'l'])
    }
}

/// Strip C numeric suffixes and resolve `(~N)` against the declared width.
/// Values that still do not read as a number are kept verbatim.
pub fn clean_constant_value(value: &str, type_name: &str) -> String {
    let trimmed = value.trim();

    if let Some(inner) = trimmed.strip_prefix("(~").and_then(|v| v.strip_suffix(')')) {
        if let Ok(n) = strip_numeric_suffix(inner.trim()).parse::<u64>() {
            match type_name {
                "uint32_t" => {
                    if let Ok(n) = u32::try_from(n) {
                        return (!n).to_string();
                    }
                }
                "uint64_t" => return format!("{:#X}", !n),
                _ => {}
            }
        }
        return value.to_string();
    }

    let cleaned = strip_numeric_suffix(trimmed);
    let is_hex = cleaned
        .strip_prefix("0x")
        .is_some_and(|h| !h.is_empty() && h.chars().all(|c| c.is_ascii_hexdigit()));
    if is_hex || cleaned.parse::<i64>().is_ok() || cleaned.parse::<f64>().is_ok() {
        cleaned.to_string()
    } else {
        value.to_string()
    }
}

fn extract_api_constant(constant: &XmlElement) -> Option<ApiConstant> {
    let name = constant.attr("name")?;
    if constant.attr("alias").is_some() {
        return None;
    }
    let value = constant.attr("value")?;
    let type_name = constant.attr("type").unwrap_or("uint32_t");
    Some(ApiConstant {
        name: name.to_string(),
        value: clean_constant_value(value, type_name),
        type_name: type_name.to_string(),
    })
}

fn extract_api_version(ty: &XmlElement) -> Option<(String, ApiVersion)> {
    let name = ty.child_text("name")?;
    if !api_version_name_regex().is_match(&name) {
        return None;
    }
    let macro_name = ty.child_text("type")?;
    let full = ty.all_text();
    let call = full.split_once(macro_name.as_str())?.1.trim_start();
    let args = call.strip_prefix('(')?.split(')').next()?;
    let parts = args
        .split(',')
        .map(|a| a.trim().parse::<u32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .ok()?;
    match parts.as_slice() {
        &[variant, major, minor, patch] => Some((
            name,
            ApiVersion {
                variant,
                major,
                minor,
                patch,
            },
        )),
        _ => None,
    }
}

fn extract_requirements(parent: &XmlElement) -> Result<Requirements> {
    let mut requires = Requirements::default();
    for require in parent.elements_named("require") {
        for ty in require.elements_named("type") {
            if let Some(name) = ty.attr("name") {
                requires.types.push(name.to_string());
            }
        }
        for e in require.elements_named("enum") {
            let (Some(name), Some(extends)) = (e.attr("name"), e.attr("extends")) else {
                continue;
            };
            let number = |key: &str| -> Result<Option<i64>> {
                e.attr(key)
                    .map(|v| {
                        crate::types::parse_int(v).ok_or_else(|| {
                            RegistryError::Malformed(format!("{} '{}' of '{}' is not a number", key, v, name))
                        })
                    })
                    .transpose()
            };
            requires.enums.push(EnumExtension {
                name: name.to_string(),
                extends: extends.to_string(),
                offset: number("offset")?,
                extnumber: number("extnumber")?,
                value: e.attr("value").map(str::to_string),
                alias: e.attr("alias").map(str::to_string),
                negative: e.attr("dir") == Some("-"),
            });
        }
    }
    Ok(requires)
}

fn extract_feature(feature: &XmlElement) -> Result<FeatureVersion> {
    let name = feature
        .attr("name")
        .ok_or_else(|| RegistryError::Malformed("feature without a name".to_string()))?;
    Ok(FeatureVersion {
        name: name.to_string(),
        api: feature.attr("api").unwrap_or_default().to_string(),
        requires: extract_requirements(feature)?,
    })
}

fn extract_extension(ext: &XmlElement) -> Result<Option<Extension>> {
    let Some(name) = ext.attr("name") else {
        return Ok(None);
    };
    Ok(Some(Extension {
        name: name.to_string(),
        number: ext.attr("number").and_then(crate::types::parse_int),
        supported: ext.attr("supported").unwrap_or_default().to_string(),
        platform: ext.attr("platform").map(str::to_string),
        requires: extract_requirements(ext)?,
    }))
}
