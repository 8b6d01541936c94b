//! Registry data model
//!
//! Everything here is built once from the registry document and is never
//! mutated afterwards.

use serde::{Deserialize, Serialize};

/// Scalar types that need no declaration of their own
pub const PRIMITIVE_TYPES: &[&str] = &[
    "float_t",
    "uint32_t",
    "uint8_t",
    "int32_t",
    "uint64_t",
    "size_t",
    "float",
    "VkBool32",
    "int64_t",
    "str",
    "VkDeviceSize",
    "uint16_t",
];

/// Every scalar spelling a member may use without further lookup
pub const KNOWN_SCALARS: &[&str] = &[
    "uint8_t",
    "uint32_t",
    "VkFlags",
    "int32_t",
    "uint64_t",
    "VkBool32",
    "VkDeviceSize",
    "size_t",
    "float_t",
    "int64_t",
    "uint16_t",
    "VkFlags64",
    "float",
    "str",
    "int",
    "double",
];

/// The two flag widths that bitmask typedefs are declared against
pub const FLAG_BASE_TYPES: &[&str] = &["VkFlags", "VkFlags64"];

/// Member names that only exist to chain structs together
pub const CHAIN_MEMBERS: &[&str] = &["sType", "pNext"];

/// `len` value that marks a string instead of a sized list
pub const NULL_TERMINATED: &str = "null-terminated";

pub fn is_primitive(type_name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&type_name)
}

pub fn is_known_scalar(type_name: &str) -> bool {
    KNOWN_SCALARS.contains(&type_name)
}

/// Kind of a top-level type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Struct,
    Enum,
    Handle,
    Alias,
    Primitive,
}

/// One struct member, with chain bookkeeping fields already removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    /// Base type as written inside `<type>`
    pub type_name: String,
    /// Full C declaration text up to the member name (`const char*`)
    pub c_type: String,
    pub is_const: bool,
    pub pointer_depth: u8,
    /// Fixed array size: a literal or a named constant
    #[serde(default)]
    pub array_len: Option<String>,
    /// `len` attribute naming the member that holds the element count
    #[serde(default)]
    pub len_attr: Option<String>,
    /// The member is a `null-terminated` string
    #[serde(default)]
    pub null_terminated: bool,
}

impl Member {
    /// Array length with the precedence used for emission: an explicit
    /// `len` attribute wins over a bracketed suffix
    pub fn size_expr(&self) -> Option<&str> {
        self.len_attr.as_deref().or(self.array_len.as_deref())
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer_depth > 0
    }

    /// A pointer member whose element count lives in another member
    pub fn is_dynamic_list(&self) -> bool {
        self.is_pointer() && self.len_attr.is_some()
    }
}

/// A struct declaration. Alias declarations carry no members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub extends: Option<String>,
    /// `values` attribute of the `sType` member
    #[serde(default)]
    pub type_tag: Option<String>,
    pub members: Vec<Member>,
}

impl StructDecl {
    /// Names listed in `structextends`
    pub fn extends_targets(&self) -> impl Iterator<Item = &str> {
        self.extends
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Value of an enumerant, stored the way the registry spells it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumValue {
    Value(String),
    BitPos(String),
}

impl EnumValue {
    pub fn literal(&self) -> &str {
        match self {
            EnumValue::Value(v) | EnumValue::BitPos(v) => v,
        }
    }

    /// Integer reading of the literal; bit positions are not shifted
    pub fn as_i64(&self) -> Option<i64> {
        parse_int(self.literal())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    pub value: EnumValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    /// `enum` or `bitmask`
    pub kind: String,
    pub members: Vec<EnumMember>,
}

/// A named numeric constant from the `API Constants` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConstant {
    pub name: String,
    pub value: String,
    pub type_name: String,
}

/// A packed `VK_API_VERSION_X_Y` identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiVersion {
    pub variant: u32,
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ApiVersion {
    pub fn packed(&self) -> u32 {
        (self.variant << 29) | (self.major << 22) | (self.minor << 12) | self.patch
    }
}

/// An enumerant added to an existing enum from a `<require>` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumExtension {
    pub name: String,
    pub extends: String,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub extnumber: Option<i64>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    /// `dir="-"` negates the computed value
    #[serde(default)]
    pub negative: bool,
}

/// Contents of all `<require>` blocks of a feature or extension
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    pub types: Vec<String>,
    pub enums: Vec<EnumExtension>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    pub name: String,
    pub number: Option<i64>,
    pub supported: String,
    #[serde(default)]
    pub platform: Option<String>,
    pub requires: Requirements,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureVersion {
    pub name: String,
    pub api: String,
    pub requires: Requirements,
}

/// Parse a C integer literal: decimal, hex, or negative decimal
pub fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_version_packing() {
        let v = ApiVersion {
            variant: 0,
            major: 1,
            minor: 3,
            patch: 0,
        };
        assert_eq!(v.packed(), 4206592);
    }

    #[test]
    fn test_extends_targets() {
        let decl = StructDecl {
            name: "VkPhysicalDeviceFoo".to_string(),
            alias: None,
            extends: Some("VkPhysicalDeviceProperties2, VkDeviceCreateInfo".to_string()),
            type_tag: None,
            members: vec![],
        };
        let targets: Vec<_> = decl.extends_targets().collect();
        assert_eq!(targets, vec!["VkPhysicalDeviceProperties2", "VkDeviceCreateInfo"]);
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("0x10"), Some(16));
        assert_eq!(parse_int("-3"), Some(-3));
        assert_eq!(parse_int("VK_X"), None);
    }

    #[test]
    fn test_bitpos_is_literal() {
        let v = EnumValue::BitPos("4".to_string());
        assert_eq!(v.as_i64(), Some(4));
    }
}
