//! Name conversions between registry names and generated identifiers
//!
//! Four name spaces are involved:
//! - registry type names (`VkPhysicalDeviceShaderFloat16Int8FeaturesKHR`)
//! - generated snake field names (`shader_float16_int8_features_khr`)
//! - extension wrapper type and field names (`VkJsonKHRShaderFloat16Int8`, `khr_shader_float16_int8`)
//! - lower camel display names (`shaderFloat16Int8FeaturesKhr`)
//!
//! The conversions are total but not injective.

use regex::Regex;
use std::sync::OnceLock;

/// Extension name prefix to wrapper type prefix. Checked in order, so
/// `VK_NV` claims `VK_NVX_*` names before the `VK_NVX` entry is reached.
const WRAPPER_PREFIXES: &[(&str, &str)] = &[
    ("VK_KHR", "VkJsonKHR"),
    ("VK_EXT", "VkJsonExt"),
    ("VK_IMG", "VkJsonIMG"),
    ("VK_ANDROID", "VkJsonANDROID"),
    ("VK_AMD", "VkJsonAMD"),
    ("VK_MESA", "VkJsonMESA"),
    ("VK_NV", "VkJsonNV"),
    ("VK_QCOM", "VkJsonQCOM"),
    ("VK_ARM", "VkJsonARM"),
    ("VK_HUAWEI", "VkJsonHUAWEI"),
    ("VK_VALVE", "VkJsonVALVE"),
    ("VK_MSFT", "VkJsonMSFT"),
    ("VK_SEC", "VkJsonSEC"),
    ("VK_NVX", "VKJsonNVX"),
];

const WRAPPER_FALLBACK_PREFIX: &str = "VkJsonExt";

const FIELD_PREFIXES: &[(&str, &str)] = &[
    ("VK_KHR_", "khr_"),
    ("VK_EXT_", "ext_"),
    ("VK_IMG_", "img_"),
    ("VK_ANDROID_", "android_"),
    ("VK_AMD_", "amd_"),
    ("VK_MESA_", "mesa_"),
    ("VK_NV_", "nv_"),
    ("VK_QCOM_", "qcom_"),
    ("VK_ARM_", "arm_"),
    ("VK_HUAWEI_", "huawei_"),
    ("VK_VALVE_", "valve_"),
    ("VK_MSFT_", "msft_"),
    ("VK_SEC_", "sec_"),
    ("VK_NVX_", "nvx_"),
];

/// Stripped from both ends of a capability struct name, in order
const STRUCT_AFFIXES: &[&str] = &[
    "VkPhysicalDevice",
    "KHR",
    "EXT",
    "IMG",
    "ANDROID",
    "AMD",
    "MESA",
    "NV",
    "QCOM",
    "ARM",
    "HUAWEI",
    "VALVE",
    "MSFT",
];

/// Vendor suffix reattached in short form; the first match wins
const VENDOR_SUFFIXES: &[(&str, &str)] = &[
    ("KHR", "_khr"),
    ("EXT", "_ext"),
    ("IMG", "_img"),
    ("ANDROID", "_android"),
    ("AMD", "_amd"),
    ("NV", "_nv"),
    ("MESA", "_mesa"),
    ("VALVE", "_valve"),
    ("MSFT", "_msft"),
    ("QCOM", "_qcom"),
    ("ARM", "_arm"),
    ("HUAWEI", "_huawei"),
];

/// Final overrides for names the rule table gets wrong
const FIELD_NAME_EXCEPTIONS: &[(&str, &str)] = &[
    ("memory_properties", "memory"),
    (
        "ycbcr2_plane444_formats_features_ext",
        "ycbcr_2plane_444_formats_features_ext",
    ),
];

enum Step {
    Replace(&'static str, &'static str),
    Lowercase,
    /// Replacement applied only while the name starts with a digit
    ReplaceIfLeadingDigit(&'static str, &'static str),
}

/// CamelCase to snake_case rules, applied top to bottom
const SNAKE_CASE_RULES: &[Step] = &[
    // 2D, 3D stay together
    Step::Replace(r"(\d)(D)", "_${1}${2}_"),
    Step::Replace(r"([a-z0-9])([A-Z])", "${1}_${2}"),
    Step::Replace(r"([A-Z]+)([A-Z][a-z])", "${1}_${2}"),
    Step::Lowercase,
    Step::Replace(r"(\d+)_d_", "${1}d_"),
    Step::Replace(r"\bi_d_", "id_"),
    Step::Replace(r"(\d+)_bit_", "bit${1}_"),
    Step::ReplaceIfLeadingDigit(r"^(\d+)_([a-zA-Z]+)", "${2}_${1}"),
    Step::ReplaceIfLeadingDigit(r"^(\d)", "_${1}"),
];

fn compiled_rules() -> &'static [Option<Regex>] {
    static RULES: OnceLock<Vec<Option<Regex>>> = OnceLock::new();
    RULES.get_or_init(|| {
        SNAKE_CASE_RULES
            .iter()
            .map(|step| match step {
                Step::Replace(pattern, _) | Step::ReplaceIfLeadingDigit(pattern, _) => {
                    Some(Regex::new(pattern).expect("valid regex"))
                }
                Step::Lowercase => None,
            })
            .collect()
    })
}

fn extension_field_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([a-zA-Z]+)_(\d+)_([a-zA-Z]+)").expect("valid regex"))
}

fn json_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)([A-Z][a-z]*)").expect("valid regex"))
}

/// Uppercase the character after each underscore and drop the underscore
fn underscore_to_camel(name: &str, only_lowercase: bool) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '_' {
            match chars.peek() {
                Some(&next) if !only_lowercase || next.is_ascii_lowercase() => {
                    out.extend(next.to_uppercase());
                    chars.next();
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}

fn lowercase_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn snake_case(base: &str) -> String {
    let mut name = base.to_string();
    for (step, regex) in SNAKE_CASE_RULES.iter().zip(compiled_rules()) {
        match (step, regex) {
            (Step::Lowercase, _) => name = name.to_lowercase(),
            (Step::Replace(_, replacement), Some(re)) => {
                name = re.replace_all(&name, *replacement).into_owned();
            }
            (Step::ReplaceIfLeadingDigit(_, replacement), Some(re)) => {
                if name.starts_with(|c: char| c.is_ascii_digit()) {
                    name = re.replace(&name, *replacement).into_owned();
                }
            }
            _ => {}
        }
    }
    name
}

/// Extension name to the wrapper struct that holds its capability structs
///
/// `VK_KHR_shader_float16_int8` becomes `VkJsonKHRShaderFloat16Int8`.
pub fn extension_to_wrapper_name(extension: &str) -> String {
    let prefixed = WRAPPER_PREFIXES
        .iter()
        .find_map(|(prefix, replacement)| {
            extension
                .strip_prefix(prefix)
                .map(|rest| format!("{}{}", replacement, rest))
        })
        .unwrap_or_else(|| format!("{}{}", WRAPPER_FALLBACK_PREFIX, extension));
    underscore_to_camel(&prefixed, false)
}

/// Extension name to the field holding its wrapper
///
/// `VK_KHR_shader_float16_int8` becomes `khr_shader_float16_int8`, and a
/// leading number moves behind the first word (`ext_formats_4444`).
pub fn extension_to_field_name(extension: &str) -> String {
    for (prefix, replacement) in FIELD_PREFIXES {
        if let Some(rest) = extension.strip_prefix(prefix) {
            let field = format!("{}{}", replacement, rest);
            return extension_field_regex()
                .replace(&field, "${1}_${3}_${2}")
                .into_owned();
        }
    }
    extension.to_lowercase()
}

/// Capability struct name to its snake field name
///
/// The capability prefix and vendor suffix are stripped, digit and case
/// boundaries become underscores, and the suffix returns in short form.
pub fn capability_struct_to_field_name(struct_name: &str) -> String {
    let mut base = struct_name;
    for affix in STRUCT_AFFIXES {
        base = base.strip_prefix(affix).unwrap_or(base);
        base = base.strip_suffix(affix).unwrap_or(base);
    }

    let mut field = snake_case(base);
    if let Some((_, short)) = VENDOR_SUFFIXES
        .iter()
        .find(|(suffix, _)| struct_name.ends_with(suffix))
    {
        field.push_str(short);
    }

    FIELD_NAME_EXCEPTIONS
        .iter()
        .find(|(from, _)| *from == field)
        .map(|(_, to)| to.to_string())
        .unwrap_or(field)
}

/// Snake field name to lower camel display name
///
/// Only an underscore followed by a lowercase letter is folded, so a
/// leading `_3d` keeps its underscore.
pub fn to_display_name(field_name: &str) -> String {
    underscore_to_camel(field_name, true)
}

/// Key used for a capability struct inside an extension wrapper traversal
///
/// `VkPhysicalDevice4444FormatsFeaturesEXT` becomes `formats4444FeaturesEXT`.
pub fn extension_member_key(struct_name: &str) -> String {
    let stripped = struct_name.replace("VkPhysicalDevice", "");
    let key = lowercase_first(&stripped);
    let key = json_key_regex().replace(&key, "${2}${1}");
    lowercase_first(&key)
}

/// Pointer member name to the name of its growable companion list
///
/// `pCopySrcLayouts` becomes `copy_src_layouts`.
pub fn list_member_to_field_name(member_name: &str) -> String {
    let chars: Vec<char> = member_name.chars().collect();
    let mut snake = String::with_capacity(member_name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        let starts_word = c.is_ascii_uppercase() && chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
        if i > 0 && starts_word {
            snake.push('_');
        }
        snake.push(c);
    }
    let snake = snake.to_lowercase();
    match snake.strip_prefix("p_") {
        Some(rest) => rest.to_string(),
        None => snake,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_wrapper_names() {
        assert_eq!(
            extension_to_wrapper_name("VK_KHR_shader_float16_int8"),
            "VkJsonKHRShaderFloat16Int8"
        );
        assert_eq!(
            extension_to_wrapper_name("VK_EXT_image_2d_view_of_3d"),
            "VkJsonExtImage2dViewOf3d"
        );
        assert_eq!(
            extension_to_wrapper_name("VK_KHR_variable_pointers"),
            "VkJsonKHRVariablePointers"
        );
        assert_eq!(extension_to_wrapper_name("VK_NVX_multiview"), "VkJsonNVXMultiview");
        assert_eq!(extension_to_wrapper_name("VK_FOO_bar"), "VkJsonExtVKFOOBar");
    }

    #[test]
    fn test_extension_field_names() {
        assert_eq!(
            extension_to_field_name("VK_KHR_shader_float16_int8"),
            "khr_shader_float16_int8"
        );
        assert_eq!(extension_to_field_name("VK_EXT_4444_formats"), "ext_formats_4444");
        assert_eq!(extension_to_field_name("VK_NVX_multiview"), "nvx_multiview");
        assert_eq!(extension_to_field_name("VK_FOO_Bar"), "vk_foo_bar");
    }

    #[test]
    fn test_capability_field_names() {
        let cases = [
            ("VkPhysicalDeviceProperties", "properties"),
            ("VkPhysicalDeviceSamplerYcbcrConversionFeatures", "sampler_ycbcr_conversion_features"),
            ("VkPhysicalDeviceFloatControlsPropertiesKHR", "float_controls_properties_khr"),
            ("VkPhysicalDeviceLineRasterizationFeaturesEXT", "line_rasterization_features_ext"),
            ("VkPhysicalDeviceRelaxedLineRasterizationFeaturesIMG", "relaxed_line_rasterization_features_img"),
            ("VkPhysicalDeviceIDProperties", "id_properties"),
            ("VkPhysicalDeviceVulkan11Properties", "vulkan11_properties"),
            ("VkPhysicalDevice2DViewFeaturesEXT", "_2d_view_features_ext"),
            ("VkPhysicalDevice3DFeaturesEXT", "_3d_features_ext"),
            ("VkPhysicalDeviceImage2DViewOf3DFeaturesEXT", "image_2d_view_of_3d_features_ext"),
            ("VkPhysicalDevice8BitStorageFeaturesKHR", "bit8_storage_features_khr"),
            ("VkPhysicalDevice16BitStorageFeatures", "bit16_storage_features"),
            ("VkPhysicalDeviceShaderFloat16Int8FeaturesKHR", "shader_float16_int8_features_khr"),
            ("VkPhysicalDeviceMemoryProperties", "memory"),
            (
                "VkPhysicalDeviceYcbcr2Plane444FormatsFeaturesEXT",
                "ycbcr_2plane_444_formats_features_ext",
            ),
        ];
        for (input, expected) in cases {
            assert_eq!(capability_struct_to_field_name(input), expected, "{}", input);
        }
    }

    #[test]
    fn test_display_names() {
        assert_eq!(to_display_name("point_clipping_properties"), "pointClippingProperties");
        assert_eq!(
            to_display_name("shader_float16_int8_features_khr"),
            "shaderFloat16Int8FeaturesKhr"
        );
        // the leading underscore survives this path
        assert_eq!(to_display_name("_3d_features_ext"), "_3dFeaturesExt");
    }

    #[test]
    fn test_extension_member_keys() {
        assert_eq!(
            extension_member_key("VkPhysicalDeviceVariablePointerFeaturesKHR"),
            "variablePointerFeaturesKHR"
        );
        assert_eq!(
            extension_member_key("VkPhysicalDevice4444FormatsFeaturesEXT"),
            "formats4444FeaturesEXT"
        );
        assert_eq!(extension_member_key("VkPhysicalDevice3DFeaturesEXT"), "d3FeaturesEXT");
    }

    #[test]
    fn test_list_member_names() {
        assert_eq!(list_member_to_field_name("pCopySrcLayouts"), "copy_src_layouts");
        assert_eq!(list_member_to_field_name("pDemoName"), "demo_name");
        assert_eq!(list_member_to_field_name("TestName"), "test_name");
        assert_eq!(list_member_to_field_name("pLayeredApis"), "layered_apis");
    }
}
