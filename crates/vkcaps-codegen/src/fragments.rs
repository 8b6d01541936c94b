//! Fixed text blocks placed at fixed points of the generated outputs

/// First lines of the generated Rust module
pub const MODULE_PREAMBLE: &str = "\
//! Vulkan registry tables generated by vkcaps. Do not edit.

#![allow(non_camel_case_types, non_snake_case, non_upper_case_globals, dead_code)]

use core::ffi::{c_char, c_void};

pub type VkBool32 = u32;
pub type VkDeviceSize = u64;
pub type VkFlags = u32;
pub type VkFlags64 = u64;
";

/// First lines of the generated traversal header
pub const HEADER_PREAMBLE: &str = "\
///////////////////////////////////////////////////////////////////////////////
//
// Vulkan device capability traversal, generated by vkcaps from the Vulkan
// registry. Do not edit.
//
// Licensed under the Apache License, Version 2.0 (the \"License\");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an \"AS IS\" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
///////////////////////////////////////////////////////////////////////////////

#ifndef VKJSON_GENERATED_H_
#define VKJSON_GENERATED_H_

#include <vulkan/vulkan.h>

#include <cstring>
#include <map>
#include <string>
#include <vector>

template <typename T>
struct EnumTraits;

inline bool HasExtension(const char* name,
                         const std::vector<VkExtensionProperties>& extensions) {
  for (const auto& extension : extensions) {
    if (strcmp(extension.extensionName, name) == 0) {
      return true;
    }
  }
  return false;
}

";

/// Members every device record carries besides the generated ones
pub const DEVICE_TAIL_MEMBERS: &str = "\
  std::vector<VkQueueFamilyProperties> queues;
  std::vector<VkExtensionProperties> extensions;
  std::vector<VkLayerProperties> layers;
  std::map<VkFormat, VkFormatProperties> formats;
";

pub const HEADER_EPILOGUE: &str = "#endif  // VKJSON_GENERATED_H_\n";

/// Re-query issued after list storage has been attached
pub const PROPERTIES_SETTER_LINE: &str = "vkGetPhysicalDeviceProperties2(physical_device, &properties);";

/// Visitor key for each traversal variable, checked in order
pub const TRAVERSAL_VARIABLES: &[(&str, &str)] = &[
    ("Properties", "properties"),
    ("Features", "features"),
    ("Limits", "limits"),
];

/// The two chain heads init code appends to, with the aggregator each serves
pub const CHAIN_CATEGORIES: &[(&str, &str)] = &[
    ("Properties", "VkPhysicalDeviceProperties2"),
    ("Features", "VkPhysicalDeviceFeatures2"),
];

/// Enums declared differently enough in the registry that no trait is emitted
pub const ENUM_TRAITS_SKIPPED: &[&str] = &["VkImageLayout"];
