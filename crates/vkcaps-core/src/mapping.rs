//! Mapping tables built from the filtered registry
//!
//! Every reportable capability struct ends up in exactly one of four places:
//! a core version group, a feature version, an extension, or the independent
//! residual list. The remaining tables (type tags, extends targets, list sizes,
//! enum membership, growable enum ranges) are lookups the emitters consult.

use crate::alias::{AliasGraph, Resolution};
use crate::closure::DependencyClosure;
use crate::error::{RegistryError, Result};
use crate::extract::Registry;
use crate::filter::DisabledSet;
use crate::ranges::{find_contiguous_ranges, ValueRange};
use crate::rules::FilterRules;
use crate::types::EnumExtension;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

/// Base of every extension-provided enum value
pub const EXTENSION_ENUM_BASE: i64 = 1_000_000_000;
/// Values reserved per extension number
pub const EXTENSION_ENUM_BLOCK: i64 = 1000;
/// Owner of the growable enum's own values
pub const BASE_VERSION_OWNER: &str = "VK_VERSION_1_0";

const CORE_MARKER: &str = "Vulkan";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructEntry {
    pub name: String,
    pub type_tag: String,
}

/// The Properties/Features pair of one core version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoreGroup {
    /// `Core11`, `Core12`, ...
    pub key: String,
    /// Version digits as written in the struct name
    pub digits: String,
    pub structs: Vec<StructEntry>,
}

impl CoreGroup {
    pub fn find(&self, category: &str) -> Option<&StructEntry> {
        self.structs.iter().find(|s| s.name.ends_with(category))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureEntry {
    pub name: String,
    pub structs: Vec<StructEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionEntry {
    pub name: String,
    pub structs: Vec<StructEntry>,
}

/// A pointer member sized by another member of the same struct
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListMember {
    pub name: String,
    pub type_name: String,
    pub size_member: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DynamicList {
    pub struct_name: String,
    pub members: Vec<ListMember>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumMembership {
    pub name: String,
    pub members: Vec<String>,
}

/// Values one feature or extension contributes to the growable enum
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrowableOwner {
    pub owner: String,
    pub values: Vec<(String, i64)>,
    pub ranges: Vec<ValueRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrowableEnum {
    pub name: String,
    /// Non-alias values added by features and extensions, in discovery order
    pub added: Vec<(String, i64)>,
    pub owners: Vec<GrowableOwner>,
}

impl GrowableEnum {
    pub fn owner(&self, name: &str) -> Option<&GrowableOwner> {
        self.owners.iter().find(|o| o.owner == name)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Mappings {
    /// Struct or alias name to runtime type identifier
    pub type_tags: BTreeMap<String, String>,
    /// Struct or alias name to its resolved `structextends`
    pub extends: BTreeMap<String, String>,
    /// Non-alias reportable structs, sorted
    pub reportable: Vec<String>,
    pub core_groups: Vec<CoreGroup>,
    pub features: Vec<FeatureEntry>,
    pub extensions: Vec<ExtensionEntry>,
    /// Reportable structs not claimed by a core group, feature, or extension
    pub independent: Vec<String>,
    /// List member name to the member holding its element count
    pub list_sizes: BTreeMap<String, String>,
    pub dynamic_lists: Vec<DynamicList>,
    pub enum_members: Vec<EnumMembership>,
    pub growable: Option<GrowableEnum>,
    #[serde(skip)]
    reportable_names: HashSet<String>,
    #[serde(skip)]
    reportable_in_registry_order: Vec<String>,
    #[serde(skip)]
    aliases: AliasGraph,
}

impl Mappings {
    pub fn build(
        registry: &Registry,
        disabled: &DisabledSet,
        closure: &DependencyClosure,
        rules: &FilterRules,
    ) -> Result<Self> {
        let aliases = AliasGraph::from_pairs(
            registry
                .structs
                .iter()
                .filter(|s| rules.is_capability(&s.name) && !disabled.excludes(s))
                .filter_map(|s| s.alias.as_deref().map(|target| (s.name.as_str(), target))),
        );

        let mut mappings = Mappings {
            aliases,
            ..Default::default()
        };
        mappings.type_tags = mappings.collect_type_tags(registry, disabled, rules);
        mappings.extends = collect_extends(registry, disabled, rules);
        mappings.collect_reportable(registry, disabled, rules);

        let mut claimed = HashSet::new();
        mappings.core_groups = mappings.collect_core_groups(rules, &mut claimed);
        mappings.features = mappings.collect_features(registry, disabled, rules, &mut claimed);
        mappings.extensions = mappings.collect_extensions(registry, disabled, rules, &mut claimed);
        mappings.independent = mappings
            .reportable
            .iter()
            .filter(|name| !claimed.contains(name.as_str()))
            .cloned()
            .collect();

        mappings.list_sizes = collect_list_sizes(registry, disabled, rules);
        mappings.dynamic_lists = collect_dynamic_lists(registry, closure, rules);
        mappings.growable = collect_growable(registry, rules)?;
        mappings.enum_members = collect_enum_members(registry, closure, mappings.growable.as_ref());

        info!(
            reportable = mappings.reportable.len(),
            core_groups = mappings.core_groups.len(),
            features = mappings.features.len(),
            extensions = mappings.extensions.len(),
            independent = mappings.independent.len(),
            "Mappings built"
        );
        Ok(mappings)
    }

    /// Whether a struct or alias name extends an aggregator and is not disabled
    pub fn is_reportable(&self, name: &str) -> bool {
        self.reportable_names.contains(name)
    }

    /// Name at the end of a capability alias chain
    pub fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        match self.aliases.root(name) {
            Resolution::Resolved(root) => root,
            Resolution::Unresolved => name,
        }
    }

    pub fn type_tag(&self, name: &str) -> Option<&str> {
        self.type_tags.get(name).map(String::as_str)
    }

    pub fn extends_of(&self, name: &str) -> Option<&str> {
        self.extends.get(name).map(String::as_str)
    }

    pub fn dynamic_list(&self, struct_name: &str) -> Option<&DynamicList> {
        self.dynamic_lists.iter().find(|d| d.struct_name == struct_name)
    }

    pub fn core_group_of(&self, struct_name: &str) -> Option<&CoreGroup> {
        self.core_groups
            .iter()
            .find(|g| g.structs.iter().any(|s| s.name == struct_name))
    }

    fn collect_type_tags(
        &self,
        registry: &Registry,
        disabled: &DisabledSet,
        rules: &FilterRules,
    ) -> BTreeMap<String, String> {
        let direct: HashMap<&str, &str> = registry
            .structs
            .iter()
            .filter(|s| s.alias.is_none() && rules.is_capability(&s.name) && !disabled.excludes(s))
            .filter_map(|s| s.type_tag.as_deref().map(|tag| (s.name.as_str(), tag)))
            .collect();

        let mut tags: BTreeMap<String, String> = direct
            .iter()
            .map(|(name, tag)| (name.to_string(), tag.to_string()))
            .collect();

        let resolved = self.aliases.resolve_all(|name| direct.get(name).map(|t| t.to_string()));
        for (alias, resolution) in resolved {
            let target_is_capability = self.aliases.target(&alias).is_some_and(|t| rules.is_capability(t));
            match resolution {
                Resolution::Resolved(tag) if target_is_capability => {
                    tags.insert(alias, tag);
                }
                Resolution::Resolved(_) => {}
                Resolution::Unresolved => debug!(alias = %alias, "Type tag unresolved"),
            }
        }
        tags
    }

    fn collect_reportable(&mut self, registry: &Registry, disabled: &DisabledSet, rules: &FilterRules) {
        let candidates = || {
            registry
                .structs
                .iter()
                .filter(|s| rules.is_capability(&s.name) && !disabled.excludes(s))
        };

        for decl in candidates().filter(|s| s.alias.is_none()) {
            if decl.extends.as_deref().is_some_and(|e| rules.extends_aggregator(e)) {
                self.reportable_names.insert(decl.name.clone());
                self.reportable_in_registry_order.push(decl.name.clone());
            }
        }
        let alias_names: Vec<String> = candidates()
            .filter(|s| s.alias.is_some())
            .filter(|s| self.reportable_names.contains(self.canonical(&s.name)))
            .map(|s| s.name.clone())
            .collect();
        self.reportable_names.extend(alias_names);
        self.reportable = self.reportable_in_registry_order.clone();
        self.reportable.sort();
    }

    fn collect_core_groups(&self, rules: &FilterRules, claimed: &mut HashSet<String>) -> Vec<CoreGroup> {
        let mut groups: Vec<CoreGroup> = Vec::new();
        for name in &self.reportable_in_registry_order {
            let Some((digits, category)) = core_version_of(name, &rules.capability_prefix) else {
                continue;
            };
            let version = if digits.len() == 2 {
                format!("{}_{}", &digits[..1], &digits[1..])
            } else {
                digits.to_string()
            };
            let entry = StructEntry {
                name: name.clone(),
                type_tag: format!(
                    "VK_STRUCTURE_TYPE_PHYSICAL_DEVICE_VULKAN_{}_{}",
                    version,
                    category.to_uppercase()
                ),
            };
            claimed.insert(name.clone());
            match groups.iter_mut().find(|g| g.digits == digits) {
                Some(group) => group.structs.push(entry),
                None => groups.push(CoreGroup {
                    key: format!("Core{}", digits),
                    digits: digits.to_string(),
                    structs: vec![entry],
                }),
            }
        }
        groups.sort_by_key(|g| g.digits.parse::<u32>().unwrap_or(u32::MAX));
        groups
    }

    /// Claim `name` for one mapping entry unless something already holds it
    fn claim(&self, name: &str, claimed: &mut HashSet<String>) -> Option<StructEntry> {
        if !self.is_reportable(name) {
            return None;
        }
        let canonical = self.canonical(name);
        if claimed.contains(canonical) {
            return None;
        }
        let Some(tag) = self.type_tag(name) else {
            debug!(name, "Reportable struct without a type tag");
            return None;
        };
        claimed.insert(canonical.to_string());
        Some(StructEntry {
            name: name.to_string(),
            type_tag: tag.to_string(),
        })
    }

    fn collect_features(
        &self,
        registry: &Registry,
        disabled: &DisabledSet,
        rules: &FilterRules,
        claimed: &mut HashSet<String>,
    ) -> Vec<FeatureEntry> {
        let mut features: Vec<FeatureEntry> = Vec::new();
        for api in &rules.feature_apis {
            for feature in registry.features.iter().filter(|f| &f.api == api) {
                let index = match features.iter().position(|f| f.name == feature.name) {
                    Some(index) => index,
                    None => {
                        features.push(FeatureEntry {
                            name: feature.name.clone(),
                            structs: Vec::new(),
                        });
                        features.len() - 1
                    }
                };
                for name in &feature.requires.types {
                    if disabled.contains(name) {
                        continue;
                    }
                    if let Some(entry) = self.claim(name, claimed) {
                        features[index].structs.push(entry);
                    }
                }
            }
        }
        features.retain(|f| {
            if f.structs.is_empty() {
                debug!(feature = %f.name, "Feature version has no reportable structs");
            }
            !f.structs.is_empty()
        });
        features
    }

    fn collect_extensions(
        &self,
        registry: &Registry,
        disabled: &DisabledSet,
        rules: &FilterRules,
        claimed: &mut HashSet<String>,
    ) -> Vec<ExtensionEntry> {
        let mut extensions = Vec::new();
        for ext in registry
            .extensions
            .iter()
            .filter(|e| rules.extension_enabled(&e.supported, e.platform.as_deref()))
        {
            let structs: Vec<StructEntry> = ext
                .requires
                .types
                .iter()
                .filter(|name| !disabled.contains(name))
                .filter_map(|name| self.claim(name, claimed))
                .collect();
            if structs.is_empty() {
                continue;
            }
            extensions.push(ExtensionEntry {
                name: ext.name.clone(),
                structs,
            });
        }
        extensions
    }
}

/// Split `VkPhysicalDeviceVulkan13Features` into ("13", "Features")
pub fn core_version_of<'a>(name: &'a str, prefix: &str) -> Option<(&'a str, &'a str)> {
    let rest = name.strip_prefix(prefix)?.strip_prefix(CORE_MARKER)?;
    let split = rest.find(|c: char| !c.is_ascii_digit())?;
    let (digits, category) = rest.split_at(split);
    if digits.len() < 2 || !matches!(category, "Properties" | "Features") {
        return None;
    }
    Some((digits, category))
}

fn collect_extends(registry: &Registry, disabled: &DisabledSet, rules: &FilterRules) -> BTreeMap<String, String> {
    let mut graph = AliasGraph::new();
    let mut direct: HashMap<&str, &str> = HashMap::new();
    let mut names = Vec::new();

    for decl in registry.structs.iter().filter(|s| !disabled.contains(&s.name)) {
        names.push(decl.name.as_str());
        if decl.extends.as_deref().is_some_and(|e| !rules.extends_aggregator(e)) {
            continue;
        }
        match (&decl.alias, &decl.extends) {
            (Some(target), _) => graph.insert(decl.name.as_str(), target.as_str()),
            (None, Some(extends)) => {
                direct.insert(decl.name.as_str(), extends.as_str());
            }
            (None, None) => {}
        }
    }

    names
        .into_iter()
        .filter_map(|name| {
            graph
                .resolve(name, |n| direct.get(n).map(|e| e.to_string()))
                .ok()
                .map(|extends| (name.to_string(), extends))
        })
        .collect()
}

fn collect_list_sizes(registry: &Registry, disabled: &DisabledSet, rules: &FilterRules) -> BTreeMap<String, String> {
    registry
        .structs
        .iter()
        .filter(|s| rules.is_capability(&s.name) && !disabled.contains(&s.name))
        .flat_map(|s| s.members.iter())
        .filter_map(|m| m.len_attr.as_ref().map(|len| (m.name.clone(), len.clone())))
        .collect()
}

fn collect_dynamic_lists(registry: &Registry, closure: &DependencyClosure, rules: &FilterRules) -> Vec<DynamicList> {
    closure
        .order
        .iter()
        .filter(|entry| rules.is_capability(&entry.name))
        .filter_map(|entry| registry.struct_decl(&entry.name))
        .filter_map(|decl| {
            let members: Vec<ListMember> = decl
                .members
                .iter()
                .filter(|m| m.is_dynamic_list())
                .filter_map(|m| {
                    m.len_attr.as_ref().map(|len| ListMember {
                        name: m.name.clone(),
                        type_name: m.type_name.clone(),
                        size_member: len.clone(),
                    })
                })
                .collect();
            (!members.is_empty()).then(|| DynamicList {
                struct_name: decl.name.clone(),
                members,
            })
        })
        .collect()
}

fn collect_enum_members(
    registry: &Registry,
    closure: &DependencyClosure,
    growable: Option<&GrowableEnum>,
) -> Vec<EnumMembership> {
    registry
        .enums
        .iter()
        .filter(|e| closure.uses_enum(&e.name))
        .map(|e| {
            let mut members: Vec<String> = e.members.iter().map(|m| m.name.clone()).collect();
            if let Some(growable) = growable.filter(|g| g.name == e.name) {
                for (name, _) in &growable.added {
                    if !members.contains(name) {
                        members.push(name.clone());
                    }
                }
            }
            EnumMembership {
                name: e.name.clone(),
                members,
            }
        })
        .collect()
}

/// `1000000000 + (extnumber - 1) * 1000 + offset`, `None` on overflow
fn extension_value(extnumber: i64, offset: i64, negative: bool) -> Option<i64> {
    let value = extnumber
        .checked_sub(1)?
        .checked_mul(EXTENSION_ENUM_BLOCK)?
        .checked_add(EXTENSION_ENUM_BASE)?
        .checked_add(offset)?;
    if negative {
        value.checked_neg()
    } else {
        Some(value)
    }
}

fn invalid(enum_name: &str, owner: &str, reason: &str) -> RegistryError {
    RegistryError::InvalidGrowableEnum {
        enum_name: enum_name.to_string(),
        owner: owner.to_string(),
        reason: reason.to_string(),
    }
}

struct GrowableBuilder {
    known: HashMap<String, i64>,
    added: Vec<(String, i64)>,
    owners: Vec<(String, Vec<(String, i64)>)>,
}

impl GrowableBuilder {
    fn owner_values(&mut self, owner: &str) -> &mut Vec<(String, i64)> {
        let index = match self.owners.iter().position(|(o, _)| o == owner) {
            Some(index) => index,
            None => {
                self.owners.push((owner.to_string(), Vec::new()));
                self.owners.len() - 1
            }
        };
        &mut self.owners[index].1
    }

    fn record(&mut self, owner: &str, e: &EnumExtension, value: i64) {
        if e.alias.is_none() && !self.added.iter().any(|(n, _)| n == &e.name) {
            self.added.push((e.name.clone(), value));
        }
        self.known.entry(e.name.clone()).or_insert(value);
        self.owner_values(owner).push((e.name.clone(), value));
    }
}

fn collect_growable(registry: &Registry, rules: &FilterRules) -> Result<Option<GrowableEnum>> {
    let name = rules.growable_enum.as_str();
    let Some(decl) = registry.enum_decl(name) else {
        debug!(name, "Growable enum not declared");
        return Ok(None);
    };

    let base: Vec<(String, i64)> = decl
        .members
        .iter()
        .filter_map(|m| m.value.as_i64().map(|v| (m.name.clone(), v)))
        .collect();
    let mut builder = GrowableBuilder {
        known: base.iter().cloned().collect(),
        added: Vec::new(),
        owners: vec![(
            BASE_VERSION_OWNER.to_string(),
            base.into_iter().filter(|(_, v)| *v != 0).collect(),
        )],
    };

    for feature in &registry.features {
        for e in feature.requires.enums.iter().filter(|e| e.extends == name) {
            let (Some(extnumber), Some(offset)) = (e.extnumber, e.offset) else {
                return Err(invalid(&e.name, &feature.name, "feature entry needs extnumber and offset"));
            };
            let value = extension_value(extnumber, offset, e.negative)
                .ok_or_else(|| invalid(&e.name, &feature.name, "enum value out of range"))?;
            builder.record(&feature.name, e, value);
        }
    }

    for ext in registry.extensions.iter().filter(|e| e.supported != "disabled") {
        for e in ext.requires.enums.iter().filter(|e| e.extends == name) {
            let Some(extnumber) = e.extnumber.or(ext.number) else {
                return Err(invalid(&e.name, &ext.name, "extension has no number"));
            };
            let value = match (e.offset, e.alias.as_deref()) {
                (Some(offset), _) => extension_value(extnumber, offset, e.negative)
                    .ok_or_else(|| invalid(&e.name, &ext.name, "enum value out of range"))?,
                (None, Some(alias)) => match builder.known.get(alias) {
                    Some(&value) => value,
                    None => {
                        debug!(name = %e.name, alias, "Enum alias target has no known value");
                        continue;
                    }
                },
                (None, None) => {
                    debug!(name = %e.name, extension = %ext.name, "Enum extension without offset");
                    continue;
                }
            };
            builder.record(&ext.name, e, value);
        }
    }

    let owners = builder
        .owners
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(owner, mut values)| {
            let mut seen = HashSet::new();
            values.retain(|pair| seen.insert(pair.clone()));
            values.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)));
            let ranges = find_contiguous_ranges(&values);
            GrowableOwner { owner, values, ranges }
        })
        .collect::<Vec<_>>();

    info!(
        name,
        added = builder.added.len(),
        owners = owners.len(),
        "Growable enum values collected"
    );
    Ok(Some(GrowableEnum {
        name: name.to_string(),
        added: builder.added,
        owners,
    }))
}
