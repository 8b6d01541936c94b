//! Dependency closure over struct composition
//!
//! Starting from every enabled capability struct and the standalone query
//! structs, member types are followed transitively. The result lists each struct once, after every struct it
//! contains by value or by pointer.

use crate::error::{RegistryError, Result};
use crate::extract::Registry;
use crate::filter::DisabledSet;
use crate::rules::FilterRules;
use crate::types::{is_known_scalar, Member, TypeKind};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// How a member base type is declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    /// `void`, `char`, and the fixed scalar spellings
    Scalar,
    Declared(TypeKind),
    Unknown,
}

/// Classify the base type of a member
pub fn classify(registry: &Registry, type_name: &str) -> TypeClass {
    if type_name == "void" || type_name == "char" || is_known_scalar(type_name) {
        return TypeClass::Scalar;
    }
    match registry.kind_of(type_name) {
        Some(kind) => TypeClass::Declared(kind),
        None => TypeClass::Unknown,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClosureEntry {
    pub name: String,
    /// Reached as a member type of another emitted struct
    pub is_dependency: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyClosure {
    /// Structs in emission order: every member type precedes its user
    pub order: Vec<ClosureEntry>,
    /// Enums referenced by an emitted struct, in first-use order
    pub enums: Vec<String>,
    pub handles: Vec<String>,
    /// Alias names used as member types, in first-use order
    pub aliases: Vec<String>,
    /// Base typedefs (`VkDeviceAddress`) used as member types
    pub base_types: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

struct Walker<'a> {
    registry: &'a Registry,
    marks: HashMap<String, Mark>,
    closure: DependencyClosure,
    dependencies: HashSet<String>,
}

impl DependencyClosure {
    pub fn compute(registry: &Registry, disabled: &DisabledSet, rules: &FilterRules) -> Result<Self> {
        let mut walker = Walker {
            registry,
            marks: HashMap::new(),
            closure: DependencyClosure::default(),
            dependencies: HashSet::new(),
        };

        let roots = registry
            .structs
            .iter()
            .filter(|s| s.alias.is_none() && rules.is_capability(&s.name) && !disabled.excludes(s));
        for root in roots {
            walker.visit(&root.name)?;
        }
        for name in &rules.standalone_structs {
            walker.visit(name)?;
        }

        let Walker {
            mut closure,
            dependencies,
            ..
        } = walker;
        for entry in &mut closure.order {
            entry.is_dependency = dependencies.contains(&entry.name);
        }
        info!(
            structs = closure.order.len(),
            dependencies = dependencies.len(),
            enums = closure.enums.len(),
            handles = closure.handles.len(),
            "Dependency closure computed"
        );
        Ok(closure)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.order.iter().any(|e| e.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|e| e.name == name)
    }

    pub fn uses_enum(&self, name: &str) -> bool {
        self.enums.iter().any(|e| e == name)
    }

    pub fn uses_handle(&self, name: &str) -> bool {
        self.handles.iter().any(|h| h == name)
    }

    pub fn uses_alias(&self, name: &str) -> bool {
        self.aliases.iter().any(|a| a == name)
    }
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n == name) {
        list.push(name.to_string());
    }
}

impl Walker<'_> {
    fn visit(&mut self, name: &str) -> Result<()> {
        if self.marks.contains_key(name) {
            return Ok(());
        }
        let registry = self.registry;
        let Some(decl) = registry.struct_decl(name) else {
            return Ok(());
        };
        self.marks.insert(name.to_string(), Mark::Visiting);

        for member in &decl.members {
            self.follow(name, member, &member.type_name)?;
        }

        self.marks.insert(name.to_string(), Mark::Done);
        self.closure.order.push(ClosureEntry {
            name: name.to_string(),
            is_dependency: false,
        });
        Ok(())
    }

    fn follow(&mut self, owner: &str, member: &Member, type_name: &str) -> Result<()> {
        match classify(self.registry, type_name) {
            TypeClass::Scalar | TypeClass::Unknown => Ok(()),
            TypeClass::Declared(TypeKind::Enum) => {
                push_unique(&mut self.closure.enums, type_name);
                Ok(())
            }
            TypeClass::Declared(TypeKind::Handle) => {
                push_unique(&mut self.closure.handles, type_name);
                Ok(())
            }
            TypeClass::Declared(TypeKind::Primitive) => {
                push_unique(&mut self.closure.base_types, type_name);
                Ok(())
            }
            TypeClass::Declared(TypeKind::Alias) => {
                push_unique(&mut self.closure.aliases, type_name);
                let target = self
                    .registry
                    .struct_decl(type_name)
                    .and_then(|s| s.alias.as_deref())
                    .or_else(|| self.registry.alias_target(type_name))
                    .map(str::to_string);
                match target {
                    Some(target) if target != type_name => self.follow(owner, member, &target),
                    _ => Ok(()),
                }
            }
            TypeClass::Declared(TypeKind::Struct) => {
                self.dependencies.insert(type_name.to_string());
                match self.marks.get(type_name) {
                    Some(Mark::Done) => Ok(()),
                    Some(Mark::Visiting) if member.is_pointer() => {
                        debug!(owner, member = %member.name, "Pointer back-edge in struct composition");
                        Ok(())
                    }
                    Some(Mark::Visiting) => Err(RegistryError::CompositionCycle(type_name.to_string())),
                    None => self.visit(type_name),
                }
            }
        }
    }
}
