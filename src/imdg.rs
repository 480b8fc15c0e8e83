//! The inter-module dependency graph (IMDG): the scanner's output, a map
//! from module identity to everything the planner needs to synthesize that
//! module's explicit-build command line. Module kinds are a tagged sum
//! dispatched by pattern match, never a class hierarchy.

use crate::utils::content_hash;
use std::{collections::BTreeMap, path::PathBuf};

/// The tag identifying what kind of module this is. Placeholders exist only
/// to be rejected during planning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum ModuleId {
    SwiftSource(String),
    SwiftInterface(String),
    SwiftPrebuiltExternal(String),
    SwiftPlaceholder(String),
    Clang(String),
}

impl ModuleId {
    pub fn name(&self) -> &str {
        match self {
            Self::SwiftSource(n)
            | Self::SwiftInterface(n)
            | Self::SwiftPrebuiltExternal(n)
            | Self::SwiftPlaceholder(n)
            | Self::Clang(n) => n,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::SwiftPlaceholder(_))
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SwiftInterfaceDetails {
    pub interface_path: PathBuf,
    pub compiled_candidates: Vec<PathBuf>,
    pub context_hash: String,
    pub command_line: Vec<String>,
    pub is_framework: bool,
    pub cache_key: String,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ClangDetails {
    pub module_map_path: PathBuf,
    pub context_hash: String,
    pub command_line: Vec<String>,
    pub cache_key: String,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PrebuiltDetails {
    pub compiled_module_path: PathBuf,
    pub cache_key: String,
}

/// Variant-specific details carried by a [`ModuleInfo`]. Mirrors `ModuleId`
/// one-for-one except for `SwiftSource` and `SwiftPlaceholder`, which carry
/// no extra details.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum ModuleDetails {
    Source,
    Interface(SwiftInterfaceDetails),
    Prebuilt(PrebuiltDetails),
    Placeholder,
    Clang(ClangDetails),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModuleInfo {
    pub module_path: PathBuf,
    pub source_files: Vec<PathBuf>,
    pub direct_dependencies: Vec<ModuleId>,
    pub details: ModuleDetails,
}

impl ModuleInfo {
    /// The module's cache key, when it has one (every variant but source
    /// and placeholder).
    pub fn cache_key(&self) -> Option<&str> {
        match &self.details {
            ModuleDetails::Interface(d) => Some(&d.cache_key),
            ModuleDetails::Clang(d) => Some(&d.cache_key),
            ModuleDetails::Prebuilt(d) => Some(&d.cache_key),
            ModuleDetails::Source | ModuleDetails::Placeholder => None,
        }
    }
}

/// The scanner's output for one invocation: every module transitively
/// required, by identity.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct InterModuleDependencyGraph {
    pub modules: BTreeMap<ModuleId, ModuleInfo>,
}

impl InterModuleDependencyGraph {
    pub fn get(&self, id: &ModuleId) -> Option<&ModuleInfo> {
        self.modules.get(id)
    }

    /// Every module reachable from `root` (inclusive), found by following
    /// `direct_dependencies` to a fixed point. Used both to reject
    /// placeholders anywhere in the closure and to compute the dependency
    /// flags that must be fixed-point-closed onto a job's command line.
    pub fn transitive_closure(&self, root: &ModuleId) -> Vec<&ModuleId> {
        let mut seen = std::collections::BTreeSet::new();
        let mut stack = vec![root.clone()];
        let mut order = Vec::new();

        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(info) = self.modules.get(&id) {
                for dep in &info.direct_dependencies {
                    stack.push(dep.clone());
                }
            }
            order.push(id);
        }

        order.iter().filter_map(|id| self.modules.keys().find(|k| *k == id)).collect()
    }

    /// `true` if any module reachable from `root` is a placeholder.
    pub fn closure_contains_placeholder(&self, root: &ModuleId) -> bool {
        self.transitive_closure(root).iter().any(|id| id.is_placeholder())
    }
}

/// Computes a cache key from a module's inputs: its context hash plus the
/// sorted cache keys of its direct dependencies, so that any change to a
/// dependency's own inputs changes this module's key transitively.
pub fn compute_cache_key(context_hash: &str, dependency_keys: &[&str]) -> String {
    let mut sorted = dependency_keys.to_vec();
    sorted.sort_unstable();
    let mut joined = context_hash.to_string();
    for key in sorted {
        joined.push('|');
        joined.push_str(key);
    }
    content_hash(joined.as_bytes())
}
