//! Change-detection queries over the module dependency graph: propagating
//! dirtiness transitively across the provider/use key graph, respecting
//! noncascading edges that stop propagation past their immediate user.

use super::{Designator, Key, ModuleDependencyGraph};
use std::{
    collections::{BTreeSet, VecDeque},
    path::{Path, PathBuf},
};

impl ModuleDependencyGraph {
    /// Every provider key `file` contributes, with no fingerprint
    /// narrowing. Used for every BFS hop beyond the root, since by the time
    /// invalidation reaches a dependent file this query has no fingerprint
    /// for what that file's *next* compile will actually produce.
    fn all_provided_keys(&self, file: &Path) -> Vec<Key> {
        let Some(provided) = self.provided_by_file.get(file) else { return Vec::new() };
        provided.iter().filter_map(|&seq| self.node(seq)).map(|n| n.key.clone()).collect()
    }

    /// The transitive closure, in the use direction, of every file that
    /// must be recompiled when `source`'s whole-file dependencies change.
    /// Always reflexive: the result contains `source`.
    ///
    /// Only the root hop (`source` itself) is narrowed to the provider keys
    /// `integrate()` found actually changed; every further hop walks the
    /// dependent file's full provider set, since whether *its* recompile
    /// will leave fingerprints stable is unknown until it actually runs.
    pub fn find_swift_deps_to_recompile_when_whole_swift_deps_changes(
        &self,
        source: &Path,
    ) -> BTreeSet<PathBuf> {
        let mut result = BTreeSet::new();
        result.insert(source.to_path_buf());

        let mut to_propagate_from: VecDeque<PathBuf> = VecDeque::new();
        to_propagate_from.push_back(source.to_path_buf());
        let mut is_root = true;

        while let Some(file) = to_propagate_from.pop_front() {
            let keys: Vec<Key> = if is_root {
                match self.changed_provider_keys.get(&file) {
                    Some(changed) => changed.iter().cloned().collect(),
                    None => self.all_provided_keys(&file),
                }
            } else {
                self.all_provided_keys(&file)
            };
            is_root = false;

            for key in keys {
                let Some(users) = self.uses_by_def.get(&key) else { continue };
                for &user_seq in users {
                    let Some(user_file) = self.file_by_whole_node.get(&user_seq) else { continue };
                    if user_file == &file {
                        continue;
                    }
                    let noncascading = self.noncascading_edges.contains(&(user_seq, key.clone()));
                    let already_seen = result.contains(user_file);
                    result.insert(user_file.clone());
                    if !noncascading && !already_seen {
                        to_propagate_from.push_back(user_file.clone());
                    }
                }
            }
        }

        result
    }

    /// The closure starting from untraced nodes whose key is
    /// `externalDepend(path)`. Marks `path` as traced; a subsequent call
    /// for the same external returns an empty set.
    pub fn find_untraced_swift_deps_dependent_on_external(&mut self, path: &Path) -> BTreeSet<PathBuf> {
        if self.traced_externals.contains(path) {
            return BTreeSet::new();
        }
        self.traced_externals.insert(path.to_path_buf());

        let key = Key::new(super::Aspect::Interface, Designator::ExternalDepend(path.to_path_buf()));
        let Some(users) = self.uses_by_def.get(&key).cloned() else { return BTreeSet::new() };

        let mut result = BTreeSet::new();
        for user_seq in users {
            if let Some(file) = self.file_by_whole_node.get(&user_seq) {
                result.extend(self.find_swift_deps_to_recompile_when_whole_swift_deps_changes(file));
            }
        }
        result
    }
}
