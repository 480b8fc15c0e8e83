//! Integrating a per-file dependency record into the graph after a
//! successful compile: folds a freshly compiled file's provides/uses back
//! into the graph's indices.

use super::{Aspect, Designator, Key, ModuleDependencyGraph, Node};
use crate::error::{DriverError, Result};
use std::path::{Path, PathBuf};

/// One provided or used declaration as reported in a per-file dependency
/// record, before integration.
#[derive(Debug, Clone)]
pub struct RecordEntry {
    pub aspect: Aspect,
    pub designator: Designator,
    pub fingerprint: Option<String>,
    /// `true` for an implementation-only ("noncascading") use; such edges
    /// do not propagate invalidation past their immediate user.
    pub noncascading: bool,
}

/// A parsed per-file dependency record: the providers and uses a single
/// source file's compile emitted.
#[derive(Debug, Clone, Default)]
pub struct DependencyRecord {
    pub provides: Vec<RecordEntry>,
    pub uses: Vec<RecordEntry>,
    pub external_dependencies: Vec<(PathBuf, String)>,
    /// A whole-file fingerprint, independent of any single provider's. Used
    /// only to decide whether reintegration needs the conservative
    /// every-provider-changed fallback when no individual provider
    /// fingerprint moved.
    pub file_fingerprint: Option<String>,
}

impl DependencyRecord {
    /// Parses the mock textual format used in tests and tooling:
    /// `topLevel={a,b,c}` for provides and `topLevel={x->,b->,z->}` for
    /// uses, where a trailing `->` with a leading `#` marks a noncascading
    /// use (e.g. `#x->`).
    pub fn parse_mock(source: &str) -> Result<Self> {
        let mut record = Self::default();
        for clause in source.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (kind, rest) = clause
                .split_once('=')
                .ok_or_else(|| DriverError::MalformedDependencyRecord(clause.to_string()))?;
            let rest = rest.trim().trim_start_matches('{').trim_end_matches('}');
            for item in rest.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let (noncascading, name) =
                    if let Some(stripped) = item.strip_prefix('#') { (true, stripped) } else { (false, item) };
                let is_use = name.ends_with("->");
                let name = name.trim_end_matches("->");
                let designator = match kind.trim() {
                    "topLevel" => Designator::TopLevel(name.to_string()),
                    "nominal" => Designator::Nominal { context: name.to_string() },
                    "dynamicLookup" => Designator::DynamicLookup(name.to_string()),
                    other => return Err(DriverError::MalformedDependencyRecord(other.to_string())),
                };
                let entry = RecordEntry {
                    aspect: Aspect::Interface,
                    designator,
                    fingerprint: None,
                    noncascading,
                };
                if is_use {
                    record.uses.push(entry);
                } else {
                    record.provides.push(entry);
                }
            }
        }
        Ok(record)
    }
}

impl ModuleDependencyGraph {
    /// Integrates `record`, the per-file dependency record for `source`:
    /// - each provider maps to a node under its key, updated in place if
    ///   one exists, and marked `provides`;
    /// - each use becomes a non-provides node if none exists yet, with an
    ///   edge from a whole-file node to every def node it depends on;
    /// - a whole-file virtual node per source links interface and
    ///   implementation aspects to that file's individual provides.
    ///
    /// Also diffs each provider's new fingerprint against its previous
    /// value (a brand new provider counts as changed regardless of its
    /// fingerprint) and records the result in `changed_provider_keys` for
    /// `source`: the set of keys a subsequent change-detection query should
    /// narrow invalidation to. When no provider fingerprint moved but the
    /// file-level one did (or this is the first integration, so there is
    /// nothing stable to narrow against), the recorded set widens back to
    /// every provider of the file.
    pub fn integrate(&mut self, source: &Path, record: &DependencyRecord) -> Result<()> {
        let mut provided = std::collections::BTreeSet::new();
        let mut changed_keys = std::collections::BTreeSet::new();

        for entry in &record.provides {
            let key = Key::new(entry.aspect, entry.designator.clone());
            let existed = self.find_node(&key).is_some();
            let seq = self.intern(key.clone());
            let node = &mut self.nodes[seq as usize];
            let fingerprint_changed = !existed || node.fingerprint != entry.fingerprint;
            node.fingerprint = entry.fingerprint.clone();
            node.provides = true;
            provided.insert(seq);
            if fingerprint_changed {
                changed_keys.insert(key);
            }
        }

        let whole_file_key = Key::new(Aspect::Interface, Designator::SourceFileProvide(
            crate::utils::source_name(source, Path::new("")),
        ));
        let whole_file_existed = self.find_node(&whole_file_key).is_some();
        let whole_file_seq = self.intern(whole_file_key.clone());
        let previous_file_fingerprint = self.nodes[whole_file_seq as usize].fingerprint.clone();
        {
            let node = &mut self.nodes[whole_file_seq as usize];
            node.provides = true;
            node.depends_on = provided.iter().copied().collect();
            node.fingerprint = record.file_fingerprint.clone();
        }
        provided.insert(whole_file_seq);
        self.file_by_whole_node.insert(whole_file_seq, source.to_path_buf());

        let file_fingerprint_changed =
            !whole_file_existed || previous_file_fingerprint != record.file_fingerprint;

        let invalidating_keys = if !changed_keys.is_empty() {
            changed_keys
        } else if file_fingerprint_changed {
            provided.iter().filter_map(|&seq| self.node(seq)).map(|n| n.key.clone()).collect()
        } else {
            std::collections::BTreeSet::new()
        };
        self.changed_provider_keys.insert(source.to_path_buf(), invalidating_keys);

        for entry in &record.uses {
            let key = Key::new(entry.aspect, entry.designator.clone());
            if entry.noncascading {
                self.noncascading_edges.insert((whole_file_seq, key.clone()));
            }
            // `uses_by_def[key]` is the set of whole-file nodes that use
            // `key`; when `key`'s provider changes, every such node is a
            // recompile candidate.
            self.uses_by_def.entry(key).or_default().insert(whole_file_seq);
        }

        for (path, fingerprint) in &record.external_dependencies {
            self.external_fingerprints.insert(path.clone(), fingerprint.clone());
            self.traced_externals.remove(path);
        }

        self.provided_by_file.insert(source.to_path_buf(), provided);
        Ok(())
    }
}
