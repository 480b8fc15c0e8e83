//! The module dependency graph (MDG): the persistent, per-project
//! bipartite graph of provider and use nodes that drives incremental
//! recompilation, generalized from whole-file import edges to a
//! finer-grained provider/use key graph.

pub mod integrate;
pub mod query;
pub mod serde_format;

use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
};

/// Which half of a file's declarations a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Aspect {
    Interface,
    Implementation,
}

/// The name half of a [`Key`]. `Nominal`/`PotentialMember` carry only a
/// context string; `Member` carries both context and name; the rest carry
/// only a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Designator {
    TopLevel(String),
    Nominal { context: String },
    PotentialMember { context: String },
    Member { context: String, name: String },
    DynamicLookup(String),
    ExternalDepend(PathBuf),
    SourceFileProvide(String),
}

/// A node's identity: the aspect it belongs to crossed with its
/// designator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Key {
    pub aspect: Aspect,
    pub designator: Designator,
}

impl Key {
    pub fn new(aspect: Aspect, designator: Designator) -> Self {
        Self { aspect, designator }
    }
}

/// Dense identity of a node in the arena; stable within one process run.
pub type NodeSeq = u32;

/// A node in the graph: a key, an optional fingerprint, whether this node
/// is a provider (as opposed to a mere use), and the sequence numbers of
/// the def nodes it depends on (populated for use nodes).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub key: Key,
    pub fingerprint: Option<String>,
    pub provides: bool,
    pub depends_on: Vec<NodeSeq>,
}

/// Incremental build status recorded for one input in the build record,
/// seeding decisions on a fresh process before any per-file record has been
/// reintegrated this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BuildStatus {
    UpToDate,
    NeedsCompile,
}

/// Sidecar record of (input path, last-good-compile timestamp, status).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct BuildRecord {
    pub entries: BTreeMap<PathBuf, (u64, BuildStatus)>,
}

impl BuildRecord {
    /// Drops entries for files no longer present in `current_inputs`.
    pub fn compact(&mut self, current_inputs: &BTreeSet<PathBuf>) {
        self.entries.retain(|path, _| current_inputs.contains(path));
    }
}

/// The in-memory module dependency graph. An arena of nodes keyed by dense
/// sequence number, plus the indices needed for fast integration and
/// change-detection queries: which nodes a source file provides, and which
/// use nodes reference a given key (`uses_by_def`).
#[derive(Debug, Clone, Default)]
pub struct ModuleDependencyGraph {
    pub nodes: Vec<Node>,
    /// source file -> sequence numbers of nodes it provides.
    pub provided_by_file: BTreeMap<PathBuf, BTreeSet<NodeSeq>>,
    /// key -> sequence numbers of nodes that use it.
    pub uses_by_def: BTreeMap<Key, BTreeSet<NodeSeq>>,
    /// external dependency path -> fingerprint, plus a traced bit so each
    /// external is reported at most once per run.
    pub external_fingerprints: BTreeMap<PathBuf, String>,
    pub traced_externals: BTreeSet<PathBuf>,
    /// Edges that were recorded as noncascading (implementation-only);
    /// these do not propagate invalidation past their immediate user.
    pub noncascading_edges: BTreeSet<(NodeSeq, Key)>,
    pub build_record: BuildRecord,
    /// whole-file node sequence -> the source file it represents.
    pub file_by_whole_node: BTreeMap<NodeSeq, PathBuf>,
    /// source file -> the provider keys that drive invalidation the next
    /// time a change-detection query starts from that file, computed by the
    /// most recent `integrate()` call for it. Narrowed to the providers
    /// whose fingerprint actually moved since the previous integration, or
    /// widened back to every provider of the file when no single provider
    /// fingerprint changed but the file-level one did (or this is the
    /// file's first integration). Not persisted; a freshly deserialized
    /// graph has nothing to compare against until the next integration.
    pub changed_provider_keys: BTreeMap<PathBuf, BTreeSet<Key>>,
}

impl ModuleDependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, seq: NodeSeq) -> Option<&Node> {
        self.nodes.get(seq as usize)
    }

    fn find_node(&self, key: &Key) -> Option<NodeSeq> {
        self.nodes.iter().position(|n| &n.key == key).map(|i| i as NodeSeq)
    }

    /// Inserts a new node and returns its sequence number, or returns the
    /// existing sequence number for `key` if one is already present.
    fn intern(&mut self, key: Key) -> NodeSeq {
        if let Some(seq) = self.find_node(&key) {
            return seq;
        }
        let seq = self.nodes.len() as NodeSeq;
        self.nodes.push(Node { key, fingerprint: None, provides: false, depends_on: Vec::new() });
        seq
    }
}
