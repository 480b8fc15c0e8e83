//! Versioned serialization of the module dependency graph: a (major, minor)
//! header checked on read, rejecting either a major or minor version drift.

use super::{BuildRecord, Key, ModuleDependencyGraph, Node};
use crate::error::{DriverError, Result};
use std::{
    collections::BTreeMap,
    io::{Read, Write},
    path::PathBuf,
};

pub const CURRENT_MAJOR: u32 = 1;
pub const CURRENT_MINOR: u32 = 0;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Header {
    major: u32,
    minor: u32,
}

/// The on-disk shape of the graph: nodes, the def-key to use-node-sequence
/// map, the fingerprinted external set, and the build record. Kept
/// independent of `ModuleDependencyGraph`'s in-memory indices (which are
/// rebuilt from these fields on read) so round-tripping is a clean
/// structural comparison.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Wire {
    header: Header,
    nodes: Vec<Node>,
    uses_by_def: BTreeMap<Key, std::collections::BTreeSet<super::NodeSeq>>,
    provided_by_file: BTreeMap<PathBuf, std::collections::BTreeSet<super::NodeSeq>>,
    file_by_whole_node: BTreeMap<super::NodeSeq, PathBuf>,
    external_fingerprints: BTreeMap<PathBuf, String>,
    build_record: BuildRecord,
}

impl ModuleDependencyGraph {
    pub fn serialize_to(&self, mut writer: impl Write) -> Result<()> {
        let wire = Wire {
            header: Header { major: CURRENT_MAJOR, minor: CURRENT_MINOR },
            nodes: self.nodes.clone(),
            uses_by_def: self.uses_by_def.clone(),
            provided_by_file: self.provided_by_file.clone(),
            file_by_whole_node: self.file_by_whole_node.clone(),
            external_fingerprints: self.external_fingerprints.clone(),
            build_record: self.build_record.clone(),
        };
        serde_json::to_writer(&mut writer, &wire)?;
        Ok(())
    }

    pub fn deserialize_from(mut reader: impl Read) -> Result<Self> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        let wire: Wire = serde_json::from_str(&content)?;

        if wire.header.major != CURRENT_MAJOR {
            return Err(DriverError::MismatchedSerializedGraphVersion {
                expected: CURRENT_MAJOR,
                read: wire.header.major,
            });
        }
        if wire.header.minor != CURRENT_MINOR {
            return Err(DriverError::MismatchedSerializedGraphVersion {
                expected: CURRENT_MINOR,
                read: wire.header.minor,
            });
        }

        Ok(Self {
            nodes: wire.nodes,
            provided_by_file: wire.provided_by_file,
            uses_by_def: wire.uses_by_def,
            external_fingerprints: wire.external_fingerprints,
            traced_externals: Default::default(),
            noncascading_edges: Default::default(),
            build_record: wire.build_record,
            file_by_whole_node: wire.file_by_whole_node,
            changed_provider_keys: Default::default(),
        })
    }
}
