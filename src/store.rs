// Copyright (c) 2026-present, merkle-partition-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The content-addressed object store, consumed (not implemented) by the
//! partition engine per spec.md §6. This module defines the trait the
//! engine is written against, plus an in-memory reference implementation
//! used by the test suite — analogous to the teacher crate's own
//! `HashMap`-backed descriptor table and block cache.

use crate::error::{Error, Result};
use crate::partition::PartitionNode;
use crate::tablet::Tablet;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::RwLock;

/// A stable content-address returned by the object store.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Link(u64);

impl std::fmt::Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Link {
    /// Builds a link from a raw content-address value. Only meant for
    /// use by [`crate::coding`]-based wire (de)serialization.
    #[must_use]
    pub fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// The raw content-address value, for wire (de)serialization.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Either of the two node shapes this crate ever persists.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum NodeData {
    /// A single family's tablet.
    Tablet(Tablet),
    /// A partition node's metadata block.
    Partition(PartitionNode),
}

impl NodeData {
    /// Unwraps a tablet, failing with [`Error::CorruptNode`] if this is
    /// actually a partition node.
    pub fn into_tablet(self) -> Result<Tablet> {
        match self {
            Self::Tablet(t) => Ok(t),
            Self::Partition(_) => Err(Error::CorruptNode {
                detail: "expected a tablet, found a partition node".into(),
            }),
        }
    }

    /// Unwraps a partition node, failing with [`Error::CorruptNode`] if
    /// this is actually a tablet.
    pub fn into_partition(self) -> Result<PartitionNode> {
        match self {
            Self::Partition(p) => Ok(p),
            Self::Tablet(_) => Err(Error::CorruptNode {
                detail: "expected a partition node, found a tablet".into(),
            }),
        }
    }
}

/// The content-addressed node store this crate's engine is written
/// against. An outer layer owns the real implementation (disk-backed,
/// content-hashed per the table's configured hashing scheme); this crate
/// only ever calls `store_node` for newly built nodes and `get_data` for
/// previously committed links.
pub trait ObjectStore: Send + Sync {
    /// Serializes `data` together with its outgoing `links`, returning a
    /// stable content address. Storing byte-identical `(links, data)`
    /// twice returns the same link.
    fn store_node(&self, links: Vec<Link>, data: NodeData) -> Result<Link>;

    /// Fetches and deserializes the node at `link`.
    fn get_data(&self, link: &Link) -> Result<NodeData>;

    /// Tags a link with a display name (e.g. a family name). The default
    /// object store has no separate tagging concept, so this is the
    /// identity function; a real store may use `name` for debugging or
    /// listing.
    fn tag_link(&self, _name: &str, target: Link) -> Link {
        target
    }
}

/// An in-memory [`ObjectStore`], content-addressed by hashing `(links,
/// data)`. Used by this crate's own test suite; not a product feature.
#[derive(Default)]
pub struct MemoryStore {
    nodes: RwLock<HashMap<Link, NodeData>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct nodes currently stored.
    pub fn len(&self) -> usize {
        self.nodes.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn content_address(links: &[Link], data: &NodeData) -> Link {
        let mut hasher = rustc_hash::FxHasher::default();
        links.hash(&mut hasher);
        data.hash(&mut hasher);
        Link(hasher.finish())
    }
}

impl ObjectStore for MemoryStore {
    fn store_node(&self, links: Vec<Link>, data: NodeData) -> Result<Link> {
        let link = Self::content_address(&links, &data);
        self.nodes
            .write()
            .expect("lock poisoned")
            .entry(link)
            .or_insert(data);
        Ok(link)
    }

    fn get_data(&self, link: &Link) -> Result<NodeData> {
        self.nodes
            .read()
            .expect("lock poisoned")
            .get(link)
            .cloned()
            .ok_or_else(|| Error::StoreUnavailable {
                detail: format!("no node stored at link {link}"),
            })
    }
}
