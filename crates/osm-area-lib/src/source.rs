//! Area candidates and the collaborators that resolve them
//!
//! An area is either a single closed way or a multipolygon relation. Decoding the OSM
//! file and indexing node locations happen elsewhere; this crate only queries them
//! through [`WayStore`] and [`LocationIndex`].

use crate::{AreaId, Coordinate, NodeId, RelationId, Role, WayId};
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::sync::Arc;

/// Lookup of node coordinates
///
/// Implementations must be side-effect free. Batch assembly shares one index across
/// worker threads, so it also needs to be `Sync` there.
pub trait LocationIndex {
    fn coordinate_of(&self, node: NodeId) -> Option<Coordinate>;
}

/// Lookup of way node lists
pub trait WayStore {
    fn way_nodes(&self, way: WayId) -> Option<&[NodeId]>;
}

impl<S: BuildHasher> LocationIndex for HashMap<NodeId, Coordinate, S> {
    #[inline]
    fn coordinate_of(&self, node: NodeId) -> Option<Coordinate> {
        self.get(&node).copied()
    }
}

impl LocationIndex for BTreeMap<NodeId, Coordinate> {
    #[inline]
    fn coordinate_of(&self, node: NodeId) -> Option<Coordinate> {
        self.get(&node).copied()
    }
}

impl<S: BuildHasher + Clone> LocationIndex for DashMap<NodeId, Coordinate, S> {
    #[inline]
    fn coordinate_of(&self, node: NodeId) -> Option<Coordinate> {
        self.get(&node).map(|entry| *entry.value())
    }
}

impl<T: LocationIndex + ?Sized> LocationIndex for &T {
    #[inline]
    fn coordinate_of(&self, node: NodeId) -> Option<Coordinate> {
        (**self).coordinate_of(node)
    }
}

impl<T: LocationIndex + ?Sized> LocationIndex for Arc<T> {
    #[inline]
    fn coordinate_of(&self, node: NodeId) -> Option<Coordinate> {
        (**self).coordinate_of(node)
    }
}

impl<S: BuildHasher> WayStore for HashMap<WayId, Vec<NodeId>, S> {
    #[inline]
    fn way_nodes(&self, way: WayId) -> Option<&[NodeId]> {
        self.get(&way).map(Vec::as_slice)
    }
}

impl WayStore for BTreeMap<WayId, Vec<NodeId>> {
    #[inline]
    fn way_nodes(&self, way: WayId) -> Option<&[NodeId]> {
        self.get(&way).map(Vec::as_slice)
    }
}

impl<T: WayStore + ?Sized> WayStore for &T {
    #[inline]
    fn way_nodes(&self, way: WayId) -> Option<&[NodeId]> {
        (**self).way_nodes(way)
    }
}

/// A way member of a multipolygon relation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Member {
    pub way: WayId,
    pub role: Role,
}

impl Member {
    /// Create a member from its way id and raw role string
    pub fn new(way: WayId, role: &str) -> Self {
        Self {
            way,
            role: Role::parse(role),
        }
    }

    pub fn outer(way: WayId) -> Self {
        Self {
            way,
            role: Role::Outer,
        }
    }

    pub fn inner(way: WayId) -> Self {
        Self {
            way,
            role: Role::Inner,
        }
    }
}

/// Input of one area assembly
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AreaSource {
    /// A closed way, given by its node references
    SingleWay { id: WayId, nodes: Vec<NodeId> },
    /// A multipolygon relation, given by its way members in declaration order
    Relation {
        id: RelationId,
        members: Vec<Member>,
    },
}

impl AreaSource {
    /// Area candidate for a way, or `None` if the way is not closed
    pub fn closed_way(id: WayId, nodes: Vec<NodeId>) -> Option<Self> {
        is_closed_way(&nodes).then_some(AreaSource::SingleWay { id, nodes })
    }

    pub fn relation(id: RelationId, members: Vec<Member>) -> Self {
        AreaSource::Relation { id, members }
    }

    /// Id of the area this source produces
    pub fn area_id(&self) -> AreaId {
        match self {
            AreaSource::SingleWay { id, .. } => AreaId::from_way(*id),
            AreaSource::Relation { id, .. } => AreaId::from_relation(*id),
        }
    }

    /// Number of ways that take part in the assembly
    pub fn way_count(&self) -> usize {
        match self {
            AreaSource::SingleWay { .. } => 1,
            AreaSource::Relation { members, .. } => members.len(),
        }
    }
}

/// Whether a way's node list describes a closed ring (at least 4 refs, first == last)
pub fn is_closed_way(nodes: &[NodeId]) -> bool {
    nodes.len() >= 4 && nodes.first() == nodes.last()
}

/// Whether a relation's tags mark it as an area (`type=multipolygon` or `type=boundary`)
pub fn is_area_relation<'a, I>(tags: I) -> bool
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    tags.into_iter()
        .any(|(key, value)| key == "type" && matches!(value, "multipolygon" | "boundary"))
}
