//! Segment collection: resolving member ways into coordinate sequences

use crate::source::{AreaSource, LocationIndex, WayStore};
use crate::{Coordinate, NodeId, Role, WayId};

/// An ordered coordinate sequence contributed by one way
///
/// Segments are immutable once collected and hold at least two distinct coordinates,
/// with no two adjacent coordinates equal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    way: WayId,
    role: Role,
    coords: Vec<Coordinate>,
    incomplete: bool,
}

/// Problem found while collecting one member way
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SegmentIssue {
    /// The way is unknown to the way store
    MissingWay { way: WayId },
    /// Some node locations could not be resolved, or resolved outside the valid range
    ///
    /// `kept` tells whether the segment was still collected from its resolved nodes.
    /// A kept segment missing an endpoint cannot link at that end and surfaces as part
    /// of an unclosed chain.
    MissingNodes {
        way: WayId,
        nodes: Vec<NodeId>,
        kept: bool,
    },
    /// Fewer than two distinct coordinates remained
    TooFewNodes { way: WayId, distinct: usize },
}

impl SegmentIssue {
    pub fn way(&self) -> WayId {
        match self {
            SegmentIssue::MissingWay { way }
            | SegmentIssue::MissingNodes { way, .. }
            | SegmentIssue::TooFewNodes { way, .. } => *way,
        }
    }

    /// Whether the issue comes from a reference the collaborators could not resolve
    pub fn is_unresolvable(&self) -> bool {
        matches!(
            self,
            SegmentIssue::MissingWay { .. } | SegmentIssue::MissingNodes { .. }
        )
    }
}

/// Output of the collection pass for one area
#[derive(Clone, Debug, Default)]
pub struct CollectedSegments {
    pub segments: Vec<Segment>,
    pub issues: Vec<SegmentIssue>,
}

impl CollectedSegments {
    /// Whether every referenced way and node was resolved
    pub fn is_complete(&self) -> bool {
        !self.issues.iter().any(SegmentIssue::is_unresolvable)
    }

    /// Add a segment built from already-resolved coordinates
    ///
    /// Returns `false` and records a [`SegmentIssue::TooFewNodes`] if the coordinates
    /// do not describe a usable segment.
    pub fn push_coords(&mut self, way: WayId, role: Role, coords: Vec<Coordinate>) -> bool {
        match Segment::new(way, role, coords) {
            Ok(segment) => {
                self.segments.push(segment);
                true
            }
            Err(issue) => {
                self.issues.push(issue);
                false
            }
        }
    }
}

impl Segment {
    /// Build a segment, removing adjacent duplicate coordinates
    pub fn new(
        way: WayId,
        role: Role,
        mut coords: Vec<Coordinate>,
    ) -> std::result::Result<Self, SegmentIssue> {
        coords.dedup();
        if coords.len() < 2 {
            return Err(SegmentIssue::TooFewNodes {
                way,
                distinct: coords.len(),
            });
        }
        Ok(Self {
            way,
            role,
            coords,
            incomplete: false,
        })
    }

    #[inline]
    pub fn way(&self) -> WayId {
        self.way
    }

    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    #[inline]
    pub fn coords(&self) -> &[Coordinate] {
        &self.coords
    }

    #[inline]
    pub fn first(&self) -> Coordinate {
        self.coords[0]
    }

    #[inline]
    pub fn last(&self) -> Coordinate {
        self.coords[self.coords.len() - 1]
    }

    /// Whether the segment returns to its starting coordinate
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.first() == self.last()
    }

    /// Whether some of the way's nodes were skipped because they could not be resolved
    #[inline]
    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

/// Gather the segments of an area candidate
///
/// Every member way is resolved through `ways` and its nodes through `locations`.
/// Problems never abort the pass; they are returned next to the segments.
pub fn collect_segments<W, L>(
    source: &AreaSource,
    ways: &W,
    locations: &L,
    keep_partial_ways: bool,
) -> CollectedSegments
where
    W: WayStore + ?Sized,
    L: LocationIndex + ?Sized,
{
    #[cfg(feature = "profiling")]
    profiling::scope!("collector::collect_segments");

    let mut collected = CollectedSegments::default();
    match source {
        AreaSource::SingleWay { id, nodes } => {
            collect_way(
                *id,
                Role::Outer,
                nodes,
                locations,
                keep_partial_ways,
                &mut collected,
            );
        }
        AreaSource::Relation { members, .. } => {
            for member in members {
                match ways.way_nodes(member.way) {
                    Some(nodes) => collect_way(
                        member.way,
                        member.role,
                        nodes,
                        locations,
                        keep_partial_ways,
                        &mut collected,
                    ),
                    None => {
                        tracing::debug!(way = member.way, "member way not found");
                        collected
                            .issues
                            .push(SegmentIssue::MissingWay { way: member.way });
                    }
                }
            }
        }
    }
    collected
}

fn collect_way<L>(
    way: WayId,
    role: Role,
    nodes: &[NodeId],
    locations: &L,
    keep_partial_ways: bool,
    collected: &mut CollectedSegments,
) where
    L: LocationIndex + ?Sized,
{
    let mut coords = Vec::with_capacity(nodes.len());
    let mut missing = Vec::new();
    for &node in nodes {
        match locations.coordinate_of(node) {
            Some(coordinate) if coordinate.is_valid() => coords.push(coordinate),
            _ => missing.push(node),
        }
    }

    if missing.is_empty() {
        collected.push_coords(way, role, coords);
        return;
    }

    let partial = keep_partial_ways.then(|| Segment::new(way, role, coords));
    let kept = matches!(partial, Some(Ok(_)));
    tracing::debug!(
        way,
        missing = missing.len(),
        kept,
        "unresolved node locations"
    );
    collected.issues.push(SegmentIssue::MissingNodes {
        way,
        nodes: missing,
        kept,
    });

    match partial {
        Some(Ok(mut segment)) => {
            segment.incomplete = true;
            collected.segments.push(segment);
        }
        Some(Err(issue)) => collected.issues.push(issue),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Member;
    use std::collections::HashMap;

    fn c(x: i32, y: i32) -> Coordinate {
        Coordinate::from_raw(x, y)
    }

    fn locations() -> HashMap<NodeId, Coordinate> {
        HashMap::from([(1, c(0, 0)), (2, c(0, 1)), (3, c(1, 1)), (4, c(1, 0))])
    }

    #[test]
    fn test_single_way_is_outer() {
        let source = AreaSource::closed_way(10, vec![1, 2, 3, 4, 1]).unwrap();
        let ways: HashMap<WayId, Vec<NodeId>> = HashMap::new();
        let collected = collect_segments(&source, &ways, &locations(), true);

        assert!(collected.is_complete());
        assert_eq!(collected.segments.len(), 1);
        let segment = &collected.segments[0];
        assert_eq!(segment.role(), Role::Outer);
        assert!(segment.is_closed());
        assert_eq!(segment.len(), 5);
        assert!(!segment.is_empty());
    }

    #[test]
    fn test_relation_members_keep_order_and_roles() {
        let ways: HashMap<WayId, Vec<NodeId>> =
            HashMap::from([(20, vec![1, 2, 3]), (21, vec![3, 4, 1])]);
        let source =
            AreaSource::relation(1, vec![Member::new(21, "inner"), Member::new(20, "")]);
        let collected = collect_segments(&source, &ways, &locations(), true);

        let summary: Vec<_> = collected
            .segments
            .iter()
            .map(|s| (s.way(), s.role()))
            .collect();
        assert_eq!(summary, vec![(21, Role::Inner), (20, Role::Unknown)]);
    }

    #[test]
    fn test_missing_way_is_reported() {
        let ways: HashMap<WayId, Vec<NodeId>> = HashMap::from([(20, vec![1, 2, 3])]);
        let source = AreaSource::relation(1, vec![Member::outer(20), Member::outer(99)]);
        let collected = collect_segments(&source, &ways, &locations(), true);

        assert_eq!(collected.segments.len(), 1);
        assert_eq!(collected.issues, vec![SegmentIssue::MissingWay { way: 99 }]);
        assert!(!collected.is_complete());
    }

    #[test]
    fn test_missing_interior_node_keeps_incomplete_segment() {
        let ways: HashMap<WayId, Vec<NodeId>> = HashMap::from([(20, vec![1, 77, 2, 3])]);
        let source = AreaSource::relation(1, vec![Member::outer(20)]);
        let collected = collect_segments(&source, &ways, &locations(), true);

        assert_eq!(collected.segments.len(), 1);
        assert!(collected.segments[0].is_incomplete());
        assert_eq!(collected.segments[0].coords(), &[c(0, 0), c(0, 1), c(1, 1)]);
        assert_eq!(
            collected.issues,
            vec![SegmentIssue::MissingNodes {
                way: 20,
                nodes: vec![77],
                kept: true
            }]
        );
    }

    #[test]
    fn test_missing_endpoint_keeps_resolved_part() {
        let ways: HashMap<WayId, Vec<NodeId>> = HashMap::from([(20, vec![1, 2, 77])]);
        let source = AreaSource::relation(1, vec![Member::outer(20)]);
        let collected = collect_segments(&source, &ways, &locations(), true);

        assert_eq!(collected.segments.len(), 1);
        assert!(collected.segments[0].is_incomplete());
        assert_eq!(collected.segments[0].coords(), &[c(0, 0), c(0, 1)]);
        assert_eq!(
            collected.issues,
            vec![SegmentIssue::MissingNodes {
                way: 20,
                nodes: vec![77],
                kept: true
            }]
        );
    }

    #[test]
    fn test_missing_endpoint_with_one_resolved_node() {
        let ways: HashMap<WayId, Vec<NodeId>> = HashMap::from([(20, vec![1, 77, 78])]);
        let source = AreaSource::relation(1, vec![Member::outer(20)]);
        let collected = collect_segments(&source, &ways, &locations(), true);

        assert!(collected.segments.is_empty());
        assert_eq!(
            collected.issues,
            vec![
                SegmentIssue::MissingNodes {
                    way: 20,
                    nodes: vec![77, 78],
                    kept: false
                },
                SegmentIssue::TooFewNodes {
                    way: 20,
                    distinct: 1
                },
            ]
        );
    }

    #[test]
    fn test_out_of_range_location_is_missing() {
        let mut locations = locations();
        locations.insert(5, c(1_900_000_000, 0));
        let ways: HashMap<WayId, Vec<NodeId>> = HashMap::from([(20, vec![1, 5, 2, 3])]);
        let source = AreaSource::relation(1, vec![Member::outer(20)]);
        let collected = collect_segments(&source, &ways, &locations, true);

        assert_eq!(collected.segments[0].coords(), &[c(0, 0), c(0, 1), c(1, 1)]);
        assert!(collected.segments[0].is_incomplete());
        assert_eq!(
            collected.issues,
            vec![SegmentIssue::MissingNodes {
                way: 20,
                nodes: vec![5],
                kept: true
            }]
        );
        assert!(!collected.is_complete());
    }

    #[test]
    fn test_partial_ways_can_be_disabled() {
        let ways: HashMap<WayId, Vec<NodeId>> = HashMap::from([(20, vec![1, 77, 2, 3])]);
        let source = AreaSource::relation(1, vec![Member::outer(20)]);
        let collected = collect_segments(&source, &ways, &locations(), false);

        assert!(collected.segments.is_empty());
        assert_eq!(collected.issues.len(), 1);
    }

    #[test]
    fn test_duplicate_nodes_are_removed() {
        let ways: HashMap<WayId, Vec<NodeId>> =
            HashMap::from([(20, vec![1, 2, 2, 3, 3, 3])]);
        let source = AreaSource::relation(1, vec![Member::outer(20)]);
        let collected = collect_segments(&source, &ways, &locations(), true);

        assert_eq!(collected.segments[0].len(), 3);
    }

    #[test]
    fn test_single_distinct_node_is_rejected() {
        let ways: HashMap<WayId, Vec<NodeId>> = HashMap::from([(20, vec![1, 1])]);
        let source = AreaSource::relation(1, vec![Member::outer(20)]);
        let collected = collect_segments(&source, &ways, &locations(), true);

        assert!(collected.segments.is_empty());
        assert_eq!(
            collected.issues,
            vec![SegmentIssue::TooFewNodes {
                way: 20,
                distinct: 1
            }]
        );
        // Not an unresolved reference
        assert!(collected.is_complete());
    }
}
