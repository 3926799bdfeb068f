//! Ring assembly: linking segments end-to-end into closed rings
//!
//! Segments are edges of an undirected multigraph whose vertices are endpoint
//! coordinates. An endpoint index built once per assembly maps each coordinate to the
//! segments ending there, and segments are referred to by their index in the collected
//! list, so everything is freed together when the assembly is done.

use crate::collector::Segment;
use crate::ring::Ring;
use crate::{Coordinate, Role, WayId, utils};
use smallvec::SmallVec;
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rule for choosing the next segment when several meet at a chain's open end
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum JunctionPolicy {
    /// Prefer a segment with the same declared role as the one being extended, then the
    /// earliest collected
    #[default]
    RoleThenOrder,
    /// Always take the earliest collected segment
    CollectionOrder,
    /// Take the segment with the fewest coordinates, then the earliest collected
    ShortestFirst,
}

/// A chain of segments whose ends never met
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UnclosedRing {
    /// Ways of the chain, in linking order
    pub ways: Vec<WayId>,
    /// First coordinate of the chain
    pub start: Coordinate,
    /// Last coordinate of the chain
    pub end: Coordinate,
    pub coordinate_count: usize,
}

/// Why a closed chain was rejected
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DegenerateReason {
    /// Fewer than three distinct coordinates
    TooFewCoordinates { distinct: usize },
    /// Three or more distinct coordinates, all collinear
    ZeroArea,
}

/// A closed chain that does not bound a region
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DegenerateRing {
    pub ways: Vec<WayId>,
    pub reason: DegenerateReason,
}

/// Output of ring assembly
#[derive(Clone, Debug, Default)]
pub struct LinkedRings {
    /// Closed, valid rings in the order they were formed
    pub rings: Vec<Ring>,
    pub unclosed: Vec<UnclosedRing>,
    pub degenerate: Vec<DegenerateRing>,
}

/// Map from endpoint coordinate to the open segments ending there
///
/// Candidate lists are in collection order. Closed segments are rings on their own and
/// are not indexed.
struct EndpointIndex {
    endpoints: HashMap<Coordinate, SmallVec<[usize; 2]>>,
}

impl EndpointIndex {
    fn build(segments: &[Segment]) -> Self {
        let mut endpoints: HashMap<Coordinate, SmallVec<[usize; 2]>> =
            HashMap::with_capacity(segments.len() * 2);
        for (index, segment) in segments.iter().enumerate() {
            if segment.is_closed() {
                continue;
            }
            endpoints.entry(segment.first()).or_default().push(index);
            endpoints.entry(segment.last()).or_default().push(index);
        }
        Self { endpoints }
    }

    #[inline]
    fn candidates(&self, at: Coordinate) -> &[usize] {
        self.endpoints
            .get(&at)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }
}

/// Chain being grown from one starting segment
struct Chain {
    coords: Vec<Coordinate>,
    /// Segment indices in linking order
    members: Vec<usize>,
    /// Position in `coords` where each member begins
    starts: Vec<usize>,
    flipped: bool,
}

impl Chain {
    fn start(index: usize, segment: &Segment) -> Self {
        Self {
            coords: segment.coords().to_vec(),
            members: vec![index],
            starts: vec![0],
            flipped: false,
        }
    }

    #[inline]
    fn head(&self) -> Coordinate {
        self.coords[0]
    }

    #[inline]
    fn tail(&self) -> Coordinate {
        self.coords[self.coords.len() - 1]
    }

    #[inline]
    fn is_closed(&self) -> bool {
        self.head() == self.tail()
    }

    /// Segment at the open end, whose role guides junction choices
    #[inline]
    fn tail_segment(&self) -> usize {
        self.members[self.members.len() - 1]
    }

    /// Append a segment sharing the tail coordinate, reversing it if needed
    fn append(&mut self, index: usize, segment: &Segment) {
        let tail = self.tail();
        self.starts.push(self.coords.len() - 1);
        if segment.first() == tail {
            self.coords.extend_from_slice(&segment.coords()[1..]);
        } else {
            self.coords
                .extend(segment.coords().iter().rev().skip(1).copied());
        }
        self.members.push(index);
    }

    /// Turn the chain around so that growth continues from the other end
    fn flip(&mut self) {
        let last = self.coords.len() - 1;
        self.starts = self.starts[1..]
            .iter()
            .chain(std::iter::once(&last))
            .rev()
            .map(|&end| last - end)
            .collect();
        self.coords.reverse();
        self.members.reverse();
        self.flipped = true;
    }

    /// Detach the loop formed when the tail returns to a joint between two members
    ///
    /// Returns the loop's coordinates and members; the chain keeps everything up to
    /// the joint and continues growing from there.
    fn split_loop(&mut self) -> Option<(Vec<Coordinate>, Vec<usize>)> {
        let tail = self.tail();
        let joint = (1..self.members.len()).find(|&j| self.coords[self.starts[j]] == tail)?;
        let at = self.starts[joint];
        let coords = self.coords.split_off(at);
        self.coords.push(tail);
        let members = self.members.split_off(joint);
        self.starts.truncate(joint);
        Some((coords, members))
    }
}

/// Link segments into maximal closed rings
///
/// Segments are taken as chain starts in collection order. A chain grows at its open
/// end until it returns to its starting coordinate; when it dead-ends it is turned
/// around once and grown from the other end before being reported as unclosed. A loop
/// closing at any other joint of the chain is split off as a ring of its own, so a
/// dangling way attached to a ring never keeps that ring from closing.
pub fn link_rings(segments: &[Segment], policy: JunctionPolicy) -> LinkedRings {
    #[cfg(feature = "profiling")]
    profiling::scope!("assembler::link_rings");

    let index = EndpointIndex::build(segments);
    let mut used = vec![false; segments.len()];
    let mut linked = LinkedRings::default();

    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut chain = Chain::start(start, &segments[start]);

        let closed = loop {
            if chain.is_closed() {
                break true;
            }
            let role = segments[chain.tail_segment()].role();
            match pick_next(&index, chain.tail(), segments, &used, role, policy) {
                Some(next) => {
                    used[next] = true;
                    chain.append(next, &segments[next]);
                    if let Some((coords, members)) = chain.split_loop() {
                        tracing::trace!(at = %chain.tail(), "loop closed inside chain");
                        finish_ring(coords, &members, segments, &mut linked);
                    }
                }
                None if !chain.flipped => chain.flip(),
                None => break false,
            }
        };

        if closed {
            finish_ring(chain.coords, &chain.members, segments, &mut linked);
        } else {
            let unclosed = UnclosedRing {
                ways: chain.members.iter().map(|&i| segments[i].way()).collect(),
                start: chain.head(),
                end: chain.tail(),
                coordinate_count: chain.coords.len(),
            };
            tracing::debug!(
                ways = ?unclosed.ways,
                start = %unclosed.start,
                end = %unclosed.end,
                "dangling chain"
            );
            linked.unclosed.push(unclosed);
        }
    }

    linked
}

fn pick_next(
    index: &EndpointIndex,
    at: Coordinate,
    segments: &[Segment],
    used: &[bool],
    role: Role,
    policy: JunctionPolicy,
) -> Option<usize> {
    let candidates: SmallVec<[usize; 4]> = index
        .candidates(at)
        .iter()
        .copied()
        .filter(|&i| !used[i])
        .collect();
    if candidates.len() > 1 {
        tracing::trace!(at = %at, candidates = candidates.len(), ?policy, "junction");
    }

    match policy {
        JunctionPolicy::CollectionOrder => candidates.first().copied(),
        JunctionPolicy::RoleThenOrder => role
            .is_known()
            .then(|| {
                candidates
                    .iter()
                    .copied()
                    .find(|&i| segments[i].role() == role)
            })
            .flatten()
            .or_else(|| candidates.first().copied()),
        JunctionPolicy::ShortestFirst => candidates
            .iter()
            .copied()
            .min_by_key(|&i| (segments[i].len(), i)),
    }
}

fn finish_ring(
    mut coords: Vec<Coordinate>,
    chain: &[usize],
    segments: &[Segment],
    linked: &mut LinkedRings,
) {
    coords.dedup();
    let ways: Vec<WayId> = chain.iter().map(|&i| segments[i].way()).collect();

    let distinct = utils::distinct_count(&coords[..coords.len() - 1]);
    let reason = if distinct < 3 {
        Some(DegenerateReason::TooFewCoordinates { distinct })
    } else if utils::twice_signed_area(&coords) == 0 {
        Some(DegenerateReason::ZeroArea)
    } else {
        None
    };
    if let Some(reason) = reason {
        tracing::debug!(?ways, ?reason, "degenerate ring");
        linked.degenerate.push(DegenerateRing { ways, reason });
        return;
    }

    let members = chain
        .iter()
        .map(|&i| (segments[i].way(), segments[i].role()))
        .collect();
    let incomplete = chain.iter().any(|&i| segments[i].is_incomplete());
    linked.rings.push(Ring::new(coords, members, incomplete));
}
