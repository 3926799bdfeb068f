//! Ring classification: outer/inner roles from geometric nesting
//!
//! Each ring's nesting depth is the number of other rings containing it. Even depths are
//! outer rings and odd depths are inner rings, so holes-in-holes come back as outer rings
//! of their own, as multipolygon semantics require. Declared member roles only order
//! rings that coincide; everywhere else the geometry wins and disagreements are reported.

use crate::area::Polygon;
use crate::ring::{Containment, Orientation, Ring, RingShape};
use crate::{Role, WayId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Winding of outer rings after classification; inner rings get the opposite
pub const OUTER_ORIENTATION: Orientation = Orientation::CounterClockwise;

/// A ring whose declared member roles disagree with its computed role
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoleMismatch {
    /// Ways of the ring declared with the wrong role
    pub ways: Vec<WayId>,
    pub declared: Role,
    pub computed: Role,
}

/// Two rings whose nesting cannot be decided
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NestingConflict {
    pub first: Vec<WayId>,
    pub second: Vec<WayId>,
}

/// Output of classification
#[derive(Clone, Debug, Default)]
pub struct Classified {
    /// One polygon per outer ring, in ring formation order
    pub polygons: Vec<Polygon>,
    pub role_mismatches: Vec<RoleMismatch>,
}

/// Assign outer/inner roles and group inner rings under their enclosing outer ring
///
/// Coincident rings are nested by their declared roles, an `inner` ring going inside
/// an `outer` one. Fails when two rings contain each other, when coincident rings do
/// not differ in declared role, or when an inner ring has no containing outer ring.
pub fn classify(rings: Vec<Ring>) -> std::result::Result<Classified, NestingConflict> {
    #[cfg(feature = "profiling")]
    profiling::scope!("classifier::classify");

    let containers = containment_graph(&rings)?;
    let depths: Vec<usize> = containers.iter().map(Vec::len).collect();
    let is_outer = |i: usize| depths[i] % 2 == 0;

    // Parent of every inner ring: its deepest containing outer ring
    let mut parents: Vec<Option<usize>> = vec![None; rings.len()];
    for (i, parent) in parents.iter_mut().enumerate() {
        if is_outer(i) {
            continue;
        }
        let deepest = containers[i]
            .iter()
            .copied()
            .filter(|&j| is_outer(j))
            .max_by_key(|&j| (depths[j], std::cmp::Reverse(j)));
        match deepest {
            Some(j) => *parent = Some(j),
            None => return Err(conflict(&rings, i, containers[i][0])),
        }
    }

    let mut role_mismatches = Vec::new();
    let mut slots: Vec<Option<Ring>> = Vec::with_capacity(rings.len());
    for (i, mut ring) in rings.into_iter().enumerate() {
        let role = if is_outer(i) { Role::Outer } else { Role::Inner };
        if let Some(mismatch) = role_mismatch(&ring, role) {
            tracing::debug!(
                ways = ?mismatch.ways,
                declared = %mismatch.declared,
                computed = %mismatch.computed,
                "role mismatch"
            );
            role_mismatches.push(mismatch);
        }
        ring.set_role(role);
        ring.orient(match role {
            Role::Outer => OUTER_ORIENTATION,
            _ => OUTER_ORIENTATION.reversed(),
        });
        slots.push(Some(ring));
    }

    // Inner rings are taken out first so that outer rings keep their order
    let mut holes: Vec<Vec<Ring>> = vec![Vec::new(); slots.len()];
    for (i, parent) in parents.iter().enumerate() {
        if let (Some(parent), Some(ring)) = (parent, slots[i].take()) {
            holes[*parent].push(ring);
        }
    }
    let polygons = slots
        .into_iter()
        .zip(holes)
        .filter_map(|(outer, inners)| outer.map(|outer| Polygon::new(outer, inners)))
        .collect();

    Ok(Classified {
        polygons,
        role_mismatches,
    })
}

/// For every ring, the indices of the rings containing it
fn containment_graph(rings: &[Ring]) -> std::result::Result<Vec<Vec<usize>>, NestingConflict> {
    let shapes: Vec<RingShape> = rings.iter().map(RingShape::new).collect();
    let mut containers: Vec<Vec<usize>> = vec![Vec::new(); rings.len()];

    for (i, ring) in rings.iter().enumerate() {
        for (j, shape) in shapes.iter().enumerate() {
            if i == j {
                continue;
            }
            match shape.containment_of(ring) {
                Containment::Inside => containers[i].push(j),
                Containment::Outside => {}
                Containment::Coincident => {
                    match (ring.declared_role(), rings[j].declared_role()) {
                        (Role::Inner, Role::Outer) => containers[i].push(j),
                        (Role::Outer, Role::Inner) => {}
                        _ => return Err(conflict(rings, i.min(j), i.max(j))),
                    }
                }
            }
        }
    }

    for (i, list) in containers.iter().enumerate() {
        if let Some(&j) = list.iter().find(|&&j| containers[j].contains(&i)) {
            return Err(conflict(rings, i.min(j), i.max(j)));
        }
    }

    Ok(containers)
}

fn conflict(rings: &[Ring], first: usize, second: usize) -> NestingConflict {
    NestingConflict {
        first: rings[first].ways(),
        second: rings[second].ways(),
    }
}

fn role_mismatch(ring: &Ring, computed: Role) -> Option<RoleMismatch> {
    let mut declared = None;
    let ways: Vec<WayId> = ring
        .members()
        .iter()
        .filter(|(_, role)| role.is_known() && *role != computed)
        .map(|&(way, role)| {
            declared = Some(role);
            way
        })
        .collect();
    declared.map(|declared| RoleMismatch {
        ways,
        declared,
        computed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Coordinate;

    fn ring(way: WayId, role: Role, points: &[(i32, i32)]) -> Ring {
        let coords = points
            .iter()
            .map(|&(x, y)| Coordinate::from_raw(x, y))
            .collect();
        Ring::new(coords, vec![(way, role)], false)
    }

    fn square(way: WayId, role: Role, min: i32, max: i32) -> Ring {
        ring(
            way,
            role,
            &[(min, min), (max, min), (max, max), (min, max), (min, min)],
        )
    }

    #[test]
    fn test_single_ring_is_outer() {
        let classified = classify(vec![square(1, Role::Outer, 0, 10)]).unwrap();
        assert_eq!(classified.polygons.len(), 1);
        assert!(classified.polygons[0].inners().is_empty());
        assert_eq!(classified.polygons[0].outer().role(), Role::Outer);
        assert!(classified.role_mismatches.is_empty());
    }

    #[test]
    fn test_hole_grouped_under_outer() {
        let classified = classify(vec![
            square(1, Role::Inner, 2, 4),
            square(2, Role::Outer, 0, 10),
            square(3, Role::Outer, 20, 30),
        ])
        .unwrap();

        assert_eq!(classified.polygons.len(), 2);
        let first = &classified.polygons[0];
        assert_eq!(first.outer().ways(), vec![2]);
        assert_eq!(first.inners().len(), 1);
        assert_eq!(first.inners()[0].ways(), vec![1]);
        assert_eq!(first.inners()[0].role(), Role::Inner);
        assert!(classified.polygons[1].inners().is_empty());
    }

    #[test]
    fn test_winding_is_normalized() {
        let mut outer = square(1, Role::Outer, 0, 10);
        outer.reverse();
        let classified = classify(vec![outer, square(2, Role::Inner, 2, 4)]).unwrap();

        let polygon = &classified.polygons[0];
        assert_eq!(polygon.outer().orientation(), Orientation::CounterClockwise);
        assert_eq!(polygon.inners()[0].orientation(), Orientation::Clockwise);
    }

    #[test]
    fn test_nested_islands_alternate() {
        let classified = classify(vec![
            square(1, Role::Outer, 0, 100),
            square(2, Role::Inner, 10, 90),
            square(3, Role::Outer, 20, 80),
            square(4, Role::Inner, 30, 70),
        ])
        .unwrap();

        assert_eq!(classified.polygons.len(), 2);
        assert_eq!(classified.polygons[0].outer().ways(), vec![1]);
        assert_eq!(classified.polygons[0].inners()[0].ways(), vec![2]);
        assert_eq!(classified.polygons[1].outer().ways(), vec![3]);
        assert_eq!(classified.polygons[1].inners()[0].ways(), vec![4]);
        assert!(classified.role_mismatches.is_empty());
    }

    #[test]
    fn test_declared_role_mismatch_is_reported() {
        let classified = classify(vec![
            square(1, Role::Outer, 0, 10),
            ring(2, Role::Outer, &[(2, 2), (6, 2), (4, 6), (2, 2)]),
        ])
        .unwrap();

        assert_eq!(classified.polygons.len(), 1);
        assert_eq!(classified.polygons[0].inners()[0].ways(), vec![2]);
        assert_eq!(
            classified.role_mismatches,
            vec![RoleMismatch {
                ways: vec![2],
                declared: Role::Outer,
                computed: Role::Inner,
            }]
        );
    }

    #[test]
    fn test_unknown_role_is_not_a_mismatch() {
        let classified = classify(vec![
            square(1, Role::Unknown, 0, 10),
            square(2, Role::Unknown, 2, 4),
        ])
        .unwrap();
        assert!(classified.role_mismatches.is_empty());
    }

    #[test]
    fn test_mutual_containment_is_a_conflict() {
        // Overlapping squares, each starting at a vertex inside the other
        let a = ring(1, Role::Outer, &[(4, 4), (0, 4), (0, 0), (4, 0), (4, 4)]);
        let b = ring(2, Role::Outer, &[(2, 2), (6, 2), (6, 6), (2, 6), (2, 2)]);
        let conflict = classify(vec![a, b]).unwrap_err();
        assert_eq!(conflict.first, vec![1]);
        assert_eq!(conflict.second, vec![2]);
    }

    #[test]
    fn test_coincident_rings_follow_declared_roles() {
        let mut inner = square(2, Role::Inner, 0, 10);
        inner.reverse();
        let classified = classify(vec![
            inner,
            square(1, Role::Outer, 0, 10),
            ring(3, Role::Outer, &[(20, 0), (30, 0), (25, 8), (20, 0)]),
        ])
        .unwrap();

        assert_eq!(classified.polygons.len(), 2);
        assert_eq!(classified.polygons[0].outer().ways(), vec![1]);
        assert_eq!(classified.polygons[0].inners().len(), 1);
        assert_eq!(classified.polygons[0].inners()[0].ways(), vec![2]);
        assert_eq!(classified.polygons[1].outer().ways(), vec![3]);
        assert!(classified.role_mismatches.is_empty());
    }

    #[test]
    fn test_coincident_rings_with_same_role_are_a_conflict() {
        let conflict = classify(vec![
            square(1, Role::Outer, 0, 10),
            square(2, Role::Outer, 0, 10),
        ])
        .unwrap_err();
        assert_eq!(conflict.first, vec![1]);
        assert_eq!(conflict.second, vec![2]);
    }

    #[test]
    fn test_coincident_rings_with_unknown_role_are_a_conflict() {
        let conflict = classify(vec![
            square(1, Role::Unknown, 0, 10),
            square(2, Role::Inner, 0, 10),
        ])
        .unwrap_err();
        assert_eq!(conflict.second, vec![2]);
    }

    #[test]
    fn test_empty_input() {
        let classified = classify(Vec::new()).unwrap();
        assert!(classified.polygons.is_empty());
    }
}
