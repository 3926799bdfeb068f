//! Closed rings and their derived geometric properties

use crate::{Coordinate, Role, WayId, utils};
use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{LineString, Polygon, Rect};

/// Winding order of a ring
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    Clockwise,
    CounterClockwise,
}

impl Orientation {
    #[inline]
    pub fn reversed(self) -> Self {
        match self {
            Orientation::Clockwise => Orientation::CounterClockwise,
            Orientation::CounterClockwise => Orientation::Clockwise,
        }
    }
}

/// A closed coordinate sequence formed from one or more segments
///
/// The first and last coordinates are equal, no two adjacent coordinates are, and the
/// ring encloses a non-zero area.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ring {
    coords: Vec<Coordinate>,
    /// Contributing ways with their declared roles, in linking order
    members: Vec<(WayId, Role)>,
    /// Role assigned by the classifier (`Unknown` until classified)
    role: Role,
    twice_area: i128,
    incomplete: bool,
}

impl Ring {
    /// Build a ring from an already closed and validated coordinate sequence
    pub(crate) fn new(
        coords: Vec<Coordinate>,
        members: Vec<(WayId, Role)>,
        incomplete: bool,
    ) -> Self {
        let twice_area = utils::twice_signed_area(&coords);
        Self {
            coords,
            members,
            role: Role::Unknown,
            twice_area,
            incomplete,
        }
    }

    /// Coordinates of the ring, first == last
    #[inline]
    pub fn coords(&self) -> &[Coordinate] {
        &self.coords
    }

    /// Number of vertices, not counting the repeated closing coordinate
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.coords.len() - 1
    }

    /// Ids of the ways the ring was linked from
    pub fn ways(&self) -> Vec<WayId> {
        self.members.iter().map(|(way, _)| *way).collect()
    }

    /// Contributing ways with the roles declared for them
    #[inline]
    pub fn members(&self) -> &[(WayId, Role)] {
        &self.members
    }

    /// Role shared by every contributing way with a known role, or `Unknown`
    pub fn declared_role(&self) -> Role {
        let mut known = self.members.iter().map(|(_, role)| *role).filter(Role::is_known);
        match known.next() {
            Some(first) if known.all(|role| role == first) => first,
            _ => Role::Unknown,
        }
    }

    /// Role assigned by geometric nesting
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether some contributing way had unresolved nodes
    #[inline]
    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        if self.twice_area > 0 {
            Orientation::CounterClockwise
        } else {
            Orientation::Clockwise
        }
    }

    /// Signed area in square degrees, positive for counter-clockwise rings
    pub fn signed_area(&self) -> f64 {
        let unit = f64::from(crate::coordinate::COORDINATE_PRECISION);
        self.twice_area as f64 / 2.0 / (unit * unit)
    }

    /// Twice the signed area in squared fixed-precision units
    #[inline]
    pub fn twice_signed_area_raw(&self) -> i128 {
        self.twice_area
    }

    /// Reverse the winding order in place
    pub fn reverse(&mut self) {
        self.coords.reverse();
        self.twice_area = -self.twice_area;
    }

    /// Wind the ring in the given direction
    pub fn orient(&mut self, orientation: Orientation) {
        if self.orientation() != orientation {
            self.reverse();
        }
    }

    pub(crate) fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    /// Convert to a `geo` line string in degrees
    pub fn to_geo(&self) -> LineString<f64> {
        self.coords.iter().map(Coordinate::to_geo).collect()
    }

    /// Polygon in fixed-precision units, used for exact containment tests
    pub(crate) fn to_raw_polygon(&self) -> Polygon<f64> {
        let exterior: LineString<f64> = self.coords.iter().map(|c| c.to_raw_geo()).collect();
        Polygon::new(exterior, Vec::new())
    }

    pub(crate) fn raw_bounding_box(&self) -> Option<Rect<f64>> {
        utils::raw_bounding_box(&self.coords)
    }
}

/// Where a point lies relative to a ring
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Containment {
    Inside,
    Outside,
    /// Every vertex and edge midpoint lies on the boundary: the rings coincide
    Coincident,
}

/// A ring prepared for repeated point-in-polygon queries
pub(crate) struct RingShape {
    polygon: Polygon<f64>,
    bbox: Option<Rect<f64>>,
}

impl RingShape {
    pub(crate) fn new(ring: &Ring) -> Self {
        Self {
            polygon: ring.to_raw_polygon(),
            bbox: ring.raw_bounding_box(),
        }
    }

    fn position(&self, point: geo::Coord<f64>) -> CoordPos {
        match &self.bbox {
            Some(bbox) if utils::rect_contains(bbox, point) => {
                self.polygon.coordinate_position(&point)
            }
            _ => CoordPos::Outside,
        }
    }

    /// Decide whether `ring` lies inside this shape
    ///
    /// The representative point is the first vertex of `ring` that is not on this
    /// shape's boundary, falling back to edge midpoints when every vertex touches it.
    pub(crate) fn containment_of(&self, ring: &Ring) -> Containment {
        let coords = ring.coords();
        let vertices = coords[..coords.len() - 1].iter().map(|c| c.to_raw_geo());
        let midpoints = coords
            .windows(2)
            .map(|pair| utils::raw_midpoint(pair[0], pair[1]));

        for point in vertices.chain(midpoints) {
            match self.position(point) {
                CoordPos::Inside => return Containment::Inside,
                CoordPos::Outside => return Containment::Outside,
                CoordPos::OnBoundary => {}
            }
        }
        Containment::Coincident
    }
}
