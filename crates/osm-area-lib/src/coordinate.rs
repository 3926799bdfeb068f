//! Fixed-precision coordinates, member roles and object identifiers
//!
//! Coordinates are stored as integers in units of 1e-7 degree. Two coordinates are the
//! same point only if their integer values are equal, which is what ring closure and
//! endpoint matching rely on.

use crate::{AreaError, Result};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of fixed-precision units per degree
pub const COORDINATE_PRECISION: i32 = 10_000_000;

/// Largest valid longitude in fixed-precision units
pub const MAX_X: i32 = 180 * COORDINATE_PRECISION;

/// Largest valid latitude in fixed-precision units
pub const MAX_Y: i32 = 90 * COORDINATE_PRECISION;

/// Identifier of an OSM node
pub type NodeId = u64;

/// Identifier of an OSM way
pub type WayId = u64;

/// Identifier of an OSM relation
pub type RelationId = u64;

/// A (longitude, latitude) pair at 1e-7 degree precision
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coordinate {
    x: i32,
    y: i32,
}

impl Coordinate {
    /// Create a coordinate from fixed-precision units, without range checks
    #[inline]
    pub const fn from_raw(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Create a coordinate from degrees
    ///
    /// Values are rounded to the nearest 1e-7 degree. Fails if either value is not finite
    /// or lies outside the geodetic range.
    pub fn from_degrees(lon: f64, lat: f64) -> Result<Self> {
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(AreaError::InvalidCoordinate(format!(
                "longitude {lon} out of range"
            )));
        }
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(AreaError::InvalidCoordinate(format!(
                "latitude {lat} out of range"
            )));
        }
        Ok(Self {
            x: Self::to_fixed(lon),
            y: Self::to_fixed(lat),
        })
    }

    #[inline]
    fn to_fixed(degrees: f64) -> i32 {
        (degrees * f64::from(COORDINATE_PRECISION)).round() as i32
    }

    /// Longitude in fixed-precision units
    #[inline]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Latitude in fixed-precision units
    #[inline]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Longitude in degrees
    #[inline]
    pub fn lon(&self) -> f64 {
        f64::from(self.x) / f64::from(COORDINATE_PRECISION)
    }

    /// Latitude in degrees
    #[inline]
    pub fn lat(&self) -> f64 {
        f64::from(self.y) / f64::from(COORDINATE_PRECISION)
    }

    /// Check that the coordinate lies within the geodetic range
    #[inline]
    pub fn is_valid(&self) -> bool {
        (-MAX_X..=MAX_X).contains(&self.x) && (-MAX_Y..=MAX_Y).contains(&self.y)
    }

    /// Convert to a `geo` coordinate in degrees
    #[inline]
    pub fn to_geo(&self) -> geo::Coord<f64> {
        geo::Coord {
            x: self.lon(),
            y: self.lat(),
        }
    }

    /// Convert to a `geo` coordinate in fixed-precision units
    ///
    /// Every `i32` is exactly representable as `f64`, so geometric predicates evaluated on
    /// these values see the same points the integer comparisons do.
    #[inline]
    pub(crate) fn to_raw_geo(self) -> geo::Coord<f64> {
        geo::Coord {
            x: f64::from(self.x),
            y: f64::from(self.y),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.7} {:.7})", self.lon(), self.lat())
    }
}

/// Declared role of a relation member
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Role {
    Outer,
    Inner,
    #[default]
    Unknown,
}

impl Role {
    /// Parse a member role string; anything but `outer` or `inner` is `Unknown`
    pub fn parse(role: &str) -> Self {
        match role {
            "outer" => Role::Outer,
            "inner" => Role::Inner,
            _ => Role::Unknown,
        }
    }

    /// Whether the role was declared explicitly
    #[inline]
    pub fn is_known(&self) -> bool {
        !matches!(self, Role::Unknown)
    }
}

impl From<&str> for Role {
    fn from(role: &str) -> Self {
        Role::parse(role)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Outer => "outer",
            Role::Inner => "inner",
            Role::Unknown => "",
        })
    }
}

/// Identifier of an assembled area
///
/// Areas built from a closed way get `way_id * 2`, areas built from a relation get
/// `relation_id * 2 + 1`, so both kinds share one id space without collisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AreaId(u64);

impl AreaId {
    #[inline]
    pub const fn from_way(id: WayId) -> Self {
        Self(id.wrapping_mul(2))
    }

    #[inline]
    pub const fn from_relation(id: RelationId) -> Self {
        Self(id.wrapping_mul(2).wrapping_add(1))
    }

    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Whether the area was built from a closed way
    #[inline]
    pub const fn is_from_way(&self) -> bool {
        self.0 % 2 == 0
    }

    /// Id of the way or relation the area was built from
    #[inline]
    pub const fn original_id(&self) -> u64 {
        self.0 / 2
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_from_way() { 'w' } else { 'r' };
        write!(f, "a{}({}{})", self.0, kind, self.original_id())
    }
}
