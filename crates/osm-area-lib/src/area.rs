//! Assembled areas and the diagnostics that accompany them

use crate::assembler::{DegenerateRing, UnclosedRing};
use crate::classifier::RoleMismatch;
use crate::collector::SegmentIssue;
use crate::ring::Ring;
use crate::wkb::{self, WkbVariant};
use crate::{AreaId, Result};
use geo::{LineString, MultiPolygon};
use wkt::ToWkt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One outer ring with the holes it contains
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polygon {
    outer: Ring,
    inners: Vec<Ring>,
}

impl Polygon {
    pub fn new(outer: Ring, inners: Vec<Ring>) -> Self {
        Self { outer, inners }
    }

    #[inline]
    pub fn outer(&self) -> &Ring {
        &self.outer
    }

    #[inline]
    pub fn inners(&self) -> &[Ring] {
        &self.inners
    }

    /// Outer ring first, then the inner rings
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.outer).chain(self.inners.iter())
    }

    /// Convert to a `geo` polygon in degrees
    pub fn to_geo(&self) -> geo::Polygon<f64> {
        let interiors: Vec<LineString<f64>> = self.inners.iter().map(Ring::to_geo).collect();
        geo::Polygon::new(self.outer.to_geo(), interiors)
    }
}

/// A closed region: outer rings, each with the inner rings it contains
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Area {
    id: AreaId,
    polygons: Vec<Polygon>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Area {
    pub fn new(id: AreaId, polygons: Vec<Polygon>) -> Self {
        Self { id, polygons }
    }

    #[inline]
    pub fn id(&self) -> AreaId {
        self.id
    }

    #[inline]
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn outer_rings(&self) -> impl Iterator<Item = &Ring> {
        self.polygons.iter().map(Polygon::outer)
    }

    /// Number of (outer, inner) rings
    pub fn num_rings(&self) -> (usize, usize) {
        let inner = self.polygons.iter().map(|p| p.inners.len()).sum();
        (self.polygons.len(), inner)
    }

    /// Whether the area has more than one outer ring
    #[inline]
    pub fn is_multipolygon(&self) -> bool {
        self.polygons.len() > 1
    }

    /// Convert to a `geo` multipolygon in degrees
    pub fn to_geo(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(self.polygons.iter().map(Polygon::to_geo).collect())
    }

    /// Well-known text, always as a `MULTIPOLYGON`
    pub fn to_wkt(&self) -> String {
        self.to_geo().wkt_string()
    }

    /// GeoJSON geometry, always as a `MultiPolygon`
    pub fn to_geojson(&self) -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::from(&self.to_geo()))
    }

    /// Well-known binary, see [`wkb::encode`]
    pub fn to_wkb(&self, variant: WkbVariant) -> Result<Vec<u8>> {
        wkb::encode(self, variant)
    }
}

/// Everything that went wrong, short of failing the whole area
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostics {
    /// Problems with individual member ways
    pub segment_issues: Vec<SegmentIssue>,
    /// Chains that never closed
    pub unclosed: Vec<UnclosedRing>,
    /// Closed chains that bound no region
    pub degenerate: Vec<DegenerateRing>,
    /// Rings whose declared member roles disagree with their nesting
    pub role_mismatches: Vec<RoleMismatch>,
}

/// Counts of an assembly's diagnostics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiagnosticSummary {
    /// Rings in the assembled area
    pub ring_count: usize,
    pub unclosed_ring_count: usize,
    /// Segments that ended up in unclosed chains
    pub dangling_segment_count: usize,
    pub degenerate_ring_count: usize,
    pub role_mismatch_count: usize,
    /// Member ways or nodes that could not be resolved
    pub unresolved_reference_count: usize,
}

impl Diagnostics {
    /// Whether nothing at all was reported
    pub fn is_empty(&self) -> bool {
        self.segment_issues.is_empty()
            && self.unclosed.is_empty()
            && self.degenerate.is_empty()
            && self.role_mismatches.is_empty()
    }

    /// Whether every reference resolved and every chain closed
    pub fn is_complete(&self) -> bool {
        self.unclosed.is_empty()
            && !self
                .segment_issues
                .iter()
                .any(SegmentIssue::is_unresolvable)
    }

    pub fn summary(&self, ring_count: usize) -> DiagnosticSummary {
        DiagnosticSummary {
            ring_count,
            unclosed_ring_count: self.unclosed.len(),
            dangling_segment_count: self.unclosed.iter().map(|u| u.ways.len()).sum(),
            degenerate_ring_count: self.degenerate.len(),
            role_mismatch_count: self.role_mismatches.len(),
            unresolved_reference_count: self
                .segment_issues
                .iter()
                .filter(|issue| issue.is_unresolvable())
                .count(),
        }
    }
}

/// Result of a successful assembly: the area plus its diagnostics
///
/// Success does not imply completeness. Rings that closed are returned even when other
/// chains of the same relation did not; check [`Assembly::is_complete`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assembly {
    area: Area,
    diagnostics: Diagnostics,
}

impl Assembly {
    pub fn new(area: Area, diagnostics: Diagnostics) -> Self {
        Self { area, diagnostics }
    }

    #[inline]
    pub fn area(&self) -> &Area {
        &self.area
    }

    #[inline]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_parts(self) -> (Area, Diagnostics) {
        (self.area, self.diagnostics)
    }

    /// Whether the area was assembled from all of its data with every chain closed
    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_complete()
    }

    pub fn summary(&self) -> DiagnosticSummary {
        let (outer, inner) = self.area.num_rings();
        self.diagnostics.summary(outer + inner)
    }
}
