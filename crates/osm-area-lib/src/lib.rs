//! OSM Area Library - Polygon Assembly from Ways and Multipolygon Relations
//!
//! This library turns OpenStreetMap area candidates (closed ways and multipolygon
//! relations) into classified polygon geometry and encodes it as well-known binary,
//! with WKT and GeoJSON available for inspection.
//! Node locations and way node lists are provided by the caller through the
//! [`LocationIndex`] and [`WayStore`] traits.
//!
//! # Architecture
//!
//! - **[`collect_segments`]**: Resolves member ways into coordinate [`Segment`]s
//! - **[`link_rings`]**: Links segments end-to-end into closed [`Ring`]s
//! - **[`classify`]**: Assigns outer/inner roles from geometric nesting
//! - **[`wkb`]**: Encodes an [`Area`] as WKB and decodes it back
//! - **[`AreaAssembler`]**: Runs the whole pipeline for one area or a parallel batch
//!
//! # Failure Model
//!
//! Problems local to one way or ring are collected in [`Diagnostics`] and returned with
//! the area. Only ambiguous ring nesting and the absence of any closed ring fail an
//! assembly as a whole.

mod area;
mod assembler;
mod classifier;
mod collector;
mod coordinate;
mod engine;
mod ring;
mod source;
pub mod utils;
pub mod wkb;

// Public API exports
pub use area::{Area, Assembly, DiagnosticSummary, Diagnostics, Polygon};
pub use assembler::{
    DegenerateReason, DegenerateRing, JunctionPolicy, LinkedRings, UnclosedRing, link_rings,
};
pub use classifier::{Classified, NestingConflict, OUTER_ORIENTATION, RoleMismatch, classify};
pub use collector::{CollectedSegments, Segment, SegmentIssue, collect_segments};
pub use coordinate::{AreaId, COORDINATE_PRECISION, Coordinate, NodeId, RelationId, Role, WayId};
pub use engine::{AreaAssembler, AreaOutcome, BatchInfo, BatchReport, Config};
pub use ring::{Orientation, Ring};
pub use source::{AreaSource, LocationIndex, Member, WayStore, is_area_relation, is_closed_way};
pub use wkb::WkbVariant;

/// Error types for area assembly and encoding
#[derive(Debug, thiserror::Error)]
pub enum AreaError {
    #[error("Ambiguous nesting in area {area}: rings of ways {first:?} and {second:?}")]
    AmbiguousNesting {
        area: AreaId,
        first: Vec<WayId>,
        second: Vec<WayId>,
    },

    #[error("No closed rings in area {area}")]
    NoClosedRings {
        area: AreaId,
        diagnostics: Box<Diagnostics>,
    },

    #[error("Area {area} has no outer ring")]
    EmptyArea { area: AreaId },

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("WKB error: {0}")]
    Wkb(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AreaError {
    /// Id of the area the error belongs to, if any
    pub fn area(&self) -> Option<AreaId> {
        match self {
            AreaError::AmbiguousNesting { area, .. }
            | AreaError::NoClosedRings { area, .. }
            | AreaError::EmptyArea { area } => Some(*area),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AreaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that all public types are accessible
        let _: fn(Config) -> AreaAssembler = AreaAssembler::new;
        let _: fn() -> Config = Config::default;
        let _: fn(&Area, WkbVariant) -> Result<Vec<u8>> = wkb::encode;
    }

    #[test]
    fn test_error_area() {
        let err = AreaError::EmptyArea {
            area: AreaId::from_way(3),
        };
        assert_eq!(err.area(), Some(AreaId::from_way(3)));
        assert_eq!(err.to_string(), "Area a6(w3) has no outer ring");
        assert_eq!(AreaError::Wkb("x".into()).area(), None);
    }
}
