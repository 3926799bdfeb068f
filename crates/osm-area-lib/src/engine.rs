//! AreaAssembler - Top-level pipeline from area candidates to encoded geometry
//!
//! This module runs collection, ring linking and classification for one area candidate,
//! and assembles independent candidates in parallel.

use crate::area::{Area, Assembly, Diagnostics};
use crate::assembler::{JunctionPolicy, LinkedRings, link_rings};
use crate::classifier::classify;
use crate::collector::{CollectedSegments, collect_segments};
use crate::source::{AreaSource, LocationIndex, WayStore};
use crate::wkb::{self, WkbVariant};
use crate::{AreaError, AreaId, Result};

use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for area assembly
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// How to pick the next segment where several meet at one coordinate
    pub junction_policy: JunctionPolicy,
    /// Keep ways with unresolved nodes, built from their resolved nodes.
    /// A way missing an endpoint cannot link there and ends up in an unclosed chain.
    /// Default: true
    pub keep_partial_ways: bool,
    /// Geometry type written by [`AreaAssembler::encode`]
    pub wkb_variant: WkbVariant,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            junction_policy: JunctionPolicy::default(),
            keep_partial_ways: true,
            wkb_variant: WkbVariant::default(),
        }
    }
}

/// Result of assembling one candidate in a batch
#[derive(Debug)]
pub struct AreaOutcome {
    pub id: AreaId,
    pub result: Result<Assembly>,
}

/// Information about a batch of assemblies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BatchInfo {
    /// Number of candidates processed
    pub area_count: usize,
    /// Candidates that produced an area
    pub assembled_count: usize,
    /// Assembled areas with unresolved references or unclosed chains
    pub incomplete_count: usize,
    /// Candidates that failed as a whole
    pub failed_count: usize,
    /// Total rings over all assembled areas
    pub ring_count: usize,
}

/// Outcomes of a batch, in input order
#[derive(Debug, Default)]
pub struct BatchReport {
    outcomes: Vec<AreaOutcome>,
}

impl BatchReport {
    #[inline]
    pub fn outcomes(&self) -> &[AreaOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<AreaOutcome> {
        self.outcomes
    }

    /// Successfully assembled areas
    pub fn assemblies(&self) -> impl Iterator<Item = &Assembly> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    /// Candidates that failed, with their errors
    pub fn failures(&self) -> impl Iterator<Item = (AreaId, &AreaError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|err| (o.id, err)))
    }

    pub fn info(&self) -> BatchInfo {
        let mut info = BatchInfo {
            area_count: self.outcomes.len(),
            ..BatchInfo::default()
        };
        for outcome in &self.outcomes {
            match &outcome.result {
                Ok(assembly) => {
                    info.assembled_count += 1;
                    if !assembly.is_complete() {
                        info.incomplete_count += 1;
                    }
                    let (outer, inner) = assembly.area().num_rings();
                    info.ring_count += outer + inner;
                }
                Err(_) => info.failed_count += 1,
            }
        }
        info
    }
}

/// Assembles areas from closed ways and multipolygon relations
///
/// Every call owns its segments and rings, so one assembler can be shared freely across
/// threads. The only shared state is read access to the way store and location index.
#[derive(Debug, Clone, Default)]
pub struct AreaAssembler {
    config: Config,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl AreaAssembler {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Get a reference to the configuration
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Assemble one area candidate
    ///
    /// Member ways are resolved through `ways` and node locations through `locations`.
    /// Fails only if no ring closed or if ring nesting is ambiguous; everything else is
    /// reported in the returned [`Assembly`]'s diagnostics.
    pub fn assemble<W, L>(&self, source: &AreaSource, ways: &W, locations: &L) -> Result<Assembly>
    where
        W: WayStore + ?Sized,
        L: LocationIndex + ?Sized,
    {
        let collected = collect_segments(source, ways, locations, self.config.keep_partial_ways);
        self.assemble_segments(source.area_id(), collected)
    }

    /// Assemble an area from segments that were already collected
    pub fn assemble_segments(&self, id: AreaId, collected: CollectedSegments) -> Result<Assembly> {
        let CollectedSegments { segments, issues } = collected;
        let LinkedRings {
            rings,
            unclosed,
            degenerate,
        } = link_rings(&segments, self.config.junction_policy);

        let mut diagnostics = Diagnostics {
            segment_issues: issues,
            unclosed,
            degenerate,
            role_mismatches: Vec::new(),
        };

        if rings.is_empty() {
            tracing::warn!(
                area = %id,
                segments = segments.len(),
                unclosed = diagnostics.unclosed.len(),
                "no closed rings"
            );
            return Err(AreaError::NoClosedRings {
                area: id,
                diagnostics: Box::new(diagnostics),
            });
        }

        let ring_count = rings.len();
        let classified = classify(rings).map_err(|conflict| {
            tracing::warn!(
                area = %id,
                first = ?conflict.first,
                second = ?conflict.second,
                "ambiguous ring nesting"
            );
            AreaError::AmbiguousNesting {
                area: id,
                first: conflict.first,
                second: conflict.second,
            }
        })?;
        diagnostics.role_mismatches = classified.role_mismatches;

        let assembly = Assembly::new(Area::new(id, classified.polygons), diagnostics);
        tracing::debug!(
            area = %id,
            rings = ring_count,
            polygons = assembly.area().polygons().len(),
            complete = assembly.is_complete(),
            "assembled area"
        );
        Ok(assembly)
    }

    /// Encode an assembled area with the configured WKB variant
    pub fn encode(&self, area: &Area) -> Result<Vec<u8>> {
        wkb::encode(area, self.config.wkb_variant)
    }

    /// Assemble one candidate and encode it
    pub fn assemble_wkb<W, L>(
        &self,
        source: &AreaSource,
        ways: &W,
        locations: &L,
    ) -> Result<(Vec<u8>, Diagnostics)>
    where
        W: WayStore + ?Sized,
        L: LocationIndex + ?Sized,
    {
        let (area, diagnostics) = self.assemble(source, ways, locations)?.into_parts();
        Ok((self.encode(&area)?, diagnostics))
    }

    /// Assemble many candidates in parallel
    ///
    /// Candidates are independent; a failure in one does not affect the others. Outcomes
    /// are returned in input order.
    pub fn assemble_parallel<W, L>(
        &self,
        sources: &[AreaSource],
        ways: &W,
        locations: &L,
    ) -> BatchReport
    where
        W: WayStore + Sync + ?Sized,
        L: LocationIndex + Sync + ?Sized,
    {
        let outcomes: Vec<AreaOutcome> = sources
            .par_iter()
            .map(|source| AreaOutcome {
                id: source.area_id(),
                result: self.assemble(source, ways, locations),
            })
            .collect();

        let report = BatchReport { outcomes };
        let info = report.info();
        tracing::debug!(
            areas = info.area_count,
            assembled = info.assembled_count,
            incomplete = info.incomplete_count,
            failed = info.failed_count,
            "assembled batch"
        );
        report
    }
}
