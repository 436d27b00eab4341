use tracing::{debug, info_span, trace, warn};

use crate::engine::{shared_edge_length, GeometryEngine};
use crate::error::{ResolveError, Result};
use crate::feature::{FeatureAccess, FeatureId, LayerId};
use crate::geometry::Geometry;
use crate::transform::{TransformDirection, TransformProvider};

use super::config::{FixMethod, GapCheckConfig};
use super::record::{GapRecord, MergeInstruction};

/// Finds the neighbour part sharing the longest edge with a gap and
/// computes its merged geometry.
///
/// Features are re-read from the pool, so a gap whose neighbours were
/// edited after detection is resolved against their current state. The
/// pool is never written.
pub struct ResolveGap<'a> {
    gap: &'a GapRecord,
    reduced_tolerance: f64,
}

struct Candidate {
    layer: LayerId,
    feature: FeatureId,
    part: usize,
    geometry: Geometry,
}

impl<'a> ResolveGap<'a> {
    #[must_use]
    pub fn new(gap: &'a GapRecord, reduced_tolerance: f64) -> Self {
        Self {
            gap,
            reduced_tolerance,
        }
    }

    /// Executes the resolution.
    ///
    /// Ties on the shared length keep the first candidate in layer, feature
    /// and part order.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::NoMergeFound` if no current neighbour part
    /// shares any boundary with the gap, `ResolveError::DegenerateMergeResult`
    /// if the union is empty or not a single polygon, and engine or
    /// transform errors as they occur.
    pub fn execute(
        &self,
        pool: &dyn FeatureAccess,
        transforms: &dyn TransformProvider,
    ) -> Result<MergeInstruction> {
        let _span = info_span!("resolve_gap", area = self.gap.area()).entered();

        let gap_part = self
            .gap
            .geometry()
            .part(0)
            .ok_or(ResolveError::NoMergeFound)?;

        let mut best: Option<Candidate> = None;
        let mut max_len = 0.0;
        for (layer, ids) in self.gap.neighbors() {
            let transform = transforms.layer_transform(layer)?;
            let layer_gap = gap_part.transform(transform, TransformDirection::Reverse)?;
            for &id in ids {
                let Some(feature) = pool.get_feature(layer, id) else {
                    debug!(%layer, feature = ?id, "neighbour no longer exists");
                    continue;
                };
                for (part, geometry) in feature.geometry.parts().enumerate() {
                    let len = shared_edge_length(&layer_gap, &geometry, self.reduced_tolerance);
                    trace!(%layer, feature = ?id, part, len, "shared edge");
                    if len > max_len {
                        max_len = len;
                        best = Some(Candidate {
                            layer: layer.clone(),
                            feature: id,
                            part,
                            geometry,
                        });
                    }
                }
            }
        }

        let best = best.ok_or(ResolveError::NoMergeFound)?;
        debug!(layer = %best.layer, feature = ?best.feature, part = best.part, max_len, "merge target");

        let transform = transforms.layer_transform(&best.layer)?;
        let layer_gap = gap_part.transform(transform, TransformDirection::Reverse)?;
        let engine = GeometryEngine::new(self.reduced_tolerance);
        let merged = engine.combine(&[layer_gap, best.geometry])?;
        if merged.is_empty() {
            return Err(ResolveError::DegenerateMergeResult("union is empty".to_owned()).into());
        }
        if !merged.is_single_type() {
            return Err(ResolveError::DegenerateMergeResult(format!(
                "union has {} parts",
                merged.part_count()
            ))
            .into());
        }

        Ok(MergeInstruction {
            layer: best.layer,
            feature: best.feature,
            part: best.part,
            geometry: merged,
        })
    }
}

/// Applies a resolution method to a gap and records the outcome on it.
pub struct GapFixer<'a> {
    config: &'a GapCheckConfig,
}

impl<'a> GapFixer<'a> {
    #[must_use]
    pub fn new(config: &'a GapCheckConfig) -> Self {
        Self { config }
    }

    /// Fixes `gap` with `method`.
    ///
    /// `NoChange` only marks the gap as fixed. `MergeLongestEdge` returns the
    /// repair for the caller to commit through a
    /// [`FeatureSink`](crate::feature::FeatureSink).
    ///
    /// # Errors
    ///
    /// Returns the resolution error after marking the gap as failed.
    pub fn fix(
        &self,
        gap: &mut GapRecord,
        method: FixMethod,
        pool: &dyn FeatureAccess,
        transforms: &dyn TransformProvider,
    ) -> Result<Option<MergeInstruction>> {
        match method {
            FixMethod::NoChange => {
                gap.set_fixed(FixMethod::NoChange);
                Ok(None)
            }
            FixMethod::MergeLongestEdge => {
                let resolved =
                    ResolveGap::new(gap, self.config.reduced_tolerance).execute(pool, transforms);
                match resolved {
                    Ok(instruction) => {
                        gap.set_fixed(FixMethod::MergeLongestEdge);
                        Ok(Some(instruction))
                    }
                    Err(err) => {
                        warn!(error = %err, "gap merge failed");
                        gap.set_fix_failed(format!("Failed to merge with neighbor: {err}"));
                        Err(err)
                    }
                }
            }
        }
    }

    /// Fixes `gap` with the method at `index` in [`FixMethod::ALL`].
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::UnsupportedMethod` for an unknown index, after
    /// marking the gap as failed, and otherwise behaves like
    /// [`fix`](Self::fix).
    pub fn fix_by_index(
        &self,
        gap: &mut GapRecord,
        index: u32,
        pool: &dyn FeatureAccess,
        transforms: &dyn TransformProvider,
    ) -> Result<Option<MergeInstruction>> {
        match FixMethod::try_from(index) {
            Ok(method) => self.fix(gap, method, pool, transforms),
            Err(err) => {
                gap.set_fix_failed("Unknown method");
                Err(err.into())
            }
        }
    }
}
