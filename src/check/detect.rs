use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info_span, trace, warn};

use crate::engine::{shared_edge_length, BufferParams, EndCapStyle, GeometryEngine, JoinStyle};
use crate::error::{EngineError, Result};
use crate::feature::{
    collect_layer_features, FeatureAccess, FeatureId, LayerFeature, LayerId, NeighborLookup,
    PoolNeighborLookup,
};
use crate::transform::TransformProvider;

use super::config::GapCheckConfig;
use super::record::GapRecord;

/// Distance by which the coverage envelope is grown before subtraction.
pub const ENVELOPE_BUFFER_DISTANCE: f64 = 2.0;

/// Mitre limit used when buffering the envelope.
pub const ENVELOPE_MITER_LIMIT: f64 = 4.0;

/// Numeric inputs of a detection pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapParams {
    /// Gaps larger than this are treated as intentional holes.
    pub threshold_area: f64,
    /// Engine precision for combine, buffer and difference.
    pub tolerance: f64,
    /// Minimum gap area and adjacency precision.
    pub reduced_tolerance: f64,
}

/// Outcome of a detection pass.
///
/// A failing pass yields no gaps and one message; it never aborts the
/// caller.
#[derive(Debug, Clone, Default)]
pub struct GapDetection {
    pub gaps: Vec<GapRecord>,
    pub messages: Vec<String>,
}

/// Finds the gaps enclosed by `features`.
///
/// All features are unioned and subtracted from their envelope grown by
/// [`ENVELOPE_BUFFER_DISTANCE`]. Of the remaining pieces, the one spanning
/// the whole grown envelope is the outside of the coverage and is skipped.
/// Every other piece with an area in `[reduced_tolerance, threshold_area]`
/// that shares boundary with at least one feature from `lookup` becomes a
/// [`GapRecord`].
#[must_use]
pub fn detect_gaps(
    features: &[LayerFeature],
    lookup: &dyn NeighborLookup,
    params: &GapParams,
) -> GapDetection {
    let _span = info_span!("detect_gaps", features = features.len()).entered();

    match find_gaps(features, lookup, params) {
        Ok(gaps) => {
            debug!(gaps = gaps.len(), "gap detection finished");
            GapDetection {
                gaps,
                messages: Vec::new(),
            }
        }
        Err(err) => {
            warn!(error = %err, "gap detection aborted");
            GapDetection {
                gaps: Vec::new(),
                messages: vec![format!("Gap check: {err}")],
            }
        }
    }
}

fn find_gaps(
    features: &[LayerFeature],
    lookup: &dyn NeighborLookup,
    params: &GapParams,
) -> Result<Vec<GapRecord>> {
    if features.is_empty() {
        return Ok(Vec::new());
    }

    let engine = GeometryEngine::new(params.tolerance);
    let geometries: Vec<_> = features.iter().map(|f| f.geometry.clone()).collect();
    let union = engine.combine(&geometries)?;
    debug!(parts = union.part_count(), "features combined");

    let envelope = engine.envelope(&union)?;
    let buffer_params = BufferParams::new(ENVELOPE_BUFFER_DISTANCE)
        .with_end_cap(EndCapStyle::Square)
        .with_join(JoinStyle::Mitre)
        .with_miter_limit(ENVELOPE_MITER_LIMIT);
    let grown = engine.buffer(&envelope, &buffer_params)?;
    let grown_box = grown
        .bounding_box()
        .ok_or_else(|| EngineError::Buffer("buffered envelope is empty".to_owned()))?;

    let difference = engine.difference(&grown, &union)?;
    debug!(parts = difference.part_count(), "difference computed");

    let mut gaps = Vec::new();
    for part in difference.parts() {
        let Some(part_box) = part.bounding_box() else {
            continue;
        };
        if part_box.approx_eq(&grown_box, params.tolerance) {
            continue;
        }

        let area = part.area();
        if area > params.threshold_area || area < params.reduced_tolerance {
            debug!(area, "gap area outside reported range");
            continue;
        }

        let mut bounding_box = part_box;
        let mut neighbors: BTreeMap<LayerId, BTreeSet<FeatureId>> = BTreeMap::new();
        let search_box = part_box.buffered(params.reduced_tolerance);
        for candidate in lookup.features_in_box(&search_box)? {
            let shared = shared_edge_length(&part, &candidate.geometry, params.reduced_tolerance);
            trace!(layer = %candidate.layer, feature = ?candidate.feature, shared, "neighbour candidate");
            if shared > 0.0 {
                if let Some(b) = candidate.geometry.bounding_box() {
                    bounding_box.combine_extent_with(&b);
                }
                neighbors
                    .entry(candidate.layer)
                    .or_default()
                    .insert(candidate.feature);
            }
        }

        if neighbors.is_empty() {
            debug!(area, "gap has no neighbours");
            continue;
        }
        gaps.push(GapRecord::new(part, area, bounding_box, neighbors));
    }
    Ok(gaps)
}

/// Runs gap detection over the features of a pool.
pub struct DetectGaps<'a> {
    config: &'a GapCheckConfig,
    feature_ids: Option<BTreeMap<LayerId, BTreeSet<FeatureId>>>,
}

impl<'a> DetectGaps<'a> {
    /// Creates a detection over every feature of every layer.
    #[must_use]
    pub fn new(config: &'a GapCheckConfig) -> Self {
        Self {
            config,
            feature_ids: None,
        }
    }

    /// Restricts the check to the given features. Neighbours are only
    /// searched in the listed layers.
    #[must_use]
    pub fn with_feature_ids(mut self, ids: BTreeMap<LayerId, BTreeSet<FeatureId>>) -> Self {
        self.feature_ids = Some(ids);
        self
    }

    /// Executes the detection.
    ///
    /// `progress` is bumped once per call, before any work.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid configuration, an unknown layer or a
    /// layer without a transform. Failures of the pass itself are reported
    /// in [`GapDetection::messages`].
    pub fn execute(
        &self,
        pool: &dyn FeatureAccess,
        transforms: &dyn TransformProvider,
        progress: Option<&AtomicUsize>,
    ) -> Result<GapDetection> {
        if let Some(counter) = progress {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        self.config.validate()?;

        let ids = match &self.feature_ids {
            Some(ids) => ids.clone(),
            None => {
                let mut ids = BTreeMap::new();
                for layer in pool.layer_ids() {
                    let features = pool.feature_ids(&layer)?;
                    ids.insert(layer, features);
                }
                ids
            }
        };

        let types = &self.config.compatible_geometry_types;
        let features = collect_layer_features(pool, transforms, &ids, types)?;
        let lookup = PoolNeighborLookup::new(pool, transforms, ids.keys().cloned().collect(), types);
        Ok(detect_gaps(&features, &lookup, &self.config.gap_params()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::check::test_util::{grid_at, grid_without, square};
    use crate::feature::MemoryFeaturePool;
    use crate::geometry::{BoundingBox, Geometry, GeometryType};
    use crate::transform::{AffineTransform, LayerTransforms};
    use approx::assert_relative_eq;
    use geo::line_string;

    struct NoNeighbors;

    impl NeighborLookup for NoNeighbors {
        fn features_in_box(&self, _bbox: &BoundingBox) -> Result<Vec<LayerFeature>> {
            Ok(Vec::new())
        }
    }

    fn layer() -> LayerId {
        LayerId::new("parcels")
    }

    #[test]
    fn enclosed_hole_is_one_gap() {
        let mut pool = MemoryFeaturePool::new();
        let cells = grid_without(&mut pool, &layer(), &[(1, 1)]);
        let config = GapCheckConfig::new(10.0);

        let result = DetectGaps::new(&config)
            .execute(&pool, &LayerTransforms::identity(), None)
            .unwrap();

        assert!(result.messages.is_empty(), "{:?}", result.messages);
        assert_eq!(result.gaps.len(), 1);
        let gap = &result.gaps[0];
        assert_relative_eq!(gap.area(), 1.0, epsilon = 1e-9);

        // Edge neighbours only; corner cells touch the gap in a single point.
        let expected: BTreeSet<FeatureId> = cells
            .iter()
            .filter(|((col, row), _)| (col + row) % 2 == 1)
            .map(|(_, id)| *id)
            .collect();
        assert_eq!(gap.neighbors().len(), 1);
        assert_eq!(gap.neighbors()[&layer()], expected);
        assert_eq!(gap.bounding_box(), BoundingBox::new(0.0, 0.0, 3.0, 3.0));
        assert!(gap.is_open());
    }

    #[test]
    fn notch_on_outer_boundary_is_not_a_gap() {
        let mut pool = MemoryFeaturePool::new();
        grid_without(&mut pool, &layer(), &[(2, 2)]);
        let config = GapCheckConfig::new(10.0);

        let result = DetectGaps::new(&config)
            .execute(&pool, &LayerTransforms::identity(), None)
            .unwrap();
        assert!(result.gaps.is_empty());
        assert!(result.messages.is_empty());
    }

    #[test]
    fn single_polygon_has_no_gaps() {
        let mut pool = MemoryFeaturePool::new();
        pool.add_feature(&layer(), square(0.0, 0.0, 3.0));
        let config = GapCheckConfig::new(10.0);

        let result = DetectGaps::new(&config)
            .execute(&pool, &LayerTransforms::identity(), None)
            .unwrap();
        assert!(result.gaps.is_empty());
    }

    #[test]
    fn empty_input_is_silent() {
        let params = GapCheckConfig::new(10.0).gap_params();
        let result = detect_gaps(&[], &NoNeighbors, &params);
        assert!(result.gaps.is_empty());
        assert!(result.messages.is_empty());
    }

    #[test]
    fn gap_above_threshold_is_ignored() {
        let mut pool = MemoryFeaturePool::new();
        grid_without(&mut pool, &layer(), &[(1, 1)]);
        let config = GapCheckConfig::new(0.5);

        let result = DetectGaps::new(&config)
            .execute(&pool, &LayerTransforms::identity(), None)
            .unwrap();
        assert!(result.gaps.is_empty());
    }

    #[test]
    fn sliver_below_reduced_tolerance_is_ignored() {
        let mut pool = MemoryFeaturePool::new();
        grid_without(&mut pool, &layer(), &[(1, 1)]);
        let center: Geometry = BoundingBox::new(1.0, 1.0, 1.999_99, 2.0).to_polygon().into();
        pool.add_feature(&layer(), center);

        let coarse = GapCheckConfig::new(10.0);
        let result = DetectGaps::new(&coarse)
            .execute(&pool, &LayerTransforms::identity(), None)
            .unwrap();
        assert!(result.gaps.is_empty());

        let fine = GapCheckConfig::new(10.0).with_precision(12);
        let result = DetectGaps::new(&fine)
            .execute(&pool, &LayerTransforms::identity(), None)
            .unwrap();
        assert_eq!(result.gaps.len(), 1);
        assert_relative_eq!(result.gaps[0].area(), 1e-5, max_relative = 1e-6);
    }

    #[test]
    fn gap_without_neighbours_is_dropped() {
        let mut pool = MemoryFeaturePool::new();
        grid_without(&mut pool, &layer(), &[(1, 1)]);
        let features = collect_layer_features(
            &pool,
            &LayerTransforms::identity(),
            &BTreeMap::from([(layer(), pool.feature_ids(&layer()).unwrap())]),
            &[GeometryType::Polygon],
        )
        .unwrap();

        let params = GapCheckConfig::new(10.0).gap_params();
        let result = detect_gaps(&features, &NoNeighbors, &params);
        assert!(result.gaps.is_empty());
        assert!(result.messages.is_empty());
    }

    #[test]
    fn engine_failure_becomes_message() {
        let mut pool = MemoryFeaturePool::new();
        pool.add_feature(
            &layer(),
            Geometry::from(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)]),
        );
        let config = GapCheckConfig::new(10.0)
            .with_compatible_geometry_types(vec![GeometryType::Line, GeometryType::Polygon]);

        let result = DetectGaps::new(&config)
            .execute(&pool, &LayerTransforms::identity(), None)
            .unwrap();
        assert!(result.gaps.is_empty());
        assert_eq!(result.messages.len(), 1);
        assert!(result.messages[0].starts_with("Gap check: "), "{}", result.messages[0]);
    }

    #[test]
    fn progress_is_counted_once_per_call() {
        let pool = MemoryFeaturePool::new();
        let config = GapCheckConfig::new(10.0);
        let progress = AtomicUsize::new(0);
        let detect = DetectGaps::new(&config);

        detect
            .execute(&pool, &LayerTransforms::identity(), Some(&progress))
            .unwrap();
        detect
            .execute(&pool, &LayerTransforms::identity(), Some(&progress))
            .unwrap();
        assert_eq!(progress.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let pool = MemoryFeaturePool::new();
        let config = GapCheckConfig::new(10.0).with_tolerance(-1.0);
        let progress = AtomicUsize::new(0);
        assert!(DetectGaps::new(&config)
            .execute(&pool, &LayerTransforms::identity(), Some(&progress))
            .is_err());
        assert_eq!(progress.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn explicit_ids_limit_participants() {
        let mut pool = MemoryFeaturePool::new();
        let cells = grid_without(&mut pool, &layer(), &[(1, 1)]);
        let other = LayerId::new("other");
        pool.add_feature(&other, square(10.0, 10.0, 1.0));

        // Without the top-middle cell the hole opens onto the outside.
        let ids: BTreeSet<FeatureId> = cells
            .iter()
            .filter(|(cell, _)| *cell != (1, 2))
            .map(|(_, id)| *id)
            .collect();
        let config = GapCheckConfig::new(10.0);
        let result = DetectGaps::new(&config)
            .with_feature_ids(BTreeMap::from([(layer(), ids)]))
            .execute(&pool, &LayerTransforms::identity(), None)
            .unwrap();
        assert!(result.gaps.is_empty());
    }

    #[test]
    fn gaps_are_reported_in_map_coordinates() {
        let mut pool = MemoryFeaturePool::new();
        grid_without(&mut pool, &layer(), &[(1, 1)]);
        let transforms =
            LayerTransforms::new().with_layer(layer(), AffineTransform::translation(10.0, 0.0));
        let config = GapCheckConfig::new(10.0);

        let result = DetectGaps::new(&config)
            .execute(&pool, &transforms, None)
            .unwrap();
        assert_eq!(result.gaps.len(), 1);
        let gap_box = result.gaps[0].geometry().bounding_box().unwrap();
        assert!(gap_box.approx_eq(&BoundingBox::new(11.0, 1.0, 12.0, 2.0), 1e-9));
        assert_eq!(result.gaps[0].neighbor_count(), 4);
    }

    fn edge_cells(cells: &[((u32, u32), FeatureId)]) -> BTreeSet<FeatureId> {
        cells
            .iter()
            .filter(|((col, row), _)| (col + row) % 2 == 1)
            .map(|(_, id)| *id)
            .collect()
    }

    #[test]
    fn off_grid_coordinates_find_all_edge_neighbours() {
        let origin = 0.123_456_789;
        let mut pool = MemoryFeaturePool::new();
        let cells = grid_at(&mut pool, &layer(), origin, &[(1, 1)]);
        let config = GapCheckConfig::new(10.0);

        let result = DetectGaps::new(&config)
            .execute(&pool, &LayerTransforms::identity(), None)
            .unwrap();
        assert_eq!(result.gaps.len(), 1, "{:?}", result.messages);
        let gap = &result.gaps[0];
        assert_relative_eq!(gap.area(), 1.0, epsilon = 1e-6);
        assert_eq!(gap.neighbor_count(), 4);
        assert_eq!(gap.neighbors()[&layer()], edge_cells(&cells));
    }

    #[test]
    fn gap_survives_large_coordinate_extent() {
        let origin = 0.123_456_789;
        for far in [1.0e5, 1.0e6, 1.0e7] {
            let mut pool = MemoryFeaturePool::new();
            let cells = grid_at(&mut pool, &layer(), origin, &[(1, 1)]);
            pool.add_feature(&layer(), square(far, far, 1.0));
            let config = GapCheckConfig::new(10.0);

            let result = DetectGaps::new(&config)
                .execute(&pool, &LayerTransforms::identity(), None)
                .unwrap();
            assert!(result.messages.is_empty(), "{far}: {:?}", result.messages);
            assert_eq!(result.gaps.len(), 1, "far = {far}");
            let gap = &result.gaps[0];
            assert_relative_eq!(gap.area(), 1.0, epsilon = 1e-6);
            assert_eq!(gap.neighbors()[&layer()], edge_cells(&cells));
            let gap_box = gap.geometry().bounding_box().unwrap();
            assert!(gap_box.approx_eq(
                &BoundingBox::new(origin + 1.0, origin + 1.0, origin + 2.0, origin + 2.0),
                1e-8
            ));
        }
    }
}
