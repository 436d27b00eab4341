use std::collections::{BTreeMap, BTreeSet};

use crate::error::ResolveError;
use crate::feature::{FeatureId, LayerId};
use crate::geometry::{BoundingBox, Geometry};

use super::config::FixMethod;

/// Resolution state of a gap.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FixStatus {
    #[default]
    Open,
    Fixed(FixMethod),
    FixFailed(String),
}

/// A detected gap between neighbouring features.
///
/// Only built by detection, so `area` always lies within the configured
/// bounds and `neighbors` is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct GapRecord {
    geometry: Geometry,
    area: f64,
    bounding_box: BoundingBox,
    neighbors: BTreeMap<LayerId, BTreeSet<FeatureId>>,
    status: FixStatus,
}

impl GapRecord {
    pub(super) fn new(
        geometry: Geometry,
        area: f64,
        bounding_box: BoundingBox,
        neighbors: BTreeMap<LayerId, BTreeSet<FeatureId>>,
    ) -> Self {
        Self {
            geometry,
            area,
            bounding_box,
            neighbors,
            status: FixStatus::Open,
        }
    }

    /// Gap polygon in map coordinates.
    #[must_use]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Extent of the gap and all of its neighbours.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    /// Features sharing boundary with the gap, grouped by layer.
    #[must_use]
    pub fn neighbors(&self) -> &BTreeMap<LayerId, BTreeSet<FeatureId>> {
        &self.neighbors
    }

    #[must_use]
    pub fn neighbor_count(&self) -> usize {
        self.neighbors.values().map(BTreeSet::len).sum()
    }

    #[must_use]
    pub fn status(&self) -> &FixStatus {
        &self.status
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == FixStatus::Open
    }

    pub fn set_fixed(&mut self, method: FixMethod) {
        self.status = FixStatus::Fixed(method);
    }

    pub fn set_fix_failed(&mut self, reason: impl Into<String>) {
        self.status = FixStatus::FixFailed(reason.into());
    }
}

/// Repair produced by the resolver: replace one part of one feature.
///
/// `geometry` is in the target layer's own coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeInstruction {
    pub layer: LayerId,
    pub feature: FeatureId,
    pub part: usize,
    pub geometry: Geometry,
}

impl MergeInstruction {
    /// Returns `current` with the target part replaced.
    ///
    /// # Errors
    ///
    /// Returns a `ResolveError` if the part index no longer exists or the
    /// replacement does not fit the geometry.
    pub fn apply_to(&self, current: &Geometry) -> Result<Geometry, ResolveError> {
        current.with_replaced_part(self.part, self.geometry.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::check::test_util::square;
    use geo::MultiPolygon;
    use slotmap::SlotMap;

    fn some_id() -> FeatureId {
        let mut keys: SlotMap<FeatureId, ()> = SlotMap::with_key();
        keys.insert(())
    }

    #[test]
    fn status_transitions() {
        let mut neighbors = BTreeMap::new();
        neighbors.insert(LayerId::new("a"), BTreeSet::from([some_id()]));
        let mut gap = GapRecord::new(
            square(0.0, 0.0, 1.0),
            1.0,
            BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            neighbors,
        );
        assert!(gap.is_open());
        assert_eq!(gap.neighbor_count(), 1);

        gap.set_fix_failed("nope");
        assert_eq!(gap.status(), &FixStatus::FixFailed("nope".to_owned()));
        gap.set_fixed(FixMethod::NoChange);
        assert_eq!(gap.status(), &FixStatus::Fixed(FixMethod::NoChange));
    }

    #[test]
    fn apply_replaces_multi_polygon_part() {
        let target = Geometry::MultiPolygon(MultiPolygon::new(vec![
            BoundingBox::new(0.0, 0.0, 1.0, 1.0).to_polygon(),
            BoundingBox::new(5.0, 0.0, 6.0, 1.0).to_polygon(),
        ]));
        let instruction = MergeInstruction {
            layer: LayerId::new("a"),
            feature: some_id(),
            part: 1,
            geometry: Geometry::Polygon(BoundingBox::new(5.0, 0.0, 7.0, 1.0).to_polygon()),
        };
        let updated = instruction.apply_to(&target).unwrap();
        assert_eq!(updated.part_count(), 2);
        assert_eq!(updated.part(0), target.part(0));
        assert!((updated.area() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn apply_rejects_missing_part() {
        let instruction = MergeInstruction {
            layer: LayerId::new("a"),
            feature: some_id(),
            part: 3,
            geometry: square(0.0, 0.0, 1.0),
        };
        assert!(matches!(
            instruction.apply_to(&square(0.0, 0.0, 1.0)),
            Err(ResolveError::PartOutOfRange { index: 3, count: 1 })
        ));
    }
}
