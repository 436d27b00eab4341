use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rstar::{RTree, RTreeObject, AABB};
use slotmap::SlotMap;
use tracing::trace;

use super::{Feature, FeatureAccess, FeatureId, FeatureSink, LayerId};
use crate::check::MergeInstruction;
use crate::error::FeatureError;
use crate::geometry::{BoundingBox, Geometry};

/// Envelope of one feature in a layer's R-tree.
#[derive(Debug, Clone, PartialEq)]
struct IndexedEnvelope {
    id: FeatureId,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

struct LayerStore {
    features: SlotMap<FeatureId, Geometry>,
    index: RTree<IndexedEnvelope>,
}

impl LayerStore {
    fn new() -> Self {
        Self {
            features: SlotMap::with_key(),
            index: RTree::new(),
        }
    }

    fn index_entry(id: FeatureId, geometry: &Geometry) -> Option<IndexedEnvelope> {
        geometry.bounding_box().map(|bbox| IndexedEnvelope {
            id,
            envelope: bbox.to_aabb(),
        })
    }
}

/// In-memory feature pool with one R-tree per layer.
///
/// Features live in a generational arena per layer, so ids stay valid
/// (and are never reused) across updates and removals.
#[derive(Default)]
pub struct MemoryFeaturePool {
    layers: BTreeMap<LayerId, LayerStore>,
}

impl fmt::Debug for MemoryFeaturePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (layer, store) in &self.layers {
            map.entry(layer, &store.features.len());
        }
        map.finish()
    }
}

impl MemoryFeaturePool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures a layer exists, even if it never receives features.
    pub fn add_layer(&mut self, layer: LayerId) {
        self.layers.entry(layer).or_insert_with(LayerStore::new);
    }

    /// Inserts a feature, creating the layer on first use.
    pub fn add_feature(&mut self, layer: &LayerId, geometry: Geometry) -> FeatureId {
        let store = self
            .layers
            .entry(layer.clone())
            .or_insert_with(LayerStore::new);
        let id = store.features.insert(geometry);
        if let Some(entry) = LayerStore::index_entry(id, &store.features[id]) {
            store.index.insert(entry);
        }
        id
    }

    /// Returns the stored geometry of a feature.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer or feature does not exist.
    pub fn geometry(&self, layer: &LayerId, id: FeatureId) -> Result<&Geometry, FeatureError> {
        self.layer(layer)?
            .features
            .get(id)
            .ok_or_else(|| FeatureError::UnknownFeature {
                layer: layer.clone(),
                id,
            })
    }

    /// Replaces the geometry of a feature and refreshes the spatial index.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer or feature does not exist.
    pub fn set_geometry(
        &mut self,
        layer: &LayerId,
        id: FeatureId,
        geometry: Geometry,
    ) -> Result<(), FeatureError> {
        let store = self
            .layers
            .get_mut(layer)
            .ok_or_else(|| FeatureError::UnknownLayer(layer.clone()))?;
        let slot = store
            .features
            .get_mut(id)
            .ok_or_else(|| FeatureError::UnknownFeature {
                layer: layer.clone(),
                id,
            })?;

        if let Some(old) = LayerStore::index_entry(id, slot) {
            store.index.remove(&old);
        }
        if let Some(new) = LayerStore::index_entry(id, &geometry) {
            store.index.insert(new);
        }
        *slot = geometry;
        trace!(%layer, ?id, "feature geometry replaced");
        Ok(())
    }

    /// Removes a feature, returning its last geometry.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer or feature does not exist.
    pub fn remove_feature(&mut self, layer: &LayerId, id: FeatureId) -> Result<Geometry, FeatureError> {
        let store = self
            .layers
            .get_mut(layer)
            .ok_or_else(|| FeatureError::UnknownLayer(layer.clone()))?;
        let geometry = store
            .features
            .remove(id)
            .ok_or_else(|| FeatureError::UnknownFeature {
                layer: layer.clone(),
                id,
            })?;
        if let Some(old) = LayerStore::index_entry(id, &geometry) {
            store.index.remove(&old);
        }
        Ok(geometry)
    }

    /// Number of features in a layer, zero for unknown layers.
    #[must_use]
    pub fn feature_count(&self, layer: &LayerId) -> usize {
        self.layers.get(layer).map_or(0, |s| s.features.len())
    }

    fn layer(&self, layer: &LayerId) -> Result<&LayerStore, FeatureError> {
        self.layers
            .get(layer)
            .ok_or_else(|| FeatureError::UnknownLayer(layer.clone()))
    }
}

impl FeatureAccess for MemoryFeaturePool {
    fn layer_ids(&self) -> Vec<LayerId> {
        self.layers.keys().cloned().collect()
    }

    fn feature_ids(&self, layer: &LayerId) -> Result<BTreeSet<FeatureId>, FeatureError> {
        Ok(self.layer(layer)?.features.keys().collect())
    }

    fn get_feature(&self, layer: &LayerId, id: FeatureId) -> Option<Feature> {
        let geometry = self.layers.get(layer)?.features.get(id)?.clone();
        Some(Feature { id, geometry })
    }

    fn query_by_bounding_box(
        &self,
        layer: &LayerId,
        bbox: &BoundingBox,
    ) -> Result<Vec<Feature>, FeatureError> {
        let store = self.layer(layer)?;
        let mut ids: Vec<FeatureId> = store
            .index
            .locate_in_envelope_intersecting(&bbox.to_aabb())
            .map(|entry| entry.id)
            .collect();
        ids.sort_unstable();
        Ok(ids
            .into_iter()
            .filter_map(|id| {
                store.features.get(id).map(|geometry| Feature {
                    id,
                    geometry: geometry.clone(),
                })
            })
            .collect())
    }
}

impl FeatureSink for MemoryFeaturePool {
    fn replace_geometry_part(&mut self, instruction: &MergeInstruction) -> crate::Result<()> {
        let current = self.geometry(&instruction.layer, instruction.feature)?;
        let updated = instruction.apply_to(current)?;
        self.set_geometry(&instruction.layer, instruction.feature, updated)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use geo::{polygon, Polygon};

    fn square(x: f64, y: f64, size: f64) -> Geometry {
        let p: Polygon<f64> = polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
        ];
        Geometry::from(p)
    }

    #[test]
    fn add_and_read_back() {
        let mut pool = MemoryFeaturePool::new();
        let layer = LayerId::new("parcels");
        let id = pool.add_feature(&layer, square(0.0, 0.0, 1.0));

        assert_eq!(pool.layer_ids(), vec![layer.clone()]);
        assert_eq!(pool.feature_count(&layer), 1);
        assert_eq!(pool.feature_ids(&layer).unwrap().len(), 1);
        let feature = pool.get_feature(&layer, id).unwrap();
        assert_eq!(feature.geometry, square(0.0, 0.0, 1.0));
    }

    #[test]
    fn unknown_layer_errors() {
        let pool = MemoryFeaturePool::new();
        let layer = LayerId::new("missing");
        assert!(matches!(
            pool.feature_ids(&layer),
            Err(FeatureError::UnknownLayer(_))
        ));
        assert!(pool
            .query_by_bounding_box(&layer, &BoundingBox::new(0.0, 0.0, 1.0, 1.0))
            .is_err());
    }

    #[test]
    fn bbox_query_uses_index() {
        let mut pool = MemoryFeaturePool::new();
        let layer = LayerId::new("parcels");
        let a = pool.add_feature(&layer, square(0.0, 0.0, 1.0));
        let _far = pool.add_feature(&layer, square(10.0, 10.0, 1.0));
        let b = pool.add_feature(&layer, square(1.0, 0.0, 1.0));

        let hits = pool
            .query_by_bounding_box(&layer, &BoundingBox::new(0.5, 0.5, 1.5, 0.8))
            .unwrap();
        let ids: Vec<_> = hits.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn set_geometry_reindexes() {
        let mut pool = MemoryFeaturePool::new();
        let layer = LayerId::new("parcels");
        let id = pool.add_feature(&layer, square(0.0, 0.0, 1.0));
        pool.set_geometry(&layer, id, square(20.0, 20.0, 1.0)).unwrap();

        let old_area = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        assert!(pool.query_by_bounding_box(&layer, &old_area).unwrap().is_empty());
        let new_area = BoundingBox::new(20.5, 20.5, 20.6, 20.6);
        assert_eq!(pool.query_by_bounding_box(&layer, &new_area).unwrap().len(), 1);
    }

    #[test]
    fn removed_feature_is_gone() {
        let mut pool = MemoryFeaturePool::new();
        let layer = LayerId::new("parcels");
        let id = pool.add_feature(&layer, square(0.0, 0.0, 1.0));
        pool.remove_feature(&layer, id).unwrap();
        assert!(pool.get_feature(&layer, id).is_none());
        assert!(pool
            .query_by_bounding_box(&layer, &BoundingBox::new(0.0, 0.0, 1.0, 1.0))
            .unwrap()
            .is_empty());
        assert!(matches!(
            pool.remove_feature(&layer, id),
            Err(FeatureError::UnknownFeature { .. })
        ));
    }
}
