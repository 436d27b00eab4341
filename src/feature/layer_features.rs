use std::collections::{BTreeMap, BTreeSet};

use super::{FeatureAccess, FeatureId, LayerId};
use crate::error::Result;
use crate::geometry::{BoundingBox, Geometry, GeometryType};
use crate::transform::{TransformDirection, TransformProvider};

/// A feature together with its geometry in map coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerFeature {
    /// Layer the feature belongs to.
    pub layer: LayerId,
    /// Feature identifier within the layer.
    pub feature: FeatureId,
    /// Geometry transformed into the common analysis space.
    pub geometry: Geometry,
}

/// Finds features whose envelope intersects a map-space box.
pub trait NeighborLookup {
    /// Returns candidate neighbours with map-space geometry.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying feature store or transform fails.
    fn features_in_box(&self, bbox: &BoundingBox) -> Result<Vec<LayerFeature>>;
}

/// Collects the requested features in map coordinates.
///
/// Features that no longer exist, have an empty geometry, or whose
/// geometry type is not in `types` are skipped.
///
/// # Errors
///
/// Returns an error if a layer is unknown to `transforms`.
pub fn collect_layer_features(
    pool: &dyn FeatureAccess,
    transforms: &dyn TransformProvider,
    ids: &BTreeMap<LayerId, BTreeSet<FeatureId>>,
    types: &[GeometryType],
) -> Result<Vec<LayerFeature>> {
    let mut out = Vec::new();
    for (layer, feature_ids) in ids {
        let transform = transforms.layer_transform(layer)?;
        for &id in feature_ids {
            let Some(feature) = pool.get_feature(layer, id) else {
                continue;
            };
            if feature.geometry.is_empty() || !types.contains(&feature.geometry.geometry_type()) {
                continue;
            }
            out.push(LayerFeature {
                layer: layer.clone(),
                feature: id,
                geometry: feature
                    .geometry
                    .transform(transform, TransformDirection::Forward)?,
            });
        }
    }
    Ok(out)
}

/// [`NeighborLookup`] over a feature pool restricted to a set of layers.
pub struct PoolNeighborLookup<'a> {
    pool: &'a dyn FeatureAccess,
    transforms: &'a dyn TransformProvider,
    layers: Vec<LayerId>,
    types: &'a [GeometryType],
}

impl<'a> PoolNeighborLookup<'a> {
    /// Creates a lookup over `layers` that only returns features of `types`.
    #[must_use]
    pub fn new(
        pool: &'a dyn FeatureAccess,
        transforms: &'a dyn TransformProvider,
        layers: Vec<LayerId>,
        types: &'a [GeometryType],
    ) -> Self {
        Self {
            pool,
            transforms,
            layers,
            types,
        }
    }
}

impl NeighborLookup for PoolNeighborLookup<'_> {
    fn features_in_box(&self, bbox: &BoundingBox) -> Result<Vec<LayerFeature>> {
        let mut out = Vec::new();
        for layer in &self.layers {
            let transform = self.transforms.layer_transform(layer)?;
            let layer_box = transform.transform_bounding_box(bbox, TransformDirection::Reverse)?;
            for feature in self.pool.query_by_bounding_box(layer, &layer_box)? {
                if feature.geometry.is_empty()
                    || !self.types.contains(&feature.geometry.geometry_type())
                {
                    continue;
                }
                out.push(LayerFeature {
                    layer: layer.clone(),
                    feature: feature.id,
                    geometry: feature
                        .geometry
                        .transform(transform, TransformDirection::Forward)?,
                });
            }
        }
        Ok(out)
    }
}
