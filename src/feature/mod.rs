//! Feature storage seen through the traits the checks consume.
//!
//! The checks never own features. They read geometry through
//! [`FeatureAccess`] and hand repairs to a [`FeatureSink`]; reads must
//! reflect the latest committed state, so a repair may observe geometry
//! that differs from what detection saw.

mod layer_features;
mod memory_pool;

pub use layer_features::{collect_layer_features, LayerFeature, NeighborLookup, PoolNeighborLookup};
pub use memory_pool::MemoryFeaturePool;

use std::collections::BTreeSet;
use std::fmt;

use crate::check::MergeInstruction;
use crate::error::FeatureError;
use crate::geometry::{BoundingBox, Geometry};

slotmap::new_key_type! {
    /// Unique identifier for a feature within its layer.
    pub struct FeatureId;
}

/// Identifier of a feature layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(String);

impl LayerId {
    /// Creates a layer identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A feature snapshot in its layer's own coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// The feature identifier.
    pub id: FeatureId,
    /// Geometry at the time of the read.
    pub geometry: Geometry,
}

/// Read access to layered features.
pub trait FeatureAccess {
    /// All layers known to the pool, in ascending order.
    fn layer_ids(&self) -> Vec<LayerId>;

    /// All feature ids of a layer.
    ///
    /// # Errors
    ///
    /// Returns `FeatureError::UnknownLayer` if the layer does not exist.
    fn feature_ids(&self, layer: &LayerId) -> Result<BTreeSet<FeatureId>, FeatureError>;

    /// Reads the current state of a feature.
    fn get_feature(&self, layer: &LayerId, id: FeatureId) -> Option<Feature>;

    /// Returns the features whose envelope intersects `bbox` (layer
    /// coordinates), ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `FeatureError::UnknownLayer` if the layer does not exist.
    fn query_by_bounding_box(
        &self,
        layer: &LayerId,
        bbox: &BoundingBox,
    ) -> Result<Vec<Feature>, FeatureError>;
}

/// Write access used to commit a repair.
pub trait FeatureSink {
    /// Replaces one part of a feature's geometry.
    ///
    /// # Errors
    ///
    /// Returns an error if the feature is missing or the part cannot be
    /// replaced.
    fn replace_geometry_part(&mut self, instruction: &MergeInstruction) -> crate::Result<()>;
}
