//! Coordinate transformation between layer and analysis coordinates.
//!
//! Every layer has a forward transform into the common analysis (map)
//! space. Detection works in map space; repairs are expressed in the
//! target layer's own coordinates via the reverse direction.

use std::collections::HashMap;

use geo::{coord, Coord};

use crate::error::TransformError;
use crate::feature::LayerId;
use crate::geometry::BoundingBox;
use crate::math::{Matrix3, Point2, Vector2};

/// Direction in which a layer transform is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformDirection {
    /// Layer coordinates to map coordinates.
    Forward,
    /// Map coordinates to layer coordinates.
    Reverse,
}

/// A coordinate mapping that can be applied in both directions.
pub trait CoordinateTransform {
    /// Transforms a single coordinate.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinate cannot be mapped.
    fn transform_coord(
        &self,
        c: Coord<f64>,
        direction: TransformDirection,
    ) -> Result<Coord<f64>, TransformError>;

    /// Transforms a bounding box by mapping its corners.
    ///
    /// # Errors
    ///
    /// Returns an error if any corner cannot be mapped.
    fn transform_bounding_box(
        &self,
        bbox: &BoundingBox,
        direction: TransformDirection,
    ) -> Result<BoundingBox, TransformError> {
        let mut mapped = Vec::with_capacity(4);
        for corner in bbox.corners() {
            mapped.push(self.transform_coord(corner, direction)?);
        }
        BoundingBox::from_coords(mapped).ok_or(TransformError::NonFinite)
    }
}

/// Supplies the forward transform of each layer.
pub trait TransformProvider {
    /// Returns the transform from `layer`'s coordinates into map coordinates.
    ///
    /// # Errors
    ///
    /// Returns `TransformError::NoTransform` if the layer is unknown.
    fn layer_transform(&self, layer: &LayerId) -> Result<&dyn CoordinateTransform, TransformError>;
}

/// An affine transform in the XY plane with a precomputed inverse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    forward: Matrix3,
    inverse: Matrix3,
}

impl AffineTransform {
    /// Creates a transform from a homogeneous matrix.
    ///
    /// # Errors
    ///
    /// Returns `TransformError::NotInvertible` for singular matrices.
    pub fn from_matrix(forward: Matrix3) -> Result<Self, TransformError> {
        let inverse = forward.try_inverse().ok_or(TransformError::NotInvertible)?;
        Ok(Self { forward, inverse })
    }

    /// The identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            forward: Matrix3::identity(),
            inverse: Matrix3::identity(),
        }
    }

    /// A pure translation.
    #[must_use]
    pub fn translation(dx: f64, dy: f64) -> Self {
        Self {
            forward: Matrix3::new_translation(&Vector2::new(dx, dy)),
            inverse: Matrix3::new_translation(&Vector2::new(-dx, -dy)),
        }
    }

    /// Uniform scaling about the origin followed by a translation.
    ///
    /// # Errors
    ///
    /// Returns `TransformError::NotInvertible` if `factor` is zero.
    pub fn scale_then_translate(factor: f64, dx: f64, dy: f64) -> Result<Self, TransformError> {
        Self::from_matrix(
            Matrix3::new_translation(&Vector2::new(dx, dy)) * Matrix3::new_scaling(factor),
        )
    }
}

impl CoordinateTransform for AffineTransform {
    fn transform_coord(
        &self,
        c: Coord<f64>,
        direction: TransformDirection,
    ) -> Result<Coord<f64>, TransformError> {
        let m = match direction {
            TransformDirection::Forward => &self.forward,
            TransformDirection::Reverse => &self.inverse,
        };
        let p = m.transform_point(&Point2::new(c.x, c.y));
        if !(p.x.is_finite() && p.y.is_finite()) {
            return Err(TransformError::NonFinite);
        }
        Ok(coord! { x: p.x, y: p.y })
    }
}

/// Per-layer affine transforms, with an optional fallback.
#[derive(Debug, Clone, Default)]
pub struct LayerTransforms {
    layers: HashMap<LayerId, AffineTransform>,
    fallback: Option<AffineTransform>,
}

impl LayerTransforms {
    /// Creates an empty registry; unknown layers are an error.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry where every layer already is in map coordinates.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            layers: HashMap::new(),
            fallback: Some(AffineTransform::identity()),
        }
    }

    /// Registers the forward transform of a layer.
    pub fn insert(&mut self, layer: LayerId, transform: AffineTransform) {
        self.layers.insert(layer, transform);
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with_layer(mut self, layer: LayerId, transform: AffineTransform) -> Self {
        self.insert(layer, transform);
        self
    }
}

impl TransformProvider for LayerTransforms {
    fn layer_transform(&self, layer: &LayerId) -> Result<&dyn CoordinateTransform, TransformError> {
        self.layers
            .get(layer)
            .or(self.fallback.as_ref())
            .map(|t| t as &dyn CoordinateTransform)
            .ok_or_else(|| TransformError::NoTransform(layer.clone()))
    }
}
