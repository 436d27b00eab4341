//! Precision-aware polygon set operations.
//!
//! Set operations and buffers run on an integer grid whose spacing equals
//! the engine tolerance. Inputs are snapped to that grid first, so
//! coordinates that agree to within the tolerance become shared vertices,
//! and the result precision does not depend on the extent of the data.

mod buffer;
mod shared_edge;

pub use buffer::{BufferParams, EndCapStyle, JoinStyle};
pub use shared_edge::shared_edge_length;

use geo::orient::{Direction, Orient};
use geo::{CoordsIter, LineString, MapCoords, MultiLineString, MultiPolygon};
use geo_clipper::{Clipper, ClipperOpen, EndType};
use tracing::trace;

use crate::error::EngineError;
use crate::geometry::Geometry;

/// Largest grid coordinate the integer clipper accepts (2^62 - 1).
const MAX_GRID_COORD: f64 = 4.611_686_018_427_388e18;

/// Geometry engine parameterized by a snapping tolerance.
#[derive(Debug, Clone, Copy)]
pub struct GeometryEngine {
    tolerance: f64,
    scale: f64,
}

impl GeometryEngine {
    /// Creates an engine working on a grid of spacing `tolerance`.
    ///
    /// A non-positive or non-finite tolerance falls back to a unit grid.
    #[must_use]
    pub fn new(tolerance: f64) -> Self {
        let scale = if tolerance.is_finite() && tolerance > 0.0 {
            let s = 1.0 / tolerance;
            if s >= 1.0 {
                s.round()
            } else {
                s
            }
        } else {
            1.0
        };
        Self { tolerance, scale }
    }

    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Unions all polygonal inputs into one geometry.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty input list, non-polygonal input, or
    /// coordinates that are non-finite or too large for the grid.
    pub fn combine(&self, geometries: &[Geometry]) -> Result<Geometry, EngineError> {
        if geometries.is_empty() {
            return Err(EngineError::Combine("no geometries to combine".to_owned()));
        }
        let mut acc = MultiPolygon::new(Vec::new());
        for geometry in geometries {
            let operand = self.polygonal_operand(geometry, "combine")?;
            for polygon in &operand.0 {
                acc = acc.union(polygon, self.scale);
            }
        }
        trace!(inputs = geometries.len(), parts = acc.0.len(), "combined");
        Ok(polygonal(acc))
    }

    /// Returns the axis-aligned rectangle enclosing `geometry`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Envelope` if the geometry is empty.
    pub fn envelope(&self, geometry: &Geometry) -> Result<Geometry, EngineError> {
        let bbox = geometry
            .bounding_box()
            .ok_or_else(|| EngineError::Envelope("geometry is empty".to_owned()))?;
        if !(bbox.min_x.is_finite()
            && bbox.min_y.is_finite()
            && bbox.max_x.is_finite()
            && bbox.max_y.is_finite())
        {
            return Err(EngineError::NonFinite {
                operation: "envelope",
            });
        }
        Ok(Geometry::Polygon(bbox.to_polygon()))
    }

    /// Buffers `geometry` outward.
    ///
    /// # Errors
    ///
    /// Returns an error for lineal input, negative or non-finite distances,
    /// and coordinates that are non-finite or too large for the grid.
    pub fn buffer(
        &self,
        geometry: &Geometry,
        params: &BufferParams,
    ) -> Result<Geometry, EngineError> {
        if !params.distance.is_finite() {
            return Err(EngineError::NonFinite {
                operation: "buffer",
            });
        }
        if params.distance < 0.0 {
            return Err(EngineError::Buffer(format!(
                "negative distance {} is not supported",
                params.distance
            )));
        }

        let buffered = match geometry {
            Geometry::Point(_) | Geometry::MultiPoint(_) => {
                let Some((join, end)) = params.point_cap(self.scale) else {
                    return Ok(Geometry::MultiPolygon(MultiPolygon::new(Vec::new())));
                };
                let points = MultiLineString::new(
                    geometry
                        .coords()
                        .into_iter()
                        .map(|c| LineString::new(vec![self.snap_coord(c)]))
                        .collect(),
                );
                self.check_range(points.coords_iter(), "buffer")?;
                points.offset(params.distance, join, end, self.scale)
            }
            Geometry::Polygon(_) | Geometry::MultiPolygon(_) => {
                let operand = self.polygonal_operand(geometry, "buffer")?;
                if params.distance <= 0.0 {
                    return Ok(polygonal(operand));
                }
                operand.offset(
                    params.distance,
                    params.join_type(self.scale),
                    EndType::ClosedPolygon,
                    self.scale,
                )
            }
            Geometry::LineString(_) | Geometry::MultiLineString(_) => {
                return Err(EngineError::Unsupported {
                    operation: "buffer",
                    kind: geometry.kind(),
                });
            }
        };
        Ok(polygonal(buffered))
    }

    /// Returns `a` minus `b`.
    ///
    /// # Errors
    ///
    /// Returns an error for non-polygonal input or coordinates that are
    /// non-finite or too large for the grid.
    pub fn difference(&self, a: &Geometry, b: &Geometry) -> Result<Geometry, EngineError> {
        let lhs = self.polygonal_operand(a, "difference")?;
        let rhs = self.polygonal_operand(b, "difference")?;
        Ok(polygonal(lhs.difference(&rhs, self.scale)))
    }

    /// Snapped polygons with counter-clockwise shells and clockwise holes.
    fn polygonal_operand(
        &self,
        geometry: &Geometry,
        operation: &'static str,
    ) -> Result<MultiPolygon<f64>, EngineError> {
        let mp = geometry
            .to_multi_polygon()
            .ok_or(EngineError::Unsupported {
                operation,
                kind: geometry.kind(),
            })?;
        self.check_range(mp.coords_iter(), operation)?;
        Ok(mp
            .map_coords(|c| self.snap_coord(c))
            .orient(Direction::Default))
    }

    fn check_range(
        &self,
        mut coords: impl Iterator<Item = geo::Coord<f64>>,
        operation: &'static str,
    ) -> Result<(), EngineError> {
        let limit = MAX_GRID_COORD / self.scale;
        coords.try_for_each(|c| {
            if !(c.x.is_finite() && c.y.is_finite()) {
                Err(EngineError::NonFinite { operation })
            } else if c.x.abs() > limit || c.y.abs() > limit {
                Err(EngineError::OutOfRange { operation })
            } else {
                Ok(())
            }
        })
    }

    fn snap_coord(&self, c: geo::Coord<f64>) -> geo::Coord<f64> {
        geo::coord! {
            x: (c.x * self.scale).round() / self.scale,
            y: (c.y * self.scale).round() / self.scale,
        }
    }
}

/// Wraps a polygon set, unwrapping the single-polygon case.
#[must_use]
pub fn polygonal(mut mp: MultiPolygon<f64>) -> Geometry {
    if mp.0.len() == 1 {
        if let Some(polygon) = mp.0.pop() {
            return Geometry::Polygon(polygon);
        }
    }
    Geometry::MultiPolygon(mp)
}
