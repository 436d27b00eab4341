pub mod bbox;

pub use bbox::BoundingBox;

use geo::{
    Area, BoundingRect, CoordsIter, LineString, MapCoords, MultiLineString, MultiPoint,
    MultiPolygon, Point, Polygon,
};

use crate::error::{ResolveError, TransformError};
use crate::transform::{CoordinateTransform, TransformDirection};

/// Dimension of a geometry, used to decide which features take part in a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    /// Points and multi-points.
    Point,
    /// Line strings and multi-line strings.
    Line,
    /// Polygons and multi-polygons.
    Polygon,
}

/// A 2D geometry value in one of the supported representations.
///
/// Multi-part variants expose their members as parts; single variants have
/// exactly one part unless empty.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point<f64>),
    LineString(LineString<f64>),
    Polygon(Polygon<f64>),
    MultiPoint(MultiPoint<f64>),
    MultiLineString(MultiLineString<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl Geometry {
    /// Short name of the representation, for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Point(_) => "point",
            Self::LineString(_) => "line string",
            Self::Polygon(_) => "polygon",
            Self::MultiPoint(_) => "multi-point",
            Self::MultiLineString(_) => "multi-line string",
            Self::MultiPolygon(_) => "multi-polygon",
        }
    }

    #[must_use]
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Self::Point(_) | Self::MultiPoint(_) => GeometryType::Point,
            Self::LineString(_) | Self::MultiLineString(_) => GeometryType::Line,
            Self::Polygon(_) | Self::MultiPolygon(_) => GeometryType::Polygon,
        }
    }

    /// Returns `true` for the single-part representations.
    #[must_use]
    pub fn is_single_type(&self) -> bool {
        matches!(self, Self::Point(_) | Self::LineString(_) | Self::Polygon(_))
    }

    /// Returns `true` if the geometry has no coordinates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coords_count() == 0
    }

    fn coords_count(&self) -> usize {
        match self {
            Self::Point(g) => g.coords_count(),
            Self::LineString(g) => g.coords_count(),
            Self::Polygon(g) => g.coords_count(),
            Self::MultiPoint(g) => g.coords_count(),
            Self::MultiLineString(g) => g.coords_count(),
            Self::MultiPolygon(g) => g.coords_count(),
        }
    }

    /// Number of parts.
    #[must_use]
    pub fn part_count(&self) -> usize {
        match self {
            Self::MultiPoint(g) => g.0.len(),
            Self::MultiLineString(g) => g.0.len(),
            Self::MultiPolygon(g) => g.0.len(),
            single if single.is_empty() => 0,
            _ => 1,
        }
    }

    /// Returns a copy of part `index`, or `None` if out of range.
    #[must_use]
    pub fn part(&self, index: usize) -> Option<Self> {
        match self {
            Self::MultiPoint(g) => g.0.get(index).copied().map(Self::Point),
            Self::MultiLineString(g) => g.0.get(index).cloned().map(Self::LineString),
            Self::MultiPolygon(g) => g.0.get(index).cloned().map(Self::Polygon),
            single => (index == 0 && !single.is_empty()).then(|| single.clone()),
        }
    }

    /// Iterates over copies of every part.
    pub fn parts(&self) -> impl Iterator<Item = Self> + '_ {
        (0..self.part_count()).filter_map(|i| self.part(i))
    }

    /// All coordinates, in storage order.
    #[must_use]
    pub fn coords(&self) -> Vec<geo::Coord<f64>> {
        match self {
            Self::Point(g) => g.coords_iter().collect(),
            Self::LineString(g) => g.coords_iter().collect(),
            Self::Polygon(g) => g.coords_iter().collect(),
            Self::MultiPoint(g) => g.coords_iter().collect(),
            Self::MultiLineString(g) => g.coords_iter().collect(),
            Self::MultiPolygon(g) => g.coords_iter().collect(),
        }
    }

    /// Smallest axis-aligned box containing the geometry, `None` if empty.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let rect = match self {
            Self::Point(g) => Some(g.bounding_rect()),
            Self::LineString(g) => g.bounding_rect(),
            Self::Polygon(g) => g.bounding_rect(),
            Self::MultiPoint(g) => g.bounding_rect(),
            Self::MultiLineString(g) => g.bounding_rect(),
            Self::MultiPolygon(g) => g.bounding_rect(),
        };
        rect.map(BoundingBox::from)
    }

    /// Planar area; zero for points and lines.
    #[must_use]
    pub fn area(&self) -> f64 {
        match self {
            Self::Polygon(g) => g.unsigned_area(),
            Self::MultiPolygon(g) => g.unsigned_area(),
            _ => 0.0,
        }
    }

    /// Every boundary ring and line of the geometry, holes included.
    #[must_use]
    pub fn rings(&self) -> Vec<&LineString<f64>> {
        match self {
            Self::Point(_) | Self::MultiPoint(_) => Vec::new(),
            Self::LineString(g) => vec![g],
            Self::MultiLineString(g) => g.0.iter().collect(),
            Self::Polygon(g) => polygon_rings(g).collect(),
            Self::MultiPolygon(g) => g.0.iter().flat_map(polygon_rings).collect(),
        }
    }

    /// Returns the polygons of a polygonal geometry, `None` otherwise.
    #[must_use]
    pub fn to_multi_polygon(&self) -> Option<MultiPolygon<f64>> {
        match self {
            Self::Polygon(g) => Some(MultiPolygon::new(vec![g.clone()])),
            Self::MultiPolygon(g) => Some(g.clone()),
            _ => None,
        }
    }

    /// Returns a transformed copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the transform fails for any coordinate.
    pub fn transform(
        &self,
        transform: &dyn CoordinateTransform,
        direction: TransformDirection,
    ) -> Result<Self, TransformError> {
        let f = |c: geo::Coord<f64>| transform.transform_coord(c, direction);
        Ok(match self {
            Self::Point(g) => Self::Point(g.try_map_coords(f)?),
            Self::LineString(g) => Self::LineString(g.try_map_coords(f)?),
            Self::Polygon(g) => Self::Polygon(g.try_map_coords(f)?),
            Self::MultiPoint(g) => Self::MultiPoint(g.try_map_coords(f)?),
            Self::MultiLineString(g) => Self::MultiLineString(g.try_map_coords(f)?),
            Self::MultiPolygon(g) => Self::MultiPolygon(g.try_map_coords(f)?),
        })
    }

    /// Returns a copy in which part `index` is replaced by `part`.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::PartOutOfRange` for a bad index and
    /// `ResolveError::DegenerateMergeResult` if `part` is not a single
    /// geometry of the same dimension.
    pub fn with_replaced_part(&self, index: usize, part: Self) -> Result<Self, ResolveError> {
        let count = self.part_count();
        if index >= count {
            return Err(ResolveError::PartOutOfRange { index, count });
        }
        match (self, part) {
            (Self::Point(_), p @ Self::Point(_))
            | (Self::LineString(_), p @ Self::LineString(_))
            | (Self::Polygon(_), p @ Self::Polygon(_)) => Ok(p),
            (Self::MultiPoint(g), Self::Point(p)) => {
                let mut g = g.clone();
                g.0[index] = p;
                Ok(Self::MultiPoint(g))
            }
            (Self::MultiLineString(g), Self::LineString(p)) => {
                let mut g = g.clone();
                g.0[index] = p;
                Ok(Self::MultiLineString(g))
            }
            (Self::MultiPolygon(g), Self::Polygon(p)) => {
                let mut g = g.clone();
                g.0[index] = p;
                Ok(Self::MultiPolygon(g))
            }
            (target, p) => Err(ResolveError::DegenerateMergeResult(format!(
                "cannot place a {} into a {}",
                p.kind(),
                target.kind()
            ))),
        }
    }
}

fn polygon_rings(polygon: &Polygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    std::iter::once(polygon.exterior()).chain(polygon.interiors())
}

impl From<Polygon<f64>> for Geometry {
    fn from(g: Polygon<f64>) -> Self {
        Self::Polygon(g)
    }
}

impl From<MultiPolygon<f64>> for Geometry {
    fn from(g: MultiPolygon<f64>) -> Self {
        Self::MultiPolygon(g)
    }
}

impl From<LineString<f64>> for Geometry {
    fn from(g: LineString<f64>) -> Self {
        Self::LineString(g)
    }
}

impl From<Point<f64>> for Geometry {
    fn from(g: Point<f64>) -> Self {
        Self::Point(g)
    }
}
