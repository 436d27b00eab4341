use std::f64::consts::FRAC_PI_4;

use geo_clipper::{EndType, JoinType};

/// Shape used at the ends of buffered points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndCapStyle {
    /// Circular cap.
    Round,
    /// No cap; a point buffers to nothing.
    Flat,
    /// Square cap extending the full distance.
    Square,
}

/// Shape used at convex corners of buffered polygons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStyle {
    /// Circular arc around the corner.
    Round,
    /// Sharp corner, squared off once it exceeds the miter limit.
    Mitre,
    /// Corner cut square at the buffer distance.
    Square,
}

/// Parameters of an outward buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferParams {
    /// Offset distance; must be non-negative.
    pub distance: f64,
    /// Cap style for point input.
    pub end_cap: EndCapStyle,
    /// Join style for polygon corners.
    pub join: JoinStyle,
    /// Maximum mitre length as a multiple of `distance`. Limits below 2
    /// behave as 2.
    pub miter_limit: f64,
    /// Number of segments per quarter circle for round caps and joins.
    pub quadrant_segments: u32,
}

impl BufferParams {
    /// Round caps and joins, miter limit 5, 8 segments per quadrant.
    #[must_use]
    pub fn new(distance: f64) -> Self {
        Self {
            distance,
            end_cap: EndCapStyle::Round,
            join: JoinStyle::Round,
            miter_limit: 5.0,
            quadrant_segments: 8,
        }
    }

    #[must_use]
    pub fn with_end_cap(mut self, end_cap: EndCapStyle) -> Self {
        self.end_cap = end_cap;
        self
    }

    #[must_use]
    pub fn with_join(mut self, join: JoinStyle) -> Self {
        self.join = join;
        self
    }

    #[must_use]
    pub fn with_miter_limit(mut self, miter_limit: f64) -> Self {
        self.miter_limit = miter_limit;
        self
    }

    #[must_use]
    pub fn with_quadrant_segments(mut self, quadrant_segments: u32) -> Self {
        self.quadrant_segments = quadrant_segments;
        self
    }

    /// Clipper join for polygon corners on a grid of `scale` units per map unit.
    pub(super) fn join_type(&self, scale: f64) -> JoinType {
        match self.join {
            JoinStyle::Round => JoinType::Round(self.arc_tolerance(scale)),
            JoinStyle::Mitre => JoinType::Miter(self.miter_limit),
            JoinStyle::Square => JoinType::Square,
        }
    }

    /// Clipper join and end types for point input, `None` for flat caps.
    pub(super) fn point_cap(&self, scale: f64) -> Option<(JoinType, EndType)> {
        match self.end_cap {
            EndCapStyle::Flat => None,
            EndCapStyle::Square => Some((JoinType::Square, EndType::OpenSquare)),
            EndCapStyle::Round => {
                let arc = self.arc_tolerance(scale);
                Some((JoinType::Round(arc), EndType::OpenRound(arc)))
            }
        }
    }

    // Sagitta of one arc step, in grid units.
    fn arc_tolerance(&self, scale: f64) -> f64 {
        let steps = f64::from(self.quadrant_segments.max(1));
        self.distance * scale * (1.0 - (FRAC_PI_4 / steps).cos())
    }
}
