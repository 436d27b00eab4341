use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, ResolveError};
use crate::geometry::GeometryType;

use super::detect::GapParams;

/// Resolution method applied to a detected gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixMethod {
    /// Union the gap into the neighbour part with the longest shared edge.
    MergeLongestEdge,
    /// Mark the gap as handled without touching any feature.
    NoChange,
}

impl FixMethod {
    /// All methods, in index order.
    pub const ALL: [Self; 2] = [Self::MergeLongestEdge, Self::NoChange];

    /// Stable numeric index of the method.
    #[must_use]
    pub fn index(self) -> u32 {
        match self {
            Self::MergeLongestEdge => 0,
            Self::NoChange => 1,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::MergeLongestEdge => "MergeLongestEdge",
            Self::NoChange => "NoChange",
        }
    }

    /// Human-readable description shown to users choosing a fix.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::MergeLongestEdge => "Add gap area to neighboring polygon with longest shared edge",
            Self::NoChange => "No action",
        }
    }
}

impl fmt::Display for FixMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u32> for FixMethod {
    type Error = ResolveError;

    fn try_from(index: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|m| m.index() == index)
            .ok_or_else(|| ResolveError::UnsupportedMethod(index.to_string()))
    }
}

impl FromStr for FixMethod {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| ResolveError::UnsupportedMethod(s.to_owned()))
    }
}

/// Parameters of a gap check.
#[derive(Debug, Clone, PartialEq)]
pub struct GapCheckConfig {
    /// Largest gap area (map units squared) that is still reported.
    pub threshold_map_units: f64,
    /// Precision of the set operations during detection.
    pub tolerance: f64,
    /// Coarser precision used for adjacency tests and merging.
    pub reduced_tolerance: f64,
    /// Geometry types taking part in the check.
    pub compatible_geometry_types: Vec<GeometryType>,
}

impl GapCheckConfig {
    /// Number of decimal places used when no precision is given.
    pub const DEFAULT_PRECISION: i32 = 8;

    /// Creates a polygon-only configuration with the default precision.
    #[must_use]
    pub fn new(threshold_map_units: f64) -> Self {
        Self {
            threshold_map_units,
            tolerance: 0.0,
            reduced_tolerance: 0.0,
            compatible_geometry_types: vec![GeometryType::Polygon],
        }
        .with_precision(Self::DEFAULT_PRECISION)
    }

    /// Derives both tolerances from a number of decimal places:
    /// `10^-p` and `10^-(p/2)`, with integer halving.
    #[must_use]
    pub fn with_precision(mut self, precision: i32) -> Self {
        self.tolerance = 10f64.powi(-precision);
        self.reduced_tolerance = 10f64.powi(-(precision / 2));
        self
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_reduced_tolerance(mut self, reduced_tolerance: f64) -> Self {
        self.reduced_tolerance = reduced_tolerance;
        self
    }

    #[must_use]
    pub fn with_compatible_geometry_types(mut self, types: Vec<GeometryType>) -> Self {
        self.compatible_geometry_types = types;
        self
    }

    /// Checks that the configuration can drive a detection pass.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for non-positive or non-finite tolerances, a
    /// negative or NaN threshold, or an empty geometry type list.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("tolerance", self.tolerance),
            ("reduced_tolerance", self.reduced_tolerance),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidTolerance { name, value });
            }
        }
        if self.threshold_map_units.is_nan() || self.threshold_map_units < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.threshold_map_units));
        }
        if self.compatible_geometry_types.is_empty() {
            return Err(ConfigError::EmptyGeometryTypes);
        }
        Ok(())
    }

    /// Detection parameters for this configuration.
    #[must_use]
    pub fn gap_params(&self) -> GapParams {
        GapParams {
            threshold_area: self.threshold_map_units,
            tolerance: self.tolerance,
            reduced_tolerance: self.reduced_tolerance,
        }
    }
}
