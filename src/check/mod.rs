//! Gap detection and repair over a polygon coverage.

mod config;
mod detect;
mod record;
mod resolve;

pub use config::{FixMethod, GapCheckConfig};
pub use detect::{detect_gaps, DetectGaps, GapDetection, GapParams};
pub use record::{FixStatus, GapRecord, MergeInstruction};
pub use resolve::{GapFixer, ResolveGap};

#[cfg(test)]
pub(crate) mod test_util {
    use geo::{polygon, Polygon};

    use crate::feature::{FeatureId, LayerId, MemoryFeaturePool};
    use crate::geometry::Geometry;

    pub fn square(x: f64, y: f64, size: f64) -> Geometry {
        let p: Polygon<f64> = polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
        ];
        Geometry::from(p)
    }

    /// 3x3 block of unit squares with the given cells left out.
    pub fn grid_without(
        pool: &mut MemoryFeaturePool,
        layer: &LayerId,
        missing: &[(u32, u32)],
    ) -> Vec<((u32, u32), FeatureId)> {
        grid_at(pool, layer, 0.0, missing)
    }

    /// Same as [`grid_without`], with the block's lower-left corner at
    /// `(origin, origin)`.
    pub fn grid_at(
        pool: &mut MemoryFeaturePool,
        layer: &LayerId,
        origin: f64,
        missing: &[(u32, u32)],
    ) -> Vec<((u32, u32), FeatureId)> {
        let mut ids = Vec::new();
        for row in 0..3 {
            for col in 0..3 {
                if missing.contains(&(col, row)) {
                    continue;
                }
                let (x, y) = (origin + f64::from(col), origin + f64::from(row));
                let id = pool.add_feature(layer, square(x, y, 1.0));
                ids.push(((col, row), id));
            }
        }
        ids
    }
}
