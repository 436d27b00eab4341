use crate::geometry::Geometry;
use crate::math::segment_2d::collinear_overlap;

/// Total length of boundary that `a` and `b` have in common.
///
/// Every segment of every ring of `a` is compared with every segment of
/// every ring of `b`; segments of `b` whose endpoints both lie within `tol`
/// of the line through a segment of `a` contribute their overlap along it.
/// Geometries whose boxes are further than `tol` apart share nothing.
#[must_use]
pub fn shared_edge_length(a: &Geometry, b: &Geometry, tol: f64) -> f64 {
    let (Some(box_a), Some(box_b)) = (a.bounding_box(), b.bounding_box()) else {
        return 0.0;
    };
    if !box_a.buffered(tol).intersects(&box_b) {
        return 0.0;
    }

    let rings_b = b.rings();
    let mut len = 0.0;
    for ring_a in a.rings() {
        for seg_a in ring_a.lines() {
            for ring_b in &rings_b {
                for seg_b in ring_b.lines() {
                    len += collinear_overlap(seg_a.start, seg_a.end, seg_b.start, seg_b.end, tol);
                }
            }
        }
    }
    len
}
