use geo::Coord;

use super::{Vector2, TOLERANCE};

/// Returns the distance from `q` to the infinite line through `p1` and `p2`.
///
/// The caller must ensure `p1 != p2`.
#[must_use]
pub fn point_line_dist(p1: Coord<f64>, p2: Coord<f64>, q: Coord<f64>) -> f64 {
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    let nom = (dy * q.x - dx * q.y + p2.x * p1.y - p2.y * p1.x).abs();
    nom / (dx * dx + dy * dy).sqrt()
}

/// Returns the length along `p1 → p2` that segment `q1 → q2` covers.
///
/// Both endpoints of `q` must lie within `tol` of the line through `p`;
/// otherwise the segments are not considered collinear and the result is
/// zero. The overlap is measured by projecting `q` onto `p` and clamping
/// to `p`'s extent. Zero-length `p` segments contribute nothing.
#[must_use]
pub fn collinear_overlap(
    p1: Coord<f64>,
    p2: Coord<f64>,
    q1: Coord<f64>,
    q2: Coord<f64>,
    tol: f64,
) -> f64 {
    let along = Vector2::new(p2.x - p1.x, p2.y - p1.y);
    let len_p = along.norm();
    if len_p < TOLERANCE {
        return 0.0;
    }
    if point_line_dist(p1, p2, q1) > tol || point_line_dist(p1, p2, q2) > tol {
        return 0.0;
    }

    let dir = along / len_p;
    let mut lambda_q1 = Vector2::new(q1.x - p1.x, q1.y - p1.y).dot(&dir);
    let mut lambda_q2 = Vector2::new(q2.x - p1.x, q2.y - p1.y).dot(&dir);
    if lambda_q1 > lambda_q2 {
        std::mem::swap(&mut lambda_q1, &mut lambda_q2);
    }

    let lambda1 = lambda_q1.max(0.0);
    let lambda2 = lambda_q2.min(len_p);
    (lambda2 - lambda1).max(0.0)
}
