//! Connector length measurement.

use kurbo::{BezPath, ParamCurveArclen};

/// Arc-length accuracy in user units.
const ARCLEN_ACCURACY: f64 = 1e-3;

/// Exact length of SVG path data, or `None` if it does not parse.
pub fn path_length(d: &str) -> Option<f64> {
    let path = BezPath::from_svg(d.trim()).ok()?;
    Some(
        path.segments()
            .map(|segment| segment.arclen(ARCLEN_ACCURACY))
            .sum(),
    )
}

/// Euclidean length of an SVG `<line>`.
pub fn line_length(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    (x2 - x1).hypot(y2 - y1)
}
