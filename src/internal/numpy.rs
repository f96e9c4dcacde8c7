//! NumPy-like interpolation.

/// One-dimensional piecewise-linear interpolation, matching `numpy.interp`.
///
/// `xp` must be monotonically increasing and the same length as `fp`.
/// Queries outside `[xp[0], xp[last]]` are clamped to the endpoint values
/// (numpy's repeated-endpoint semantics).
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    debug_assert_eq!(xp.len(), fp.len());
    debug_assert!(!xp.is_empty());

    if x <= xp[0] {
        return fp[0];
    }
    let last = xp.len() - 1;
    if x >= xp[last] {
        return fp[last];
    }

    // partition_point returns the first index with xp[i] > x; the clamping
    // above guarantees 1 <= i <= last.
    let i = xp.partition_point(|&v| v <= x);
    let (x0, x1) = (xp[i - 1], xp[i]);
    let (f0, f1) = (fp[i - 1], fp[i]);
    let t = (x - x0) / (x1 - x0);
    f0 + t * (f1 - f0)
}
