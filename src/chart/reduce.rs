//! Display-resolution shaping of spectrum curves.
//!
//! Three passes, applied in order:
//! 1. [`downsample_peaks`] folds an arbitrary number of bins onto roughly one
//!    bin per CSS pixel, keeping the loudest bin of every bucket.
//! 2. [`reduce_points`] drops polyline points that do not move the curve by
//!    more than a tolerance.
//! 3. [`interpolate_points`] densifies the surviving segments, more so toward
//!    the low-frequency end where the log axis stretches bins apart.

/// Lower bound for the downsampling target.
pub const MIN_DISPLAY_POINTS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveShaping {
    /// Vertical tolerance in CSS pixels at the left edge; doubles toward the right.
    pub tolerance: f32,
    /// Horizontal distance that always forces a point to be kept.
    pub max_gap: f32,
    /// Number of consecutive dropped points that forces a keep.
    pub max_run: usize,
    pub base_steps: usize,
    pub max_steps: usize,
}

impl Default for CurveShaping {
    fn default() -> Self {
        Self {
            tolerance: 0.1,
            max_gap: 20.0,
            max_run: 32,
            base_steps: 5,
            max_steps: 12,
        }
    }
}

/// Number of display points for a plot `drawable_width` CSS pixels wide.
pub fn display_target(drawable_width: f32) -> usize {
    if drawable_width.is_finite() && drawable_width > 0.0 {
        (drawable_width.floor() as usize).max(MIN_DISPLAY_POINTS)
    } else {
        MIN_DISPLAY_POINTS
    }
}

/// Peak-preserving decimation of `values` (and their `frequencies`) to at most
/// `target` buckets. Each bucket keeps its maximum value and the frequency of
/// its first bin. Inputs that already fit are copied unchanged.
pub fn downsample_peaks(
    values: &[f32],
    frequencies: &[f32],
    target: usize,
    out_values: &mut Vec<f32>,
    out_frequencies: &mut Vec<f32>,
) {
    out_values.clear();
    out_frequencies.clear();

    let len = values.len().min(frequencies.len());
    let target = target.max(1);
    if len <= target {
        out_values.extend_from_slice(&values[..len]);
        out_frequencies.extend_from_slice(&frequencies[..len]);
        return;
    }

    out_values.reserve(target);
    out_frequencies.reserve(target);
    for bucket in 0..target {
        let start = bucket * len / target;
        let end = ((bucket + 1) * len / target).max(start + 1);
        let peak = values[start..end]
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        out_values.push(peak);
        out_frequencies.push(frequencies[start]);
    }
}

fn horizontal_progress(x: f32, first_x: f32, span: f32) -> f32 {
    if span <= f32::EPSILON {
        0.0
    } else {
        ((x - first_x) / span).clamp(0.0, 1.0)
    }
}

/// Drops points that stay within tolerance of the last kept point.
pub fn reduce_points(points: &[[f32; 2]], shaping: &CurveShaping, out: &mut Vec<[f32; 2]>) {
    out.clear();
    if points.len() < 3 {
        out.extend_from_slice(points);
        return;
    }

    let first_x = points[0][0];
    let span = points[points.len() - 1][0] - first_x;

    out.push(points[0]);
    let mut last = points[0];
    let mut skipped = 0usize;

    for &point in &points[1..points.len() - 1] {
        let tolerance = shaping.tolerance * (1.0 + horizontal_progress(point[0], first_x, span));
        let dy = (point[1] - last[1]).abs();
        let dx = (point[0] - last[0]).abs();

        if dy > tolerance || dx > shaping.max_gap || skipped >= shaping.max_run {
            out.push(point);
            last = point;
            skipped = 0;
        } else {
            skipped += 1;
        }
    }

    out.push(points[points.len() - 1]);
}

/// Inserts linearly interpolated points between consecutive input points.
pub fn interpolate_points(points: &[[f32; 2]], shaping: &CurveShaping, out: &mut Vec<[f32; 2]>) {
    out.clear();
    if points.len() < 2 {
        out.extend_from_slice(points);
        return;
    }

    let first_x = points[0][0];
    let span = points[points.len() - 1][0] - first_x;
    let base = shaping.base_steps.min(shaping.max_steps);

    out.push(points[0]);
    for segment in points.windows(2) {
        let [x0, y0] = segment[0];
        let [x1, y1] = segment[1];
        let steps = segment_steps(horizontal_progress(x0, first_x, span), base, shaping.max_steps);
        let divisions = (steps + 1) as f32;

        for step in 1..=steps {
            let ratio = step as f32 / divisions;
            out.push([x0 + (x1 - x0) * ratio, y0 + (y1 - y0) * ratio]);
        }
        out.push(segment[1]);
    }
}

fn segment_steps(progress: f32, base: usize, max: usize) -> usize {
    let steps = (max as f32 * (1.0 - progress)).ceil() as usize;
    steps.clamp(base, max)
}
