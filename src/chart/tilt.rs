//! dB/octave slope compensation applied to incoming magnitudes.

/// Offset in dB for a bin at `freq`, relative to the bottom of the axis.
#[inline]
pub fn tilt_offset(freq: f32, min_freq: f32, tilt_db_per_octave: f32) -> f32 {
    if tilt_db_per_octave == 0.0 || freq <= 0.0 || min_freq <= 0.0 {
        return 0.0;
    }
    tilt_db_per_octave * (freq / min_freq).log2()
}

/// Writes tilted copies of `raw` into `out`, using `frequencies` for each bin.
pub fn apply_tilt(
    raw: &[f32],
    frequencies: &[f32],
    min_freq: f32,
    tilt_db_per_octave: f32,
    out: &mut Vec<f32>,
) {
    out.clear();
    out.reserve(raw.len());

    if tilt_db_per_octave == 0.0 {
        out.extend_from_slice(raw);
        return;
    }

    out.extend(
        raw.iter()
            .zip(frequencies)
            .map(|(&db, &freq)| db + tilt_offset(freq, min_freq, tilt_db_per_octave)),
    );
}
