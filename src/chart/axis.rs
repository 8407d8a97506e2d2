//! Frequency / level to pixel mapping.
//!
//! All coordinates are CSS (logical) pixels relative to the chart origin. The
//! four coordinate conversions are memoized; every cache is stamped with the
//! geometry generation it was filled under and is dropped wholesale the first
//! time it is read after the geometry changes.

use rustc_hash::FxHashMap;
use std::cell::RefCell;

pub const LEFT_PADDING: f32 = 60.0;
pub const RIGHT_PADDING: f32 = 40.0;
pub const TOP_BOTTOM_PADDING: f32 = 20.0;
/// Extra room reserved on the right for every right-hand dB scale.
pub const SCALE_COLUMN_WIDTH: f32 = 40.0;

const MAX_CACHE_ENTRIES: usize = 8_192;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Padding {
    pub left: f32,
    pub right: f32,
    pub top_bottom: f32,
}

impl Padding {
    pub fn with_right_scales(right_scales: usize) -> Self {
        Self {
            right: RIGHT_PADDING + SCALE_COLUMN_WIDTH * right_scales as f32,
            ..Self::default()
        }
    }
}

impl Default for Padding {
    fn default() -> Self {
        Self {
            left: LEFT_PADDING,
            right: RIGHT_PADDING,
            top_bottom: TOP_BOTTOM_PADDING,
        }
    }
}

/// Plot area bounds in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl PlotRect {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasGeometry {
    pub css_width: f32,
    pub css_height: f32,
    pub device_pixel_ratio: f32,
    pub padding: Padding,
}

impl CanvasGeometry {
    pub fn new(css_width: f32, css_height: f32, device_pixel_ratio: f32) -> Self {
        Self {
            css_width: sanitize_extent(css_width),
            css_height: sanitize_extent(css_height),
            device_pixel_ratio: sanitize_ratio(device_pixel_ratio),
            padding: Padding::default(),
        }
    }

    pub fn drawable_width(&self) -> f32 {
        self.css_width - self.padding.left - self.padding.right
    }

    pub fn drawable_height(&self) -> f32 {
        self.css_height - self.padding.top_bottom * 2.0
    }

    /// True when there is no plot area to draw into (e.g. a collapsed pane).
    pub fn is_degenerate(&self) -> bool {
        self.drawable_width() <= 0.0 || self.drawable_height() <= 0.0
    }

    pub fn plot_rect(&self) -> PlotRect {
        PlotRect {
            left: self.padding.left,
            top: self.padding.top_bottom,
            right: self.css_width - self.padding.right,
            bottom: self.css_height - self.padding.top_bottom,
        }
    }

    /// Snaps a CSS coordinate onto the centre of a device pixel.
    pub fn snap(&self, value: f32) -> f32 {
        let ratio = self.device_pixel_ratio;
        ((value * ratio).floor() + 0.5) / ratio
    }
}

impl Default for CanvasGeometry {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}

fn sanitize_extent(value: f32) -> f32 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

fn sanitize_ratio(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        1.0
    }
}

/// Vertical range of a dB scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DbRange {
    pub min_db: f32,
    pub max_db: f32,
}

impl DbRange {
    pub fn new(min_db: f32, max_db: f32) -> Self {
        Self { min_db, max_db }
    }

    pub fn span(&self) -> f32 {
        self.max_db - self.min_db
    }

    pub fn clamp(&self, db: f32) -> f32 {
        db.clamp(self.min_db, self.max_db)
    }

    fn key(&self) -> (u32, u32) {
        (self.min_db.to_bits(), self.max_db.to_bits())
    }
}

#[derive(Debug, Default)]
struct AxisCaches {
    generation: u64,
    freq_to_x: FxHashMap<u64, f64>,
    x_to_freq: FxHashMap<u64, f64>,
    db_to_y: FxHashMap<(u64, u32, u32), f64>,
    y_to_db: FxHashMap<(u64, u32, u32), f64>,
}

impl AxisCaches {
    fn sync(&mut self, generation: u64) {
        if self.generation != generation {
            self.freq_to_x.clear();
            self.x_to_freq.clear();
            self.db_to_y.clear();
            self.y_to_db.clear();
            self.generation = generation;
        }
    }
}

fn memoize<K, F>(cache: &mut FxHashMap<K, f64>, key: K, compute: F) -> f64
where
    K: std::hash::Hash + Eq,
    F: FnOnce() -> f64,
{
    if let Some(&value) = cache.get(&key) {
        return value;
    }
    if cache.len() >= MAX_CACHE_ENTRIES {
        cache.clear();
    }
    let value = compute();
    cache.insert(key, value);
    value
}

#[derive(Debug)]
pub struct AxisMapper {
    min_freq: f64,
    max_freq: f64,
    log_min: f64,
    log_range: f64,
    geometry: CanvasGeometry,
    generation: u64,
    caches: RefCell<AxisCaches>,
}

impl AxisMapper {
    pub fn new(min_freq: f32, max_freq: f32, geometry: CanvasGeometry) -> Self {
        let min_freq = f64::from(min_freq);
        let max_freq = f64::from(max_freq);
        let log_min = min_freq.log10();
        let log_range = max_freq.log10() - log_min;
        Self {
            min_freq,
            max_freq,
            log_min,
            log_range,
            geometry,
            generation: 1,
            caches: RefCell::new(AxisCaches::default()),
        }
    }

    pub fn min_freq(&self) -> f32 {
        self.min_freq as f32
    }

    pub fn max_freq(&self) -> f32 {
        self.max_freq as f32
    }

    pub fn geometry(&self) -> &CanvasGeometry {
        &self.geometry
    }

    /// Counter bumped on every geometry change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replaces the geometry; returns `true` when anything changed.
    pub fn set_geometry(&mut self, geometry: CanvasGeometry) -> bool {
        if geometry == self.geometry {
            return false;
        }
        self.geometry = geometry;
        self.generation = self.generation.wrapping_add(1);
        true
    }

    pub fn set_size(&mut self, css_width: f32, css_height: f32) -> bool {
        self.set_geometry(CanvasGeometry {
            css_width: sanitize_extent(css_width),
            css_height: sanitize_extent(css_height),
            ..self.geometry
        })
    }

    pub fn set_device_pixel_ratio(&mut self, ratio: f32) -> bool {
        self.set_geometry(CanvasGeometry {
            device_pixel_ratio: sanitize_ratio(ratio),
            ..self.geometry
        })
    }

    pub fn set_padding(&mut self, padding: Padding) -> bool {
        self.set_geometry(CanvasGeometry {
            padding,
            ..self.geometry
        })
    }

    pub fn freq_to_x(&self, freq: f64) -> f64 {
        let mut caches = self.caches.borrow_mut();
        caches.sync(self.generation);
        memoize(&mut caches.freq_to_x, freq.to_bits(), || {
            let geometry = &self.geometry;
            let t = (freq.log10() - self.log_min) / self.log_range;
            f64::from(geometry.padding.left) + t * f64::from(geometry.drawable_width())
        })
    }

    pub fn x_to_freq(&self, x: f64) -> f64 {
        let mut caches = self.caches.borrow_mut();
        caches.sync(self.generation);
        memoize(&mut caches.x_to_freq, x.to_bits(), || {
            let geometry = &self.geometry;
            let width = f64::from(geometry.drawable_width());
            if width <= 0.0 {
                return self.min_freq;
            }
            let t = (x - f64::from(geometry.padding.left)) / width;
            10f64.powf(self.log_min + t * self.log_range)
        })
    }

    pub fn db_to_y(&self, db: f64, range: DbRange) -> f64 {
        let (min_key, max_key) = range.key();
        let mut caches = self.caches.borrow_mut();
        caches.sync(self.generation);
        memoize(&mut caches.db_to_y, (db.to_bits(), min_key, max_key), || {
            let geometry = &self.geometry;
            let span = f64::from(range.span());
            let t = (db - f64::from(range.min_db)) / span;
            f64::from(geometry.padding.top_bottom)
                + (1.0 - t) * f64::from(geometry.drawable_height())
        })
    }

    pub fn y_to_db(&self, y: f64, range: DbRange) -> f64 {
        let (min_key, max_key) = range.key();
        let mut caches = self.caches.borrow_mut();
        caches.sync(self.generation);
        memoize(&mut caches.y_to_db, (y.to_bits(), min_key, max_key), || {
            let geometry = &self.geometry;
            let height = f64::from(geometry.drawable_height());
            if height <= 0.0 {
                return f64::from(range.min_db);
            }
            let t = (y - f64::from(geometry.padding.top_bottom)) / height;
            f64::from(range.max_db) - t * f64::from(range.span())
        })
    }

    /// Logarithmically spaced frequency for `index` out of `total` bins.
    pub fn bin_to_freq(&self, index: usize, total: usize) -> f64 {
        if total <= 1 {
            return self.min_freq;
        }
        let t = index as f64 / (total - 1) as f64;
        self.min_freq * (self.max_freq / self.min_freq).powf(t)
    }

    #[cfg(test)]
    fn cached_entries(&self) -> usize {
        let caches = self.caches.borrow();
        caches.freq_to_x.len() + caches.x_to_freq.len() + caches.db_to_y.len() + caches.y_to_db.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> AxisMapper {
        AxisMapper::new(20.0, 20_000.0, CanvasGeometry::new(1_100.0, 440.0, 2.0))
    }

    #[test]
    fn frequency_round_trip_is_exact_within_tolerance() {
        let axis = mapper();
        let mut freq = 20.0f64;
        while freq <= 20_000.0 {
            let back = axis.x_to_freq(axis.freq_to_x(freq));
            assert!(
                ((back - freq) / freq).abs() < 1.0e-6,
                "round trip drifted at {freq} Hz: {back}"
            );
            freq *= 1.173;
        }
    }

    #[test]
    fn level_round_trip_is_exact_within_tolerance() {
        let axis = mapper();
        let range = DbRange::new(-120.0, 0.0);
        for step in 0..=120 {
            let db = -120.0 + f64::from(step);
            let back = axis.y_to_db(axis.db_to_y(db, range), range);
            assert!(
                (back - db).abs() <= 1.0e-6 * db.abs().max(1.0),
                "round trip drifted at {db} dB: {back}"
            );
        }
    }

    #[test]
    fn mapping_edges_follow_padding() {
        let axis = mapper();
        let geometry = *axis.geometry();
        assert!((axis.freq_to_x(20.0) - f64::from(LEFT_PADDING)).abs() < 1.0e-9);
        let right = f64::from(geometry.css_width - RIGHT_PADDING);
        assert!((axis.freq_to_x(20_000.0) - right).abs() < 1.0e-6);

        let range = DbRange::new(-120.0, 0.0);
        assert!((axis.db_to_y(0.0, range) - f64::from(TOP_BOTTOM_PADDING)).abs() < 1.0e-9);
        let bottom = f64::from(geometry.css_height - TOP_BOTTOM_PADDING);
        assert!((axis.db_to_y(-120.0, range) - bottom).abs() < 1.0e-9);
    }

    #[test]
    fn frequency_is_increasing_and_level_is_decreasing() {
        let axis = mapper();
        let range = DbRange::new(-90.0, 6.0);
        let mut last_x = f64::NEG_INFINITY;
        let mut last_y = f64::INFINITY;
        for index in 0..500 {
            let x = axis.freq_to_x(axis.bin_to_freq(index, 500));
            assert!(x > last_x, "x not increasing at bin {index}");
            last_x = x;

            let y = axis.db_to_y(-90.0 + index as f64 * 0.19, range);
            assert!(y < last_y, "y not decreasing at step {index}");
            last_y = y;
        }
    }

    #[test]
    fn bin_frequencies_span_the_axis() {
        let axis = mapper();
        assert!((axis.bin_to_freq(0, 64) - 20.0).abs() < 1.0e-9);
        assert!((axis.bin_to_freq(63, 64) - 20_000.0).abs() < 1.0e-6);
        assert!((axis.bin_to_freq(0, 1) - 20.0).abs() < 1.0e-9);
    }

    #[test]
    fn geometry_change_invalidates_every_cache() {
        let mut axis = mapper();
        let range = DbRange::new(-120.0, 0.0);
        let before = axis.freq_to_x(1_000.0);
        axis.x_to_freq(500.0);
        axis.db_to_y(-60.0, range);
        axis.y_to_db(100.0, range);
        assert_eq!(axis.cached_entries(), 4);

        let generation = axis.generation();
        assert!(axis.set_size(800.0, 440.0));
        assert_eq!(axis.generation(), generation + 1);

        let after = axis.freq_to_x(1_000.0);
        assert!(after < before, "stale cached x returned after resize");
        assert_eq!(axis.cached_entries(), 1);

        assert!(!axis.set_size(800.0, 440.0));
        assert_eq!(axis.generation(), generation + 1);
    }

    #[test]
    fn device_pixel_ratio_change_bumps_generation() {
        let mut axis = mapper();
        let generation = axis.generation();
        assert!(axis.set_device_pixel_ratio(1.5));
        assert_eq!(axis.generation(), generation + 1);
        assert_eq!(axis.geometry().device_pixel_ratio, 1.5);
    }

    #[test]
    fn degenerate_geometry_does_not_divide_by_zero() {
        let axis = AxisMapper::new(20.0, 20_000.0, CanvasGeometry::default());
        assert!(axis.geometry().is_degenerate());
        assert!(axis.x_to_freq(10.0).is_finite());
        assert!(axis.y_to_db(10.0, DbRange::new(-120.0, 0.0)).is_finite());
    }
}
