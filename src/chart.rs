//! Spectrum chart model: layers, scales, decay and everything needed to turn
//! incoming magnitude frames into drawable curves.

pub mod axis;
pub mod color;
pub mod command;
pub mod decay;
pub mod grid;
pub mod layer;
pub mod peak;
pub mod preferences;
pub mod reduce;
pub mod scale;
pub mod scheduler;
pub mod tilt;
pub mod tooltip;

use anyhow::{Context, Result};
use axis::{AxisMapper, CanvasGeometry, DbRange, Padding, PlotRect};
use color::Rgba;
use grid::GridModel;
use layer::{IngestContext, LayerOptions, LayerRegistry, LayerStyle, SpectrumLayer};
use preferences::{PatchDirectives, Preferences, apply_patch};
use reduce::{CurveShaping, display_target, interpolate_points, reduce_points};
use scale::{DEFAULT_MAX_DB, DEFAULT_MIN_DB, ScaleOptions, ScaleRegistry};
use scheduler::{DEFAULT_FRAME_BUDGET, FpsCounter, FrameScheduler, TickSource};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tooltip::{Tooltip, TooltipState};
use tracing::{debug, info};

pub const MIN_FREQUENCY: f32 = 20.0;
pub const MAX_FREQUENCY: f32 = 20_000.0;
pub const DEFAULT_DECAY_TIME: Duration = Duration::from_millis(5_000);

#[derive(Debug, Clone)]
pub struct ChartConfig {
    pub min_freq: f32,
    pub max_freq: f32,
    pub decay_time: Duration,
    pub min_db: f32,
    pub max_db: f32,
    /// Default slope in dB/octave for layers without their own.
    pub tilt: f32,
    pub tooltips: bool,
    pub frame_budget: Duration,
    pub preferences: Preferences,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            min_freq: MIN_FREQUENCY,
            max_freq: MAX_FREQUENCY,
            decay_time: DEFAULT_DECAY_TIME,
            min_db: DEFAULT_MIN_DB,
            max_db: DEFAULT_MAX_DB,
            tilt: 0.0,
            tooltips: true,
            frame_budget: DEFAULT_FRAME_BUDGET,
            preferences: Preferences::default(),
        }
    }
}

/// One polyline ready for the GPU, in CSS pixels relative to the chart origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub points: Vec<[f32; 2]>,
    pub color: Rgba,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerFrame {
    pub id: String,
    /// Fill color when the area under the curve is shaded.
    pub fill: Option<Rgba>,
    pub line: Stroke,
    pub peak: Option<Stroke>,
}

/// Drawable snapshot of every layer, in z-order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartFrame {
    pub plot: Option<PlotRect>,
    /// Bottom of the plot; fills extend down to it.
    pub baseline: f32,
    pub layers: Vec<LayerFrame>,
}

impl ChartFrame {
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[derive(Debug, Default)]
struct TraceScratch {
    mapped: Vec<[f32; 2]>,
    reduced: Vec<[f32; 2]>,
}

#[derive(Debug)]
pub struct SpectrumChart {
    axis: AxisMapper,
    scales: ScaleRegistry,
    layers: LayerRegistry,
    preferences: Preferences,
    decay_time: Duration,
    tilt: f32,
    shaping: CurveShaping,
    scheduler: FrameScheduler,
    fps: FpsCounter,
    tooltip: TooltipState,
    grid: Arc<GridModel>,
    frame: Arc<ChartFrame>,
    frame_dirty: bool,
    scratch: TraceScratch,
}

impl SpectrumChart {
    pub fn new(config: ChartConfig) -> Self {
        let scales = ScaleRegistry::new(config.min_db, config.max_db);
        let axis = AxisMapper::new(config.min_freq, config.max_freq, CanvasGeometry::default());
        let grid = Arc::new(GridModel::build(&axis, &scales));

        Self {
            axis,
            scales,
            layers: LayerRegistry::new(),
            preferences: config.preferences,
            decay_time: config.decay_time,
            tilt: if config.tilt.is_finite() { config.tilt } else { 0.0 },
            shaping: CurveShaping::default(),
            scheduler: FrameScheduler::new(config.frame_budget),
            fps: FpsCounter::default(),
            tooltip: TooltipState::new(config.tooltips),
            grid,
            frame: Arc::new(ChartFrame::default()),
            frame_dirty: true,
            scratch: TraceScratch::default(),
        }
    }

    pub fn axis(&self) -> &AxisMapper {
        &self.axis
    }

    pub fn scales(&self) -> &ScaleRegistry {
        &self.scales
    }

    pub fn layer(&self, id: &str) -> Option<&SpectrumLayer> {
        self.layers.get(id)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn decay_time(&self) -> Duration {
        self.decay_time
    }

    pub fn tilt(&self) -> f32 {
        self.tilt
    }

    pub fn grid(&self) -> Arc<GridModel> {
        Arc::clone(&self.grid)
    }

    pub fn frame(&self) -> Arc<ChartFrame> {
        Arc::clone(&self.frame)
    }

    /// Frames per second when the overlay is enabled.
    pub fn fps(&self) -> Option<u32> {
        self.preferences.show_fps.then(|| self.fps.fps())
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.visible()
    }

    pub fn add_spectrum(&mut self, id: &str, options: &LayerOptions) {
        let defaults = LayerStyle::from_colors(&self.preferences.spectrum);
        self.layers.add(id, options, &defaults, &self.scales);
        self.frame_dirty = true;
        debug!("[chart] added layer {id:?}");
    }

    pub fn remove_spectrum(&mut self, id: &str) {
        if self.layers.remove(id) {
            self.frame_dirty = true;
            debug!("[chart] removed layer {id:?}");
        } else {
            debug!("[chart] remove_spectrum: unknown layer {id:?}");
        }
    }

    /// Feeds one magnitude frame (dB per bin) into layer `id`.
    pub fn update_spectrum(
        &mut self,
        id: &str,
        magnitudes: &[f32],
        frequencies: Option<&[f32]>,
        now: Instant,
    ) {
        let Some(layer) = self.layers.get_mut(id) else {
            debug!("[chart] update_spectrum: unknown layer {id:?}");
            return;
        };

        let context = IngestContext {
            axis: &self.axis,
            range: self.scales.resolve(layer.scale_id()).range,
            default_tilt: self.tilt,
            target: display_target(self.axis.geometry().drawable_width()),
        };
        layer.ingest(magnitudes, frequencies, context, now);
    }

    pub fn add_scale(&mut self, id: &str, options: &ScaleOptions) {
        self.scales.add(id, options);
        self.refresh_layout();
    }

    /// Removes scale `id`; layers drawn against it fall back to the default.
    pub fn remove_scale(&mut self, id: &str) -> bool {
        if !self.scales.remove(id) {
            return false;
        }
        let moved = self.layers.reassign_scale(id);
        if moved > 0 {
            debug!("[chart] {moved} layer(s) moved from removed scale {id:?} to default");
        }
        self.refresh_layout();
        true
    }

    pub fn set_min_db(&mut self, value: f32, scale_id: Option<&str>) {
        if self.scales.set_min_db(scale_id, value) {
            self.refresh_layout();
        }
    }

    pub fn set_max_db(&mut self, value: f32, scale_id: Option<&str>) {
        if self.scales.set_max_db(scale_id, value) {
            self.refresh_layout();
        }
    }

    /// Sets the slope for one layer, or the chart default when `layer_id` is
    /// `None`. Takes effect on the next update.
    pub fn set_tilt(&mut self, value: f32, layer_id: Option<&str>) {
        if !value.is_finite() {
            debug!("[chart] ignoring non-finite tilt {value}");
            return;
        }
        match layer_id {
            None => self.tilt = value,
            Some(id) => match self.layers.get_mut(id) {
                Some(layer) => layer.set_tilt(Some(value)),
                None => debug!("[chart] set_tilt: unknown layer {id:?}"),
            },
        }
    }

    pub fn set_decay_time(&mut self, decay_time: Duration) {
        self.decay_time = decay_time;
    }

    /// Deep-merges `patch` into the preferences. The patch may also carry
    /// `decayTime`, `tilt` and per-layer overrides under `layers`. Nothing is
    /// applied unless the whole patch is valid.
    pub fn update_preferences(&mut self, patch: &Value) -> Result<()> {
        let directives = PatchDirectives::from_patch(patch)?;
        let preferences = apply_patch(&self.preferences, patch)?;

        let mut overrides = Vec::with_capacity(directives.layers.len());
        for (id, value) in &directives.layers {
            let options: LayerOptions = serde_json::from_value(value.clone())
                .with_context(|| format!("invalid overrides for layer {id:?}"))?;
            overrides.push((id, options));
        }

        self.preferences = preferences;
        if let Some(ms) = directives.decay_time.filter(|ms| ms.is_finite()) {
            self.decay_time = Duration::from_secs_f32(ms.max(0.0) / 1_000.0);
        }
        if let Some(tilt) = directives.tilt {
            self.set_tilt(tilt, None);
        }
        for (id, options) in overrides {
            match self.layers.get_mut(id) {
                Some(layer) => layer.apply_options(&options, &self.scales),
                None => debug!("[chart] preference overrides for unknown layer {id:?}"),
            }
        }

        self.refresh_layout();
        Ok(())
    }

    /// Resets held peaks of one layer, or of every layer.
    pub fn reset_peak_hold(&mut self, layer_id: Option<&str>) {
        let scales = &self.scales;
        match layer_id {
            Some(id) => match self.layers.get_mut(id) {
                Some(layer) => {
                    let floor = scales.resolve(layer.scale_id()).floor();
                    layer.reset_peak_hold(floor);
                }
                None => debug!("[chart] reset_peak_hold: unknown layer {id:?}"),
            },
            None => {
                for layer in self.layers.iter_mut() {
                    let floor = scales.resolve(layer.scale_id()).floor();
                    layer.reset_peak_hold(floor);
                }
            }
        }
    }

    /// Applies a new container size in CSS pixels.
    pub fn resize(&mut self, css_width: f32, css_height: f32) -> bool {
        let changed = self.axis.set_size(css_width, css_height);
        if changed {
            self.refresh_layout();
        }
        changed
    }

    pub fn set_device_pixel_ratio(&mut self, ratio: f32) -> bool {
        let changed = self.axis.set_device_pixel_ratio(ratio);
        if changed {
            self.refresh_layout();
        }
        changed
    }

    pub fn pause(&mut self, paused: bool) {
        self.scheduler.pause(paused);
        info!("[chart] {}", if paused { "paused" } else { "resumed" });
    }

    pub fn is_paused(&self) -> bool {
        self.scheduler.is_paused()
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
        info!("[chart] stopped");
    }

    pub fn tick_source(&self) -> Option<TickSource> {
        self.scheduler.tick_source()
    }

    /// Handles one scheduler tick. Returns `true` when a new frame was built.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.scheduler.should_draw() {
            return false;
        }
        let started = Instant::now();
        self.advance(now);
        self.fps.tick(now);
        self.scheduler.record(started.elapsed());
        true
    }

    /// Moves decay forward to `now` and rebuilds the frame if anything moved.
    pub fn advance(&mut self, now: Instant) -> Arc<ChartFrame> {
        for layer in self.layers.iter_mut() {
            let range = self.scales.resolve(layer.scale_id()).range;
            layer.advance_decay(now, self.decay_time, range);
        }

        let dirty = self.frame_dirty || self.layers.iter().any(SpectrumLayer::is_dirty);
        if !dirty {
            return self.frame();
        }

        self.frame = Arc::new(self.build_frame());
        self.frame_dirty = false;
        for layer in self.layers.iter_mut() {
            layer.mark_clean();
        }
        self.frame()
    }

    pub fn pointer_moved(&mut self, position: [f32; 2], now: Instant) {
        self.tooltip.pointer_moved(position, &self.axis, now);
    }

    pub fn pointer_left(&mut self) {
        self.tooltip.pointer_left();
    }

    /// Shows a pending tooltip once its delay has elapsed.
    pub fn poll_tooltip(&mut self, now: Instant) -> bool {
        let range = self.scales.default_scale().range;
        self.tooltip.poll(now, &self.axis, range)
    }

    pub fn tooltip_pending(&self) -> bool {
        self.tooltip.is_pending()
    }

    fn refresh_layout(&mut self) {
        self.axis
            .set_padding(Padding::with_right_scales(self.scales.right_positioned()));
        self.grid = Arc::new(GridModel::build(&self.axis, &self.scales));
        self.frame_dirty = true;
    }

    fn build_frame(&mut self) -> ChartFrame {
        let geometry = self.axis.geometry();
        if geometry.is_degenerate() {
            return ChartFrame::default();
        }
        let plot = geometry.plot_rect();

        let mut frame = ChartFrame {
            plot: Some(plot),
            baseline: plot.bottom,
            layers: Vec::with_capacity(self.layers.len()),
        };

        for layer in self.layers.ordered() {
            let range = self.scales.resolve(layer.scale_id()).range;
            let style = &layer.style;

            let line_points = trace(
                &self.axis,
                layer,
                layer.levels(),
                range,
                &self.shaping,
                &mut self.scratch,
            );

            let peak = (layer.is_peak_hold_enabled() && style.show_peak).then(|| Stroke {
                points: trace(
                    &self.axis,
                    layer,
                    layer.peaks().iter().copied(),
                    range,
                    &self.shaping,
                    &mut self.scratch,
                ),
                color: style.peak_color.rgba(),
                width: style.peak_width,
            });

            frame.layers.push(LayerFrame {
                id: layer.id().to_string(),
                fill: style.show_fill.then(|| style.fill_color.rgba()),
                line: Stroke {
                    points: line_points,
                    color: style.line_color.rgba(),
                    width: style.line_width,
                },
                peak,
            });
        }

        frame
    }
}

/// Maps `values` of `layer` into CSS pixels and shapes the polyline.
fn trace(
    axis: &AxisMapper,
    layer: &SpectrumLayer,
    values: impl Iterator<Item = f32>,
    range: DbRange,
    shaping: &CurveShaping,
    scratch: &mut TraceScratch,
) -> Vec<[f32; 2]> {
    scratch.mapped.clear();
    for (index, db) in values.enumerate() {
        let freq = layer.frequency_at(index, axis);
        if freq <= 0.0 || !freq.is_finite() {
            continue;
        }
        let x = axis.freq_to_x(f64::from(freq)) as f32;
        let y = axis.db_to_y(f64::from(range.clamp(db)), range) as f32;
        scratch.mapped.push([x, y]);
    }

    reduce_points(&scratch.mapped, shaping, &mut scratch.reduced);
    let mut out = Vec::with_capacity(scratch.reduced.len() * (shaping.base_steps + 1));
    interpolate_points(&scratch.reduced, shaping, &mut out);
    out
}
