//! Spectrum layers and the registry that owns them.

use super::axis::{AxisMapper, DbRange};
use super::color::CssColor;
use super::decay::DecayBin;
use super::peak::PeakHold;
use super::preferences::SpectrumColors;
use super::reduce::downsample_peaks;
use super::scale::{DEFAULT_SCALE_ID, ScaleRegistry};
use super::tilt::apply_tilt;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::time::{Duration, Instant};
use tracing::debug;

/// Initial bin count of a freshly added layer.
pub const LAYER_BUFFER_LEN: usize = 8192;

const DEFAULT_LINE_WIDTH: f32 = 2.0;
const DEFAULT_PEAK_WIDTH: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct LayerStyle {
    pub line_color: CssColor,
    pub fill_color: CssColor,
    pub peak_color: CssColor,
    pub line_width: f32,
    pub peak_width: f32,
    pub show_fill: bool,
    pub show_peak: bool,
}

impl LayerStyle {
    pub fn from_colors(colors: &SpectrumColors) -> Self {
        Self {
            line_color: colors.line_color.clone(),
            fill_color: colors.fill_color.clone(),
            peak_color: colors.peak_color.clone(),
            line_width: DEFAULT_LINE_WIDTH,
            peak_width: DEFAULT_PEAK_WIDTH,
            show_fill: true,
            show_peak: true,
        }
    }
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self::from_colors(&SpectrumColors::default())
    }
}

/// Caller-provided layer fields. Omitted fields keep their current (or
/// default) value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayerOptions {
    pub line_color: Option<CssColor>,
    pub fill_color: Option<CssColor>,
    pub peak_color: Option<CssColor>,
    pub line_width: Option<f32>,
    pub peak_width: Option<f32>,
    pub show_fill: Option<bool>,
    pub show_peak: Option<bool>,
    pub is_peak_hold_enabled: Option<bool>,
    pub is_decay_enabled: Option<bool>,
    pub scale_id: Option<String>,
    pub z_index: Option<i32>,
    pub tilt: Option<f32>,
}

/// Everything an update needs to know about the chart around the layer.
#[derive(Debug, Clone, Copy)]
pub struct IngestContext<'a> {
    pub axis: &'a AxisMapper,
    pub range: DbRange,
    pub default_tilt: f32,
    /// Downsampling target for the current plot width.
    pub target: usize,
}

#[derive(Debug, Default)]
struct Scratch {
    raw: Vec<f32>,
    frequencies: Vec<f32>,
    tilted: Vec<f32>,
    values: Vec<f32>,
}

#[derive(Debug)]
pub struct SpectrumLayer {
    id: String,
    pub style: LayerStyle,
    scale_id: String,
    z_index: i32,
    seq: u64,
    tilt: Option<f32>,
    peak_hold_enabled: bool,
    decay_enabled: bool,
    bins: Vec<DecayBin>,
    peaks: PeakHold,
    /// Frequency of every display bin, parallel to `bins`. Empty until the
    /// first update.
    frequencies: Vec<f32>,
    dirty: bool,
    scratch: Scratch,
}

impl SpectrumLayer {
    fn new(id: &str, style: LayerStyle, seq: u64, floor: f32) -> Self {
        Self {
            id: id.to_string(),
            style,
            scale_id: DEFAULT_SCALE_ID.to_string(),
            z_index: i32::try_from(seq).unwrap_or(i32::MAX),
            seq,
            tilt: None,
            peak_hold_enabled: true,
            decay_enabled: true,
            bins: vec![DecayBin::settled(floor); LAYER_BUFFER_LEN],
            peaks: PeakHold::new(LAYER_BUFFER_LEN, floor),
            frequencies: Vec::new(),
            dirty: true,
            scratch: Scratch::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn scale_id(&self) -> &str {
        &self.scale_id
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn tilt(&self) -> Option<f32> {
        self.tilt
    }

    pub fn is_peak_hold_enabled(&self) -> bool {
        self.peak_hold_enabled
    }

    pub fn is_decay_enabled(&self) -> bool {
        self.decay_enabled
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn bins(&self) -> &[DecayBin] {
        &self.bins
    }

    pub fn peaks(&self) -> &[f32] {
        self.peaks.values()
    }

    pub fn levels(&self) -> impl Iterator<Item = f32> + '_ {
        self.bins.iter().map(|bin| bin.current)
    }

    /// Frequency of display bin `index`. Layers that have not received data
    /// yet spread their bins over the axis.
    pub fn frequency_at(&self, index: usize, axis: &AxisMapper) -> f32 {
        match self.frequencies.get(index) {
            Some(&freq) if self.frequencies.len() == self.bins.len() => freq,
            _ => axis.bin_to_freq(index, self.bins.len()) as f32,
        }
    }

    pub fn apply_options(&mut self, options: &LayerOptions, scales: &ScaleRegistry) {
        let style = &mut self.style;
        if let Some(color) = &options.line_color {
            style.line_color = color.clone();
        }
        if let Some(color) = &options.fill_color {
            style.fill_color = color.clone();
        }
        if let Some(color) = &options.peak_color {
            style.peak_color = color.clone();
        }
        if let Some(width) = options.line_width.filter(|w| w.is_finite() && *w > 0.0) {
            style.line_width = width;
        }
        if let Some(width) = options.peak_width.filter(|w| w.is_finite() && *w > 0.0) {
            style.peak_width = width;
        }
        if let Some(show) = options.show_fill {
            style.show_fill = show;
        }
        if let Some(show) = options.show_peak {
            style.show_peak = show;
        }
        if let Some(enabled) = options.is_peak_hold_enabled {
            self.peak_hold_enabled = enabled;
        }
        if let Some(enabled) = options.is_decay_enabled {
            self.decay_enabled = enabled;
        }
        if let Some(z_index) = options.z_index {
            self.z_index = z_index;
        }
        if let Some(tilt) = options.tilt.filter(|t| t.is_finite()) {
            self.tilt = Some(tilt);
        }
        if let Some(scale_id) = &options.scale_id {
            if scales.contains(scale_id) {
                self.scale_id = scale_id.clone();
            } else {
                debug!(
                    "[chart] layer {:?} requested unknown scale {scale_id:?}; using default",
                    self.id
                );
                self.scale_id = DEFAULT_SCALE_ID.to_string();
            }
        }
        self.dirty = true;
    }

    pub fn set_tilt(&mut self, tilt: Option<f32>) {
        self.tilt = tilt;
    }

    pub fn set_scale(&mut self, scale_id: &str) {
        self.scale_id = scale_id.to_string();
        self.dirty = true;
    }

    /// Runs one magnitude frame through tilt, downsampling, peak hold and
    /// decay. Non-finite magnitudes are treated as silence.
    pub fn ingest(
        &mut self,
        magnitudes: &[f32],
        frequencies: Option<&[f32]>,
        context: IngestContext<'_>,
        now: Instant,
    ) {
        let floor = context.range.min_db;
        let scratch = &mut self.scratch;

        scratch.raw.clear();
        scratch.raw.extend(
            magnitudes
                .iter()
                .map(|&db| if db.is_finite() { db } else { floor }),
        );

        scratch.frequencies.clear();
        match frequencies {
            Some(explicit) if explicit.len() == magnitudes.len() => {
                scratch.frequencies.extend_from_slice(explicit);
            }
            other => {
                if let Some(explicit) = other {
                    debug!(
                        "[chart] layer {:?}: {} frequencies for {} bins; synthesizing",
                        self.id,
                        explicit.len(),
                        magnitudes.len()
                    );
                }
                let total = magnitudes.len();
                scratch.frequencies.extend(
                    (0..total).map(|index| context.axis.bin_to_freq(index, total) as f32),
                );
            }
        }

        let tilt = self.tilt.unwrap_or(context.default_tilt);
        apply_tilt(
            &scratch.raw,
            &scratch.frequencies,
            context.axis.min_freq(),
            tilt,
            &mut scratch.tilted,
        );

        downsample_peaks(
            &scratch.tilted,
            &scratch.frequencies,
            context.target,
            &mut scratch.values,
            &mut self.frequencies,
        );

        let len = scratch.values.len();
        if len != self.bins.len() {
            debug!(
                "[chart] layer {:?} reallocating {} -> {len} bins",
                self.id,
                self.bins.len()
            );
            self.bins.clear();
            self.bins.resize(len, DecayBin::settled(floor));
            self.peaks.reallocate(len, floor);
        }

        if self.peak_hold_enabled {
            self.peaks.accumulate(&scratch.values);
        }

        for (bin, &level) in self.bins.iter_mut().zip(&scratch.values) {
            bin.ingest(level, now, self.decay_enabled, context.range);
        }

        self.dirty = true;
    }

    /// Moves every decaying bin forward to `now`.
    pub fn advance_decay(&mut self, now: Instant, time_constant: Duration, range: DbRange) {
        if !self.decay_enabled {
            return;
        }
        let mut moving = false;
        for bin in &mut self.bins {
            if bin.is_holding() {
                bin.advance(now, time_constant, range);
                moving = true;
            }
        }
        if moving {
            self.dirty = true;
        }
    }

    pub fn reset_peak_hold(&mut self, floor: f32) {
        self.peaks.reset(floor);
        self.dirty = true;
    }
}

#[derive(Debug, Default)]
pub struct LayerRegistry {
    layers: FxHashMap<String, SpectrumLayer>,
    next_seq: u64,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.layers.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&SpectrumLayer> {
        self.layers.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut SpectrumLayer> {
        self.layers.get_mut(id)
    }

    /// Creates (or recreates) layer `id` from `defaults` merged with `options`.
    pub fn add(
        &mut self,
        id: &str,
        options: &LayerOptions,
        defaults: &LayerStyle,
        scales: &ScaleRegistry,
    ) -> &mut SpectrumLayer {
        let seq = self.next_seq;
        self.next_seq += 1;

        let requested = options.scale_id.as_deref().unwrap_or(DEFAULT_SCALE_ID);
        let floor = scales.resolve(requested).floor();

        let mut layer = SpectrumLayer::new(id, defaults.clone(), seq, floor);
        layer.apply_options(options, scales);
        match self.layers.entry(id.to_string()) {
            Entry::Occupied(mut entry) => {
                debug!("[chart] replacing layer {id:?}");
                entry.insert(layer);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(layer),
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.layers.remove(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpectrumLayer> {
        self.layers.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SpectrumLayer> {
        self.layers.values_mut()
    }

    /// Layers in drawing order: ascending z-index, insertion order on ties.
    pub fn ordered(&self) -> Vec<&SpectrumLayer> {
        let mut layers: Vec<_> = self.layers.values().collect();
        layers.sort_by_key(|layer| (layer.z_index, layer.seq));
        layers
    }

    /// Points every layer on `from` at the default scale instead.
    pub fn reassign_scale(&mut self, from: &str) -> usize {
        let mut moved = 0;
        for layer in self.layers.values_mut().filter(|l| l.scale_id == from) {
            layer.set_scale(DEFAULT_SCALE_ID);
            moved += 1;
        }
        moved
    }
}
