//! Hover readout that appears after the pointer rests over the plot.

use super::axis::{AxisMapper, DbRange};
use std::time::{Duration, Instant};

pub const TOOLTIP_DELAY: Duration = Duration::from_millis(500);
const TOOLTIP_OFFSET: f32 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub text: String,
    /// Top-left corner of the label in CSS pixels.
    pub position: [f32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pending {
    position: [f32; 2],
    since: Instant,
}

#[derive(Debug, Clone)]
pub struct TooltipState {
    enabled: bool,
    delay: Duration,
    pending: Option<Pending>,
    visible: Option<Tooltip>,
}

impl TooltipState {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            delay: TOOLTIP_DELAY,
            pending: None,
            visible: None,
        }
    }

    pub fn visible(&self) -> Option<&Tooltip> {
        self.visible.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Hides the label and restarts the rest timer. Positions outside the
    /// plot area cancel instead.
    pub fn pointer_moved(&mut self, position: [f32; 2], axis: &AxisMapper, now: Instant) {
        if !self.enabled {
            return;
        }
        self.visible = None;
        let plot = axis.geometry().plot_rect();
        self.pending = (!axis.geometry().is_degenerate() && plot.contains(position[0], position[1]))
            .then_some(Pending {
                position,
                since: now,
            });
    }

    pub fn pointer_left(&mut self) {
        self.pending = None;
        self.visible = None;
    }

    /// Shows the pending label once the pointer has rested long enough.
    /// Returns `true` when visibility changed.
    pub fn poll(&mut self, now: Instant, axis: &AxisMapper, range: DbRange) -> bool {
        if !self.enabled {
            return false;
        }
        let Some(pending) = self.pending else {
            return false;
        };
        if now.saturating_duration_since(pending.since) < self.delay {
            return false;
        }

        self.pending = None;
        let [x, y] = pending.position;
        let freq = axis.x_to_freq(f64::from(x));
        let db = axis.y_to_db(f64::from(y), range);
        self.visible = Some(Tooltip {
            text: format_readout(freq, db),
            position: [x + TOOLTIP_OFFSET, y + TOOLTIP_OFFSET],
        });
        true
    }
}

pub fn format_readout(freq: f64, db: f64) -> String {
    let freq = if freq >= 1_000.0 {
        format!("{:.1}kHz", freq / 1_000.0)
    } else {
        format!("{}Hz", freq.round() as i64)
    };
    format!("{freq}, {db:.1}dB")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::axis::CanvasGeometry;

    const RANGE: DbRange = DbRange {
        min_db: -120.0,
        max_db: 0.0,
    };

    fn axis() -> AxisMapper {
        AxisMapper::new(20.0, 20_000.0, CanvasGeometry::new(800.0, 400.0, 1.0))
    }

    #[test]
    fn label_appears_after_the_pointer_rests() {
        let axis = axis();
        let mut tooltip = TooltipState::new(true);
        let t0 = Instant::now();

        tooltip.pointer_moved([400.0, 200.0], &axis, t0);
        assert!(!tooltip.poll(t0 + Duration::from_millis(499), &axis, RANGE));
        assert!(tooltip.visible().is_none());

        assert!(tooltip.poll(t0 + Duration::from_millis(500), &axis, RANGE));
        let label = tooltip.visible().unwrap();
        assert_eq!(label.position, [410.0, 210.0]);
        assert!(label.text.ends_with("dB"), "{}", label.text);
    }

    #[test]
    fn movement_restarts_the_delay_and_hides_the_label() {
        let axis = axis();
        let mut tooltip = TooltipState::new(true);
        let t0 = Instant::now();

        tooltip.pointer_moved([300.0, 100.0], &axis, t0);
        tooltip.poll(t0 + Duration::from_millis(600), &axis, RANGE);
        assert!(tooltip.visible().is_some());

        let t1 = t0 + Duration::from_millis(700);
        tooltip.pointer_moved([301.0, 100.0], &axis, t1);
        assert!(tooltip.visible().is_none());
        assert!(!tooltip.poll(t1 + Duration::from_millis(300), &axis, RANGE));
        assert!(tooltip.poll(t1 + Duration::from_millis(500), &axis, RANGE));
    }

    #[test]
    fn leaving_or_exiting_the_plot_cancels() {
        let axis = axis();
        let mut tooltip = TooltipState::new(true);
        let t0 = Instant::now();

        tooltip.pointer_moved([400.0, 200.0], &axis, t0);
        tooltip.pointer_left();
        assert!(!tooltip.poll(t0 + Duration::from_secs(1), &axis, RANGE));

        tooltip.pointer_moved([10.0, 200.0], &axis, t0);
        assert!(!tooltip.is_pending());
    }

    #[test]
    fn disabled_tooltips_ignore_everything() {
        let axis = axis();
        let mut tooltip = TooltipState::new(false);
        let t0 = Instant::now();
        tooltip.pointer_moved([400.0, 200.0], &axis, t0);
        assert!(!tooltip.poll(t0 + Duration::from_secs(2), &axis, RANGE));
        assert!(tooltip.visible().is_none());
    }

    #[test]
    fn readout_switches_to_khz() {
        assert_eq!(format_readout(440.4, -12.345), "440Hz, -12.3dB");
        assert_eq!(format_readout(1_260.0, -3.0), "1.3kHz, -3.0dB");
    }
}
