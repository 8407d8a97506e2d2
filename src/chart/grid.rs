//! Static grid layout: frequency verticals, dB horizontals and their labels.

use super::axis::{AxisMapper, DbRange, PlotRect, SCALE_COLUMN_WIDTH};
use super::color::Rgba;
use super::scale::{Scale, ScalePosition, ScaleRegistry};

/// Minimum vertical distance between dB grid lines.
const MIN_LINE_SPACING: f32 = 30.0;
const DB_STEP_LADDER: [f32; 8] = [3.0, 6.0, 9.0, 12.0, 15.0, 18.0, 21.0, 24.0];
const LABEL_MARGIN: f32 = 5.0;
const EMPHASIZED_FREQUENCIES: [f32; 3] = [100.0, 1_000.0, 10_000.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelBaseline {
    Middle,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub from: [f32; 2],
    pub to: [f32; 2],
    pub emphasized: bool,
}

impl GridLine {
    pub fn is_vertical(&self) -> bool {
        self.from[0] == self.to[0]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridLabel {
    pub text: String,
    pub position: [f32; 2],
    pub align: LabelAlign,
    pub baseline: LabelBaseline,
    pub emphasized: bool,
    /// Scale color for secondary scales; `None` uses the text color.
    pub color: Option<Rgba>,
}

/// Everything needed to paint the grid layer for one geometry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridModel {
    pub lines: Vec<GridLine>,
    pub labels: Vec<GridLabel>,
}

impl GridModel {
    pub fn build(axis: &AxisMapper, scales: &ScaleRegistry) -> Self {
        let geometry = axis.geometry();
        if geometry.is_degenerate() {
            return Self::default();
        }

        let mut model = Self::default();
        model.push_frequency_grid(axis);

        let plot = geometry.plot_rect();
        let default_scale = scales.default_scale();
        model.push_level_grid(axis, default_scale, plot);

        let mut right_column = 0usize;
        let mut left_column = 0usize;
        for scale in scales.iter().skip(1) {
            let (x, align) = match scale.position {
                ScalePosition::Right => {
                    let x = plot.right + LABEL_MARGIN + SCALE_COLUMN_WIDTH * right_column as f32;
                    right_column += 1;
                    (x, LabelAlign::Left)
                }
                ScalePosition::Left => {
                    let x = plot.left + LABEL_MARGIN + SCALE_COLUMN_WIDTH * left_column as f32;
                    left_column += 1;
                    (x, LabelAlign::Left)
                }
            };
            model.push_scale_labels(axis, scale, x, align, Some(scale.color.rgba()));
        }

        model
    }

    fn push_frequency_grid(&mut self, axis: &AxisMapper) {
        let geometry = axis.geometry();
        let plot = geometry.plot_rect();
        let label_y = geometry.css_height - LABEL_MARGIN;

        for freq in grid_frequencies(axis.min_freq(), axis.max_freq()) {
            let x = geometry.snap(axis.freq_to_x(f64::from(freq)) as f32);
            let edge = freq == axis.min_freq() || freq == axis.max_freq();
            let emphasized = edge || EMPHASIZED_FREQUENCIES.contains(&freq);

            self.lines.push(GridLine {
                from: [x, plot.top],
                to: [x, plot.bottom],
                emphasized,
            });

            if emphasized {
                self.labels.push(GridLabel {
                    text: format_frequency_label(freq),
                    position: [x, label_y],
                    align: LabelAlign::Center,
                    baseline: LabelBaseline::Bottom,
                    emphasized,
                    color: None,
                });
            }
        }
    }

    fn push_level_grid(&mut self, axis: &AxisMapper, scale: &Scale, plot: PlotRect) {
        let geometry = axis.geometry();
        let step = db_step(scale.range, geometry.drawable_height());

        for (db, emphasized) in level_marks(scale.range, step) {
            let y = geometry.snap(axis.db_to_y(f64::from(db), scale.range) as f32);
            self.lines.push(GridLine {
                from: [plot.left, y],
                to: [plot.right, y],
                emphasized,
            });
        }

        self.push_scale_labels(axis, scale, plot.left - LABEL_MARGIN, LabelAlign::Right, None);
    }

    fn push_scale_labels(
        &mut self,
        axis: &AxisMapper,
        scale: &Scale,
        x: f32,
        align: LabelAlign,
        color: Option<Rgba>,
    ) {
        let step = db_step(scale.range, axis.geometry().drawable_height());
        for (db, emphasized) in level_marks(scale.range, step) {
            let y = axis.db_to_y(f64::from(db), scale.range) as f32;
            self.labels.push(GridLabel {
                text: format_db_label(db),
                position: [x, y],
                align,
                baseline: LabelBaseline::Middle,
                emphasized,
                color,
            });
        }
    }
}

/// Vertical grid frequencies from `min_freq` to `max_freq`, both edges
/// included.
pub fn grid_frequencies(min_freq: f32, max_freq: f32) -> Vec<f32> {
    let decades = (2..=9)
        .map(|i| i as f32 * 10.0)
        .chain((1..=9).map(|i| i as f32 * 100.0))
        .chain((1..=10).map(|i| i as f32 * 1_000.0));

    let mut freqs = vec![min_freq];
    freqs.extend(decades.filter(|&f| f > min_freq && f < max_freq));
    freqs.push(max_freq);
    freqs
}

/// Grid values for `range` at `step`, paired with whether they are the
/// emphasized range edges.
pub fn level_marks(range: DbRange, step: f32) -> Vec<(f32, bool)> {
    let mut marks = vec![(range.min_db, true)];
    if step > 0.0 {
        let tolerance = step * 1.0e-3;
        let mut k = 1;
        loop {
            let db = range.min_db + step * k as f32;
            if db >= range.max_db - tolerance {
                break;
            }
            marks.push((db, false));
            k += 1;
        }
    }
    marks.push((range.max_db, true));
    marks
}

/// Spacing between dB grid lines for `range` drawn over `available_height`
/// CSS pixels.
pub fn db_step(range: DbRange, available_height: f32) -> f32 {
    let max_divisions = ((available_height / MIN_LINE_SPACING).floor() as i64).max(1);
    let span = range.span();

    let step = DB_STEP_LADDER
        .iter()
        .copied()
        .find(|&step| (span / step).ceil() as i64 <= max_divisions)
        .unwrap_or(DB_STEP_LADDER[DB_STEP_LADDER.len() - 1]);

    let symmetric = range.max_db > 0.0 && range.min_db == -range.max_db;
    if !symmetric {
        return step;
    }

    let divides = |step: f32| {
        let ratio = range.max_db / step;
        (ratio - ratio.round()).abs() < 1.0e-4
    };
    let fitting = DB_STEP_LADDER.iter().copied().find(|&step| {
        divides(step) && 2 * (range.max_db / step).round() as i64 <= max_divisions
    });
    if let Some(step) = fitting {
        return step;
    }
    if let Some(step) = DB_STEP_LADDER.iter().rev().copied().find(|&step| divides(step)) {
        return step;
    }

    // No ladder value divides the half range.
    let mut half_divisions = (range.max_db / step).ceil() as i64;
    if half_divisions * 2 > max_divisions {
        half_divisions = (max_divisions / 2).max(1);
    }
    range.max_db / half_divisions as f32
}

pub fn format_frequency_label(freq: f32) -> String {
    if freq >= 1_000.0 {
        let khz = freq / 1_000.0;
        if khz.fract() == 0.0 {
            format!("{}K", khz as u32)
        } else {
            format!("{khz:.1}K")
        }
    } else {
        format!("{}", freq.round() as u32)
    }
}

pub fn format_db_label(db: f32) -> String {
    let rounded = db.round();
    if (db - rounded).abs() < 0.05 {
        format!("{}", rounded as i32)
    } else {
        format!("{db:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::axis::CanvasGeometry;
    use crate::chart::scale::ScaleOptions;

    #[test]
    fn step_is_the_smallest_that_fits() {
        let range = DbRange::new(-120.0, 0.0);
        // 12 divisions available: 9 dB would need 14, 12 dB needs 10.
        assert_eq!(db_step(range, 360.0), 12.0);
        // Plenty of room.
        assert_eq!(db_step(DbRange::new(-30.0, 0.0), 600.0), 3.0);
        // Nothing fits.
        assert_eq!(db_step(range, 60.0), 24.0);
    }

    #[test]
    fn symmetric_scales_label_zero_with_balanced_halves() {
        let range = DbRange::new(-24.0, 24.0);
        let step = db_step(range, 360.0);
        assert_eq!(step, 6.0);

        let marks = level_marks(range, step);
        assert!(marks.iter().any(|(db, _)| db.abs() < 1.0e-4), "0 dB missing: {marks:?}");
        let below = marks.iter().filter(|(db, _)| *db < -1.0e-4).count();
        let above = marks.iter().filter(|(db, _)| *db > 1.0e-4).count();
        assert_eq!(below, above);
    }

    #[test]
    fn cramped_symmetric_scale_keeps_a_ladder_step() {
        let range = DbRange::new(-30.0, 30.0);
        // Only two divisions fit; the largest ladder divisor of 30 wins.
        let step = db_step(range, 75.0);
        assert_eq!(step, 15.0);
        let marks = level_marks(range, step);
        assert_eq!(marks.len(), 5);
    }

    #[test]
    fn symmetric_steps_stay_on_the_ladder_when_one_divides() {
        let range = DbRange::new(-21.0, 21.0);
        let step = db_step(range, 360.0);
        assert_eq!(step, 21.0);
        let labels: Vec<_> = level_marks(range, step)
            .iter()
            .map(|(db, _)| format_db_label(*db))
            .collect();
        assert_eq!(labels, ["-21", "0", "21"]);

        let range = DbRange::new(-12.0, 12.0);
        let step = db_step(range, 360.0);
        assert!(DB_STEP_LADDER.contains(&step), "step {step} off the ladder");
        assert_eq!(step, 3.0);
    }

    #[test]
    fn symmetric_range_without_ladder_divisor_uses_whole_db_steps() {
        // No multiple of 3 divides 20.
        let range = DbRange::new(-20.0, 20.0);
        let step = db_step(range, 360.0);
        assert_eq!(step, 5.0);
        let marks = level_marks(range, step);
        assert!(marks.iter().all(|(db, _)| db.fract() == 0.0), "{marks:?}");
        assert!(marks.iter().any(|(db, _)| *db == 0.0));
    }

    #[test]
    fn level_marks_emphasize_only_the_edges() {
        let marks = level_marks(DbRange::new(-120.0, 0.0), 12.0);
        assert_eq!(marks.first(), Some(&(-120.0, true)));
        assert_eq!(marks.last(), Some(&(0.0, true)));
        assert_eq!(marks.len(), 11);
        assert!(marks[1..marks.len() - 1].iter().all(|(_, emphasized)| !emphasized));
    }

    #[test]
    fn frequency_grid_covers_each_decade_once() {
        let freqs = grid_frequencies(20.0, 20_000.0);
        assert_eq!(freqs.first(), Some(&20.0));
        assert_eq!(freqs.last(), Some(&20_000.0));
        assert_eq!(freqs.iter().filter(|&&f| f == 20.0).count(), 1);
        assert!(freqs.contains(&90.0) && freqs.contains(&900.0) && freqs.contains(&10_000.0));
        assert!(freqs.windows(2).all(|w| w[0] < w[1]));
        // 20 + 30..90 (7) + 100..900 (9) + 1k..10k (10) + 20k
        assert_eq!(freqs.len(), 28);
    }

    #[test]
    fn frequency_labels_use_k_suffix() {
        assert_eq!(format_frequency_label(20.0), "20");
        assert_eq!(format_frequency_label(100.0), "100");
        assert_eq!(format_frequency_label(1_000.0), "1K");
        assert_eq!(format_frequency_label(10_000.0), "10K");
        assert_eq!(format_frequency_label(20_000.0), "20K");
        assert_eq!(format_db_label(-4.8), "-4.8");
        assert_eq!(format_db_label(-12.0), "-12");
    }

    #[test]
    fn model_labels_the_emphasized_frequencies() {
        let axis = AxisMapper::new(20.0, 20_000.0, CanvasGeometry::new(800.0, 400.0, 1.0));
        let scales = ScaleRegistry::new(-120.0, 0.0);
        let model = GridModel::build(&axis, &scales);

        let freq_labels: Vec<_> = model
            .labels
            .iter()
            .filter(|label| label.baseline == LabelBaseline::Bottom)
            .map(|label| label.text.as_str())
            .collect();
        assert_eq!(freq_labels, ["20", "100", "1K", "10K", "20K"]);

        let verticals = model.lines.iter().filter(|line| line.is_vertical()).count();
        assert_eq!(verticals, 28);
    }

    #[test]
    fn grid_lines_sit_on_device_pixel_centres() {
        let axis = AxisMapper::new(20.0, 20_000.0, CanvasGeometry::new(801.0, 413.0, 2.0));
        let scales = ScaleRegistry::new(-120.0, 0.0);
        let model = GridModel::build(&axis, &scales);
        for line in &model.lines {
            let device = line.from[0] * 2.0;
            assert!((device - device.floor() - 0.5).abs() < 1.0e-3 || !line.is_vertical());
        }
    }

    #[test]
    fn secondary_scales_get_their_own_colored_column() {
        let mut axis = AxisMapper::new(20.0, 20_000.0, CanvasGeometry::new(800.0, 400.0, 1.0));
        let mut scales = ScaleRegistry::new(-120.0, 0.0);
        scales.add(
            "gain",
            &ScaleOptions {
                min_db: Some(-24.0),
                max_db: Some(24.0),
                color: Some("#ff0000".into()),
                ..Default::default()
            },
        );
        axis.set_padding(crate::chart::axis::Padding::with_right_scales(1));
        let model = GridModel::build(&axis, &scales);
        let plot = axis.geometry().plot_rect();

        let colored: Vec<_> = model.labels.iter().filter(|l| l.color.is_some()).collect();
        assert!(!colored.is_empty());
        assert!(colored.iter().all(|l| l.position[0] > plot.right));
        assert!(colored.iter().any(|l| l.text == "0"));
    }

    #[test]
    fn degenerate_geometry_has_no_grid() {
        let axis = AxisMapper::new(20.0, 20_000.0, CanvasGeometry::new(50.0, 30.0, 1.0));
        let model = GridModel::build(&axis, &ScaleRegistry::new(-120.0, 0.0));
        assert!(model.lines.is_empty() && model.labels.is_empty());
    }
}
