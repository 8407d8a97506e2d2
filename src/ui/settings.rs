//! Start-up settings read from `settings.json` in the user config directory.
//! The file is never written back.

use crate::chart::layer::LayerOptions;
use crate::chart::scale::{DEFAULT_MAX_DB, DEFAULT_MIN_DB, ScaleOptions};
use crate::chart::scheduler::DEFAULT_FRAME_BUDGET;
use crate::chart::{ChartConfig, DEFAULT_DECAY_TIME, SpectrumChart};
use crate::feed::synthetic::{MAIN_LAYER, REFERENCE_LAYER};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

const SETTINGS_FILE_NAME: &str = "settings.json";
const APP_DIR_NAME: &str = "spectrum-chart";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartSettings {
    /// Milliseconds for a bin to fall from its start level to the floor.
    pub decay_time: f32,
    pub min_db: f32,
    pub max_db: f32,
    pub tilt: f32,
    pub tooltips: bool,
    pub frame_budget_ms: u64,
    /// Patch merged into the default preferences.
    pub preferences: Value,
    pub scales: BTreeMap<String, ScaleOptions>,
    pub layers: BTreeMap<String, LayerOptions>,
}

impl Default for ChartSettings {
    fn default() -> Self {
        let mut layers = BTreeMap::new();
        layers.insert(MAIN_LAYER.to_string(), LayerOptions::default());
        layers.insert(
            REFERENCE_LAYER.to_string(),
            LayerOptions {
                line_color: Some("#8e8e8e".into()),
                line_width: Some(1.0),
                show_fill: Some(false),
                show_peak: Some(false),
                is_peak_hold_enabled: Some(false),
                is_decay_enabled: Some(false),
                z_index: Some(-1),
                ..LayerOptions::default()
            },
        );

        Self {
            decay_time: DEFAULT_DECAY_TIME.as_millis() as f32,
            min_db: DEFAULT_MIN_DB,
            max_db: DEFAULT_MAX_DB,
            tilt: 0.0,
            tooltips: true,
            frame_budget_ms: DEFAULT_FRAME_BUDGET.as_millis() as u64,
            preferences: Value::Null,
            scales: BTreeMap::new(),
            layers,
        }
    }
}

impl ChartSettings {
    /// Loads the settings file, falling back to defaults when it is missing
    /// or unreadable.
    pub fn load_or_default() -> Self {
        let path = config_dir().join(SETTINGS_FILE_NAME);
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => {
                info!("[settings] loaded {path:?}");
                settings
            }
            Err(err) => {
                warn!("[settings] {err:#}; using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("failed to read {path:?}"))?;
        Self::from_json(&contents).with_context(|| format!("failed to parse {path:?}"))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn chart_config(&self) -> ChartConfig {
        let decay_ms = if self.decay_time.is_finite() {
            self.decay_time.max(0.0)
        } else {
            DEFAULT_DECAY_TIME.as_millis() as f32
        };

        ChartConfig {
            decay_time: Duration::from_secs_f32(decay_ms / 1_000.0),
            min_db: self.min_db,
            max_db: self.max_db,
            tilt: self.tilt,
            tooltips: self.tooltips,
            frame_budget: Duration::from_millis(self.frame_budget_ms.max(1)),
            ..ChartConfig::default()
        }
    }

    /// Builds a chart with every configured scale, layer and preference.
    pub fn build_chart(&self) -> SpectrumChart {
        let mut chart = SpectrumChart::new(self.chart_config());

        for (id, options) in &self.scales {
            chart.add_scale(id, options);
        }
        for (id, options) in &self.layers {
            chart.add_spectrum(id, options);
        }
        if !self.preferences.is_null() {
            if let Err(err) = chart.update_preferences(&self.preferences) {
                warn!("[settings] ignoring preferences: {err:#}");
            }
        }
        chart
    }
}

fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(dir).join(APP_DIR_NAME)
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".config").join(APP_DIR_NAME)
    } else {
        PathBuf::from(format!(".{APP_DIR_NAME}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::scale::ScalePosition;

    #[test]
    fn empty_object_yields_defaults() {
        let settings = ChartSettings::from_json("{}").expect("valid json");
        assert_eq!(settings.decay_time, 5_000.0);
        assert_eq!((settings.min_db, settings.max_db), (-120.0, 0.0));
        assert!(settings.tooltips);
        assert!(settings.layers.contains_key(MAIN_LAYER));
        assert!(settings.layers.contains_key(REFERENCE_LAYER));
    }

    #[test]
    fn reads_camel_case_fields() {
        let settings = ChartSettings::from_json(
            r##"{
                "decayTime": 1000,
                "minDb": -90,
                "frameBudgetMs": 33,
                "tooltips": false,
                "scales": { "rel": { "minDb": -24, "maxDb": 24, "position": "right" } },
                "layers": { "main": { "scaleId": "rel", "lineColor": "#ff0000" } }
            }"##,
        )
        .expect("valid settings");

        assert_eq!(settings.decay_time, 1_000.0);
        assert_eq!(settings.frame_budget_ms, 33);
        assert!(!settings.tooltips);
        assert_eq!(settings.scales["rel"].position, Some(ScalePosition::Right));
        assert_eq!(settings.layers.len(), 1);

        let config = settings.chart_config();
        assert_eq!(config.decay_time, Duration::from_millis(1_000));
        assert_eq!(config.min_db, -90.0);
        assert_eq!(config.frame_budget, Duration::from_millis(33));
    }

    #[test]
    fn malformed_settings_are_errors() {
        assert!(ChartSettings::from_json(r#"{"decayTime": "slow"}"#).is_err());
        assert!(ChartSettings::from_json("[").is_err());
    }

    #[test]
    fn build_chart_registers_scales_and_layers() {
        let settings = ChartSettings::from_json(
            r#"{
                "scales": { "rel": { "minDb": -24, "maxDb": 24, "position": "right" } },
                "layers": { "main": { "scaleId": "rel" } },
                "preferences": { "showFps": false }
            }"#,
        )
        .expect("valid settings");

        let chart = settings.build_chart();
        assert!(chart.scales().contains("rel"));
        assert_eq!(chart.layer("main").map(|layer| layer.scale_id()), Some("rel"));
        assert!(!chart.preferences().show_fps);
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = ChartSettings::load_from(Path::new("/nonexistent/spectrum-chart.json"))
            .expect_err("missing file");
        assert!(format!("{err:#}").contains("spectrum-chart.json"));
    }
}
