//! Control messages for a chart driven from outside the process.

use super::SpectrumChart;
use super::layer::LayerOptions;
use super::scale::ScaleOptions;
use anyhow::{Result, bail};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// One chart API call, tagged by `command` in its JSON form, e.g.
/// `{"command": "setMinDb", "value": -90, "scaleId": "default"}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ChartCommand {
    AddSpectrum {
        id: String,
        #[serde(default)]
        options: LayerOptions,
    },
    RemoveSpectrum {
        id: String,
    },
    AddScale {
        id: String,
        #[serde(default)]
        options: ScaleOptions,
    },
    RemoveScale {
        id: String,
    },
    SetMinDb {
        value: f32,
        scale_id: Option<String>,
    },
    SetMaxDb {
        value: f32,
        scale_id: Option<String>,
    },
    SetTilt {
        value: f32,
        layer_id: Option<String>,
    },
    /// Milliseconds.
    SetDecayTime {
        value: f32,
    },
    UpdatePreferences {
        patch: Value,
    },
    ResetPeakHold {
        layer_id: Option<String>,
    },
    Pause {
        paused: bool,
    },
}

impl SpectrumChart {
    pub fn apply(&mut self, command: ChartCommand) -> Result<()> {
        match command {
            ChartCommand::AddSpectrum { id, options } => self.add_spectrum(&id, &options),
            ChartCommand::RemoveSpectrum { id } => self.remove_spectrum(&id),
            ChartCommand::AddScale { id, options } => self.add_scale(&id, &options),
            ChartCommand::RemoveScale { id } => {
                if !self.remove_scale(&id) {
                    bail!("scale {id:?} cannot be removed");
                }
            }
            ChartCommand::SetMinDb { value, scale_id } => {
                self.set_min_db(value, scale_id.as_deref())
            }
            ChartCommand::SetMaxDb { value, scale_id } => {
                self.set_max_db(value, scale_id.as_deref())
            }
            ChartCommand::SetTilt { value, layer_id } => self.set_tilt(value, layer_id.as_deref()),
            ChartCommand::SetDecayTime { value } => {
                if !value.is_finite() || value < 0.0 {
                    bail!("invalid decay time {value} ms");
                }
                self.set_decay_time(Duration::from_secs_f32(value / 1_000.0));
            }
            ChartCommand::UpdatePreferences { patch } => self.update_preferences(&patch)?,
            ChartCommand::ResetPeakHold { layer_id } => self.reset_peak_hold(layer_id.as_deref()),
            ChartCommand::Pause { paused } => self.pause(paused),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartConfig;
    use crate::chart::scale::DEFAULT_SCALE_ID;
    use serde_json::json;
    use std::time::Instant;

    fn command(value: Value) -> ChartCommand {
        serde_json::from_value(value).expect("valid command")
    }

    fn chart() -> SpectrumChart {
        let mut chart = SpectrumChart::new(ChartConfig::default());
        chart.resize(800.0, 400.0);
        chart
    }

    #[test]
    fn parses_camel_case_commands() {
        let parsed = command(json!({ "command": "setMinDb", "value": -90, "scaleId": "gain" }));
        assert!(matches!(
            parsed,
            ChartCommand::SetMinDb { value, scale_id: Some(ref id) } if value == -90.0 && id == "gain"
        ));

        let parsed = command(json!({ "command": "setTilt", "value": 4.5 }));
        assert!(matches!(parsed, ChartCommand::SetTilt { layer_id: None, .. }));

        let parsed = command(json!({ "command": "addSpectrum", "id": "side" }));
        assert!(matches!(parsed, ChartCommand::AddSpectrum { ref id, .. } if id == "side"));

        assert!(serde_json::from_value::<ChartCommand>(json!({ "command": "explode" })).is_err());
        assert!(serde_json::from_value::<ChartCommand>(json!({ "command": "pause" })).is_err());
    }

    #[test]
    fn layer_and_scale_lifecycle() {
        let mut chart = chart();
        chart
            .apply(command(json!({
                "command": "addScale",
                "id": "gain",
                "options": { "minDb": -24, "maxDb": 24, "position": "right" }
            })))
            .unwrap();
        chart
            .apply(command(json!({
                "command": "addSpectrum",
                "id": "gr",
                "options": { "scaleId": "gain" }
            })))
            .unwrap();
        assert_eq!(chart.layer("gr").unwrap().scale_id(), "gain");

        chart
            .apply(command(json!({ "command": "setMaxDb", "value": 12, "scaleId": "gain" })))
            .unwrap();
        assert_eq!(chart.scales().get("gain").unwrap().range.max_db, 12.0);

        chart.apply(command(json!({ "command": "removeScale", "id": "gain" }))).unwrap();
        assert_eq!(chart.layer("gr").unwrap().scale_id(), DEFAULT_SCALE_ID);
        assert!(chart.apply(command(json!({ "command": "removeScale", "id": "default" }))).is_err());

        chart.apply(command(json!({ "command": "removeSpectrum", "id": "gr" }))).unwrap();
        assert!(chart.layer("gr").is_none());
    }

    #[test]
    fn settings_commands_reach_the_chart() {
        let mut chart = chart();
        chart.add_spectrum("main", &LayerOptions::default());

        chart.apply(command(json!({ "command": "setMinDb", "value": -90 }))).unwrap();
        assert_eq!(chart.scales().default_scale().range.min_db, -90.0);

        chart.apply(command(json!({ "command": "setDecayTime", "value": 250 }))).unwrap();
        assert_eq!(chart.decay_time(), Duration::from_millis(250));
        assert!(chart.apply(command(json!({ "command": "setDecayTime", "value": -1 }))).is_err());

        chart.apply(command(json!({ "command": "setTilt", "value": 3 }))).unwrap();
        assert_eq!(chart.tilt(), 3.0);

        chart
            .apply(command(json!({ "command": "updatePreferences", "patch": { "showFps": false } })))
            .unwrap();
        assert!(!chart.preferences().show_fps);

        chart.apply(command(json!({ "command": "pause", "paused": true }))).unwrap();
        assert!(chart.is_paused());

        chart.update_spectrum("main", &[-5.0; 4], None, Instant::now());
        chart.apply(command(json!({ "command": "resetPeakHold", "layerId": "main" }))).unwrap();
        assert!(chart.layer("main").unwrap().peaks().iter().all(|&v| v == -90.0));
    }
}
