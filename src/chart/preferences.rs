//! Appearance preferences and partial-update merging.

use super::color::CssColor;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub grid: GridPreferences,
    pub text: TextPreferences,
    pub background: CssColor,
    pub spectrum: SpectrumColors,
    pub show_fps: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            grid: GridPreferences::default(),
            text: TextPreferences::default(),
            background: CssColor::new("#ffffff"),
            spectrum: SpectrumColors::default(),
            show_fps: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridPreferences {
    pub normal_line: LineStyle,
    pub emphasized_line: LineStyle,
}

impl Default for GridPreferences {
    fn default() -> Self {
        Self {
            normal_line: LineStyle {
                width: 0.5,
                color: CssColor::new("#ccc"),
            },
            emphasized_line: LineStyle {
                width: 2.0,
                color: CssColor::new("#999"),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineStyle {
    pub width: f32,
    pub color: CssColor,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            width: 1.0,
            color: CssColor::new("#ccc"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextPreferences {
    pub color: CssColor,
    pub normal: FontStyle,
    pub emphasized: FontStyle,
}

impl Default for TextPreferences {
    fn default() -> Self {
        Self {
            color: CssColor::new("#000"),
            normal: FontStyle {
                font: "Arial".to_string(),
                size: 12.0,
                weight: FontWeight::Normal,
            },
            emphasized: FontStyle {
                font: "Arial".to_string(),
                size: 14.0,
                weight: FontWeight::Bold,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontStyle {
    /// Family name; `monospace` selects the monospace face, anything else the
    /// default sans face.
    pub font: String,
    pub size: f32,
    pub weight: FontWeight,
}

impl Default for FontStyle {
    fn default() -> Self {
        Self {
            font: "Arial".to_string(),
            size: 12.0,
            weight: FontWeight::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

/// Colors given to layers that do not choose their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpectrumColors {
    pub line_color: CssColor,
    pub fill_color: CssColor,
    pub peak_color: CssColor,
}

impl Default for SpectrumColors {
    fn default() -> Self {
        Self {
            line_color: CssColor::new("#2196F3"),
            fill_color: CssColor::new("rgba(33, 150, 243, 0.3)"),
            peak_color: CssColor::new("#FF5722"),
        }
    }
}

/// Chart-level settings that may ride along in a preference patch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatchDirectives {
    /// Decay time constant in milliseconds.
    pub decay_time: Option<f32>,
    pub tilt: Option<f32>,
    /// Per-layer style overrides keyed by layer id.
    pub layers: BTreeMap<String, Value>,
}

impl PatchDirectives {
    pub fn from_patch(patch: &Value) -> Result<Self> {
        serde_json::from_value(patch.clone()).context("invalid preference directives")
    }
}

/// Recursively merges `patch` into `target`: objects merge key by key, any
/// other value replaces what was there.
pub fn merge_json(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

/// Produces a copy of `current` with `patch` deep-merged over it.
pub fn apply_patch<T>(current: &T, patch: &Value) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut tree = serde_json::to_value(current).context("failed to serialize preferences")?;
    merge_json(&mut tree, patch);
    serde_json::from_value(tree).context("preference patch does not fit the preference tree")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::color::Rgba;
    use serde_json::json;

    #[test]
    fn nested_patch_only_touches_named_leaves() {
        let current = Preferences::default();
        let patched = apply_patch(
            &current,
            &json!({ "grid": { "normalLine": { "color": "#123456" } }, "showFps": false }),
        )
        .unwrap();

        assert_eq!(patched.grid.normal_line.color.as_str(), "#123456");
        assert_eq!(patched.grid.normal_line.width, current.grid.normal_line.width);
        assert_eq!(patched.grid.emphasized_line, current.grid.emphasized_line);
        assert_eq!(patched.text, current.text);
        assert!(!patched.show_fps);
    }

    #[test]
    fn mistyped_patch_is_reported_instead_of_applied() {
        let current = Preferences::default();
        let result = apply_patch(&current, &json!({ "grid": { "normalLine": { "width": "wide" } } }));
        assert!(result.is_err());
    }

    #[test]
    fn bad_color_in_patch_degrades_to_black() {
        let patched = apply_patch(&Preferences::default(), &json!({ "background": "#zzzzzz" })).unwrap();
        assert_eq!(patched.background.rgba(), Rgba::BLACK);
    }

    #[test]
    fn directives_are_extracted_from_the_same_patch() {
        let patch = json!({
            "decayTime": 2500,
            "layers": { "main": { "lineWidth": 3 } },
            "background": "#fff"
        });
        let directives = PatchDirectives::from_patch(&patch).unwrap();
        assert_eq!(directives.decay_time, Some(2_500.0));
        assert!(directives.tilt.is_none());
        assert!(directives.layers.contains_key("main"));
    }

    #[test]
    fn merge_replaces_non_object_values() {
        let mut target = json!({ "a": { "b": 1, "c": [1, 2] } });
        merge_json(&mut target, &json!({ "a": { "c": [3] }, "d": true }));
        assert_eq!(target, json!({ "a": { "b": 1, "c": [3] }, "d": true }));
    }
}
