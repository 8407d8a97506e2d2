//! Named vertical dB axes.

use super::axis::DbRange;
use super::color::CssColor;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_SCALE_ID: &str = "default";
pub const DEFAULT_MIN_DB: f32 = -120.0;
pub const DEFAULT_MAX_DB: f32 = 0.0;
const DEFAULT_SCALE_COLOR: &str = "#000000";
const ADDED_SCALE_COLOR: &str = "#888888";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalePosition {
    #[default]
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scale {
    pub id: String,
    pub range: DbRange,
    pub position: ScalePosition,
    pub color: CssColor,
}

impl Scale {
    fn default_scale(range: DbRange) -> Self {
        Self {
            id: DEFAULT_SCALE_ID.to_string(),
            range,
            position: ScalePosition::Left,
            color: CssColor::new(DEFAULT_SCALE_COLOR),
        }
    }

    /// The axis floor every layer on this scale decays toward.
    pub fn floor(&self) -> f32 {
        self.range.min_db
    }

    pub fn is_symmetric(&self) -> bool {
        self.range.max_db > 0.0 && self.range.min_db == -self.range.max_db
    }
}

/// Caller-provided scale fields; anything omitted takes the scale defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScaleOptions {
    pub min_db: Option<f32>,
    pub max_db: Option<f32>,
    pub position: Option<ScalePosition>,
    pub color: Option<CssColor>,
}

fn valid_range(min_db: f32, max_db: f32) -> bool {
    min_db.is_finite() && max_db.is_finite() && min_db < max_db
}

/// Ordered collection of scales; the default scale is always first.
#[derive(Debug, Clone)]
pub struct ScaleRegistry {
    scales: Vec<Scale>,
}

impl ScaleRegistry {
    pub fn new(min_db: f32, max_db: f32) -> Self {
        let range = if valid_range(min_db, max_db) {
            DbRange::new(min_db, max_db)
        } else {
            warn!("[chart] invalid default scale range {min_db}..{max_db}; using defaults");
            DbRange::new(DEFAULT_MIN_DB, DEFAULT_MAX_DB)
        };
        Self {
            scales: vec![Scale::default_scale(range)],
        }
    }

    pub fn default_scale(&self) -> &Scale {
        &self.scales[0]
    }

    pub fn get(&self, id: &str) -> Option<&Scale> {
        self.scales.iter().find(|scale| scale.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Scale> {
        self.scales.iter_mut().find(|scale| scale.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Looks up `id`, falling back to the default scale.
    pub fn resolve(&self, id: &str) -> &Scale {
        self.get(id).unwrap_or_else(|| self.default_scale())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scale> {
        self.scales.iter()
    }

    pub fn right_positioned(&self) -> usize {
        self.scales
            .iter()
            .filter(|scale| scale.position == ScalePosition::Right)
            .count()
    }

    /// Adds `id`, or updates it in place when it already exists.
    pub fn add(&mut self, id: &str, options: &ScaleOptions) {
        let existing = self.get(id).cloned();
        let base = existing.unwrap_or_else(|| Scale {
            id: id.to_string(),
            range: DbRange::new(DEFAULT_MIN_DB, DEFAULT_MAX_DB),
            position: ScalePosition::Right,
            color: CssColor::new(ADDED_SCALE_COLOR),
        });

        let min_db = options.min_db.unwrap_or(base.range.min_db);
        let max_db = options.max_db.unwrap_or(base.range.max_db);
        let range = if valid_range(min_db, max_db) {
            DbRange::new(min_db, max_db)
        } else {
            warn!("[chart] scale {id:?} rejected range {min_db}..{max_db}");
            base.range
        };

        let scale = Scale {
            id: base.id,
            range,
            position: options.position.unwrap_or(base.position),
            color: options.color.clone().unwrap_or(base.color),
        };

        match self.get_mut(id) {
            Some(slot) => *slot = scale,
            None => self.scales.push(scale),
        }
    }

    /// Removes a named scale. The default scale cannot be removed.
    pub fn remove(&mut self, id: &str) -> bool {
        if id == DEFAULT_SCALE_ID {
            debug!("[chart] refusing to remove the default scale");
            return false;
        }
        let before = self.scales.len();
        self.scales.retain(|scale| scale.id != id);
        self.scales.len() != before
    }

    /// Moves the floor of `id` (or the default scale). Values that would not
    /// stay below the ceiling are rejected.
    pub fn set_min_db(&mut self, id: Option<&str>, value: f32) -> bool {
        let id = id.unwrap_or(DEFAULT_SCALE_ID);
        let Some(scale) = self.get_mut(id) else {
            debug!("[chart] set_min_db on unknown scale {id:?}");
            return false;
        };
        if !valid_range(value, scale.range.max_db) {
            warn!(
                "[chart] min dB {value} is not below max dB {} for scale {id:?}",
                scale.range.max_db
            );
            return false;
        }
        scale.range.min_db = value;
        true
    }

    pub fn set_max_db(&mut self, id: Option<&str>, value: f32) -> bool {
        let id = id.unwrap_or(DEFAULT_SCALE_ID);
        let Some(scale) = self.get_mut(id) else {
            debug!("[chart] set_max_db on unknown scale {id:?}");
            return false;
        };
        if !valid_range(scale.range.min_db, value) {
            warn!(
                "[chart] max dB {value} is not above min dB {} for scale {id:?}",
                scale.range.min_db
            );
            return false;
        }
        scale.range.max_db = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scale_always_exists_and_cannot_be_removed() {
        let mut registry = ScaleRegistry::new(-100.0, 10.0);
        assert!(!registry.remove(DEFAULT_SCALE_ID));
        assert_eq!(registry.default_scale().range, DbRange::new(-100.0, 10.0));
        assert_eq!(registry.resolve("missing").id, DEFAULT_SCALE_ID);
    }

    #[test]
    fn added_scales_merge_over_right_hand_defaults() {
        let mut registry = ScaleRegistry::new(-120.0, 0.0);
        registry.add(
            "gain",
            &ScaleOptions {
                min_db: Some(-24.0),
                max_db: Some(24.0),
                ..Default::default()
            },
        );

        let scale = registry.get("gain").unwrap();
        assert_eq!(scale.range, DbRange::new(-24.0, 24.0));
        assert_eq!(scale.position, ScalePosition::Right);
        assert!(scale.is_symmetric());
        assert_eq!(registry.right_positioned(), 1);

        assert!(registry.remove("gain"));
        assert!(!registry.remove("gain"));
        assert_eq!(registry.right_positioned(), 0);
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let mut registry = ScaleRegistry::new(-120.0, 0.0);
        assert!(!registry.set_min_db(None, 5.0));
        assert_eq!(registry.default_scale().range.min_db, -120.0);
        assert!(registry.set_min_db(None, -90.0));
        assert_eq!(registry.default_scale().range.min_db, -90.0);
        assert!(!registry.set_min_db(Some("nope"), -60.0));

        registry.add(
            "broken",
            &ScaleOptions {
                min_db: Some(10.0),
                max_db: Some(-10.0),
                ..Default::default()
            },
        );
        assert_eq!(
            registry.get("broken").unwrap().range,
            DbRange::new(DEFAULT_MIN_DB, DEFAULT_MAX_DB)
        );
    }

    #[test]
    fn scale_options_deserialize_from_camel_case() {
        let options: ScaleOptions =
            serde_json::from_str(r##"{"minDb": -60, "position": "left", "color": "#f00"}"##)
                .unwrap();
        assert_eq!(options.min_db, Some(-60.0));
        assert_eq!(options.position, Some(ScalePosition::Left));
        assert!(options.max_db.is_none());
    }
}
