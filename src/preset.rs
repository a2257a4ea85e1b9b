//! Named style presets kept in a JSON file.
//!
//! Presets are saved under free-form names; the reader's quick slots use
//! `Style1`, `Style2`, ... and bulk import fills the lowest free slot.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static SLOT_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^Style(\d+)$").unwrap());

/// Keys that make a JSON object count as a style preset.
const STYLE_KEYS: [&str; 7] = [
    "color",
    "backgroundColor",
    "fontSize",
    "fontWeight",
    "textShadow",
    "fontFamily",
    "scrollSettings",
];

/// A CSS value stored either as a number or as text (`"23px"`, `"bold"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CssValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePreset {
    pub color: Option<String>,
    pub background_color: Option<String>,
    pub font_size: Option<CssValue>,
    pub font_weight: Option<CssValue>,
    /// Blur radius of the text shadow, in px.
    pub text_shadow: Option<f64>,
    pub font_family: Option<String>,
    pub scroll_settings: Option<ScrollSettings>,
}

/// Appearance of the reader's scroll slider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollSettings {
    pub border: Option<bool>,
    pub color_in: Option<bool>,
    pub shadow: Option<f64>,
    pub both: Option<bool>,
    pub right: Option<bool>,
    pub left: Option<bool>,
    pub position: Option<f64>,
    pub width: Option<f64>,
    pub opacity: Option<f64>,
    pub speed_scale: Option<f64>,
    pub hide_ball: Option<bool>,
}

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("a preset name is required")]
    MissingName,
    #[error("{0} has no valid style property")]
    NoStyleKeys(String),
    #[error("JSON input must be an object")]
    NotAnObject,
    #[error("invalid preset JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// JSON-file-backed preset collection.
#[derive(Debug)]
pub struct PresetStore {
    presets: BTreeMap<String, StylePreset>,
    path: PathBuf,
}

impl PresetStore {
    /// Load presets from `path`. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, PresetError> {
        let presets = match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("preset: {} not found, starting empty", path.display());
                BTreeMap::new()
            }
            Err(source) => {
                return Err(PresetError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        info!("preset: loaded {} presets from {}", presets.len(), path.display());
        Ok(Self {
            presets,
            path: path.to_path_buf(),
        })
    }

    pub fn save(&self) -> Result<(), PresetError> {
        let io_err = |source| PresetError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(&self.presets)?;
        fs::write(&self.path, content).map_err(io_err)?;
        debug!("preset: saved {} presets to {}", self.presets.len(), self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&StylePreset> {
        self.presets.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Store `preset` under `name`, replacing any previous one.
    pub fn insert(&mut self, name: &str, preset: StylePreset) -> Result<(), PresetError> {
        if name.trim().is_empty() {
            return Err(PresetError::MissingName);
        }
        debug!("preset: insert {name}");
        self.presets.insert(name.to_string(), preset);
        Ok(())
    }

    /// Lowest `N` such that `Style<N>` is not taken.
    fn next_free_slot(&self) -> String {
        let used: Vec<u64> = self
            .presets
            .keys()
            .filter_map(|k| SLOT_NAME.captures(k)?.get(1)?.as_str().parse().ok())
            .collect();
        let n = (1..).find(|n| !used.contains(n)).unwrap_or(1);
        format!("Style{n}")
    }

    /// Import presets from JSON text.
    ///
    /// Either a map of `Style<N>` (and other) names to presets, or a single
    /// preset object that goes into the lowest free slot. Nothing is stored
    /// unless every entry is valid. Returns the stored names.
    pub fn import_json(&mut self, text: &str) -> Result<Vec<String>, PresetError> {
        let value: serde_json::Value = serde_json::from_str(text.trim())?;
        let serde_json::Value::Object(object) = value else {
            return Err(PresetError::NotAnObject);
        };

        let entries: Vec<(String, serde_json::Value)> =
            if object.keys().any(|k| SLOT_NAME.is_match(k)) {
                object.into_iter().collect()
            } else {
                vec![(self.next_free_slot(), serde_json::Value::Object(object))]
            };

        let mut parsed = Vec::with_capacity(entries.len());
        for (name, value) in entries {
            let valid = value
                .as_object()
                .is_some_and(|o| o.keys().any(|k| STYLE_KEYS.contains(&k.as_str())));
            if !valid {
                return Err(PresetError::NoStyleKeys(name));
            }
            let preset: StylePreset = serde_json::from_value(value)?;
            parsed.push((name, preset));
        }

        let mut names = Vec::with_capacity(parsed.len());
        for (name, preset) in parsed {
            self.insert(&name, preset)?;
            names.push(name);
        }
        info!("preset: imported {}", names.join(", "));
        Ok(names)
    }
}
