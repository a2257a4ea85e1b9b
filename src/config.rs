use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

use crate::boundary::{DEFAULT_DELIMITERS, DEFAULT_SEARCH_FRACTION};
use crate::chunk::DEFAULT_CHUNK_SIZE;
use crate::paginate::{DEFAULT_MAX_CHARS_PER_PAGE, DEFAULT_OVERLAP_CHARS, PaginationOptions};
use crate::reader::ReaderConfig;

// ---------------------------------------------------------------------------
// ConfigFile: deserialized from TOML (all fields optional)
// ---------------------------------------------------------------------------

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub watch_interval_ms: Option<u64>,
    #[serde(default)]
    pub pagination: PaginationConfigFile,
    #[serde(default)]
    pub reader: ReaderConfigFile,
    #[serde(default)]
    pub presets: PresetsConfigFile,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct PaginationConfigFile {
    pub max_chars_per_page: Option<usize>,
    pub overlap_chars: Option<usize>,
    pub chunk_size: Option<usize>,
    pub boundary_search_fraction: Option<f64>,
    pub delimiter_priority: Option<Vec<String>>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ReaderConfigFile {
    pub edge_tolerance_px: Option<f64>,
    pub forward_arm_fraction: Option<f64>,
    pub first_page_backward_arm_fraction: Option<f64>,
    pub backward_arm_fraction: Option<f64>,
    pub settle_ms: Option<u64>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct PresetsConfigFile {
    pub path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Config: resolved (all fields concrete)
// ---------------------------------------------------------------------------

pub struct Config {
    pub pagination: PaginationOptions,
    pub reader: ReaderConfig,
    pub presets_path: PathBuf,
    pub watch_interval: Duration,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be at least 1")]
    Zero(&'static str),
    #[error("overlap_chars ({overlap}) must not exceed half of max_chars_per_page ({max})")]
    OverlapTooLarge { overlap: usize, max: usize },
    #[error("{field} must be within {range}, got {value}")]
    FractionOutOfRange {
        field: &'static str,
        range: &'static str,
        value: f64,
    },
    #[error("delimiter {0:?} must be exactly one character")]
    BadDelimiter(String),
}

impl ConfigFile {
    /// Merge CLI values (overwrites non-None fields).
    pub fn merge_cli(
        &mut self,
        max_chars: Option<usize>,
        overlap: Option<usize>,
        chunk_size: Option<usize>,
    ) {
        if let Some(v) = max_chars {
            debug!("config: CLI override max_chars_per_page={v}");
            self.pagination.max_chars_per_page = max_chars;
        }
        if let Some(v) = overlap {
            debug!("config: CLI override overlap_chars={v}");
            self.pagination.overlap_chars = overlap;
        }
        if let Some(v) = chunk_size {
            debug!("config: CLI override chunk_size={v}");
            self.pagination.chunk_size = chunk_size;
        }
    }

    /// Resolve to a Config by applying defaults to missing fields, then
    /// validate the result.
    pub fn resolve(self) -> Result<Config, ConfigError> {
        let p = self.pagination;
        let delimiter_priority = match p.delimiter_priority {
            Some(list) => list
                .into_iter()
                .map(|s| single_char(&s).ok_or(ConfigError::BadDelimiter(s)))
                .collect::<Result<Vec<char>, _>>()?,
            None => DEFAULT_DELIMITERS.to_vec(),
        };
        let r = self.reader;
        let defaults = ReaderConfig::default();
        let config = Config {
            pagination: PaginationOptions {
                max_chars_per_page: p.max_chars_per_page.unwrap_or(DEFAULT_MAX_CHARS_PER_PAGE),
                overlap_chars: p.overlap_chars.unwrap_or(DEFAULT_OVERLAP_CHARS),
                chunk_size: p.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
                boundary_search_fraction: p
                    .boundary_search_fraction
                    .unwrap_or(DEFAULT_SEARCH_FRACTION),
                delimiter_priority,
            },
            reader: ReaderConfig {
                edge_tolerance_px: r.edge_tolerance_px.unwrap_or(defaults.edge_tolerance_px),
                forward_arm_fraction: r
                    .forward_arm_fraction
                    .unwrap_or(defaults.forward_arm_fraction),
                first_page_backward_arm_fraction: r
                    .first_page_backward_arm_fraction
                    .unwrap_or(defaults.first_page_backward_arm_fraction),
                backward_arm_fraction: r
                    .backward_arm_fraction
                    .unwrap_or(defaults.backward_arm_fraction),
                settle: r.settle_ms.map(Duration::from_millis).unwrap_or(defaults.settle),
            },
            presets_path: self
                .presets
                .path
                .or_else(default_presets_path)
                .unwrap_or_else(|| PathBuf::from("presets.json")),
            watch_interval: Duration::from_millis(self.watch_interval_ms.unwrap_or(200)),
        };
        config.validate()?;
        info!(
            "config: resolved max_chars_per_page={}, overlap_chars={}, chunk_size={}, \
             boundary_search_fraction={}, delimiters={:?}, settle={}ms, \
             watch_interval={}ms, presets={}",
            config.pagination.max_chars_per_page,
            config.pagination.overlap_chars,
            config.pagination.chunk_size,
            config.pagination.boundary_search_fraction,
            config.pagination.delimiter_priority,
            config.reader.settle.as_millis(),
            config.watch_interval.as_millis(),
            config.presets_path.display(),
        );
        Ok(config)
    }
}

impl Config {
    fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pagination;
        if p.max_chars_per_page == 0 {
            return Err(ConfigError::Zero("max_chars_per_page"));
        }
        if p.chunk_size == 0 {
            return Err(ConfigError::Zero("chunk_size"));
        }
        if p.overlap_chars > p.max_chars_per_page / 2 {
            return Err(ConfigError::OverlapTooLarge {
                overlap: p.overlap_chars,
                max: p.max_chars_per_page,
            });
        }
        if !(0.0..=1.0).contains(&p.boundary_search_fraction) {
            return Err(ConfigError::FractionOutOfRange {
                field: "boundary_search_fraction",
                range: "[0, 1]",
                value: p.boundary_search_fraction,
            });
        }
        let r = &self.reader;
        for (field, value) in [
            ("forward_arm_fraction", r.forward_arm_fraction),
            ("first_page_backward_arm_fraction", r.first_page_backward_arm_fraction),
            ("backward_arm_fraction", r.backward_arm_fraction),
        ] {
            if value.is_nan() || value <= 0.0 || value > 1.0 {
                return Err(ConfigError::FractionOutOfRange {
                    field,
                    range: "(0, 1]",
                    value,
                });
            }
        }
        Ok(())
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Resolve an XDG base directory, falling back to `$HOME/<fallback>`.
fn xdg_dir(var: &str, fallback: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(fallback)))
}

/// Resolve the XDG config path for tateyomi.
fn config_path() -> Option<PathBuf> {
    Some(xdg_dir("XDG_CONFIG_HOME", ".config")?.join("tateyomi").join("config.toml"))
}

fn default_presets_path() -> Option<PathBuf> {
    Some(xdg_dir("XDG_DATA_HOME", ".local/share")?.join("tateyomi").join("presets.json"))
}

/// Load config file. Returns `ConfigFile::default()` if no file exists.
/// Returns an error if the file exists but cannot be parsed.
pub fn load_config() -> anyhow::Result<ConfigFile> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            info!("config: no HOME or XDG_CONFIG_HOME set, using defaults");
            return Ok(ConfigFile::default());
        }
    };
    debug!("config: looking for {}", path.display());
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            info!("config: loaded from {}", path.display());
            let cfg: ConfigFile = toml::from_str(&text)
                .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("config: {} not found, using defaults", path.display());
            Ok(ConfigFile::default())
        }
        Err(e) => Err(anyhow::anyhow!("failed to read {}: {e}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml() {
        let cfg: ConfigFile = toml::from_str("").unwrap();
        let resolved = cfg.resolve().unwrap();
        assert_eq!(resolved.pagination, PaginationOptions::default());
        assert_eq!(resolved.reader, ReaderConfig::default());
        assert_eq!(resolved.watch_interval, Duration::from_millis(200));
    }

    #[test]
    fn partial_toml() {
        let text = r#"
            watch_interval_ms = 500
            [pagination]
            max_chars_per_page = 4000
            delimiter_priority = ["。", "、"]
            [reader]
            settle_ms = 120
            [presets]
            path = "/tmp/p.json"
        "#;
        let cfg: ConfigFile = toml::from_str(text).unwrap();
        let resolved = cfg.resolve().unwrap();
        assert_eq!(resolved.pagination.max_chars_per_page, 4000);
        assert_eq!(resolved.pagination.delimiter_priority, vec!['。', '、']);
        assert_eq!(resolved.reader.settle, Duration::from_millis(120));
        assert_eq!(resolved.presets_path, PathBuf::from("/tmp/p.json"));
        assert_eq!(resolved.watch_interval, Duration::from_millis(500));
        // Defaults for unspecified fields
        assert_eq!(resolved.pagination.overlap_chars, 10);
        assert_eq!(resolved.pagination.chunk_size, 50);
        assert_eq!(resolved.reader.first_page_backward_arm_fraction, 0.64);
    }

    #[test]
    fn invalid_toml() {
        let text = "this is not valid toml [[[";
        let result = toml::from_str::<ConfigFile>(text);
        assert!(result.is_err());
    }

    #[test]
    fn cli_overrides() {
        let text = "[pagination]\nmax_chars_per_page = 100\noverlap_chars = 3";
        let mut cfg: ConfigFile = toml::from_str(text).unwrap();
        cfg.merge_cli(Some(200), None, Some(20));
        let resolved = cfg.resolve().unwrap();
        assert_eq!(resolved.pagination.max_chars_per_page, 200); // CLI wins
        assert_eq!(resolved.pagination.overlap_chars, 3); // config file
        assert_eq!(resolved.pagination.chunk_size, 20);
    }

    #[test]
    fn rejects_zero_sizes() {
        let mut cfg = ConfigFile::default();
        cfg.merge_cli(Some(0), Some(0), None);
        assert_eq!(
            cfg.resolve().err(),
            Some(ConfigError::Zero("max_chars_per_page"))
        );
        let mut cfg = ConfigFile::default();
        cfg.merge_cli(None, None, Some(0));
        assert_eq!(cfg.resolve().err(), Some(ConfigError::Zero("chunk_size")));
    }

    #[test]
    fn rejects_large_overlap() {
        let mut cfg = ConfigFile::default();
        cfg.merge_cli(Some(100), Some(51), None);
        assert_eq!(
            cfg.resolve().err(),
            Some(ConfigError::OverlapTooLarge {
                overlap: 51,
                max: 100
            })
        );
        let mut cfg = ConfigFile::default();
        cfg.merge_cli(Some(100), Some(50), None);
        assert!(cfg.resolve().is_ok());
    }

    #[test]
    fn rejects_bad_fractions() {
        let cfg: ConfigFile =
            toml::from_str("[pagination]\nboundary_search_fraction = 1.5").unwrap();
        assert!(matches!(
            cfg.resolve(),
            Err(ConfigError::FractionOutOfRange {
                field: "boundary_search_fraction",
                ..
            })
        ));
        let cfg: ConfigFile = toml::from_str("[reader]\nbackward_arm_fraction = 0.0").unwrap();
        assert!(matches!(
            cfg.resolve(),
            Err(ConfigError::FractionOutOfRange {
                field: "backward_arm_fraction",
                ..
            })
        ));
    }

    #[test]
    fn rejects_multi_char_delimiter() {
        let cfg: ConfigFile =
            toml::from_str("[pagination]\ndelimiter_priority = [\"。\", \"……\"]").unwrap();
        assert_eq!(
            cfg.resolve().err(),
            Some(ConfigError::BadDelimiter("……".into()))
        );
    }
}
