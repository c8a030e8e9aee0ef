//! Logging configuration
//!
//! A [`LogConfig`] is plain serde data, so it can sit next to a simulation's
//! JSON config. Profiles cover the three ways mirrorsim is run: from the
//! CLI, as a long batch writing JSONL files, and under `cargo test`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level used when `RUST_LOG` is unset
    pub default_level: String,
    pub console: ConsoleConfig,
    /// JSONL file output; off when `None`
    pub file: Option<FileConfig>,
    /// Field selection shared by JSONL console and file output
    pub jsonl: JsonlConfig,
    pub filters: FilterConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            console: ConsoleConfig::default(),
            file: None,
            jsonl: JsonlConfig::default(),
            filters: FilterConfig::default(),
        }
    }
}

impl LogConfig {
    /// Human-readable console at debug level
    pub fn development() -> Self {
        Self {
            default_level: "debug".to_string(),
            console: ConsoleConfig::pretty("debug"),
            ..Default::default()
        }
    }

    /// Config for the `mirrorsim` binary
    ///
    /// Pretty console at info; `verbose` lowers it to debug and lets the
    /// structure crate's traversal traces through.
    pub fn cli(verbose: bool) -> Self {
        if !verbose {
            return Self {
                console: ConsoleConfig::pretty("info"),
                ..Default::default()
            };
        }
        let mut config = Self::development();
        config.console.level = Some("trace".to_string());
        config.filters = FilterConfig::default().with_target("mirrorsim_structure", "trace");
        config
    }

    /// JSONL files only, one file per run unless rotation says otherwise
    pub fn batch(log_dir: PathBuf) -> Self {
        Self {
            console: ConsoleConfig {
                enabled: false,
                ..ConsoleConfig::default()
            },
            file: Some(FileConfig {
                directory: log_dir,
                ..FileConfig::default()
            }),
            ..Default::default()
        }
    }

    /// Warnings only, plain console
    pub fn testing() -> Self {
        Self {
            default_level: "warn".to_string(),
            console: ConsoleConfig {
                level: Some("warn".to_string()),
                ..ConsoleConfig::default()
            },
            ..Default::default()
        }
    }
}

/// How console lines are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleFormat {
    #[default]
    Jsonl,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub format: ConsoleFormat,
    /// ANSI colours, pretty format only
    pub ansi: bool,
    /// Console-only level, may be stricter than the filter
    pub level: Option<String>,
}

impl ConsoleConfig {
    fn pretty(level: &str) -> Self {
        Self {
            enabled: true,
            format: ConsoleFormat::Pretty,
            ansi: true,
            level: Some(level.to_string()),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: ConsoleFormat::Jsonl,
            ansi: false,
            level: None,
        }
    }
}

/// When the JSONL log file starts over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRotation {
    /// One file, truncated when the run starts
    #[default]
    PerRun,
    Hourly,
    Daily,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub directory: PathBuf,
    pub prefix: String,
    pub rotation: FileRotation,
    /// Rotated files to keep; ignored for `PerRun`
    pub max_files: Option<usize>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: "mirrorsim-run".to_string(),
            rotation: FileRotation::PerRun,
            max_files: None,
        }
    }
}

/// Which fields a JSONL line carries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonlConfig {
    /// Event fields at the top level instead of under `fields`
    pub flatten: bool,
    /// Every entered span, so a line shows the `(type, head)` it ran under
    pub span_list: bool,
    pub current_span: bool,
    pub location: bool,
    pub thread_info: bool,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            flatten: true,
            span_list: true,
            current_span: false,
            location: false,
            thread_info: false,
        }
    }
}

/// Per-target level overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Target to level, e.g. `mirrorsim_simulation = "debug"`
    pub targets: BTreeMap<String, String>,
}

impl FilterConfig {
    pub fn with_target(mut self, target: impl Into<String>, level: impl Into<String>) -> Self {
        self.targets.insert(target.into(), level.into());
        self
    }

    /// `target=level` directives in target order
    pub fn directives(&self) -> Vec<String> {
        self.targets
            .iter()
            .map(|(target, level)| format!("{target}={level}"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_jsonl_console() {
        let config = LogConfig::default();
        assert_eq!(config.default_level, "info");
        assert!(config.console.enabled);
        assert_eq!(config.console.format, ConsoleFormat::Jsonl);
        assert!(config.file.is_none());
    }

    #[test]
    fn test_cli_profiles() {
        let quiet = LogConfig::cli(false);
        assert_eq!(quiet.console.format, ConsoleFormat::Pretty);
        assert_eq!(quiet.console.level.as_deref(), Some("info"));
        assert!(quiet.filters.directives().is_empty());

        let verbose = LogConfig::cli(true);
        assert_eq!(verbose.default_level, "debug");
        assert_eq!(verbose.filters.directives(), vec!["mirrorsim_structure=trace"]);
    }

    #[test]
    fn test_batch_writes_one_file_per_run() {
        let config = LogConfig::batch(PathBuf::from("/var/log/mirrorsim"));
        assert!(!config.console.enabled);
        let file = config.file.unwrap();
        assert_eq!(file.directory, PathBuf::from("/var/log/mirrorsim"));
        assert_eq!(file.rotation, FileRotation::PerRun);
    }

    #[test]
    fn test_directives_are_sorted_by_target() {
        let filters = FilterConfig::default()
            .with_target("mirrorsim_structure", "trace")
            .with_target("mirrorsim_logging", "warn");
        assert_eq!(
            filters.directives(),
            vec!["mirrorsim_logging=warn", "mirrorsim_structure=trace"]
        );
    }

    #[test]
    fn test_partial_json_config() {
        let config: LogConfig = serde_json::from_str(
            r#"{ "console": { "format": "pretty" }, "file": { "rotation": "hourly" } }"#,
        )
        .unwrap();
        assert_eq!(config.default_level, "info");
        assert_eq!(config.console.format, ConsoleFormat::Pretty);
        assert!(config.console.enabled);
        let file = config.file.unwrap();
        assert_eq!(file.rotation, FileRotation::Hourly);
        assert_eq!(file.prefix, "mirrorsim-run");
    }
}
