//! Structured logging for mirrorsim
//!
//! This crate installs the `tracing` subscriber used by the simulation
//! binary and its tests: an `EnvFilter`, console output (JSONL or
//! human-readable), optional rotated JSONL files, and a layer that stamps
//! spans with the structure instance being worked on.
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines for log aggregation (default)
//! - **Structure Context**: Attribute log lines to a `(type, head)` instance
//! - **File Rotation**: Daily/hourly log rotation via tracing-appender
//!
//! # Quick Start
//!
//! ```ignore
//! use mirrorsim_logging::{LogConfig, SubscriberBuilder};
//!
//! // Development mode with pretty human-readable output
//! let _guard = SubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .try_init()?;
//! ```
//!
//! # Structure Context
//!
//! Use [`StructureContextGuard`] to tag a scope with the instance it
//! concerns:
//!
//! ```ignore
//! let _ctx = StructureContextGuard::new(StructureType::Ring, head);
//! tracing::debug!("splicing new member");
//! ```

pub mod config;
pub mod context;
pub mod layers;

pub use config::{ConsoleConfig, ConsoleFormat, FileConfig, FileRotation, FilterConfig, JsonlConfig, LogConfig};
pub use context::{StructureContextData, StructureContextGuard};
pub use layers::{StructureContextLayer, jsonl_layer};

use std::fs::{self, File};

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::{Directive, LevelFilter, ParseError};
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Failures while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid filter directive: {0}")]
    InvalidFilter(#[from] ParseError),

    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    #[error("Log file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Log file appender error: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    #[error("Global subscriber already set: {0}")]
    AlreadyInitialized(String),
}

/// Builder for configuring and initializing the mirrorsim logging subscriber
///
/// Starts from [`LogConfig::default`] (JSONL console at info); the
/// `with_*` methods patch single fields of whatever config is installed.
pub struct SubscriberBuilder {
    config: LogConfig,
}

impl SubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Build the filter: `RUST_LOG` if set, else the default level, plus
    /// per-target directives
    fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        let mut filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(&self.config.default_level)?,
        };
        for directive in self.config.filters.directives() {
            filter = filter.add_directive(directive.parse::<Directive>()?);
        }
        Ok(filter)
    }

    fn console_level(&self) -> Result<LevelFilter, LoggingError> {
        match &self.config.console.level {
            Some(level) => level
                .parse::<LevelFilter>()
                .map_err(|_| LoggingError::InvalidLevel(level.clone())),
            None => Ok(LevelFilter::TRACE),
        }
    }

    /// Initialize the subscriber globally
    ///
    /// Returns the file writer's guard when file output is configured; it
    /// must be kept alive for the duration of the program.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let filter = self.env_filter()?;
        let console_level = self.console_level()?;
        let console = &self.config.console;

        let pretty = console.format == ConsoleFormat::Pretty;
        let pretty_console = (console.enabled && pretty).then(|| {
            tracing_subscriber::fmt::layer()
                .with_ansi(console.ansi)
                .with_target(true)
                .with_filter(console_level)
        });
        let json_console = (console.enabled && !pretty)
            .then(|| jsonl_layer(std::io::stdout, &self.config.jsonl).with_filter(console_level));

        let (file_layer, guard) = match &self.config.file {
            Some(file_config) => {
                let (writer, guard) = file_writer(file_config)?;
                (Some(jsonl_layer(writer, &self.config.jsonl)), Some(guard))
            }
            None => (None, None),
        };

        Registry::default()
            .with(filter)
            .with(StructureContextLayer::new())
            .with(pretty_console)
            .with(json_console)
            .with(file_layer)
            .try_init()
            .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

        Ok(guard)
    }
}

impl Default for SubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-blocking file writer; `PerRun` truncates a single file
fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&config.directory)?;
    let rotation = match config.rotation {
        FileRotation::PerRun => {
            let file = File::create(config.directory.join(format!("{}.log", config.prefix)))?;
            return Ok(tracing_appender::non_blocking(file));
        }
        FileRotation::Hourly => Rotation::HOURLY,
        FileRotation::Daily => Rotation::DAILY,
    };
    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(config.prefix.clone())
        .filename_suffix("log");
    if let Some(max_files) = config.max_files {
        builder = builder.max_log_files(max_files);
    }
    let appender = builder.build(&config.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging for development (verbose, pretty console output)
pub fn init_development() -> Result<Option<WorkerGuard>, LoggingError> {
    SubscriberBuilder::new()
        .with_config(LogConfig::development())
        .try_init()
}

/// Initialize logging for testing (minimal output)
///
/// Safe to call from many tests; only the first call installs a subscriber.
pub fn init_testing() {
    let _ = SubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}
