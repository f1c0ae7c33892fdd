//! Diagnostics for Canopy (Layer 3).
//!
//! Every Canopy crate logs through [`tracing`]: reconciler passes and context
//! changes at `debug`, scheduling and subscriptions at `trace`, and
//! swallowed failures (such as a re-entered context subscriber) at `warn`.
//! This crate installs a `tracing_subscriber` stack for hosts and tests.
//!
//! # Example
//!
//! ```
//! use canopy_diagnostics::{TracingConfig, TracingFormat};
//! use tracing::Level;
//!
//! let config = TracingConfig::new()
//!     .with_level(Level::DEBUG)
//!     .with_format(TracingFormat::Compact)
//!     .with_env_filter("canopy_tree=trace,canopy_hooks=debug");
//!
//! // Fails only if the filter is malformed or a global subscriber exists.
//! let _ = config.try_init();
//! ```

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable multi-line output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// DiagnosticsError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors from installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum DiagnosticsError {
    /// The filter directive string could not be parsed.
    #[error("invalid tracing filter `{directives}`: {source}")]
    InvalidFilter {
        /// The rejected directives.
        directives: String,
        /// The parser's error.
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    /// A global subscriber is already installed.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled(#[source] TryInitError),
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Subscriber configuration.
///
/// Without an explicit filter, every target is logged up to `level`.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    level: Level,
    format: TracingFormat,
    /// Filter directives, e.g. `"canopy_tree=debug,canopy_hooks=trace"`.
    env_filter: Option<String>,
    span_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingConfig {
    /// Creates a configuration logging `INFO` and above in pretty format.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets filter directives in `target=level,...` form. These replace the
    /// plain level filter.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Returns the configured maximum level.
    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    /// Returns the configured format.
    #[must_use]
    pub fn format(&self) -> TracingFormat {
        self.format
    }

    /// Builds the filter layer.
    ///
    /// # Errors
    ///
    /// Returns [`DiagnosticsError::InvalidFilter`] if the directives do not
    /// parse.
    pub fn filter(&self) -> Result<EnvFilter, DiagnosticsError> {
        match &self.env_filter {
            Some(directives) => {
                EnvFilter::try_new(directives).map_err(|source| DiagnosticsError::InvalidFilter {
                    directives: directives.clone(),
                    source,
                })
            }
            None => Ok(EnvFilter::new(self.level.as_str())),
        }
    }

    /// Installs the subscriber globally.
    ///
    /// # Errors
    ///
    /// Fails on malformed filter directives or if a global subscriber is
    /// already installed. Tests sharing a process can ignore the latter.
    pub fn try_init(&self) -> Result<(), DiagnosticsError> {
        let filter = self.filter()?;
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };
        let registry = tracing_subscriber::registry().with(filter);

        let installed = match self.format {
            TracingFormat::Pretty => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_span_events(span_events),
                )
                .try_init(),
            TracingFormat::Compact => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_span_events(span_events),
                )
                .try_init(),
            TracingFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_span_events(span_events),
                )
                .try_init(),
        };
        installed.map_err(DiagnosticsError::AlreadyInstalled)?;

        tracing::debug!(level = %self.level, format = ?self.format, "tracing installed");
        Ok(())
    }
}
