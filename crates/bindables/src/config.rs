#![forbid(unsafe_code)]

//! Propagation configuration.
//!
//! A [`PropagationConfig`] is attached to every [`Bindable`](crate::Bindable)
//! at construction. The wave started by a write uses the configuration of the
//! container that was written to, for the whole wave.
//!
//! # Environment
//!
//! | Variable | Values | Default |
//! |----------|--------|---------|
//! | `BINDABLES_CYCLE_GUARD` | `visited`, `source-only` | `visited` |
//! | `BINDABLES_MAX_DEPTH` | integer >= 1 | `1024` |
//!
//! Invalid values are reported as [`ConfigError`]s and the default is kept.

use std::env;
use std::fmt;

pub const ENV_CYCLE_GUARD: &str = "BINDABLES_CYCLE_GUARD";
pub const ENV_MAX_DEPTH: &str = "BINDABLES_MAX_DEPTH";

/// Default depth limit for [`CycleGuard::SourceOnly`], in link hops from the
/// written container.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// How a propagation wave avoids revisiting containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CycleGuard {
    /// Every container is updated at most once per wave. Cycles of any
    /// length terminate.
    #[default]
    Visited,
    /// Only the container that pushed into the current step is skipped.
    ///
    /// Trees and two-node links terminate; longer cycles keep circulating
    /// until `max_depth` cuts them off.
    SourceOnly,
}

impl CycleGuard {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Visited => "visited",
            Self::SourceOnly => "source-only",
        }
    }

    /// Parse a guard name (case-insensitive, `_` and `-` interchangeable).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "visited" | "visited-set" => Some(Self::Visited),
            "source-only" | "source" | "one-hop" => Some(Self::SourceOnly),
            _ => None,
        }
    }
}

impl fmt::Display for CycleGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for propagation waves started on a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropagationConfig {
    pub cycle_guard: CycleGuard,
    /// Maximum step depth under [`CycleGuard::SourceOnly`]. The written
    /// container is depth 0; a step that would run deeper than this is
    /// skipped and the wave is reported as truncated. Ignored under
    /// [`CycleGuard::Visited`], which reaches every linked container.
    pub max_depth: usize,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PropagationConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cycle_guard: CycleGuard::Visited,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// One-hop source exclusion only, bounded by the default depth limit.
    #[must_use]
    pub const fn source_only() -> Self {
        Self {
            cycle_guard: CycleGuard::SourceOnly,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    #[must_use]
    pub const fn with_cycle_guard(mut self, cycle_guard: CycleGuard) -> Self {
        self.cycle_guard = cycle_guard;
        self
    }

    /// Set the depth limit, clamped to at least 1.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Parse config from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with_diagnostics().config
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> PropagationConfigParse {
        from_env_with(|key| env::var(key).ok())
    }

    /// Validate config constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        if self.max_depth == 0 {
            errors.push(ConfigError::new(
                "max_depth",
                self.max_depth.to_string(),
                "must be >= 1",
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration parse diagnostics (env + validation).
#[derive(Debug, Clone)]
pub struct PropagationConfigParse {
    pub config: PropagationConfig,
    pub errors: Vec<ConfigError>,
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl ConfigError {
    fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}

fn from_env_with<F>(mut get: F) -> PropagationConfigParse
where
    F: FnMut(&str) -> Option<String>,
{
    let mut config = PropagationConfig::default();
    let mut errors = Vec::new();

    if let Some(value) = get(ENV_CYCLE_GUARD) {
        match CycleGuard::parse(&value) {
            Some(parsed) => config.cycle_guard = parsed,
            None => errors.push(ConfigError::new(
                "cycle_guard",
                value,
                "expected visited|source-only",
            )),
        }
    }

    if let Some(value) = get(ENV_MAX_DEPTH) {
        match value.trim().parse::<usize>() {
            Ok(0) => errors.push(ConfigError::new("max_depth", value, "must be >= 1")),
            Ok(parsed) => config.max_depth = parsed,
            Err(_) => errors.push(ConfigError::new(
                "max_depth",
                value,
                "expected positive integer",
            )),
        }
    }

    PropagationConfigParse { config, errors }
}
