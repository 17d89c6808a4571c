//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

#[derive(Debug, Clone)]
pub struct TracingConfig {
    json: bool,
    default_directive: String,
}

impl TracingConfig {
    pub fn new() -> Self {
        Self {
            json: false,
            default_directive: "info".to_string(),
        }
    }

    /// Emit one JSON object per event instead of human-readable lines.
    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Filter used when `RUST_LOG` is not set.
    pub fn default_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }

    /// Installs the global subscriber. A second call is a no-op.
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.default_directive));

        let result = if self.json {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .try_init()
        };

        if result.is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::new()
    }
}
