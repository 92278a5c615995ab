//! Tracing setup
//!
//! The subscriber is installed before the config file is read, so config
//! warnings reach the log. The `[logging] level` from the file is applied
//! afterwards through a reload handle, unless `RUST_LOG` is set.

use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

/// Filter used until the config file has been read
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Swaps the active filter once the configured level is known
pub struct LogFilterHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    /// `RUST_LOG` was set and takes priority over the config file
    from_env: bool,
}

impl LogFilterHandle {
    /// Apply the configured filter directive
    ///
    /// Returns whether the filter changed. `RUST_LOG` wins over the config
    /// file; an unparseable directive is logged and ignored.
    pub fn apply_config_level(&self, level: &str) -> bool {
        if self.from_env {
            return false;
        }

        let filter = match EnvFilter::try_new(level) {
            Ok(filter) => filter,
            Err(e) => {
                warn!("Ignoring invalid [logging] level '{}': {}", level, e);
                return false;
            }
        };
        match self.handle.reload(filter) {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not apply [logging] level '{}': {}", level, e);
                false
            }
        }
    }

    /// Current filter directive
    pub fn current(&self) -> Option<String> {
        self.handle.with_current(|filter| filter.to_string()).ok()
    }
}

fn reloadable(
    filter: EnvFilter,
    from_env: bool,
) -> (reload::Layer<EnvFilter, Registry>, LogFilterHandle) {
    let (layer, handle) = reload::Layer::new(filter);
    (layer, LogFilterHandle { handle, from_env })
}

/// Install the global subscriber: `RUST_LOG` if set, else [`DEFAULT_LOG_LEVEL`]
pub fn init_tracing() -> LogFilterHandle {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(DEFAULT_LOG_LEVEL), false),
    };
    let (filter_layer, handle) = reloadable(filter, from_env);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer())
        .init();

    handle
}
