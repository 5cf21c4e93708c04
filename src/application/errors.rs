//! Error taxonomy for the plugin runtime

use thiserror::Error;

/// Problems turning a bundle into a live plugin. Fatal to that load attempt
/// only; each variant carries the bundle identifier.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("bundle '{bundle}': missing manifest")]
    MissingManifest { bundle: String },

    #[error("bundle '{bundle}': invalid manifest: {reason}")]
    InvalidManifest { bundle: String, reason: String },

    #[error("bundle '{bundle}': api version '{version}' is not supported (supported: {supported:?})")]
    UnsupportedApiVersion {
        bundle: String,
        version: String,
        supported: &'static [&'static str],
    },

    #[error("bundle '{bundle}': entry point '{symbol}' not found")]
    EntryPointNotFound { bundle: String, symbol: String },

    #[error("bundle '{bundle}': entry point does not satisfy the plugin contract")]
    EntryPointWrongShape { bundle: String },

    #[error("bundle '{bundle}': unreadable: {reason}")]
    BundleUnreadable { bundle: String, reason: String },
}

impl LoadError {
    /// Identifier of the bundle the failed attempt was loading.
    pub fn bundle(&self) -> &str {
        match self {
            LoadError::MissingManifest { bundle }
            | LoadError::InvalidManifest { bundle, .. }
            | LoadError::UnsupportedApiVersion { bundle, .. }
            | LoadError::EntryPointNotFound { bundle, .. }
            | LoadError::EntryPointWrongShape { bundle }
            | LoadError::BundleUnreadable { bundle, .. } => bundle,
        }
    }
}

/// Lifecycle operation failures, reported back on the console.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("plugin '{0}' is already enabled")]
    AlreadyEnabled(String),

    #[error("plugin '{0}' is not enabled")]
    NotEnabled(String),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("plugin '{plugin}' failed to initialize: {source}")]
    Init {
        plugin: String,
        #[source]
        source: PluginError,
    },

    #[error("registry invariant violated: {0}")]
    Internal(String),
}

/// Failure raised by plugin-supplied code, captured at the runtime boundary.
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("{0}")]
    Message(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("panicked: {0}")]
    Panic(String),

    #[error("cancelled")]
    Cancelled,
}

impl PluginError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// Wire-level platform client errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("network error: {0}")]
    Network(String),

    #[error("platform API error: {0}")]
    Api(String),

    #[error("decode error: {0}")]
    Decode(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read '{path}': {reason}")]
    Io { path: String, reason: String },

    #[error("cannot parse '{path}': {reason}")]
    Parse { path: String, reason: String },
}
