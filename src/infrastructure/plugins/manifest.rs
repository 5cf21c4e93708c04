//! Plugin bundle manifest

use serde::Deserialize;

/// Descriptor file every bundle must carry.
pub const MANIFEST_FILE: &str = "plugin.yaml";

/// Sentinel for bundles that do not declare an api version. Treated as
/// incompatible unless the host explicitly allows unversioned bundles.
pub const UNKNOWN_API_VERSION: &str = "unknown";

/// Bundle descriptor: parsed once per load attempt, discarded after
/// instantiation.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Plugin name (required, unique across the registry)
    pub name: String,

    /// Exported entry symbol (required)
    pub entry_point: String,

    /// Runtime-API version the bundle was built against
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Shared library file inside the bundle; defaults to the platform
    /// dylib name derived from `name`
    pub library: Option<String>,
}

fn default_api_version() -> String {
    UNKNOWN_API_VERSION.to_string()
}

impl Manifest {
    /// Parse the descriptor from its raw bytes. Missing required keys and
    /// malformed names are load errors; a missing `api_version` is not.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, String> {
        let manifest: Manifest = serde_yaml::from_slice(bytes).map_err(|e| e.to_string())?;
        if manifest.name.is_empty() {
            return Err("'name' must not be empty".to_string());
        }
        if !manifest
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(format!("invalid plugin name '{}'", manifest.name));
        }
        if manifest.entry_point.is_empty() {
            return Err("'entry_point' must not be empty".to_string());
        }
        Ok(manifest)
    }

    /// Library file inside the bundle.
    pub fn library_file(&self) -> String {
        self.library.clone().unwrap_or_else(|| {
            format!(
                "{}{}{}",
                std::env::consts::DLL_PREFIX,
                self.name.replace('-', "_"),
                std::env::consts::DLL_SUFFIX
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_manifest() {
        let manifest = Manifest::from_slice(
            b"name: echo\nentry_point: echo_plugin_init\napi_version: \"1.1\"\n",
        )
        .expect("valid manifest");
        assert_eq!(manifest.name, "echo");
        assert_eq!(manifest.entry_point, "echo_plugin_init");
        assert_eq!(manifest.api_version, "1.1");
    }

    #[test]
    fn missing_api_version_defaults_to_unknown() {
        let manifest =
            Manifest::from_slice(b"name: echo\nentry_point: echo_plugin_init\n").expect("valid");
        assert_eq!(manifest.api_version, UNKNOWN_API_VERSION);
    }

    #[test]
    fn missing_entry_point_is_an_error() {
        assert!(Manifest::from_slice(b"name: echo\n").is_err());
    }

    #[test]
    fn rejects_names_unfit_for_paths_and_qualifiers() {
        assert!(Manifest::from_slice(b"name: \"a/b\"\nentry_point: init\n").is_err());
        assert!(Manifest::from_slice(b"name: \"\"\nentry_point: init\n").is_err());
    }

    #[test]
    fn library_defaults_to_platform_dylib_name() {
        let manifest =
            Manifest::from_slice(b"name: my-echo\nentry_point: init\n").expect("valid");
        let file = manifest.library_file();
        assert!(file.contains("my_echo"), "unexpected library file {file}");
    }
}
