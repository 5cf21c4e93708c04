//! Plugin loader - dynamically loads bundles from disk or a remote URL

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use libloading::{Library, Symbol};
use tracing::debug;
use url::Url;

use crate::application::errors::LoadError;
use crate::plugins::api::{Plugin, PluginEntryFn};
use crate::plugins::handle::{HostServices, PluginHandle};
use crate::plugins::manager::Loader;
use crate::plugins::record::{BundleLocation, PluginRecord};

use super::manifest::{Manifest, MANIFEST_FILE, UNKNOWN_API_VERSION};

/// Runtime-API versions this host can load.
pub const SUPPORTED_API_VERSIONS: &[&str] = &["1.0", "1.1"];

/// Cache directory for bundles fetched from remote URLs.
const REMOTE_CACHE_DIR: &str = ".remote";

/// Loads bundles as isolated shared libraries. Each bundle gets its own
/// `Library`, so no two bundles ever share mutable static state, and each
/// instance is wired with its name, data directory, log category and a
/// fresh execution context. Never registers anything - that is the
/// lifecycle manager's job.
pub struct DylibLoader {
    plugins_dir: PathBuf,
    allow_unversioned: bool,
    http: reqwest::Client,
    services: HostServices,
}

impl DylibLoader {
    pub fn new(plugins_dir: PathBuf, allow_unversioned: bool, services: HostServices) -> Self {
        Self {
            plugins_dir,
            allow_unversioned,
            http: reqwest::Client::new(),
            services,
        }
    }

    fn load_from_dir(
        &self,
        bundle_dir: &Path,
        source: BundleLocation,
    ) -> Result<(Arc<PluginRecord>, PluginHandle), LoadError> {
        let bundle = bundle_identifier(&source);

        let bytes =
            std::fs::read(bundle_dir.join(MANIFEST_FILE)).map_err(|_| LoadError::MissingManifest {
                bundle: bundle.clone(),
            })?;
        let manifest =
            Manifest::from_slice(&bytes).map_err(|reason| LoadError::InvalidManifest {
                bundle: bundle.clone(),
                reason,
            })?;
        self.check_api_version(&bundle, &manifest)?;

        let library_path = bundle_dir.join(manifest.library_file());
        let library = unsafe { Library::new(&library_path) }.map_err(|e| {
            LoadError::BundleUnreadable {
                bundle: bundle.clone(),
                reason: e.to_string(),
            }
        })?;

        let instance: Arc<dyn Plugin> = {
            let entry: Symbol<PluginEntryFn> =
                unsafe { library.get(manifest.entry_point.as_bytes()) }.map_err(|_| {
                    LoadError::EntryPointNotFound {
                        bundle: bundle.clone(),
                        symbol: manifest.entry_point.clone(),
                    }
                })?;
            let raw = unsafe { entry() };
            if raw.is_null() {
                return Err(LoadError::EntryPointWrongShape { bundle });
            }
            Arc::from(unsafe { Box::from_raw(raw) })
        };

        debug!(plugin = %manifest.name, library = %library_path.display(), "bundle loaded");
        Ok(self.services.wire(
            &manifest.name,
            source,
            bundle_dir.to_path_buf(),
            instance,
            Some(library),
        ))
    }

    fn check_api_version(&self, bundle: &str, manifest: &Manifest) -> Result<(), LoadError> {
        let version = manifest.api_version.as_str();
        if SUPPORTED_API_VERSIONS.contains(&version) {
            return Ok(());
        }
        if version == UNKNOWN_API_VERSION && self.allow_unversioned {
            return Ok(());
        }
        Err(LoadError::UnsupportedApiVersion {
            bundle: bundle.to_string(),
            version: version.to_string(),
            supported: SUPPORTED_API_VERSIONS,
        })
    }

    /// Fetch a remote bundle (manifest plus library) into the local cache
    /// and return the cache directory to load from.
    async fn fetch_remote(&self, url: &Url) -> Result<PathBuf, LoadError> {
        let bundle = url.to_string();
        let base = if url.as_str().ends_with('/') {
            url.clone()
        } else {
            Url::parse(&format!("{url}/")).map_err(|e| LoadError::BundleUnreadable {
                bundle: bundle.clone(),
                reason: e.to_string(),
            })?
        };

        let manifest_url = join_url(&base, MANIFEST_FILE, &bundle)?;
        let manifest_bytes = self.fetch_bytes(manifest_url, &bundle).await?;
        let manifest =
            Manifest::from_slice(&manifest_bytes).map_err(|reason| LoadError::InvalidManifest {
                bundle: bundle.clone(),
                reason,
            })?;

        let cache_dir = self
            .plugins_dir
            .join(REMOTE_CACHE_DIR)
            .join(&manifest.name);
        tokio::fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| unreadable(&bundle, e))?;
        tokio::fs::write(cache_dir.join(MANIFEST_FILE), &manifest_bytes)
            .await
            .map_err(|e| unreadable(&bundle, e))?;

        let library_file = manifest.library_file();
        let library_url = join_url(&base, &library_file, &bundle)?;
        let library_bytes = self.fetch_bytes(library_url, &bundle).await?;
        tokio::fs::write(cache_dir.join(&library_file), &library_bytes)
            .await
            .map_err(|e| unreadable(&bundle, e))?;

        Ok(cache_dir)
    }

    async fn fetch_bytes(&self, url: Url, bundle: &str) -> Result<Vec<u8>, LoadError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| LoadError::BundleUnreadable {
                bundle: bundle.to_string(),
                reason: e.to_string(),
            })?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| LoadError::BundleUnreadable {
                bundle: bundle.to_string(),
                reason: e.to_string(),
            })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl Loader for DylibLoader {
    async fn load(
        &self,
        location: &BundleLocation,
    ) -> Result<(Arc<PluginRecord>, PluginHandle), LoadError> {
        match location {
            BundleLocation::Path(path) => {
                if !path.is_dir() {
                    return Err(LoadError::BundleUnreadable {
                        bundle: path.display().to_string(),
                        reason: "not a bundle directory".to_string(),
                    });
                }
                self.load_from_dir(path, location.clone())
            }
            BundleLocation::Url(url) => {
                let cache_dir = self.fetch_remote(url).await?;
                self.load_from_dir(&cache_dir, location.clone())
            }
        }
    }

    async fn available(&self) -> Vec<String> {
        let mut names = Vec::new();
        let Ok(mut entries) = tokio::fs::read_dir(&self.plugins_dir).await else {
            return names;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if path.join(MANIFEST_FILE).is_file() {
                names.push(name.to_string());
            }
        }
        names.sort();
        names
    }

    async fn resolve(&self, name: &str) -> Option<BundleLocation> {
        let available = self.available().await;
        let prefix = name.to_lowercase();
        let found = available
            .iter()
            .find(|n| n.eq_ignore_ascii_case(name))
            .or_else(|| available.iter().find(|n| n.to_lowercase().starts_with(&prefix)))?;
        Some(BundleLocation::Path(self.plugins_dir.join(found)))
    }
}

fn bundle_identifier(source: &BundleLocation) -> String {
    match source {
        BundleLocation::Path(path) => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        BundleLocation::Url(url) => url.to_string(),
    }
}

fn join_url(base: &Url, file: &str, bundle: &str) -> Result<Url, LoadError> {
    base.join(file).map_err(|e| LoadError::BundleUnreadable {
        bundle: bundle.to_string(),
        reason: e.to_string(),
    })
}

fn unreadable(bundle: &str, error: std::io::Error) -> LoadError {
    LoadError::BundleUnreadable {
        bundle: bundle.to_string(),
        reason: error.to_string(),
    }
}
