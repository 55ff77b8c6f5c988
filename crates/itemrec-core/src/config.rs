//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` +
//! `config.<env>.toml` + `APP_*` env vars (`__` separates nesting levels).
//! The TOML files are read from `ITEMREC_CONFIG_DIR` when set (otherwise the
//! working directory), and relative paths in them resolve against that
//! directory. `~` and `${VAR}` are expanded.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub catalog: CatalogSettings,
    pub embedding: EmbeddingSettings,
    pub remote: RemoteSettings,
    pub limits: LimitSettings,
    pub cluster: ClusterSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub path: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self { path: "data/catalog.csv".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: String,
    pub dimension: usize,
    pub max_len: usize,
    pub batch_size: usize,
    pub use_fake: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_dir: "models/all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            max_len: 256,
            batch_size: 32,
            use_fake: false,
        }
    }
}

/// Remote vector index. The client is only built when `host` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    pub host: Option<String>,
    pub api_key: Option<String>,
    pub index_name: String,
    pub timeout_ms: u64,
    pub upsert_batch_size: usize,
    pub upsert_delay_ms: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            host: None,
            api_key: None,
            index_name: "catalog-items".to_string(),
            timeout_ms: 5_000,
            upsert_batch_size: 50,
            upsert_delay_ms: 100,
        }
    }
}

impl RemoteSettings {
    pub fn configured_host(&self) -> Option<&str> {
        self.host.as_deref().map(str::trim).filter(|h| !h.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self { default_limit: 10, max_limit: 50 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
    pub k: usize,
    pub seed: u64,
    pub max_iter: usize,
    pub tolerance: f32,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self { k: 10, seed: 42, max_iter: 300, tolerance: 1e-4 }
    }
}

/// Directory holding the TOML layers, from `ITEMREC_CONFIG_DIR`.
pub const CONFIG_DIR_VAR: &str = "ITEMREC_CONFIG_DIR";

pub struct Config {
    figment: Figment,
    env_name: String,
    base_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        let base_dir = env::var(CONFIG_DIR_VAR)
            .ok()
            .filter(|d| !d.trim().is_empty())
            .map(expand_path);
        let figment = Self::figment_for(base_dir.as_deref().unwrap_or(Path::new("")), &env_name);
        let config = Self { figment, env_name, base_dir };
        config.settings()?;
        Ok(config)
    }

    fn figment_for(dir: &Path, env_name: &str) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment.merge(Env::prefixed("APP_").split("__"))
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Typed view of the merged configuration, validated. With a config
    /// directory set, relative catalog and model paths are anchored to it.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        if let Some(base) = &self.base_dir {
            settings.catalog.path = resolve_with_base(base, &settings.catalog.path).to_string_lossy().into_owned();
            settings.embedding.model_dir =
                resolve_with_base(base, &settings.embedding.model_dir).to_string_lossy().into_owned();
        }
        validate(&settings)?;
        Ok(settings)
    }
}

pub fn validate(settings: &Settings) -> Result<()> {
    if settings.embedding.dimension == 0 {
        return Err(Error::InvalidConfig("embedding.dimension must be > 0".into()));
    }
    if settings.embedding.batch_size == 0 {
        return Err(Error::InvalidConfig("embedding.batch_size must be > 0".into()));
    }
    if settings.limits.default_limit == 0 {
        return Err(Error::InvalidConfig("limits.default_limit must be > 0".into()));
    }
    if settings.limits.max_limit < settings.limits.default_limit {
        return Err(Error::InvalidConfig(format!(
            "limits.max_limit ({}) is below limits.default_limit ({})",
            settings.limits.max_limit, settings.limits.default_limit
        )));
    }
    if settings.remote.timeout_ms == 0 {
        return Err(Error::InvalidConfig("remote.timeout_ms must be > 0".into()));
    }
    if settings.remote.upsert_batch_size == 0 {
        return Err(Error::InvalidConfig("remote.upsert_batch_size must be > 0".into()));
    }
    if settings.cluster.k < 2 {
        return Err(Error::InvalidConfig("cluster.k must be >= 2".into()));
    }
    Ok(())
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(validate(&Settings::default()).is_ok());
    }

    #[test]
    fn max_limit_below_default_is_rejected() {
        let mut s = Settings::default();
        s.limits.max_limit = 5;
        assert!(matches!(validate(&s), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn blank_remote_host_is_unconfigured() {
        let mut remote = RemoteSettings::default();
        assert_eq!(remote.configured_host(), None);
        remote.host = Some("   ".into());
        assert_eq!(remote.configured_host(), None);
        remote.host = Some("https://idx.example".into());
        assert_eq!(remote.configured_host(), Some("https://idx.example"));
    }

    #[test]
    fn resolve_relative_against_base() {
        let base = Path::new("/srv/app");
        assert_eq!(resolve_with_base(base, "data/x.csv"), PathBuf::from("/srv/app/data/x.csv"));
        assert_eq!(resolve_with_base(base, "/abs/x.csv"), PathBuf::from("/abs/x.csv"));
    }
}
