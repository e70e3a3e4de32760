//! Worker configuration, read once from the process environment.
//!
//! The environment is the only configuration source. [`Config::from_env`]
//! never fails; validation is the separate, pure
//! [`Config::missing_required`], so callers can report every absent value at
//! once instead of failing on the first.

use std::time::Duration;

/// Top-level configuration for one worker run.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Catalog API settings.
    pub catalog: CatalogConfig,
    /// Artifact bucket settings.
    pub storage: StorageConfig,
    /// Rendering settings.
    pub capture: CaptureConfig,
    /// Explicit item ids for targeted mode; empty means drain the backlog.
    pub item_ids: Vec<String>,
}

/// Catalog API connection settings.
#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    /// Base address of the catalog, without a trailing path.
    pub base_url: String,
    /// Bearer token for the worker endpoints.
    pub api_token: String,
}

/// S3-compatible artifact bucket settings.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// Account id; the endpoint is derived from it.
    pub account_id: String,
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Bucket name.
    pub bucket: String,
    /// Public base address under which stored keys resolve.
    pub public_base_url: String,
}

/// Rendering settings. These are compiled defaults, not environment values:
/// captures must look identical from every deployment.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Viewport width in CSS pixels.
    pub viewport_width: u32,
    /// Viewport height in CSS pixels.
    pub viewport_height: u32,
    /// Upper bound on navigation, including redirects.
    pub navigation_timeout: Duration,
    /// Fixed wait after navigation settles, for late-loading content.
    pub settle_delay: Duration,
    /// JPEG quality, 0-100.
    pub jpeg_quality: i64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1200,
            viewport_height: 800,
            navigation_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(3),
            jpeg_quality: 80,
        }
    }
}

impl Config {
    /// Read the whole configuration from the environment.
    ///
    /// Absent variables become empty strings; call
    /// [`missing_required`](Self::missing_required) before using the result.
    pub fn from_env() -> Self {
        Self {
            catalog: CatalogConfig {
                base_url: env_string("CATALOG_BASE_URL"),
                api_token: env_string("CATALOG_API_TOKEN"),
            },
            storage: StorageConfig {
                account_id: env_string("STORAGE_ACCOUNT_ID"),
                access_key_id: env_string("STORAGE_ACCESS_KEY_ID"),
                secret_access_key: env_string("STORAGE_SECRET_ACCESS_KEY"),
                bucket: env_string("STORAGE_BUCKET"),
                public_base_url: env_string("STORAGE_PUBLIC_URL"),
            },
            capture: CaptureConfig::default(),
            item_ids: parse_id_list(&env_string("ITEM_IDS")),
        }
    }

    /// Names of required values that are absent or blank, in declaration
    /// order. An empty result means the configuration is usable.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let required: [(&'static str, &str); 7] = [
            ("CATALOG_BASE_URL", self.catalog.base_url.as_str()),
            ("CATALOG_API_TOKEN", self.catalog.api_token.as_str()),
            ("STORAGE_ACCOUNT_ID", self.storage.account_id.as_str()),
            ("STORAGE_ACCESS_KEY_ID", self.storage.access_key_id.as_str()),
            (
                "STORAGE_SECRET_ACCESS_KEY",
                self.storage.secret_access_key.as_str(),
            ),
            ("STORAGE_BUCKET", self.storage.bucket.as_str()),
            ("STORAGE_PUBLIC_URL", self.storage.public_base_url.as_str()),
        ];

        required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect()
    }

    /// Explicit ids for targeted mode, or `None` when the run should drain
    /// the backlog.
    pub fn targeted_ids(&self) -> Option<&[String]> {
        if self.item_ids.is_empty() {
            None
        } else {
            Some(&self.item_ids)
        }
    }
}

impl StorageConfig {
    /// S3-compatible endpoint derived from the account id.
    pub fn endpoint(&self) -> String {
        format!("https://{}.r2.cloudflarestorage.com", self.account_id)
    }
}

fn env_string(key: &str) -> String {
    std::env::var(key).unwrap_or_default()
}

/// Parse a comma-separated id list, trimming whitespace and dropping empty
/// entries.
fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
