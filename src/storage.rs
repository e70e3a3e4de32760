//! Artifact persistence into the S3-compatible capture bucket.
//!
//! Keys are deterministic per item, so re-processing an item overwrites its
//! previous artifact instead of accumulating copies. Artifacts are immutable
//! once written, which is why the cache directive allows week-long client
//! caching.

use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, Attributes, ObjectStore, PutOptions, PutPayload, RetryConfig,
};

use crate::config::StorageConfig;
use crate::error::{Error, StorageError};

/// Namespace prefix under which all capture artifacts live.
const KEY_PREFIX: &str = "screenshots";

/// Content type of every stored artifact.
const CONTENT_TYPE: &str = "image/jpeg";

/// Cache directive applied to stored artifacts: public, one week.
const CACHE_CONTROL: &str = "public, max-age=604800";

/// Writes capture artifacts to the object store and hands back their public
/// addresses.
pub struct StorageSink {
    store: Arc<dyn ObjectStore>,
    public_base_url: String,
}

impl StorageSink {
    /// Build a sink against the configured bucket.
    ///
    /// Uploads are single attempts; the catalog re-queues failed items on a
    /// later run, so client-level retries are disabled.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the store cannot be built from the
    /// given settings.
    pub fn new(config: &StorageConfig) -> Result<Self, Error> {
        let store = AmazonS3Builder::new()
            .with_endpoint(config.endpoint())
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .with_region("auto")
            .with_retry(RetryConfig {
                max_retries: 0,
                ..RetryConfig::default()
            })
            .build()
            .map_err(|e| Error::Config(format!("storage client: {e}")))?;

        Ok(Self::with_store(Arc::new(store), &config.public_base_url))
    }

    /// Build a sink over an already-constructed store. Tests pair this with
    /// an in-memory store or a store aimed at a stub server.
    pub fn with_store(store: Arc<dyn ObjectStore>, public_base_url: &str) -> Self {
        Self {
            store,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Persist one artifact under its deterministic key and return the
    /// public address it will be served from.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Upload`] if the put fails. Not retried.
    pub async fn store(&self, item_id: &str, image: Vec<u8>) -> Result<String, StorageError> {
        let key = artifact_key(item_id);

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, CONTENT_TYPE.into());
        attributes.insert(Attribute::CacheControl, CACHE_CONTROL.into());
        let options = PutOptions {
            attributes,
            ..PutOptions::default()
        };

        self.store
            .put_opts(
                &ObjectPath::from(key.as_str()),
                PutPayload::from(image),
                options,
            )
            .await
            .map_err(|source| StorageError::Upload {
                key: key.clone(),
                source,
            })?;

        tracing::debug!(key = %key, "artifact stored");
        Ok(self.public_url(&key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

/// Deterministic artifact key for an item.
fn artifact_key(item_id: &str) -> String {
    format!("{KEY_PREFIX}/{item_id}.jpg")
}
