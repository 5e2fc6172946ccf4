//! Production client for S3-compatible object stores (Aliyun OSS, AWS S3,
//! MinIO), built on the `object_store` crate.

use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{GetOptions, GetRange, ObjectStore};

use crate::api::ObjectClient;
use crate::error::{ClientError, Result};
use crate::types::{GetResponse, ListingPage, ObjectMeta};

/// Connection parameters for an S3-compatible endpoint.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Endpoint URL (e.g. "https://oss-cn-beijing.aliyuncs.com").
    pub endpoint: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket: String,
    /// Optional region (defaults to "us-east-1")
    pub region: Option<String>,
}

/// Client for a single bucket on an S3-compatible store.
#[derive(Clone)]
pub struct S3Client {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl S3Client {
    /// Build a client from connection parameters. Performs no network I/O;
    /// a misconfigured endpoint surfaces on the first operation.
    pub fn connect(config: &S3Config) -> Result<Self> {
        let builder = AmazonS3Builder::new()
            .with_endpoint(config.endpoint.as_str())
            .with_access_key_id(config.access_key_id.as_str())
            .with_secret_access_key(config.secret_access_key.as_str())
            .with_bucket_name(config.bucket.as_str())
            .with_region(config.region.as_deref().unwrap_or("us-east-1"))
            .with_allow_http(config.endpoint.starts_with("http://"));

        let store = builder
            .build()
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;

        tracing::debug!(bucket = %config.bucket, endpoint = %config.endpoint, "S3 client ready");

        Ok(Self {
            store: Arc::new(store),
            bucket: config.bucket.clone(),
        })
    }

    /// The bucket this client is bound to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Probe a directory-marker key.
    ///
    /// `object_store` paths normalize away the trailing delimiter, so the
    /// marker cannot be addressed with `head`. Any entry under the prefix
    /// (the marker itself or a child) proves the directory exists; its
    /// metadata is synthesized from the first entry found.
    async fn head_marker(&self, key: &str) -> Result<ObjectMeta> {
        let prefix = ObjectPath::from(key);
        let mut entries = self.store.list(Some(&prefix));
        match entries.next().await {
            Some(Ok(entry)) => Ok(ObjectMeta {
                key: key.to_string(),
                size: 0,
                last_modified: entry.last_modified,
            }),
            Some(Err(e)) => Err(e.into()),
            None => Err(ClientError::NoSuchKey(key.to_string())),
        }
    }
}

fn convert_meta(meta: object_store::ObjectMeta) -> ObjectMeta {
    ObjectMeta {
        key: meta.location.to_string(),
        size: meta.size as u64,
        last_modified: meta.last_modified,
    }
}

#[async_trait]
impl ObjectClient for S3Client {
    async fn head_object(&self, key: &str) -> Result<ObjectMeta> {
        if key.ends_with('/') {
            return self.head_marker(key).await;
        }

        let path = ObjectPath::from(key);
        match self.store.head(&path).await {
            Ok(meta) => Ok(convert_meta(meta)),
            Err(object_store::Error::NotFound { .. }) => {
                Err(ClientError::NoSuchKey(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_object(&self, key: &str, range: Option<Range<u64>>) -> Result<GetResponse> {
        let path = ObjectPath::from(key);
        let options = GetOptions {
            range: range.map(|r| GetRange::Bounded(r.start as usize..r.end as usize)),
            ..Default::default()
        };

        match self.store.get_opts(&path, options).await {
            Ok(result) => {
                let content_length = (result.range.end - result.range.start) as u64;
                let object_size = result.meta.size as u64;
                let last_modified = result.meta.last_modified;
                let body = result
                    .into_stream()
                    .map_err(ClientError::from)
                    .boxed();
                Ok(GetResponse {
                    content_length,
                    object_size,
                    last_modified,
                    body,
                })
            }
            Err(object_store::Error::NotFound { .. }) => {
                Err(ClientError::NoSuchKey(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_objects(
        &self,
        prefix: &str,
        delimiter: &str,
        _max_keys: usize,
        _continuation: Option<&str>,
    ) -> Result<ListingPage> {
        // object_store only groups on "/" and drives its own pagination,
        // so one call yields the complete result as a single page.
        debug_assert_eq!(delimiter, "/");

        let prefix_path = if prefix.is_empty() {
            None
        } else {
            Some(ObjectPath::from(prefix))
        };

        let listing = self.store.list_with_delimiter(prefix_path.as_ref()).await?;

        Ok(ListingPage {
            common_prefixes: listing
                .common_prefixes
                .iter()
                .map(|p| format!("{}/", p))
                .collect(),
            objects: listing.objects.into_iter().map(convert_meta).collect(),
            continuation: None,
            truncated: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn client_over(store: impl ObjectStore) -> S3Client {
        S3Client {
            store: Arc::new(store),
            bucket: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn marker_probe_falls_back_to_a_prefixed_listing() {
        let store = InMemory::new();
        store
            .put(&ObjectPath::from("docs/readme.txt"), "abcdefg".into())
            .await
            .unwrap();
        let client = client_over(store);

        // The store normalizes "docs/" to "docs" and has no object there,
        // yet the directory must still resolve.
        let meta = client.head_object("docs/").await.unwrap();
        assert_eq!(meta.key, "docs/");
        assert_eq!(meta.size, 0);

        let err = client.head_object("ghost/").await.unwrap_err();
        assert!(err.is_no_such_key());

        // The bare-key probe is untouched by the fallback.
        let err = client.head_object("docs").await.unwrap_err();
        assert!(err.is_no_such_key());
    }

    #[tokio::test]
    async fn ranged_get_reports_the_total_object_size() {
        let store = InMemory::new();
        store
            .put(&ObjectPath::from("a.txt"), "abcdefg".into())
            .await
            .unwrap();
        let client = client_over(store);

        let resp = client.get_object("a.txt", Some(2..4)).await.unwrap();
        assert_eq!(resp.content_length, 2);
        assert_eq!(resp.object_size, 7);
    }
}
