//! Object store sink.
//!
//! Batches are uploaded with a single `put` per flush through the
//! [`object_store`] crate. S3 clients are built from the standard AWS
//! environment (`AWS_REGION`, `AWS_ACCESS_KEY_ID`, `AWS_ENDPOINT`, ...).

use crate::error::BackendBuildError;
use crate::sink::{SinkError, StorageSink};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::sync::Arc;

/// Uploads each batch to `<key_prefix><key>` inside one bucket.
#[derive(Clone)]
pub struct ObjectStoreSink {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    key_prefix: String,
}

impl ObjectStoreSink {
    /// Wrap an already-configured store.
    ///
    /// `key_prefix` is prepended verbatim to every partition key, so it
    /// should be empty or end with `/`.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            key_prefix: key_prefix.into(),
        }
    }

    /// Build an S3-backed sink for `bucket`, taking credentials and region
    /// from the environment.
    #[cfg(feature = "s3")]
    pub fn s3(bucket: &str, key_prefix: &str) -> Result<Self, BackendBuildError> {
        use object_store::aws::AmazonS3Builder;

        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()?;

        Ok(Self::new(Arc::new(store), bucket, key_prefix))
    }

    #[cfg(not(feature = "s3"))]
    pub fn s3(_bucket: &str, _key_prefix: &str) -> Result<Self, BackendBuildError> {
        Err(BackendBuildError::S3FeatureDisabled)
    }

    /// `key_prefix + key`, rejected rather than rewritten if it is not a
    /// valid object path (empty segments, `.` or `..`).
    fn object_path(&self, key: &str) -> Result<ObjectPath, object_store::path::Error> {
        ObjectPath::parse(format!("{}{}", self.key_prefix, key))
    }
}

#[async_trait]
impl StorageSink for ObjectStoreSink {
    async fn write(&self, key: &str, blob: Bytes) -> Result<(), SinkError> {
        let path = self.object_path(key)?;
        self.store.put(&path, PutPayload::from(blob)).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use object_store::memory::InMemory;

    async fn locations(store: &InMemory) -> Vec<String> {
        let listed: Vec<_> = store.list(None).try_collect().await.unwrap();
        listed.into_iter().map(|meta| meta.location.to_string()).collect()
    }

    #[tokio::test]
    async fn puts_object_under_key_prefix() {
        let store = Arc::new(InMemory::new());
        let sink = ObjectStoreSink::new(store.clone(), "bucket", "events/raw/");

        sink.write("2024/05/06/07/abc.json", Bytes::from_static(b"{\"x\":true}\n"))
            .await
            .unwrap();

        let got = store
            .get(&ObjectPath::from("events/raw/2024/05/06/07/abc.json"))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(&got[..], b"{\"x\":true}\n");
    }

    #[tokio::test]
    async fn empty_key_prefix_writes_at_bucket_root() {
        let store = Arc::new(InMemory::new());
        let sink = ObjectStoreSink::new(store.clone(), "bucket", "");

        sink.write("2024/05/06/07/abc.json", Bytes::from_static(b"1\n"))
            .await
            .unwrap();

        assert!(store
            .head(&ObjectPath::from("2024/05/06/07/abc.json"))
            .await
            .is_ok());
        assert_eq!(sink.describe(), "s3://bucket/");
    }

    #[tokio::test]
    async fn key_prefix_is_kept_verbatim() {
        let store = Arc::new(InMemory::new());
        let sink = ObjectStoreSink::new(store.clone(), "bucket", "raw%41 data/");

        sink.write("2024/05/06/07/abc.json", Bytes::from_static(b"1\n"))
            .await
            .unwrap();

        assert_eq!(locations(&store).await, vec!["raw%41 data/2024/05/06/07/abc.json"]);
    }

    #[tokio::test]
    async fn empty_prefix_segment_is_an_error() {
        let store = Arc::new(InMemory::new());
        let sink = ObjectStoreSink::new(store.clone(), "bucket", "a//b/");

        let result = sink
            .write("2024/05/06/07/abc.json", Bytes::from_static(b"1\n"))
            .await;

        assert!(result.is_err());
        assert!(locations(&store).await.is_empty());
    }
}
