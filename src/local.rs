use crate::sink::{SinkError, StorageSink};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;

/// Writes each batch to `<root>/<key>` on the local filesystem, creating
/// partition directories on demand.
#[derive(Debug, Clone)]
pub struct LocalSink {
    root: PathBuf,
}

impl LocalSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key.trim_start_matches('/'))
    }
}

#[async_trait]
impl StorageSink for LocalSink {
    async fn write(&self, key: &str, blob: Bytes) -> Result<(), SinkError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &blob).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file://{}", self.root.display())
    }
}
