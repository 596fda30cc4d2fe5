use std::sync::Arc;

use crate::error::{BackendBuildError, PrefixError};
use crate::local::LocalSink;
use crate::s3::ObjectStoreSink;
use crate::sink::StorageSink;

const S3_SCHEME: &str = "s3://";
const FILE_SCHEME: &str = "file://";

/// Supported storage backends, selected by the scheme of the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Local,
    S3,
}

/// Storage target parsed from a `PREFIX` value.
///
/// The prefix is normalized to end with `/` so that partition keys can be
/// appended directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Selected backend implementation.
    pub kind: BackendKind,
    /// Normalized prefix, scheme included for object stores.
    pub prefix: String,
}

impl BackendConfig {
    /// Bucket and in-bucket key prefix for object store targets.
    ///
    /// `s3://bucket/a/b/` yields `("bucket", "a/b/")`; `s3://bucket/`
    /// yields `("bucket", "")`.
    pub fn bucket_and_key_prefix(&self) -> Option<(&str, &str)> {
        if self.kind != BackendKind::S3 {
            return None;
        }
        let rest = &self.prefix[S3_SCHEME.len()..];
        Some(rest.split_once('/').unwrap_or((rest, "")))
    }

    /// Filesystem root for local targets.
    pub fn local_root(&self) -> Option<&str> {
        match self.kind {
            BackendKind::Local => Some(&self.prefix),
            BackendKind::S3 => None,
        }
    }
}

/// Parse a storage prefix and infer the backend kind from its scheme.
///
/// Examples:
/// - "s3://bucket/events/" → S3, bucket `bucket`, key prefix `events/`
/// - "/var/spool/ndjson"    → Local, root `/var/spool/ndjson/`
/// - "file:///tmp/out"      → Local, root `/tmp/out/`
pub fn parse_prefix(prefix: &str) -> Result<BackendConfig, PrefixError> {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return Err(PrefixError::Empty);
    }

    let lower = prefix.to_ascii_lowercase();

    if lower.starts_with(S3_SCHEME) {
        let rest = &prefix[S3_SCHEME.len()..];
        let bucket = rest.split('/').next().unwrap_or("");
        if bucket.is_empty() {
            return Err(PrefixError::MissingBucket(prefix.to_string()));
        }
        Ok(BackendConfig {
            kind: BackendKind::S3,
            prefix: with_trailing_slash(&format!("{}{}", S3_SCHEME, rest)),
        })
    } else if lower.starts_with(FILE_SCHEME) {
        let path = &prefix[FILE_SCHEME.len()..];
        if path.is_empty() {
            return Err(PrefixError::Empty);
        }
        Ok(BackendConfig {
            kind: BackendKind::Local,
            prefix: with_trailing_slash(path),
        })
    } else {
        Ok(BackendConfig {
            kind: BackendKind::Local,
            prefix: with_trailing_slash(prefix),
        })
    }
}

fn with_trailing_slash(prefix: &str) -> String {
    if prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{}/", prefix)
    }
}

/// Create a concrete [`StorageSink`] from a [`BackendConfig`].
///
/// This is the main entry point for applications that select storage with
/// a single prefix string instead of constructing sinks manually.
pub fn make_sink_from_config(
    cfg: &BackendConfig,
) -> Result<Arc<dyn StorageSink>, BackendBuildError> {
    match cfg.kind {
        BackendKind::Local => {
            let root = cfg.local_root().unwrap_or(cfg.prefix.as_str());
            Ok(Arc::new(LocalSink::new(root)) as Arc<dyn StorageSink>)
        }
        BackendKind::S3 => {
            let (bucket, key_prefix) = cfg
                .bucket_and_key_prefix()
                .unwrap_or((cfg.prefix.as_str(), ""));
            let sink = ObjectStoreSink::s3(bucket, key_prefix)?;
            Ok(Arc::new(sink) as Arc<dyn StorageSink>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_path_is_local_and_gains_trailing_slash() {
        let cfg = parse_prefix("/tmp").unwrap();
        assert_eq!(cfg.kind, BackendKind::Local);
        assert_eq!(cfg.prefix, "/tmp/");
        assert_eq!(cfg.local_root(), Some("/tmp/"));
        assert_eq!(cfg.bucket_and_key_prefix(), None);
    }

    #[test]
    fn file_scheme_is_stripped() {
        let cfg = parse_prefix("file:///data/out").unwrap();
        assert_eq!(cfg.kind, BackendKind::Local);
        assert_eq!(cfg.prefix, "/data/out/");
    }

    #[test]
    fn s3_prefix_splits_bucket_and_key_prefix() {
        let cfg = parse_prefix("s3://my-bucket/ingest/json").unwrap();
        assert_eq!(cfg.kind, BackendKind::S3);
        assert_eq!(cfg.prefix, "s3://my-bucket/ingest/json/");
        assert_eq!(cfg.bucket_and_key_prefix(), Some(("my-bucket", "ingest/json/")));
    }

    #[test]
    fn s3_bucket_without_subpath_has_empty_key_prefix() {
        let cfg = parse_prefix("S3://my-bucket").unwrap();
        assert_eq!(cfg.kind, BackendKind::S3);
        assert_eq!(cfg.bucket_and_key_prefix(), Some(("my-bucket", "")));
    }

    #[test]
    fn rejects_empty_and_bucketless_prefixes() {
        assert_eq!(parse_prefix("  "), Err(PrefixError::Empty));
        assert!(matches!(parse_prefix("s3://"), Err(PrefixError::MissingBucket(_))));
        assert!(matches!(parse_prefix("s3:///key"), Err(PrefixError::MissingBucket(_))));
    }

    #[test]
    fn local_config_builds_local_sink() {
        let cfg = parse_prefix("/tmp/ndjson-test").unwrap();
        let sink = make_sink_from_config(&cfg).unwrap();
        assert_eq!(sink.describe(), "file:///tmp/ndjson-test/");
    }
}
