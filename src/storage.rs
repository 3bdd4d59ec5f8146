//! Blob storage for uploaded avatars.

use std::path::PathBuf;

use anyhow::Context;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use axum::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::config::S3Config;

/// URL prefix the local backend is served under.
pub const STATIC_PREFIX: &str = "/static";

#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `body` as `dir/filename` and return the path clients fetch it from.
    async fn save(
        &self,
        dir: &str,
        filename: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<String>;
}

fn blob_key(dir: &str, filename: &str) -> anyhow::Result<String> {
    let key = format!("{}/{filename}", dir.trim_matches('/'));
    anyhow::ensure!(
        !key.split('/').any(|part| part.is_empty() || part == ".." || part == "."),
        "bad blob key {key:?}"
    );
    Ok(key)
}

/// Files under a directory, served by the app itself.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStorage for LocalStorage {
    async fn save(
        &self,
        dir: &str,
        filename: &str,
        body: Bytes,
        _content_type: &str,
    ) -> anyhow::Result<String> {
        let key = blob_key(dir, filename)?;
        let path = self.root.join(&key);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create {}", dir.display()))?;
        }
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        debug!(path = %path.display(), bytes = body.len(), "blob written");
        Ok(format!("{STATIC_PREFIX}/{key}"))
    }
}

#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    public_url: String,
}

impl S3Storage {
    pub async fn new(cfg: &S3Config) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
            public_url: cfg.public_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BlobStorage for S3Storage {
    async fn save(
        &self,
        dir: &str,
        filename: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<String> {
        let key = blob_key(dir, filename)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("s3 put_object {key}"))?;
        Ok(format!("{}/{key}", self.public_url))
    }
}
