//! # S3互換オブジェクトストレージ実装
//!
//! AWS S3, MinIO, Cloudflare R2 等のS3互換APIを使用する
//! オブジェクトストレージ実装。

use super::{BlobStore, StorageError};
use crate::config::StorageConfig;

/// リージョンを特定できない場合のフォールバック
const FALLBACK_REGION: &str = "us-east-1";

/// S3互換ストレージによるオブジェクトストレージ実装。
pub struct S3BlobStore {
    bucket: s3::Bucket,
}

impl S3BlobStore {
    pub fn new(bucket: s3::Bucket) -> Self {
        Self { bucket }
    }

    /// S3互換バケットを初期化する。
    fn init_bucket(config: &StorageConfig) -> anyhow::Result<s3::Bucket> {
        let region = s3::Region::Custom {
            region: config
                .region
                .clone()
                .unwrap_or_else(|| detect_region(&config.endpoint)),
            endpoint: config.endpoint.clone(),
        };

        let credentials = s3::creds::Credentials::new(
            Some(config.access_key.as_str()),
            Some(config.secret_key.as_str()),
            None,
            None,
            None,
        )?;

        let bucket = s3::Bucket::new(&config.bucket, region, credentials)?.with_path_style();

        Ok(*bucket)
    }

    /// 設定から構築する。
    pub fn from_config(config: &StorageConfig) -> anyhow::Result<Self> {
        let bucket = Self::init_bucket(config)?;
        tracing::info!(
            s3_endpoint = %config.endpoint,
            s3_bucket = %config.bucket,
            "S3互換ストレージを設定"
        );
        Ok(Self::new(bucket))
    }
}

/// AWS S3エンドポイント（s3.REGION.amazonaws.com）からリージョンを検出する。
/// 非AWSエンドポイントではus-east-1をフォールバックとして使用。
fn detect_region(endpoint: &str) -> String {
    endpoint
        .find("s3.")
        .and_then(|start| {
            let rest = &endpoint[start + 3..];
            rest.find(".amazonaws.com").map(|end| rest[..end].to_string())
        })
        .filter(|region| !region.is_empty())
        .unwrap_or_else(|| FALLBACK_REGION.to_string())
}

/// 2xx以外のステータスコードをStorageErrorに変換する。
fn check_status(key: &str, status: u16) -> Result<(), StorageError> {
    match status {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(key.to_string())),
        other => Err(StorageError::Backend(format!("{key}: HTTP {other}"))),
    }
}

fn map_s3_error(key: &str, err: s3::error::S3Error) -> StorageError {
    match err {
        s3::error::S3Error::HttpFailWithBody(404, _) => StorageError::NotFound(key.to_string()),
        other => StorageError::Backend(format!("{key}: {other}")),
    }
}

#[async_trait::async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), StorageError> {
        let response = self
            .bucket
            .put_object_with_content_type(key, body, content_type)
            .await
            .map_err(|e| map_s3_error(key, e))?;
        check_status(key, response.status_code())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .bucket
            .get_object(key)
            .await
            .map_err(|e| map_s3_error(key, e))?;
        check_status(key, response.status_code())?;
        Ok(response.bytes().to_vec())
    }
}
