//! # Gateway設定・共有状態
//!
//! 環境変数からの設定読み込みとGatewayの共有状態の定義。
//! 設定はプロセス起動時に一度だけ構築し、ハンドラは環境変数を直接参照しない。

use std::fmt;
use std::path::PathBuf;

use anyhow::Context;
use cipherdrop_crypto::{ClientCredentials, Encryptor};
use cipherdrop_types::SchemaRef;

use crate::storage::BlobStore;

/// リクエストボディ上限のデフォルト値（100MiB）
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 100 * 1024 * 1024;
/// スキーマ参照のデフォルトテーブル名
pub const DEFAULT_TABLE: &str = "file_uploads";
/// スキーマ参照のデフォルトカラム名
pub const DEFAULT_COLUMN: &str = "file_data";
/// 復元ファイルの出力先（作業ディレクトリからの相対パス）
pub const DEFAULT_OUTPUT_DIR: &str = "uploads";

/// S3互換ストレージの接続設定。全項目必須（`region` を除く）。
#[derive(Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// 署名リージョン。Noneの場合はエンドポイントから推定する。
    pub region: Option<String>,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .finish()
    }
}

/// Gateway設定。
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// オブジェクトストレージ接続設定
    pub storage: StorageConfig,
    /// 暗号クライアントの認証情報（欠落の検出はクライアント側で行う）
    pub credentials: ClientCredentials,
    /// 外部暗号化サービスのベースURL。Noneの場合はローカル暗号クライアントを使用する。
    pub encryption_endpoint: Option<String>,
    /// 暗号化コンテキストのスキーマ参照
    pub schema: SchemaRef,
    /// 復元ファイルの出力ディレクトリ
    pub output_dir: PathBuf,
    /// リクエストボディ上限（バイト）
    pub max_upload_size: usize,
}

impl GatewayConfig {
    /// 環境変数から構築する。
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意のキー参照関数から構築する。空文字列は未設定として扱う。
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let storage = match (
            get("S3_ENDPOINT"),
            get("S3_ACCESS_KEY"),
            get("S3_SECRET_KEY"),
            get("S3_BUCKET"),
        ) {
            (Some(endpoint), Some(access_key), Some(secret_key), Some(bucket)) => StorageConfig {
                endpoint,
                access_key,
                secret_key,
                bucket,
                region: get("S3_REGION"),
            },
            _ => {
                let missing: Vec<&str> = ["S3_ENDPOINT", "S3_ACCESS_KEY", "S3_SECRET_KEY", "S3_BUCKET"]
                    .into_iter()
                    .filter(|&key| get(key).is_none())
                    .collect();
                anyhow::bail!(
                    "ストレージ設定の必須環境変数が未設定です: {}",
                    missing.join(", ")
                );
            }
        };

        let credentials = ClientCredentials {
            client_id: get("CS_CLIENT_ID"),
            client_key: get("CS_CLIENT_KEY"),
            access_key: get("CS_CLIENT_ACCESS_KEY"),
            workspace_crn: get("CS_WORKSPACE_CRN"),
        };

        let schema = SchemaRef::new(
            get("ENCRYPTION_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            get("ENCRYPTION_COLUMN").unwrap_or_else(|| DEFAULT_COLUMN.to_string()),
        );

        let max_upload_size = get("MAX_UPLOAD_SIZE")
            .map(|v| {
                v.trim()
                    .parse::<usize>()
                    .with_context(|| format!("MAX_UPLOAD_SIZEが不正です: {v}"))
            })
            .transpose()?
            .unwrap_or(DEFAULT_MAX_UPLOAD_SIZE);

        Ok(Self {
            storage,
            credentials,
            encryption_endpoint: get("CS_ENCRYPTION_ENDPOINT"),
            schema,
            output_dir: PathBuf::from(
                get("UPLOAD_DIR").unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
            ),
            max_upload_size,
        })
    }
}

/// Gatewayの共有状態。全リクエストから読み取り専用で参照される。
pub struct GatewayState {
    /// オブジェクトストレージ（S3互換等、トレイトで抽象化）
    pub blob_store: Box<dyn BlobStore>,
    /// 暗号クライアント（ローカル/外部サービス、トレイトで抽象化）
    pub encryptor: Box<dyn Encryptor>,
    /// 暗号化コンテキストのスキーマ参照
    pub schema: SchemaRef,
    /// 復元ファイルの出力ディレクトリ
    pub output_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const STORAGE_VARS: &[(&str, &str)] = &[
        ("S3_ENDPOINT", "http://localhost:9000"),
        ("S3_ACCESS_KEY", "minioadmin"),
        ("S3_SECRET_KEY", "minioadmin"),
        ("S3_BUCKET", "encrypted-files"),
    ];

    #[test]
    fn test_defaults_applied() {
        let config = GatewayConfig::from_lookup(lookup_from(STORAGE_VARS)).unwrap();

        assert_eq!(config.storage.bucket, "encrypted-files");
        assert_eq!(config.storage.region, None);
        assert_eq!(config.schema, SchemaRef::new(DEFAULT_TABLE, DEFAULT_COLUMN));
        assert_eq!(config.output_dir, PathBuf::from("uploads"));
        assert_eq!(config.max_upload_size, DEFAULT_MAX_UPLOAD_SIZE);
        assert!(config.encryption_endpoint.is_none());
        assert!(config.credentials.client_id.is_none());
    }

    /// ストレージ設定が欠けている場合は起動エラーになり、欠落キーが列挙されることを確認
    #[test]
    fn test_missing_storage_is_fatal() {
        let err = GatewayConfig::from_lookup(lookup_from(&[
            ("S3_ENDPOINT", "http://localhost:9000"),
            ("S3_ACCESS_KEY", "minioadmin"),
        ]))
        .unwrap_err()
        .to_string();

        assert!(err.contains("S3_SECRET_KEY"));
        assert!(err.contains("S3_BUCKET"));
        assert!(!err.contains("S3_ENDPOINT"));
    }

    /// 空文字列は未設定として扱われることを確認
    #[test]
    fn test_blank_values_treated_as_missing() {
        let mut vars = STORAGE_VARS.to_vec();
        vars[3] = ("S3_BUCKET", "  ");
        assert!(GatewayConfig::from_lookup(lookup_from(&vars)).is_err());
    }

    /// 暗号化認証情報が無くても設定読み込み自体は成功することを確認
    #[test]
    fn test_encryption_settings_are_optional() {
        let mut vars = STORAGE_VARS.to_vec();
        vars.extend_from_slice(&[
            ("CS_CLIENT_ID", "client-1"),
            ("CS_WORKSPACE_CRN", "crn:ap-southeast-2.aws:workspace"),
            ("CS_ENCRYPTION_ENDPOINT", "https://encryption.example.com"),
            ("ENCRYPTION_TABLE", "documents"),
            ("ENCRYPTION_COLUMN", "body"),
            ("UPLOAD_DIR", "/var/lib/cipherdrop"),
            ("MAX_UPLOAD_SIZE", "2048"),
        ]);

        let config = GatewayConfig::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(config.credentials.client_id.as_deref(), Some("client-1"));
        assert!(config.credentials.client_key.is_none());
        assert_eq!(
            config.encryption_endpoint.as_deref(),
            Some("https://encryption.example.com")
        );
        assert_eq!(config.schema, SchemaRef::new("documents", "body"));
        assert_eq!(config.output_dir, PathBuf::from("/var/lib/cipherdrop"));
        assert_eq!(config.max_upload_size, 2048);
    }

    #[test]
    fn test_invalid_max_upload_size() {
        let mut vars = STORAGE_VARS.to_vec();
        vars.push(("MAX_UPLOAD_SIZE", "lots"));
        let err = GatewayConfig::from_lookup(lookup_from(&vars)).unwrap_err();
        assert!(err.to_string().contains("MAX_UPLOAD_SIZE"));
    }

    #[test]
    fn test_storage_debug_redacts_secret() {
        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("S3_ENDPOINT", "http://localhost:9000"),
            ("S3_ACCESS_KEY", "minioadmin"),
            ("S3_SECRET_KEY", "very-secret-value"),
            ("S3_BUCKET", "encrypted-files"),
        ]))
        .unwrap();
        assert!(!format!("{:?}", config.storage).contains("very-secret-value"));
    }
}
