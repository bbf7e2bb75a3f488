//! # オブジェクトストレージ
//!
//! 暗号化エンベロープの保存先の抽象インターフェース。
//! S3互換ストレージ実装は `s3` サブモジュールを参照。
//!
//! ストレージに渡すのはエンベロープのJSONのみで、平文は保存しない。

#[cfg(feature = "vendor-aws")]
pub mod s3;

#[cfg(feature = "vendor-aws")]
pub use s3::S3BlobStore;

/// 暗号化オブジェクトのキーに付与するサフィックス
pub const ENCRYPTED_SUFFIX: &str = ".encrypted";

/// ストレージ操作のエラー型
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 指定キーのオブジェクトが存在しない
    #[error("オブジェクトが存在しません: {0}")]
    NotFound(String),
    /// バックエンドがエラーを返した、または通信に失敗した
    #[error("ストレージ操作に失敗: {0}")]
    Backend(String),
}

/// オブジェクトストレージの抽象インターフェース。
///
/// Gateway運用者はS3互換ストレージ（MinIO, AWS S3, Cloudflare R2等）や
/// その他のストレージバックエンドを実装として選択できる。
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// オブジェクトを保存する。同一キーは上書きされる。
    async fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// オブジェクトを取得する。存在しない場合は `StorageError::NotFound`。
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;
}

/// 元のファイル名から暗号化オブジェクトのキーを作る。
pub fn encrypted_object_key(file_name: &str) -> String {
    format!("{file_name}{ENCRYPTED_SUFFIX}")
}
