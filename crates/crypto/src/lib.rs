//! # Cipherdrop 暗号クライアント
//!
//! フィールドレベル暗号化クライアントの抽象インターフェースと実装。
//! Gatewayは `Encryptor` トレイトのみに依存し、鍵管理・暗号化・復号は
//! 実装側に委譲する。
//!
//! ## 実装
//! - `RemoteEncryptor`: 外部暗号化サービスへのJSON over HTTPクライアント
//! - `LocalEncryptor`: プロセス内でEQL形式のエンベロープを生成する（開発用）
//!
//! ## 暗号アルゴリズム（LocalEncryptor）
//! | 用途 | アルゴリズム |
//! |------|------------|
//! | 鍵導出 | HKDF-SHA256 |
//! | 対称暗号 | AES-256-GCM |
//! | ダイジェスト | SHA-256 |

pub mod local;
pub mod remote;

pub use local::LocalEncryptor;
pub use remote::RemoteEncryptor;

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use cipherdrop_types::{Envelope, SchemaRef};
use hkdf::Hkdf;
use sha2::{Digest, Sha256};

/// 暗号クライアントのエラー型
#[derive(Debug, thiserror::Error)]
pub enum EncryptionError {
    /// 認証情報が未設定
    #[error("暗号クライアントの認証情報が未設定です: {0}")]
    MissingCredentials(String),
    /// 暗号化に失敗
    #[error("暗号化に失敗しました: {0}")]
    Encrypt(String),
    /// 復号に失敗
    #[error("復号に失敗しました: {0}")]
    Decrypt(String),
    /// エンベロープの形式が不正
    #[error("エンベロープの形式が不正です: {0}")]
    MalformedEnvelope(String),
    /// 外部暗号化サービスとの通信に失敗
    #[error("暗号化サービスとの通信に失敗: {0}")]
    Transport(String),
}

/// 暗号クライアントの認証情報。
///
/// いずれも任意項目。未設定の検出は各クライアントが初回利用時に行う。
#[derive(Clone, Default)]
pub struct ClientCredentials {
    /// クライアントID (CS_CLIENT_ID)
    pub client_id: Option<String>,
    /// クライアント鍵素材 (CS_CLIENT_KEY)
    pub client_key: Option<String>,
    /// 外部暗号化サービスのアクセスキー (CS_CLIENT_ACCESS_KEY)
    pub access_key: Option<String>,
    /// ワークスペース識別子 (CS_WORKSPACE_CRN)
    pub workspace_crn: Option<String>,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_key", &redact(&self.client_key))
            .field("access_key", &redact(&self.access_key))
            .field("workspace_crn", &self.workspace_crn)
            .finish()
    }
}

/// フィールドレベル暗号化クライアントの抽象インターフェース。
///
/// 平文はBase64文字列として受け渡す。エンベロープの内部構造は
/// 実装ごとに異なり、呼び出し側は解釈しない。
#[async_trait::async_trait]
pub trait Encryptor: Send + Sync {
    /// ログ出力用の実装名
    fn name(&self) -> &'static str;

    /// 平文をスキーマ参照のコンテキストで暗号化する。
    async fn encrypt(&self, plaintext: &str, schema: &SchemaRef)
        -> Result<Envelope, EncryptionError>;

    /// `encrypt` が生成したエンベロープを復号し、元の平文を返す。
    async fn decrypt(&self, envelope: &Envelope) -> Result<String, EncryptionError>;
}

/// 対称鍵（AES-256用、32バイト）
pub type SymmetricKey = [u8; 32];

/// Base64エンジン（Standard）
pub fn b64() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

/// HKDF-SHA256による対称鍵の導出。
pub fn hkdf_derive_key(
    input_key: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
) -> Result<SymmetricKey, EncryptionError> {
    let hkdf = Hkdf::<Sha256>::new(salt, input_key);
    let mut key = [0u8; 32];
    hkdf.expand(info, &mut key)
        .map_err(|e| EncryptionError::Encrypt(format!("HKDF鍵導出に失敗: {e}")))?;
    Ok(key)
}

/// AES-256-GCMによる暗号化。
pub fn aes_gcm_encrypt(
    key: &SymmetricKey,
    nonce: &[u8; 12],
    plaintext: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| EncryptionError::Encrypt("AES鍵長が不正です".to_string()))?;
    let nonce = Nonce::from_slice(nonce);
    cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| EncryptionError::Encrypt("AES-GCM暗号化に失敗".to_string()))
}

/// AES-256-GCMによる復号。
pub fn aes_gcm_decrypt(
    key: &SymmetricKey,
    nonce: &[u8; 12],
    ciphertext: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| EncryptionError::Decrypt("AES鍵長が不正です".to_string()))?;
    let nonce = Nonce::from_slice(nonce);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| EncryptionError::Decrypt("AES-GCM認証タグの検証に失敗".to_string()))
}

/// SHA-256ハッシュ計算。
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}
