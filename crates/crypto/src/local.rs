//! # ローカル暗号クライアント
//!
//! 外部暗号化サービスを使わず、プロセス内でEQL形式のエンベロープを生成する。
//!
//! ## エンベロープ形式
//! ```text
//! { "v": 1, "k": "ct", "c": "<Base64(nonce || ciphertext)>", "i": { "t": "<table>", "c": "<column>" } }
//! ```
//!
//! ## 鍵導出
//! `HKDF-SHA256(ikm = client_key, salt = client_id, info = label || workspace || table || column)`
//!
//! テーブル・カラムごとに別の鍵が導出されるため、`i` を書き換えた
//! エンベロープは認証タグの検証で失敗する。

use base64::Engine;
use cipherdrop_types::{Envelope, SchemaRef};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::{
    aes_gcm_decrypt, aes_gcm_encrypt, b64, hkdf_derive_key, ClientCredentials, EncryptionError,
    Encryptor, SymmetricKey,
};

const EQL_VERSION: u8 = 1;
const KIND_CIPHERTEXT: &str = "ct";
const NONCE_LEN: usize = 12;
/// AES-GCM認証タグ長
const TAG_LEN: usize = 16;
const KDF_LABEL: &[u8] = b"cipherdrop-eql-v1";

/// EQL暗号文の構造。
#[derive(Debug, Serialize, Deserialize)]
struct EqlCiphertext {
    /// フォーマットバージョン
    v: u8,
    /// 種別（"ct" = 暗号文）
    k: String,
    /// Base64(nonce || ciphertext)
    c: String,
    /// 暗号化時のスキーマ参照
    i: EqlIdent,
}

#[derive(Debug, Serialize, Deserialize)]
struct EqlIdent {
    t: String,
    c: String,
}

/// プロセス内でEQL形式のエンベロープを生成する暗号クライアント。
pub struct LocalEncryptor {
    credentials: ClientCredentials,
}

impl LocalEncryptor {
    pub fn new(credentials: ClientCredentials) -> Self {
        Self { credentials }
    }

    /// テーブル・カラムに紐づく対称鍵を導出する。
    /// 認証情報の欠落はここで初めて検出される。
    fn column_key(&self, table: &str, column: &str) -> Result<SymmetricKey, EncryptionError> {
        let client_id = self.credentials.client_id.as_deref().ok_or_else(|| {
            EncryptionError::MissingCredentials("CS_CLIENT_IDが設定されていません".to_string())
        })?;
        let client_key = self.credentials.client_key.as_deref().ok_or_else(|| {
            EncryptionError::MissingCredentials("CS_CLIENT_KEYが設定されていません".to_string())
        })?;
        let workspace = self.credentials.workspace_crn.as_deref().unwrap_or_default();

        let mut info = Vec::with_capacity(
            KDF_LABEL.len() + workspace.len() + table.len() + column.len() + 3,
        );
        for part in [KDF_LABEL, workspace.as_bytes(), table.as_bytes(), column.as_bytes()] {
            if !info.is_empty() {
                info.push(0);
            }
            info.extend_from_slice(part);
        }

        hkdf_derive_key(client_key.as_bytes(), Some(client_id.as_bytes()), &info)
    }
}

#[async_trait::async_trait]
impl Encryptor for LocalEncryptor {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn encrypt(
        &self,
        plaintext: &str,
        schema: &SchemaRef,
    ) -> Result<Envelope, EncryptionError> {
        let key = self.column_key(&schema.table, &schema.column)?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce);

        let ciphertext = aes_gcm_encrypt(&key, &nonce, plaintext.as_bytes())?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);

        let eql = EqlCiphertext {
            v: EQL_VERSION,
            k: KIND_CIPHERTEXT.to_string(),
            c: b64().encode(&sealed),
            i: EqlIdent {
                t: schema.table.clone(),
                c: schema.column.clone(),
            },
        };

        tracing::debug!(schema = %schema, sealed_len = sealed.len(), "EQLエンベロープを生成");

        let value = serde_json::to_value(&eql)
            .map_err(|e| EncryptionError::Encrypt(format!("エンベロープのシリアライズに失敗: {e}")))?;
        Ok(Envelope::new(value))
    }

    async fn decrypt(&self, envelope: &Envelope) -> Result<String, EncryptionError> {
        let eql: EqlCiphertext = serde_json::from_value(envelope.as_value().clone())
            .map_err(|e| EncryptionError::MalformedEnvelope(e.to_string()))?;

        if eql.v != EQL_VERSION {
            return Err(EncryptionError::MalformedEnvelope(format!(
                "未対応のバージョン: {}",
                eql.v
            )));
        }
        if eql.k != KIND_CIPHERTEXT {
            return Err(EncryptionError::MalformedEnvelope(format!(
                "未対応の種別: {}",
                eql.k
            )));
        }

        let sealed = b64()
            .decode(&eql.c)
            .map_err(|e| EncryptionError::MalformedEnvelope(format!("Base64デコードに失敗: {e}")))?;
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(EncryptionError::MalformedEnvelope(format!(
                "暗号文が短すぎます: {} bytes",
                sealed.len()
            )));
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);

        let key = self.column_key(&eql.i.t, &eql.i.c)?;
        let plaintext = aes_gcm_decrypt(&key, &nonce, ciphertext)?;

        String::from_utf8(plaintext)
            .map_err(|e| EncryptionError::Decrypt(format!("平文がUTF-8ではありません: {e}")))
    }
}
