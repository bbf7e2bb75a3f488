//! # アップロードパイプライン
//!
//! 1ファイル分の処理を順に実行する。
//!
//! ## 処理フロー
//! 1. ファイル本体をBase64エンコード
//! 2. 暗号クライアントで暗号化（失敗時はストレージに触れない）
//! 3. エンベロープをJSON化し `<ファイル名>.encrypted` として保存
//! 4. 同じキーを即座に再取得
//! 5. 取得したエンベロープを復号
//! 6. Base64デコードし、元ファイルとのダイジェスト一致を確認して出力ディレクトリに書き込む
//!
//! リトライ・タイムアウト・補償処理（失敗時の保存済みオブジェクト削除）は行わない。

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use base64::Engine;
use cipherdrop_crypto::{b64, sha256};
use cipherdrop_types::{Envelope, FileSummary};

use crate::config::GatewayState;
use crate::error::GatewayError;
use crate::storage::encrypted_object_key;

/// 保存する暗号化オブジェクトのContent-Type
const ENVELOPE_CONTENT_TYPE: &str = "application/json";

/// multipartから取り出したアップロードファイル。リクエスト単位で破棄される。
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// パス成分を除去済みのファイル名
    pub name: String,
    /// クライアントが申告したMIMEタイプ
    pub content_type: String,
    /// ファイル本体
    pub bytes: Bytes,
}

/// アップロードパイプラインを実行し、成功時はファイルのメタデータを返す。
pub async fn run(state: &GatewayState, file: UploadedFile) -> Result<FileSummary, GatewayError> {
    tracing::info!(
        file_name = %file.name,
        content_type = %file.content_type,
        size = file.bytes.len(),
        "ファイルを受信"
    );

    // Step 1. Base64エンコード（ストリーミングせず全体をメモリ上で扱う）
    let encoded = b64().encode(&file.bytes);

    // Step 2. 暗号化
    let envelope = state
        .encryptor
        .encrypt(&encoded, &state.schema)
        .await
        .map_err(|e| GatewayError::Encryption(e.to_string()))?;

    // Step 3. エンベロープを保存
    let object_key = encrypted_object_key(&file.name);
    let body = serde_json::to_vec(&envelope)
        .map_err(|e| GatewayError::Internal(format!("エンベロープのシリアライズに失敗: {e}")))?;
    state
        .blob_store
        .put(&object_key, &body, ENVELOPE_CONTENT_TYPE)
        .await
        .map_err(|e| GatewayError::Upload(e.to_string()))?;
    tracing::info!(object_key = %object_key, stored_bytes = body.len(), "暗号化オブジェクトを保存");

    // Step 4. 再取得
    let downloaded = state
        .blob_store
        .get(&object_key)
        .await
        .map_err(|e| GatewayError::Download(e.to_string()))?;
    let stored: Envelope = serde_json::from_slice(&downloaded)
        .map_err(|e| GatewayError::Download(format!("保存済みエンベロープのパースに失敗: {e}")))?;

    // Step 5. 復号
    let decrypted = state
        .encryptor
        .decrypt(&stored)
        .await
        .map_err(|e| GatewayError::Decryption(e.to_string()))?;

    // Step 6. 復元・検証・書き込み
    let restored = b64()
        .decode(decrypted.as_bytes())
        .map_err(|e| GatewayError::Decryption(format!("復号結果のBase64デコードに失敗: {e}")))?;
    verify_round_trip(&file.bytes, &restored)?;

    let path = persist(&state.output_dir, &file.name, &restored).await?;
    tracing::info!(path = %path.display(), "復元ファイルを書き込み");

    Ok(FileSummary {
        size: file.bytes.len() as u64,
        name: file.name,
        content_type: file.content_type,
    })
}

/// 復元したバイト列が元のファイルと一致することを確認する。
/// 不一致の場合のみ、ログ用に双方のSHA-256を計算する。
fn verify_round_trip(original: &[u8], restored: &[u8]) -> Result<(), GatewayError> {
    if original == restored {
        return Ok(());
    }
    Err(GatewayError::Verification(format!(
        "内容不一致: expected sha256={} ({} bytes) actual sha256={} ({} bytes)",
        hex::encode(sha256(original)),
        original.len(),
        hex::encode(sha256(restored)),
        restored.len()
    )))
}

/// 出力ディレクトリに書き込む。同名ファイルは上書きする。
async fn persist(output_dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, GatewayError> {
    tokio::fs::create_dir_all(output_dir).await.map_err(|e| {
        GatewayError::Internal(format!(
            "出力ディレクトリの作成に失敗 ({}): {e}",
            output_dir.display()
        ))
    })?;

    let path = output_dir.join(file_name);
    tokio::fs::write(&path, bytes).await.map_err(|e| {
        GatewayError::Internal(format!("ファイルの書き込みに失敗 ({}): {e}", path.display()))
    })?;
    Ok(path)
}
