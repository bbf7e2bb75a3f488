//! # Gateway エラー型
//!
//! アップロード処理の各段階に対応するエラー分類と、HTTPレスポンスへの変換。

use axum::http::StatusCode;
use axum::Json;
use cipherdrop_types::ErrorResponse;

/// Gatewayエラー型。
///
/// `BadRequest` / `PayloadTooLarge` の内容はクライアントにそのまま返す。
/// 暗号化・保存・取得・復号・検証の失敗は固定メッセージのみ返し、
/// 内容はログにのみ出力する。`Internal` は内容を `details` として返す。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 不正なリクエスト（fileフィールド欠落、ファイル以外の値、不正なファイル名）
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),
    /// リクエストボディが上限を超過
    #[error("リクエストボディが上限を超えています: {0}")]
    PayloadTooLarge(String),
    /// 暗号クライアントが暗号化に失敗
    #[error("暗号化に失敗: {0}")]
    Encryption(String),
    /// 暗号化オブジェクトの保存に失敗
    #[error("暗号化オブジェクトの保存に失敗: {0}")]
    Upload(String),
    /// 暗号化オブジェクトの取得に失敗（存在しない・読み取れない）
    #[error("暗号化オブジェクトの取得に失敗: {0}")]
    Download(String),
    /// 暗号クライアントが復号に失敗
    #[error("復号に失敗: {0}")]
    Decryption(String),
    /// 復元したバイト列が元のファイルと一致しない
    #[error("ラウンドトリップ検証に失敗: {0}")]
    Verification(String),
    /// 分類外のエラー（ファイル書き込み失敗等）
    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    /// ログ出力用のエラー種別名
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::BadRequest(_) => "bad_request",
            GatewayError::PayloadTooLarge(_) => "payload_too_large",
            GatewayError::Encryption(_) => "encryption",
            GatewayError::Upload(_) => "upload",
            GatewayError::Download(_) => "download",
            GatewayError::Decryption(_) => "decryption",
            GatewayError::Verification(_) => "verification",
            GatewayError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Encryption(_)
            | GatewayError::Upload(_)
            | GatewayError::Download(_)
            | GatewayError::Decryption(_)
            | GatewayError::Verification(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// クライアント起因（4xx）のエラーか。ログレベルの選択に使う。
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let (error, details) = match self {
            GatewayError::BadRequest(message) | GatewayError::PayloadTooLarge(message) => {
                (message, None)
            }
            GatewayError::Encryption(_) => ("Failed to encrypt file".to_string(), None),
            GatewayError::Upload(_) => ("Failed to store encrypted file".to_string(), None),
            GatewayError::Download(_) => ("Failed to download encrypted file".to_string(), None),
            GatewayError::Decryption(_) => ("Failed to decrypt file".to_string(), None),
            GatewayError::Verification(_) => ("Round-trip verification failed".to_string(), None),
            GatewayError::Internal(message) => ("Error uploading file".to_string(), Some(message)),
        };
        (status, Json(ErrorResponse { error, details })).into_response()
    }
}
