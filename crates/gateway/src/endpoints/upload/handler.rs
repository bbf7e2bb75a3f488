//! # POST /upload メインハンドラ

use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use cipherdrop_types::{FileSummary, UploadResponse};

use crate::config::GatewayState;
use crate::error::GatewayError;
use crate::pipeline;

use super::multipart::read_file_field;
use super::SUCCESS_MESSAGE;

/// POST /upload — ファイルを暗号化して保存し、復号結果を書き戻す。
///
/// エラーはここで一度だけ種別付きでログ出力してからレスポンスに変換する。
/// クライアント起因の4xxはwarn、処理段階の失敗はerror。
#[tracing::instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn handle_upload(
    State(state): State<Arc<GatewayState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, GatewayError> {
    let result: Result<FileSummary, GatewayError> = async move {
        let multipart = multipart.map_err(|e| GatewayError::BadRequest(e.body_text()))?;
        let file = read_file_field(multipart).await?;
        pipeline::run(&state, file).await
    }
    .await;

    match result {
        Ok(file) => Ok(Json(UploadResponse {
            message: SUCCESS_MESSAGE.to_string(),
            file,
        })),
        Err(e) => {
            if e.is_client_error() {
                tracing::warn!(kind = e.kind(), error = %e, "アップロードリクエストを拒否");
            } else {
                tracing::error!(kind = e.kind(), error = %e, "アップロード処理に失敗");
            }
            Err(e)
        }
    }
}
