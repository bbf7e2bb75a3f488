//! # multipart解析
//!
//! 外部呼び出しの前に入力を検証する。ここで失敗したリクエストは
//! 暗号クライアントにもストレージにも到達しない。

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;

use crate::error::GatewayError;
use crate::pipeline::UploadedFile;

/// ファイルを受け取るフィールド名
pub(crate) const FILE_FIELD: &str = "file";
/// Content-Typeが申告されなかった場合のMIMEタイプ
pub(crate) const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// multipartから `file` フィールドを探し、本体をメモリに読み込む。
///
/// `file` 以外のフィールドは読み飛ばす。`file` がファイルパート
/// （filename付き）でない場合は `BadRequest`。
pub(crate) async fn read_file_field(mut multipart: Multipart) -> Result<UploadedFile, GatewayError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let Some(raw_name) = field.file_name().map(str::to_string) else {
            return Err(GatewayError::BadRequest(
                "The \"file\" field must be a file".to_string(),
            ));
        };
        let name = sanitize_file_name(&raw_name)
            .ok_or_else(|| GatewayError::BadRequest(format!("Invalid file name: {raw_name:?}")))?;
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let bytes = field.bytes().await.map_err(multipart_error)?;

        return Ok(UploadedFile {
            name,
            content_type,
            bytes,
        });
    }

    Err(GatewayError::BadRequest("No file uploaded".to_string()))
}

/// クライアント申告のファイル名から最後のパス成分だけを取り出す。
/// 空・`.`・`..` の場合はNone。前後の空白は変更しない。
pub(crate) fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next()?;
    match name {
        "" | "." | ".." => None,
        _ if name.contains('\0') => None,
        _ => Some(name.to_string()),
    }
}

/// ボディ上限超過は413、それ以外の解析失敗は400に分類する。
fn multipart_error(err: MultipartError) -> GatewayError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GatewayError::PayloadTooLarge(err.body_text())
    } else {
        GatewayError::BadRequest(err.body_text())
    }
}
