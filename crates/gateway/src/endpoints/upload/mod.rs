//! # POST /upload
//!
//! multipart/form-data の `file` フィールドで受け取ったファイルを
//! 暗号化・保存・再取得・復号し、出力ディレクトリに書き戻す。
//!
//! ## モジュール構成
//! - `handler`: メインハンドラ（multipart受付・パイプライン実行・エラーログ）
//! - `multipart`: `file` フィールドの取り出しとファイル名の検証

mod handler;
mod multipart;

pub use handler::handle_upload;

/// 成功レスポンスの固定メッセージ
pub(crate) const SUCCESS_MESSAGE: &str = "File uploaded successfully";
