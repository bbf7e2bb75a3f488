//! # Cipherdrop 共有型定義
//!
//! Gateway・暗号クライアント・外部暗号化サービス間で共有するデータ構造。
//!
//! ## エンコーディング規則
//! - Base64 (Standard): ファイル本体（暗号化前の平文として扱う）
//! - JSON: 暗号化エンベロープ（中身は暗号クライアント以外が解釈しない）

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// スキーマ参照
// ---------------------------------------------------------------------------

/// 暗号クライアントに渡す論理テーブル名・カラム名の組。
///
/// 実在するリレーショナルスキーマではなく、どの鍵素材で復号できるかを
/// 限定するためのコンテキストタグとして使われる。
/// プロセス起動時に一度だけ構築され、以後は読み取り専用で共有される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRef {
    /// 論理テーブル名
    pub table: String,
    /// 論理カラム名
    pub column: String,
}

impl SchemaRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

// ---------------------------------------------------------------------------
// 暗号化エンベロープ
// ---------------------------------------------------------------------------

/// 暗号クライアントが生成する不透明な暗号化表現（EQLペイロード）。
///
/// Gatewayは内部構造を解釈せず、JSONとして保存・再取得して
/// 暗号クライアントに返すだけである。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope(serde_json::Value);

impl Envelope {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

// ---------------------------------------------------------------------------
// POST /upload レスポンス
// ---------------------------------------------------------------------------

/// アップロード成功時のレスポンス。ファイル本体は含めない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// 固定メッセージ ("File uploaded successfully")
    pub message: String,
    /// 受信したファイルのメタデータ
    pub file: FileSummary,
}

/// 受信ファイルのメタデータ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    /// 元のファイル名
    pub name: String,
    /// クライアントが申告したMIMEタイプ
    #[serde(rename = "type")]
    pub content_type: String,
    /// バイト長
    pub size: u64,
}

/// エラーレスポンス。
/// 分類済みのエラーは `error` のみ、分類外のエラーは `details` も返す。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// ---------------------------------------------------------------------------
// 外部暗号化サービス (POST /v1/encrypt, POST /v1/decrypt)
// ---------------------------------------------------------------------------

/// 外部暗号化サービスへの暗号化リクエスト。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptRequest {
    /// Base64エンコード済みの平文
    pub plaintext: String,
    /// スキーマ参照のテーブル名
    pub table: String,
    /// スキーマ参照のカラム名
    pub column: String,
}

/// 外部暗号化サービスからの暗号化レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptResponse {
    pub envelope: Envelope,
}

/// 外部暗号化サービスへの復号リクエスト。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptRequest {
    pub envelope: Envelope,
}

/// 外部暗号化サービスからの復号レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptResponse {
    /// 暗号化前に渡したBase64文字列
    pub plaintext: String,
}
