//! # 外部暗号化サービスクライアント
//!
//! 鍵管理を外部サービスに委譲するJSON over HTTPクライアント。
//!
//! ## API
//! - `POST {endpoint}/v1/encrypt` — `EncryptRequest` → `EncryptResponse`
//! - `POST {endpoint}/v1/decrypt` — `DecryptRequest` → `DecryptResponse`
//!
//! ## 認証ヘッダ
//! - `Authorization: Bearer <CS_CLIENT_ACCESS_KEY>`
//! - `X-Client-Id: <CS_CLIENT_ID>`
//! - `X-Workspace-Crn: <CS_WORKSPACE_CRN>`（設定時のみ）

use cipherdrop_types::{
    DecryptRequest, DecryptResponse, EncryptRequest, EncryptResponse, Envelope, SchemaRef,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{ClientCredentials, EncryptionError, Encryptor};

/// 外部暗号化サービスを呼び出す暗号クライアント。
pub struct RemoteEncryptor {
    /// サービスのベースURL（末尾の `/` は除去済み）
    endpoint: String,
    http_client: reqwest::Client,
    credentials: ClientCredentials,
}

impl RemoteEncryptor {
    pub fn new(endpoint: impl Into<String>, credentials: ClientCredentials) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self {
            endpoint,
            http_client: reqwest::Client::new(),
            credentials,
        }
    }

    /// HTTPクライアントを差し替える。
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = http_client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 認証ヘッダを付与してサービスにPOSTする。
    /// 非2xxレスポンスは `on_rejected` でエラーに変換する。
    async fn post<Req, Resp>(
        &self,
        path: &str,
        body: &Req,
        on_rejected: fn(String) -> EncryptionError,
    ) -> Result<Resp, EncryptionError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let client_id = self.credentials.client_id.as_deref().ok_or_else(|| {
            EncryptionError::MissingCredentials("CS_CLIENT_IDが設定されていません".to_string())
        })?;
        let access_key = self.credentials.access_key.as_deref().ok_or_else(|| {
            EncryptionError::MissingCredentials(
                "CS_CLIENT_ACCESS_KEYが設定されていません".to_string(),
            )
        })?;

        let url = format!("{}{}", self.endpoint, path);
        let mut request = self
            .http_client
            .post(&url)
            .bearer_auth(access_key)
            .header("X-Client-Id", client_id)
            .json(body);
        if let Some(workspace) = self.credentials.workspace_crn.as_deref() {
            request = request.header("X-Workspace-Crn", workspace);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EncryptionError::Transport(format!("HTTP送信失敗: {e}")))?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .map_err(|e| EncryptionError::Transport(format!("レスポンス読み取り失敗: {e}")))?;

        if !status.is_success() {
            return Err(on_rejected(format!(
                "暗号化サービスがエラーを返しました: HTTP {} - {}",
                status, response_body
            )));
        }

        serde_json::from_str(&response_body)
            .map_err(|e| EncryptionError::Transport(format!("レスポンスのパースに失敗: {e}")))
    }
}

#[async_trait::async_trait]
impl Encryptor for RemoteEncryptor {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn encrypt(
        &self,
        plaintext: &str,
        schema: &SchemaRef,
    ) -> Result<Envelope, EncryptionError> {
        let request = EncryptRequest {
            plaintext: plaintext.to_string(),
            table: schema.table.clone(),
            column: schema.column.clone(),
        };
        let response: EncryptResponse = self
            .post("/v1/encrypt", &request, EncryptionError::Encrypt)
            .await?;
        Ok(response.envelope)
    }

    async fn decrypt(&self, envelope: &Envelope) -> Result<String, EncryptionError> {
        let request = DecryptRequest {
            envelope: envelope.clone(),
        };
        let response: DecryptResponse = self
            .post("/v1/decrypt", &request, EncryptionError::Decrypt)
            .await?;
        Ok(response.plaintext)
    }
}
