//! # Cipherdrop Gateway
//!
//! アップロードされたファイルを暗号化してオブジェクトストレージに保存し、
//! 直後に取得・復号してローカルディレクトリに書き戻すHTTPサービス。
//!
//! ## API エンドポイント
//! - `POST /upload` — multipart/form-data の `file` フィールドを受け付ける
//!
//! ## モジュール構成
//! - `config`: 環境変数からの設定読み込みと共有状態
//! - `error`: エラー型とHTTPレスポンスへの変換
//! - `storage`: オブジェクトストレージの抽象化（S3互換実装）
//! - `pipeline`: 暗号化→保存→取得→復号→書き込みの処理本体
//! - `endpoints`: HTTPハンドラ

mod config;
mod endpoints;
mod error;
mod pipeline;
mod storage;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;
use cipherdrop_crypto::{Encryptor, LocalEncryptor, RemoteEncryptor};

use config::{GatewayConfig, GatewayState};
use storage::BlobStore;

/// 待ち受けアドレス
const LISTEN_ADDR: &str = "0.0.0.0:3000";

/// ルーターを構築する。`max_upload_size` はリクエストボディ全体の上限。
pub(crate) fn build_router(state: Arc<GatewayState>, max_upload_size: usize) -> Router {
    Router::new()
        .route("/upload", post(endpoints::handle_upload))
        .layer(DefaultBodyLimit::max(max_upload_size))
        .with_state(state)
}

/// 外部暗号化サービスのURLがあればそれを、無ければローカル暗号クライアントを使う。
fn build_encryptor(config: &GatewayConfig) -> Box<dyn Encryptor> {
    match &config.encryption_endpoint {
        Some(endpoint) => {
            let encryptor = RemoteEncryptor::new(endpoint.as_str(), config.credentials.clone());
            tracing::info!(endpoint = %encryptor.endpoint(), "外部暗号化サービスを使用");
            Box::new(encryptor)
        }
        None => {
            tracing::warn!(
                "CS_ENCRYPTION_ENDPOINTが未設定です。ローカル暗号クライアントを使用します"
            );
            Box::new(LocalEncryptor::new(config.credentials.clone()))
        }
    }
}

#[cfg(feature = "vendor-aws")]
fn build_blob_store(config: &GatewayConfig) -> anyhow::Result<Box<dyn BlobStore>> {
    Ok(Box::new(storage::S3BlobStore::from_config(&config.storage)?))
}

#[cfg(not(feature = "vendor-aws"))]
fn build_blob_store(_config: &GatewayConfig) -> anyhow::Result<Box<dyn BlobStore>> {
    anyhow::bail!("ストレージバックエンドが有効化されていません（vendor-aws featureが必要）")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = GatewayConfig::from_env()?;
    tracing::info!(
        schema = %config.schema,
        output_dir = %config.output_dir.display(),
        max_upload_size = config.max_upload_size,
        "設定を読み込みました"
    );

    let blob_store = build_blob_store(&config)?;
    let encryptor = build_encryptor(&config);

    let state = Arc::new(GatewayState {
        blob_store,
        encryptor,
        schema: config.schema.clone(),
        output_dir: config.output_dir.clone(),
    });

    let app = build_router(state, config.max_upload_size);

    tracing::info!("Gatewayを {} で起動します", LISTEN_ADDR);
    let listener = tokio::net::TcpListener::bind(LISTEN_ADDR).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
