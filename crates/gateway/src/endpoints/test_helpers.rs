//! # エンドポイントテスト用共通ヘルパー
//!
//! メモリ上のBlobStoreと、失敗を注入できる暗号クライアント。
//! どちらもClone可能なハンドルで、テスト側から呼び出し回数と保存内容を確認できる。

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use base64::Engine;
use cipherdrop_crypto::{b64, ClientCredentials, EncryptionError, Encryptor, LocalEncryptor};
use cipherdrop_types::{Envelope, SchemaRef};

use crate::config::GatewayState;
use crate::storage::{BlobStore, StorageError};

/// MemoryBlobStoreの振る舞い
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// 通常動作
    Normal,
    /// putが常に失敗する
    FailPut,
    /// putは成功するがオブジェクトが残らない（障害を模擬）
    LoseObjects,
    /// getがJSONでないバイト列を返す
    CorruptObjects,
}

struct MemoryInner {
    mode: StoreMode,
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    put_calls: AtomicUsize,
    get_calls: AtomicUsize,
}

/// テスト用のメモリ上オブジェクトストレージ。
#[derive(Clone)]
pub struct MemoryBlobStore {
    inner: Arc<MemoryInner>,
}

impl MemoryBlobStore {
    pub fn new(mode: StoreMode) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                mode,
                objects: Mutex::new(HashMap::new()),
                put_calls: AtomicUsize::new(0),
                get_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// 保存済みオブジェクトの本体とContent-Type
    pub fn object(&self, key: &str) -> Option<(Vec<u8>, String)> {
        self.inner.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn put_calls(&self) -> usize {
        self.inner.put_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.inner.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), StorageError> {
        self.inner.put_calls.fetch_add(1, Ordering::SeqCst);
        match self.inner.mode {
            StoreMode::FailPut => Err(StorageError::Backend(format!("{key}: HTTP 503"))),
            StoreMode::LoseObjects => Ok(()),
            StoreMode::Normal | StoreMode::CorruptObjects => {
                self.inner
                    .objects
                    .lock()
                    .unwrap()
                    .insert(key.to_string(), (body.to_vec(), content_type.to_string()));
                Ok(())
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.inner.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.mode == StoreMode::CorruptObjects {
            return Ok(b"<Error><Code>InternalError</Code></Error>".to_vec());
        }
        self.inner
            .objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(body, _)| body.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}

/// ScriptedEncryptorの振る舞い
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptorMode {
    /// LocalEncryptorに委譲する
    Normal,
    /// 暗号化が常に失敗する
    FailEncrypt,
    /// 復号が常に失敗する
    FailDecrypt,
    /// 復号は成功するが元と異なる平文を返す
    Tamper,
}

struct ScriptedInner {
    mode: EncryptorMode,
    local: LocalEncryptor,
    encrypt_calls: AtomicUsize,
    decrypt_calls: AtomicUsize,
}

/// 失敗を注入できる暗号クライアント。
#[derive(Clone)]
pub struct ScriptedEncryptor {
    inner: Arc<ScriptedInner>,
}

impl ScriptedEncryptor {
    pub fn new(mode: EncryptorMode) -> Self {
        Self {
            inner: Arc::new(ScriptedInner {
                mode,
                local: LocalEncryptor::new(test_credentials()),
                encrypt_calls: AtomicUsize::new(0),
                decrypt_calls: AtomicUsize::new(0),
            }),
        }
    }

    pub fn encrypt_calls(&self) -> usize {
        self.inner.encrypt_calls.load(Ordering::SeqCst)
    }

    pub fn decrypt_calls(&self) -> usize {
        self.inner.decrypt_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Encryptor for ScriptedEncryptor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn encrypt(
        &self,
        plaintext: &str,
        schema: &SchemaRef,
    ) -> Result<Envelope, EncryptionError> {
        self.inner.encrypt_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.mode == EncryptorMode::FailEncrypt {
            return Err(EncryptionError::Encrypt("scripted failure".to_string()));
        }
        self.inner.local.encrypt(plaintext, schema).await
    }

    async fn decrypt(&self, envelope: &Envelope) -> Result<String, EncryptionError> {
        self.inner.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        match self.inner.mode {
            EncryptorMode::FailDecrypt => {
                Err(EncryptionError::Decrypt("scripted failure".to_string()))
            }
            EncryptorMode::Tamper => {
                self.inner.local.decrypt(envelope).await?;
                Ok(b64().encode(b"tampered"))
            }
            EncryptorMode::Normal | EncryptorMode::FailEncrypt => {
                self.inner.local.decrypt(envelope).await
            }
        }
    }
}

/// テスト用の暗号クライアント認証情報
pub fn test_credentials() -> ClientCredentials {
    ClientCredentials {
        client_id: Some("test-client".to_string()),
        client_key: Some("test-client-key".to_string()),
        access_key: None,
        workspace_crn: Some("crn:test:workspace".to_string()),
    }
}

/// テスト用GatewayStateを構築するヘルパー。出力先は `<root>/uploads`。
pub fn test_state(
    root: &Path,
    blob_store: impl BlobStore + 'static,
    encryptor: impl Encryptor + 'static,
) -> Arc<GatewayState> {
    Arc::new(GatewayState {
        blob_store: Box::new(blob_store),
        encryptor: Box::new(encryptor),
        schema: SchemaRef::new("file_uploads", "file_data"),
        output_dir: root.join("uploads"),
    })
}
