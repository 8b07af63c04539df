//! # テスト用モック
//!
//! ユースケーステストで使用するインメモリモック。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! hyrise-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::sync::{
    Arc,
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use hyrise_domain::{
    KeyId,
    PlaintextCode,
    notification::{DeliveryReceipt, EmailMessage, NotificationError},
};
use zeroize::Zeroizing;

use crate::{
    InfraError,
    decryptor::CodeDecryptor,
    esdk::{EncryptedDataKey, EncryptionContext},
    kms::DataKeyDecryptor,
    notification::NotificationSender,
};

// ===== MockNotificationSender =====

/// 送信されたメールを記録するモック
///
/// `failing` で作成すると、記録した上で常に `SendFailed` を返す。
#[derive(Clone, Default)]
pub struct MockNotificationSender {
    sent:    Arc<Mutex<Vec<EmailMessage>>>,
    failure: Option<String>,
}

impl MockNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            sent:    Arc::new(Mutex::new(Vec::new())),
            failure: Some(reason.into()),
        }
    }

    pub fn sent_emails(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
    async fn send_email(&self, email: EmailMessage) -> Result<DeliveryReceipt, NotificationError> {
        let count = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(email);
            sent.len()
        };
        match &self.failure {
            Some(reason) => Err(NotificationError::SendFailed(reason.clone())),
            None => Ok(DeliveryReceipt {
                message_id:     format!("<mock-{count}@hyrise.app>"),
                relay_response: Some("250 2.0.0 OK".to_string()),
            }),
        }
    }
}

// ===== MockCodeDecryptor =====

/// 固定のコードを返す（または常に失敗する）復号モック
#[derive(Clone)]
pub struct MockCodeDecryptor {
    code:  Option<String>,
    calls: Arc<Mutex<Vec<(Vec<u8>, String)>>>,
}

impl MockCodeDecryptor {
    pub fn returning(code: impl Into<String>) -> Self {
        Self {
            code:  Some(code.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            code:  None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 呼び出し時の (暗号文, 鍵 ID)
    pub fn calls(&self) -> Vec<(Vec<u8>, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeDecryptor for MockCodeDecryptor {
    async fn decrypt(&self, ciphertext: &[u8], key_id: &KeyId) -> Result<PlaintextCode, InfraError> {
        self.calls
            .lock()
            .unwrap()
            .push((ciphertext.to_vec(), key_id.as_str().to_string()));
        match &self.code {
            Some(code) => Ok(PlaintextCode::new(code.clone())),
            None => Err(InfraError::kms("AccessDeniedException")),
        }
    }
}

// ===== StaticDataKeyDecryptor =====

/// KMS の代わりに固定のデータキーを返すモック
///
/// 鍵 ID が一致しない場合は `KeyUnavailable`、`rejecting` で指定した
/// 暗号化データキーに対しては `Kms` エラーを返す。
#[derive(Clone)]
pub struct StaticDataKeyDecryptor {
    key_id:     String,
    data_key:   [u8; 32],
    rejected:   Vec<Vec<u8>>,
    call_count: Arc<AtomicUsize>,
}

impl StaticDataKeyDecryptor {
    pub fn new(key_id: impl Into<String>, data_key: [u8; 32]) -> Self {
        Self {
            key_id: key_id.into(),
            data_key,
            rejected: Vec::new(),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn rejecting(mut self, ciphertext: &[u8]) -> Self {
        self.rejected.push(ciphertext.to_vec());
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataKeyDecryptor for StaticDataKeyDecryptor {
    async fn decrypt_data_key(
        &self,
        data_key: &EncryptedDataKey,
        key_id: &KeyId,
        _context: &EncryptionContext,
    ) -> Result<Zeroizing<Vec<u8>>, InfraError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if key_id.as_str() != self.key_id {
            return Err(InfraError::key_unavailable(format!("unknown key {key_id}")));
        }
        if self.rejected.contains(&data_key.ciphertext) {
            return Err(InfraError::kms("InvalidCiphertextException"));
        }
        Ok(Zeroizing::new(self.data_key.to_vec()))
    }
}
