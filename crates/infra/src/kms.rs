//! # KMS によるデータキー復号
//!
//! Encryption SDK メッセージに含まれる暗号化データキーを KMS の `Decrypt` API で
//! 復号する。テスト時は [`DataKeyDecryptor`] をモックに差し替え可能。
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use hyrise_infra::kms;
//!
//! async fn setup() {
//!     let client = kms::create_client().await;
//!     let decryptor = kms::KmsDataKeyDecryptor::new(client);
//! }
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_kms::{Client, error::DisplayErrorContext, primitives::Blob};
use hyrise_domain::KeyId;
use zeroize::Zeroizing;

use crate::{
    InfraError,
    esdk::{EncryptedDataKey, EncryptionContext},
};

/// 暗号化データキーを復号するインターフェース
#[async_trait]
pub trait DataKeyDecryptor: Send + Sync {
    /// 指定した鍵で暗号化データキーを復号する
    ///
    /// `context` はメッセージの暗号化コンテキストで、KMS 側の検証に使われる。
    async fn decrypt_data_key(
        &self,
        data_key: &EncryptedDataKey,
        key_id: &KeyId,
        context: &EncryptionContext,
    ) -> Result<Zeroizing<Vec<u8>>, InfraError>;
}

/// AWS KMS 実装
#[derive(Debug, Clone)]
pub struct KmsDataKeyDecryptor {
    client: Client,
}

impl KmsDataKeyDecryptor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataKeyDecryptor for KmsDataKeyDecryptor {
    #[tracing::instrument(skip_all, fields(key_id = %key_id), err)]
    async fn decrypt_data_key(
        &self,
        data_key: &EncryptedDataKey,
        key_id: &KeyId,
        context: &EncryptionContext,
    ) -> Result<Zeroizing<Vec<u8>>, InfraError> {
        let encryption_context = (!context.is_empty()).then(|| {
            context
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<HashMap<_, _>>()
        });

        let output = self
            .client
            .decrypt()
            .ciphertext_blob(Blob::new(data_key.ciphertext.clone()))
            .key_id(key_id.as_str())
            .set_encryption_context(encryption_context)
            .send()
            .await
            .map_err(|e| InfraError::kms(format!("Decrypt 呼び出しに失敗: {}", DisplayErrorContext(&e))))?;

        if output.key_id() != Some(key_id.as_str()) {
            return Err(InfraError::kms("KMS が別の鍵で復号しました"));
        }

        let plaintext = output
            .plaintext
            .ok_or_else(|| InfraError::kms("Decrypt 応答に平文が含まれていません"))?;
        Ok(Zeroizing::new(plaintext.into_inner()))
    }
}

/// KMS クライアントを作成する
///
/// リージョンと認証情報は Lambda 実行環境の設定（`AWS_REGION`、実行ロール）から読み取る。
pub async fn create_client() -> Client {
    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    Client::new(&config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kms実装はsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<KmsDataKeyDecryptor>();
    }
}
