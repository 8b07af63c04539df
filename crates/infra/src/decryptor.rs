//! # コード復号
//!
//! Cognito が暗号化した確認コードを平文に戻す。
//! メッセージの解析・検証は [`crate::esdk`]、データキーの復号は [`crate::kms`] に委譲する。

use std::sync::Arc;

use async_trait::async_trait;
use hyrise_domain::{KeyId, PlaintextCode};
use zeroize::Zeroizing;

use crate::{InfraError, esdk::ParsedMessage, kms::DataKeyDecryptor};

/// KMS のキープロバイダ ID
const KMS_PROVIDER_ID: &str = "aws-kms";

/// 確認コード復号のインターフェース
#[async_trait]
pub trait CodeDecryptor: Send + Sync {
    /// 暗号文（base64 デコード済み）を復号してコードを返す
    ///
    /// 失敗はすべて呼び出しにとって致命的。
    async fn decrypt(&self, ciphertext: &[u8], key_id: &KeyId) -> Result<PlaintextCode, InfraError>;
}

/// Encryption SDK 形式の暗号文を復号する実装
pub struct EncryptionSdkCodeDecryptor {
    data_keys: Arc<dyn DataKeyDecryptor>,
}

impl EncryptionSdkCodeDecryptor {
    pub fn new(data_keys: Arc<dyn DataKeyDecryptor>) -> Self {
        Self { data_keys }
    }

    /// 設定された鍵で復号できる最初のデータキーを返す
    async fn unwrap_data_key(
        &self,
        message: &ParsedMessage<'_>,
        key_id: &KeyId,
    ) -> Result<Zeroizing<Vec<u8>>, InfraError> {
        let mut last_error = None;
        for data_key in message.data_keys_for(KMS_PROVIDER_ID, key_id.as_str()) {
            match self
                .data_keys
                .decrypt_data_key(data_key, key_id, &message.header().encryption_context)
                .await
            {
                Ok(plaintext) => return Ok(plaintext),
                Err(e) => {
                    tracing::warn!(error = %e, "データキーの復号に失敗したため次の候補を試します");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            InfraError::key_unavailable(format!("鍵 {key_id} で暗号化されたデータキーがありません"))
        }))
    }
}

#[async_trait]
impl CodeDecryptor for EncryptionSdkCodeDecryptor {
    #[tracing::instrument(skip_all, fields(key_id = %key_id, ciphertext_len = ciphertext.len()))]
    async fn decrypt(&self, ciphertext: &[u8], key_id: &KeyId) -> Result<PlaintextCode, InfraError> {
        let message = ParsedMessage::parse(ciphertext)?;
        let data_key = self.unwrap_data_key(&message, key_id).await?;
        let plaintext = message.decrypt(&data_key)?;

        Ok(PlaintextCode::from_utf8(plaintext.to_vec())?)
    }
}

#[cfg(test)]
mod tests {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        error::InfraErrorKind,
        esdk::testing::{self, MessageBuilder, WRAPPED_DATA_KEY},
        mock::StaticDataKeyDecryptor,
    };

    const KEY_ARN: &str = "arn:aws:kms:us-east-1:111122223333:key/test";
    const DATA_KEY: [u8; 32] = [0x11; 32];

    fn sut(data_keys: StaticDataKeyDecryptor) -> EncryptionSdkCodeDecryptor {
        EncryptionSdkCodeDecryptor::new(Arc::new(data_keys))
    }

    #[tokio::test]
    async fn test_設定された鍵のデータキーで復号できる() {
        let data_keys = StaticDataKeyDecryptor::new(KEY_ARN, DATA_KEY);
        let ciphertext = MessageBuilder::new(KEY_ARN, DATA_KEY).build(b"482913");

        let code = sut(data_keys.clone())
            .decrypt(&ciphertext, &KeyId::new(KEY_ARN))
            .await
            .unwrap();

        assert_eq!(code.expose(), "482913");
        assert_eq!(data_keys.call_count(), 1);
    }

    #[tokio::test]
    async fn test_最初のデータキーが失敗しても次の候補で復号できる() {
        let data_keys = StaticDataKeyDecryptor::new(KEY_ARN, DATA_KEY).rejecting(WRAPPED_DATA_KEY);
        let ciphertext = MessageBuilder::new(KEY_ARN, DATA_KEY)
            .extra_data_key("aws-kms", KEY_ARN, b"second-copy")
            .build(b"482913");

        let code = sut(data_keys.clone())
            .decrypt(&ciphertext, &KeyId::new(KEY_ARN))
            .await
            .unwrap();

        assert_eq!(code.expose(), "482913");
        assert_eq!(data_keys.call_count(), 2);
    }

    #[tokio::test]
    async fn test_別の鍵で暗号化されたメッセージはkmsを呼ばずに失敗する() {
        let data_keys = StaticDataKeyDecryptor::new(KEY_ARN, DATA_KEY);
        let ciphertext = MessageBuilder::new("arn:aws:kms:us-east-1:111122223333:key/other", DATA_KEY)
            .build(b"482913");

        let err = sut(data_keys.clone())
            .decrypt(&ciphertext, &KeyId::new(KEY_ARN))
            .await
            .unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::KeyUnavailable(_)));
        assert_eq!(data_keys.call_count(), 0);
    }

    #[tokio::test]
    async fn test_kmsの失敗はそのまま返す() {
        let data_keys = StaticDataKeyDecryptor::new(KEY_ARN, DATA_KEY).rejecting(WRAPPED_DATA_KEY);
        let ciphertext = MessageBuilder::new(KEY_ARN, DATA_KEY).build(b"482913");

        let err = sut(data_keys)
            .decrypt(&ciphertext, &KeyId::new(KEY_ARN))
            .await
            .unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::Kms(_)));
    }

    #[tokio::test]
    async fn test_別実装で生成した既知の暗号文を復号する() {
        let data_keys = StaticDataKeyDecryptor::new(
            testing::KNOWN_ANSWER_KEY_ARN,
            testing::KNOWN_ANSWER_DATA_KEY,
        );
        let ciphertext = STANDARD.decode(testing::KNOWN_ANSWER_SIGNED_FRAMED).unwrap();

        let code = sut(data_keys.clone())
            .decrypt(&ciphertext, &KeyId::new(testing::KNOWN_ANSWER_KEY_ARN))
            .await
            .unwrap();

        assert_eq!(code.expose(), testing::KNOWN_ANSWER_SIGNED_FRAMED_PLAINTEXT);
        assert_eq!(data_keys.call_count(), 1);
    }

    #[tokio::test]
    async fn test_記号を含む一時パスワードをそのまま復号する() {
        let data_keys = StaticDataKeyDecryptor::new(KEY_ARN, DATA_KEY);
        let ciphertext = MessageBuilder::new(KEY_ARN, DATA_KEY).build(b"Xy7$pQ2!<&>");

        let code = sut(data_keys)
            .decrypt(&ciphertext, &KeyId::new(KEY_ARN))
            .await
            .unwrap();

        assert_eq!(code.expose(), "Xy7$pQ2!<&>");
    }

    #[tokio::test]
    async fn test_utf8でない平文は拒否する() {
        let data_keys = StaticDataKeyDecryptor::new(KEY_ARN, DATA_KEY);
        let ciphertext = MessageBuilder::new(KEY_ARN, DATA_KEY).build(&[0xff, 0xfe, 0x00]);

        let err = sut(data_keys)
            .decrypt(&ciphertext, &KeyId::new(KEY_ARN))
            .await
            .unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::InvalidPlaintext(_)));
    }

    #[tokio::test]
    async fn test_暗号文でないバイト列は形式不正になる() {
        let data_keys = StaticDataKeyDecryptor::new(KEY_ARN, DATA_KEY);

        let err = sut(data_keys)
            .decrypt(b"not an encrypted message", &KeyId::new(KEY_ARN))
            .await
            .unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::MalformedCiphertext(_)));
    }
}
