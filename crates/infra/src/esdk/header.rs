//! メッセージヘッダの解析
//!
//! バージョン 2 のヘッダのみを扱う。ヘッダ認証タグの検証は
//! データキー取得後に [`super::ParsedMessage::decrypt`] で行う。

use std::collections::BTreeMap;

use super::{reader::ByteReader, suite::AlgorithmSuite};
use crate::InfraError;

/// 暗号化コンテキスト（キー順に保持する）
pub type EncryptionContext = BTreeMap<String, String>;

const MESSAGE_FORMAT_V2: u8 = 0x02;
const MESSAGE_FORMAT_V1: u8 = 0x01;
pub(crate) const MESSAGE_ID_LEN: usize = 32;

/// 暗号化されたデータキー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedDataKey {
    /// キープロバイダ ID（KMS の場合は `aws-kms`）
    pub provider_id:   String,
    /// キープロバイダ情報（KMS の場合は鍵 ARN）
    pub provider_info: String,
    /// 暗号化されたデータキー本体
    pub ciphertext:    Vec<u8>,
}

/// 本文の形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    NonFramed,
    Framed,
}

/// 解析済みのメッセージヘッダ
#[derive(Debug, Clone)]
pub struct MessageHeader {
    pub suite:               AlgorithmSuite,
    pub message_id:          [u8; MESSAGE_ID_LEN],
    pub encryption_context:  EncryptionContext,
    pub encrypted_data_keys: Vec<EncryptedDataKey>,
    pub content_type:        ContentType,
    pub frame_length:        u32,
    pub commitment:          [u8; AlgorithmSuite::COMMITMENT_LEN],
    pub auth_tag:            [u8; AlgorithmSuite::TAG_LEN],
    /// 認証タグより前のヘッダ全体（タグ検証の AAD）
    pub(crate) authenticated_bytes: Vec<u8>,
}

impl MessageHeader {
    pub(crate) fn parse(reader: &mut ByteReader<'_>) -> Result<Self, InfraError> {
        match reader.u8("version")? {
            MESSAGE_FORMAT_V2 => {}
            MESSAGE_FORMAT_V1 => {
                return Err(InfraError::unsupported("メッセージ形式バージョン 1"));
            }
            other => {
                return Err(InfraError::malformed(format!(
                    "不明なメッセージ形式バージョン 0x{other:02x}"
                )));
            }
        }

        let suite = AlgorithmSuite::from_id(reader.u16("algorithm suite")?)?;
        let message_id = reader.array::<MESSAGE_ID_LEN>("message id")?;
        let encryption_context = parse_encryption_context(reader.length_prefixed("aad")?)?;
        let encrypted_data_keys = parse_encrypted_data_keys(reader)?;

        let content_type = match reader.u8("content type")? {
            0x01 => ContentType::NonFramed,
            0x02 => ContentType::Framed,
            other => {
                return Err(InfraError::malformed(format!(
                    "不明なコンテンツタイプ 0x{other:02x}"
                )));
            }
        };
        let frame_length = reader.u32("frame length")?;
        match (content_type, frame_length) {
            (ContentType::Framed, 0) => {
                return Err(InfraError::malformed("フレーム長が 0 です"));
            }
            (ContentType::NonFramed, len) if len != 0 => {
                return Err(InfraError::malformed("非フレーム形式でフレーム長が指定されています"));
            }
            _ => {}
        }

        let commitment = reader.array::<{ AlgorithmSuite::COMMITMENT_LEN }>("commitment")?;
        let authenticated_bytes = reader.consumed().to_vec();
        let auth_tag = reader.array::<{ AlgorithmSuite::TAG_LEN }>("header auth tag")?;

        Ok(Self {
            suite,
            message_id,
            encryption_context,
            encrypted_data_keys,
            content_type,
            frame_length,
            commitment,
            auth_tag,
            authenticated_bytes,
        })
    }
}

fn parse_encryption_context(aad: &[u8]) -> Result<EncryptionContext, InfraError> {
    let mut context = EncryptionContext::new();
    if aad.is_empty() {
        return Ok(context);
    }

    let mut reader = ByteReader::new(aad);
    let count = reader.u16("aad count")?;
    for _ in 0..count {
        let key = utf8(reader.length_prefixed("aad key")?, "aad key")?;
        let value = utf8(reader.length_prefixed("aad value")?, "aad value")?;
        if context.insert(key, value).is_some() {
            return Err(InfraError::malformed("暗号化コンテキストのキーが重複しています"));
        }
    }
    if !reader.is_empty() {
        return Err(InfraError::malformed("暗号化コンテキストの長さが一致しません"));
    }
    Ok(context)
}

fn parse_encrypted_data_keys(
    reader: &mut ByteReader<'_>,
) -> Result<Vec<EncryptedDataKey>, InfraError> {
    let count = reader.u16("edk count")?;
    if count == 0 {
        return Err(InfraError::malformed("データキーが含まれていません"));
    }

    (0..count)
        .map(|_| {
            Ok(EncryptedDataKey {
                provider_id:   utf8(reader.length_prefixed("provider id")?, "provider id")?,
                provider_info: utf8(reader.length_prefixed("provider info")?, "provider info")?,
                ciphertext:    reader.length_prefixed("encrypted data key")?.to_vec(),
            })
        })
        .collect()
}

fn utf8(bytes: &[u8], field: &'static str) -> Result<String, InfraError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| InfraError::malformed(format!("{field} が UTF-8 ではありません")))
}
