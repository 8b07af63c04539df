//! # AWS Encryption SDK メッセージの復号
//!
//! Cognito が `request.code` に格納する暗号文は、AWS Encryption SDK の
//! メッセージ形式（バージョン 2）で暗号化されている。このモジュールは
//! メッセージの解析と、復号済みデータキーによる本文の復号・検証を行う。
//!
//! ## 受け付けるメッセージ
//!
//! - メッセージ形式バージョン 2 のみ
//! - 鍵コミットメント付きスイート（`0x0478`、`0x0578`）のみ
//! - `0x0578` の場合はフッタの ECDSA P-384 署名を検証する
//!
//! データキーの取得（KMS 呼び出し）は [`crate::kms`] が担当する。
//!
//! ## 復号手順
//!
//! 1. HKDF-SHA512（salt = message id）で暗号鍵とコミットメントキーを導出
//! 2. コミットメントキーをヘッダの値と定数時間比較
//! 3. ヘッダ認証タグを検証
//! 4. フレームを順に復号
//! 5. 署名付きスイートならフッタの署名を検証
//!
//! いずれかの検証に失敗した場合、復号途中の平文は返さずに破棄する。

mod body;
mod header;
mod reader;
mod suite;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

use aes_gcm::{
    Aes256Gcm,
    aead::{AeadInPlace, KeyInit, Nonce, Tag},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hkdf::Hkdf;
use p384::ecdsa::{Signature, VerifyingKey, signature::Verifier};
use sha2::Sha512;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use self::{
    body::{Footer, Frame},
    reader::ByteReader,
};
pub use self::{
    header::{ContentType, EncryptedDataKey, EncryptionContext, MessageHeader},
    suite::AlgorithmSuite,
};
use crate::InfraError;

/// 署名検証用の公開鍵を格納する暗号化コンテキストのキー
pub const PUBLIC_KEY_CONTEXT_KEY: &str = "aws-crypto-public-key";

const DERIVE_KEY_LABEL: &[u8] = b"DERIVEKEY";
const COMMIT_KEY_LABEL: &[u8] = b"COMMITKEY";

/// 構造解析済みのメッセージ
///
/// 解析の時点では暗号処理を行わない。末尾に余分なバイトがある場合は解析に失敗する。
#[derive(Debug)]
pub struct ParsedMessage<'a> {
    header: MessageHeader,
    frames: Vec<Frame<'a>>,
    footer: Option<Footer<'a>>,
}

impl<'a> ParsedMessage<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, InfraError> {
        let mut reader = ByteReader::new(bytes);
        let header = MessageHeader::parse(&mut reader)?;
        let frames = body::parse_frames(&mut reader, &header)?;
        let footer = body::parse_footer(&mut reader, header.suite)?;
        if !reader.is_empty() {
            return Err(InfraError::malformed("メッセージの末尾に余分なデータがあります"));
        }

        let has_public_key = header.encryption_context.contains_key(PUBLIC_KEY_CONTEXT_KEY);
        if header.suite.is_signed() != has_public_key {
            return Err(InfraError::malformed(
                "署名の有無と暗号化コンテキストの公開鍵が一致しません",
            ));
        }

        Ok(Self {
            header,
            frames,
            footer,
        })
    }

    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    /// 暗号化されたデータキーのうち、指定したプロバイダのもの
    pub fn data_keys_for<'s>(
        &'s self,
        provider_id: &'s str,
        provider_info: &'s str,
    ) -> impl Iterator<Item = &'s EncryptedDataKey> + 's {
        self.header
            .encrypted_data_keys
            .iter()
            .filter(move |edk| edk.provider_id == provider_id && edk.provider_info == provider_info)
    }

    /// 復号済みデータキーで本文を復号する
    pub fn decrypt(&self, data_key: &[u8]) -> Result<Zeroizing<Vec<u8>>, InfraError> {
        if data_key.len() != AlgorithmSuite::DATA_KEY_LEN {
            return Err(InfraError::key_unavailable(format!(
                "データキーの長さが不正です（{} バイト）",
                data_key.len()
            )));
        }

        let keys = DerivedKeys::derive(data_key, &self.header)?;
        if !bool::from(keys.commitment.as_slice().ct_eq(self.header.commitment.as_slice())) {
            return Err(InfraError::commitment_mismatch());
        }

        let cipher = Aes256Gcm::new_from_slice(keys.encryption.as_slice())
            .map_err(|_| InfraError::key_unavailable("暗号鍵の長さが不正です"))?;

        let zero_iv = [0u8; AlgorithmSuite::IV_LEN];
        cipher
            .decrypt_in_place_detached(
                Nonce::<Aes256Gcm>::from_slice(&zero_iv),
                &self.header.authenticated_bytes,
                &mut [],
                Tag::<Aes256Gcm>::from_slice(&self.header.auth_tag),
            )
            .map_err(|_| InfraError::authentication_failed("header"))?;

        let mut plaintext = Zeroizing::new(Vec::new());
        for frame in &self.frames {
            let mut buffer = Zeroizing::new(frame.content.to_vec());
            cipher
                .decrypt_in_place_detached(
                    Nonce::<Aes256Gcm>::from_slice(&frame.iv),
                    &frame.aad(&self.header.message_id),
                    buffer.as_mut_slice(),
                    Tag::<Aes256Gcm>::from_slice(&frame.tag),
                )
                .map_err(|_| InfraError::authentication_failed("body"))?;
            plaintext.extend_from_slice(&buffer);
        }

        if let Some(footer) = &self.footer {
            self.verify_signature(footer)?;
        }

        Ok(plaintext)
    }

    fn verify_signature(&self, footer: &Footer<'_>) -> Result<(), InfraError> {
        let encoded = self
            .header
            .encryption_context
            .get(PUBLIC_KEY_CONTEXT_KEY)
            .ok_or_else(|| InfraError::signature_invalid("公開鍵がありません"))?;
        let point = STANDARD
            .decode(encoded)
            .map_err(|e| InfraError::signature_invalid(format!("公開鍵の base64 が不正です: {e}")))?;
        let verifying_key = VerifyingKey::from_sec1_bytes(&point)
            .map_err(|_| InfraError::signature_invalid("公開鍵が不正です"))?;
        let signature = Signature::from_der(footer.signature)
            .map_err(|_| InfraError::signature_invalid("署名の DER 形式が不正です"))?;

        verifying_key
            .verify(footer.signed_bytes, &signature)
            .map_err(|_| InfraError::signature_invalid("署名が一致しません"))
    }
}

/// データキーから導出した鍵
struct DerivedKeys {
    encryption: Zeroizing<[u8; 32]>,
    commitment: Zeroizing<[u8; AlgorithmSuite::COMMITMENT_LEN]>,
}

impl DerivedKeys {
    fn derive(data_key: &[u8], header: &MessageHeader) -> Result<Self, InfraError> {
        let hkdf = Hkdf::<Sha512>::new(Some(header.message_id.as_slice()), data_key);

        let mut derive_info = header.suite.id().to_be_bytes().to_vec();
        derive_info.extend_from_slice(DERIVE_KEY_LABEL);

        let mut encryption = Zeroizing::new([0u8; 32]);
        hkdf.expand(&derive_info, encryption.as_mut_slice())
            .map_err(|_| InfraError::key_unavailable("暗号鍵の導出に失敗しました"))?;

        let mut commitment = Zeroizing::new([0u8; AlgorithmSuite::COMMITMENT_LEN]);
        hkdf.expand(COMMIT_KEY_LABEL, commitment.as_mut_slice())
            .map_err(|_| InfraError::key_unavailable("コミットメントキーの導出に失敗しました"))?;

        Ok(Self {
            encryption,
            commitment,
        })
    }
}
