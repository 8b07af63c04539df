//! テスト用メッセージライター
//!
//! KMS を使わずに、既知のデータキーで暗号化したメッセージを生成する。
//! `test-utils` feature を有効にすることで、他クレートのテストからも利用可能。

use aes_gcm::{
    Aes256Gcm,
    aead::{AeadInPlace, KeyInit, Nonce},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hkdf::Hkdf;
use p384::{
    ecdsa::{Signature, SigningKey, signature::Signer},
    elliptic_curve::sec1::ToEncodedPoint,
};
use sha2::Sha512;

use super::{
    AlgorithmSuite,
    COMMIT_KEY_LABEL,
    DERIVE_KEY_LABEL,
    EncryptionContext,
    PUBLIC_KEY_CONTEXT_KEY,
    body::FrameKind,
};

/// KMS が返す想定の暗号化データキー（内容は任意）
pub const WRAPPED_DATA_KEY: &[u8] = b"test-wrapped-data-key";

// ===== 既知の暗号文 =====
//
// Python の `cryptography`（OpenSSL）で書いた別実装のエンコーダが、公開されている
// メッセージ形式の定義に従って生成した固定の暗号文。`MessageBuilder` を経由しないため、
// 解析側の誤りが書き込み側の同じ誤りで打ち消されない。

/// 既知の暗号文を暗号化した鍵 ARN（EDK のプロバイダ情報）
pub const KNOWN_ANSWER_KEY_ARN: &str =
    "arn:aws:kms:us-east-1:111122223333:key/1234abcd-12ab-34cd-56ef-1234567890ab";

/// 既知の暗号文のデータキー（0x00..=0x1f）
pub const KNOWN_ANSWER_DATA_KEY: [u8; 32] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
    0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d, 0x1e, 0x1f,
];

/// 既知の暗号文の EDK 本体
pub const KNOWN_ANSWER_WRAPPED_DATA_KEY: &[u8] = b"kms-wrapped-data-key";

/// スイート `0x0578`、フレーム長 4（4 + 4 + 最終 1 バイト）、
/// 暗号化コンテキスト `userpool-id = us-east-1_Example` と公開鍵
pub const KNOWN_ANSWER_SIGNED_FRAMED: &str = concat!(
    "AgV4oKGio6SlpqeoqaqrrK2ur7CxsrO0tba3uLm6u7y9vr8AfwACABVhd3MtY3J5cHRvLXB1YmxpYy1rZXkAREF2",
    "djVZSldSWHJXSE9RK0ZEc2xiTmZZWXJoSWNjcWNJQ0syUG4wd21HMkFyWTFRWFErT1Y5OGQ0NVN1eWpCamNndz09",
    "AAt1c2VycG9vbC1pZAARdXMtZWFzdC0xX0V4YW1wbGUAAQAHYXdzLWttcwBLYXJuOmF3czprbXM6dXMtZWFzdC0x",
    "OjExMTEyMjIyMzMzMzprZXkvMTIzNGFiY2QtMTJhYi0zNGNkLTU2ZWYtMTIzNDU2Nzg5MGFiABRrbXMtd3JhcHBl",
    "ZC1kYXRhLWtleQIAAAAEjwqJ6YQJtFxCFXNOWwsy9Tvsl9Ga+et4B4MvJZ2tfocTsKjYSTifxrNROocHFegdAAAA",
    "AQAAAAAAAAAAAAAAAVSgWvBc4EYimZKB0k66RYEePFw6AAAAAgAAAAAAAAAAAAAAArXb7BpHPpukWA2XvQN69S0z",
    "xl4P/////wAAAAMAAAAAAAAAAAAAAAMAAAABD8VaGfLZv2He629e5UlRq1QAZzBlAjAQ+MbKD6m1hEF9Nm5roAye",
    "98mm6K/wlOfM5gQQS5gYadb8bF3O6myTyrjNU+JyOV0CMQCx3duHGO0MrnIWC70Sd+3QZ0Ze1qIbjBhPNaeIKMOk",
    "RWNZ4KzHgikLySm9SptiX5A=",
);

/// [`KNOWN_ANSWER_SIGNED_FRAMED`] の平文
pub const KNOWN_ANSWER_SIGNED_FRAMED_PLAINTEXT: &str = "Xy7$pQ2!k";

/// スイート `0x0478`、フレーム長 4096（最終フレームのみ）、暗号化コンテキストなし
pub const KNOWN_ANSWER_UNSIGNED: &str = concat!(
    "AgR4oKGio6SlpqeoqaqrrK2ur7CxsrO0tba3uLm6u7y9vr8AAAABAAdhd3Mta21zAEthcm46YXdzOmttczp1cy1l",
    "YXN0LTE6MTExMTIyMjIzMzMzOmtleS8xMjM0YWJjZC0xMmFiLTM0Y2QtNTZlZi0xMjM0NTY3ODkwYWIAFGttcy13",
    "cmFwcGVkLWRhdGEta2V5AgAAEACPConphAm0XEIVc05bCzL1O+yX0Zr563gHgy8lna1+hxcQZOTjB86szywxFKUx",
    "qcD/////AAAAAQAAAAAAAAAAAAAAAQAAAAbirFmt2Df+h7PSMjT+6AA22fSwsZ9U",
);

/// [`KNOWN_ANSWER_UNSIGNED`] の平文
pub const KNOWN_ANSWER_UNSIGNED_PLAINTEXT: &str = "482913";

const SIGNING_SCALAR: [u8; 48] = [7; 48];
const OTHER_SIGNING_SCALAR: [u8; 48] = [9; 48];
const DEFAULT_FRAME_LENGTH: u32 = 4096;

/// 暗号化メッセージのビルダー
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    key_arn:         String,
    data_key:        [u8; 32],
    message_id:      [u8; 32],
    context:         EncryptionContext,
    extra_keys:      Vec<(String, String, Vec<u8>)>,
    frame_length:    Option<u32>,
    signed:          bool,
    sign_with_other: bool,
    sequence_offset: u32,
}

impl MessageBuilder {
    pub fn new(key_arn: impl Into<String>, data_key: [u8; 32]) -> Self {
        Self {
            key_arn: key_arn.into(),
            data_key,
            message_id: [0x5a; 32],
            context: EncryptionContext::new(),
            extra_keys: Vec::new(),
            frame_length: Some(DEFAULT_FRAME_LENGTH),
            signed: true,
            sign_with_other: false,
            sequence_offset: 0,
        }
    }

    pub fn message_id(mut self, message_id: [u8; 32]) -> Self {
        self.message_id = message_id;
        self
    }

    pub fn context(mut self, key: &str, value: &str) -> Self {
        self.context.insert(key.to_string(), value.to_string());
        self
    }

    pub fn extra_data_key(mut self, provider_id: &str, provider_info: &str, ciphertext: &[u8]) -> Self {
        self.extra_keys.push((
            provider_id.to_string(),
            provider_info.to_string(),
            ciphertext.to_vec(),
        ));
        self
    }

    pub fn frame_length(mut self, frame_length: u32) -> Self {
        self.frame_length = Some(frame_length);
        self
    }

    pub fn non_framed(mut self) -> Self {
        self.frame_length = None;
        self
    }

    /// 署名なしスイート（`0x0478`）で暗号化する
    pub fn unsigned(mut self) -> Self {
        self.signed = false;
        self
    }

    /// 公開鍵と異なる鍵で署名する
    pub fn signed_by_other_key(mut self) -> Self {
        self.sign_with_other = true;
        self
    }

    /// フレームのシーケンス番号をずらす
    pub fn sequence_offset(mut self, offset: u32) -> Self {
        self.sequence_offset = offset;
        self
    }

    fn suite(&self) -> AlgorithmSuite {
        if self.signed {
            AlgorithmSuite::Aes256GcmHkdfSha512CommitKeyEcdsaP384
        } else {
            AlgorithmSuite::Aes256GcmHkdfSha512CommitKey
        }
    }

    pub fn build(&self, plaintext: &[u8]) -> Vec<u8> {
        let suite = self.suite();
        let signing_key = SigningKey::from_slice(&SIGNING_SCALAR).expect("valid test scalar");

        let mut context = self.context.clone();
        if self.signed {
            let point = signing_key.verifying_key().as_affine().to_encoded_point(true);
            context.insert(
                PUBLIC_KEY_CONTEXT_KEY.to_string(),
                STANDARD.encode(point.as_bytes()),
            );
        }

        let hkdf = Hkdf::<Sha512>::new(Some(self.message_id.as_slice()), &self.data_key);
        let mut derive_info = suite.id().to_be_bytes().to_vec();
        derive_info.extend_from_slice(DERIVE_KEY_LABEL);
        let mut encryption_key = [0u8; 32];
        hkdf.expand(&derive_info, &mut encryption_key).expect("hkdf expand");
        let mut commitment = [0u8; 32];
        hkdf.expand(COMMIT_KEY_LABEL, &mut commitment).expect("hkdf expand");
        let cipher = Aes256Gcm::new_from_slice(&encryption_key).expect("32 byte key");

        // ヘッダ
        let mut out = vec![0x02];
        out.extend_from_slice(&suite.id().to_be_bytes());
        out.extend_from_slice(&self.message_id);
        put_prefixed(&mut out, &serialize_context(&context));

        let mut keys = vec![(
            "aws-kms".to_string(),
            self.key_arn.clone(),
            WRAPPED_DATA_KEY.to_vec(),
        )];
        keys.extend(self.extra_keys.iter().cloned());
        put_u16(&mut out, keys.len());
        for (provider_id, provider_info, ciphertext) in &keys {
            put_prefixed(&mut out, provider_id.as_bytes());
            put_prefixed(&mut out, provider_info.as_bytes());
            put_prefixed(&mut out, ciphertext);
        }

        match self.frame_length {
            Some(len) => {
                out.push(0x02);
                out.extend_from_slice(&len.to_be_bytes());
            }
            None => {
                out.push(0x01);
                out.extend_from_slice(&0u32.to_be_bytes());
            }
        }
        out.extend_from_slice(&commitment);

        let header_tag = cipher
            .encrypt_in_place_detached(Nonce::<Aes256Gcm>::from_slice(&[0u8; 12]), &out, &mut [])
            .expect("header tag");
        out.extend_from_slice(&header_tag);

        // 本文
        let seal = |kind: FrameKind, sequence: u32, content: &[u8]| {
            let iv = frame_iv(sequence);
            let mut aad = self.message_id.to_vec();
            aad.extend_from_slice(kind.content_string());
            aad.extend_from_slice(&sequence.to_be_bytes());
            aad.extend_from_slice(&(content.len() as u64).to_be_bytes());
            let mut buffer = content.to_vec();
            let tag = cipher
                .encrypt_in_place_detached(Nonce::<Aes256Gcm>::from_slice(&iv), &aad, &mut buffer)
                .expect("frame encryption");
            (iv, buffer, tag)
        };

        match self.frame_length {
            Some(frame_length) => {
                let frame_length = frame_length as usize;
                let mut sequence = 1 + self.sequence_offset;
                let mut remaining = plaintext;
                while remaining.len() >= frame_length {
                    let (chunk, rest) = remaining.split_at(frame_length);
                    let (iv, ciphertext, tag) = seal(FrameKind::Regular, sequence, chunk);
                    out.extend_from_slice(&sequence.to_be_bytes());
                    out.extend_from_slice(&iv);
                    out.extend_from_slice(&ciphertext);
                    out.extend_from_slice(&tag);
                    sequence += 1;
                    remaining = rest;
                }
                let (iv, ciphertext, tag) = seal(FrameKind::Final, sequence, remaining);
                out.extend_from_slice(&0xFFFF_FFFFu32.to_be_bytes());
                out.extend_from_slice(&sequence.to_be_bytes());
                out.extend_from_slice(&iv);
                out.extend_from_slice(&(remaining.len() as u32).to_be_bytes());
                out.extend_from_slice(&ciphertext);
                out.extend_from_slice(&tag);
            }
            None => {
                let (iv, ciphertext, tag) = seal(FrameKind::SingleBlock, 1, plaintext);
                out.extend_from_slice(&iv);
                out.extend_from_slice(&(plaintext.len() as u64).to_be_bytes());
                out.extend_from_slice(&ciphertext);
                out.extend_from_slice(&tag);
            }
        }

        // フッタ
        if self.signed {
            let signer = if self.sign_with_other {
                SigningKey::from_slice(&OTHER_SIGNING_SCALAR).expect("valid test scalar")
            } else {
                signing_key
            };
            let signature: Signature = signer.sign(&out);
            let der = signature.to_der();
            put_prefixed(&mut out, der.as_bytes());
        }

        out
    }

    /// Cognito イベントの `request.code` と同じ base64 文字列で返す
    pub fn build_base64(&self, plaintext: &[u8]) -> String {
        STANDARD.encode(self.build(plaintext))
    }
}

fn frame_iv(sequence: u32) -> [u8; 12] {
    let mut iv = [0u8; 12];
    iv[8..].copy_from_slice(&sequence.to_be_bytes());
    iv
}

fn serialize_context(context: &EncryptionContext) -> Vec<u8> {
    let mut out = Vec::new();
    if context.is_empty() {
        return out;
    }
    put_u16(&mut out, context.len());
    for (key, value) in context {
        put_prefixed(&mut out, key.as_bytes());
        put_prefixed(&mut out, value.as_bytes());
    }
    out
}

fn put_u16(out: &mut Vec<u8>, value: usize) {
    let value = u16::try_from(value).expect("field fits in u16");
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    put_u16(out, bytes.len());
    out.extend_from_slice(bytes);
}
