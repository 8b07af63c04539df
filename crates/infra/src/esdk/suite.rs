//! アルゴリズムスイート
//!
//! 受け付けるのは鍵コミットメント付きの 2 スイートのみ。

use crate::InfraError;

/// 鍵コミットメントを持たない旧スイート（復号を拒否する）
const NON_COMMITTING_SUITES: [u16; 9] = [
    0x0014, 0x0046, 0x0078, 0x0114, 0x0146, 0x0178, 0x0214, 0x0346, 0x0378,
];

/// 受け付けるアルゴリズムスイート
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmSuite {
    /// AES-256-GCM / HKDF-SHA512 / キーコミットメント
    Aes256GcmHkdfSha512CommitKey,
    /// AES-256-GCM / HKDF-SHA512 / キーコミットメント / ECDSA P-384 署名
    Aes256GcmHkdfSha512CommitKeyEcdsaP384,
}

impl AlgorithmSuite {
    pub const DATA_KEY_LEN: usize = 32;
    pub const IV_LEN: usize = 12;
    pub const TAG_LEN: usize = 16;
    pub const COMMITMENT_LEN: usize = 32;

    pub fn from_id(id: u16) -> Result<Self, InfraError> {
        match id {
            0x0478 => Ok(Self::Aes256GcmHkdfSha512CommitKey),
            0x0578 => Ok(Self::Aes256GcmHkdfSha512CommitKeyEcdsaP384),
            other if NON_COMMITTING_SUITES.contains(&other) => Err(InfraError::unsupported(
                format!("鍵コミットメントのないスイート 0x{other:04x}"),
            )),
            other => Err(InfraError::unsupported(format!(
                "未知のアルゴリズムスイート 0x{other:04x}"
            ))),
        }
    }

    pub fn id(self) -> u16 {
        match self {
            Self::Aes256GcmHkdfSha512CommitKey => 0x0478,
            Self::Aes256GcmHkdfSha512CommitKeyEcdsaP384 => 0x0578,
        }
    }

    /// フッタに ECDSA 署名を持つか
    pub fn is_signed(self) -> bool {
        matches!(self, Self::Aes256GcmHkdfSha512CommitKeyEcdsaP384)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::error::InfraErrorKind;

    #[rstest]
    #[case(0x0478, AlgorithmSuite::Aes256GcmHkdfSha512CommitKey, false)]
    #[case(0x0578, AlgorithmSuite::Aes256GcmHkdfSha512CommitKeyEcdsaP384, true)]
    fn test_コミットメント付きスイートを受け付ける(
        #[case] id: u16,
        #[case] expected: AlgorithmSuite,
        #[case] signed: bool,
    ) {
        let suite = AlgorithmSuite::from_id(id).unwrap();

        assert_eq!(suite, expected);
        assert_eq!(suite.id(), id);
        assert_eq!(suite.is_signed(), signed);
    }

    #[rstest]
    #[case(0x0178)]
    #[case(0x0378)]
    #[case(0x0014)]
    #[case(0xffff)]
    fn test_それ以外のスイートは未対応として拒否する(#[case] id: u16) {
        let err = AlgorithmSuite::from_id(id).unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::UnsupportedFormat(_)));
    }
}
