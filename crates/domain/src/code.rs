//! # 鍵 ID と復号済みコード
//!
//! ## 含まれる型
//!
//! | 型 | ラップ対象 | 用途 |
//! |---|-----------|------|
//! | [`KeyId`] | `String` | 復号に使う KMS キーの ARN |
//! | [`PlaintextCode`] | `String` | 復号済みのワンタイムコード |
//!
//! `PlaintextCode` は UTF-8 であれば内容を問わない。`AdminCreateUser` では
//! 記号を含む一時パスワードが届くため、文字種や桁数は検証しない。
//! HTML への埋め込み時のエスケープはテンプレートエンジンが行う。

use std::fmt;

use derive_more::Display;
use thiserror::Error;
use zeroize::Zeroize;

/// コード検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    /// 復号結果が UTF-8 として不正
    #[error("コードが UTF-8 として不正です")]
    InvalidUtf8,
}

/// 復号鍵 ID（KMS キー ARN）
///
/// プロセス起動時に設定から一度だけ読み込まれ、以降変更されない。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{_0}")]
pub struct KeyId(String);

impl KeyId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 復号済みワンタイムコード
///
/// - `Debug` は `[REDACTED]` にマスクされ、`Display` は実装しない（ログ出力防止）
/// - ドロップ時にバッファをゼロクリアする
/// - コードが届かなかった場合は [`PlaintextCode::empty`] を使う
#[derive(Clone, PartialEq, Eq)]
pub struct PlaintextCode(String);

impl PlaintextCode {
    /// 文字列からコードを作成する
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// 復号結果のバイト列からコードを作成する
    pub fn from_utf8(bytes: Vec<u8>) -> Result<Self, CodeError> {
        match String::from_utf8(bytes) {
            Ok(value) => Ok(Self(value)),
            Err(e) => {
                e.into_bytes().zeroize();
                Err(CodeError::InvalidUtf8)
            }
        }
    }

    /// コードなし（空文字列）
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// テンプレートへ埋め込むための平文参照
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PlaintextCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PlaintextCode").field(&"[REDACTED]").finish()
    }
}

impl Drop for PlaintextCode {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}
