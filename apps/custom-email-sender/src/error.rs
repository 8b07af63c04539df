//! # Custom Email Sender エラー定義
//!
//! Lambda の呼び出しを失敗させるエラーを定義する。
//! 配送失敗はここに含めず、`SendOutcome` としてユースケースから返る。

use hyrise_infra::InfraError;
use thiserror::Error;

/// 呼び出しを失敗させるエラー
#[derive(Debug, Error)]
pub enum HandlerError {
    /// 確認コードの復号に失敗
    #[error("確認コードの復号に失敗しました: {0}")]
    Decryption(#[from] InfraError),

    /// イベントが想定した形ではない
    #[error("イベントの形式が不正です: {0}")]
    InvalidEvent(#[from] serde_json::Error),
}
