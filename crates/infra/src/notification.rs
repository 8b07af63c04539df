//! # 通知送信
//!
//! メール通知の送信を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `NotificationSender` trait でメール送信を抽象化
//! - **2 つの実装**: SMTP（Office 365 / Mailpit）、Noop（ログ出力のみ）
//! - **環境変数切替**: `NOTIFICATION_BACKEND` で起動時に選択
//! - **リトライなし**: 送信失敗はそのまま呼び出し元に返す

mod noop;
mod smtp;

use async_trait::async_trait;
use hyrise_domain::notification::{DeliveryReceipt, EmailMessage, NotificationError};
pub use noop::NoopNotificationSender;
pub use smtp::{SmtpConfig, SmtpNotificationSender};

/// メール送信トレイト
///
/// プロセス内で 1 つだけ構築され、すべての呼び出しで共有される。
/// 実装は並行する呼び出しから安全に使えなければならない。
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// メールを 1 通送信する
    ///
    /// メッセージは所有権ごと受け取り、同じメッセージを再送できないようにする。
    async fn send_email(&self, email: EmailMessage) -> Result<DeliveryReceipt, NotificationError>;
}

/// 宛先と件名が空でないことを確認する
fn ensure_envelope(email: &EmailMessage) -> Result<(), NotificationError> {
    if email.to.trim().is_empty() {
        return Err(NotificationError::MissingField("to"));
    }
    if email.subject.trim().is_empty() {
        return Err(NotificationError::MissingField("subject"));
    }
    Ok(())
}
