//! Noop 通知送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! ローカル実行や通知無効化時に使用する。

use async_trait::async_trait;
use hyrise_domain::notification::{DeliveryReceipt, EmailMessage, NotificationError};
use uuid::Uuid;

use super::{NotificationSender, ensure_envelope};

/// Noop 通知送信（ログ出力のみ）
#[derive(Debug, Clone, Default)]
pub struct NoopNotificationSender;

#[async_trait]
impl NotificationSender for NoopNotificationSender {
    async fn send_email(&self, email: EmailMessage) -> Result<DeliveryReceipt, NotificationError> {
        ensure_envelope(&email)?;

        let message_id = format!("<{}@noop.localhost>", Uuid::new_v4());
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            message_id = %message_id,
            "Noop: メール送信をスキップ"
        );
        Ok(DeliveryReceipt {
            message_id,
            relay_response: None,
        })
    }
}
