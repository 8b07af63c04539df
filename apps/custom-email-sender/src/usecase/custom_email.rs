//! # カスタムメール送信ユースケース
//!
//! 1 回の呼び出しを `復号 → ルーティング → レンダリング → 送信` の順に処理する。
//!
//! ## 設計方針
//!
//! - **復号失敗のみ致命的**: 復号エラーは `Err` で返し、呼び出しを失敗させる
//! - **配送失敗は非致命的**: レンダリング・送信の失敗は [`SendOutcome::DeliveryFailed`]
//!   として返し、認証フローを止めない
//! - **逐次処理**: 各段階は前段の結果に依存するため、並行実行しない
//! - **依存性注入**: `CodeDecryptor` と `NotificationSender` は trait で抽象化

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hyrise_domain::{
    InboundEvent,
    KeyId,
    PlaintextCode,
    notification::{EmailMessage, NotificationError, SendOutcome, SkipReason},
    route,
};
use hyrise_infra::{CodeDecryptor, InfraError, NotificationSender};
use hyrise_shared::{
    event_log::{error, event},
    log_business_event,
};

use super::TemplateRenderer;

/// カスタムメール送信ユースケース
pub struct CustomEmailUseCase {
    decryptor: Arc<dyn CodeDecryptor>,
    sender:    Arc<dyn NotificationSender>,
    renderer:  TemplateRenderer,
    key_id:    KeyId,
}

impl CustomEmailUseCase {
    pub fn new(
        decryptor: Arc<dyn CodeDecryptor>,
        sender: Arc<dyn NotificationSender>,
        renderer: TemplateRenderer,
        key_id: KeyId,
    ) -> Self {
        Self {
            decryptor,
            sender,
            renderer,
            key_id,
        }
    }

    /// イベント 1 件を処理する
    ///
    /// 復号に失敗した場合のみ `Err` を返す。それ以外の結果はすべて
    /// [`SendOutcome`] として返す。
    pub async fn execute(&self, event: &InboundEvent) -> Result<SendOutcome, InfraError> {
        let trigger_source = event.trigger_source();
        let code = self.decrypt_code(event).await?;

        let Some(recipient) = event.recipient_email() else {
            return Ok(skip(trigger_source, SkipReason::MissingRecipient));
        };

        let selection = route(event.trigger_kind());
        if !selection.is_deliverable() {
            return Ok(skip(trigger_source, SkipReason::NoTemplateForTrigger));
        }

        let rendered = match self.renderer.render(selection, event.recipient_name(), &code) {
            Ok(rendered) => rendered,
            Err(e) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_FAILED,
                    event.result = event::result::FAILURE,
                    event.trigger_source = trigger_source,
                    notification.template = %selection,
                    error.category = error::category::INPUT,
                    error.kind = error::kind::TEMPLATE,
                    error = %e,
                    "通知テンプレートのレンダリングに失敗"
                );
                return Ok(SendOutcome::DeliveryFailed(e));
            }
        };
        drop(code);

        let email = EmailMessage::new(recipient, rendered);
        match self.sender.send_email(email).await {
            Ok(receipt) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_SENT,
                    event.result = event::result::SUCCESS,
                    event.trigger_source = trigger_source,
                    notification.template = %selection,
                    notification.recipient = %recipient,
                    notification.message_id = %receipt.message_id,
                    notification.relay_response = receipt.relay_response.as_deref(),
                    "通知メール送信成功"
                );
                Ok(SendOutcome::Sent(receipt))
            }
            Err(e) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_FAILED,
                    event.result = event::result::FAILURE,
                    event.trigger_source = trigger_source,
                    notification.template = %selection,
                    notification.recipient = %recipient,
                    error.category = error_category(&e),
                    error.kind = error::kind::DELIVERY,
                    error = %e,
                    "通知メール送信失敗"
                );
                Ok(SendOutcome::DeliveryFailed(e))
            }
        }
    }

    /// 暗号化コードを復号する
    ///
    /// コードがない場合は空のコードで続行する。
    async fn decrypt_code(&self, event: &InboundEvent) -> Result<PlaintextCode, InfraError> {
        let Some(encoded) = event.encrypted_code() else {
            tracing::warn!(
                trigger_source = event.trigger_source(),
                "request.code がないため空のコードで続行します"
            );
            return Ok(PlaintextCode::empty());
        };

        let result = match STANDARD.decode(encoded) {
            Ok(ciphertext) => self.decryptor.decrypt(&ciphertext, &self.key_id).await,
            Err(e) => Err(InfraError::malformed(format!("request.code の base64 が不正です: {e}"))),
        };

        match &result {
            Ok(_) => log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::CODE_DECRYPTED,
                event.result = event::result::SUCCESS,
                event.trigger_source = event.trigger_source(),
                "確認コードを復号しました"
            ),
            Err(e) => log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::CODE_DECRYPTION_FAILED,
                event.result = event::result::FAILURE,
                event.trigger_source = event.trigger_source(),
                error.category = error::category::EXTERNAL_SERVICE,
                error.kind = error::kind::DECRYPTION,
                error = %e,
                "確認コードの復号に失敗"
            ),
        }
        result
    }
}

fn skip(trigger_source: &str, reason: SkipReason) -> SendOutcome {
    tracing::warn!(trigger_source, reason = %reason, "メール送信をスキップします");
    log_business_event!(
        event.category = event::category::NOTIFICATION,
        event.action = event::action::NOTIFICATION_SKIPPED,
        event.result = event::result::SKIPPED,
        event.trigger_source = trigger_source,
        notification.skip_reason = %reason,
        "通知メール送信をスキップ"
    );
    SendOutcome::Skipped(reason)
}

fn error_category(err: &NotificationError) -> &'static str {
    match err {
        NotificationError::SendFailed(_) | NotificationError::MissingCredentials => {
            error::category::EXTERNAL_SERVICE
        }
        NotificationError::MissingField(_)
        | NotificationError::InvalidAddress(_)
        | NotificationError::TemplateFailed(_) => error::category::INPUT,
    }
}

#[cfg(test)]
mod tests {
    use hyrise_domain::clock::FixedClock;
    use hyrise_infra::{
        InfraErrorKind,
        mock::{MockCodeDecryptor, MockNotificationSender},
    };
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    use super::*;

    const KEY_ARN: &str = "arn:aws:kms:us-east-1:111122223333:key/test";

    fn sut(decryptor: MockCodeDecryptor, sender: MockNotificationSender) -> CustomEmailUseCase {
        CustomEmailUseCase::new(
            Arc::new(decryptor),
            Arc::new(sender),
            TemplateRenderer::new(Arc::new(FixedClock::at_year(2025))).unwrap(),
            KeyId::new(KEY_ARN),
        )
    }

    fn event(value: Value) -> InboundEvent {
        InboundEvent::from_value(&value).unwrap()
    }

    #[tokio::test]
    async fn test_サインアップで確認コードメールを送信する() {
        let decryptor = MockCodeDecryptor::returning("482913");
        let sender = MockNotificationSender::new();
        let usecase = sut(decryptor.clone(), sender.clone());

        let outcome = usecase
            .execute(&event(json!({
                "triggerSource": "CustomEmailSender_SignUp",
                "request": { "code": "AAEC", "userAttributes": { "email": "a@x.com" } }
            })))
            .await
            .unwrap();

        assert!(matches!(outcome, SendOutcome::Sent(_)));
        let sent = sender.sent_emails();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@x.com");
        assert_eq!(sent[0].subject, "Your Hyrise verification code");
        assert!(sent[0].html_body.contains("482913"));
        assert_eq!(decryptor.calls(), vec![(vec![0x00, 0x01, 0x02], KEY_ARN.to_string())]);
    }

    #[tokio::test]
    async fn test_コードがなければ復号せずに空のコードで送信する() {
        let decryptor = MockCodeDecryptor::returning("482913");
        let sender = MockNotificationSender::new();
        let usecase = sut(decryptor.clone(), sender.clone());

        let outcome = usecase
            .execute(&event(json!({
                "triggerSource": "CustomEmailSender_ForgotPassword",
                "request": { "userAttributes": { "email": "a@x.com" } }
            })))
            .await
            .unwrap();

        assert!(matches!(outcome, SendOutcome::Sent(_)));
        assert!(decryptor.calls().is_empty());
        assert_eq!(sender.sent_emails()[0].subject, "Hyrise password reset code");
    }

    #[tokio::test]
    async fn test_復号に失敗したら送信せずにエラーを返す() {
        let sender = MockNotificationSender::new();
        let usecase = sut(MockCodeDecryptor::failing(), sender.clone());

        let result = usecase
            .execute(&event(json!({
                "triggerSource": "CustomEmailSender_SignUp",
                "request": { "code": "AAEC", "userAttributes": { "email": "a@x.com" } }
            })))
            .await;

        assert!(result.is_err());
        assert!(sender.sent_emails().is_empty());
    }

    #[tokio::test]
    async fn test_base64として不正なコードは復号失敗になる() {
        let decryptor = MockCodeDecryptor::returning("482913");
        let sender = MockNotificationSender::new();
        let usecase = sut(decryptor.clone(), sender.clone());

        let err = usecase
            .execute(&event(json!({
                "triggerSource": "CustomEmailSender_SignUp",
                "request": { "code": "not base64!", "userAttributes": { "email": "a@x.com" } }
            })))
            .await
            .unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::MalformedCiphertext(_)));
        assert!(decryptor.calls().is_empty());
        assert!(sender.sent_emails().is_empty());
    }

    #[tokio::test]
    async fn test_宛先がなければスキップする() {
        let sender = MockNotificationSender::new();
        let usecase = sut(MockCodeDecryptor::returning("482913"), sender.clone());

        let outcome = usecase
            .execute(&event(json!({
                "triggerSource": "CustomEmailSender_SignUp",
                "request": { "code": "AAEC", "userAttributes": {} }
            })))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            SendOutcome::Skipped(SkipReason::MissingRecipient)
        ));
        assert!(sender.sent_emails().is_empty());
    }

    #[tokio::test]
    async fn test_未知のトリガーはスキップする() {
        let sender = MockNotificationSender::new();
        let usecase = sut(MockCodeDecryptor::returning("482913"), sender.clone());

        let outcome = usecase
            .execute(&event(json!({
                "triggerSource": "CustomEmailSender_UpdateUserAttribute",
                "request": { "code": "AAEC", "userAttributes": { "email": "a@x.com" } }
            })))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            SendOutcome::Skipped(SkipReason::NoTemplateForTrigger)
        ));
        assert!(sender.sent_emails().is_empty());
    }

    #[tokio::test]
    async fn test_送信失敗はエラーにせずdelivery_failedを返す() {
        let sender = MockNotificationSender::failing("connection refused");
        let usecase = sut(MockCodeDecryptor::returning("482913"), sender.clone());

        let outcome = usecase
            .execute(&event(json!({
                "triggerSource": "CustomEmailSender_AdminCreateUser",
                "request": { "code": "AAEC", "userAttributes": { "email": "a@x.com" } }
            })))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            SendOutcome::DeliveryFailed(NotificationError::SendFailed(_))
        ));
        assert_eq!(sender.sent_emails().len(), 1);
    }

    #[tokio::test]
    async fn test_宛先名をgiven_nameから補う() {
        let sender = MockNotificationSender::new();
        let usecase = sut(MockCodeDecryptor::returning("482913"), sender.clone());

        usecase
            .execute(&event(json!({
                "triggerSource": "CustomEmailSender_ResendCode",
                "request": {
                    "code": "AAEC",
                    "userAttributes": { "email": "a@x.com", "given_name": "Carol" }
                }
            })))
            .await
            .unwrap();

        let sent = sender.sent_emails();
        assert_eq!(sent[0].subject, "Your Hyrise verification code (resend)");
        assert!(sent[0].html_body.contains("Hello Carol,"));
    }

    #[test]
    fn test_配送エラーのカテゴリ() {
        assert_eq!(
            error_category(&NotificationError::SendFailed("timeout".to_string())),
            error::category::EXTERNAL_SERVICE
        );
        assert_eq!(
            error_category(&NotificationError::MissingField("to")),
            error::category::INPUT
        );
    }
}
