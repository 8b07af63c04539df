//! # Hyrise Custom Email Sender
//!
//! Cognito ユーザープールの Custom Email Sender トリガーとして動作する Lambda。
//!
//! ## 役割
//!
//! Cognito が送るはずだった確認コードメールを代わりに送信する:
//!
//! - **復号**: KMS で暗号化された確認コードを復号する
//! - **ルーティング**: トリガー種別からテンプレートを選ぶ
//! - **送信**: HTML/plaintext のメールを SMTP リレー経由で送る
//!
//! どの場合も受け取ったイベントをそのまま返す。復号に失敗した場合のみ
//! 呼び出しを失敗させる。
//!
//! ```text
//! ┌──────────┐  event   ┌─────────────────────┐  Decrypt   ┌──────────┐
//! │ Cognito  │─────────→│ custom-email-sender │───────────→│   KMS    │
//! └──────────┘          └─────────────────────┘            └──────────┘
//!                                  │ SMTP (STARTTLS)
//!                                  ↓
//!                           ┌──────────────┐
//!                           │ Office 365   │
//!                           └──────────────┘
//! ```
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `KEY_ARN` | **Yes** | ユーザープールの KMS 鍵 ARN |
//! | `NOTIFICATION_BACKEND` | No | `smtp`（デフォルト）または `noop` |
//! | `SMTP_HOST` | No | SMTP ホスト（デフォルト: `smtp.office365.com`） |
//! | `SMTP_PORT` | No | SMTP ポート（デフォルト: `587`） |
//! | `SMTP_STARTTLS` | No | STARTTLS で暗号化するか（デフォルト: `true`） |
//! | `SMTP_FROM_NAME` | No | From の表示名（デフォルト: `Hyrise Support`） |
//! | `SMTP_EMAIL` / `O365_USER` | No | SMTP 認証ユーザー（From アドレス） |
//! | `SMTP_PASSWORD` / `O365_PASS` | No | SMTP 認証パスワード |
//! | `LOG_FORMAT` | No | `json` または `pretty`（Lambda 上のデフォルト: `json`） |
//!
//! ## ローカル実行
//!
//! ```bash
//! cargo lambda watch -p hyrise-custom-email-sender
//! ```

use std::sync::Arc;

use hyrise_custom_email_sender::{
    config::{NotificationBackend, SenderConfig},
    handler,
    usecase::{CustomEmailUseCase, TemplateRenderer},
};
use hyrise_domain::clock::SystemClock;
use hyrise_infra::{
    EncryptionSdkCodeDecryptor,
    KmsDataKeyDecryptor,
    NoopNotificationSender,
    NotificationSender,
    SmtpNotificationSender,
    kms,
};
use hyrise_shared::observability::{self, TracingConfig};
use lambda_runtime::{LambdaEvent, service_fn};
use serde_json::Value;

/// Lambda のエントリーポイント
///
/// KMS クライアント・SMTP トランスポート・テンプレートはここで 1 度だけ構築し、
/// すべての呼び出しで共有する。
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    // トレーシング初期化
    observability::init_tracing(TracingConfig::from_env("custom-email-sender"));

    // 設定読み込み
    let config = SenderConfig::from_env()?;
    tracing::info!(
        key_id = %config.key_id,
        backend = ?config.backend,
        smtp_host = %config.smtp.host,
        smtp_port = config.smtp.port,
        "Custom Email Sender を起動します"
    );

    let sender: Arc<dyn NotificationSender> = match config.backend {
        NotificationBackend::Smtp => {
            let smtp = SmtpNotificationSender::new(&config.smtp)?;
            if let Err(e) = smtp.ensure_ready() {
                tracing::warn!(
                    error = %e,
                    smtp_email_set = config.smtp.auth_user.is_some(),
                    smtp_password_set = config.smtp.auth_secret.is_some(),
                    "SMTP の送信元設定が不完全です。メール送信はすべて失敗します"
                );
            }
            Arc::new(smtp)
        }
        NotificationBackend::Noop => Arc::new(NoopNotificationSender),
    };

    let kms_client = kms::create_client().await;
    let decryptor = EncryptionSdkCodeDecryptor::new(Arc::new(KmsDataKeyDecryptor::new(kms_client)));
    let renderer = TemplateRenderer::new(Arc::new(SystemClock))?;

    let usecase = Arc::new(CustomEmailUseCase::new(
        Arc::new(decryptor),
        sender,
        renderer,
        config.key_id,
    ));

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let usecase = usecase.clone();
        async move {
            handler::handle(&usecase, event)
                .await
                .map_err(lambda_runtime::Error::from)
        }
    }))
    .await
    .map_err(|e| anyhow::anyhow!("Lambda ランタイムが異常終了しました: {e}"))
}
