//! SMTP 通知送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//! 本番は Office 365 の SMTP 提出ポート（587、STARTTLS）、
//! ローカルでは Mailpit（TLS なし）に接続する。
//!
//! トランスポートは起動時に 1 度だけ構築し、内部のコネクションプールを
//! すべての呼び出しで共有する。

use async_trait::async_trait;
use hyrise_domain::notification::{DeliveryReceipt, EmailMessage, NotificationError};
use lettre::{
    Address,
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    message::{Mailbox, Message, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
};
use uuid::Uuid;

use super::{NotificationSender, ensure_envelope};

/// SMTP 接続設定
#[derive(Clone)]
pub struct SmtpConfig {
    /// SMTP サーバーのホスト名（例: "smtp.office365.com"）
    pub host:              String,
    /// SMTP サーバーのポート番号（例: 587）
    pub port:              u16,
    /// 平文接続から STARTTLS で暗号化へ切り替えるか
    pub use_starttls:      bool,
    /// From ヘッダの表示名
    pub from_display_name: String,
    /// 認証ユーザー（送信元アドレスを兼ねる）
    pub auth_user:         Option<String>,
    /// 認証パスワード
    pub auth_secret:       Option<String>,
}

impl SmtpConfig {
    /// 認証情報が揃っているか
    pub fn has_credentials(&self) -> bool {
        self.auth_user.is_some() && self.auth_secret.is_some()
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_starttls", &self.use_starttls)
            .field("from_display_name", &self.from_display_name)
            .field("auth_user", &self.auth_user)
            .field("auth_secret", &self.auth_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// 送信元の状態
///
/// 設定の不備は起動を止めず、送信のたびに同じエラーとして返す。
#[derive(Debug, Clone)]
enum Sender {
    Ready(Mailbox),
    MissingCredentials,
    InvalidAddress(String),
}

impl Sender {
    fn mailbox(&self) -> Result<&Mailbox, NotificationError> {
        match self {
            Self::Ready(mailbox) => Ok(mailbox),
            Self::MissingCredentials => Err(NotificationError::MissingCredentials),
            Self::InvalidAddress(reason) => Err(NotificationError::InvalidAddress(reason.clone())),
        }
    }
}

/// SMTP 通知送信
///
/// `lettre::AsyncSmtpTransport<Tokio1Executor>` をラップする。
pub struct SmtpNotificationSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender:    Sender,
}

impl SmtpNotificationSender {
    /// 新しい SMTP 送信インスタンスを作成
    ///
    /// 接続はまだ確立しない。認証情報がない場合や送信元アドレスが不正な場合も
    /// 作成でき、送信時に [`NotificationError::MissingCredentials`] または
    /// [`NotificationError::InvalidAddress`] を返す。起動時の確認には
    /// [`SmtpNotificationSender::ensure_ready`] を使う。
    pub fn new(config: &SmtpConfig) -> Result<Self, NotificationError> {
        // builder_dangerous: 平文で接続し、必要なら STARTTLS で切り替える
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port);

        if config.use_starttls {
            let parameters = TlsParameters::new(config.host.clone())
                .map_err(|e| NotificationError::SendFailed(format!("TLS 設定の構築に失敗: {e}")))?;
            builder = builder.tls(Tls::Opportunistic(parameters));
        }

        let sender = match (&config.auth_user, &config.auth_secret) {
            (Some(user), Some(secret)) => {
                builder = builder.credentials(Credentials::new(user.clone(), secret.clone()));
                match user.parse::<Address>() {
                    Ok(address) => {
                        Sender::Ready(Mailbox::new(Some(config.from_display_name.clone()), address))
                    }
                    Err(e) => Sender::InvalidAddress(format!("送信元アドレス不正: {e}")),
                }
            }
            _ => Sender::MissingCredentials,
        };

        Ok(Self {
            transport: builder.build(),
            sender,
        })
    }

    /// 送信できる設定かを確認する
    ///
    /// 返すエラーは以降のすべての送信で返されるものと同じ。
    pub fn ensure_ready(&self) -> Result<(), NotificationError> {
        self.sender.mailbox().map(|_| ())
    }

    fn build_message(
        &self,
        from: &Mailbox,
        email: EmailMessage,
    ) -> Result<(Message, String), NotificationError> {
        let to = email
            .to
            .parse::<Mailbox>()
            .map_err(|e| NotificationError::InvalidAddress(format!("宛先アドレス不正: {e}")))?;
        let message_id = format!("<{}@{}>", Uuid::new_v4(), from.email.domain());

        let message = Message::builder()
            .message_id(Some(message_id.clone()))
            .from(from.clone())
            .to(to)
            .subject(email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body),
                    ),
            )
            .map_err(|e| NotificationError::SendFailed(format!("メッセージ構築失敗: {e}")))?;

        Ok((message, message_id))
    }
}

#[async_trait]
impl NotificationSender for SmtpNotificationSender {
    async fn send_email(&self, email: EmailMessage) -> Result<DeliveryReceipt, NotificationError> {
        ensure_envelope(&email)?;
        let from = self.sender.mailbox()?;

        let (message, message_id) = self.build_message(from, email)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SMTP 送信失敗: {e}")))?;

        let relay_response = response.message().collect::<Vec<_>>().join(" ");
        Ok(DeliveryReceipt {
            message_id,
            relay_response: (!relay_response.is_empty()).then_some(relay_response),
        })
    }
}
