//! # 通知
//!
//! メール送信に関するドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **一度きりの送信**: [`EmailMessage`] は送信時に所有権ごと渡され、同じメッセージを
//!   二度送ることは型の上で起こらない
//! - **非ブロッキング**: 配送失敗は認証フローを止めない。結果は [`SendOutcome`] として
//!   呼び出し側に返し、ログで観測可能にする
//! - **テンプレート分離**: 件名・本文の生成（TemplateRenderer）は custom-email-sender が持つ

use serde::Serialize;
use strum::IntoStaticStr;
use thiserror::Error;

/// 通知送信エラー
#[derive(Debug, Error)]
pub enum NotificationError {
    /// 必須フィールドが空
    #[error("必須フィールドが空です: {0}")]
    MissingField(&'static str),

    /// SMTP 認証情報が未設定
    #[error("SMTP 認証情報が設定されていません（SMTP_EMAIL / SMTP_PASSWORD または O365_USER / O365_PASS）")]
    MissingCredentials,

    /// メールアドレスの形式が不正
    #[error("メールアドレスが不正です: {0}")]
    InvalidAddress(String),

    /// メール送信に失敗
    #[error("メール送信に失敗: {0}")]
    SendFailed(String),

    /// テンプレートレンダリングに失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),
}

/// レンダリング済みメッセージ
///
/// TemplateRenderer の出力。宛先と組み合わせて [`EmailMessage`] になる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// 件名
    pub subject: String,
    /// HTML 本文
    pub html:    String,
    /// プレーンテキスト本文（HTML からタグを除去したもの）
    pub text:    String,
}

/// メールメッセージ
///
/// NotificationSender に渡される送信単位。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// 送信先メールアドレス
    pub to:        String,
    /// 件名
    pub subject:   String,
    /// HTML 本文
    pub html_body: String,
    /// プレーンテキスト本文
    pub text_body: String,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, rendered: RenderedMessage) -> Self {
        Self {
            to:        to.into(),
            subject:   rendered.subject,
            html_body: rendered.html,
            text_body: rendered.text,
        }
    }
}

/// 配送受領情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    /// メッセージ ID（`Message-ID` ヘッダの値）
    pub message_id:     String,
    /// リレーサーバーの応答（トランスポートが返す場合のみ）
    pub relay_response: Option<String>,
}

/// 送信をスキップした理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, IntoStaticStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// 宛先メールアドレスがない
    MissingRecipient,
    /// トリガー種別に対応するテンプレートがない
    NoTemplateForTrigger,
}

/// 1 回の呼び出しにおける送信結果
///
/// 復号失敗以外の結果はすべてここに集約され、呼び出し自体は成功として完了する。
#[derive(Debug)]
pub enum SendOutcome {
    /// 送信成功
    Sent(DeliveryReceipt),
    /// 送信対象外
    Skipped(SkipReason),
    /// レンダリングまたは配送に失敗（非致命的）
    DeliveryFailed(NotificationError),
}

impl SendOutcome {
    /// ログ出力用の結果ラベル
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sent(_) => "sent",
            Self::Skipped(_) => "skipped",
            Self::DeliveryFailed(_) => "failed",
        }
    }
}
