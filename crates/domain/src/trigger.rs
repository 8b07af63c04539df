//! # トリガー種別とテンプレート選択
//!
//! Cognito の `triggerSource` をトリガー種別に変換し、送信するメールテンプレートを決める。
//!
//! ## 対応表
//!
//! | `triggerSource` | [`TriggerKind`] | [`TemplateSelection`] |
//! |---|---|---|
//! | `CustomEmailSender_SignUp` | `SignUp` | `Verify` |
//! | `CustomEmailSender_AdminCreateUser` | `AdminCreate` | `Invite` |
//! | `CustomEmailSender_ForgotPassword` | `ForgotPassword` | `ResetPassword` |
//! | `CustomEmailSender_ResendCode` | `ResendCode` | `ResendVerify` |
//! | 上記以外 | `Unknown` | `None` |
//!
//! 「既知の種別か」の判定（文字列パース）と「何を送るか」の判定（[`route`]）を分離している。

use serde::Serialize;
use strum::IntoStaticStr;

/// トリガー種別
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
pub enum TriggerKind {
    /// 利用者自身によるサインアップ
    #[strum(serialize = "CustomEmailSender_SignUp")]
    SignUp,
    /// 管理者によるユーザー作成（招待）
    #[strum(serialize = "CustomEmailSender_AdminCreateUser")]
    AdminCreate,
    /// パスワード再設定
    #[strum(serialize = "CustomEmailSender_ForgotPassword")]
    ForgotPassword,
    /// 確認コードの再送
    #[strum(serialize = "CustomEmailSender_ResendCode")]
    ResendCode,
    /// 未対応のトリガー
    #[strum(serialize = "unknown")]
    Unknown,
}

impl TriggerKind {
    /// `triggerSource` 文字列からトリガー種別を得る
    ///
    /// 未知の文字列は [`TriggerKind::Unknown`] に縮退する（エラーにはしない）。
    pub fn from_source(source: &str) -> Self {
        source.parse().unwrap_or(Self::Unknown)
    }
}

/// 送信するメールテンプレートの選択
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, IntoStaticStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TemplateSelection {
    /// サインアップ時のメールアドレス確認
    Verify,
    /// 管理者作成ユーザーへのアクセスコード案内
    Invite,
    /// パスワード再設定コード
    ResetPassword,
    /// 確認コードの再送
    ResendVerify,
    /// 送信しない
    None,
}

impl TemplateSelection {
    /// メール送信の対象かどうか
    pub fn is_deliverable(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// トリガー種別からテンプレートを選択する
///
/// 全域・決定的な写像。副作用を持たない。
pub const fn route(kind: TriggerKind) -> TemplateSelection {
    match kind {
        TriggerKind::SignUp => TemplateSelection::Verify,
        TriggerKind::AdminCreate => TemplateSelection::Invite,
        TriggerKind::ForgotPassword => TemplateSelection::ResetPassword,
        TriggerKind::ResendCode => TemplateSelection::ResendVerify,
        TriggerKind::Unknown => TemplateSelection::None,
    }
}
