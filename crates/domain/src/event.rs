//! # 受信イベント
//!
//! Cognito Custom Email Sender トリガーのイベントから、パイプラインが必要とする
//! フィールドだけを読み取るビュー。
//!
//! 元の JSON は呼び出し側（Lambda ハンドラ）がそのまま保持し、変更せずに返却する。
//! このビューは読み取り専用で、未知のフィールドは無視する。
//!
//! ```json
//! {
//!   "triggerSource": "CustomEmailSender_SignUp",
//!   "request": {
//!     "code": "AYADeD...",
//!     "userAttributes": { "email": "a@x.com", "name": "Alice" }
//!   }
//! }
//! ```

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::trigger::TriggerKind;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(default)]
    trigger_source: Option<String>,
    #[serde(default)]
    request:        Option<RawRequest>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRequest {
    #[serde(default)]
    code:            Option<String>,
    #[serde(default)]
    user_attributes: Option<HashMap<String, Value>>,
}

/// 受信イベントの読み取りビュー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    trigger_source:  String,
    trigger_kind:    TriggerKind,
    recipient_email: Option<String>,
    encrypted_code:  Option<String>,
    recipient_name:  Option<String>,
}

impl InboundEvent {
    /// JSON 値からビューを構築する
    ///
    /// 空白のみのフィールドは欠落として扱う。値そのものは加工せずに保持する。
    /// 宛先名は `name` 属性、なければ `given_name` 属性から取る。
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        let raw = RawEvent::deserialize(value)?;
        let trigger_source = raw.trigger_source.unwrap_or_default();
        let request = raw.request.unwrap_or_default();
        let attributes = request.user_attributes.unwrap_or_default();

        let attribute = |key: &str| {
            attributes
                .get(key)
                .and_then(Value::as_str)
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            trigger_kind: TriggerKind::from_source(&trigger_source),
            recipient_email: attribute("email"),
            recipient_name: attribute("name").or_else(|| attribute("given_name")),
            encrypted_code: request.code.filter(|c| !c.is_empty()),
            trigger_source,
        })
    }

    /// 生の `triggerSource` 文字列（ログ用）
    pub fn trigger_source(&self) -> &str {
        &self.trigger_source
    }

    pub fn trigger_kind(&self) -> TriggerKind {
        self.trigger_kind
    }

    pub fn recipient_email(&self) -> Option<&str> {
        self.recipient_email.as_deref()
    }

    /// base64 エンコードされた暗号化コード
    pub fn encrypted_code(&self) -> Option<&str> {
        self.encrypted_code.as_deref()
    }

    pub fn recipient_name(&self) -> Option<&str> {
        self.recipient_name.as_deref()
    }
}
