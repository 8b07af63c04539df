//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンで確認コードメールを HTML/plaintext 両形式で生成する。
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: テンプレートはバイナリに埋め込まれる
//! - **共通シェル**: `base.html` がヘッダバナー・挨拶・サポート連絡先・著作権表記を持ち、
//!   テンプレート選択ごとの子テンプレートが説明文とコードを差し込む
//! - **自動エスケープ**: テンプレート名は `.html` で終わるため、埋め込む値はすべて
//!   HTML エスケープされる
//! - **プレーンテキスト**: HTML からタグを除去して生成する
//! - **年**: [`Clock`] から取得し、同じ入力と同じ時計なら同じ出力になる

use std::sync::Arc;

use hyrise_domain::{
    PlaintextCode,
    TemplateSelection,
    clock::Clock,
    notification::{NotificationError, RenderedMessage},
};
use regex::Regex;
use tera::{Context, Tera};

/// 子テンプレート名・件名・タイトル
struct TemplateEntry {
    name:    &'static str,
    subject: &'static str,
    title:   &'static str,
}

fn template_entry(selection: TemplateSelection) -> Option<TemplateEntry> {
    let entry = match selection {
        TemplateSelection::Verify => TemplateEntry {
            name:    "verify.html",
            subject: "Your Hyrise verification code",
            title:   "Verify Your Email",
        },
        TemplateSelection::Invite => TemplateEntry {
            name:    "invite.html",
            subject: "Your Hyrise account access code",
            title:   "Your Hyrise Access Code",
        },
        TemplateSelection::ResetPassword => TemplateEntry {
            name:    "reset_password.html",
            subject: "Hyrise password reset code",
            title:   "Reset Your Password",
        },
        TemplateSelection::ResendVerify => TemplateEntry {
            name:    "resend_verify.html",
            subject: "Your Hyrise verification code (resend)",
            title:   "Verification Code",
        },
        TemplateSelection::None => return None,
    };
    Some(entry)
}

/// テンプレートレンダラー
///
/// tera テンプレートエンジンをラップし、テンプレート選択・宛先名・コードから
/// [`RenderedMessage`] を生成する。
pub struct TemplateRenderer {
    engine: Tera,
    tag:    Regex,
    clock:  Arc<dyn Clock>,
}

impl TemplateRenderer {
    /// 新しいレンダラーインスタンスを作成
    ///
    /// `include_str!` で埋め込んだテンプレートを tera に登録する。
    pub fn new(clock: Arc<dyn Clock>) -> Result<Self, NotificationError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(vec![
                ("base.html", include_str!("../../templates/base.html")),
                ("verify.html", include_str!("../../templates/verify.html")),
                ("invite.html", include_str!("../../templates/invite.html")),
                (
                    "reset_password.html",
                    include_str!("../../templates/reset_password.html"),
                ),
                (
                    "resend_verify.html",
                    include_str!("../../templates/resend_verify.html"),
                ),
            ])
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        let tag = Regex::new(r"<[^>]+>")
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(Self { engine, tag, clock })
    }

    /// テンプレート選択からメール本文を生成する
    ///
    /// `recipient_name` がない場合、挨拶は `Hello there,` になる。
    /// [`TemplateSelection::None`] は送信対象外のため `TemplateFailed` を返す。
    pub fn render(
        &self,
        selection: TemplateSelection,
        recipient_name: Option<&str>,
        code: &PlaintextCode,
    ) -> Result<RenderedMessage, NotificationError> {
        let entry = template_entry(selection).ok_or_else(|| {
            NotificationError::TemplateFailed(format!("テンプレートがありません: {selection}"))
        })?;

        let mut context = Context::new();
        context.insert("title", entry.title);
        context.insert("code", code.expose());
        context.insert("year", &self.clock.current_year());
        if let Some(name) = recipient_name.filter(|name| !name.trim().is_empty()) {
            context.insert("name", name);
        }

        let html = self
            .engine
            .render(entry.name, &context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;
        let text = self.tag.replace_all(&html, "").into_owned();

        Ok(RenderedMessage {
            subject: entry.subject.to_string(),
            html,
            text,
        })
    }
}
