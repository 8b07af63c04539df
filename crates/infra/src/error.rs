//! # インフラ層エラー定義
//!
//! コード復号（Encryption SDK メッセージの解析、KMS 呼び出し、完全性検証）で
//! 発生するエラーを表現する。ここで生成されるエラーはすべて呼び出しにとって致命的で、
//! Lambda の実行を失敗させる。
//!
//! ## 構造
//!
//! `std::io::Error` と同じ struct + enum パターンを採用:
//! - [`InfraError`]: エラー種別（[`InfraErrorKind`]）と [`SpanTrace`] を保持するラッパー
//! - [`InfraErrorKind`]: エラーの具体的な種別
//!
//! エラーメッセージには暗号文や復号結果を含めない。

use std::fmt;

use derive_more::Display;
use hyrise_domain::CodeError;
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層で発生するエラー
///
/// エラー種別（[`InfraErrorKind`]）と [`SpanTrace`]（呼び出し経路）を保持する。
/// convenience constructor でエラーを生成すると、その時点のスパン情報が
/// 自動的にキャプチャされる。
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

/// インフラ層エラーの種別
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// 暗号文の構造が不正（切り詰め、長さ不整合、base64 不正など）
    #[error("暗号文の形式が不正です: {0}")]
    MalformedCiphertext(String),

    /// 受け付けないメッセージ形式（バージョン 1、鍵コミットメントのないスイートなど）
    #[error("未対応のメッセージ形式です: {0}")]
    UnsupportedFormat(String),

    /// 設定された鍵で復号できるデータキーがない
    #[error("復号に使用できるデータキーがありません: {0}")]
    KeyUnavailable(String),

    /// KMS 呼び出しの失敗（権限不足、鍵の不存在、ネットワークなど）
    ///
    /// AWS SDK のエラー型はジェネリクスが深く `#[from]` が困難なため、
    /// 手動で String にマップする。
    #[error("KMS エラー: {0}")]
    Kms(String),

    /// ヘッダのコミットメントキーと導出したコミットメントキーが一致しない
    #[error("キーコミットメントが一致しません")]
    CommitmentMismatch,

    /// AES-GCM 認証タグの検証に失敗
    #[error("認証タグの検証に失敗しました: {0}")]
    AuthenticationFailed(&'static str),

    /// ECDSA 署名の検証に失敗
    #[error("署名の検証に失敗しました: {0}")]
    SignatureInvalid(String),

    /// 復号結果がコードとして不正
    #[error("復号結果がコードとして不正です: {0}")]
    InvalidPlaintext(#[source] CodeError),
}

// ===== InfraError のメソッド =====

impl InfraError {
    fn new(kind: InfraErrorKind) -> Self {
        Self {
            kind,
            span_trace: SpanTrace::capture(),
        }
    }

    /// エラー種別を取得する
    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    /// SpanTrace を取得する
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    // ===== Convenience constructors =====

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::new(InfraErrorKind::MalformedCiphertext(msg.into()))
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::new(InfraErrorKind::UnsupportedFormat(msg.into()))
    }

    pub fn key_unavailable(msg: impl Into<String>) -> Self {
        Self::new(InfraErrorKind::KeyUnavailable(msg.into()))
    }

    pub fn kms(msg: impl Into<String>) -> Self {
        Self::new(InfraErrorKind::Kms(msg.into()))
    }

    pub fn commitment_mismatch() -> Self {
        Self::new(InfraErrorKind::CommitmentMismatch)
    }

    pub fn authentication_failed(part: &'static str) -> Self {
        Self::new(InfraErrorKind::AuthenticationFailed(part))
    }

    pub fn signature_invalid(msg: impl Into<String>) -> Self {
        Self::new(InfraErrorKind::SignatureInvalid(msg.into()))
    }
}

// ===== トレイト実装 =====

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

// ===== From 実装（SpanTrace 自動キャプチャ） =====

impl From<CodeError> for InfraError {
    fn from(source: CodeError) -> Self {
        Self::new(InfraErrorKind::InvalidPlaintext(source))
    }
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::layer::SubscriberExt as _;

    use super::*;

    /// テスト用に ErrorLayer 付き subscriber を設定する
    fn with_error_layer(f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(tracing_error::ErrorLayer::default());
        let _guard = tracing::subscriber::set_default(subscriber);
        f();
    }

    #[test]
    fn test_from_code_errorでspan_traceがキャプチャされる() {
        with_error_layer(|| {
            let span = tracing::info_span!("decrypt_code", key_id = "arn:aws:kms:test");
            let _enter = span.enter();

            let err: InfraError = CodeError::InvalidUtf8.into();

            assert!(matches!(
                err.kind(),
                InfraErrorKind::InvalidPlaintext(CodeError::InvalidUtf8)
            ));
            let trace_str = format!("{}", err.span_trace());
            assert!(
                trace_str.contains("decrypt_code"),
                "SpanTrace がスパン名を含むこと: {trace_str}",
            );
        });
    }

    #[test]
    fn test_kmsでspan_traceがキャプチャされる() {
        with_error_layer(|| {
            let span = tracing::info_span!("kms_decrypt");
            let _enter = span.enter();

            let err = InfraError::kms("AccessDeniedException");

            assert!(matches!(err.kind(), InfraErrorKind::Kms(msg) if msg == "AccessDeniedException"));
            assert!(format!("{}", err.span_trace()).contains("kms_decrypt"));
        });
    }

    #[test]
    fn test_displayがinfra_error_kindのメッセージを出力する() {
        assert_eq!(
            InfraError::commitment_mismatch().to_string(),
            "キーコミットメントが一致しません"
        );
        assert_eq!(
            InfraError::authentication_failed("header").to_string(),
            "認証タグの検証に失敗しました: header"
        );
    }

    #[test]
    fn test_sourceがinfra_error_kindに委譲する() {
        use std::error::Error;

        let err: InfraError = CodeError::InvalidUtf8.into();
        assert!(err.source().is_some());
        assert!(InfraError::malformed("truncated").source().is_none());
    }
}
