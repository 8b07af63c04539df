//! # Observability 基盤
//!
//! トレーシング初期化とログ出力形式の設定を提供する。
//! 環境変数 `LOG_FORMAT` による JSON / Pretty 出力の切り替えに対応する。
//!
//! Lambda 上（`AWS_LAMBDA_FUNCTION_NAME` が設定されている環境）では、
//! CloudWatch Logs Insights で検索しやすい JSON をデフォルトとする。

/// Lambda 実行環境で必ず設定される環境変数
const LAMBDA_FUNCTION_NAME_VAR: &str = "AWS_LAMBDA_FUNCTION_NAME";

/// ログ出力形式
///
/// 環境変数 `LOG_FORMAT` で切り替える。
/// 値が不正な場合は [`Pretty`](LogFormat::Pretty) にフォールバックする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON 形式（Lambda / 本番環境向け）
    Json,
    /// 人間が読みやすい形式（ローカル実行向け）
    #[default]
    Pretty,
}

impl LogFormat {
    /// 文字列からログ形式をパースする
    ///
    /// 不正な値の場合は [`Pretty`](LogFormat::Pretty) にフォールバックし、
    /// stderr に警告を出力する（subscriber 初期化前のため tracing は使えない）。
    pub fn parse(s: &str) -> Self {
        match s {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            other => {
                eprintln!("WARNING: unknown LOG_FORMAT={other:?}, falling back to pretty");
                Self::Pretty
            }
        }
    }

    /// `LOG_FORMAT` の値と実行環境から出力形式を決める
    ///
    /// `LOG_FORMAT` が優先。未設定なら Lambda 上は JSON、それ以外は Pretty。
    pub fn resolve(log_format: Option<&str>, on_lambda: bool) -> Self {
        match log_format {
            Some(val) => Self::parse(val),
            None if on_lambda => Self::Json,
            None => Self::default(),
        }
    }

    /// 環境変数 `LOG_FORMAT` と `AWS_LAMBDA_FUNCTION_NAME` から読み取る
    pub fn from_env() -> Self {
        let log_format = std::env::var("LOG_FORMAT").ok();
        let on_lambda = std::env::var_os(LAMBDA_FUNCTION_NAME_VAR).is_some();
        Self::resolve(log_format.as_deref(), on_lambda)
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// サービス名（呼び出し元で `app` スパンの `service` フィールドに設定する）
    pub service_name: String,
    /// ログ出力形式
    pub log_format:   LogFormat,
}

impl TracingConfig {
    /// 新しい設定を作成する
    pub fn new(service_name: impl Into<String>, log_format: LogFormat) -> Self {
        Self {
            service_name: service_name.into(),
            log_format,
        }
    }

    /// 環境変数から設定を読み取る
    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self::new(service_name, LogFormat::from_env())
    }
}

/// トレーシングを初期化する
///
/// `RUST_LOG` 環境変数でログレベルを制御可能。
/// 未設定の場合は `"info,hyrise=debug"` をデフォルトとする。
///
/// JSON モードでは `timestamp`, `level`, `target`, `message` と
/// 現在のスパン（`invocation` の `request_id` など）が出力される。
/// `ErrorLayer` を登録し、`InfraError` が生成時の SpanTrace を捕捉できるようにする。
#[cfg(feature = "observability")]
pub fn init_tracing(config: TracingConfig) {
    use tracing_subscriber::{Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,hyrise=debug".into());

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        // CloudWatch はタイムスタンプを付与し、ANSI エスケープを解釈しない
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_ansi(std::env::var_os(LAMBDA_FUNCTION_NAME_VAR).is_none())
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(tracing_error::ErrorLayer::default())
        .init();

    tracing::debug!(service = %config.service_name, "トレーシングを初期化しました");
}
