//! # ビジネスイベントログの構造化ヘルパー
//!
//! `jq` や CloudWatch Logs Insights で配送状況を追跡できるよう、ログフィールドの
//! 命名規約とヘルパーマクロを提供する。
//!
//! ## ビジネスイベント
//!
//! [`log_business_event!`] マクロで出力する。`event.kind = "business_event"` マーカーが
//! 自動付与され、`jq 'select(.["event.kind"] == "business_event")'` でフィルタできる。
//!
//! ## フィールド命名規約
//!
//! ドット記法（`event.category`、`error.kind`）を使用。tracing の
//! `$($field:ident).+` パターンでサポートされ、JSON 出力でフラットなキーになる。
//!
//! 復号済みコードはどのフィールドにも含めない。

/// ビジネスイベントを構造化ログとして出力する。
///
/// `event.kind = "business_event"` マーカーを自動付与し、
/// `tracing::info!` レベルで出力する。
///
/// ## 必須フィールド（慣例）
///
/// - `event.category`: イベントカテゴリ（[`event::category`] の定数を使用）
/// - `event.action`: アクション名（[`event::action`] の定数を使用）
/// - `event.result`: 結果（[`event::result`] の定数を使用）
///
/// ## 推奨フィールド
///
/// - `event.trigger_source`: Cognito の `triggerSource`
/// - `notification.template`: 選択されたテンプレート
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    /// イベントカテゴリ
    pub mod category {
        pub const NOTIFICATION: &str = "notification";
    }

    /// イベントアクション
    pub mod action {
        pub const CODE_DECRYPTED: &str = "code.decrypted";
        pub const CODE_DECRYPTION_FAILED: &str = "code.decryption_failed";
        pub const NOTIFICATION_SENT: &str = "notification.sent";
        pub const NOTIFICATION_FAILED: &str = "notification.failed";
        pub const NOTIFICATION_SKIPPED: &str = "notification.skipped";
        pub const EVENT_REJECTED: &str = "event.rejected";
    }

    /// イベント結果
    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
        pub const SKIPPED: &str = "skipped";
    }
}

/// エラーコンテキストフィールドの定数
pub mod error {
    /// エラーカテゴリ
    pub mod category {
        /// 外部サービス呼び出し（KMS、SMTP リレー）
        pub const EXTERNAL_SERVICE: &str = "external_service";
        /// 入力（Cognito イベント、暗号文）
        pub const INPUT: &str = "input";
    }

    /// エラー種別
    pub mod kind {
        pub const DECRYPTION: &str = "decryption";
        pub const DELIVERY: &str = "delivery";
        pub const TEMPLATE: &str = "template";
        pub const INVALID_EVENT: &str = "invalid_event";
    }
}
