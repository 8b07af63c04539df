//! # Hyrise 共有ユーティリティ
//!
//! ## 設計方針
//!
//! - 他のすべてのクレート（domain, infra, custom-email-sender）から依存される
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - tracing 関連の依存は `observability` feature の背後に置く

pub mod event_log;
pub mod observability;
