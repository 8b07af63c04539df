//! # Hyrise ドメイン層
//!
//! Cognito Custom Email Sender トリガーが扱うドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **純粋性**: I/O を一切持たない。KMS や SMTP の詳細は `hyrise-infra` が担う
//! - **全域写像**: トリガー種別からテンプレート選択への対応は網羅的な `match` で表現し、
//!   新しいトリガー種別の追加時に対応漏れをコンパイルエラーとして検出する
//! - **機密値の保護**: 復号済みコードは `Debug` をマスクし、`Display` を持たない
//!
//! ## 依存関係の方向
//!
//! ```text
//! custom-email-sender → infra → domain
//!           ↘                     ↑
//!             shared ─────────────┘（依存なし）
//! ```
//!
//! ## モジュール構成
//!
//! - [`clock`] - 現在時刻の抽象化（著作権表記の年に使用）
//! - [`code`] - 鍵 ID と復号済みコード
//! - [`event`] - Cognito から受け取るイベントの読み取りビュー
//! - [`notification`] - メールメッセージ、配送結果、送信エラー
//! - [`trigger`] - トリガー種別とテンプレート選択のルーティング

pub mod clock;
pub mod code;
pub mod event;
pub mod notification;
pub mod trigger;

pub use code::{CodeError, KeyId, PlaintextCode};
pub use event::InboundEvent;
pub use trigger::{TemplateSelection, TriggerKind, route};
