//! # Hyrise インフラ層
//!
//! 外部システムとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 設計方針
//!
//! このクレートはドメイン層のモデルを使って外部システムとのやり取りを実装する。
//! 外部システムの詳細をカプセル化し、ユースケースは trait 越しにのみ利用する。
//!
//! ## 責務
//!
//! - **コード復号**: Encryption SDK メッセージの解析・検証と KMS によるデータキー復号
//! - **メール送信**: SMTP リレーへの送信（Noop 実装あり）
//!
//! ## 依存関係
//!
//! ```text
//! custom-email-sender → infra → domain
//!          ↘                      ↑
//!            shared ──────────────┘
//! ```
//!
//! ## モジュール構成
//!
//! - [`decryptor`] - 確認コード復号（[`CodeDecryptor`]）
//! - [`esdk`] - Encryption SDK メッセージ形式
//! - [`kms`] - KMS によるデータキー復号
//! - [`notification`] - メール送信（[`NotificationSender`]）
//! - [`error`] - インフラ層エラー定義

pub mod decryptor;
pub mod error;
pub mod esdk;
pub mod kms;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;

pub use decryptor::{CodeDecryptor, EncryptionSdkCodeDecryptor};
pub use error::{InfraError, InfraErrorKind};
pub use kms::{DataKeyDecryptor, KmsDataKeyDecryptor};
pub use notification::{
    NoopNotificationSender,
    NotificationSender,
    SmtpConfig,
    SmtpNotificationSender,
};
