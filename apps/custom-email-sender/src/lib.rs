//! # Custom Email Sender ライブラリ
//!
//! Cognito Custom Email Sender トリガーの設定・ユースケース・ハンドラを公開する。
//! 統合テストから内部モジュールへアクセスするために lib として切り出している。

pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;
