//! # ユースケース
//!
//! ## モジュール構成
//!
//! - [`custom_email`] - 復号 → ルーティング → レンダリング → 送信の統合
//! - [`template_renderer`] - tera テンプレートエンジンによるメール生成

pub mod custom_email;
pub mod template_renderer;

pub use custom_email::CustomEmailUseCase;
pub use template_renderer::TemplateRenderer;
