//! # Custom Email Sender 設定
//!
//! 環境変数から Lambda の設定を読み込む。起動時に 1 度だけ読み込み、
//! プロセスの生存期間中は変更しない。

use std::env;

use hyrise_domain::KeyId;
use hyrise_infra::SmtpConfig;
use thiserror::Error;

const DEFAULT_SMTP_HOST: &str = "smtp.office365.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_FROM_NAME: &str = "Hyrise Support";

/// 設定読み込みエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必須の環境変数が未設定
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    /// 環境変数の値が不正
    #[error("{name} の値が不正です: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// 送信バックエンド
///
/// `NOTIFICATION_BACKEND` 環境変数で切り替える:
/// - `smtp`: SMTP リレー経由で送信（デフォルト）
/// - `noop`: 送信しない（ログ出力のみ）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationBackend {
    Smtp,
    Noop,
}

/// Custom Email Sender の設定
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// ユーザープールが使用する KMS 鍵
    pub key_id:  KeyId,
    /// 送信バックエンド
    pub backend: NotificationBackend,
    /// SMTP 接続設定（backend=smtp の場合に使用）
    pub smtp:    SmtpConfig,
}

impl SenderConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む
    ///
    /// 空文字列は未設定として扱う。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let key_id = get("KEY_ARN")
            .map(KeyId::new)
            .ok_or(ConfigError::Missing("KEY_ARN"))?;

        let backend = match get("NOTIFICATION_BACKEND").as_deref() {
            None | Some("smtp") => NotificationBackend::Smtp,
            Some("noop") => NotificationBackend::Noop,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name:  "NOTIFICATION_BACKEND",
                    value: other.to_string(),
                });
            }
        };

        let port = match get("SMTP_PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "SMTP_PORT",
                value,
            })?,
            None => DEFAULT_SMTP_PORT,
        };

        let use_starttls = match get("SMTP_STARTTLS") {
            Some(value) => parse_bool(&value).ok_or(ConfigError::Invalid {
                name: "SMTP_STARTTLS",
                value,
            })?,
            None => true,
        };

        let smtp = SmtpConfig {
            host: get("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            port,
            use_starttls,
            from_display_name: get("SMTP_FROM_NAME").unwrap_or_else(|| DEFAULT_FROM_NAME.to_string()),
            auth_user: get("SMTP_EMAIL").or_else(|| get("O365_USER")),
            auth_secret: get("SMTP_PASSWORD").or_else(|| get("O365_PASS")),
        };

        Ok(Self {
            key_id,
            backend,
            smtp,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<SenderConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        SenderConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_key_arnだけでデフォルト値が使われる() {
        let config = load(&[("KEY_ARN", "arn:aws:kms:us-west-1:1:key/a")]).unwrap();

        assert_eq!(config.key_id.as_str(), "arn:aws:kms:us-west-1:1:key/a");
        assert_eq!(config.backend, NotificationBackend::Smtp);
        assert_eq!(config.smtp.host, "smtp.office365.com");
        assert_eq!(config.smtp.port, 587);
        assert!(config.smtp.use_starttls);
        assert_eq!(config.smtp.from_display_name, "Hyrise Support");
        assert_eq!(config.smtp.auth_user, None);
        assert!(!config.smtp.has_credentials());
    }

    #[test]
    fn test_key_arnがなければエラーになる() {
        let err = load(&[("SMTP_HOST", "localhost")]).unwrap_err();

        assert!(matches!(err, ConfigError::Missing("KEY_ARN")));
    }

    #[test]
    fn test_smtp変数はo365変数より優先される() {
        let config = load(&[
            ("KEY_ARN", "arn"),
            ("SMTP_EMAIL", "support@hyrise.app"),
            ("O365_USER", "legacy@hyrise.app"),
            ("O365_PASS", "legacy-secret"),
        ])
        .unwrap();

        assert_eq!(config.smtp.auth_user.as_deref(), Some("support@hyrise.app"));
        assert_eq!(config.smtp.auth_secret.as_deref(), Some("legacy-secret"));
        assert!(config.smtp.has_credentials());
    }

    #[test]
    fn test_空文字列は未設定として扱う() {
        let config = load(&[("KEY_ARN", "arn"), ("SMTP_EMAIL", ""), ("O365_USER", "legacy@hyrise.app")])
            .unwrap();

        assert_eq!(config.smtp.auth_user.as_deref(), Some("legacy@hyrise.app"));
    }

    #[test]
    fn test_ローカルリレー向けの設定を読み込む() {
        let config = load(&[
            ("KEY_ARN", "arn"),
            ("NOTIFICATION_BACKEND", "noop"),
            ("SMTP_HOST", "localhost"),
            ("SMTP_PORT", "1025"),
            ("SMTP_STARTTLS", "false"),
            ("SMTP_FROM_NAME", "Hyrise Dev"),
        ])
        .unwrap();

        assert_eq!(config.backend, NotificationBackend::Noop);
        assert_eq!(config.smtp.host, "localhost");
        assert_eq!(config.smtp.port, 1025);
        assert!(!config.smtp.use_starttls);
        assert_eq!(config.smtp.from_display_name, "Hyrise Dev");
    }

    #[rstest]
    #[case("NOTIFICATION_BACKEND", "ses")]
    #[case("SMTP_PORT", "five-eight-seven")]
    #[case("SMTP_PORT", "70000")]
    #[case("SMTP_STARTTLS", "maybe")]
    fn test_不正な値はinvalidになる(#[case] name: &str, #[case] value: &str) {
        let err = load(&[("KEY_ARN", "arn"), (name, value)]).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { name: n, .. } if n == name));
    }
}
