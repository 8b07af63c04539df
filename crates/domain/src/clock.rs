//! # Clock（時刻プロバイダ）
//!
//! メール本文の著作権表記に現在の年を埋め込むための抽象化。
//! レンダリングを純粋関数として扱えるよう、テストでは固定時刻を注入する。

use chrono::{DateTime, Datelike, TimeZone, Utc};

/// 現在時刻を提供するトレイト
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// 現在の西暦年
    fn current_year(&self) -> i32 {
        self.now().year()
    }
}

/// 実際のシステム時刻を返す実装
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 固定時刻を返すテスト用実装
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// 指定した年の 1 月 1 日 00:00:00 UTC に固定する
    pub fn at_year(year: i32) -> Self {
        let now = Utc
            .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default();
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clockのcurrent_yearは現在の年を返す() {
        let clock = SystemClock;
        let before = Utc::now().year();

        let year = clock.current_year();

        assert!(year >= before);
        assert!(year <= Utc::now().year());
    }

    #[test]
    fn test_fixed_clockはコンストラクタで渡した時刻を返す() {
        let fixed_time = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let clock = FixedClock::new(fixed_time);

        assert_eq!(clock.now(), fixed_time);
        assert_eq!(clock.current_year(), 2026);
    }

    #[test]
    fn test_at_yearは指定年の元日に固定される() {
        let clock = FixedClock::at_year(2031);

        assert_eq!(clock.current_year(), 2031);
        assert_eq!(clock.now().month(), 1);
        assert_eq!(clock.now().day(), 1);
    }
}
