//! Time-related utilities with clock abstraction for testability.

use chrono::{DateTime, Local, Utc};

/// Clock trait for dependency injection and testing
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    /// Get the current instant in UTC
    fn now(&self) -> DateTime<Utc>;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Render a timestamp as wall-clock time (`HH:MM:SS`) in the local time zone
pub fn format_local_time(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_system_clock_returns_increasing_timestamps() {
        // テスト項目: SystemClock が呼び出すたびに増加するタイムスタンプを返す
        // given (前提条件):
        let clock = SystemClock;

        // when (操作):
        let first = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let second = clock.now();

        // then (期待する結果):
        assert!(second >= first);
    }

    #[test]
    fn test_format_local_time_shape() {
        // テスト項目: ローカル時刻が HH:MM:SS 形式で表示される
        // given (前提条件):
        let timestamp = Utc.with_ymd_and_hms(2023, 1, 1, 12, 34, 56).unwrap();

        // when (操作):
        let result = format_local_time(&timestamp);

        // then (期待する結果): タイムゾーンに依存しない範囲で形式を確認
        assert_eq!(result.len(), 8);
        assert_eq!(&result[2..3], ":");
        assert!(result.ends_with(":56"));
    }
}
