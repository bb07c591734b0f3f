//! Local-time windows and timestamp formatting

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, TimeZone, Utc};

use crate::error::{AppError, AppResult};

/// Half-open UTC interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes * 60).unwrap_or_else(|| Utc.fix())
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> AppResult<DateTime<Utc>> {
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppError::Internal(format!("Invalid date {}", date)))?;
    let utc = naive - Duration::seconds(offset.local_minus_utc() as i64);
    Ok(Utc.from_utc_datetime(&utc))
}

/// The local calendar day containing `now`
pub fn day_window(now: DateTime<Utc>, offset: FixedOffset) -> AppResult<Window> {
    let today = now.with_timezone(&offset).date_naive();
    let tomorrow = today
        .succ_opt()
        .ok_or_else(|| AppError::Internal(format!("No day after {}", today)))?;
    Ok(Window {
        start: local_midnight(today, offset)?,
        end: local_midnight(tomorrow, offset)?,
    })
}

/// `[first-of-month, first-of-next-month)` for the local month containing `now`
pub fn month_window(now: DateTime<Utc>, offset: FixedOffset) -> AppResult<Window> {
    let local = now.with_timezone(&offset);
    let (year, month) = (local.year(), local.month());
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };

    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::Internal(format!("Invalid month {}-{}", year, month)))?;
    let next = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .ok_or_else(|| AppError::Internal(format!("Invalid month {}-{}", next_year, next_month)))?;

    Ok(Window {
        start: local_midnight(first, offset)?,
        end: local_midnight(next, offset)?,
    })
}

/// `dd.mm.yyyy HH:MM` in local time
pub fn format_local(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%d.%m.%Y %H:%M").to_string()
}

/// `October 2026` style label of the window's local month
pub fn month_label(window: &Window, offset: FixedOffset) -> String {
    window.start.with_timezone(&offset).format("%B %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_month_window_utc() {
        let window = month_window(utc(2026, 10, 18, 12, 0), offset_from_minutes(0)).unwrap();
        assert_eq!(window.start, utc(2026, 10, 1, 0, 0));
        assert_eq!(window.end, utc(2026, 11, 1, 0, 0));
    }

    #[test]
    fn test_month_window_rolls_over_year() {
        let window = month_window(utc(2026, 12, 31, 10, 0), offset_from_minutes(0)).unwrap();
        assert_eq!(window.end, utc(2027, 1, 1, 0, 0));
    }

    #[test]
    fn test_month_window_uses_local_month() {
        // 20:00 UTC on Oct 31 is already Nov 1 at UTC+5
        let offset = offset_from_minutes(300);
        let window = month_window(utc(2026, 10, 31, 20, 0), offset).unwrap();
        assert_eq!(window.start, utc(2026, 10, 31, 19, 0));
        assert_eq!(window.end, utc(2026, 11, 30, 19, 0));
        assert_eq!(month_label(&window, offset), "November 2026");
    }

    #[test]
    fn test_day_window_and_format() {
        let offset = offset_from_minutes(300);
        let window = day_window(utc(2026, 10, 18, 2, 30), offset).unwrap();
        assert_eq!(window.start, utc(2026, 10, 17, 19, 0));
        assert_eq!(window.end, utc(2026, 10, 18, 19, 0));
        assert_eq!(format_local(utc(2026, 10, 18, 2, 30), offset), "18.10.2026 07:30");
    }
}
