//! UTC datetime utilities without timezone dependencies.
//!
//! Only what the dev server needs: turning a file's modification time into
//! an HTTP date (`Last-Modified`, `If-Modified-Since`).
//!
//! # Examples
//!
//! ```ignore
//! let dt = DateTimeUtc::from_unix_secs(1_718_461_845);
//! assert_eq!(dt.to_rfc2822(), "Sat, 15 Jun 2024 14:30:45 GMT");
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

/// UTC datetime without timezone complexity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeUtc {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DateTimeUtc {
    pub const fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Build from seconds since the Unix epoch.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_unix_secs(secs: u64) -> Self {
        let days = (secs / 86_400) as i64;
        let rem = secs % 86_400;

        // Civil-from-days (Howard Hinnant), valid for the proleptic Gregorian calendar
        let z = days + 719_468;
        let era = z.div_euclid(146_097);
        let doe = z.rem_euclid(146_097);
        let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
        let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
        let mp = (5 * doy + 2) / 153;
        let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
        let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
        let year = (yoe + era * 400 + i64::from(month <= 2)) as u16;

        Self::new(
            year,
            month,
            day,
            (rem / 3600) as u8,
            ((rem % 3600) / 60) as u8,
            (rem % 60) as u8,
        )
    }

    /// Build from a `SystemTime`, clamping pre-epoch times to the epoch.
    pub fn from_system_time(time: SystemTime) -> Self {
        let secs = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::from_unix_secs(secs)
    }

    /// Format as an HTTP date, e.g. `Sat, 15 Jun 2024 14:30:45 GMT`.
    pub fn to_rfc2822(self) -> String {
        const WEEKDAYS: [&str; 7] = ["Sat", "Sun", "Mon", "Tue", "Wed", "Thu", "Fri"];
        const MONTHS: [&str; 12] = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ];

        // Zeller's congruence for weekday calculation
        let weekday = self.weekday_index();

        format!(
            "{}, {:02} {} {:04} {:02}:{:02}:{:02} GMT",
            WEEKDAYS[weekday],
            self.day,
            MONTHS[(self.month - 1) as usize],
            self.year,
            self.hour,
            self.minute,
            self.second
        )
    }

    #[inline]
    #[allow(clippy::trivially_copy_pass_by_ref)]
    #[allow(clippy::cast_sign_loss)] // Result of % 7 is always 0-6
    fn weekday_index(&self) -> usize {
        let (y, m) = if self.month < 3 {
            (i32::from(self.year) - 1, i32::from(self.month) + 12)
        } else {
            (i32::from(self.year), i32::from(self.month))
        };
        let d = i32::from(self.day);
        ((d + (13 * (m + 1)) / 5 + y + y / 4 - y / 100 + y / 400) % 7) as usize
    }
}

/// HTTP date for a file modification time.
pub fn http_date(time: SystemTime) -> String {
    DateTimeUtc::from_system_time(time).to_rfc2822()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_from_unix_secs_epoch() {
        assert_eq!(
            DateTimeUtc::from_unix_secs(0),
            DateTimeUtc::new(1970, 1, 1, 0, 0, 0)
        );
    }

    #[test]
    fn test_from_unix_secs_known_dates() {
        assert_eq!(
            DateTimeUtc::from_unix_secs(1_718_461_845),
            DateTimeUtc::new(2024, 6, 15, 14, 30, 45)
        );
        // Leap day
        assert_eq!(
            DateTimeUtc::from_unix_secs(951_782_400),
            DateTimeUtc::new(2000, 2, 29, 0, 0, 0)
        );
        assert_eq!(
            DateTimeUtc::from_unix_secs(1_704_067_199),
            DateTimeUtc::new(2023, 12, 31, 23, 59, 59)
        );
    }

    #[test]
    fn test_to_rfc2822() {
        let dt = DateTimeUtc::new(2024, 6, 15, 14, 30, 45);
        assert_eq!(dt.to_rfc2822(), "Sat, 15 Jun 2024 14:30:45 GMT");

        let dt = DateTimeUtc::new(1970, 1, 1, 0, 0, 0);
        assert_eq!(dt.to_rfc2822(), "Thu, 01 Jan 1970 00:00:00 GMT");
    }

    #[test]
    fn test_http_date_from_system_time() {
        let time = UNIX_EPOCH + Duration::from_secs(1_718_461_845);
        assert_eq!(http_date(time), "Sat, 15 Jun 2024 14:30:45 GMT");
    }

    #[test]
    fn test_pre_epoch_clamps() {
        let time = UNIX_EPOCH - Duration::from_secs(10);
        assert_eq!(http_date(time), "Thu, 01 Jan 1970 00:00:00 GMT");
    }
}
