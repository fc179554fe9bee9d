//! Fixed-width ISO 8601 UTC timestamps (`2024-12-28T15:04:05.123Z`).

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};

/// ISO 8601 timestamp with millisecond precision, always 24 bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Iso8601Timestamp {
    buf: [u8; 24],
}

impl Iso8601Timestamp {
    /// Timestamp for the current wall-clock time.
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::from_duration(since_epoch)
    }

    /// Timestamp for a duration since UNIX_EPOCH.
    pub fn from_duration(since_epoch: Duration) -> Self {
        let secs = since_epoch.as_secs();
        let millis = since_epoch.subsec_millis();

        let (year, month, day) = civil_from_days((secs / 86_400) as i64);
        let day_secs = secs % 86_400;

        let text = format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
            year,
            month,
            day,
            day_secs / 3600,
            (day_secs % 3600) / 60,
            day_secs % 60,
            millis
        );

        let mut buf = [b'0'; 24];
        let bytes = text.as_bytes();
        let len = bytes.len().min(24);
        buf[..len].copy_from_slice(&bytes[..len]);
        Self { buf }
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII digits and punctuation are ever written
        std::str::from_utf8(&self.buf).unwrap_or("1970-01-01T00:00:00.000Z")
    }
}

/// Days since 1970-01-01 to (year, month, day) in the proleptic Gregorian calendar.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

impl fmt::Display for Iso8601Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Iso8601Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Iso8601Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
