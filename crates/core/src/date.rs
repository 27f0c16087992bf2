//! Calendar dates stored as Julian day numbers
//!
//! Day number `0` is the empty date. Dates cross the bridge either as day
//! numbers or in the eight-digit `YYYYMMDD` form.

use std::fmt;

/// Date payload of an item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Date(i64);

impl Date {
    pub const EMPTY: Date = Date(0);

    /// Wrap a raw Julian day number
    pub fn from_julian(day: i64) -> Self {
        Date(day.max(0))
    }

    pub fn julian(self) -> i64 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Encode a calendar date; invalid dates encode to the empty date
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Self {
        if !(1..=9999).contains(&year)
            || !(1..=12).contains(&month)
            || day < 1
            || day > days_in_month(year, month)
        {
            return Date::EMPTY;
        }
        let (y, m, d) = (year as i64, month as i64, day as i64);
        let factor = if m < 3 { -1 } else { 0 };
        let jd = (1461 * (factor + 4800 + y)) / 4 + ((m - 2 - factor * 12) * 367) / 12
            - (3 * ((factor + 4900 + y) / 100)) / 4
            + d
            - 32075;
        Date(jd)
    }

    /// Decode to `(year, month, day)`; the empty date decodes to `(0, 0, 0)`
    pub fn ymd(self) -> (i32, u32, u32) {
        if self.0 <= 0 {
            return (0, 0, 0);
        }
        let mut u = self.0 + 68569;
        let v = 4 * u / 146097;
        u -= (146097 * v + 3) / 4;
        let w = 4000 * (u + 1) / 1461001;
        u -= 1461 * w / 4 - 31;
        let x = 80 * u / 2447;
        let day = u - 2447 * x / 80;
        let u = x / 11;
        let month = x + 2 - 12 * u;
        let year = 100 * (v - 49) + w + u;
        (year as i32, month as u32, day as u32)
    }

    /// Parse `YYYYMMDD`; anything malformed yields the empty date
    pub fn from_yyyymmdd(text: &[u8]) -> Self {
        if text.len() < 8 || !text[..8].iter().all(u8::is_ascii_digit) {
            return Date::EMPTY;
        }
        let num = |range: std::ops::Range<usize>| {
            text[range]
                .iter()
                .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'))
        };
        Date::from_ymd(num(0..4) as i32, num(4..6), num(6..8))
    }

    /// `YYYYMMDD`, or eight spaces for the empty date
    pub fn to_yyyymmdd(self) -> String {
        if self.is_empty() {
            return " ".repeat(8);
        }
        let (y, m, d) = self.ymd();
        format!("{:04}{:02}{:02}", y, m, d)
    }

    /// Day of week, 1 = Sunday .. 7 = Saturday; 0 for the empty date
    pub fn day_of_week(self) -> u32 {
        if self.is_empty() {
            return 0;
        }
        ((self.0 + 1).rem_euclid(7) + 1) as u32
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("    -  -  ");
        }
        let (y, m, d) = self.ymd();
        write!(f, "{:04}-{:02}-{:02}", y, m, d)
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}
