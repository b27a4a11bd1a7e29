// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Formatting helpers shared by the report and archive layers.

use chrono::{DateTime, Local, TimeZone};

/// Format a timestamp as a Norwegian date (`DD.MM.YYYY`) in local time.
pub fn norwegian_date<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    at.with_timezone(&Local).format("%d.%m.%Y").to_string()
}

/// Format a timestamp as `YYYY-MM-DD` in local time, for file names.
pub fn file_date<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

/// Replace every character that is not an ASCII letter or digit with `_`.
///
/// Used for report and archive file names derived from user input.
pub fn slug(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_replaces_each_special_character() {
        assert_eq!(slug("Line A-12"), "Line_A_12");
        assert_eq!(slug("Rør/Ø 100"), "R_r___100");
        assert_eq!(slug("abc123"), "abc123");
    }

    #[test]
    fn dates_use_local_calendar() {
        let at = Local.with_ymd_and_hms(2025, 3, 7, 12, 0, 0).single().expect("valid date");
        assert_eq!(norwegian_date(&at), "07.03.2025");
        assert_eq!(file_date(&at), "2025-03-07");
    }
}
