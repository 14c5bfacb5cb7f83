//! Value encoders used by the field normalizer.
//!
//! These are pure per-value functions; the column-level wrappers live in
//! [`DataProcessor`](super::DataProcessor).

use chrono::NaiveDate;

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub const HOUR_LABELS: [&str; 24] = [
    "12:00 AM", "1:00 AM", "2:00 AM", "3:00 AM", "4:00 AM", "5:00 AM", "6:00 AM", "7:00 AM",
    "8:00 AM", "9:00 AM", "10:00 AM", "11:00 AM", "12:00 PM", "1:00 PM", "2:00 PM", "3:00 PM",
    "4:00 PM", "5:00 PM", "6:00 PM", "7:00 PM", "8:00 PM", "9:00 PM", "10:00 PM", "11:00 PM",
];

/// Month abbreviation for a 1-based month index.
pub fn month_name(month: u32) -> Option<&'static str> {
    match month {
        1..=12 => Some(MONTH_LABELS[(month - 1) as usize]),
        _ => None,
    }
}

/// 12-hour clock label for a 0-23 hour.
pub fn hour_name(hour: u32) -> Option<&'static str> {
    HOUR_LABELS.get(hour as usize).copied()
}

/// Month abbreviation of a `MM/DD/YYYY` string.
pub fn month_label(date: &str) -> Option<&'static str> {
    leading_number(date).and_then(month_name)
}

/// Clock label of an `HH:MM:SS` string.
pub fn hour_label(time: &str) -> Option<&'static str> {
    leading_number(time).and_then(hour_name)
}

/// Year of a `MM/DD/YYYY` string.
pub fn year_of(date: &str) -> Option<i32> {
    let trimmed = date.trim();
    let start = trimmed.len().checked_sub(4)?;
    trimmed.get(start..)?.parse().ok()
}

/// 1.0 / 0.0 for the usual spellings of a yes/no flag.
pub fn flag_value(value: &str) -> Option<f64> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "y" | "yes" | "1" => Some(1.0),
        "false" | "f" | "n" | "no" | "0" => Some(0.0),
        _ => None,
    }
}

/// Parse a wide-table column name such as `X1.22.20`, `1/22/20` or `1-22-2020`.
///
/// Two-digit years are taken as 20YY.
pub fn parse_date_column(name: &str) -> Option<NaiveDate> {
    let trimmed = name
        .strip_prefix('X')
        .or_else(|| name.strip_prefix('x'))
        .unwrap_or(name);
    let mut parts = trimmed.split(['/', '.', '-']);
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    let year_part = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let year: i32 = year_part.parse().ok()?;
    let year = match year_part.len() {
        2 => 2000 + year,
        4 => year,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Days since 1970-01-01, the physical representation of a polars `Date`.
pub fn days_since_epoch(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (date - epoch).num_days() as i32
}

/// The first two characters as a zero-padded number.
fn leading_number(value: &str) -> Option<u32> {
    let head = value.get(..2)?;
    if !head.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    head.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_bounds() {
        assert_eq!(month_name(1), Some("Jan"));
        assert_eq!(month_name(12), Some("Dec"));
        assert_eq!(month_name(0), None);
        assert_eq!(month_name(13), None);
    }

    #[test]
    fn hour_labels_cover_the_clock() {
        assert_eq!(hour_name(0), Some("12:00 AM"));
        assert_eq!(hour_name(12), Some("12:00 PM"));
        assert_eq!(hour_name(13), Some("1:00 PM"));
        assert_eq!(hour_name(23), Some("11:00 PM"));
        assert_eq!(hour_name(24), None);

        let distinct: std::collections::HashSet<_> =
            (0..24).filter_map(hour_name).collect();
        assert_eq!(distinct.len(), 24);
    }

    #[test]
    fn labels_from_strings() {
        assert_eq!(month_label("07/04/2019"), Some("Jul"));
        assert_eq!(month_label("13/01/2019"), None);
        assert_eq!(month_label(""), None);
        assert_eq!(hour_label("23:59:00"), Some("11:00 PM"));
        assert_eq!(hour_label("00:15:00"), Some("12:00 AM"));
        assert_eq!(hour_label("09:05:00"), Some("9:00 AM"));
        assert_eq!(hour_label("24:00:00"), None);
        assert_eq!(year_of("12/31/2006"), Some(2006));
        assert_eq!(year_of("bad"), None);
    }

    #[test]
    fn unpadded_fields_are_not_encoded() {
        assert_eq!(month_label("7/4/2019"), None);
        assert_eq!(hour_label("9:05:00"), None);
        assert_eq!(hour_label(" 09:05:00"), None);
        assert_eq!(month_label("7"), None);
    }

    #[test]
    fn flag_spellings() {
        assert_eq!(flag_value("true"), Some(1.0));
        assert_eq!(flag_value(" N "), Some(0.0));
        assert_eq!(flag_value("maybe"), None);
    }

    #[test]
    fn date_column_names() {
        let jan2 = NaiveDate::from_ymd_opt(2021, 1, 2).unwrap();
        assert_eq!(parse_date_column("X1.2.21"), Some(jan2));
        assert_eq!(parse_date_column("1/2/21"), Some(jan2));
        assert_eq!(parse_date_column("1/2/2021"), Some(jan2));
        assert_eq!(parse_date_column("1-2-21"), Some(jan2));
        assert_eq!(parse_date_column("Province_State"), None);
        assert_eq!(parse_date_column("X2.30.21"), None);
        assert_eq!(parse_date_column("1/2/3/21"), None);
    }

    #[test]
    fn epoch_offsets() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(days_since_epoch(epoch), 0);
        let jan2 = NaiveDate::from_ymd_opt(1970, 1, 2).unwrap();
        assert_eq!(days_since_epoch(jan2), 1);
    }
}
