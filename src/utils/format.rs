// src/utils/format.rs
// Display helpers shared by the ride list, ride detail and stats views.
use chrono::{DateTime, TimeZone};

/// Metres below one kilometre, otherwise one decimal of km.
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{}m", (km * 1000.0).round() as i64)
    } else {
        format!("{:.1}km", km)
    }
}

pub fn format_duration(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{}min", minutes);
    }
    format!("{}h {}min", minutes / 60, minutes % 60)
}

/// e.g. "Oct 19, 2026"
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%b %-d, %Y").to_string()
}

/// e.g. "03:04 PM"
pub fn format_time<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%I:%M %p").to_string()
}

pub fn format_date_time<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{} {}", format_date(date), format_time(date))
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.5), "500m");
        assert_eq!(format_distance(0.0), "0m");
        assert_eq!(format_distance(12.5), "12.5km");
        assert_eq!(format_distance(8.34), "8.3km");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30), "30min");
        assert_eq!(format_duration(60), "1h 0min");
        assert_eq!(format_duration(95), "1h 35min");
    }

    #[test]
    fn test_format_date_time() {
        let date = Utc.with_ymd_and_hms(2026, 1, 5, 15, 4, 0).unwrap();
        assert_eq!(format_date(&date), "Jan 5, 2026");
        assert_eq!(format_time(&date), "03:04 PM");
        assert_eq!(format_date_time(&date), "Jan 5, 2026 03:04 PM");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(66.666_666, 2), 66.67);
        assert_eq!(round_to(4.85, 0), 5.0);
        assert_eq!(round_to(1.0 / 3.0, 3), 0.333);
    }
}
