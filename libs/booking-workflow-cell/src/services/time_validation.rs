use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Timelike, Utc};
use tracing::debug;

use crate::models::{WorkflowConfig, WorkflowError};

/// Wire format shared with the scheduling service.
pub const CANONICAL_UTC_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of the date-time picker value (`<input type="datetime-local">`).
pub const PICKER_FORMAT: &str = "%Y-%m-%dT%H:%M";

const LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", PICKER_FORMAT];

const INVALID_INPUT_MESSAGE: &str = "Please enter a valid appointment date and time.";

/// Client-side gate for the appointment time.
///
/// Wall-clock input is interpreted in `timezone`. The booking-hours check is advisory;
/// the scheduling service's availability check is authoritative.
#[derive(Debug, Clone)]
pub struct TimeValidator<Tz: TimeZone = Local> {
    timezone: Tz,
    open_hour_utc: u32,
    close_hour_utc: u32,
}

impl<Tz: TimeZone> TimeValidator<Tz> {
    pub fn new(timezone: Tz, config: &WorkflowConfig) -> Self {
        Self {
            timezone,
            open_hour_utc: config.open_hour_utc,
            close_hour_utc: config.close_hour_utc,
        }
    }

    /// Earliest selectable wall-clock value, recomputed on every call.
    pub fn minimum_allowed(&self) -> NaiveDateTime {
        self.minimum_allowed_at(Utc::now())
    }

    pub fn minimum_allowed_at(&self, now: DateTime<Utc>) -> NaiveDateTime {
        let local = now.with_timezone(&self.timezone).naive_local();
        local
            .with_second(0)
            .and_then(|dt| dt.with_nanosecond(0))
            .unwrap_or(local)
    }

    /// `minimum_allowed` rendered in the picker format.
    pub fn minimum_allowed_input(&self) -> String {
        self.minimum_allowed().format(PICKER_FORMAT).to_string()
    }

    /// Returns the error text for `local_date_time`, or `None` when it is acceptable.
    pub fn validate(&self, local_date_time: &str) -> Option<String> {
        if local_date_time.trim().is_empty() {
            return None;
        }

        match self.to_utc(local_date_time) {
            Ok(utc) if self.is_within_booking_hours(&utc) => None,
            Ok(utc) => {
                debug!("Rejected {} (UTC hour {})", local_date_time, utc.hour());
                Some(self.window_message())
            }
            Err(e) => {
                debug!("Unparsable appointment time {:?}: {}", local_date_time, e);
                Some(INVALID_INPUT_MESSAGE.to_string())
            }
        }
    }

    pub fn is_within_booking_hours(&self, utc: &DateTime<Utc>) -> bool {
        let hour = utc.hour();
        hour >= self.open_hour_utc && hour < self.close_hour_utc
    }

    pub fn window_message(&self) -> String {
        format!(
            "Appointments can only be scheduled between {} and {} GMT.",
            hour_label(self.open_hour_utc),
            hour_label(self.close_hour_utc)
        )
    }

    /// Convert to `YYYY-MM-DD HH:MM:SS` in UTC. Canonical input is returned as-is.
    pub fn to_canonical_utc_string(&self, local_date_time: &str) -> Result<String, WorkflowError> {
        Ok(self.to_utc(local_date_time)?.format(CANONICAL_UTC_FORMAT).to_string())
    }

    pub fn to_utc(&self, input: &str) -> Result<DateTime<Utc>, WorkflowError> {
        let input = input.trim();

        // Canonical strings are already UTC
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, CANONICAL_UTC_FORMAT) {
            return Ok(Utc.from_utc_datetime(&naive));
        }

        if let Ok(with_offset) = DateTime::parse_from_rfc3339(input) {
            if with_offset.nanosecond() != 0 {
                return Err(WorkflowError::InvalidDateTime(format!(
                    "{} has sub-second precision",
                    input
                )));
            }
            return Ok(with_offset.with_timezone(&Utc));
        }

        let naive = LOCAL_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
            .ok_or_else(|| {
                WorkflowError::InvalidDateTime(format!("{:?} is not a recognised date/time", input))
            })?;

        // A DST fold resolves to the earlier instant; a DST gap has no instant at all
        self.timezone
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| {
                WorkflowError::InvalidDateTime(format!("{} does not exist in the local time zone", input))
            })
    }
}

fn hour_label(hour: u32) -> String {
    match hour % 24 {
        0 => "12 AM".to_string(),
        12 => "12 PM".to_string(),
        h if h < 12 => format!("{} AM", h),
        h => format!("{} PM", h - 12),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn validator(offset_hours: i32) -> TimeValidator<FixedOffset> {
        let offset = FixedOffset::east_opt(offset_hours * 3600).unwrap();
        TimeValidator::new(offset, &WorkflowConfig::default())
    }

    #[test]
    fn test_empty_input_has_no_error() {
        assert_eq!(validator(2).validate(""), None);
        assert_eq!(validator(2).validate("   "), None);
    }

    #[test]
    fn test_window_boundaries_in_utc() {
        let v = validator(2);

        // 09:00 UTC
        assert_eq!(v.validate("2026-10-20T11:00"), None);
        // 16:59 UTC
        assert_eq!(v.validate("2026-10-20T18:59"), None);
        // 08:59 UTC
        assert_eq!(v.validate("2026-10-20T10:59"), Some(v.window_message()));
        // 17:00 UTC
        assert_eq!(v.validate("2026-10-20T19:00"), Some(v.window_message()));
    }

    #[test]
    fn test_window_message_text() {
        assert_eq!(
            validator(0).window_message(),
            "Appointments can only be scheduled between 9 AM and 5 PM GMT."
        );
    }

    #[test]
    fn test_unparsable_input_is_flagged() {
        assert_eq!(
            validator(0).validate("next tuesday"),
            Some(INVALID_INPUT_MESSAGE.to_string())
        );
    }

    #[test]
    fn test_canonical_conversion_crosses_date_line() {
        let v = validator(-5);
        assert_eq!(
            v.to_canonical_utc_string("2026-12-31T20:30:15").unwrap(),
            "2027-01-01 01:30:15"
        );
    }

    #[test]
    fn test_canonical_conversion_is_idempotent() {
        let v = validator(2);
        let once = v.to_canonical_utc_string("2026-10-20T11:45").unwrap();
        let twice = v.to_canonical_utc_string(&once).unwrap();

        assert_eq!(once, "2026-10-20 09:45:00");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_canonical_conversion_is_deterministic() {
        let a = validator(3).to_canonical_utc_string("2026-03-01T09:07:42").unwrap();
        let b = validator(3).to_canonical_utc_string("2026-03-01T09:07:42").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "2026-03-01 06:07:42");
    }

    #[test]
    fn test_rfc3339_uses_its_own_offset() {
        let v = validator(9);
        assert_eq!(
            v.to_canonical_utc_string("2026-10-20T10:00:00+01:00").unwrap(),
            "2026-10-20 09:00:00"
        );
        assert!(v.to_canonical_utc_string("2026-10-20T10:00:00.250Z").is_err());
    }

    #[test]
    fn test_minimum_allowed_truncates_to_minute() {
        let v = validator(2);
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 7, 15, 42).unwrap();

        let minimum = v.minimum_allowed_at(now);
        assert_eq!(minimum.format(PICKER_FORMAT).to_string(), "2026-10-18T09:15");
    }

    #[test]
    fn test_minimum_allowed_advances_with_clock() {
        let v = validator(0);
        let earlier = Utc.with_ymd_and_hms(2026, 10, 18, 7, 15, 0).unwrap();
        let later = earlier + chrono::Duration::minutes(2);

        assert!(v.minimum_allowed_at(later) > v.minimum_allowed_at(earlier));
    }
}
