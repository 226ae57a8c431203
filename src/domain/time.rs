use crate::domain::error::ScheduleError;

/// First schedulable minute of the day (08:00).
pub const DAY_START_MINUTES: u32 = 8 * 60;
/// Last schedulable minute of the day (24:00), exclusive for starts.
pub const DAY_END_MINUTES: u32 = 24 * 60;
/// Grid granularity.
pub const SLOT_MINUTES: u32 = 15;

/// Latest hour a caller may type. `24:xx` is kept so a drag past the last
/// slot can still be clamped back into the day.
pub const MAX_INPUT_HOUR: u32 = 24;
/// Latest hour a stored task may carry: a window-sized duration pinned to
/// 08:00 by the degenerate clamp case.
pub const MAX_TASK_HOUR: u32 = MAX_INPUT_HOUR + DAY_START_MINUTES / 60;

/// Parses caller-supplied `HH:mm` into minutes since midnight.
///
/// Hours above [`MAX_INPUT_HOUR`] are rejected; the minute part must be below 60.
pub fn to_minutes(time: &str) -> Result<u32, ScheduleError> {
    parse_clock(time, MAX_INPUT_HOUR)
}

/// Parses a stored task time, which may run past 24:00 after a degenerate clamp.
pub fn to_task_minutes(time: &str) -> Result<u32, ScheduleError> {
    parse_clock(time, MAX_TASK_HOUR)
}

fn parse_clock(time: &str, max_hour: u32) -> Result<u32, ScheduleError> {
    let invalid = || ScheduleError::InvalidFormat(time.to_string());
    let (hour_str, minute_str) = time.trim().split_once(':').ok_or_else(invalid)?;
    if minute_str.contains(':') {
        return Err(invalid());
    }

    let hours = hour_str.parse::<u32>().map_err(|_| invalid())?;
    let minutes = minute_str.parse::<u32>().map_err(|_| invalid())?;
    if minutes >= 60 || hours > max_hour {
        return Err(invalid());
    }
    Ok(hours * 60 + minutes)
}

/// Formats minutes since midnight as zero-padded `HH:mm`. Values are not wrapped.
pub fn from_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn is_slot_aligned(minutes: u32) -> bool {
    minutes % SLOT_MINUTES == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn to_minutes_parses_valid_times() {
        assert_eq!(to_minutes("00:00"), Ok(0));
        assert_eq!(to_minutes("08:00"), Ok(480));
        assert_eq!(to_minutes("23:45"), Ok(1425));
        assert_eq!(to_minutes("24:00"), Ok(DAY_END_MINUTES));
        assert_eq!(to_minutes(" 9:30 "), Ok(570));
    }

    #[test]
    fn to_minutes_rejects_malformed_input() {
        for raw in ["", "0900", "09:", ":30", "aa:bb", "09:60", "09:00:00", "-1:00"] {
            assert_eq!(
                to_minutes(raw),
                Err(ScheduleError::InvalidFormat(raw.to_string())),
                "expected {raw:?} to be rejected"
            );
        }
    }

    #[test]
    fn to_minutes_rejects_hours_past_the_clock() {
        for raw in ["25:00", "48:00", "71582788:00", "4294967295:00"] {
            assert_eq!(
                to_minutes(raw),
                Err(ScheduleError::InvalidFormat(raw.to_string())),
                "expected {raw:?} to be rejected"
            );
        }
        assert_eq!(to_minutes("24:30"), Ok(1470));
    }

    #[test]
    fn task_times_allow_degenerate_overrun() {
        assert_eq!(to_task_minutes("31:45"), Ok(1905));
        assert_eq!(to_task_minutes("32:00"), Ok(1920));
        assert!(to_task_minutes("33:00").is_err());
        assert!(to_minutes("31:45").is_err());
    }

    #[test]
    fn from_minutes_pads_and_does_not_wrap() {
        assert_eq!(from_minutes(0), "00:00");
        assert_eq!(from_minutes(545), "09:05");
        assert_eq!(from_minutes(1440), "24:00");
        assert_eq!(from_minutes(1500), "25:00");
    }

    #[test]
    fn slot_alignment() {
        assert!(is_slot_aligned(480));
        assert!(is_slot_aligned(495));
        assert!(!is_slot_aligned(500));
    }

    proptest! {
        #[test]
        fn quarter_hour_times_roundtrip(slot in 0u32..96u32) {
            let formatted = from_minutes(slot * SLOT_MINUTES);
            let parsed = to_minutes(&formatted).expect("formatted time parses");
            prop_assert_eq!(from_minutes(parsed), formatted);
        }
    }
}
