use crate::domain::time::{DAY_END_MINUTES, DAY_START_MINUTES};

/// Shifts `[start, end)` into the day window, keeping its duration.
///
/// An interval longer than the whole window is pinned to the window start and
/// still runs past 24:00.
pub fn clamp(start: u32, end: u32) -> (u32, u32) {
    let duration = end.saturating_sub(start);
    if end > DAY_END_MINUTES {
        return match DAY_END_MINUTES.checked_sub(duration) {
            Some(shifted_start) if shifted_start >= DAY_START_MINUTES => {
                (shifted_start, DAY_END_MINUTES)
            }
            _ => (DAY_START_MINUTES, DAY_START_MINUTES.saturating_add(duration)),
        };
    }
    if start < DAY_START_MINUTES {
        return (DAY_START_MINUTES, DAY_START_MINUTES.saturating_add(duration));
    }
    (start, end)
}

pub fn fits_day_window(start: u32, end: u32) -> bool {
    start >= DAY_START_MINUTES && end <= DAY_END_MINUTES
}
