//! Grid geometry shared with the timeline renderer.

use crate::domain::error::ScheduleError;
use crate::domain::models::Task;
use crate::domain::time::{from_minutes, DAY_END_MINUTES, DAY_START_MINUTES, SLOT_MINUTES};
use serde::Serialize;

pub const MIN_SLOT_HEIGHT: u32 = 15;
pub const MAX_SLOT_HEIGHT: u32 = 60;
pub const DEFAULT_SLOT_HEIGHT: u32 = 30;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct TaskPosition {
    pub top: i64,
    pub height: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimeSlot {
    pub time: String,
    pub label: String,
}

pub fn clamp_slot_height(slot_height: u32) -> u32 {
    slot_height.clamp(MIN_SLOT_HEIGHT, MAX_SLOT_HEIGHT)
}

/// Pixel offset from the 08:00 line and pixel height of a task block.
pub fn task_position(task: &Task, slot_height: u32) -> Result<TaskPosition, ScheduleError> {
    let (start, end) = task.interval()?;
    let slot_height = f64::from(slot_height);
    let slots_from_start = (f64::from(start) - f64::from(DAY_START_MINUTES)) / f64::from(SLOT_MINUTES);
    let duration_slots = (f64::from(end) - f64::from(start)) / f64::from(SLOT_MINUTES);
    Ok(TaskPosition {
        top: (slots_from_start * slot_height).round() as i64,
        height: (duration_slots * slot_height).round() as i64,
    })
}

/// Grid rows from 08:00 through 24:00 inclusive (65 rows).
pub fn time_slots() -> Vec<TimeSlot> {
    (DAY_START_MINUTES..=DAY_END_MINUTES)
        .step_by(SLOT_MINUTES as usize)
        .map(|minutes| TimeSlot {
            time: from_minutes(minutes),
            label: twelve_hour_label(minutes),
        })
        .collect()
}

/// Converts a vertical drag distance into whole-slot minutes.
pub fn drag_delta_minutes(delta_px: f64, slot_height: u32) -> i32 {
    let slot_height = f64::from(clamp_slot_height(slot_height));
    let slots = (delta_px / slot_height).round() as i32;
    slots.saturating_mul(SLOT_MINUTES as i32)
}

fn twelve_hour_label(minutes: u32) -> String {
    let hour = (minutes / 60) % 24;
    let minute = minutes % 60;
    let display_hour = match hour % 12 {
        0 => 12,
        value => value,
    };
    let meridiem = if hour < 12 { "AM" } else { "PM" };
    format!("{display_hour}:{minute:02} {meridiem}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TaskStatus;

    fn task(start: &str, end: &str) -> Task {
        Task {
            id: "a".to_string(),
            title: "A".to_string(),
            details: None,
            start_time: start.to_string(),
            end_time: end.to_string(),
            tags: Vec::new(),
            status: TaskStatus::Pending,
            date: None,
        }
    }

    #[test]
    fn task_position_scales_with_slot_height() {
        let position = task_position(&task("09:00", "10:30"), 30).expect("position");
        assert_eq!(position, TaskPosition { top: 120, height: 180 });

        let zoomed = task_position(&task("08:00", "08:15"), 60).expect("position");
        assert_eq!(zoomed, TaskPosition { top: 0, height: 60 });
    }

    #[test]
    fn time_slots_cover_the_day_window() {
        let slots = time_slots();
        assert_eq!(slots.len(), 65);
        assert_eq!(slots[0].time, "08:00");
        assert_eq!(slots[0].label, "8:00 AM");
        assert_eq!(slots[17].time, "12:15");
        assert_eq!(slots[17].label, "12:15 PM");
        assert_eq!(slots[64].time, "24:00");
        assert_eq!(slots[64].label, "12:00 AM");
    }

    #[test]
    fn drag_delta_rounds_to_whole_slots() {
        assert_eq!(drag_delta_minutes(44.0, 30), 15);
        assert_eq!(drag_delta_minutes(-60.0, 30), -30);
        assert_eq!(drag_delta_minutes(10.0, 30), 0);
        assert_eq!(drag_delta_minutes(120.0, 200), 30);
        assert_eq!(drag_delta_minutes(1e12, 30), i32::MAX);
    }

    #[test]
    fn slot_height_is_bounded() {
        assert_eq!(clamp_slot_height(5), MIN_SLOT_HEIGHT);
        assert_eq!(clamp_slot_height(45), 45);
        assert_eq!(clamp_slot_height(90), MAX_SLOT_HEIGHT);
    }
}
