//! Booking schedule rules: slot timing, derived status, capacity and
//! per-slot availability.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use super::DomainError;
use crate::models::{BookingStatus, TimeSlot};

pub const MIN_GUESTS: i32 = 1;
pub const MAX_GUESTS: i32 = 20;

/// Moment a booking's slot starts.
pub fn slot_start(date: NaiveDate, slot: TimeSlot) -> NaiveDateTime {
    let time = NaiveTime::from_hms_opt(slot.start_hour(), 0, 0).unwrap_or_default();
    date.and_time(time)
}

/// A booking is past due once its slot start is strictly before `now`.
pub fn is_past_due(date: NaiveDate, slot: TimeSlot, now: NaiveDateTime) -> bool {
    slot_start(date, slot) < now
}

/// Status of a booking as observed at `now`: anything not cancelled or
/// completed whose slot has started counts as completed.
pub fn effective_status(
    stored: BookingStatus,
    date: NaiveDate,
    slot: TimeSlot,
    now: NaiveDateTime,
) -> BookingStatus {
    if !stored.is_final() && is_past_due(date, slot, now) {
        BookingStatus::Completed
    } else {
        stored
    }
}

pub fn check_guest_count(guests: i32) -> Result<(), DomainError> {
    if guests < MIN_GUESTS {
        return Err(DomainError::field(
            "number_of_guests",
            format!("Ensure this value is greater than or equal to {}.", MIN_GUESTS),
        ));
    }
    if guests > MAX_GUESTS {
        return Err(DomainError::field(
            "number_of_guests",
            format!("Ensure this value is less than or equal to {}.", MAX_GUESTS),
        ));
    }
    Ok(())
}

pub fn check_capacity(guests: i32, capacity: i32) -> Result<(), DomainError> {
    if guests > capacity {
        return Err(DomainError::validation(format!(
            "Number of guests exceeds table capacity. Maximum is {}.",
            capacity
        )));
    }
    Ok(())
}

pub fn ensure_cancellable(status: BookingStatus) -> Result<(), DomainError> {
    if status.is_final() {
        return Err(DomainError::validation(format!(
            "Cannot cancel a booking that is already {}.",
            status.as_str()
        )));
    }
    Ok(())
}

pub fn ensure_confirmable(status: BookingStatus) -> Result<(), DomainError> {
    if status != BookingStatus::Pending {
        return Err(DomainError::validation(format!(
            "Only pending bookings can be confirmed; this one is {}.",
            status.as_str()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotAvailability {
    pub time_slot: TimeSlot,
    pub display_time: &'static str,
    pub available_tables: u64,
}

/// Per-slot table count: suitable tables minus those already held in the
/// slot. Slots with nothing left are omitted.
pub fn available_slots(
    suitable_tables: u64,
    held_per_slot: &HashMap<TimeSlot, u64>,
) -> Vec<SlotAvailability> {
    TimeSlot::ALL
        .into_iter()
        .filter_map(|slot| {
            let held = held_per_slot.get(&slot).copied().unwrap_or(0);
            let remaining = suitable_tables.saturating_sub(held);
            (remaining > 0).then(|| SlotAvailability {
                time_slot: slot,
                display_time: slot.display_time(),
                available_tables: remaining,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y-%m-%d %H:%M").unwrap()
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_past_due_is_strict() {
        let date = day("2025-06-01");
        assert!(!is_past_due(date, TimeSlot::H1900, at("2025-06-01", "19:00")));
        assert!(is_past_due(date, TimeSlot::H1900, at("2025-06-01", "19:01")));
        assert!(!is_past_due(date, TimeSlot::H2000, at("2025-06-01", "19:30")));
    }

    #[test]
    fn test_effective_status_completes_elapsed_bookings() {
        let date = day("2025-06-01");
        let later = at("2025-06-02", "10:00");
        assert_eq!(
            effective_status(BookingStatus::Pending, date, TimeSlot::H1700, later),
            BookingStatus::Completed
        );
        assert_eq!(
            effective_status(BookingStatus::Confirmed, date, TimeSlot::H1700, later),
            BookingStatus::Completed
        );
        assert_eq!(
            effective_status(BookingStatus::Cancelled, date, TimeSlot::H1700, later),
            BookingStatus::Cancelled
        );

        let earlier = at("2025-05-30", "10:00");
        assert_eq!(
            effective_status(BookingStatus::Confirmed, date, TimeSlot::H1700, earlier),
            BookingStatus::Confirmed
        );
    }

    #[test]
    fn test_capacity_and_guest_bounds() {
        assert!(check_capacity(4, 4).is_ok());
        let err = check_capacity(5, 4).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Number of guests exceeds table capacity. Maximum is 4."
        );
        assert!(check_guest_count(0).is_err());
        assert!(check_guest_count(21).is_err());
        assert!(check_guest_count(20).is_ok());
    }

    #[test]
    fn test_cancellable_states() {
        assert!(ensure_cancellable(BookingStatus::Pending).is_ok());
        assert!(ensure_cancellable(BookingStatus::Confirmed).is_ok());
        assert!(ensure_cancellable(BookingStatus::Cancelled).is_err());
        assert!(ensure_cancellable(BookingStatus::Completed).is_err());
    }

    #[test]
    fn test_available_slots_subtracts_held_tables() {
        let mut held = HashMap::new();
        held.insert(TimeSlot::H1900, 3);
        held.insert(TimeSlot::H2000, 1);

        let slots = available_slots(3, &held);
        let listed: Vec<TimeSlot> = slots.iter().map(|s| s.time_slot).collect();
        assert!(!listed.contains(&TimeSlot::H1900));
        assert_eq!(slots.len(), 5);

        let eight = slots.iter().find(|s| s.time_slot == TimeSlot::H2000).unwrap();
        assert_eq!(eight.available_tables, 2);
        assert_eq!(eight.display_time, "8:00 PM");
    }

    #[test]
    fn test_no_suitable_tables_means_no_slots() {
        assert!(available_slots(0, &HashMap::new()).is_empty());
    }
}
