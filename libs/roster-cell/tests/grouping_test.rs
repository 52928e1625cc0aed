use std::collections::{BTreeSet, HashMap, HashSet};

use uuid::Uuid;

use roster_cell::services::grouping::{collapse, expand, format_days, key_of_slot, slot_key};
use roster_cell::{DayOfWeek, NewSchedule, Schedule, ServiceSlot, SlotKey};

const PLACES: [&str; 3] = ["Clínica A", "Hospital B", " Posto  Central "];
const NEIGHBORHOODS: [Option<i64>; 3] = [Some(3), Some(7), None];
const TIMES: [(&str, &str); 3] = [("08:00", "12:00"), ("08:00:00", "12:00:00"), ("13:00", "18:00")];

fn row(doctor_id: Uuid, place: &str, neighborhood: Option<i64>, day: DayOfWeek, start: &str, end: &str) -> Schedule {
    Schedule {
        id: Uuid::new_v4(),
        doctor_id,
        place_name: place.to_string(),
        neighborhood_id: neighborhood,
        day_of_week: day,
        start_time: start.to_string(),
        end_time: end.to_string(),
    }
}

/// Deterministic spread of rows over every combination of place, neighborhood,
/// time range and day, with some repeats.
fn sample_rows(doctor_id: Uuid) -> Vec<Schedule> {
    let mut rows = Vec::new();
    let mut n = 0usize;
    for place in PLACES {
        for neighborhood in NEIGHBORHOODS {
            for (start, end) in TIMES {
                for day in DayOfWeek::SELECTABLE {
                    n += 1;
                    if n % 3 == 0 {
                        continue;
                    }
                    rows.push(row(doctor_id, place, neighborhood, day, start, end));
                    if n % 5 == 0 {
                        rows.push(row(doctor_id, place, neighborhood, day, start, end));
                    }
                }
            }
        }
    }
    rows
}

fn key_days(slots: &[ServiceSlot]) -> HashMap<SlotKey, BTreeSet<DayOfWeek>> {
    let mut merged: HashMap<SlotKey, BTreeSet<DayOfWeek>> = HashMap::new();
    for slot in slots {
        merged
            .entry(key_of_slot(slot))
            .or_default()
            .extend(slot.days_of_week.iter().copied());
    }
    merged
}

#[test]
fn collapse_partitions_every_row_into_one_slot() {
    let rows = sample_rows(Uuid::new_v4());
    let slots = collapse(&rows);

    let distinct_keys: HashSet<SlotKey> = rows
        .iter()
        .map(|r| slot_key(&r.place_name, r.neighborhood_id, &r.start_time, &r.end_time))
        .collect();
    assert_eq!(slots.len(), distinct_keys.len());

    for r in &rows {
        let key = slot_key(&r.place_name, r.neighborhood_id, &r.start_time, &r.end_time);
        let holding: Vec<_> = slots
            .iter()
            .filter(|s| key_of_slot(s) == key && s.days_of_week.contains(&r.day_of_week))
            .collect();
        assert_eq!(holding.len(), 1, "row {:?} must land in exactly one slot", r);
    }
}

#[test]
fn expand_then_collapse_round_trips() {
    let doctor_id = Uuid::new_v4();
    let mut slots = Vec::new();
    for (i, place) in ["Clínica A", "Hospital B"].iter().enumerate() {
        for neighborhood in [3, 7] {
            for (start, end) in [("08:00", "12:00"), ("13:00", "18:00")] {
                let days: BTreeSet<DayOfWeek> = DayOfWeek::SELECTABLE
                    .iter()
                    .copied()
                    .skip(i)
                    .step_by(neighborhood as usize % 4 + 1)
                    .collect();
                slots.push(ServiceSlot {
                    place_name: place.to_string(),
                    neighborhood_id: Some(neighborhood),
                    days_of_week: days,
                    start_time: start.to_string(),
                    end_time: end.to_string(),
                });
            }
        }
    }
    // Same key as the first slot: its days merge.
    slots.push(ServiceSlot {
        place_name: "Clínica A".to_string(),
        neighborhood_id: Some(3),
        days_of_week: BTreeSet::from([DayOfWeek::Sabado]),
        start_time: "08:00".to_string(),
        end_time: "12:00".to_string(),
    });

    let rows: Vec<NewSchedule> = expand(doctor_id, &slots);
    assert!(rows.iter().all(|r| r.doctor_id == doctor_id));

    assert_eq!(key_days(&collapse(&rows)), key_days(&slots));
}

#[test]
fn expand_never_emits_incomplete_rows() {
    let doctor_id = Uuid::new_v4();
    let mut slots = Vec::new();
    for place in ["", "  ", "Clínica A"] {
        for neighborhood in [None, Some(3)] {
            for (start, end) in [("", "12:00"), ("08:00", ""), ("08:00", "12:00")] {
                slots.push(ServiceSlot {
                    place_name: place.to_string(),
                    neighborhood_id: neighborhood,
                    days_of_week: BTreeSet::from([DayOfWeek::Segunda, DayOfWeek::Quinta]),
                    start_time: start.to_string(),
                    end_time: end.to_string(),
                });
            }
        }
    }

    let rows = expand(doctor_id, &slots);
    assert_eq!(rows.len(), 2, "only the complete slot survives");
    for r in rows {
        assert!(!r.place_name.trim().is_empty());
        assert!(!r.start_time.is_empty() && !r.end_time.is_empty());
    }
}

#[test]
fn same_slot_different_days_render_in_weekday_order() {
    let doctor_id = Uuid::new_v4();
    let rows = vec![
        row(doctor_id, "Clínica A", Some(3), DayOfWeek::Quarta, "08:00", "12:00"),
        row(doctor_id, "Clínica A", Some(3), DayOfWeek::Segunda, "08:00", "12:00"),
    ];

    let slots = collapse(&rows);
    assert_eq!(slots.len(), 1);
    assert_eq!(format_days(slots[0].days_of_week.iter().copied()), "Seg, Qua");
}
