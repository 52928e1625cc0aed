//! Conversion between stored schedule rows (one per day) and editable slots
//! (one per place and time range, with a set of days).
//!
//! Every read view and every editor hydration goes through [`collapse`], and
//! every save goes through [`expand`], so the merge key is built in exactly
//! one place: [`slot_key`].

use std::collections::{BTreeSet, HashMap};

use crate::models::{DayOfWeek, DoctorId, NewSchedule, ReferenceId, Schedule, ServiceSlot, SlotKey};

/// Read access to the fields of a schedule row that take part in grouping.
pub trait ScheduleFields {
    fn place_name(&self) -> &str;
    fn neighborhood_id(&self) -> Option<ReferenceId>;
    fn day_of_week(&self) -> DayOfWeek;
    fn start_time(&self) -> &str;
    fn end_time(&self) -> &str;
}

impl ScheduleFields for Schedule {
    fn place_name(&self) -> &str {
        &self.place_name
    }

    fn neighborhood_id(&self) -> Option<ReferenceId> {
        self.neighborhood_id
    }

    fn day_of_week(&self) -> DayOfWeek {
        self.day_of_week
    }

    fn start_time(&self) -> &str {
        &self.start_time
    }

    fn end_time(&self) -> &str {
        &self.end_time
    }
}

impl ScheduleFields for NewSchedule {
    fn place_name(&self) -> &str {
        &self.place_name
    }

    fn neighborhood_id(&self) -> Option<ReferenceId> {
        Some(self.neighborhood_id)
    }

    fn day_of_week(&self) -> DayOfWeek {
        self.day_of_week
    }

    fn start_time(&self) -> &str {
        &self.start_time
    }

    fn end_time(&self) -> &str {
        &self.end_time
    }
}

/// Trims and collapses inner whitespace.
pub fn normalize_place(place: &str) -> String {
    place.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Hour and minute of a stored time ("08:00:00" -> "08:00").
pub fn clock(time: &str) -> String {
    time.trim().chars().take(5).collect()
}

pub fn slot_key(
    place: &str,
    neighborhood_id: Option<ReferenceId>,
    start_time: &str,
    end_time: &str,
) -> SlotKey {
    SlotKey {
        place: normalize_place(place),
        neighborhood_id,
        start: clock(start_time),
        end: clock(end_time),
    }
}

pub fn key_of_slot(slot: &ServiceSlot) -> SlotKey {
    slot_key(&slot.place_name, slot.neighborhood_id, &slot.start_time, &slot.end_time)
}

/// Groups one doctor's rows into slots. Output follows first occurrence of
/// each key; every row's day lands in exactly one slot.
pub fn collapse<'a, R, I>(rows: I) -> Vec<ServiceSlot>
where
    R: ScheduleFields + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut slots: Vec<ServiceSlot> = Vec::new();
    let mut index: HashMap<SlotKey, usize> = HashMap::new();

    for row in rows {
        let key = slot_key(row.place_name(), row.neighborhood_id(), row.start_time(), row.end_time());

        match index.get(&key) {
            Some(&position) => {
                slots[position].days_of_week.insert(row.day_of_week());
            }
            None => {
                index.insert(key.clone(), slots.len());
                slots.push(ServiceSlot {
                    place_name: key.place,
                    neighborhood_id: key.neighborhood_id,
                    days_of_week: BTreeSet::from([row.day_of_week()]),
                    start_time: key.start,
                    end_time: key.end,
                });
            }
        }
    }

    slots
}

/// Like [`collapse`] but never empty: a doctor without rows gets one blank slot.
pub fn slots_for_editor<'a, R, I>(rows: I) -> Vec<ServiceSlot>
where
    R: ScheduleFields + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let slots = collapse(rows);
    if slots.is_empty() {
        vec![ServiceSlot::blank()]
    } else {
        slots
    }
}

/// True when the slot would produce rows worth storing.
pub fn is_persistable(slot: &ServiceSlot) -> bool {
    !normalize_place(&slot.place_name).is_empty()
        && slot.neighborhood_id.is_some()
        && !slot.start_time.trim().is_empty()
        && !slot.end_time.trim().is_empty()
}

/// One row per (slot, day). Slots with an empty place, no neighborhood or an
/// empty time produce nothing, and Sunday is never stored. Start and end are
/// not compared.
pub fn expand(doctor_id: DoctorId, slots: &[ServiceSlot]) -> Vec<NewSchedule> {
    slots
        .iter()
        .filter_map(|slot| slot.neighborhood_id.map(|neighborhood_id| (slot, neighborhood_id)))
        .filter(|(slot, _)| is_persistable(slot))
        .flat_map(|(slot, neighborhood_id)| {
            let place_name = normalize_place(&slot.place_name);
            let start_time = slot.start_time.trim().to_string();
            let end_time = slot.end_time.trim().to_string();

            slot.days_of_week
                .iter()
                .filter(|day| day.is_selectable())
                .map(move |day| NewSchedule {
                    doctor_id,
                    place_name: place_name.clone(),
                    neighborhood_id,
                    day_of_week: *day,
                    start_time: start_time.clone(),
                    end_time: end_time.clone(),
                })
        })
        .collect()
}

/// Days in Monday-to-Sunday order without repeats.
pub fn sort_days<I>(days: I) -> Vec<DayOfWeek>
where
    I: IntoIterator<Item = DayOfWeek>,
{
    let mut days: Vec<DayOfWeek> = days.into_iter().collect();
    days.sort();
    days.dedup();
    days
}

/// "Seg, Qua"
pub fn format_days<I>(days: I) -> String
where
    I: IntoIterator<Item = DayOfWeek>,
{
    sort_days(days)
        .iter()
        .map(DayOfWeek::short_label)
        .collect::<Vec<_>>()
        .join(", ")
}
