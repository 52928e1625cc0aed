use serde::{Deserialize, Serialize};

use crate::error::FieldErrors;
use crate::models::{DayOfWeek, Doctor, DoctorFields, DoctorId, Schedule, ServiceSlot};
use crate::services::grouping::slots_for_editor;

/// Form state for creating or editing a doctor. Always holds at least one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorEditor {
    pub doctor_id: Option<DoctorId>,
    pub fields: DoctorFields,
    slots: Vec<ServiceSlot>,
}

impl Default for DoctorEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl DoctorEditor {
    pub fn new() -> Self {
        Self {
            doctor_id: None,
            fields: DoctorFields::default(),
            slots: vec![ServiceSlot::blank()],
        }
    }

    pub fn hydrate<'a, I>(doctor: &Doctor, rows: I) -> Self
    where
        I: IntoIterator<Item = &'a Schedule>,
    {
        Self {
            doctor_id: Some(doctor.id),
            fields: DoctorFields::from(doctor),
            slots: slots_for_editor(rows),
        }
    }

    /// Editor state received from a client. An empty slot list becomes one blank slot.
    pub fn from_parts(doctor_id: Option<DoctorId>, fields: DoctorFields, slots: Vec<ServiceSlot>) -> Self {
        let slots = if slots.is_empty() { vec![ServiceSlot::blank()] } else { slots };
        Self { doctor_id, fields, slots }
    }

    pub fn slots(&self) -> &[ServiceSlot] {
        &self.slots
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut ServiceSlot> {
        self.slots.get_mut(index)
    }

    pub fn add_slot(&mut self) {
        self.slots.push(ServiceSlot::blank());
    }

    /// Removes the slot at `index` unless it is the last one left.
    pub fn remove_slot(&mut self, index: usize) -> bool {
        if self.slots.len() <= 1 || index >= self.slots.len() {
            return false;
        }
        self.slots.remove(index);
        true
    }

    /// Adds or removes `day` from the slot. Returns whether the day is now set.
    /// Sunday cannot be picked.
    pub fn toggle_day(&mut self, index: usize, day: DayOfWeek) -> bool {
        if !day.is_selectable() {
            return false;
        }
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };

        if slot.days_of_week.remove(&day) {
            false
        } else {
            slot.days_of_week.insert(day)
        }
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        self.fields.validate().map(|_| ())
    }

    pub fn into_submission(self) -> (Option<DoctorId>, DoctorFields, Vec<ServiceSlot>) {
        (self.doctor_id, self.fields, self.slots)
    }
}
