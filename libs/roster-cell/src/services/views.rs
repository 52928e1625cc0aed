//! Read-side projections of a [`RosterSnapshot`]. Schedules are always grouped
//! per doctor first and then collapsed into slots, so repeated rows never show
//! up twice.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::RosterError;
use crate::models::{
    Avatar, DayOfWeek, Doctor, DoctorId, ReferenceId, ReferenceItem, ReferenceKind, Schedule,
    ServiceSlot,
};
use crate::services::format::{format_phone, matches_search};
use crate::services::grouping::{collapse, format_days, sort_days};
use crate::services::session::RosterSnapshot;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgendaFilter {
    pub day: Option<DayOfWeek>,
    pub neighborhood_id: Option<ReferenceId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DoctorFilter {
    /// Matched against name, specialty name and license number.
    pub search: Option<String>,
    pub specialty_id: Option<ReferenceId>,
    pub neighborhood_id: Option<ReferenceId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorSummary {
    pub id: DoctorId,
    pub name: String,
    pub license_number: String,
    pub phone: String,
    pub phone_display: String,
    pub specialty_id: ReferenceId,
    pub specialty_name: String,
    pub avatar: Avatar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotView {
    pub place_name: String,
    pub neighborhood_id: Option<ReferenceId>,
    pub neighborhood_name: String,
    pub days: Vec<DayOfWeek>,
    pub days_label: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgendaEntry {
    pub doctor: DoctorSummary,
    pub slots: Vec<SlotView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorCard {
    pub doctor: DoctorSummary,
    pub neighborhoods: Vec<String>,
    pub slot_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorDetails {
    pub doctor: DoctorSummary,
    pub slots: Vec<SlotView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOption {
    pub id: ReferenceId,
    pub name: String,
    pub in_use: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub specialties: Vec<FilterOption>,
    pub neighborhoods: Vec<FilterOption>,
}

struct Names<'a> {
    specialties: HashMap<ReferenceId, &'a str>,
    neighborhoods: HashMap<ReferenceId, &'a str>,
}

impl<'a> Names<'a> {
    fn new(snapshot: &'a RosterSnapshot) -> Self {
        let index = |items: &'a [ReferenceItem]| {
            items
                .iter()
                .map(|item| (item.id, item.name.as_str()))
                .collect::<HashMap<_, _>>()
        };

        Self {
            specialties: index(&snapshot.specialties),
            neighborhoods: index(&snapshot.neighborhoods),
        }
    }

    fn specialty(&self, id: ReferenceId) -> String {
        self.specialties
            .get(&id)
            .map(|name| name.to_string())
            .unwrap_or_else(|| ReferenceKind::Specialty.fallback_label().to_string())
    }

    fn neighborhood(&self, id: Option<ReferenceId>) -> String {
        id.and_then(|id| self.neighborhoods.get(&id))
            .map(|name| name.to_string())
            .unwrap_or_else(|| ReferenceKind::Neighborhood.fallback_label().to_string())
    }

    fn summary(&self, doctor: &Doctor) -> DoctorSummary {
        DoctorSummary {
            id: doctor.id,
            name: doctor.name.clone(),
            license_number: doctor.license_number.clone(),
            phone: doctor.phone.clone(),
            phone_display: format_phone(&doctor.phone),
            specialty_id: doctor.specialty_id,
            specialty_name: self.specialty(doctor.specialty_id),
            avatar: doctor.avatar.clone(),
        }
    }

    fn slot(&self, slot: &ServiceSlot) -> SlotView {
        let days = sort_days(slot.days_of_week.iter().copied());
        SlotView {
            place_name: slot.place_name.clone(),
            neighborhood_id: slot.neighborhood_id,
            neighborhood_name: self.neighborhood(slot.neighborhood_id),
            days_label: format_days(days.iter().copied()),
            days,
            start_time: slot.start_time.clone(),
            end_time: slot.end_time.clone(),
        }
    }
}

/// Schedule rows per doctor. Doctors without rows are absent.
pub fn schedules_by_doctor(schedules: &[Schedule]) -> HashMap<DoctorId, Vec<&Schedule>> {
    let mut grouped: HashMap<DoctorId, Vec<&Schedule>> = HashMap::new();
    for schedule in schedules {
        grouped.entry(schedule.doctor_id).or_default().push(schedule);
    }
    grouped
}

/// Collapsed slots of every doctor in the snapshot.
pub fn slots_by_doctor(snapshot: &RosterSnapshot) -> HashMap<DoctorId, Vec<ServiceSlot>> {
    schedules_by_doctor(&snapshot.schedules)
        .into_iter()
        .map(|(doctor_id, rows)| (doctor_id, collapse(rows)))
        .collect()
}

/// Doctors with at least one slot matching the filter, each listed once with
/// only its matching slots.
pub fn agenda(snapshot: &RosterSnapshot, filter: &AgendaFilter) -> Vec<AgendaEntry> {
    let names = Names::new(snapshot);
    let mut slots = slots_by_doctor(snapshot);
    let mut seen = HashSet::new();

    snapshot
        .doctors
        .iter()
        .filter(|doctor| seen.insert(doctor.id))
        .filter_map(|doctor| {
            let matching: Vec<SlotView> = slots
                .remove(&doctor.id)
                .unwrap_or_default()
                .iter()
                .filter(|slot| filter.day.map_or(true, |day| slot.days_of_week.contains(&day)))
                .filter(|slot| {
                    filter
                        .neighborhood_id
                        .map_or(true, |id| slot.neighborhood_id == Some(id))
                })
                .map(|slot| names.slot(slot))
                .collect();

            if matching.is_empty() {
                None
            } else {
                Some(AgendaEntry {
                    doctor: names.summary(doctor),
                    slots: matching,
                })
            }
        })
        .collect()
}

/// One card per doctor matching the search and filters.
pub fn doctor_cards(snapshot: &RosterSnapshot, filter: &DoctorFilter) -> Vec<DoctorCard> {
    let names = Names::new(snapshot);
    let slots = slots_by_doctor(snapshot);
    let search = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let mut seen = HashSet::new();

    snapshot
        .doctors
        .iter()
        .filter(|doctor| seen.insert(doctor.id))
        .filter_map(|doctor| {
            let summary = names.summary(doctor);
            let doctor_slots = slots.get(&doctor.id).map(Vec::as_slice).unwrap_or_default();

            let search_match = search.map_or(true, |needle| {
                matches_search(&summary.name, needle)
                    || matches_search(&summary.specialty_name, needle)
                    || matches_search(&summary.license_number, needle)
            });
            let specialty_match = filter.specialty_id.map_or(true, |id| doctor.specialty_id == id);
            let neighborhood_match = filter.neighborhood_id.map_or(true, |id| {
                doctor_slots.iter().any(|slot| slot.neighborhood_id == Some(id))
            });

            if !(search_match && specialty_match && neighborhood_match) {
                return None;
            }

            let neighborhoods: BTreeSet<String> = doctor_slots
                .iter()
                .map(|slot| names.neighborhood(slot.neighborhood_id))
                .collect();

            Some(DoctorCard {
                doctor: summary,
                neighborhoods: neighborhoods.into_iter().collect(),
                slot_count: doctor_slots.len(),
            })
        })
        .collect()
}

pub fn doctor_details(snapshot: &RosterSnapshot, doctor_id: DoctorId) -> Result<DoctorDetails, RosterError> {
    let doctor = snapshot
        .doctor(doctor_id)
        .ok_or_else(|| RosterError::NotFound(format!("Doctor {} not found", doctor_id)))?;
    let names = Names::new(snapshot);

    let slots = collapse(snapshot.schedules_of(doctor_id))
        .iter()
        .map(|slot| names.slot(slot))
        .collect();

    Ok(DoctorDetails {
        doctor: names.summary(doctor),
        slots,
    })
}

pub fn filter_options(snapshot: &RosterSnapshot) -> FilterOptions {
    let used_specialties: HashSet<ReferenceId> =
        snapshot.doctors.iter().map(|doctor| doctor.specialty_id).collect();
    let used_neighborhoods: HashSet<ReferenceId> = snapshot
        .schedules
        .iter()
        .filter_map(|schedule| schedule.neighborhood_id)
        .collect();

    let options = |items: &[ReferenceItem], used: &HashSet<ReferenceId>| {
        let mut options: Vec<FilterOption> = items
            .iter()
            .map(|item| FilterOption {
                id: item.id,
                name: item.name.clone(),
                in_use: used.contains(&item.id),
            })
            .collect();
        options.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        options
    };

    FilterOptions {
        specialties: options(&snapshot.specialties, &used_specialties),
        neighborhoods: options(&snapshot.neighborhoods, &used_neighborhoods),
    }
}
