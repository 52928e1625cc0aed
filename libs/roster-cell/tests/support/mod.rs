#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, Notify, OwnedMutexGuard};
use uuid::Uuid;

use roster_cell::services::store::{replace_in_two_steps, RosterStore};
use roster_cell::{
    Doctor, DoctorId, DoctorRecord, NewSchedule, ReferenceItem, ReferenceKind, RosterError,
    Schedule,
};
use shared_models::auth::User;

#[derive(Default)]
struct Tables {
    doctors: Vec<Doctor>,
    schedules: Vec<Schedule>,
    specialties: Vec<ReferenceItem>,
    neighborhoods: Vec<ReferenceItem>,
    next_reference_id: i64,
    calls: Vec<String>,
    fail_schedule_insert: bool,
}

impl Tables {
    fn references(&mut self, kind: ReferenceKind) -> &mut Vec<ReferenceItem> {
        match kind {
            ReferenceKind::Specialty => &mut self.specialties,
            ReferenceKind::Neighborhood => &mut self.neighborhoods,
        }
    }
}

/// Roster tables kept in memory, with a unique constraint on reference names
/// and owner checks on doctor writes.
#[derive(Default)]
pub struct InMemoryRosterStore {
    tables: Mutex<Tables>,
    write_hold: Arc<AsyncMutex<()>>,
    write_started: Notify,
}

impl InMemoryRosterStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn with<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        let mut tables = self.tables.lock().unwrap();
        f(&mut tables)
    }

    fn record(&self, call: &str) {
        self.with(|t| t.calls.push(call.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.with(|t| t.calls.clone())
    }

    pub fn clear_calls(&self) {
        self.with(|t| t.calls.clear());
    }

    pub fn schedules_of(&self, doctor_id: DoctorId) -> Vec<Schedule> {
        self.with(|t| {
            t.schedules
                .iter()
                .filter(|s| s.doctor_id == doctor_id)
                .cloned()
                .collect()
        })
    }

    pub fn doctor_count(&self) -> usize {
        self.with(|t| t.doctors.len())
    }

    pub fn reference_count(&self, kind: ReferenceKind) -> usize {
        self.with(|t| t.references(kind).len())
    }

    pub fn seed_reference(&self, kind: ReferenceKind, name: &str) -> ReferenceItem {
        self.with(|t| {
            t.next_reference_id += 1;
            let item = ReferenceItem {
                id: t.next_reference_id,
                name: name.to_string(),
            };
            t.references(kind).push(item.clone());
            item
        })
    }

    pub fn seed_doctor(&self, owner_id: &str, name: &str, specialty_id: i64) -> DoctorId {
        let id = Uuid::new_v4();
        self.with(|t| {
            t.doctors.push(Doctor {
                id,
                name: name.to_string(),
                license_number: String::new(),
                phone: String::new(),
                specialty_id,
                avatar: roster_cell::Avatar::initials_for(name),
                owner_id: owner_id.to_string(),
            })
        });
        id
    }

    pub fn seed_schedule(&self, row: NewSchedule) {
        self.with(|t| {
            t.schedules.push(Schedule {
                id: Uuid::new_v4(),
                doctor_id: row.doctor_id,
                place_name: row.place_name,
                neighborhood_id: Some(row.neighborhood_id),
                day_of_week: row.day_of_week,
                start_time: row.start_time,
                end_time: row.end_time,
            })
        });
    }

    pub fn fail_schedule_insert(&self, fail: bool) {
        self.with(|t| t.fail_schedule_insert = fail);
    }

    /// Blocks doctor writes until the returned guard is dropped.
    pub async fn hold_writes(&self) -> OwnedMutexGuard<()> {
        self.write_hold.clone().lock_owned().await
    }

    /// Resolves once a doctor write has started.
    pub async fn write_started(&self) {
        self.write_started.notified().await;
    }

    async fn wait_for_release(&self) {
        self.write_started.notify_one();
        let _released = self.write_hold.lock().await;
    }
}

#[async_trait]
impl RosterStore for InMemoryRosterStore {
    async fn list_doctors(&self, owner_id: &str) -> Result<Vec<Doctor>, RosterError> {
        self.record("list_doctors");
        Ok(self.with(|t| {
            let mut doctors: Vec<Doctor> = t
                .doctors
                .iter()
                .filter(|d| d.owner_id == owner_id)
                .cloned()
                .collect();
            doctors.sort_by(|a, b| a.name.cmp(&b.name));
            doctors
        }))
    }

    async fn list_schedules(&self, doctor_ids: &[DoctorId]) -> Result<Vec<Schedule>, RosterError> {
        self.record("list_schedules");
        Ok(self.with(|t| {
            t.schedules
                .iter()
                .filter(|s| doctor_ids.contains(&s.doctor_id))
                .cloned()
                .collect()
        }))
    }

    async fn list_references(&self, kind: ReferenceKind) -> Result<Vec<ReferenceItem>, RosterError> {
        self.record("list_references");
        Ok(self.with(|t| {
            let mut items = t.references(kind).clone();
            items.sort_by(|a, b| a.name.cmp(&b.name));
            items
        }))
    }

    async fn find_reference(
        &self,
        kind: ReferenceKind,
        name: &str,
    ) -> Result<Option<ReferenceItem>, RosterError> {
        self.record("find_reference");
        Ok(self.with(|t| t.references(kind).iter().find(|item| item.name == name).cloned()))
    }

    async fn insert_reference(
        &self,
        kind: ReferenceKind,
        name: &str,
    ) -> Result<ReferenceItem, RosterError> {
        self.record("insert_reference");
        self.with(|t| {
            if t.references(kind).iter().any(|item| item.name == name) {
                return Err(RosterError::Duplicate(format!("{}_name_key", kind.table())));
            }
            t.next_reference_id += 1;
            let item = ReferenceItem {
                id: t.next_reference_id,
                name: name.to_string(),
            };
            t.references(kind).push(item.clone());
            Ok(item)
        })
    }

    async fn insert_doctor(
        &self,
        owner_id: &str,
        record: &DoctorRecord,
    ) -> Result<DoctorId, RosterError> {
        self.wait_for_release().await;
        self.record("insert_doctor");

        let id = Uuid::new_v4();
        self.with(|t| {
            t.doctors.push(Doctor {
                id,
                name: record.name.clone(),
                license_number: record.license_number.clone(),
                phone: record.phone.clone(),
                specialty_id: record.specialty_id,
                avatar: record.avatar.clone(),
                owner_id: owner_id.to_string(),
            })
        });
        Ok(id)
    }

    async fn update_doctor(
        &self,
        owner_id: &str,
        doctor_id: DoctorId,
        record: &DoctorRecord,
    ) -> Result<u64, RosterError> {
        self.wait_for_release().await;
        self.record("update_doctor");

        Ok(self.with(|t| {
            match t
                .doctors
                .iter_mut()
                .find(|d| d.id == doctor_id && d.owner_id == owner_id)
            {
                Some(doctor) => {
                    doctor.name = record.name.clone();
                    doctor.license_number = record.license_number.clone();
                    doctor.phone = record.phone.clone();
                    doctor.specialty_id = record.specialty_id;
                    doctor.avatar = record.avatar.clone();
                    1
                }
                None => 0,
            }
        }))
    }

    async fn delete_doctor(&self, owner_id: &str, doctor_id: DoctorId) -> Result<u64, RosterError> {
        self.record("delete_doctor");
        Ok(self.with(|t| {
            let before = t.doctors.len();
            t.doctors.retain(|d| !(d.id == doctor_id && d.owner_id == owner_id));
            (before - t.doctors.len()) as u64
        }))
    }

    async fn delete_schedules(&self, _owner_id: &str, doctor_id: DoctorId) -> Result<(), RosterError> {
        self.record("delete_schedules");
        self.with(|t| t.schedules.retain(|s| s.doctor_id != doctor_id));
        Ok(())
    }

    async fn insert_schedules(
        &self,
        _owner_id: &str,
        rows: &[NewSchedule],
    ) -> Result<(), RosterError> {
        self.record("insert_schedules");
        self.with(|t| {
            if t.fail_schedule_insert {
                return Err(RosterError::Storage("insert into schedules failed".to_string()));
            }
            t.schedules.extend(rows.iter().cloned().map(|row| Schedule {
                id: Uuid::new_v4(),
                doctor_id: row.doctor_id,
                place_name: row.place_name,
                neighborhood_id: Some(row.neighborhood_id),
                day_of_week: row.day_of_week,
                start_time: row.start_time,
                end_time: row.end_time,
            }));
            Ok(())
        })
    }

    async fn replace_schedules(
        &self,
        owner_id: &str,
        doctor_id: DoctorId,
        rows: &[NewSchedule],
    ) -> Result<(), RosterError> {
        replace_in_two_steps(self, owner_id, doctor_id, rows).await
    }
}

pub fn account(id: &str) -> User {
    User {
        id: id.to_string(),
        email: Some(format!("{}@example.com", id)),
        role: Some("authenticated".to_string()),
        metadata: None,
        created_at: None,
    }
}
