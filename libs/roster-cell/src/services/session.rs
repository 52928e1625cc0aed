use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info, warn};

use shared_models::auth::User;

use crate::error::RosterError;
use crate::models::{
    Doctor, DoctorFields, DoctorId, ReferenceItem, ReferenceKind, Schedule, ServiceSlot,
};
use crate::services::editor::DoctorEditor;
use crate::services::store::RosterStore;
use crate::services::sync;

/// Everything the account can see, as of the last refresh.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RosterSnapshot {
    pub doctors: Vec<Doctor>,
    pub schedules: Vec<Schedule>,
    pub specialties: Vec<ReferenceItem>,
    pub neighborhoods: Vec<ReferenceItem>,
}

impl RosterSnapshot {
    pub fn doctor(&self, doctor_id: DoctorId) -> Option<&Doctor> {
        self.doctors.iter().find(|doctor| doctor.id == doctor_id)
    }

    pub fn schedules_of(&self, doctor_id: DoctorId) -> impl Iterator<Item = &Schedule> + '_ {
        self.schedules
            .iter()
            .filter(move |schedule| schedule.doctor_id == doctor_id)
    }
}

/// Roster state of one signed-in account.
///
/// Every successful write is followed by a full [`refresh`](Self::refresh);
/// the snapshot is replaced as a whole, never patched. A failed refresh after
/// a committed doctor write is reported as [`RosterError::RefreshFailed`].
///
/// Writes are single flight per session: a write issued while another is
/// running on the same session fails with [`RosterError::SaveInProgress`]
/// instead of queueing. The HTTP handlers open one session per request, so
/// the gate does not serialize separate requests; those race at the store
/// and the last writer wins.
pub struct RosterSession {
    store: Arc<dyn RosterStore>,
    owner: User,
    snapshot: RwLock<RosterSnapshot>,
    write_gate: Mutex<()>,
}

impl RosterSession {
    pub fn new(store: Arc<dyn RosterStore>, owner: User) -> Self {
        Self {
            store,
            owner,
            snapshot: RwLock::new(RosterSnapshot::default()),
            write_gate: Mutex::new(()),
        }
    }

    /// New session with its snapshot already loaded.
    pub async fn open(store: Arc<dyn RosterStore>, owner: User) -> Result<Self, RosterError> {
        let session = Self::new(store, owner);
        session.refresh().await?;
        Ok(session)
    }

    pub fn owner(&self) -> &User {
        &self.owner
    }

    pub fn owner_id(&self) -> &str {
        &self.owner.id
    }

    pub async fn snapshot(&self) -> RosterSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Reloads the reference tables, the account's doctors and their schedules.
    pub async fn refresh(&self) -> Result<(), RosterError> {
        debug!("Refreshing roster of {}", self.owner.id);

        let (specialties, neighborhoods) = futures::try_join!(
            self.store.list_references(ReferenceKind::Specialty),
            self.store.list_references(ReferenceKind::Neighborhood),
        )?;

        let doctors = self.store.list_doctors(&self.owner.id).await?;
        let doctor_ids: Vec<DoctorId> = doctors.iter().map(|doctor| doctor.id).collect();
        let schedules = self.store.list_schedules(&doctor_ids).await?;

        debug!(
            "Loaded {} doctors, {} schedule rows, {} specialties, {} neighborhoods",
            doctors.len(),
            schedules.len(),
            specialties.len(),
            neighborhoods.len()
        );

        *self.snapshot.write().await = RosterSnapshot {
            doctors,
            schedules,
            specialties,
            neighborhoods,
        };
        Ok(())
    }

    fn begin_write(&self) -> Result<MutexGuard<'_, ()>, RosterError> {
        self.write_gate.try_lock().map_err(|_| RosterError::SaveInProgress)
    }

    pub async fn save_doctor(
        &self,
        doctor_id: Option<DoctorId>,
        fields: &DoctorFields,
        slots: &[ServiceSlot],
    ) -> Result<DoctorId, RosterError> {
        let _guard = self.begin_write()?;

        let doctor_id =
            sync::save_doctor(self.store.as_ref(), &self.owner.id, doctor_id, fields, slots).await?;
        self.refresh_after_write(doctor_id).await?;
        Ok(doctor_id)
    }

    /// Saves what the editor holds.
    pub async fn submit(&self, editor: DoctorEditor) -> Result<DoctorId, RosterError> {
        let (doctor_id, fields, slots) = editor.into_submission();
        self.save_doctor(doctor_id, &fields, &slots).await
    }

    pub async fn delete_doctor(&self, doctor_id: DoctorId) -> Result<(), RosterError> {
        let _guard = self.begin_write()?;

        sync::delete_doctor(self.store.as_ref(), &self.owner.id, doctor_id).await?;
        self.refresh_after_write(doctor_id).await
    }

    async fn refresh_after_write(&self, doctor_id: DoctorId) -> Result<(), RosterError> {
        self.refresh().await.map_err(|err| {
            warn!("Doctor {} written but roster reload failed: {}", doctor_id, err);
            RosterError::RefreshFailed {
                doctor_id,
                message: err.to_string(),
            }
        })
    }

    pub async fn add_specialty(&self, name: &str) -> Result<ReferenceItem, RosterError> {
        self.add_reference(ReferenceKind::Specialty, name).await
    }

    pub async fn add_neighborhood(&self, name: &str) -> Result<ReferenceItem, RosterError> {
        self.add_reference(ReferenceKind::Neighborhood, name).await
    }

    async fn add_reference(&self, kind: ReferenceKind, name: &str) -> Result<ReferenceItem, RosterError> {
        let _guard = self.begin_write()?;

        let item = sync::get_or_create_reference(self.store.as_ref(), kind, name).await?;
        // Get-or-create is idempotent, so a stale snapshot is only logged.
        if let Err(err) = self.refresh().await {
            warn!("{} '{}' saved but roster reload failed: {}", kind.table(), item.name, err);
        }
        info!("{} '{}' available as {}", kind.table(), item.name, item.id);
        Ok(item)
    }

    /// Editor for an existing doctor, or a blank one when `doctor_id` is `None`.
    pub async fn editor(&self, doctor_id: Option<DoctorId>) -> Result<DoctorEditor, RosterError> {
        let Some(doctor_id) = doctor_id else {
            return Ok(DoctorEditor::new());
        };

        let snapshot = self.snapshot.read().await;
        let doctor = snapshot
            .doctor(doctor_id)
            .ok_or_else(|| RosterError::NotFound(format!("Doctor {} not found", doctor_id)))?;

        Ok(DoctorEditor::hydrate(doctor, snapshot.schedules_of(doctor_id)))
    }
}
