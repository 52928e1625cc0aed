//! Port for the relational storage collaborator holding the roster tables.

use async_trait::async_trait;
use tracing::{debug, error};

use crate::error::RosterError;
use crate::models::{
    Doctor, DoctorId, DoctorRecord, NewSchedule, ReferenceItem, ReferenceKind, Schedule,
};

/// Row-oriented access to doctors, schedules and the reference tables.
///
/// Writes are scoped to `owner_id`; adapters pass it on so the storage side can
/// enforce ownership. Update and delete return the number of rows they touched.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// Doctors owned by the account, ordered by name.
    async fn list_doctors(&self, owner_id: &str) -> Result<Vec<Doctor>, RosterError>;

    /// Schedule rows of the given doctors.
    async fn list_schedules(&self, doctor_ids: &[DoctorId]) -> Result<Vec<Schedule>, RosterError>;

    /// Whole reference table, ordered by name.
    async fn list_references(&self, kind: ReferenceKind) -> Result<Vec<ReferenceItem>, RosterError>;

    async fn find_reference(
        &self,
        kind: ReferenceKind,
        name: &str,
    ) -> Result<Option<ReferenceItem>, RosterError>;

    /// Fails with [`RosterError::Duplicate`] when the name is taken.
    async fn insert_reference(
        &self,
        kind: ReferenceKind,
        name: &str,
    ) -> Result<ReferenceItem, RosterError>;

    async fn insert_doctor(
        &self,
        owner_id: &str,
        record: &DoctorRecord,
    ) -> Result<DoctorId, RosterError>;

    async fn update_doctor(
        &self,
        owner_id: &str,
        doctor_id: DoctorId,
        record: &DoctorRecord,
    ) -> Result<u64, RosterError>;

    async fn delete_doctor(&self, owner_id: &str, doctor_id: DoctorId) -> Result<u64, RosterError>;

    async fn delete_schedules(&self, owner_id: &str, doctor_id: DoctorId) -> Result<(), RosterError>;

    async fn insert_schedules(
        &self,
        owner_id: &str,
        rows: &[NewSchedule],
    ) -> Result<(), RosterError>;

    /// Makes `rows` the complete schedule of the doctor.
    async fn replace_schedules(
        &self,
        owner_id: &str,
        doctor_id: DoctorId,
        rows: &[NewSchedule],
    ) -> Result<(), RosterError>;
}

/// Delete followed by insert, as two separate calls. The insert only starts
/// once the delete is acknowledged. An insert failure leaves the doctor with
/// no schedules and is reported as [`RosterError::PartialSave`].
pub async fn replace_in_two_steps<S>(
    store: &S,
    owner_id: &str,
    doctor_id: DoctorId,
    rows: &[NewSchedule],
) -> Result<(), RosterError>
where
    S: RosterStore + ?Sized,
{
    debug!("Replacing schedules of doctor {} with {} rows", doctor_id, rows.len());

    store.delete_schedules(owner_id, doctor_id).await?;

    if rows.is_empty() {
        return Ok(());
    }

    store.insert_schedules(owner_id, rows).await.map_err(|err| {
        error!("Schedules of doctor {} were deleted but not re-inserted: {}", doctor_id, err);
        RosterError::PartialSave {
            doctor_id,
            message: err.to_string(),
        }
    })
}
