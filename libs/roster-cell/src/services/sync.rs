//! Write path of the roster: saving and deleting doctors, and get-or-create
//! for the shared reference tables.

use tracing::{debug, info, warn};

use crate::error::{FieldErrors, RosterError};
use crate::models::{DoctorFields, DoctorId, ReferenceItem, ReferenceKind, ServiceSlot};
use crate::services::grouping::expand;
use crate::services::store::RosterStore;

/// Creates (`doctor_id == None`) or updates a doctor and makes `slots` its
/// complete schedule. Validation runs before any storage call.
pub async fn save_doctor<S>(
    store: &S,
    owner_id: &str,
    doctor_id: Option<DoctorId>,
    fields: &DoctorFields,
    slots: &[ServiceSlot],
) -> Result<DoctorId, RosterError>
where
    S: RosterStore + ?Sized,
{
    let record = fields.validate().map_err(RosterError::Validation)?;

    match doctor_id {
        None => {
            let doctor_id = store.insert_doctor(owner_id, &record).await?;
            let rows = expand(doctor_id, slots);
            debug!("Created doctor {}, inserting {} schedule rows", doctor_id, rows.len());

            if !rows.is_empty() {
                store
                    .insert_schedules(owner_id, &rows)
                    .await
                    .map_err(|err| RosterError::PartialSave {
                        doctor_id,
                        message: err.to_string(),
                    })?;
            }

            info!("Doctor {} created with {} schedule rows", doctor_id, rows.len());
            Ok(doctor_id)
        }
        Some(doctor_id) => {
            let affected = store.update_doctor(owner_id, doctor_id, &record).await?;
            if affected == 0 {
                warn!("Update of doctor {} by {} touched no rows", doctor_id, owner_id);
                return Err(RosterError::Unauthorized(format!(
                    "Doctor {} does not belong to the current account",
                    doctor_id
                )));
            }

            let rows = expand(doctor_id, slots);
            store.replace_schedules(owner_id, doctor_id, &rows).await?;

            info!("Doctor {} updated with {} schedule rows", doctor_id, rows.len());
            Ok(doctor_id)
        }
    }
}

/// Owner-scoped delete of a doctor and its schedules.
pub async fn delete_doctor<S>(store: &S, owner_id: &str, doctor_id: DoctorId) -> Result<(), RosterError>
where
    S: RosterStore + ?Sized,
{
    let affected = store.delete_doctor(owner_id, doctor_id).await?;
    if affected == 0 {
        return Err(RosterError::Unauthorized(format!(
            "Doctor {} does not belong to the current account",
            doctor_id
        )));
    }

    // No-op when the foreign key cascades.
    store.delete_schedules(owner_id, doctor_id).await?;

    info!("Doctor {} deleted", doctor_id);
    Ok(())
}

/// Returns the row named `name`, creating it when missing. A concurrent insert
/// of the same name resolves to the row that won.
pub async fn get_or_create_reference<S>(
    store: &S,
    kind: ReferenceKind,
    name: &str,
) -> Result<ReferenceItem, RosterError>
where
    S: RosterStore + ?Sized,
{
    let name = name.trim();
    if name.is_empty() {
        let mut errors = FieldErrors::new();
        errors.insert("name", "Nome obrigatório");
        return Err(RosterError::Validation(errors));
    }

    match store.insert_reference(kind, name).await {
        Ok(item) => {
            info!("Created {} '{}' ({})", kind.table(), item.name, item.id);
            Ok(item)
        }
        Err(RosterError::Duplicate(_)) => {
            debug!("{} '{}' already exists, reusing it", kind.table(), name);
            store.find_reference(kind, name).await?.ok_or_else(|| {
                RosterError::Storage(format!("{} '{}' exists but could not be read", kind.table(), name))
            })
        }
        Err(err) => Err(err),
    }
}
