use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, PREFER_REPRESENTATION};

use crate::error::RosterError;
use crate::models::{
    Doctor, DoctorId, DoctorRecord, DoctorRow, NewSchedule, ReferenceItem, ReferenceKind,
    Schedule, ScheduleRow,
};
use crate::services::store::{replace_in_two_steps, RosterStore};

const DOCTOR_COLUMNS: &str = "id,name,crm,phone,specialty_id,avatar_url,user_id";
const SCHEDULE_COLUMNS: &str =
    "id,doctor_id,place_name,neighborhood_id,day_of_week,start_time,end_time";
const REFERENCE_COLUMNS: &str = "id,name";

/// [`RosterStore`] backed by the Supabase REST API, acting as the signed-in
/// account so row-level security applies to every call.
pub struct SupabaseRosterStore {
    supabase: SupabaseClient,
    auth_token: String,
    replace_rpc: Option<String>,
}

impl SupabaseRosterStore {
    pub fn new(config: &AppConfig, auth_token: &str) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            auth_token: auth_token.to_string(),
            replace_rpc: config.replace_schedules_rpc.clone(),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, RosterError> {
        Ok(self
            .supabase
            .request(Method::GET, path, Some(&self.auth_token), None)
            .await?)
    }

    /// Write returning the affected rows.
    async fn write_returning(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Vec<Value>, RosterError> {
        Ok(self
            .supabase
            .request_with_headers(
                method,
                path,
                Some(&self.auth_token),
                body,
                Some(SupabaseClient::prefer(PREFER_REPRESENTATION)),
            )
            .await?)
    }

    fn owned_doctor_path(owner_id: &str, doctor_id: DoctorId) -> String {
        format!(
            "/rest/v1/doctors?id=eq.{}&user_id=eq.{}",
            doctor_id,
            urlencoding::encode(owner_id)
        )
    }

    fn doctor_body(record: &DoctorRecord) -> Value {
        json!({
            "name": record.name,
            "crm": record.license_number,
            "phone": record.phone,
            "specialty_id": record.specialty_id,
            "avatar_url": record.avatar.as_stored(),
        })
    }

    fn schedule_body(owner_id: &str, row: &NewSchedule) -> Value {
        json!({
            "doctor_id": row.doctor_id,
            "user_id": owner_id,
            "place_name": row.place_name,
            "neighborhood_id": row.neighborhood_id,
            "day_of_week": row.day_of_week,
            "start_time": row.start_time,
            "end_time": row.end_time,
        })
    }

    async fn replace_with_rpc(
        &self,
        function: &str,
        owner_id: &str,
        doctor_id: DoctorId,
        rows: &[NewSchedule],
    ) -> Result<(), RosterError> {
        debug!("Replacing schedules of doctor {} through rpc {}", doctor_id, function);

        let schedules: Vec<Value> = rows.iter().map(|row| Self::schedule_body(owner_id, row)).collect();
        let body = json!({
            "p_doctor_id": doctor_id,
            "p_owner_id": owner_id,
            "p_schedules": schedules,
        });

        self.supabase
            .execute(
                Method::POST,
                &format!("/rest/v1/rpc/{}", function),
                Some(&self.auth_token),
                Some(body),
            )
            .await?;
        Ok(())
    }
}

/// Converts storage rows to domain values, skipping the ones that do not map.
fn convert_rows<R, T>(rows: Vec<R>) -> Vec<T>
where
    T: TryFrom<R, Error = RosterError>,
{
    rows.into_iter()
        .filter_map(|row| match T::try_from(row) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Skipping row: {}", err);
                None
            }
        })
        .collect()
}

#[async_trait]
impl RosterStore for SupabaseRosterStore {
    async fn list_doctors(&self, owner_id: &str) -> Result<Vec<Doctor>, RosterError> {
        debug!("Fetching doctors of {}", owner_id);

        let path = format!(
            "/rest/v1/doctors?select={}&user_id=eq.{}&order=name.asc",
            DOCTOR_COLUMNS,
            urlencoding::encode(owner_id)
        );
        let rows: Vec<DoctorRow> = self.get(&path).await?;
        Ok(convert_rows(rows))
    }

    async fn list_schedules(&self, doctor_ids: &[DoctorId]) -> Result<Vec<Schedule>, RosterError> {
        if doctor_ids.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Fetching schedules of {} doctors", doctor_ids.len());

        let ids = doctor_ids
            .iter()
            .map(DoctorId::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let path = format!("/rest/v1/schedules?select={}&doctor_id=in.({})", SCHEDULE_COLUMNS, ids);
        let rows: Vec<ScheduleRow> = self.get(&path).await?;
        Ok(convert_rows(rows))
    }

    async fn list_references(&self, kind: ReferenceKind) -> Result<Vec<ReferenceItem>, RosterError> {
        debug!("Fetching {}", kind.table());

        let path = format!("/rest/v1/{}?select={}&order=name.asc", kind.table(), REFERENCE_COLUMNS);
        self.get(&path).await
    }

    async fn find_reference(
        &self,
        kind: ReferenceKind,
        name: &str,
    ) -> Result<Option<ReferenceItem>, RosterError> {
        let path = format!(
            "/rest/v1/{}?select={}&name=eq.{}&limit=1",
            kind.table(),
            REFERENCE_COLUMNS,
            urlencoding::encode(name)
        );
        let rows: Vec<ReferenceItem> = self.get(&path).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_reference(
        &self,
        kind: ReferenceKind,
        name: &str,
    ) -> Result<ReferenceItem, RosterError> {
        debug!("Inserting '{}' into {}", name, kind.table());

        let rows = self
            .write_returning(
                Method::POST,
                &format!("/rest/v1/{}", kind.table()),
                Some(json!({ "name": name })),
            )
            .await?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| RosterError::Storage(format!("Insert into {} returned no row", kind.table())))?;
        serde_json::from_value(row).map_err(|err| RosterError::InvalidRow {
            table: kind.table(),
            reason: err.to_string(),
        })
    }

    async fn insert_doctor(
        &self,
        owner_id: &str,
        record: &DoctorRecord,
    ) -> Result<DoctorId, RosterError> {
        debug!("Inserting doctor '{}' for {}", record.name, owner_id);

        let mut body = Self::doctor_body(record);
        body["user_id"] = json!(owner_id);

        let rows = self.write_returning(Method::POST, "/rest/v1/doctors", Some(body)).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| RosterError::Storage("Doctor insert returned no row".to_string()))?;

        let inserted: DoctorRow = serde_json::from_value(row).map_err(|err| RosterError::InvalidRow {
            table: "doctors",
            reason: err.to_string(),
        })?;
        Ok(inserted.id)
    }

    async fn update_doctor(
        &self,
        owner_id: &str,
        doctor_id: DoctorId,
        record: &DoctorRecord,
    ) -> Result<u64, RosterError> {
        debug!("Updating doctor {}", doctor_id);

        let rows = self
            .write_returning(
                Method::PATCH,
                &Self::owned_doctor_path(owner_id, doctor_id),
                Some(Self::doctor_body(record)),
            )
            .await?;
        Ok(rows.len() as u64)
    }

    async fn delete_doctor(&self, owner_id: &str, doctor_id: DoctorId) -> Result<u64, RosterError> {
        debug!("Deleting doctor {}", doctor_id);

        let rows = self
            .write_returning(Method::DELETE, &Self::owned_doctor_path(owner_id, doctor_id), None)
            .await?;
        Ok(rows.len() as u64)
    }

    async fn delete_schedules(&self, _owner_id: &str, doctor_id: DoctorId) -> Result<(), RosterError> {
        debug!("Deleting schedules of doctor {}", doctor_id);

        self.supabase
            .execute(
                Method::DELETE,
                &format!("/rest/v1/schedules?doctor_id=eq.{}", doctor_id),
                Some(&self.auth_token),
                None,
            )
            .await?;
        Ok(())
    }

    async fn insert_schedules(
        &self,
        owner_id: &str,
        rows: &[NewSchedule],
    ) -> Result<(), RosterError> {
        if rows.is_empty() {
            return Ok(());
        }
        debug!("Inserting {} schedule rows", rows.len());

        let body: Vec<Value> = rows.iter().map(|row| Self::schedule_body(owner_id, row)).collect();
        self.supabase
            .execute(
                Method::POST,
                "/rest/v1/schedules",
                Some(&self.auth_token),
                Some(Value::Array(body)),
            )
            .await?;
        Ok(())
    }

    async fn replace_schedules(
        &self,
        owner_id: &str,
        doctor_id: DoctorId,
        rows: &[NewSchedule],
    ) -> Result<(), RosterError> {
        match self.replace_rpc.as_deref() {
            Some(function) => self.replace_with_rpc(function, owner_id, doctor_id, rows).await,
            None => replace_in_two_steps(self, owner_id, doctor_id, rows).await,
        }
    }
}
