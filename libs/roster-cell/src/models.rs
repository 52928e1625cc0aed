use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FieldErrors, RosterError};

pub type DoctorId = Uuid;
pub type ReferenceId = i64;

// ==============================================================================
// DAYS OF WEEK
// ==============================================================================

/// Day on which a doctor serves at a place. Declaration order is the display
/// order (Monday first); `Domingo` only exists for ordering legacy rows and is
/// not offered as a form choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DayOfWeek {
    Segunda,
    Terca,
    Quarta,
    Quinta,
    Sexta,
    Sabado,
    Domingo,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Segunda,
        DayOfWeek::Terca,
        DayOfWeek::Quarta,
        DayOfWeek::Quinta,
        DayOfWeek::Sexta,
        DayOfWeek::Sabado,
        DayOfWeek::Domingo,
    ];

    /// The six days a schedule can be registered for.
    pub const SELECTABLE: [DayOfWeek; 6] = [
        DayOfWeek::Segunda,
        DayOfWeek::Terca,
        DayOfWeek::Quarta,
        DayOfWeek::Quinta,
        DayOfWeek::Sexta,
        DayOfWeek::Sabado,
    ];

    /// Stored value of the `day_of_week` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Segunda => "segunda",
            DayOfWeek::Terca => "terça",
            DayOfWeek::Quarta => "quarta",
            DayOfWeek::Quinta => "quinta",
            DayOfWeek::Sexta => "sexta",
            DayOfWeek::Sabado => "sábado",
            DayOfWeek::Domingo => "domingo",
        }
    }

    pub fn short_label(&self) -> &'static str {
        match self {
            DayOfWeek::Segunda => "Seg",
            DayOfWeek::Terca => "Ter",
            DayOfWeek::Quarta => "Qua",
            DayOfWeek::Quinta => "Qui",
            DayOfWeek::Sexta => "Sex",
            DayOfWeek::Sabado => "Sáb",
            DayOfWeek::Domingo => "Dom",
        }
    }

    pub fn full_label(&self) -> &'static str {
        match self {
            DayOfWeek::Segunda => "Segunda",
            DayOfWeek::Terca => "Terça",
            DayOfWeek::Quarta => "Quarta",
            DayOfWeek::Quinta => "Quinta",
            DayOfWeek::Sexta => "Sexta",
            DayOfWeek::Sabado => "Sábado",
            DayOfWeek::Domingo => "Domingo",
        }
    }

    pub fn is_selectable(&self) -> bool {
        !matches!(self, DayOfWeek::Domingo)
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "segunda" | "segunda-feira" => Ok(DayOfWeek::Segunda),
            "terça" | "terca" | "terça-feira" | "terca-feira" => Ok(DayOfWeek::Terca),
            "quarta" | "quarta-feira" => Ok(DayOfWeek::Quarta),
            "quinta" | "quinta-feira" => Ok(DayOfWeek::Quinta),
            "sexta" | "sexta-feira" => Ok(DayOfWeek::Sexta),
            "sábado" | "sabado" => Ok(DayOfWeek::Sabado),
            "domingo" => Ok(DayOfWeek::Domingo),
            other => Err(format!("unknown day of week '{}'", other)),
        }
    }
}

impl TryFrom<String> for DayOfWeek {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DayOfWeek> for String {
    fn from(day: DayOfWeek) -> Self {
        day.as_str().to_string()
    }
}

// ==============================================================================
// DOCTORS
// ==============================================================================

/// Either an uploaded image or the text shown in its place (usually initials).
/// Both live in the `avatar_url` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Avatar {
    Url(String),
    Initials(String),
}

impl Avatar {
    pub fn from_stored(value: &str) -> Self {
        let value = value.trim();
        if value.starts_with("http://") || value.starts_with("https://") {
            Avatar::Url(value.to_string())
        } else {
            Avatar::Initials(value.to_string())
        }
    }

    pub fn as_stored(&self) -> &str {
        match self {
            Avatar::Url(url) => url,
            Avatar::Initials(text) => text,
        }
    }

    pub fn initials_for(name: &str) -> Self {
        Avatar::Initials(crate::services::format::initials(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: DoctorId,
    pub name: String,
    pub license_number: String,
    pub phone: String,
    pub specialty_id: ReferenceId,
    pub avatar: Avatar,
    pub owner_id: String,
}

/// Doctor fields as entered in the form, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoctorFields {
    pub name: String,
    #[serde(alias = "crm")]
    pub license_number: String,
    pub phone: String,
    pub specialty_id: Option<ReferenceId>,
    /// Image URL; initials of the name are used when absent.
    pub avatar_url: Option<String>,
}

impl DoctorFields {
    /// Checks required fields. Runs before any storage call.
    pub fn validate(&self) -> Result<DoctorRecord, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.insert("name", "Nome obrigatório");
        }

        let specialty_id = match self.specialty_id {
            Some(id) => Some(id),
            None => {
                errors.insert("specialty", "Especialidade obrigatória");
                None
            }
        };

        match specialty_id {
            Some(specialty_id) if errors.is_empty() => {
                let avatar = self
                    .avatar_url
                    .as_deref()
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(Avatar::from_stored)
                    .unwrap_or_else(|| Avatar::initials_for(name));

                Ok(DoctorRecord {
                    name: name.to_string(),
                    license_number: self.license_number.trim().to_string(),
                    phone: self.phone.trim().to_string(),
                    specialty_id,
                    avatar,
                })
            }
            _ => Err(errors),
        }
    }
}

impl From<&Doctor> for DoctorFields {
    fn from(doctor: &Doctor) -> Self {
        DoctorFields {
            name: doctor.name.clone(),
            license_number: doctor.license_number.clone(),
            phone: doctor.phone.clone(),
            specialty_id: Some(doctor.specialty_id),
            avatar_url: match &doctor.avatar {
                Avatar::Url(url) => Some(url.clone()),
                Avatar::Initials(_) => None,
            },
        }
    }
}

/// Validated doctor fields, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoctorRecord {
    pub name: String,
    pub license_number: String,
    pub phone: String,
    pub specialty_id: ReferenceId,
    pub avatar: Avatar,
}

// ==============================================================================
// SCHEDULES
// ==============================================================================

/// Persisted schedule row: one doctor, place, day and time range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub doctor_id: DoctorId,
    pub place_name: String,
    pub neighborhood_id: Option<ReferenceId>,
    pub day_of_week: DayOfWeek,
    pub start_time: String,
    pub end_time: String,
}

/// Schedule row about to be inserted. Only rows that passed the expand filter
/// exist in this form, so the neighborhood is always present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NewSchedule {
    pub doctor_id: DoctorId,
    pub place_name: String,
    pub neighborhood_id: ReferenceId,
    pub day_of_week: DayOfWeek,
    pub start_time: String,
    pub end_time: String,
}

/// Editing form of a schedule group: one place and time range, many days.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSlot {
    pub place_name: String,
    pub neighborhood_id: Option<ReferenceId>,
    pub days_of_week: BTreeSet<DayOfWeek>,
    pub start_time: String,
    pub end_time: String,
}

impl ServiceSlot {
    pub fn blank() -> Self {
        Self::default()
    }
}

/// Identity of a slot: rows sharing it belong to the same slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SlotKey {
    pub place: String,
    pub neighborhood_id: Option<ReferenceId>,
    pub start: String,
    pub end: String,
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let neighborhood = self
            .neighborhood_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "null".to_string());
        write!(f, "{}-{}-{}-{}", self.place, neighborhood, self.start, self.end)
    }
}

// ==============================================================================
// REFERENCE TABLES
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Specialty,
    Neighborhood,
}

impl ReferenceKind {
    pub fn table(&self) -> &'static str {
        match self {
            ReferenceKind::Specialty => "specialties",
            ReferenceKind::Neighborhood => "neighborhoods",
        }
    }

    pub fn fallback_label(&self) -> &'static str {
        match self {
            ReferenceKind::Specialty => "Sem especialidade",
            ReferenceKind::Neighborhood => "Sem bairro",
        }
    }
}

/// Row of a global reference table (specialties, neighborhoods).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceItem {
    pub id: ReferenceId,
    pub name: String,
}

pub type Specialty = ReferenceItem;
pub type Neighborhood = ReferenceItem;

// ==============================================================================
// STORAGE ROWS
// ==============================================================================

/// `doctors` row as returned by the storage collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct DoctorRow {
    pub id: Uuid,
    pub name: Option<String>,
    pub crm: Option<String>,
    pub phone: Option<String>,
    pub specialty_id: Option<ReferenceId>,
    pub avatar_url: Option<String>,
    pub user_id: Option<String>,
}

impl TryFrom<DoctorRow> for Doctor {
    type Error = RosterError;

    fn try_from(row: DoctorRow) -> Result<Self, Self::Error> {
        let invalid = |reason: &str| RosterError::InvalidRow {
            table: "doctors",
            reason: format!("{} ({})", reason, row.id),
        };

        let name = row.name.clone().ok_or_else(|| invalid("missing name"))?;
        let specialty_id = row.specialty_id.ok_or_else(|| invalid("missing specialty_id"))?;
        let owner_id = row.user_id.clone().ok_or_else(|| invalid("missing user_id"))?;

        Ok(Doctor {
            id: row.id,
            name,
            license_number: row.crm.unwrap_or_default(),
            phone: row.phone.unwrap_or_default(),
            specialty_id,
            avatar: Avatar::from_stored(row.avatar_url.as_deref().unwrap_or_default()),
            owner_id,
        })
    }
}

/// `schedules` row as returned by the storage collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRow {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub place_name: Option<String>,
    pub neighborhood_id: Option<ReferenceId>,
    pub day_of_week: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl TryFrom<ScheduleRow> for Schedule {
    type Error = RosterError;

    fn try_from(row: ScheduleRow) -> Result<Self, Self::Error> {
        let day_of_week = row
            .day_of_week
            .as_deref()
            .unwrap_or_default()
            .parse::<DayOfWeek>()
            .map_err(|reason| RosterError::InvalidRow {
                table: "schedules",
                reason: format!("{} ({})", reason, row.id),
            })?;

        Ok(Schedule {
            id: row.id,
            doctor_id: row.doctor_id,
            place_name: row.place_name.unwrap_or_default(),
            neighborhood_id: row.neighborhood_id,
            day_of_week,
            start_time: row.start_time.unwrap_or_default(),
            end_time: row.end_time.unwrap_or_default(),
        })
    }
}
