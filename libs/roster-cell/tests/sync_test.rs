mod support;

use std::collections::BTreeSet;
use std::sync::Arc;

use assert_matches::assert_matches;

use roster_cell::services::views::{self, AgendaFilter};
use roster_cell::{
    DayOfWeek, DoctorFields, NewSchedule, ReferenceKind, RosterError, RosterSession, ServiceSlot,
};

use support::{account, InMemoryRosterStore};

fn fields(name: &str, specialty_id: Option<i64>) -> DoctorFields {
    DoctorFields {
        name: name.to_string(),
        license_number: "CRM-SP 123456".to_string(),
        phone: "11987654321".to_string(),
        specialty_id,
        avatar_url: None,
    }
}

fn clinic_row(doctor_id: uuid::Uuid, day: DayOfWeek) -> NewSchedule {
    NewSchedule {
        doctor_id,
        place_name: "Clinic A".to_string(),
        neighborhood_id: 3,
        day_of_week: day,
        start_time: "08:00".to_string(),
        end_time: "12:00".to_string(),
    }
}

async fn session_for(store: &Arc<InMemoryRosterStore>, owner: &str) -> RosterSession {
    RosterSession::open(store.clone(), account(owner)).await.unwrap()
}

#[tokio::test]
async fn reload_and_resave_keeps_exactly_the_same_rows() {
    let store = InMemoryRosterStore::new();
    let specialty = store.seed_reference(ReferenceKind::Specialty, "Cardiologia");
    let doctor_id = store.seed_doctor("owner-1", "Dr. D", specialty.id);
    store.seed_schedule(clinic_row(doctor_id, DayOfWeek::Segunda));
    store.seed_schedule(clinic_row(doctor_id, DayOfWeek::Terca));

    let session = session_for(&store, "owner-1").await;
    let editor = session.editor(Some(doctor_id)).await.unwrap();

    assert_eq!(editor.slots().len(), 1);
    assert_eq!(
        editor.slots()[0].days_of_week,
        BTreeSet::from([DayOfWeek::Segunda, DayOfWeek::Terca])
    );

    session.submit(editor).await.unwrap();

    let rows = store.schedules_of(doctor_id);
    assert_eq!(rows.len(), 2);
    let days: BTreeSet<DayOfWeek> = rows.iter().map(|r| r.day_of_week).collect();
    assert_eq!(days, BTreeSet::from([DayOfWeek::Segunda, DayOfWeek::Terca]));
    assert!(rows.iter().all(|r| r.place_name == "Clinic A" && r.neighborhood_id == Some(3)));

    // Saving twice more never accumulates rows.
    for _ in 0..2 {
        let editor = session.editor(Some(doctor_id)).await.unwrap();
        session.submit(editor).await.unwrap();
    }
    assert_eq!(store.schedules_of(doctor_id).len(), 2);
}

#[tokio::test]
async fn saving_with_zero_slots_leaves_zero_rows() {
    let store = InMemoryRosterStore::new();
    let doctor_id = store.seed_doctor("owner-1", "Dr. D", 1);
    store.seed_schedule(clinic_row(doctor_id, DayOfWeek::Quinta));

    let session = session_for(&store, "owner-1").await;
    session
        .save_doctor(Some(doctor_id), &fields("Dr. D", Some(1)), &[])
        .await
        .unwrap();

    assert!(store.schedules_of(doctor_id).is_empty());
    assert!(session.snapshot().await.schedules.is_empty());
}

#[tokio::test]
async fn empty_name_fails_before_any_storage_call() {
    let store = InMemoryRosterStore::new();
    let session = session_for(&store, "owner-1").await;
    store.clear_calls();

    let err = session
        .save_doctor(None, &fields("", Some(1)), &[ServiceSlot::blank()])
        .await
        .unwrap_err();

    assert_matches!(err, RosterError::Validation(ref f) if f.get("name") == Some("Nome obrigatório"));
    assert!(store.calls().is_empty());
    assert_eq!(store.doctor_count(), 0);
}

#[tokio::test]
async fn adding_the_same_neighborhood_twice_returns_the_same_id() {
    let store = InMemoryRosterStore::new();
    let session = session_for(&store, "owner-1").await;
    let other = session_for(&store, "owner-2").await;

    let first = session.add_neighborhood("Centro").await.unwrap();
    let second = other.add_neighborhood("Centro").await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(store.reference_count(ReferenceKind::Neighborhood), 1);
    assert_eq!(other.snapshot().await.neighborhoods, vec![first]);
}

#[tokio::test]
async fn create_then_read_back_through_views() {
    let store = InMemoryRosterStore::new();
    let session = session_for(&store, "owner-1").await;
    let specialty = session.add_specialty("Pediatria").await.unwrap();
    let centro = session.add_neighborhood("Centro").await.unwrap();

    let slot = ServiceSlot {
        place_name: "Hospital Municipal".to_string(),
        neighborhood_id: Some(centro.id),
        days_of_week: BTreeSet::from([DayOfWeek::Quarta, DayOfWeek::Segunda]),
        start_time: "07:00".to_string(),
        end_time: "19:00".to_string(),
    };
    let doctor_id = session
        .save_doctor(None, &fields("Dra. Beatriz Alves", Some(specialty.id)), &[slot, ServiceSlot::blank()])
        .await
        .unwrap();

    assert_eq!(store.schedules_of(doctor_id).len(), 2);

    let snapshot = session.snapshot().await;
    let details = views::doctor_details(&snapshot, doctor_id).unwrap();
    assert_eq!(details.doctor.specialty_name, "Pediatria");
    assert_eq!(details.slots.len(), 1);
    assert_eq!(details.slots[0].days_label, "Seg, Qua");
    assert_eq!(details.slots[0].neighborhood_name, "Centro");

    let monday = views::agenda(
        &snapshot,
        &AgendaFilter { day: Some(DayOfWeek::Segunda), neighborhood_id: None },
    );
    assert_eq!(monday.len(), 1);
}

#[tokio::test]
async fn foreign_doctor_cannot_be_updated_or_deleted() {
    let store = InMemoryRosterStore::new();
    let doctor_id = store.seed_doctor("owner-1", "Dr. D", 1);
    store.seed_schedule(clinic_row(doctor_id, DayOfWeek::Segunda));

    let intruder = session_for(&store, "owner-2").await;

    let err = intruder
        .save_doctor(Some(doctor_id), &fields("Dr. X", Some(1)), &[])
        .await
        .unwrap_err();
    assert_matches!(err, RosterError::Unauthorized(_));

    let err = intruder.delete_doctor(doctor_id).await.unwrap_err();
    assert_matches!(err, RosterError::Unauthorized(_));

    assert_eq!(store.schedules_of(doctor_id).len(), 1);
    assert_eq!(store.doctor_count(), 1);
}

#[tokio::test]
async fn failed_insert_after_delete_is_reported_and_repaired_by_resave() {
    let store = InMemoryRosterStore::new();
    let doctor_id = store.seed_doctor("owner-1", "Dr. D", 1);
    store.seed_schedule(clinic_row(doctor_id, DayOfWeek::Segunda));

    let session = session_for(&store, "owner-1").await;
    let editor = session.editor(Some(doctor_id)).await.unwrap();

    store.fail_schedule_insert(true);
    let err = session.submit(editor.clone()).await.unwrap_err();
    assert_matches!(err, RosterError::PartialSave { doctor_id: id, .. } if id == doctor_id);
    assert!(store.schedules_of(doctor_id).is_empty());

    store.fail_schedule_insert(false);
    session.submit(editor).await.unwrap();
    assert_eq!(store.schedules_of(doctor_id).len(), 1);
}

#[tokio::test]
async fn delete_removes_doctor_and_schedules() {
    let store = InMemoryRosterStore::new();
    let doctor_id = store.seed_doctor("owner-1", "Dr. D", 1);
    store.seed_schedule(clinic_row(doctor_id, DayOfWeek::Segunda));

    let session = session_for(&store, "owner-1").await;
    session.delete_doctor(doctor_id).await.unwrap();

    assert_eq!(store.doctor_count(), 0);
    assert!(store.schedules_of(doctor_id).is_empty());
    assert!(session.snapshot().await.doctors.is_empty());
}

#[tokio::test]
async fn second_save_while_first_is_running_fails_fast() {
    let store = InMemoryRosterStore::new();
    let session = Arc::new(session_for(&store, "owner-1").await);

    let held = store.hold_writes().await;
    let running = {
        let session = session.clone();
        tokio::spawn(async move {
            session
                .save_doctor(None, &fields("Dr. Primeiro", Some(1)), &[])
                .await
        })
    };
    store.write_started().await;

    let err = session
        .save_doctor(None, &fields("Dr. Segundo", Some(1)), &[])
        .await
        .unwrap_err();
    assert_matches!(err, RosterError::SaveInProgress);

    drop(held);
    running.await.unwrap().unwrap();
    assert_eq!(store.doctor_count(), 1);
}
