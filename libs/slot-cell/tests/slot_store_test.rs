// libs/slot-cell/tests/slot_store_test.rs

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use futures::future::join_all;

use shared_database::MemoryStore;
use shared_utils::test_utils::FlakyStore;
use slot_cell::models::{NewSlot, SlotStatus, SLOTS_TABLE};
use slot_cell::services::SlotStore;

fn new_slot(doctor_id: i64, date: NaiveDate, h: u32, m: u32) -> NewSlot {
    NewSlot {
        schedule_id: 1,
        doctor_id,
        clinic_id: 1,
        slot_time: NaiveTime::from_hms_opt(h, m, 0).unwrap(),
        slot_duration: 15,
        slot_date: date,
        fee: 500,
        status: SlotStatus::Available,
    }
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
}

#[tokio::test]
async fn test_insert_batch_assigns_ids_in_order() {
    let slots = SlotStore::new(Arc::new(MemoryStore::new()));

    let report = slots.insert_batch(vec![
        new_slot(3, date(20), 16, 0),
        new_slot(3, date(20), 16, 15),
    ]).await;

    assert_eq!(report.inserted_count(), 2);
    assert_eq!(report.failed, 0);
    assert!(!report.is_partial());
    assert!(report.inserted[0].id < report.inserted[1].id);
}

#[tokio::test]
async fn test_insert_batch_counts_failures_without_rollback() {
    let store = Arc::new(FlakyStore::new());
    store.fail_inserts_after(SLOTS_TABLE, 2);
    let slots = SlotStore::new(store.clone());

    let report = slots.insert_batch((0..4).map(|i| new_slot(3, date(20), 9, i * 15)).collect()).await;

    assert_eq!(report.inserted_count(), 2);
    assert_eq!(report.failed, 2);
    assert_eq!(report.requested(), 4);
    assert!(report.is_partial());
    assert_eq!(store.inner().row_count(SLOTS_TABLE).await, 2);
}

#[tokio::test]
async fn test_update_status_reports_missing_slot() {
    let slots = SlotStore::new(Arc::new(MemoryStore::new()));
    assert!(!slots.update_status(99, SlotStatus::Booked).await.unwrap());
}

#[tokio::test]
async fn test_transition_requires_expected_status() {
    let slots = SlotStore::new(Arc::new(MemoryStore::new()));
    let id = slots.insert_batch(vec![new_slot(3, date(20), 16, 0)]).await.inserted[0].id;

    assert!(slots.transition(id, SlotStatus::Available, SlotStatus::Booked).await.unwrap());
    assert!(!slots.transition(id, SlotStatus::Available, SlotStatus::Booked).await.unwrap());
    assert_eq!(slots.get(id).await.unwrap().unwrap().status, SlotStatus::Booked);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transitions_have_a_single_winner() {
    for _ in 0..25 {
        let slots = SlotStore::new(Arc::new(MemoryStore::new()));
        let id = slots.insert_batch(vec![new_slot(3, date(20), 16, 0)]).await.inserted[0].id;

        let attempts = (0..16).map(|_| {
            let slots = slots.clone();
            tokio::spawn(async move {
                slots.transition(id, SlotStatus::Available, SlotStatus::Booked).await.unwrap()
            })
        });
        let winners = join_all(attempts).await
            .into_iter()
            .filter(|won| *won.as_ref().unwrap())
            .count();

        assert_eq!(winners, 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_read_then_transition_has_a_single_winner() {
    const CALLERS: usize = 8;

    for round in 0..25 {
        let store = Arc::new(FlakyStore::new());
        let slots = SlotStore::new(store.clone());
        let id = slots.insert_batch(vec![new_slot(3, date(20), 16, 0)]).await.inserted[0].id;
        store.gate_selects(SLOTS_TABLE, CALLERS);

        let attempts = (0..CALLERS).map(|_| {
            let slots = slots.clone();
            tokio::spawn(async move {
                let seen = slots.get(id).await.unwrap().unwrap().status;
                let won = slots.transition(id, SlotStatus::Available, SlotStatus::Booked).await.unwrap();
                (seen, won)
            })
        });
        let outcomes: Vec<_> = join_all(attempts).await.into_iter().map(|r| r.unwrap()).collect();

        assert!(outcomes.iter().all(|(seen, _)| *seen == SlotStatus::Available), "round {}", round);
        assert_eq!(outcomes.iter().filter(|(_, won)| *won).count(), 1, "round {}", round);
    }
}

#[tokio::test]
async fn test_reads_by_doctor_and_open_status() {
    let slots = SlotStore::new(Arc::new(MemoryStore::new()));
    let report = slots.insert_batch(vec![
        new_slot(3, date(21), 9, 0),
        new_slot(3, date(20), 10, 0),
        new_slot(3, date(20), 9, 0),
        new_slot(4, date(20), 9, 0),
    ]).await;
    let ids: Vec<i64> = report.inserted.iter().map(|s| s.id).collect();

    slots.update_status(ids[0], SlotStatus::Booked).await.unwrap();
    slots.update_status(ids[1], SlotStatus::Cancelled).await.unwrap();

    let doctor_three = slots.list_by_doctor(3).await.unwrap();
    assert_eq!(doctor_three.len(), 3);
    assert_eq!(doctor_three[0].slot_date, date(20));
    assert_eq!(doctor_three[0].slot_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    assert_eq!(doctor_three[2].slot_date, date(21));

    let open = slots.list_open().await.unwrap();
    assert_eq!(open.len(), 3);
    assert!(open.iter().all(|s| s.status != SlotStatus::Booked));

    assert_eq!(slots.list_all().await.unwrap().len(), 4);
    assert!(slots.get(999).await.unwrap().is_none());
}
