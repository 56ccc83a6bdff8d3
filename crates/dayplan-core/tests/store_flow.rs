use chrono::NaiveDate;
use dayplan_core::storage::{FileStorage, MemoryStorage, Storage};
use dayplan_core::store::{StoreError, TASKS_KEY, TaskStore};
use dayplan_core::task::{Priority, Task, TaskPatch};
use tempfile::tempdir;

fn day(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").expect("valid day")
}

/// Three tasks from two calendar days: two sharing `2024-03-01` (priorities
/// first and second, created in that order) and one earlier, unprioritized.
fn seeded_store() -> TaskStore<MemoryStorage> {
    let mut store = TaskStore::new(MemoryStorage::new());

    let mut report = Task::new("Write report", day("2024-03-01"));
    report.priority = Some(Priority::First);
    store.add(report).expect("add report");

    let mut review = Task::new("Review notes", day("2024-03-01"));
    review.priority = Some(Priority::Second);
    store.add(review).expect("add review");

    store
        .add(Task::new("Dentist", day("2024-02-15")))
        .expect("add dentist");

    store
}

#[test]
fn load_all_sorts_by_date_and_keeps_insertion_order_for_ties() {
    let store = seeded_store();
    let tasks = store.load_all().expect("load");

    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[0].title, "Dentist");
    assert_eq!(tasks[1].title, "Write report");
    assert_eq!(tasks[2].title, "Review notes");
}

#[test]
fn empty_store_loads_as_empty() {
    let store = TaskStore::new(MemoryStorage::new());
    assert!(store.load_all().expect("load").is_empty());
}

#[test]
fn delete_middle_preserves_the_rest_in_order() {
    let mut store = seeded_store();
    let removed = store.remove_at(1).expect("remove");
    assert_eq!(removed.title, "Write report");

    let tasks = store.load_all().expect("load");
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].title, "Dentist");
    assert_eq!(tasks[1].title, "Review notes");
}

#[test]
fn toggle_twice_restores_the_original_state() {
    let mut store = seeded_store();
    let before = store.load_all().expect("load");

    assert!(store.toggle_completed_at(2).expect("first toggle"));
    let flipped = store.load_all().expect("load");
    assert!(flipped[2].completed);

    assert!(!store.toggle_completed_at(2).expect("second toggle"));
    let after = store.load_all().expect("load");
    assert_eq!(before, after);
}

#[test]
fn all_index_mutators_reject_out_of_bounds() {
    let mut store = seeded_store();

    let err = store.toggle_completed_at(3).expect_err("toggle oob");
    assert!(matches!(err, StoreError::OutOfBounds { index: 3, len: 3 }));

    let err = store.remove_at(17).expect_err("remove oob");
    assert!(matches!(err, StoreError::OutOfBounds { index: 17, len: 3 }));

    let patch = TaskPatch {
        completed: Some(true),
        ..TaskPatch::default()
    };
    let err = store.update_at(3, &patch).expect_err("update oob");
    assert!(matches!(err, StoreError::OutOfBounds { index: 3, len: 3 }));

    // Nothing was persisted by the failed attempts.
    assert_eq!(store.load_all().expect("load").len(), 3);
}

#[test]
fn update_merges_only_the_given_fields() {
    let mut store = seeded_store();

    let patch = TaskPatch {
        date: Some(day("2024-03-05")),
        ..TaskPatch::default()
    };
    store.update_at(0, &patch).expect("update");

    let tasks = store.load_all().expect("load");
    // The dentist task re-sorted past the two March 1st tasks.
    assert_eq!(tasks[2].title, "Dentist");
    assert_eq!(tasks[2].date, day("2024-03-05"));
    assert!(tasks[2].priority.is_none());
    assert!(!tasks[2].completed);
    assert_eq!(tasks[0].title, "Write report");
    assert_eq!(tasks[1].title, "Review notes");
}

#[test]
fn malformed_stored_payload_reads_as_empty() {
    let mut store = seeded_store();
    store
        .storage_mut()
        .set(TASKS_KEY, "{definitely not json")
        .expect("corrupt");

    assert!(store.load_all().expect("load").is_empty());

    // The store keeps working; the next write replaces the bad payload.
    store
        .add(Task::new("Fresh start", day("2024-04-01")))
        .expect("add");
    assert_eq!(store.load_all().expect("load").len(), 1);
}

#[test]
fn clear_drops_the_whole_collection() {
    let mut store = seeded_store();
    store.clear().expect("clear");
    assert!(store.load_all().expect("load").is_empty());
}

#[test]
fn id_addressed_mutators_agree_with_index_addressing() {
    let mut store = seeded_store();
    let tasks = store.load_all().expect("load");
    let review_id = tasks[2].id.expect("task id");

    assert!(store.toggle_completed_by_id(review_id).expect("toggle"));
    let tasks = store.load_all().expect("load");
    assert!(tasks[2].completed);

    let removed = store.remove_by_id(review_id).expect("remove");
    assert_eq!(removed.title, "Review notes");

    let err = store.remove_by_id(review_id).expect_err("gone");
    assert!(matches!(err, StoreError::UnknownId(id) if id == review_id));
}

#[test]
fn file_storage_persists_across_store_instances() {
    let temp = tempdir().expect("tempdir");

    {
        let mut store = TaskStore::new(FileStorage::open(temp.path()).expect("open"));
        let mut task = Task::new("Persisted", day("2024-03-10"));
        task.reminder = true;
        task.reminder_days_before = Some(2);
        store.add(task).expect("add");
    }

    let store = TaskStore::new(FileStorage::open(temp.path()).expect("reopen"));
    let tasks = store.load_all().expect("load");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Persisted");
    assert_eq!(tasks[0].lead_days(), Some(2));
}
