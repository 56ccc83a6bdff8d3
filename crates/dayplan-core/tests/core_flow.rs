use chrono::Utc;
use dayplan_core::datetime::normalize_day;
use dayplan_core::notify::{Notifier, StoredNotifier, schedule_reminder};
use dayplan_core::profile::{LoginMethod, load_profile, mock_login};
use dayplan_core::storage::FileStorage;
use dayplan_core::store::TaskStore;
use dayplan_core::task::{Priority, Task};
use dayplan_core::views::{aggregate_stats, due_reminders};
use tempfile::tempdir;

#[test]
fn storage_roundtrip_views_and_reminders() {
    let temp = tempdir().expect("tempdir");
    let mut store = TaskStore::new(FileStorage::open(temp.path()).expect("open storage"));

    let mut submit = Task::new("Submit form", normalize_day("2024-03-10").expect("day"));
    submit.priority = Some(Priority::First);
    submit.reminder = true;
    submit.reminder_days_before = Some(2);
    store.add(submit).expect("add submit");

    let mut errands = Task::new("Errands", normalize_day("2024-02-20").expect("day"));
    errands.completed = true;
    store.add(errands).expect("add errands");

    let tasks = store.load_all().expect("load");
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].title, "Errands");
    assert_eq!(tasks[1].title, "Submit form");

    let stats = aggregate_stats(&tasks);
    assert_eq!(stats.total, 2);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.first, 1);
    assert!((stats.percentage - 0.5).abs() < 1e-9);

    let notes = due_reminders(&tasks, normalize_day("2024-03-08").expect("day"));
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].index, 1);
    assert!(notes[0].text.contains("due in 2 days"));

    // One day past the lead-time window: the notice is gone, not deferred.
    assert!(due_reminders(&tasks, normalize_day("2024-03-09").expect("day")).is_empty());
}

#[test]
fn notifier_persists_schedule_and_cancel() {
    let temp = tempdir().expect("tempdir");

    let mut task = Task::new("Renew passport", normalize_day("2099-06-01").expect("day"));
    task.reminder = true;
    task.reminder_days_before = Some(3);

    let id = {
        let mut notifier =
            StoredNotifier::new(FileStorage::open(temp.path()).expect("open notifier"));
        schedule_reminder(&mut notifier, &task, Utc::now())
            .expect("schedule")
            .expect("future trigger")
    };

    // A fresh handle over the same directory sees the scheduled entry.
    let mut notifier = StoredNotifier::new(FileStorage::open(temp.path()).expect("reopen"));
    let scheduled = notifier.list_scheduled().expect("list");
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].id, id);
    assert_eq!(scheduled[0].title, "Upcoming Task");

    notifier.cancel(&id).expect("cancel");
    assert!(notifier.list_scheduled().expect("list").is_empty());
}

#[test]
fn profile_stub_round_trips_through_storage() {
    let temp = tempdir().expect("tempdir");
    let mut storage = FileStorage::open(temp.path()).expect("open");

    assert_eq!(load_profile(&storage).expect("load"), None);

    let profile = mock_login(&mut storage, LoginMethod::Email).expect("login");
    assert_eq!(profile.email, "email@example.com");

    let reloaded = FileStorage::open(temp.path()).expect("reopen");
    assert_eq!(load_profile(&reloaded).expect("load"), Some(profile));
}
