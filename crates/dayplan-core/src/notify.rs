use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::datetime::local_instant;
use crate::storage::Storage;
use crate::task::Task;

/// Storage key for the persisted scheduled-notification list.
pub const NOTIFICATIONS_KEY: &str = "@notifications";

/// Reminders fire at 09:00 project-local on the lead day.
const REMINDER_HOUR: u32 = 9;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledNotification {
    pub id: String,
    pub title: String,
    pub body: String,
    pub trigger: DateTime<Utc>,
}

/// The platform notification service, reduced to the three calls the core
/// needs: schedule for a future instant, cancel by identifier, list what is
/// pending.
pub trait Notifier {
    fn schedule_at(
        &mut self,
        title: &str,
        body: &str,
        when: DateTime<Utc>,
    ) -> anyhow::Result<String>;

    fn cancel(&mut self, id: &str) -> anyhow::Result<()>;

    fn list_scheduled(&self) -> anyhow::Result<Vec<ScheduledNotification>>;
}

/// Schedule the lead-time notification for a freshly created task.
///
/// Only tasks with a reminder and a lead time get one. The trigger is the
/// due date minus the lead, at 09:00 project-local; a trigger that is not
/// strictly in the future is skipped silently — there is no backlog and no
/// catch-up.
#[instrument(skip(notifier, task, now), fields(title = %task.title, date = %task.date))]
pub fn schedule_reminder<N>(
    notifier: &mut N,
    task: &Task,
    now: DateTime<Utc>,
) -> anyhow::Result<Option<String>>
where
    N: Notifier + ?Sized,
{
    let Some(lead) = task.lead_days() else {
        return Ok(None);
    };

    let trigger_day = task
        .date
        .checked_sub_signed(Duration::days(i64::from(lead)))
        .ok_or_else(|| anyhow!("reminder lead time underflows the calendar"))?;
    let trigger = local_instant(trigger_day, REMINDER_HOUR, 0)?;

    if trigger <= now {
        debug!(%trigger, "reminder trigger already passed; skipping");
        return Ok(None);
    }

    let body = format!("Don't forget: \"{}\" is due soon!", task.title);
    let id = notifier.schedule_at("Upcoming Task", &body, trigger)?;
    info!(id = %id, %trigger, "scheduled reminder");
    Ok(Some(id))
}

#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    scheduled: Vec<ScheduledNotification>,
}

impl MemoryNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Notifier for MemoryNotifier {
    fn schedule_at(
        &mut self,
        title: &str,
        body: &str,
        when: DateTime<Utc>,
    ) -> anyhow::Result<String> {
        let id = Uuid::new_v4().to_string();
        self.scheduled.push(ScheduledNotification {
            id: id.clone(),
            title: title.to_string(),
            body: body.to_string(),
            trigger: when,
        });
        Ok(id)
    }

    fn cancel(&mut self, id: &str) -> anyhow::Result<()> {
        let before = self.scheduled.len();
        self.scheduled.retain(|n| n.id != id);
        if self.scheduled.len() == before {
            return Err(anyhow!("no scheduled notification with id {id}"));
        }
        Ok(())
    }

    fn list_scheduled(&self) -> anyhow::Result<Vec<ScheduledNotification>> {
        Ok(self.scheduled.clone())
    }
}

/// Notification list persisted through the same storage capability as the
/// tasks, under [`NOTIFICATIONS_KEY`]. Stands in for the platform service
/// on the CLI, where scheduled entries survive between invocations.
#[derive(Debug)]
pub struct StoredNotifier<S: Storage> {
    storage: S,
}

impl<S: Storage> StoredNotifier<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    fn load(&self) -> anyhow::Result<Vec<ScheduledNotification>> {
        let Some(raw) = self.storage.get(NOTIFICATIONS_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(scheduled) => Ok(scheduled),
            Err(err) => {
                warn!(error = %err, "stored notification list is malformed; treating as empty");
                Ok(Vec::new())
            }
        }
    }

    fn save(&mut self, scheduled: &[ScheduledNotification]) -> anyhow::Result<()> {
        let raw = serde_json::to_string(scheduled)?;
        self.storage.set(NOTIFICATIONS_KEY, &raw)?;
        Ok(())
    }
}

impl<S: Storage> Notifier for StoredNotifier<S> {
    #[instrument(skip(self, body))]
    fn schedule_at(
        &mut self,
        title: &str,
        body: &str,
        when: DateTime<Utc>,
    ) -> anyhow::Result<String> {
        let mut scheduled = self.load()?;
        let id = Uuid::new_v4().to_string();
        scheduled.push(ScheduledNotification {
            id: id.clone(),
            title: title.to_string(),
            body: body.to_string(),
            trigger: when,
        });
        self.save(&scheduled)?;
        Ok(id)
    }

    #[instrument(skip(self))]
    fn cancel(&mut self, id: &str) -> anyhow::Result<()> {
        let mut scheduled = self.load()?;
        let before = scheduled.len();
        scheduled.retain(|n| n.id != id);
        if scheduled.len() == before {
            return Err(anyhow!("no scheduled notification with id {id}"));
        }
        self.save(&scheduled)?;
        Ok(())
    }

    fn list_scheduled(&self) -> anyhow::Result<Vec<ScheduledNotification>> {
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Timelike, Utc};

    use super::{MemoryNotifier, Notifier, schedule_reminder};
    use crate::datetime::{normalize_day, project_timezone};
    use crate::task::Task;

    #[test]
    fn schedules_future_reminder_at_nine_local() {
        let mut notifier = MemoryNotifier::new();
        let mut task = Task::new("File taxes", normalize_day("2099-04-15").expect("day"));
        task.reminder = true;
        task.reminder_days_before = Some(3);

        let id = schedule_reminder(&mut notifier, &task, Utc::now()).expect("schedule");
        assert!(id.is_some());

        let scheduled = notifier.list_scheduled().expect("list");
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].title, "Upcoming Task");
        assert_eq!(scheduled[0].body, "Don't forget: \"File taxes\" is due soon!");

        let local = scheduled[0].trigger.with_timezone(project_timezone());
        assert_eq!(local.hour(), 9);
        assert_eq!(local.minute(), 0);
        assert_eq!(local.date_naive().to_string(), "2099-04-12");
    }

    #[test]
    fn past_triggers_are_skipped() {
        let mut notifier = MemoryNotifier::new();
        let mut task = Task::new("Y2K party", normalize_day("1999-12-31").expect("day"));
        task.reminder = true;
        task.reminder_days_before = Some(1);

        let id = schedule_reminder(&mut notifier, &task, Utc::now()).expect("schedule");
        assert_eq!(id, None);
        assert!(notifier.list_scheduled().expect("list").is_empty());
    }

    #[test]
    fn tasks_without_reminder_config_schedule_nothing() {
        let mut notifier = MemoryNotifier::new();
        let task = Task::new("No reminder", normalize_day("2099-01-01").expect("day"));
        let id = schedule_reminder(&mut notifier, &task, Utc::now()).expect("schedule");
        assert_eq!(id, None);
    }

    #[test]
    fn cancel_removes_only_the_matching_entry() {
        let mut notifier = MemoryNotifier::new();
        let first = notifier
            .schedule_at("Upcoming Task", "a", Utc::now())
            .expect("schedule");
        let second = notifier
            .schedule_at("Upcoming Task", "b", Utc::now())
            .expect("schedule");

        notifier.cancel(&first).expect("cancel");
        let left = notifier.list_scheduled().expect("list");
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, second);

        assert!(notifier.cancel(&first).is_err());
    }
}
