//! Pure derived views over a loaded task collection. Nothing in here
//! mutates or fails; every function is total over any slice of tasks,
//! including the empty one.

use chrono::NaiveDate;

use crate::datetime::days_until;
use crate::task::{Priority, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListFilter {
    #[default]
    All,
    Today,
    Completed,
}

impl std::str::FromStr for ListFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(ListFilter::All),
            "today" => Ok(ListFilter::Today),
            "completed" => Ok(ListFilter::Completed),
            other => Err(anyhow::anyhow!(
                "unknown list filter: {other} (expected all, today, or completed)"
            )),
        }
    }
}

/// Does `task` pass the list screen's combined filter? The status filter
/// and the priority filter are ANDed; a task with no priority never
/// matches a specific priority.
#[must_use]
pub fn matches_filter(
    task: &Task,
    filter: ListFilter,
    priority: Option<Priority>,
    today: NaiveDate,
) -> bool {
    let match_filter = match filter {
        ListFilter::All => true,
        ListFilter::Today => task.date == today,
        ListFilter::Completed => task.completed,
    };
    let match_priority = priority.is_none_or(|p| task.priority == Some(p));
    match_filter && match_priority
}

#[must_use]
pub fn filter_tasks<'a>(
    tasks: &'a [Task],
    filter: ListFilter,
    priority: Option<Priority>,
    today: NaiveDate,
) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| matches_filter(task, filter, priority, today))
        .collect()
}

/// Tasks falling on one calendar day. Dates are typed days, so this is
/// plain equality rather than timestamp fiddling.
#[must_use]
pub fn filter_by_day<'a>(tasks: &'a [Task], day: NaiveDate) -> Vec<&'a Task> {
    tasks.iter().filter(|task| task.date == day).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub first: usize,
    pub second: usize,
    pub third: usize,
    /// Completion ratio in `[0, 1]`; zero for an empty collection.
    pub percentage: f64,
}

#[must_use]
pub fn aggregate_stats(tasks: &[Task]) -> Stats {
    let mut stats = Stats {
        total: tasks.len(),
        ..Stats::default()
    };

    for task in tasks {
        if task.completed {
            stats.completed += 1;
        }
        match task.priority {
            Some(Priority::First) => stats.first += 1,
            Some(Priority::Second) => stats.second += 1,
            Some(Priority::Third) => stats.third += 1,
            None => {}
        }
    }

    stats.pending = stats.total - stats.completed;
    stats.percentage = if stats.total == 0 {
        0.0
    } else {
        stats.completed as f64 / stats.total as f64
    };
    stats
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderNote {
    /// Position of the task in the collection the notes were derived from.
    pub index: usize,
    pub text: String,
}

/// Lead-time notices due on `today`.
///
/// A note fires only when the day gap to the due date equals the configured
/// lead exactly; opening the app a day late means the notice is gone, by
/// design there is no catch-up.
#[must_use]
pub fn due_reminders(tasks: &[Task], today: NaiveDate) -> Vec<ReminderNote> {
    let mut notes = Vec::new();

    for (index, task) in tasks.iter().enumerate() {
        let Some(lead) = task.lead_days() else {
            continue;
        };
        if days_until(today, task.date) != i64::from(lead) {
            continue;
        }

        let text = if lead == 1 {
            format!("Task \"{}\" is due tomorrow.", task.title)
        } else {
            format!("Task \"{}\" is due in {lead} days.", task.title)
        };
        notes.push(ReminderNote { index, text });
    }

    notes
}
