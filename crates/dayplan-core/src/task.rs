use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datetime::calendar_day_serde;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    First,
    Second,
    Third,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::First => "first",
            Priority::Second => "second",
            Priority::Third => "third",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "1" => Ok(Priority::First),
            "second" | "2" => Ok(Priority::Second),
            "third" | "3" => Ok(Priority::Third),
            other => Err(anyhow::anyhow!("unknown priority: {other}")),
        }
    }
}

/// A single to-do item. Serde attributes pin the persisted JSON field names,
/// so collections exported by older builds keep loading unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,

    pub title: String,

    #[serde(with = "calendar_day_serde")]
    pub date: NaiveDate,

    #[serde(default)]
    pub completed: bool,

    #[serde(default)]
    pub priority: Option<Priority>,

    #[serde(default)]
    pub reminder: bool,

    #[serde(default, rename = "reminderDaysBefore")]
    pub reminder_days_before: Option<u8>,
}

impl Task {
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: Some(Uuid::new_v4()),
            title: title.into(),
            date,
            completed: false,
            priority: None,
            reminder: false,
            reminder_days_before: None,
        }
    }

    /// The reminder lead time, but only when a reminder was actually
    /// requested. A `reminderDaysBefore` left over from a disabled reminder
    /// is treated as unset.
    pub fn lead_days(&self) -> Option<u8> {
        if self.reminder {
            self.reminder_days_before
        } else {
            None
        }
    }
}

/// Shallow field-wise update for a stored task. `None` means "leave the
/// field alone"; there is deliberately no way to clear an already-set
/// priority through a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub reminder: Option<bool>,
    pub reminder_days_before: Option<u8>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.date.is_none()
            && self.completed.is_none()
            && self.priority.is_none()
            && self.reminder.is_none()
            && self.reminder_days_before.is_none()
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(date) = self.date {
            task.date = date;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(priority) = self.priority {
            task.priority = Some(priority);
        }
        if let Some(reminder) = self.reminder {
            task.reminder = reminder;
        }
        if let Some(days) = self.reminder_days_before {
            task.reminder_days_before = Some(days);
        }
    }
}
