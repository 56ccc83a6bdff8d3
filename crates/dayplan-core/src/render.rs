use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{Local, NaiveDate};
use unicode_width::UnicodeWidthStr;

use crate::calendar::CalendarDay;
use crate::config::Config;
use crate::datetime::format_day;
use crate::notify::ScheduledNotification;
use crate::profile::{Level, UserProfile};
use crate::task::Task;
use crate::views::{ReminderNote, Stats};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    /// Task table keyed by collection position; the leading `#` column is
    /// the index the mutating commands accept.
    #[tracing::instrument(skip(self, rows, today))]
    pub fn print_task_table(
        &mut self,
        rows: &[(usize, &Task)],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "#".to_string(),
            "Done".to_string(),
            "Date".to_string(),
            "Priority".to_string(),
            "Remind".to_string(),
            "Title".to_string(),
        ];

        let mut table_rows = Vec::with_capacity(rows.len());
        for (index, task) in rows {
            let done = if task.completed {
                self.paint("x", "32")
            } else {
                String::new()
            };

            let date = format_day(task.date);
            let date = if task.date < today && !task.completed {
                self.paint(&date, "31")
            } else {
                date
            };

            let priority = task.priority.map(|p| p.label().to_string()).unwrap_or_default();
            let remind = task
                .lead_days()
                .map(|days| format!("{days}d"))
                .unwrap_or_default();

            table_rows.push(vec![
                self.paint(&index.to_string(), "33"),
                done,
                date,
                priority,
                remind,
                task.title.clone(),
            ]);
        }

        write_table(&mut out, headers, table_rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, stats))]
    pub fn print_stats(&mut self, stats: &Stats) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "total      {}", stats.total)?;
        writeln!(out, "completed  {}", stats.completed)?;
        writeln!(out, "pending    {}", stats.pending)?;
        writeln!(out, "first      {}", stats.first)?;
        writeln!(out, "second     {}", stats.second)?;
        writeln!(out, "third      {}", stats.third)?;

        let percent = format!("{}%", (stats.percentage * 100.0).round());
        writeln!(out, "success    {}", self.paint(&percent, "32"))?;
        Ok(())
    }

    #[tracing::instrument(skip(self, entries, today))]
    pub fn print_calendar(
        &mut self,
        label: &str,
        entries: &[(CalendarDay, usize)],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{label}")?;
        writeln!(out)?;

        let headers = vec![
            "Day".to_string(),
            "Weekday".to_string(),
            "Date".to_string(),
            "Tasks".to_string(),
        ];

        let mut rows = Vec::with_capacity(entries.len());
        for (cell, task_count) in entries {
            let date = format_day(cell.date);
            let date = if cell.date == today {
                self.paint(&date, "32")
            } else {
                date
            };
            let count = if *task_count == 0 {
                String::new()
            } else {
                task_count.to_string()
            };
            rows.push(vec![cell.day.to_string(), cell.weekday.clone(), date, count]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, notes))]
    pub fn print_reminders(&mut self, notes: &[ReminderNote]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        for note in notes {
            let index = self.paint(&note.index.to_string(), "33");
            writeln!(out, "{index}  {}", note.text)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, scheduled))]
    pub fn print_notifications(
        &mut self,
        scheduled: &[ScheduledNotification],
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "Id".to_string(),
            "Scheduled".to_string(),
            "Title".to_string(),
            "Body".to_string(),
        ];

        let rows = scheduled
            .iter()
            .map(|n| {
                vec![
                    n.id.clone(),
                    n.trigger
                        .with_timezone(&Local)
                        .format("%Y-%m-%d %H:%M")
                        .to_string(),
                    n.title.clone(),
                    n.body.clone(),
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, profile, stats))]
    pub fn print_profile(&mut self, profile: &UserProfile, stats: &Stats) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "name        {} {}", profile.name, profile.surname)?;
        writeln!(out, "email       {}", profile.email)?;
        writeln!(
            out,
            "level       {}",
            Level::from_rate(stats.percentage).label()
        )?;
        writeln!(
            out,
            "completion  {}%  ({} of {} tasks)",
            (stats.percentage * 100.0).round(),
            stats.completed,
            stats.total
        )?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
