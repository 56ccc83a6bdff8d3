use anyhow::{Context, anyhow};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tracing::{debug, info, instrument};

use crate::calendar::{CalendarDay, month_grid, month_label};
use crate::cli::Invocation;
use crate::datetime::{format_day, instant_to_day, parse_date_expr};
use crate::notify::{Notifier, schedule_reminder};
use crate::profile::{LoginMethod, load_profile, logout, mock_login};
use crate::render::Renderer;
use crate::storage::Storage;
use crate::store::TaskStore;
use crate::task::{Priority, Task, TaskPatch};
use crate::views::{ListFilter, aggregate_stats, due_reminders, filter_by_day, matches_filter};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add",
        "list",
        "day",
        "calendar",
        "stats",
        "reminders",
        "notifications",
        "done",
        "modify",
        "delete",
        "clear",
        "login",
        "profile",
        "logout",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, notifier, renderer, inv))]
pub fn dispatch<S, N>(
    store: &mut TaskStore<S>,
    notifier: &mut N,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()>
where
    S: Storage,
    N: Notifier,
{
    let now = Utc::now();
    let command = inv.command.as_str();

    debug!(command, args = ?inv.args, "dispatching command");

    match command {
        "add" => cmd_add(store, notifier, &inv.args, now),
        "list" => cmd_list(store, renderer, &inv.args, now),
        "day" => cmd_day(store, renderer, &inv.args, now),
        "calendar" => cmd_calendar(store, renderer, &inv.args, now),
        "stats" => cmd_stats(store, renderer),
        "reminders" => cmd_reminders(store, renderer, now),
        "notifications" => cmd_notifications(notifier, renderer, &inv.args),
        "done" => cmd_done(store, &inv.args),
        "modify" => cmd_modify(store, &inv.args, now),
        "delete" => cmd_delete(store, &inv.args),
        "clear" => cmd_clear(store),
        "login" => cmd_login(store, &inv.args),
        "profile" => cmd_profile(store, renderer),
        "logout" => cmd_logout(store),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[derive(Debug, Clone)]
enum Mod {
    Due(NaiveDate),
    Priority(Priority),
    Remind(u8),
}

fn parse_desc_and_mods(
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<(String, Vec<Mod>)> {
    let mut words = Vec::new();
    let mut mods = Vec::new();

    for arg in args {
        if let Some(one_mod) = parse_one_mod(arg, now)? {
            mods.push(one_mod);
        } else {
            words.push(arg.as_str());
        }
    }

    Ok((words.join(" ").trim().to_string(), mods))
}

fn parse_one_mod(tok: &str, now: DateTime<Utc>) -> anyhow::Result<Option<Mod>> {
    let Some((key, value)) = tok.split_once(':').or_else(|| tok.split_once('=')) else {
        return Ok(None);
    };

    match key.to_ascii_lowercase().as_str() {
        "due" | "date" => Ok(Some(Mod::Due(parse_date_expr(value, now)?))),
        "pri" | "priority" => Ok(Some(Mod::Priority(value.parse()?))),
        "remind" | "reminder" => {
            let days: u8 = value
                .parse()
                .context("reminder lead time must be a number of days")?;
            if !(1..=3).contains(&days) {
                return Err(anyhow!("reminder lead time must be 1, 2, or 3 days"));
            }
            Ok(Some(Mod::Remind(days)))
        }
        _ => Ok(None),
    }
}

#[instrument(skip(store, notifier, args, now))]
fn cmd_add<S, N>(
    store: &mut TaskStore<S>,
    notifier: &mut N,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()>
where
    S: Storage,
    N: Notifier,
{
    info!("command add");

    let (title, mods) = parse_desc_and_mods(args, now)?;
    if title.is_empty() {
        return Err(anyhow!("add requires a task title"));
    }

    let mut task = Task::new(title, instant_to_day(now));
    for one_mod in &mods {
        match one_mod {
            Mod::Due(day) => task.date = *day,
            Mod::Priority(priority) => task.priority = Some(*priority),
            Mod::Remind(days) => {
                task.reminder = true;
                task.reminder_days_before = Some(*days);
            }
        }
    }

    store.add(task.clone())?;
    let scheduled = schedule_reminder(notifier, &task, now)?;

    println!(
        "Created task \"{}\" due {}.",
        task.title,
        format_day(task.date)
    );
    if scheduled.is_some() {
        println!("Reminder scheduled.");
    }
    Ok(())
}

#[instrument(skip(store, renderer, args, now))]
fn cmd_list<S: Storage>(
    store: &mut TaskStore<S>,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command list");

    let mut filter = ListFilter::All;
    let mut priority = None;

    for arg in args {
        if let Some((key, value)) = arg.split_once(':') {
            match key.to_ascii_lowercase().as_str() {
                "pri" | "priority" => priority = Some(value.parse()?),
                _ => return Err(anyhow!("unknown list argument: {arg}")),
            }
        } else {
            filter = arg.parse()?;
        }
    }

    let tasks = store.load_all()?;
    let today = instant_to_day(now);
    let rows: Vec<(usize, &Task)> = tasks
        .iter()
        .enumerate()
        .filter(|(_, task)| matches_filter(task, filter, priority, today))
        .collect();

    if rows.is_empty() {
        println!("No matching tasks.");
        return Ok(());
    }
    renderer.print_task_table(&rows, today)
}

#[instrument(skip(store, renderer, args, now))]
fn cmd_day<S: Storage>(
    store: &mut TaskStore<S>,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command day");

    let expr = args.first().map(String::as_str).unwrap_or("today");
    let day = parse_date_expr(expr, now)?;

    let tasks = store.load_all()?;
    let rows: Vec<(usize, &Task)> = tasks
        .iter()
        .enumerate()
        .filter(|(_, task)| task.date == day)
        .collect();

    if rows.is_empty() {
        println!("No tasks for this day");
        return Ok(());
    }
    renderer.print_task_table(&rows, instant_to_day(now))
}

#[instrument(skip(store, renderer, args, now))]
fn cmd_calendar<S: Storage>(
    store: &mut TaskStore<S>,
    renderer: &mut Renderer,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command calendar");

    let today = instant_to_day(now);
    let (year, month) = match args.first() {
        Some(raw) => parse_year_month(raw)?,
        None => (today.year(), today.month()),
    };

    let grid = month_grid(year, month);
    if grid.is_empty() {
        return Err(anyhow!("invalid month: {year}-{month:02}"));
    }

    let tasks = store.load_all()?;
    let entries: Vec<(CalendarDay, usize)> = grid
        .into_iter()
        .map(|cell| {
            let count = filter_by_day(&tasks, cell.date).len();
            (cell, count)
        })
        .collect();

    renderer.print_calendar(&month_label(year, month), &entries, today)
}

fn parse_year_month(raw: &str) -> anyhow::Result<(i32, u32)> {
    let (year, month) = raw
        .split_once('-')
        .ok_or_else(|| anyhow!("expected YYYY-MM, got: {raw}"))?;
    let year: i32 = year.parse().context("invalid year")?;
    let month: u32 = month.parse().context("invalid month")?;
    if !(1..=12).contains(&month) {
        return Err(anyhow!("month must be between 01 and 12"));
    }
    Ok((year, month))
}

#[instrument(skip(store, renderer))]
fn cmd_stats<S: Storage>(
    store: &mut TaskStore<S>,
    renderer: &mut Renderer,
) -> anyhow::Result<()> {
    info!("command stats");

    let tasks = store.load_all()?;
    let stats = aggregate_stats(&tasks);
    renderer.print_stats(&stats)
}

#[instrument(skip(store, renderer, now))]
fn cmd_reminders<S: Storage>(
    store: &mut TaskStore<S>,
    renderer: &mut Renderer,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command reminders");

    let tasks = store.load_all()?;
    let notes = due_reminders(&tasks, instant_to_day(now));

    if notes.is_empty() {
        println!("No reminders due today.");
        return Ok(());
    }
    renderer.print_reminders(&notes)
}

#[instrument(skip(notifier, renderer, args))]
fn cmd_notifications<N: Notifier>(
    notifier: &mut N,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command notifications");

    match args.first().map(String::as_str) {
        Some("cancel") => {
            let id = args
                .get(1)
                .ok_or_else(|| anyhow!("notifications cancel requires an id"))?;
            notifier.cancel(id)?;
            println!("Cancelled notification {id}.");
            Ok(())
        }
        Some(other) => Err(anyhow!("unknown notifications subcommand: {other}")),
        None => {
            let scheduled = notifier.list_scheduled()?;
            if scheduled.is_empty() {
                println!("No scheduled notifications.");
                return Ok(());
            }
            renderer.print_notifications(&scheduled)
        }
    }
}

fn parse_index(args: &[String]) -> anyhow::Result<usize> {
    args.first()
        .ok_or_else(|| anyhow!("expected a task index"))?
        .parse::<usize>()
        .context("task index must be a non-negative number")
}

#[instrument(skip(store, args))]
fn cmd_done<S: Storage>(store: &mut TaskStore<S>, args: &[String]) -> anyhow::Result<()> {
    info!("command done");

    let index = parse_index(args)?;
    let completed = store.toggle_completed_at(index)?;
    println!(
        "Marked task {index} as {}.",
        if completed { "completed" } else { "pending" }
    );
    Ok(())
}

#[instrument(skip(store, args, now))]
fn cmd_modify<S: Storage>(
    store: &mut TaskStore<S>,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command modify");

    if args.is_empty() {
        return Err(anyhow!("modify requires a task index"));
    }
    let index = parse_index(args)?;
    let (title, mods) = parse_desc_and_mods(&args[1..], now)?;

    let mut patch = TaskPatch::default();
    if !title.is_empty() {
        patch.title = Some(title);
    }
    for one_mod in &mods {
        match one_mod {
            Mod::Due(day) => patch.date = Some(*day),
            Mod::Priority(priority) => patch.priority = Some(*priority),
            Mod::Remind(days) => {
                patch.reminder = Some(true);
                patch.reminder_days_before = Some(*days);
            }
        }
    }

    if patch.is_empty() {
        return Err(anyhow!("modify requires at least one change"));
    }

    store.update_at(index, &patch)?;
    println!("Modified task {index}.");
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_delete<S: Storage>(store: &mut TaskStore<S>, args: &[String]) -> anyhow::Result<()> {
    info!("command delete");

    let index = parse_index(args)?;
    let removed = store.remove_at(index)?;
    println!("Deleted task \"{}\".", removed.title);
    Ok(())
}

#[instrument(skip(store))]
fn cmd_clear<S: Storage>(store: &mut TaskStore<S>) -> anyhow::Result<()> {
    info!("command clear");

    store.clear()?;
    println!("Cleared all tasks.");
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_login<S: Storage>(store: &mut TaskStore<S>, args: &[String]) -> anyhow::Result<()> {
    info!("command login");

    let method: LoginMethod = args
        .first()
        .ok_or_else(|| anyhow!("login requires a method (google, apple, email, phone, guest)"))?
        .parse()?;

    let profile = mock_login(store.storage_mut(), method)?;
    println!(
        "Logged in as {} {} <{}>.",
        profile.name, profile.surname, profile.email
    );
    Ok(())
}

#[instrument(skip(store, renderer))]
fn cmd_profile<S: Storage>(
    store: &mut TaskStore<S>,
    renderer: &mut Renderer,
) -> anyhow::Result<()> {
    info!("command profile");

    let Some(profile) = load_profile(store.storage())? else {
        println!("Not logged in.");
        return Ok(());
    };

    let tasks = store.load_all()?;
    let stats = aggregate_stats(&tasks);
    renderer.print_profile(&profile, &stats)
}

#[instrument(skip(store))]
fn cmd_logout<S: Storage>(store: &mut TaskStore<S>) -> anyhow::Result<()> {
    info!("command logout");

    logout(store.storage_mut())?;
    println!("Logged out.");
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("usage: dayplan [options] <command> [args]");
    println!();
    println!("commands:");
    println!("  add TITLE.. [due:EXPR] [priority:P] [remind:N]   create a task");
    println!("  list [all|today|completed] [priority:P]          list tasks");
    println!("  day [EXPR]                                       tasks for one day");
    println!("  calendar [YYYY-MM]                               month overview");
    println!("  stats                                            aggregate statistics");
    println!("  reminders                                        lead-time notices due today");
    println!("  notifications [cancel ID]                        scheduled notifications");
    println!("  done INDEX                                       toggle completion");
    println!("  modify INDEX [TITLE..] [due:..] [priority:..]    update a task");
    println!("  delete INDEX                                     remove a task");
    println!("  clear                                            remove every task");
    println!("  login METHOD | profile | logout                  profile stub");
    println!("  version | help");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{expand_command_abbrev, known_command_names, parse_year_month};

    #[test]
    fn abbreviations_expand_uniquely() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("ad", &known), Some("add"));
        assert_eq!(expand_command_abbrev("cal", &known), Some("calendar"));
        assert_eq!(expand_command_abbrev("st", &known), Some("stats"));
        // "l" could be list, login, or logout.
        assert_eq!(expand_command_abbrev("l", &known), None);
        assert_eq!(expand_command_abbrev("list", &known), Some("list"));
    }

    #[test]
    fn year_month_parsing() {
        assert_eq!(parse_year_month("2024-03").expect("parse"), (2024, 3));
        assert!(parse_year_month("2024").is_err());
        assert!(parse_year_month("2024-13").is_err());
        assert!(parse_year_month("march").is_err());
    }
}
