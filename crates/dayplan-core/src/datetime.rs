use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Duration, LocalResult, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str = "dayplan-time.toml";
const TIMEZONE_ENV_VAR: &str = "DAYPLAN_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str = "DAYPLAN_TIME_CONFIG";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
    timezone: Option<String>,
    time: Option<TimezoneSection>,
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
    timezone: Option<String>,
}

/// The timezone all "local" day arithmetic happens in: reminder triggers,
/// what "today" means, and the calendar day of a genuine instant. Resolved
/// once per process from `DAYPLAN_TIMEZONE`, then `dayplan-time.toml`, then
/// UTC.
pub fn project_timezone() -> &'static Tz {
    static PROJECT_TZ: OnceLock<Tz> = OnceLock::new();
    PROJECT_TZ.get_or_init(resolve_project_timezone)
}

fn resolve_project_timezone() -> Tz {
    if let Ok(raw) = std::env::var(TIMEZONE_ENV_VAR)
        && let Some(tz) = parse_timezone(&raw, TIMEZONE_ENV_VAR)
    {
        return tz;
    }

    if let Some(path) = timezone_config_path()
        && let Some(tz) = load_timezone_from_file(&path)
    {
        return tz;
    }

    chrono_tz::UTC
}

fn timezone_config_path() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var(TIMEZONE_CONFIG_ENV_VAR) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    std::env::current_dir()
        .ok()
        .map(|dir| dir.join(TIMEZONE_CONFIG_FILE))
}

fn load_timezone_from_file(path: &PathBuf) -> Option<Tz> {
    if !path.exists() {
        return None;
    }

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::error!(file = %path.display(), error = %err, "failed reading timezone config file");
            return None;
        }
    };

    let parsed = match toml::from_str::<TimezoneConfig>(&raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::error!(file = %path.display(), error = %err, "failed parsing timezone config file");
            return None;
        }
    };

    let timezone = parsed
        .timezone
        .or_else(|| parsed.time.and_then(|section| section.timezone));
    let Some(timezone) = timezone else {
        tracing::warn!(file = %path.display(), "timezone config had no timezone field");
        return None;
    };

    parse_timezone(timezone.as_str(), &format!("file:{}", path.display()))
}

fn parse_timezone(raw: &str, source: &str) -> Option<Tz> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    match trimmed.parse::<Tz>() {
        Ok(tz) => {
            tracing::info!(source, timezone = %trimmed, "configured project timezone");
            Some(tz)
        }
        Err(err) => {
            tracing::error!(source, timezone = %trimmed, error = %err, "failed to parse timezone id");
            None
        }
    }
}

/// Collapse any textual date representation to its calendar day.
///
/// The rule is pure truncation: everything from the first `T` on is
/// discarded and the rest must be a `YYYY-MM-DD` day. No timezone
/// conversion happens here; a stored date is the day the user picked, not
/// an instant.
pub fn normalize_day(input: &str) -> anyhow::Result<NaiveDate> {
    let trimmed = input.trim();
    let day_part = trimmed.split('T').next().unwrap_or(trimmed);
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d")
        .with_context(|| format!("not a calendar day: {input}"))
}

/// The calendar day a genuine instant falls on, in the project timezone.
/// Taking the day before converting would shift dates near midnight.
#[must_use]
pub fn instant_to_day(dt: DateTime<Utc>) -> NaiveDate {
    dt.with_timezone(project_timezone()).date_naive()
}

#[must_use]
pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Signed number of whole days from `from` until `to`. Negative when `to`
/// is in the past relative to `from`.
#[must_use]
pub fn days_until(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// A project-local wall-clock time on the given day, as a UTC instant.
pub fn local_instant(day: NaiveDate, hour: u32, minute: u32) -> anyhow::Result<DateTime<Utc>> {
    let naive = day
        .and_hms_opt(hour, minute, 0)
        .ok_or_else(|| anyhow!("invalid wall-clock time {hour:02}:{minute:02}"))?;

    match project_timezone().from_local_datetime(&naive) {
        LocalResult::Single(local) => Ok(local.with_timezone(&Utc)),
        LocalResult::Ambiguous(first, second) => {
            tracing::warn!(%first, %second, "ambiguous local time; using earliest");
            let chosen = if first <= second { first } else { second };
            Ok(chosen.with_timezone(&Utc))
        }
        LocalResult::None => Err(anyhow!(
            "local time {hour:02}:{minute:02} does not exist on {day} in the configured timezone"
        )),
    }
}

/// Parse a due-date expression from the CLI into a calendar day.
///
/// Named forms (`today`, `tomorrow`, `yesterday`, `+Nd`/`-Nd`) resolve
/// against `now` in the project timezone; anything else goes through
/// [`normalize_day`], so both plain days and full ISO instants are
/// accepted.
#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_date_expr(input: &str, now: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    let token = input.trim();
    let today = instant_to_day(now);

    match token.to_ascii_lowercase().as_str() {
        "today" => return Ok(today),
        "tomorrow" => return shift_day(today, 1),
        "yesterday" => return shift_day(today, -1),
        _ => {}
    }

    let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)d$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;
    if let Some(caps) = rel_re.captures(token) {
        let num: i64 = caps
            .name("num")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative amount"))?
            .parse()
            .context("invalid relative day count")?;
        let signed = if caps.name("sign").map(|m| m.as_str()) == Some("-") {
            -num
        } else {
            num
        };
        return shift_day(today, signed);
    }

    normalize_day(token).context(
        "supported formats: today/tomorrow/yesterday, +Nd/-Nd, YYYY-MM-DD, \
         or an ISO datetime (time part ignored)",
    )
}

fn shift_day(day: NaiveDate, delta: i64) -> anyhow::Result<NaiveDate> {
    day.checked_add_signed(Duration::days(delta))
        .ok_or_else(|| anyhow!("date arithmetic out of range: {day} {delta:+} days"))
}


pub mod calendar_day_serde {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(day: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&day.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::normalize_day(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveDate;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(day: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match day {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let opt = Option::<String>::deserialize(deserializer)?;
            match opt {
                Some(raw) => super::super::normalize_day(&raw)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}
