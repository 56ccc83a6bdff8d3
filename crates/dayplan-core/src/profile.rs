//! Mock login and the profile record. Authentication is a stub by design:
//! picking a login method just echoes it into a stored profile, which the
//! profile view decorates with a level derived from the completion rate.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::storage::Storage;

/// Storage key holding the logged-in profile record.
pub const USER_KEY: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMethod {
    Google,
    Apple,
    Email,
    Phone,
    Guest,
}

impl LoginMethod {
    pub fn label(self) -> &'static str {
        match self {
            LoginMethod::Google => "Google",
            LoginMethod::Apple => "Apple",
            LoginMethod::Email => "Email",
            LoginMethod::Phone => "Phone",
            LoginMethod::Guest => "Guest",
        }
    }
}

impl std::str::FromStr for LoginMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(LoginMethod::Google),
            "apple" => Ok(LoginMethod::Apple),
            "email" => Ok(LoginMethod::Email),
            "phone" => Ok(LoginMethod::Phone),
            "guest" => Ok(LoginMethod::Guest),
            other => Err(anyhow::anyhow!(
                "unknown login method: {other} (expected google, apple, email, phone, or guest)"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub name: String,
    pub surname: String,
    pub email: String,
}

pub fn mock_login<S: Storage>(storage: &mut S, method: LoginMethod) -> anyhow::Result<UserProfile> {
    let profile = UserProfile {
        name: "John".to_string(),
        surname: "Doe".to_string(),
        email: format!("{}@example.com", method.label().to_ascii_lowercase()),
    };
    let raw = serde_json::to_string(&profile)?;
    storage.set(USER_KEY, &raw)?;
    Ok(profile)
}

/// The stored profile, or `None` when nobody is logged in. A malformed
/// record counts as logged out.
pub fn load_profile<S: Storage>(storage: &S) -> anyhow::Result<Option<UserProfile>> {
    let Some(raw) = storage.get(USER_KEY)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(profile) => Ok(Some(profile)),
        Err(err) => {
            warn!(error = %err, "stored profile is malformed; treating as logged out");
            Ok(None)
        }
    }
}

pub fn logout<S: Storage>(storage: &mut S) -> anyhow::Result<()> {
    storage.remove(USER_KEY)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
    Master,
}

impl Level {
    #[must_use]
    pub fn from_rate(rate: f64) -> Self {
        if rate >= 0.9 {
            Level::Master
        } else if rate >= 0.7 {
            Level::Advanced
        } else if rate >= 0.4 {
            Level::Intermediate
        } else {
            Level::Beginner
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
            Level::Master => "Master",
        }
    }
}
