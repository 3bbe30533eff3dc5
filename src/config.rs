use chrono::Weekday;
use serde::{Deserialize, Serialize};

fn default_users_collection() -> String {
    "users".to_string()
}

fn default_completed_collection() -> String {
    "completedTasks".to_string()
}

/// Which day a dashboard week begins on.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum WeekStart {
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            Self::Sunday => Weekday::Sun,
            Self::Monday => Weekday::Mon,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AppConfig {
    pub users_collection: String,
    pub completed_collection: String,
    pub week_start: WeekStart,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            users_collection: default_users_collection(),
            completed_collection: default_completed_collection(),
            week_start: WeekStart::Sunday,
        }
    }
}
