use serde::{Deserialize, Serialize};

/// A legacy screen variant also offered a "Late" choice, but nothing ever
/// transitions into it; only these two statuses are modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Completed => "Completed",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// A locally-created task. Lives only in memory: created when the user
/// submits text for a selected day, mutated once when completed, never
/// deleted or edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub text: String,
    pub status: TaskStatus,
    /// Bucket the task belongs to; set at creation, immutable after.
    pub day_key: String,
}

impl Task {
    pub fn new(text: impl Into<String>, day_key: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: TaskStatus::Pending,
            day_key: day_key.into(),
        }
    }
}
