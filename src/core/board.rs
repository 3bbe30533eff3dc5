use std::collections::BTreeMap;

use chrono::{NaiveDate, Weekday};

use super::date;
use super::task::{Task, TaskStatus};

/// The single remote write produced by a Pending -> Completed transition.
/// Completing an already-completed task yields nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionWrite {
    pub name: String,
    pub day_key: String,
}

/// Dashboard state: tasks bucketed by day key, a week cursor, and the
/// currently selected day. All entries in a bucket carry that bucket's key.
#[derive(Debug)]
pub struct TaskBoard {
    tasks: BTreeMap<String, Vec<Task>>,
    selected_day: Option<String>,
    week_cursor: NaiveDate,
    week_starts_on: Weekday,
}

impl TaskBoard {
    /// Starts on today's week with today selected.
    pub fn new(today: NaiveDate, week_starts_on: Weekday) -> Self {
        Self {
            tasks: BTreeMap::new(),
            selected_day: Some(date::day_key(today)),
            week_cursor: today,
            week_starts_on,
        }
    }

    pub fn selected_day(&self) -> Option<&str> {
        self.selected_day.as_deref()
    }

    /// No-op when the key is already selected. Never clears tasks.
    pub fn select_day(&mut self, key: &str) {
        if self.selected_day.as_deref() == Some(key) {
            return;
        }
        self.selected_day = Some(key.to_string());
    }

    /// Move the week cursor by whole weeks and drop the day selection,
    /// matching the dashboard: changing week deselects the day.
    pub fn change_week(&mut self, direction: i64) {
        self.week_cursor = date::add_weeks(self.week_cursor, direction);
        self.selected_day = None;
    }

    /// Inclusive (start, end) of the cursor week, for the header label.
    pub fn week_range(&self) -> (NaiveDate, NaiveDate) {
        date::week_range(self.week_cursor, self.week_starts_on)
    }

    /// The seven days of the cursor week, in display order.
    pub fn week_days(&self) -> Vec<NaiveDate> {
        let start = date::week_start(self.week_cursor, self.week_starts_on);
        (0..7).map(|i| date::add_days(start, i)).collect()
    }

    pub fn tasks_for(&self, key: &str) -> &[Task] {
        self.tasks.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Append a Pending task to the selected day's bucket. Silent no-op if
    /// no day is selected or the text trims to empty.
    pub fn add_task(&mut self, text: &str) {
        let Some(key) = self.selected_day.clone() else {
            return;
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        self.tasks
            .entry(key.clone())
            .or_default()
            .push(Task::new(trimmed, key));
    }

    /// Flip the task at `index` to Completed and return the one write the
    /// caller must persist. `None` when the index is out of range or the
    /// task is already Completed, so a repeated call never emits a second
    /// write.
    pub fn complete_task(&mut self, day_key: &str, index: usize) -> Option<CompletionWrite> {
        let task = self.tasks.get_mut(day_key)?.get_mut(index)?;
        if task.status.is_completed() {
            return None;
        }
        task.status = TaskStatus::Completed;
        Some(CompletionWrite {
            name: task.text.clone(),
            day_key: day_key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> TaskBoard {
        let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        TaskBoard::new(today, Weekday::Sun)
    }

    #[test]
    fn starts_with_today_selected() {
        assert_eq!(board().selected_day(), Some("2024-06-03"));
    }

    #[test]
    fn add_task_appends_pending_in_order() {
        let mut b = board();
        b.add_task("Buy milk");
        b.add_task("  Walk dog  ");
        let tasks = b.tasks_for("2024-06-03");
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].text, "Buy milk");
        assert_eq!(tasks[1].text, "Walk dog");
        assert_eq!(tasks[1].status, TaskStatus::Pending);
        assert_eq!(tasks[1].day_key, "2024-06-03");
    }

    #[test]
    fn add_task_ignores_blank_text() {
        let mut b = board();
        b.add_task("");
        b.add_task("   ");
        assert!(b.tasks_for("2024-06-03").is_empty());
    }

    #[test]
    fn add_task_ignores_when_no_day_selected() {
        let mut b = board();
        b.change_week(1);
        b.add_task("Buy milk");
        assert!(b.tasks.values().all(Vec::is_empty));
    }

    #[test]
    fn complete_task_flips_once() {
        let mut b = board();
        b.add_task("Buy milk");
        let write = b.complete_task("2024-06-03", 0);
        assert_eq!(
            write,
            Some(CompletionWrite {
                name: "Buy milk".into(),
                day_key: "2024-06-03".into(),
            })
        );
        assert!(b.tasks_for("2024-06-03")[0].status.is_completed());
        // Idempotent: second completion emits no second write.
        assert_eq!(b.complete_task("2024-06-03", 0), None);
    }

    #[test]
    fn complete_task_out_of_range_is_noop() {
        let mut b = board();
        b.add_task("Buy milk");
        assert_eq!(b.complete_task("2024-06-03", 5), None);
        assert_eq!(b.complete_task("2024-06-10", 0), None);
        assert_eq!(b.tasks_for("2024-06-03")[0].status, TaskStatus::Pending);
    }

    #[test]
    fn change_week_moves_cursor_and_clears_selection() {
        let mut b = board();
        let (start_before, _) = b.week_range();
        b.change_week(1);
        assert_eq!(b.selected_day(), None);
        let (start_after, _) = b.week_range();
        assert_eq!(start_after, date::add_days(start_before, 7));
        b.change_week(-1);
        assert_eq!(b.week_range().0, start_before);
    }

    #[test]
    fn select_day_keeps_existing_buckets() {
        let mut b = board();
        b.add_task("Buy milk");
        b.select_day("2024-06-04");
        assert_eq!(b.selected_day(), Some("2024-06-04"));
        assert_eq!(b.tasks_for("2024-06-03").len(), 1);
    }

    #[test]
    fn week_days_are_seven_from_week_start() {
        let b = board();
        let days = b.week_days();
        assert_eq!(days.len(), 7);
        assert_eq!(days[0], NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
        assert_eq!(days[6], NaiveDate::from_ymd_opt(2024, 6, 8).unwrap());
    }
}
