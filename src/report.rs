use crate::advisory::is_struggle_day;
use crate::model::{ChallengeState, DayRecord, DayStatus, TaskKey, TaskSet, TASK_COUNT, TOTAL_DAYS};
use crate::output::Styler;

#[derive(Debug, Clone, serde::Serialize)]
pub struct TaskRow {
    pub task: &'static str,
    pub detail: &'static str,
    pub done: bool,
}

pub fn task_rows(tasks: &TaskSet) -> Vec<TaskRow> {
    TaskKey::ALL
        .iter()
        .map(|k| TaskRow {
            task: k.as_str(),
            detail: k.detail(),
            done: tasks.get(*k),
        })
        .collect()
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Status {
    pub finished: bool,
    pub day: Option<u32>,
    pub struggle_day: bool,
    pub tasks_done: usize,
    pub tasks_total: usize,
    pub tasks: Vec<TaskRow>,
    pub days_completed: usize,
    pub days_remaining: usize,
    pub start_date: String,
}

pub fn build_status(state: &ChallengeState) -> Status {
    let active = state.active_day();
    let days_completed = state
        .history
        .iter()
        .filter(|d| d.status == DayStatus::Completed)
        .count();

    Status {
        finished: state.is_finished(),
        day: active.map(|d| d.day_number),
        struggle_day: active.map(|d| is_struggle_day(d.day_number)).unwrap_or(false),
        tasks_done: active.map(|d| d.tasks.done_count()).unwrap_or(0),
        tasks_total: TASK_COUNT,
        tasks: active.map(|d| task_rows(&d.tasks)).unwrap_or_default(),
        days_completed,
        days_remaining: TOTAL_DAYS - state.current_day_index.min(TOTAL_DAYS),
        start_date: state.start_date.to_rfc3339(),
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HistoryRow {
    pub day: u32,
    pub status: &'static str,
    pub tasks_done: usize,
    pub completed_at: Option<String>,
}

pub fn history_row(day: &DayRecord) -> HistoryRow {
    HistoryRow {
        day: day.day_number,
        status: day.status.as_str(),
        tasks_done: day.tasks.done_count(),
        completed_at: day.completed_at.map(|t| t.to_rfc3339()),
    }
}

/// Every day that has been reached, oldest first.
pub fn build_history(state: &ChallengeState) -> Vec<HistoryRow> {
    state
        .history
        .iter()
        .filter(|d| d.status != DayStatus::Locked)
        .map(history_row)
        .collect()
}

const GRID_WIDTH: usize = 15;

/// 75 cells, 15 per row: `#` completed, `x` failed, `@` active, `.` locked.
pub fn render_grid(state: &ChallengeState, styler: &Styler) -> String {
    state
        .history
        .chunks(GRID_WIDTH)
        .map(|row| {
            row.iter()
                .map(|d| match d.status {
                    DayStatus::Completed => styler.green("#"),
                    DayStatus::Failed => styler.red("x"),
                    DayStatus::Active => styler.bold("@"),
                    DayStatus::Locked => styler.gray("."),
                })
                .collect::<Vec<String>>()
                .join(" ")
        })
        .collect::<Vec<String>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fresh_state;
    use chrono::{DateTime, Utc};

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T07:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn complete_days(state: &mut ChallengeState, n: usize) {
        for _ in 0..n {
            let day = state.active_day().unwrap().day_number;
            for key in TaskKey::ALL {
                if key == TaskKey::PhotoEvidence {
                    state.secure_photo(day);
                } else {
                    state.toggle_task(key);
                }
            }
            state.complete_day(t0());
        }
    }

    #[test]
    fn status_counts_progress() {
        let mut s = fresh_state(t0());
        complete_days(&mut s, 2);
        s.toggle_task(TaskKey::Reading);

        let st = build_status(&s);
        assert!(!st.finished);
        assert_eq!(st.day, Some(3));
        assert!(st.struggle_day);
        assert_eq!(st.tasks_done, 1);
        assert_eq!(st.tasks.len(), 6);
        assert!(st.tasks.iter().any(|t| t.task == "reading" && t.done));
        assert_eq!(st.days_completed, 2);
        assert_eq!(st.days_remaining, 73);
    }

    #[test]
    fn finished_status_has_no_active_day() {
        let mut s = fresh_state(t0());
        complete_days(&mut s, TOTAL_DAYS);

        let st = build_status(&s);
        assert!(st.finished);
        assert_eq!(st.day, None);
        assert!(st.tasks.is_empty());
        assert_eq!(st.days_completed, TOTAL_DAYS);
        assert_eq!(st.days_remaining, 0);
    }

    #[test]
    fn history_skips_locked_days() {
        let mut s = fresh_state(t0());
        complete_days(&mut s, 3);

        let rows = build_history(&s);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].status, "completed");
        assert_eq!(rows[0].tasks_done, 6);
        assert!(rows[0].completed_at.is_some());
        assert_eq!(rows[3].status, "active");
        assert_eq!(rows[3].completed_at, None);
    }

    #[test]
    fn grid_has_five_rows_of_fifteen() {
        let mut s = fresh_state(t0());
        complete_days(&mut s, 16);

        let grid = render_grid(&s, &Styler::new(false));
        let lines: Vec<&str> = grid.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines.iter().all(|l| l.split(' ').count() == GRID_WIDTH));
        assert!(lines[0].split(' ').all(|c| c == "#"));
        assert_eq!(lines[1].split(' ').nth(1), Some("@"));
        assert!(lines[4].split(' ').all(|c| c == "."));
    }
}
