use crate::model::{fresh_state, ChallengeState, DayRecord, DayStatus, TaskKey, TOTAL_DAYS};
use chrono::{DateTime, Utc};

/// Why a transition left the state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ignored {
    /// Every day is finalized; only a reset is possible.
    ChallengeFinished,
    /// The photo flag is only set by storing evidence.
    EvidenceRequired,
    /// Not all six tasks are done yet.
    TasksIncomplete,
    /// The active day moved on while evidence was being stored.
    DayChanged,
}

impl Ignored {
    pub fn describe(&self) -> &'static str {
        match self {
            Ignored::ChallengeFinished => "challenge already finished",
            Ignored::EvidenceRequired => "attach evidence to check off the photo task",
            Ignored::TasksIncomplete => "all six tasks must be done first",
            Ignored::DayChanged => "the active day changed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Ignored(Ignored),
}

impl Outcome {
    pub fn applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

impl ChallengeState {
    pub fn is_finished(&self) -> bool {
        self.current_day_index >= TOTAL_DAYS
    }

    /// The record at the cursor, if it is Active.
    pub fn active_day(&self) -> Option<&DayRecord> {
        self.history
            .get(self.current_day_index)
            .filter(|d| d.status == DayStatus::Active)
    }

    fn active_day_mut(&mut self) -> Option<&mut DayRecord> {
        self.history
            .get_mut(self.current_day_index)
            .filter(|d| d.status == DayStatus::Active)
    }

    pub fn day(&self, day_number: u32) -> Option<&DayRecord> {
        let idx = (day_number as usize).checked_sub(1)?;
        self.history.get(idx)
    }

    /// Flips a task on the active day.
    ///
    /// Turning the photo flag on is refused here; see [`ChallengeState::secure_photo`].
    /// Clearing it is allowed, the caller deletes the stored evidence first.
    pub fn toggle_task(&mut self, key: TaskKey) -> Outcome {
        let Some(day) = self.active_day_mut() else {
            return Outcome::Ignored(Ignored::ChallengeFinished);
        };

        let current = day.tasks.get(key);
        if key == TaskKey::PhotoEvidence && !current {
            return Outcome::Ignored(Ignored::EvidenceRequired);
        }

        day.tasks.set(key, !current);
        Outcome::Applied
    }

    /// Marks the photo task done once evidence for `day_number` has been stored.
    pub fn secure_photo(&mut self, day_number: u32) -> Outcome {
        let Some(day) = self.active_day_mut() else {
            return Outcome::Ignored(Ignored::ChallengeFinished);
        };
        if day.day_number != day_number {
            return Outcome::Ignored(Ignored::DayChanged);
        }
        day.tasks.photo_evidence = true;
        Outcome::Applied
    }

    pub fn complete_day(&mut self, now: DateTime<Utc>) -> Outcome {
        let Some(day) = self.active_day_mut() else {
            return Outcome::Ignored(Ignored::ChallengeFinished);
        };
        if !day.tasks.all_done() {
            return Outcome::Ignored(Ignored::TasksIncomplete);
        }

        day.status = DayStatus::Completed;
        day.completed_at = Some(now);

        self.current_day_index += 1;
        if let Some(next) = self.history.get_mut(self.current_day_index) {
            next.status = DayStatus::Active;
        }
        Outcome::Applied
    }

    /// Discards everything and starts over at day 1.
    pub fn fail_and_reset(&mut self, now: DateTime<Utc>) {
        *self = fresh_state(now);
    }
}
