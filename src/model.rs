use chrono::{DateTime, Utc};

pub const TOTAL_DAYS: usize = 75;
pub const TASK_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayStatus {
    Locked,
    Active,
    Completed,
    /// Rendered when present in stored data; no transition sets it.
    Failed,
}

impl DayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayStatus::Locked => "locked",
            DayStatus::Active => "active",
            DayStatus::Completed => "completed",
            DayStatus::Failed => "failed",
        }
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self, DayStatus::Completed | DayStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKey {
    OutdoorWorkout,
    IndoorWorkout,
    Hydration,
    Reading,
    Diet,
    PhotoEvidence,
}

impl TaskKey {
    pub const ALL: [TaskKey; TASK_COUNT] = [
        TaskKey::OutdoorWorkout,
        TaskKey::IndoorWorkout,
        TaskKey::Hydration,
        TaskKey::Reading,
        TaskKey::Diet,
        TaskKey::PhotoEvidence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKey::OutdoorWorkout => "outdoor-workout",
            TaskKey::IndoorWorkout => "indoor-workout",
            TaskKey::Hydration => "hydration",
            TaskKey::Reading => "reading",
            TaskKey::Diet => "diet",
            TaskKey::PhotoEvidence => "photo",
        }
    }

    pub fn detail(&self) -> &'static str {
        match self {
            TaskKey::OutdoorWorkout => "45 min workout, outdoors",
            TaskKey::IndoorWorkout => "45 min workout",
            TaskKey::Hydration => "3.8 litres of water",
            TaskKey::Reading => "10 pages non-fiction",
            TaskKey::Diet => "clean diet, no cheat meals, no alcohol",
            TaskKey::PhotoEvidence => "progress picture",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSet {
    pub outdoor_workout: bool,
    pub indoor_workout: bool,
    pub hydration: bool,
    pub reading: bool,
    pub diet: bool,
    pub photo_evidence: bool,
}

impl TaskSet {
    pub fn get(&self, key: TaskKey) -> bool {
        match key {
            TaskKey::OutdoorWorkout => self.outdoor_workout,
            TaskKey::IndoorWorkout => self.indoor_workout,
            TaskKey::Hydration => self.hydration,
            TaskKey::Reading => self.reading,
            TaskKey::Diet => self.diet,
            TaskKey::PhotoEvidence => self.photo_evidence,
        }
    }

    pub fn set(&mut self, key: TaskKey, value: bool) {
        let slot = match key {
            TaskKey::OutdoorWorkout => &mut self.outdoor_workout,
            TaskKey::IndoorWorkout => &mut self.indoor_workout,
            TaskKey::Hydration => &mut self.hydration,
            TaskKey::Reading => &mut self.reading,
            TaskKey::Diet => &mut self.diet,
            TaskKey::PhotoEvidence => &mut self.photo_evidence,
        };
        *slot = value;
    }

    pub fn done_count(&self) -> usize {
        TaskKey::ALL.iter().filter(|k| self.get(**k)).count()
    }

    pub fn all_done(&self) -> bool {
        self.done_count() == TASK_COUNT
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    pub day_number: u32,
    pub status: DayStatus,
    pub tasks: TaskSet,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeState {
    pub current_day_index: usize,
    pub history: Vec<DayRecord>,
    pub start_date: DateTime<Utc>,
}

pub fn fresh_state(now: DateTime<Utc>) -> ChallengeState {
    let history = (0..TOTAL_DAYS)
        .map(|i| DayRecord {
            day_number: i as u32 + 1,
            status: if i == 0 {
                DayStatus::Active
            } else {
                DayStatus::Locked
            },
            tasks: TaskSet::default(),
            completed_at: None,
        })
        .collect();

    ChallengeState {
        current_day_index: 0,
        history,
        start_date: now,
    }
}

/// Rejects states that break the day-progression invariants.
pub fn validate_state_shape(state: &ChallengeState) -> Result<(), String> {
    if state.history.len() != TOTAL_DAYS {
        return Err(format!(
            "expected {} days, found {}",
            TOTAL_DAYS,
            state.history.len()
        ));
    }
    if state.current_day_index > TOTAL_DAYS {
        return Err(format!(
            "current day index {} out of range",
            state.current_day_index
        ));
    }

    for (i, day) in state.history.iter().enumerate() {
        if day.day_number as usize != i + 1 {
            return Err(format!("day {} stored at position {}", day.day_number, i + 1));
        }
        let ok = match i.cmp(&state.current_day_index) {
            std::cmp::Ordering::Less => day.status.is_finalized(),
            std::cmp::Ordering::Equal => day.status == DayStatus::Active,
            std::cmp::Ordering::Greater => day.status == DayStatus::Locked,
        };
        if !ok {
            return Err(format!(
                "day {} has status {} with current day index {}",
                day.day_number,
                day.status.as_str(),
                state.current_day_index
            ));
        }
        if day.completed_at.is_some() && day.status != DayStatus::Completed {
            return Err(format!("day {} has a completion time but is not completed", day.day_number));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T07:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn fresh_state_has_only_day_one_active() {
        let s = fresh_state(t0());
        assert_eq!(s.current_day_index, 0);
        assert_eq!(s.history.len(), TOTAL_DAYS);
        assert_eq!(s.history[0].status, DayStatus::Active);
        assert!(s.history[1..].iter().all(|d| d.status == DayStatus::Locked));
        assert!(s.history.iter().all(|d| d.tasks.done_count() == 0));
        assert!(validate_state_shape(&s).is_ok());
    }

    #[test]
    fn serialized_keys_follow_stored_format() {
        let s = fresh_state(t0());
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["currentDayIndex"], 0);
        assert_eq!(v["history"][0]["dayNumber"], 1);
        assert_eq!(v["history"][0]["status"], "ACTIVE");
        assert_eq!(v["history"][1]["status"], "LOCKED");
        assert_eq!(v["history"][0]["tasks"]["photoEvidence"], false);
        assert!(v["startDate"].as_str().unwrap().starts_with("2026-03-01T07:00:00"));
    }

    #[test]
    fn shape_validation_catches_misplaced_active_day() {
        let mut s = fresh_state(t0());
        s.history[3].status = DayStatus::Active;
        assert!(validate_state_shape(&s).is_err());

        let mut s = fresh_state(t0());
        s.history.pop();
        assert!(validate_state_shape(&s).is_err());

        let mut s = fresh_state(t0());
        s.current_day_index = TOTAL_DAYS + 1;
        assert!(validate_state_shape(&s).is_err());
    }

    #[test]
    fn task_set_counts_flags() {
        let mut t = TaskSet::default();
        t.set(TaskKey::Hydration, true);
        t.set(TaskKey::Diet, true);
        assert_eq!(t.done_count(), 2);
        assert!(!t.all_done());
        for k in TaskKey::ALL {
            t.set(k, true);
        }
        assert!(t.all_done());
    }
}
