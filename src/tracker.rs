//! The single owner of challenge state. Every mutation goes through one of the
//! methods here, each of which holds the state lock from load to commit.

use crate::challenge::{Ignored, Outcome};
use crate::error::CliError;
use crate::evidence::EvidenceStore;
use crate::model::{ChallengeState, DayRecord, DayStatus, TaskKey, TOTAL_DAYS};
use crate::store::{read_state, StateLock};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

pub struct Tracker<E> {
    state_path: PathBuf,
    evidence: E,
}

#[derive(Debug, Clone)]
pub struct DayDetail {
    pub record: DayRecord,
    pub evidence: Option<Vec<u8>>,
}

impl<E: EvidenceStore> Tracker<E> {
    pub fn new(state_path: PathBuf, evidence: E) -> Self {
        Self {
            state_path,
            evidence,
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> Result<ChallengeState, CliError> {
        read_state(&self.state_path, now)
    }

    pub async fn toggle(
        &self,
        key: TaskKey,
        now: DateTime<Utc>,
    ) -> Result<(Outcome, ChallengeState), CliError> {
        let lock = StateLock::acquire(&self.state_path)?;
        let mut state = lock.load(now)?;

        let clearing_photo = key == TaskKey::PhotoEvidence
            && state
                .active_day()
                .map(|d| d.tasks.photo_evidence)
                .unwrap_or(false);
        if clearing_photo {
            if let Some(day) = state.active_day().map(|d| d.day_number) {
                if let Err(e) = self.evidence.delete(day).await {
                    tracing::warn!(day, error = %e, "failed to delete evidence, clearing the task anyway");
                }
            }
        }

        let outcome = state.toggle_task(key);
        if outcome.applied() {
            lock.commit(&state)?;
        }
        Ok((outcome, state))
    }

    /// Stores the blob for the active day, then checks off the photo task.
    /// A failed write leaves the task untouched and is reported.
    pub async fn attach_evidence(
        &self,
        blob: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(Outcome, ChallengeState), CliError> {
        let lock = StateLock::acquire(&self.state_path)?;
        let mut state = lock.load(now)?;

        let Some(day) = state.active_day().map(|d| d.day_number) else {
            return Ok((Outcome::Ignored(Ignored::ChallengeFinished), state));
        };

        self.evidence.put(day, blob).await.map_err(|e| {
            tracing::error!(day, error = %e, "failed to store evidence");
            CliError::evidence(format!(
                "Failed to save evidence for day {}: {}",
                day, e
            ))
        })?;

        let outcome = state.secure_photo(day);
        if outcome.applied() {
            lock.commit(&state)?;
        }
        Ok((outcome, state))
    }

    pub fn complete_day(
        &self,
        now: DateTime<Utc>,
    ) -> Result<(Outcome, ChallengeState), CliError> {
        let lock = StateLock::acquire(&self.state_path)?;
        let mut state = lock.load(now)?;

        let outcome = state.complete_day(now);
        if outcome.applied() {
            lock.commit(&state)?;
            tracing::info!(day_index = state.current_day_index, "day completed");
        }
        Ok((outcome, state))
    }

    /// Starts the challenge over and drops all stored evidence. Evidence
    /// cleanup failures are logged, the reset itself still stands.
    pub async fn fail_and_reset(&self, now: DateTime<Utc>) -> Result<ChallengeState, CliError> {
        let lock = StateLock::acquire(&self.state_path)?;
        let mut state = lock.load(now)?;
        let reached = state.current_day_index;

        state.fail_and_reset(now);
        lock.commit(&state)?;
        tracing::info!(reached_index = reached, "challenge reset");

        match self.evidence.clear().await {
            Ok(removed) => tracing::debug!(removed, "evidence cleared"),
            Err(e) => tracing::warn!(error = %e, "failed to clear evidence after reset"),
        }
        Ok(state)
    }

    /// Read-only view of a past or active day, with its evidence if the photo
    /// task is checked. Locked days are not viewable.
    pub async fn day_detail(
        &self,
        day_number: u32,
        now: DateTime<Utc>,
    ) -> Result<DayDetail, CliError> {
        if day_number == 0 || day_number as usize > TOTAL_DAYS {
            return Err(CliError::not_found(format!(
                "No such day: {} (expected 1..{})",
                day_number, TOTAL_DAYS
            )));
        }

        let state = self.snapshot(now)?;
        let record = state
            .day(day_number)
            .cloned()
            .ok_or_else(|| CliError::not_found(format!("No such day: {}", day_number)))?;
        if record.status == DayStatus::Locked {
            return Err(CliError::not_found(format!("Day {} is locked", day_number)));
        }

        let evidence = if record.tasks.photo_evidence {
            match self.evidence.get(day_number).await {
                Ok(blob) => blob,
                Err(e) => {
                    tracing::warn!(day = day_number, error = %e, "failed to load evidence");
                    None
                }
            }
        } else {
            None
        };

        Ok(DayDetail { record, evidence })
    }
}
