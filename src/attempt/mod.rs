//! In-progress test attempt, modeled as a small state machine.
//!
//! The attempt is client-local state: it is created when a student opens a
//! published test, mutated by navigation / answer / flag actions and a
//! one-second timer, and discarded once a submission lands (or the student
//! navigates away). Nothing here touches the network or the database; the
//! driver feeds in timestamps and delivers the produced [`SubmissionPayload`]
//! to the submit endpoint.
//!
//! Phases: `NotStarted -> InProgress -> Submitting -> Submitted`, with the
//! failure edge `Submitting -> InProgress` when a submit request dies on the
//! wire. The timer is never restarted on that edge.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::test::TestConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    InProgress,
    Submitting,
    Submitted,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AttemptError {
    #[error("attempt has not been started")]
    NotStarted,
    #[error("attempt is not in progress")]
    NotInProgress,
    #[error("question index {0} is out of range")]
    QuestionOutOfRange(usize),
}

/// Body of `POST /api/student/tests/submit`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub test_id: Uuid,
    /// Only questions that were actually answered appear here.
    pub answers: BTreeMap<i32, JsonValue>,
    /// Wall-clock seconds since the attempt started. Deliberately not
    /// `duration - remaining`: a backgrounded tab stops ticking but the
    /// clock keeps running.
    pub time_spent: i64,
    pub auto_submit: bool,
}

#[derive(Debug, Clone)]
pub struct Attempt {
    test_id: Uuid,
    question_count: usize,
    phase: Phase,
    nonce: u64,
    current: usize,
    answers: BTreeMap<i32, JsonValue>,
    flagged: BTreeSet<usize>,
    started_at: Option<DateTime<Utc>>,
    remaining_seconds: i64,
    auto_fired: bool,
}

impl Attempt {
    pub fn new(test_id: Uuid, config: &TestConfig) -> Self {
        Self {
            test_id,
            question_count: config.questions.len(),
            phase: Phase::NotStarted,
            nonce: rand::random(),
            current: 0,
            answers: BTreeMap::new(),
            flagged: BTreeSet::new(),
            started_at: None,
            remaining_seconds: config.duration_minutes * 60,
            auto_fired: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Identifies this attempt so a response that arrives after the attempt
    /// was torn down and recreated can be discarded.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn remaining_seconds(&self) -> i64 {
        self.remaining_seconds
    }

    pub fn current_question(&self) -> usize {
        self.current
    }

    pub fn answer_for(&self, question_id: i32) -> Option<&JsonValue> {
        self.answers.get(&question_id)
    }

    pub fn is_flagged(&self, index: usize) -> bool {
        self.flagged.contains(&index)
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.phase != Phase::NotStarted {
            return;
        }
        self.started_at = Some(now);
        self.phase = Phase::InProgress;
    }

    /// One-second timer callback. Decrements the remaining time and, on the
    /// tick that reaches zero, fires the auto-submission exactly once even
    /// if the student is mid-navigation. Later ticks are inert, including
    /// after a failed auto-submit went back to `InProgress`; retrying is the
    /// student's action from there.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<SubmissionPayload> {
        if self.phase != Phase::InProgress {
            return None;
        }
        self.remaining_seconds = (self.remaining_seconds - 1).max(0);
        if self.remaining_seconds == 0 && !self.auto_fired {
            self.auto_fired = true;
            self.phase = Phase::Submitting;
            return Some(self.payload(now, true));
        }
        None
    }

    pub fn set_answer(&mut self, question_id: i32, answer: JsonValue) -> Result<(), AttemptError> {
        self.require_in_progress()?;
        self.answers.insert(question_id, answer);
        Ok(())
    }

    pub fn clear_answer(&mut self, question_id: i32) -> Result<(), AttemptError> {
        self.require_in_progress()?;
        self.answers.remove(&question_id);
        Ok(())
    }

    pub fn toggle_flag(&mut self, index: usize) -> Result<(), AttemptError> {
        self.require_in_progress()?;
        if index >= self.question_count {
            return Err(AttemptError::QuestionOutOfRange(index));
        }
        if !self.flagged.remove(&index) {
            self.flagged.insert(index);
        }
        Ok(())
    }

    pub fn goto(&mut self, index: usize) -> Result<(), AttemptError> {
        self.require_in_progress()?;
        if index >= self.question_count {
            return Err(AttemptError::QuestionOutOfRange(index));
        }
        self.current = index;
        Ok(())
    }

    pub fn next_question(&mut self) -> Result<(), AttemptError> {
        self.require_in_progress()?;
        if self.current + 1 < self.question_count {
            self.current += 1;
        }
        Ok(())
    }

    pub fn prev_question(&mut self) -> Result<(), AttemptError> {
        self.require_in_progress()?;
        self.current = self.current.saturating_sub(1);
        Ok(())
    }

    /// Student-initiated submission. Entering `Submitting` also guards the
    /// submit control: a second call while the request is in flight is
    /// rejected.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<SubmissionPayload, AttemptError> {
        self.require_in_progress()?;
        self.phase = Phase::Submitting;
        Ok(self.payload(now, false))
    }

    /// Server accepted the submission. A stale nonce (response for a
    /// previous attempt instance) is ignored.
    pub fn submit_succeeded(&mut self, nonce: u64) {
        if nonce != self.nonce || self.phase != Phase::Submitting {
            return;
        }
        self.phase = Phase::Submitted;
    }

    /// The submit request failed in transit. The attempt returns to
    /// `InProgress` so the student can retry; remaining time continues from
    /// where it was rather than restarting.
    pub fn submit_failed(&mut self, nonce: u64) {
        if nonce != self.nonce || self.phase != Phase::Submitting {
            return;
        }
        self.phase = Phase::InProgress;
    }

    fn payload(&self, now: DateTime<Utc>, auto_submit: bool) -> SubmissionPayload {
        let started = self.started_at.unwrap_or(now);
        SubmissionPayload {
            test_id: self.test_id,
            answers: self.answers.clone(),
            time_spent: (now - started).num_seconds().max(0),
            auto_submit,
        }
    }

    fn require_in_progress(&self) -> Result<(), AttemptError> {
        match self.phase {
            Phase::InProgress => Ok(()),
            Phase::NotStarted => Err(AttemptError::NotStarted),
            _ => Err(AttemptError::NotInProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn config_with_questions(duration_minutes: i64, count: usize) -> TestConfig {
        use crate::models::question::{Question, QuestionType};
        TestConfig {
            duration_minutes,
            questions: (0..count)
                .map(|i| Question {
                    id: i as i32 + 1,
                    question_type: QuestionType::Objective,
                    prompt: format!("Q{}", i + 1),
                    marks: 1,
                    options: vec!["a".into(), "b".into()],
                    correct_answer: Some(0),
                })
                .collect(),
            ..TestConfig::default()
        }
    }

    fn started(duration_minutes: i64, count: usize) -> (Attempt, DateTime<Utc>) {
        let mut attempt = Attempt::new(Uuid::new_v4(), &config_with_questions(duration_minutes, count));
        let t0 = Utc::now();
        attempt.start(t0);
        (attempt, t0)
    }

    #[test]
    fn remaining_time_counts_down_from_duration() {
        let (mut attempt, t0) = started(2, 3);
        assert_eq!(attempt.remaining_seconds(), 120);
        for i in 1..=50 {
            attempt.tick(t0 + Duration::seconds(i));
        }
        assert_eq!(attempt.remaining_seconds(), 70);
    }

    #[test]
    fn remaining_time_never_goes_negative() {
        let (mut attempt, t0) = started(1, 1);
        for i in 1..=200 {
            attempt.tick(t0 + Duration::seconds(i));
        }
        assert_eq!(attempt.remaining_seconds(), 0);
    }

    #[test]
    fn auto_submit_fires_exactly_once_at_zero() {
        let (mut attempt, t0) = started(1, 2);
        let mut fired = Vec::new();
        for i in 1..=90 {
            if let Some(payload) = attempt.tick(t0 + Duration::seconds(i)) {
                fired.push((i, payload));
            }
            // after the auto-submit the request fails; student is back in
            // progress but the timer must not fire again
            if attempt.phase() == Phase::Submitting {
                let nonce = attempt.nonce();
                attempt.submit_failed(nonce);
            }
        }
        assert_eq!(fired.len(), 1);
        let (at, payload) = &fired[0];
        assert_eq!(*at, 60);
        assert!(payload.auto_submit);
    }

    #[test]
    fn answers_persist_across_navigation() {
        let (mut attempt, _) = started(10, 4);
        attempt.set_answer(2, json!(1)).unwrap();
        attempt.goto(3).unwrap();
        attempt.prev_question().unwrap();
        attempt.goto(1).unwrap();
        assert_eq!(attempt.answer_for(2), Some(&json!(1)));
    }

    #[test]
    fn flags_toggle_and_survive_navigation() {
        let (mut attempt, _) = started(10, 4);
        attempt.toggle_flag(2).unwrap();
        attempt.goto(3).unwrap();
        assert!(attempt.is_flagged(2));
        attempt.toggle_flag(2).unwrap();
        assert!(!attempt.is_flagged(2));
        assert_eq!(
            attempt.toggle_flag(9),
            Err(AttemptError::QuestionOutOfRange(9))
        );
    }

    #[test]
    fn payload_contains_only_answered_questions_and_wall_clock_time() {
        let (mut attempt, t0) = started(30, 10);
        for q in 1..=6 {
            attempt.set_answer(q, json!(q % 3)).unwrap();
        }
        // only a handful of ticks arrived (tab was backgrounded) but ten
        // minutes of wall clock passed
        for i in 1..=5 {
            attempt.tick(t0 + Duration::seconds(i));
        }
        let payload = attempt.submit(t0 + Duration::seconds(600)).unwrap();
        assert_eq!(payload.answers.len(), 6);
        assert_eq!(payload.time_spent, 600);
        assert!(!payload.auto_submit);
    }

    #[test]
    fn double_submit_is_rejected_while_in_flight() {
        let (mut attempt, t0) = started(5, 2);
        attempt.submit(t0 + Duration::seconds(10)).unwrap();
        assert_eq!(
            attempt.submit(t0 + Duration::seconds(11)),
            Err(AttemptError::NotInProgress)
        );
        assert_eq!(
            attempt.set_answer(1, json!(0)),
            Err(AttemptError::NotInProgress)
        );
    }

    #[test]
    fn failed_submit_returns_to_in_progress_without_resetting_timer() {
        let (mut attempt, t0) = started(5, 2);
        for i in 1..=30 {
            attempt.tick(t0 + Duration::seconds(i));
        }
        let remaining = attempt.remaining_seconds();
        attempt.submit(t0 + Duration::seconds(30)).unwrap();
        let nonce = attempt.nonce();
        attempt.submit_failed(nonce);
        assert_eq!(attempt.phase(), Phase::InProgress);
        assert_eq!(attempt.remaining_seconds(), remaining);
        // retry succeeds
        attempt.submit(t0 + Duration::seconds(40)).unwrap();
        attempt.submit_succeeded(nonce);
        assert_eq!(attempt.phase(), Phase::Submitted);
    }

    #[test]
    fn stale_responses_are_ignored() {
        let (mut attempt, t0) = started(5, 2);
        attempt.submit(t0).unwrap();
        attempt.submit_succeeded(12345);
        assert_eq!(attempt.phase(), Phase::Submitting);
        attempt.submit_failed(54321);
        assert_eq!(attempt.phase(), Phase::Submitting);
    }

    #[test]
    fn submission_payload_uses_camel_case_wire_names() {
        let (mut attempt, t0) = started(5, 2);
        attempt.set_answer(1, json!(0)).unwrap();
        let payload = attempt.submit(t0 + Duration::seconds(7)).unwrap();
        let v = serde_json::to_value(&payload).unwrap();
        assert!(v.get("testId").is_some());
        assert_eq!(v["timeSpent"], json!(7));
        assert_eq!(v["autoSubmit"], json!(false));
        assert!(v["answers"].get("1").is_some());
    }
}
