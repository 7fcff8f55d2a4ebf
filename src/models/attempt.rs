use crate::error::{Error, Result};
use crate::models::question::Question;
use crate::models::quiz::Quiz;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Lifecycle of one quiz attempt. `Ready` means the snapshot is loaded but
/// the countdown has not started; `Submitting` covers the window where the
/// result insert is in flight; `Completed`, `Expired`, `Failed` and
/// `Abandoned` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPhase {
    Ready,
    InProgress,
    Submitting,
    Completed,
    Expired,
    Failed,
    Abandoned,
}

impl AttemptPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptPhase::Ready => "ready",
            AttemptPhase::InProgress => "in_progress",
            AttemptPhase::Submitting => "submitting",
            AttemptPhase::Completed => "completed",
            AttemptPhase::Expired => "expired",
            AttemptPhase::Failed => "failed",
            AttemptPhase::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptPhase::Completed
                | AttemptPhase::Expired
                | AttemptPhase::Failed
                | AttemptPhase::Abandoned
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    Timeout,
}

/// Outcome of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still counting; carries the new remaining seconds.
    Counting(u32),
    /// Hit zero on this tick; the caller must drive the submission path.
    TimedOut,
    /// The attempt left `InProgress`; the countdown task must exit.
    Stopped,
}

/// Question as frozen into the attempt at creation time. Later edits to the
/// quiz do not reach a running attempt.
#[derive(Debug, Clone)]
pub struct SnapshotQuestion {
    pub id: Uuid,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub points: i32,
    pub question_type: String,
}

impl SnapshotQuestion {
    fn from_question(q: &Question) -> Self {
        Self {
            id: q.id,
            question_text: q.question_text.clone(),
            options: q.options_vec(),
            correct_answer: q.correct_answer.clone(),
            points: q.points,
            question_type: q.question_type.clone(),
        }
    }
}

/// In-memory state of one user taking one quiz. All transitions are
/// synchronous and infallible with respect to I/O; persistence happens
/// outside, between `begin_submit` and `complete_submit`/`fail_submit`.
#[derive(Debug)]
pub struct QuizAttempt {
    pub user_id: Uuid,
    pub quiz_id: Uuid,
    pub quiz_title: String,
    questions: Vec<SnapshotQuestion>,
    current_index: usize,
    answers: HashMap<Uuid, String>,
    remaining_seconds: u32,
    deadline: Option<DateTime<Utc>>,
    phase: AttemptPhase,
    timed_out: bool,
    failed_retry_used: bool,
    pub created_at: DateTime<Utc>,
    last_transition_at: DateTime<Utc>,
}

impl QuizAttempt {
    pub fn new(user_id: Uuid, quiz: &Quiz, questions: &[Question]) -> Self {
        let snapshot: Vec<SnapshotQuestion> =
            questions.iter().map(SnapshotQuestion::from_question).collect();
        let now = Utc::now();
        Self {
            user_id,
            quiz_id: quiz.id,
            quiz_title: quiz.title.clone(),
            questions: snapshot,
            current_index: 0,
            answers: HashMap::new(),
            remaining_seconds: (quiz.time_limit_minutes as u32) * 60,
            deadline: None,
            phase: AttemptPhase::Ready,
            timed_out: false,
            failed_retry_used: false,
            created_at: now,
            last_transition_at: now,
        }
    }

    pub fn phase(&self) -> AttemptPhase {
        self.phase
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn questions(&self) -> &[SnapshotQuestion] {
        &self.questions
    }

    pub fn current_question(&self) -> &SnapshotQuestion {
        &self.questions[self.current_index]
    }

    pub fn was_timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn last_transition_at(&self) -> DateTime<Utc> {
        self.last_transition_at
    }

    fn set_phase(&mut self, phase: AttemptPhase) {
        self.phase = phase;
        self.last_transition_at = Utc::now();
    }

    /// Starts the countdown. Valid only once, from `Ready`.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.phase != AttemptPhase::Ready {
            return Err(Error::InvalidState(format!(
                "Cannot start a session in the '{}' phase",
                self.phase.as_str()
            )));
        }
        self.deadline = Some(now + Duration::seconds(self.remaining_seconds as i64));
        self.set_phase(AttemptPhase::InProgress);
        Ok(())
    }

    /// Records an answer for a snapshot question. A second answer for the
    /// same question replaces the first.
    pub fn select_answer(&mut self, question_id: Uuid, answer: String) -> Result<()> {
        self.require_in_progress("answer")?;
        if !self.questions.iter().any(|q| q.id == question_id) {
            return Err(Error::BadRequest(
                "Question does not belong to this quiz session".to_string(),
            ));
        }
        self.answers.insert(question_id, answer);
        Ok(())
    }

    pub fn advance(&mut self) -> Result<()> {
        self.require_in_progress("advance")?;
        if self.current_index + 1 >= self.questions.len() {
            return Err(Error::InvalidState(
                "Already at the last question".to_string(),
            ));
        }
        self.current_index += 1;
        Ok(())
    }

    pub fn retreat(&mut self) -> Result<()> {
        self.require_in_progress("go back")?;
        if self.current_index == 0 {
            return Err(Error::InvalidState(
                "Already at the first question".to_string(),
            ));
        }
        self.current_index -= 1;
        Ok(())
    }

    /// One second elapsed. Only meaningful while `InProgress`; the countdown
    /// task exits on `Stopped` and drives submission on `TimedOut`.
    pub fn tick(&mut self) -> Tick {
        if self.phase != AttemptPhase::InProgress {
            return Tick::Stopped;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            Tick::TimedOut
        } else {
            Tick::Counting(self.remaining_seconds)
        }
    }

    /// Wall-clock backstop. The countdown task owns the normal expiry path;
    /// this only catches a lost timer, hence the slack beyond the deadline.
    pub fn check_deadline(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.phase == AttemptPhase::InProgress {
            if let Some(deadline) = self.deadline {
                if now > deadline + Duration::seconds(2) {
                    self.set_phase(AttemptPhase::Expired);
                    return Err(Error::Expired(
                        "Quiz time limit exceeded".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Moves into `Submitting`. Allowed from `InProgress` (manual submit or
    /// countdown hitting zero) and once from `Failed` (manual retry).
    pub fn begin_submit(&mut self, trigger: SubmitTrigger) -> Result<()> {
        match self.phase {
            AttemptPhase::InProgress => {
                self.timed_out = trigger == SubmitTrigger::Timeout;
                self.set_phase(AttemptPhase::Submitting);
                Ok(())
            }
            AttemptPhase::Failed => {
                if trigger != SubmitTrigger::Manual {
                    return Err(Error::InvalidState(
                        "Only a manual submit can retry a failed session".to_string(),
                    ));
                }
                if self.failed_retry_used {
                    return Err(Error::InvalidState(
                        "Submission already failed; the session cannot be retried again"
                            .to_string(),
                    ));
                }
                self.failed_retry_used = true;
                self.set_phase(AttemptPhase::Submitting);
                Ok(())
            }
            AttemptPhase::Completed => Err(Error::AlreadySubmitted(
                "This quiz has already been submitted".to_string(),
            )),
            AttemptPhase::Submitting => Err(Error::InvalidState(
                "A submission is already in progress".to_string(),
            )),
            AttemptPhase::Ready => Err(Error::InvalidState(
                "The session has not been started".to_string(),
            )),
            AttemptPhase::Expired => Err(Error::Expired(
                "Quiz time limit exceeded".to_string(),
            )),
            AttemptPhase::Abandoned => Err(Error::InvalidState(
                "The session was abandoned".to_string(),
            )),
        }
    }

    pub fn complete_submit(&mut self) {
        self.set_phase(AttemptPhase::Completed);
    }

    pub fn fail_submit(&mut self) {
        self.set_phase(AttemptPhase::Failed);
    }

    /// Terminal drop of the attempt, persisting nothing. A countdown task
    /// that still holds the session sees the phase and stops instead of
    /// auto-submitting.
    pub fn abandon(&mut self) {
        if !self.phase.is_terminal() {
            self.set_phase(AttemptPhase::Abandoned);
        }
    }

    /// Grades the held answers against the snapshot. Exact string match
    /// earns the question's points; anything else earns zero.
    pub fn score(&self) -> (i32, i32) {
        let mut earned: i32 = 0;
        let mut max: i32 = 0;
        for q in &self.questions {
            max += q.points;
            if self.answers.get(&q.id) == Some(&q.correct_answer) {
                earned += q.points;
            }
        }
        (earned, max)
    }

    pub fn answers_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.answers).unwrap_or_else(|_| serde_json::json!({}))
    }

    fn require_in_progress(&self, action: &str) -> Result<()> {
        match self.phase {
            AttemptPhase::InProgress => Ok(()),
            AttemptPhase::Completed => Err(Error::AlreadySubmitted(
                "This quiz has already been submitted".to_string(),
            )),
            AttemptPhase::Expired => Err(Error::Expired(
                "Quiz time limit exceeded".to_string(),
            )),
            other => Err(Error::InvalidState(format!(
                "Cannot {} in the '{}' phase",
                action,
                other.as_str()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_quiz(time_limit_minutes: i32) -> Quiz {
        Quiz {
            id: Uuid::new_v4(),
            title: "Rust basics".to_string(),
            description: None,
            created_by: None,
            time_limit_minutes,
            is_published: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_question(quiz_id: Uuid, correct: &str, points: i32, position: i32) -> Question {
        Question {
            id: Uuid::new_v4(),
            quiz_id,
            question_text: format!("Question {}", position),
            options: serde_json::json!(["a", "b", correct]),
            correct_answer: correct.to_string(),
            points,
            question_type: "single_choice".to_string(),
            position,
            created_at: Utc::now(),
        }
    }

    fn started_attempt(time_limit_minutes: i32, questions: usize) -> QuizAttempt {
        let quiz = sample_quiz(time_limit_minutes);
        let qs: Vec<Question> = (0..questions)
            .map(|i| sample_question(quiz.id, "right", 2, i as i32))
            .collect();
        let mut attempt = QuizAttempt::new(Uuid::new_v4(), &quiz, &qs);
        attempt.start(Utc::now()).unwrap();
        attempt
    }

    #[test]
    fn fresh_session_starts_at_question_zero_with_full_clock() {
        let quiz = sample_quiz(5);
        let qs = vec![
            sample_question(quiz.id, "right", 1, 0),
            sample_question(quiz.id, "right", 1, 1),
        ];
        let attempt = QuizAttempt::new(Uuid::new_v4(), &quiz, &qs);

        assert_eq!(attempt.phase(), AttemptPhase::Ready);
        assert_eq!(attempt.current_index(), 0);
        assert_eq!(attempt.remaining_seconds(), 300);
        assert_eq!(attempt.answered_count(), 0);
    }

    #[test]
    fn start_is_single_shot() {
        let mut attempt = started_attempt(1, 1);
        assert_eq!(attempt.phase(), AttemptPhase::InProgress);
        let err = attempt.start(Utc::now()).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn navigation_is_bounded() {
        let mut attempt = started_attempt(1, 2);

        assert!(matches!(
            attempt.retreat().unwrap_err(),
            Error::InvalidState(_)
        ));
        attempt.advance().unwrap();
        assert_eq!(attempt.current_index(), 1);
        assert!(matches!(
            attempt.advance().unwrap_err(),
            Error::InvalidState(_)
        ));
        attempt.retreat().unwrap();
        assert_eq!(attempt.current_index(), 0);
    }

    #[test]
    fn reanswering_a_question_overwrites_the_previous_choice() {
        let mut attempt = started_attempt(1, 2);
        let qid = attempt.questions()[0].id;

        attempt.select_answer(qid, "a".to_string()).unwrap();
        attempt.select_answer(qid, "b".to_string()).unwrap();

        assert_eq!(attempt.answered_count(), 1);
        assert_eq!(attempt.answers_json()[qid.to_string()], "b");
    }

    #[test]
    fn answering_an_unknown_question_is_rejected() {
        let mut attempt = started_attempt(1, 1);
        let err = attempt
            .select_answer(Uuid::new_v4(), "a".to_string())
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn ticks_count_down_by_one_and_bottom_out() {
        let mut attempt = started_attempt(1, 1);
        assert_eq!(attempt.remaining_seconds(), 60);

        for expected in (1..60).rev() {
            assert_eq!(attempt.tick(), Tick::Counting(expected));
        }
        assert_eq!(attempt.tick(), Tick::TimedOut);
        assert_eq!(attempt.remaining_seconds(), 0);
    }

    #[test]
    fn tick_stops_once_the_attempt_leaves_in_progress() {
        let mut attempt = started_attempt(1, 1);
        attempt.begin_submit(SubmitTrigger::Manual).unwrap();
        assert_eq!(attempt.tick(), Tick::Stopped);
        attempt.complete_submit();
        assert_eq!(attempt.tick(), Tick::Stopped);
    }

    #[test]
    fn timeout_submit_records_the_timed_out_flag() {
        let mut attempt = started_attempt(1, 1);
        attempt.begin_submit(SubmitTrigger::Timeout).unwrap();
        assert!(attempt.was_timed_out());

        let mut manual = started_attempt(1, 1);
        manual.begin_submit(SubmitTrigger::Manual).unwrap();
        assert!(!manual.was_timed_out());
    }

    #[test]
    fn submit_after_completion_reports_already_submitted() {
        let mut attempt = started_attempt(1, 1);
        attempt.begin_submit(SubmitTrigger::Manual).unwrap();
        attempt.complete_submit();

        let err = attempt.begin_submit(SubmitTrigger::Manual).unwrap_err();
        assert!(matches!(err, Error::AlreadySubmitted(_)));
        let err = attempt
            .select_answer(attempt.questions()[0].id, "x".to_string())
            .unwrap_err();
        assert!(matches!(err, Error::AlreadySubmitted(_)));
    }

    #[test]
    fn failed_submission_allows_exactly_one_manual_retry() {
        let mut attempt = started_attempt(1, 1);
        attempt.begin_submit(SubmitTrigger::Manual).unwrap();
        attempt.fail_submit();

        attempt.begin_submit(SubmitTrigger::Manual).unwrap();
        attempt.fail_submit();

        let err = attempt.begin_submit(SubmitTrigger::Manual).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn submit_before_start_is_rejected() {
        let quiz = sample_quiz(1);
        let qs = vec![sample_question(quiz.id, "right", 1, 0)];
        let mut attempt = QuizAttempt::new(Uuid::new_v4(), &quiz, &qs);
        let err = attempt.begin_submit(SubmitTrigger::Manual).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn lost_timer_is_caught_by_the_deadline_backstop() {
        let mut attempt = started_attempt(1, 1);
        let long_after = Utc::now() + Duration::seconds(120);

        let err = attempt.check_deadline(long_after).unwrap_err();
        assert!(matches!(err, Error::Expired(_)));
        assert_eq!(attempt.phase(), AttemptPhase::Expired);

        let err = attempt.advance().unwrap_err();
        assert!(matches!(err, Error::Expired(_)));
    }

    #[test]
    fn deadline_backstop_tolerates_the_running_timer() {
        let mut attempt = started_attempt(1, 1);
        attempt.check_deadline(Utc::now()).unwrap();
        assert_eq!(attempt.phase(), AttemptPhase::InProgress);
    }

    #[test]
    fn abandoned_attempt_stops_ticking_and_refuses_timeout_submission() {
        let mut attempt = started_attempt(1, 1);
        attempt.abandon();

        assert_eq!(attempt.phase(), AttemptPhase::Abandoned);
        assert!(attempt.phase().is_terminal());
        // A countdown task that outlived the registry entry must observe a
        // dead attempt: no more ticks, and no timeout-driven submission.
        assert_eq!(attempt.tick(), Tick::Stopped);
        let err = attempt.begin_submit(SubmitTrigger::Timeout).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn abandon_never_downgrades_a_completed_attempt() {
        let mut attempt = started_attempt(1, 1);
        attempt.begin_submit(SubmitTrigger::Manual).unwrap();
        attempt.complete_submit();

        attempt.abandon();
        assert_eq!(attempt.phase(), AttemptPhase::Completed);
    }

    #[test]
    fn scoring_matches_exact_answers_only() {
        let quiz = sample_quiz(5);
        let q1 = sample_question(quiz.id, "right", 2, 0);
        let q2 = sample_question(quiz.id, "also right", 3, 1);
        let q3 = sample_question(quiz.id, "never picked", 5, 2);
        let mut attempt = QuizAttempt::new(Uuid::new_v4(), &quiz, &[q1.clone(), q2.clone(), q3]);
        attempt.start(Utc::now()).unwrap();

        attempt.select_answer(q1.id, "right".to_string()).unwrap();
        attempt.select_answer(q2.id, "wrong".to_string()).unwrap();

        assert_eq!(attempt.score(), (2, 10));
    }

    #[test]
    fn snapshot_is_isolated_from_later_quiz_edits() {
        let quiz = sample_quiz(5);
        let mut q = sample_question(quiz.id, "right", 1, 0);
        let attempt = QuizAttempt::new(Uuid::new_v4(), &quiz, std::slice::from_ref(&q));

        q.question_text = "Edited after the session began".to_string();
        assert_eq!(attempt.questions()[0].question_text, "Question 0");
    }
}
